//! `baseframework-core`: entity and error building blocks.
//!
//! This crate contains **pure domain** primitives (no persistence concerns):
//! entity identity, audit provenance, the attribution user, and the
//! structured domain error.

pub mod audit;
pub mod entity;
pub mod error;
pub mod id;
pub mod template;
pub mod user;
pub mod version;

pub use audit::{AuditInfo, Auditable};
pub use entity::{Entity, entity_eq, entity_hash};
pub use error::{DomainError, DomainResult, ErrorData};
pub use id::{EntityId, EntityKey, KeyValue};
pub use template::{format_positional, is_template};
pub use user::{UserBase, UserEntity, UserRef};
pub use version::ExpectedVersion;
