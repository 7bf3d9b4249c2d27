//! In-memory backing store and the domain context built on it.
//!
//! Intended for tests/dev and the console harness. Rows live in typed tables
//! inside a versioned snapshot; contexts work on a private copy (the implicit
//! transaction) and publish it on commit.

pub mod context;
pub mod database;

pub use context::InMemoryDomainContext;
pub use database::{InMemoryDatabase, Schema, Snapshot, Table};

use baseframework_context::ContextError;
use baseframework_core::EntityId;
use thiserror::Error;

/// Store operation error.
///
/// These are infrastructure errors (constraints, concurrency), as opposed to
/// domain errors (business rules).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unique constraint '{index}' on {entity} violated by {value:?}")]
    ConstraintViolation {
        entity: &'static str,
        index: &'static str,
        value: String,
    },

    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("{entity} {id} does not exist")]
    MissingRow { entity: &'static str, id: EntityId },
}

impl From<StoreError> for ContextError {
    fn from(error: StoreError) -> Self {
        ContextError::store(error)
    }
}
