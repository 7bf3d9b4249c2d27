//! `baseframework-context`: the domain context contract and its registry.
//!
//! - [`DomainContext`] / [`EntityStore`]: what a persistence context offers
//!   (add/modify/remove, lazy queries, find, submit, commit, scratch memory).
//! - [`DomainManager`] / [`CallScope`]: interface-keyed registry of live
//!   contexts and services, scoped explicitly per logical call.

pub mod context;
pub mod error;
pub mod manager;
pub mod memory;
pub mod query;
pub mod services;

#[cfg(test)]
mod testing;

pub use context::{
    ContextState, DomainContext, DomainContextExt, EntityStore, IntoDomainContext, SubmitSummary,
};
pub use error::{ContextError, ContextResult, short_type_name};
pub use manager::{CallScope, DomainManager};
pub use memory::MemoryStore;
pub use query::{Predicate, Query, QuerySource};
pub use services::{GlobalServices, ServiceMap};
