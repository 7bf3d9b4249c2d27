//! Registry and context-contract errors.

use baseframework_core::{DomainError, EntityId};
use thiserror::Error;

/// Result type for context and registry operations.
pub type ContextResult<T> = Result<T, ContextError>;

/// Failure surfaced by the registry or by a domain context.
///
/// Nothing here is retried by this layer; every variant goes straight back to
/// the caller.
#[derive(Debug, Error)]
pub enum ContextError {
    /// An open (non-disposed) context is already registered for the interface.
    #[error(
        "domain context conflict: an instance of {interface} is still open; dispose it before registering another"
    )]
    Conflict { interface: &'static str },

    /// No context registered for the requested interface.
    #[error("no domain context registered for {interface}")]
    NotRegistered { interface: &'static str },

    /// No service registered for the requested service type.
    #[error("no service registered for {service}")]
    ServiceNotRegistered { service: &'static str },

    /// `default_context` was called on an empty scope.
    #[error("cannot find any registered domain context")]
    NoDefaultContext,

    /// `default_context` was called while several contexts are registered.
    #[error("default domain context is ambiguous: {count} contexts registered, resolve by interface")]
    AmbiguousDefaultContext { count: usize },

    /// `modify`/`remove` on an entity the context does not know.
    #[error("{entity} {id} is not tracked by this context")]
    NotTracked { entity: &'static str, id: EntityId },

    /// `submit_changes` succeeded but reported no id for an entity that was added.
    #[error("submit assigned no identifier to the added {entity}")]
    MissingInsert { entity: &'static str },

    /// Failure reported by the backing store (constraint, concurrency, ...).
    #[error("store failure: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// A business rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ContextError {
    pub fn store<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store(Box::new(error))
    }

    pub fn not_tracked<T: ?Sized>(id: EntityId) -> Self {
        Self::NotTracked {
            entity: short_type_name::<T>(),
            id,
        }
    }

    pub fn missing_insert<T: ?Sized>() -> Self {
        Self::MissingInsert {
            entity: short_type_name::<T>(),
        }
    }

    /// The concrete store error, when this is a [`ContextError::Store`] of type `E`.
    pub fn store_error<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Self::Store(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Last path segment of a type name (`my_crate::Customer` -> `Customer`).
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}
