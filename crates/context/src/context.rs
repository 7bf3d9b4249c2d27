//! Domain context contract.
//!
//! A domain context is the unit of work application code talks to: it records
//! pending inserts/updates/deletes, answers queries, and flushes everything on
//! [`DomainContext::submit_changes`]. Business domains define their own context
//! interface as a sub-trait listing the entity types they persist:
//!
//! ```ignore
//! pub trait CustomerContext:
//!     DomainContext + EntityStore<Customer> + EntityStore<UserEntity>
//! {
//! }
//! ```

use std::any::TypeId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use baseframework_core::{Entity, EntityId, EntityKey};

use crate::error::ContextResult;
use crate::memory::MemoryStore;
use crate::query::{Predicate, Query};

/// State every context carries regardless of its backing store.
#[derive(Debug, Default)]
pub struct ContextState {
    disposed: AtomicBool,
    memory: MemoryStore,
}

impl ContextState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub fn set_disposed(&self, disposed: bool) {
        self.disposed.store(disposed, Ordering::Release);
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }
}

/// Outcome of a successful [`DomainContext::submit_changes`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitSummary {
    /// Identifiers assigned to added entities with their entity type, in `add` order.
    inserted: Vec<(TypeId, EntityId)>,
    pub modified: usize,
    pub removed: usize,
}

impl SubmitSummary {
    /// Note the id assigned to an added `T`. Call in `add` order.
    pub fn record_insert<T: Entity>(&mut self, id: EntityId) {
        self.record_insert_of(TypeId::of::<T>(), id);
    }

    /// Type-erased [`record_insert`](Self::record_insert) for stores that queue by `TypeId`.
    pub fn record_insert_of(&mut self, entity: TypeId, id: EntityId) {
        self.inserted.push((entity, id));
    }

    /// Every assigned id, in `add` order, whatever the entity type.
    pub fn inserted(&self) -> Vec<EntityId> {
        self.inserted.iter().map(|(_, id)| *id).collect()
    }

    /// Ids assigned to added `T`s, in `add` order.
    pub fn inserted_of<T: Entity>(&self) -> Vec<EntityId> {
        self.inserted
            .iter()
            .filter(|(entity, _)| *entity == TypeId::of::<T>())
            .map(|(_, id)| *id)
            .collect()
    }

    pub fn inserted_count(&self) -> usize {
        self.inserted.len()
    }

    pub fn total(&self) -> usize {
        self.inserted.len() + self.modified + self.removed
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Conversion of any context (including `dyn` sub-interfaces) into the base trait object.
///
/// Implemented automatically for every sized [`DomainContext`].
pub trait IntoDomainContext {
    fn into_domain_context(self: Arc<Self>) -> Arc<dyn DomainContext>;
}

impl<C: DomainContext + 'static> IntoDomainContext for C {
    fn into_domain_context(self: Arc<Self>) -> Arc<dyn DomainContext> {
        self
    }
}

/// Entity-type-independent part of a domain context.
pub trait DomainContext: IntoDomainContext + Send + Sync {
    fn state(&self) -> &ContextState;

    /// Flush all pending add/modify/remove operations as one unit.
    ///
    /// On failure the pending set is unspecified; discard the context.
    fn submit_changes(&self) -> ContextResult<SubmitSummary>;

    /// Finalize the transaction the backing store opened implicitly.
    fn commit_transaction(&self) -> ContextResult<()>;

    fn is_disposed(&self) -> bool {
        self.state().is_disposed()
    }

    fn set_disposed(&self, disposed: bool) {
        self.state().set_disposed(disposed);
    }

    /// Mark the context finished. A registry may then accept a replacement.
    fn dispose(&self) {
        self.set_disposed(true);
    }
}

/// Per-entity-type operations of a domain context.
pub trait EntityStore<T: Entity>: Send + Sync {
    /// Stage `entity` for insertion. The id is assigned on submit; the same
    /// value is handed back for chaining.
    fn add(&self, entity: T) -> T;

    /// Stage an update of an entity this context knows.
    fn modify(&self, entity: &T) -> ContextResult<()>;

    /// Stage a deletion.
    fn remove(&self, entity: &T) -> ContextResult<()>;

    /// All persisted entities of type `T`, evaluated lazily.
    fn entity_set(&self) -> Query<T>;

    fn entity_set_where(&self, predicate: Predicate<T>) -> Query<T> {
        self.entity_set().filter_by(predicate)
    }

    /// Direct primary-key lookup. Absent rows are `None`, not an error.
    fn find(&self, key: &EntityKey) -> Option<T>;
}

/// Generic conveniences available on every context, including `dyn` ones.
pub trait DomainContextExt: DomainContext {
    /// Scratch collection for `T`, created empty on first access.
    fn memory_store<T>(&self) -> Vec<T>
    where
        T: Clone + Send + 'static,
    {
        self.state().memory().snapshot()
    }

    fn with_memory_store<T, R>(&self, f: impl FnOnce(&mut Vec<T>) -> R) -> R
    where
        T: Send + 'static,
    {
        self.state().memory().with(f)
    }

    fn add_to_memory<T>(&self, obj: T)
    where
        T: Send + 'static,
    {
        self.state().memory().push(obj);
    }

    /// Remove the first matching occurrence. Others equal to `obj` stay.
    fn remove_from_memory<T>(&self, obj: &T) -> bool
    where
        T: PartialEq + Send + 'static,
    {
        self.state().memory().remove_first(obj)
    }

    /// `entity_set` with the entity type named by turbofish.
    fn query<T: Entity>(&self) -> Query<T>
    where
        Self: EntityStore<T>,
    {
        EntityStore::<T>::entity_set(self)
    }

    fn query_where<T: Entity>(&self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Query<T>
    where
        Self: EntityStore<T>,
    {
        EntityStore::<T>::entity_set_where(self, Arc::new(predicate))
    }

    fn find_by<T: Entity>(&self, key: impl Into<EntityKey>) -> Option<T>
    where
        Self: EntityStore<T>,
    {
        EntityStore::<T>::find(self, &key.into())
    }
}

impl<C: DomainContext + ?Sized> DomainContextExt for C {}
