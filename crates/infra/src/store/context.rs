//! Domain context over [`InMemoryDatabase`].
//!
//! - The context opens an implicit transaction: a private snapshot of the
//!   database taken at construction (and again after each commit).
//! - `add`/`modify`/`remove` only queue work.
//! - `submit_changes` applies the queue to a copy of the private snapshot and
//!   swaps it in only if every operation succeeded.
//! - `commit_transaction` publishes the private snapshot to the database,
//!   failing if another context committed first.

use std::any::TypeId;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use baseframework_context::{
    CallScope, ContextError, ContextResult, ContextState, DomainContext, EntityStore, Query,
    SubmitSummary, short_type_name,
};
use baseframework_core::{Entity, EntityId, EntityKey, ExpectedVersion, UserRef};

use super::StoreError;
use super::database::{InMemoryDatabase, Snapshot};
use crate::audit::{Clock, StaticUser, SystemClock, UserProvider};

/// Who/when for one submit.
struct Stamp {
    user: Option<UserRef>,
    at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeKind {
    Insert(TypeId),
    Update,
    Delete,
}

type ApplyFn = Box<dyn FnOnce(&mut Snapshot, &Stamp) -> Result<EntityId, StoreError> + Send>;

struct PendingChange {
    kind: ChangeKind,
    apply: ApplyFn,
}

/// Transaction-local state.
struct Working {
    snapshot: Snapshot,
    /// Database version the snapshot was taken from.
    base_version: u64,
    /// Submitted but not yet committed.
    dirty: bool,
}

/// In-memory implementation of [`DomainContext`] for every entity type.
pub struct InMemoryDomainContext {
    state: ContextState,
    database: Arc<InMemoryDatabase>,
    working: Arc<RwLock<Working>>,
    pending: Mutex<Vec<PendingChange>>,
    clock: Arc<dyn Clock>,
    users: Arc<dyn UserProvider>,
}

impl InMemoryDomainContext {
    pub fn new(database: Arc<InMemoryDatabase>) -> Self {
        let working = Working::begin(&database);
        tracing::debug!(database = database.name(), version = working.base_version, "transaction opened");

        Self {
            state: ContextState::new(),
            database,
            working: Arc::new(RwLock::new(working)),
            pending: Mutex::new(Vec::new()),
            clock: Arc::new(SystemClock),
            users: Arc::new(StaticUser::anonymous()),
        }
    }

    /// Build a context whose collaborators come from the scope's services
    /// (`dyn Clock`, `dyn UserProvider`), falling back to the wall clock and
    /// anonymous attribution.
    pub fn for_scope(scope: &CallScope, database: Arc<InMemoryDatabase>) -> Self {
        let mut context = Self::new(database);
        if let Ok(clock) = scope.service::<dyn Clock>() {
            context.clock = clock;
        }
        if let Ok(users) = scope.service::<dyn UserProvider>() {
            context.users = users;
        }
        context
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_user_provider(mut self, users: Arc<dyn UserProvider>) -> Self {
        self.users = users;
        self
    }

    pub fn database(&self) -> &Arc<InMemoryDatabase> {
        &self.database
    }

    /// Number of queued, unsubmitted operations.
    pub fn pending_changes(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// `true` when submitted changes are waiting for a commit.
    pub fn has_uncommitted_changes(&self) -> bool {
        self.working.read().unwrap_or_else(PoisonError::into_inner).dirty
    }

    /// Drop uncommitted work and re-read the database.
    pub fn rollback(&self) {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).clear();
        let mut working = self.working.write().unwrap_or_else(PoisonError::into_inner);
        *working = Working::begin(&self.database);
        tracing::debug!(database = self.database.name(), version = working.base_version, "transaction rolled back");
    }

    fn enqueue(&self, kind: ChangeKind, apply: ApplyFn) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PendingChange { kind, apply });
    }

    fn is_tracked<T: Entity>(&self, id: EntityId) -> bool {
        if id.is_none() {
            return false;
        }
        self.working
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot
            .table::<T>()
            .is_some_and(|table| table.contains(id))
    }
}

impl Working {
    fn begin(database: &InMemoryDatabase) -> Self {
        let snapshot = database.snapshot();
        Self {
            base_version: snapshot.version(),
            snapshot,
            dirty: false,
        }
    }
}

impl DomainContext for InMemoryDomainContext {
    fn state(&self) -> &ContextState {
        &self.state
    }

    fn submit_changes(&self) -> ContextResult<SubmitSummary> {
        let pending: Vec<PendingChange> =
            std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));

        if pending.is_empty() {
            return Ok(SubmitSummary::default());
        }

        let stamp = Stamp {
            user: self.users.current_user(),
            at: self.clock.now(),
        };

        let mut working = self.working.write().unwrap_or_else(PoisonError::into_inner);
        let mut staged = working.snapshot.clone();
        let mut summary = SubmitSummary::default();

        for change in pending {
            let id = (change.apply)(&mut staged, &stamp).map_err(|e| {
                tracing::warn!(database = self.database.name(), error = %e, "submit rejected");
                ContextError::from(e)
            })?;

            match change.kind {
                ChangeKind::Insert(entity) => summary.record_insert_of(entity, id),
                ChangeKind::Update => summary.modified += 1,
                ChangeKind::Delete => summary.removed += 1,
            }
        }

        working.snapshot = staged;
        working.dirty = true;

        tracing::info!(
            database = self.database.name(),
            inserted = summary.inserted_count(),
            modified = summary.modified,
            removed = summary.removed,
            "changes submitted"
        );
        Ok(summary)
    }

    fn commit_transaction(&self) -> ContextResult<()> {
        let mut working = self.working.write().unwrap_or_else(PoisonError::into_inner);

        if working.dirty {
            let version = self.database.publish(
                working.snapshot.clone(),
                ExpectedVersion::Exact(working.base_version),
            )?;
            tracing::info!(database = self.database.name(), version, "transaction committed");
        }

        *working = Working::begin(&self.database);
        Ok(())
    }
}

impl<T: Entity> EntityStore<T> for InMemoryDomainContext {
    fn add(&self, entity: T) -> T {
        let row = entity.clone();
        self.enqueue(
            ChangeKind::Insert(TypeId::of::<T>()),
            Box::new(move |snapshot, stamp| {
                let mut row = row;
                if let Some(audit) = row.audit_mut() {
                    audit.stamp_created(stamp.user.clone(), stamp.at);
                }
                snapshot.table_mut::<T>().insert(row)
            }),
        );
        entity
    }

    fn modify(&self, entity: &T) -> ContextResult<()> {
        let id = entity.id();
        if !self.is_tracked::<T>(id) {
            return Err(ContextError::not_tracked::<T>(id));
        }

        let row = entity.clone();
        self.enqueue(
            ChangeKind::Update,
            Box::new(move |snapshot, stamp| {
                let table = snapshot.table_mut::<T>();
                let mut row = row;
                let stored = table.get(id).and_then(|s| s.audit().cloned());
                if let Some(audit) = row.audit_mut() {
                    audit.stamp_updated(stored.as_ref(), stamp.user.clone(), stamp.at);
                }
                table.update(row).map(|_| id)
            }),
        );
        Ok(())
    }

    fn remove(&self, entity: &T) -> ContextResult<()> {
        let id = entity.id();
        if !self.is_tracked::<T>(id) {
            return Err(ContextError::not_tracked::<T>(id));
        }

        self.enqueue(
            ChangeKind::Delete,
            Box::new(move |snapshot, _| snapshot.table_mut::<T>().delete(id).map(|_| id)),
        );
        Ok(())
    }

    fn entity_set(&self) -> Query<T> {
        let working = Arc::clone(&self.working);
        Query::new(Arc::new(move || {
            working
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .snapshot
                .rows::<T>()
        }))
    }

    fn find(&self, key: &EntityKey) -> Option<T> {
        self.working
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot
            .table::<T>()
            .and_then(|table| table.find(key))
            .cloned()
    }
}

impl core::fmt::Debug for InMemoryDomainContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryDomainContext")
            .field("database", &self.database.name())
            .field("pending", &self.pending_changes())
            .field("disposed", &self.state.is_disposed())
            .finish()
    }
}

impl Drop for InMemoryDomainContext {
    fn drop(&mut self) {
        let pending = self.pending_changes();
        if pending > 0 || self.has_uncommitted_changes() {
            tracing::warn!(
                database = self.database.name(),
                pending,
                context = short_type_name::<Self>(),
                "context dropped with uncommitted work"
            );
        }
    }
}
