//! Minimal contexts used by the unit tests of this crate.

use std::sync::{Arc, Mutex};

use baseframework_core::{Entity, EntityId, EntityKey};

use crate::context::{ContextState, DomainContext, EntityStore, SubmitSummary};
use crate::error::{ContextError, ContextResult};
use crate::query::Query;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Tag {
    pub(crate) id: EntityId,
    pub(crate) label: String,
}

impl Tag {
    pub(crate) fn new(label: &str) -> Self {
        Self {
            id: EntityId::NONE,
            label: label.to_string(),
        }
    }
}

impl Entity for Tag {
    fn id(&self) -> EntityId {
        self.id
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = id;
    }
}

/// Context interface used as a registry key.
pub(crate) trait Notes: DomainContext + EntityStore<Tag> {}

/// Writes straight through on `add`; `submit_changes` only counts.
#[derive(Debug, Default)]
pub(crate) struct NoteContext {
    state: ContextState,
    rows: Arc<Mutex<Vec<Tag>>>,
    staged: Mutex<usize>,
}

impl DomainContext for NoteContext {
    fn state(&self) -> &ContextState {
        &self.state
    }

    fn submit_changes(&self) -> ContextResult<SubmitSummary> {
        let mut staged = self.staged.lock().unwrap();
        let rows = self.rows.lock().unwrap();
        let mut summary = SubmitSummary::default();
        for tag in &rows[rows.len() - *staged..] {
            summary.record_insert::<Tag>(tag.id);
        }
        *staged = 0;
        Ok(summary)
    }

    fn commit_transaction(&self) -> ContextResult<()> {
        Ok(())
    }
}

impl EntityStore<Tag> for NoteContext {
    fn add(&self, entity: Tag) -> Tag {
        let mut rows = self.rows.lock().unwrap();
        let mut stored = entity.clone();
        stored.assign_id(EntityId::new(rows.len() as i64 + 1));
        rows.push(stored);
        *self.staged.lock().unwrap() += 1;
        entity
    }

    fn modify(&self, entity: &Tag) -> ContextResult<()> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|t| t.id == entity.id && !entity.is_new()) {
            Some(row) => {
                *row = entity.clone();
                Ok(())
            }
            None => Err(ContextError::not_tracked::<Tag>(entity.id)),
        }
    }

    fn remove(&self, entity: &Tag) -> ContextResult<()> {
        self.rows.lock().unwrap().retain(|t| t.id != entity.id);
        Ok(())
    }

    fn entity_set(&self) -> Query<Tag> {
        let rows = Arc::clone(&self.rows);
        Query::new(Arc::new(move || rows.lock().unwrap().clone()))
    }

    fn find(&self, key: &EntityKey) -> Option<Tag> {
        self.rows.lock().unwrap().iter().find(|t| &t.key() == key).cloned()
    }
}

impl Notes for NoteContext {}

/// A second, unrelated context type.
#[derive(Debug, Default)]
pub(crate) struct OtherContext {
    state: ContextState,
}

impl DomainContext for OtherContext {
    fn state(&self) -> &ContextState {
        &self.state
    }

    fn submit_changes(&self) -> ContextResult<SubmitSummary> {
        Ok(SubmitSummary::default())
    }

    fn commit_transaction(&self) -> ContextResult<()> {
        Ok(())
    }
}
