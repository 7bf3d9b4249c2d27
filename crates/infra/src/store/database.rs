use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use baseframework_context::short_type_name;
use baseframework_core::{Entity, EntityId, EntityKey, ExpectedVersion, KeyValue};

use super::StoreError;

type UniqueKeyFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

struct UniqueIndex<T> {
    name: &'static str,
    key: UniqueKeyFn<T>,
}

impl<T> Clone for UniqueIndex<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            key: Arc::clone(&self.key),
        }
    }
}

/// Constraint definitions shared by every snapshot of one database.
///
/// Declarations apply to snapshots taken before them too, so a context that
/// opened its transaction earlier still checks them on submit.
#[derive(Default)]
pub struct Schema {
    unique: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl Schema {
    fn declare_unique<T: Entity>(&self, name: &'static str, key: UniqueKeyFn<T>) {
        let mut unique = self.unique.write().unwrap_or_else(PoisonError::into_inner);
        let slot = unique
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Vec::<UniqueIndex<T>>::new()) as Box<dyn Any + Send + Sync>);

        if let Some(indexes) = slot.downcast_mut::<Vec<UniqueIndex<T>>>() {
            indexes.retain(|idx| idx.name != name);
            indexes.push(UniqueIndex { name, key });
        }
    }

    fn unique_indexes<T: Entity>(&self) -> Vec<UniqueIndex<T>> {
        self.unique
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
            .and_then(|slot| slot.downcast_ref::<Vec<UniqueIndex<T>>>())
            .cloned()
            .unwrap_or_default()
    }

    /// Names of the unique indexes declared on `T`.
    pub fn unique_index_names<T: Entity>(&self) -> Vec<&'static str> {
        self.unique_indexes::<T>().iter().map(|idx| idx.name).collect()
    }
}

impl core::fmt::Debug for Schema {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let entities = self.unique.read().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("Schema").field("constrained_entities", &entities).finish()
    }
}

/// Rows of one entity type, ordered by id.
pub struct Table<T: Entity> {
    rows: BTreeMap<EntityId, T>,
    next_id: i64,
    schema: Arc<Schema>,
}

impl<T: Entity> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            rows: self.rows.clone(),
            next_id: self.next_id,
            schema: Arc::clone(&self.schema),
        }
    }
}

impl<T: Entity> Table<T> {
    fn new(schema: Arc<Schema>) -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
            schema,
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.rows.get(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.rows.contains_key(&id)
    }

    pub fn rows(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row whose primary key equals `key`.
    pub fn find(&self, key: &EntityKey) -> Option<&T> {
        if let [KeyValue::Int(id)] = key.values() {
            if let Some(row) = self.rows.get(&EntityId::new(*id)) {
                if row.key() == *key {
                    return Some(row);
                }
            }
        }
        self.rows.values().find(|row| row.key() == *key)
    }

    /// Insert with a fresh id. The id is written into the stored row.
    pub fn insert(&mut self, mut entity: T) -> Result<EntityId, StoreError> {
        self.check_unique(&entity, None)?;

        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        entity.assign_id(id);
        self.rows.insert(id, entity);
        Ok(id)
    }

    /// Replace an existing row; returns the previous version.
    pub fn update(&mut self, entity: T) -> Result<T, StoreError> {
        let id = entity.id();
        if !self.rows.contains_key(&id) {
            return Err(self.missing(id));
        }
        self.check_unique(&entity, Some(id))?;
        self.rows.insert(id, entity).ok_or_else(|| self.missing(id))
    }

    pub fn delete(&mut self, id: EntityId) -> Result<T, StoreError> {
        self.rows.remove(&id).ok_or_else(|| self.missing(id))
    }

    fn check_unique(&self, entity: &T, skip: Option<EntityId>) -> Result<(), StoreError> {
        for index in self.schema.unique_indexes::<T>() {
            let value = (index.key)(entity);
            let clash = self
                .rows
                .iter()
                .filter(|(id, _)| Some(**id) != skip)
                .any(|(_, row)| (index.key)(row) == value);

            if clash {
                return Err(StoreError::ConstraintViolation {
                    entity: short_type_name::<T>(),
                    index: index.name,
                    value,
                });
            }
        }
        Ok(())
    }

    fn missing(&self, id: EntityId) -> StoreError {
        StoreError::MissingRow {
            entity: short_type_name::<T>(),
            id,
        }
    }
}

impl<T: Entity> core::fmt::Debug for Table<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Table")
            .field("entity", &short_type_name::<T>())
            .field("rows", &self.rows.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

trait AnyTable: Send + Sync {
    fn clone_table(&self) -> Box<dyn AnyTable>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn row_count(&self) -> usize;
}

impl<T: Entity> AnyTable for Table<T> {
    fn clone_table(&self) -> Box<dyn AnyTable> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn row_count(&self) -> usize {
        self.len()
    }
}

/// A consistent, versioned view of every table.
#[derive(Default)]
pub struct Snapshot {
    version: u64,
    tables: HashMap<TypeId, Box<dyn AnyTable>>,
    schema: Arc<Schema>,
}

impl Clone for Snapshot {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            schema: Arc::clone(&self.schema),
            tables: self
                .tables
                .iter()
                .map(|(ty, table)| (*ty, table.clone_table()))
                .collect(),
        }
    }
}

impl Snapshot {
    /// Empty snapshot checking the constraints of `schema`.
    pub fn with_schema(schema: Arc<Schema>) -> Self {
        Self {
            version: 0,
            tables: HashMap::new(),
            schema,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Version of the database this snapshot was taken from.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn table<T: Entity>(&self) -> Option<&Table<T>> {
        self.tables
            .get(&TypeId::of::<T>())
            .and_then(|table| table.as_any().downcast_ref::<Table<T>>())
    }

    /// Table for `T`, created empty on first use.
    pub fn table_mut<T: Entity>(&mut self) -> &mut Table<T> {
        let schema = &self.schema;
        let slot = self
            .tables
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Table::<T>::new(Arc::clone(schema))) as Box<dyn AnyTable>);

        let Some(table) = slot.as_any_mut().downcast_mut::<Table<T>>() else {
            unreachable!("table slot is keyed by its entity TypeId");
        };
        table
    }

    /// Copy of all rows of `T`, ordered by id.
    pub fn rows<T: Entity>(&self) -> Vec<T> {
        self.table::<T>()
            .map(|table| table.rows().cloned().collect())
            .unwrap_or_default()
    }

    pub fn total_rows(&self) -> usize {
        self.tables.values().map(|t| t.row_count()).sum()
    }
}

impl core::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Snapshot")
            .field("version", &self.version)
            .field("tables", &self.tables.len())
            .field("rows", &self.total_rows())
            .finish()
    }
}

/// Shared in-memory database.
///
/// Readers take snapshots; writers publish whole snapshots guarded by an
/// optimistic version check, so a commit is all-or-nothing.
#[derive(Debug)]
pub struct InMemoryDatabase {
    name: String,
    schema: Arc<Schema>,
    current: RwLock<Snapshot>,
}

impl InMemoryDatabase {
    pub fn new(name: impl Into<String>) -> Self {
        let schema = Arc::new(Schema::default());
        Self {
            name: name.into(),
            current: RwLock::new(Snapshot::with_schema(Arc::clone(&schema))),
            schema,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u64 {
        self.current.read().unwrap_or_else(PoisonError::into_inner).version
    }

    /// Declare a unique index on `T` (e.g. a user code).
    ///
    /// Checked on every later insert/update, including those of contexts
    /// whose transaction is already open. Existing rows are not re-validated.
    pub fn declare_unique<T: Entity>(
        &self,
        name: &'static str,
        key: impl Fn(&T) -> String + Send + Sync + 'static,
    ) {
        self.schema.declare_unique::<T>(name, Arc::new(key));
        tracing::debug!(database = %self.name, entity = short_type_name::<T>(), index = name, "unique index declared");
    }

    pub fn snapshot(&self) -> Snapshot {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Committed rows of `T`.
    pub fn rows<T: Entity>(&self) -> Vec<T> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).rows()
    }

    /// Replace the current state with `snapshot` if the version still matches.
    ///
    /// Returns the new version.
    pub fn publish(&self, mut snapshot: Snapshot, expected: ExpectedVersion) -> Result<u64, StoreError> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);

        if !expected.matches(current.version) {
            return Err(StoreError::Concurrency(format!(
                "database '{}' expected {expected:?}, found {}",
                self.name, current.version
            )));
        }

        snapshot.version = current.version + 1;
        *current = snapshot;
        Ok(current.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baseframework_core::UserEntity;

    fn users_db() -> InMemoryDatabase {
        let db = InMemoryDatabase::new("test");
        db.declare_unique::<UserEntity>("user_code", |u| u.user_code.clone());
        db
    }

    #[test]
    fn insert_assigns_sequential_ids() {
        let mut snap = Snapshot::default();
        let table = snap.table_mut::<UserEntity>();

        let a = table.insert(UserEntity::new("u1", "One")).unwrap();
        let b = table.insert(UserEntity::new("u2", "Two")).unwrap();

        assert_eq!((a, b), (EntityId::new(1), EntityId::new(2)));
        assert_eq!(table.get(b).unwrap().user_name, "Two");
        assert_eq!(table.get(b).unwrap().id(), b);
    }

    #[test]
    fn unique_index_rejects_duplicates_but_allows_self_update() {
        let db = users_db();
        let mut snap = db.snapshot();
        let table = snap.table_mut::<UserEntity>();

        let id = table.insert(UserEntity::new("u1", "One")).unwrap();
        let err = table.insert(UserEntity::new("u1", "Again")).unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation { index: "user_code", .. }));

        let mut renamed = table.get(id).unwrap().clone();
        renamed.user_name = "Uno".to_string();
        let previous = table.update(renamed).unwrap();
        assert_eq!(previous.user_name, "One");
    }

    #[test]
    fn update_and_delete_require_existing_rows() {
        let mut snap = Snapshot::default();
        let table = snap.table_mut::<UserEntity>();

        assert!(matches!(
            table.delete(EntityId::new(5)),
            Err(StoreError::MissingRow { entity: "UserEntity", .. })
        ));
        assert!(table.update(UserEntity::new("x", "x")).is_err());
    }

    #[test]
    fn find_by_key() {
        let mut snap = Snapshot::default();
        let table = snap.table_mut::<UserEntity>();
        table.insert(UserEntity::new("a", "A")).unwrap();
        let id = table.insert(UserEntity::new("b", "B")).unwrap();

        assert_eq!(table.find(&EntityKey::from(id)).unwrap().user_code, "b");
        assert!(table.find(&EntityKey::from(99)).is_none());
    }

    #[test]
    fn snapshots_are_isolated_until_published() {
        let db = users_db();
        let mut snap = db.snapshot();
        snap.table_mut::<UserEntity>().insert(UserEntity::new("u1", "One")).unwrap();

        assert!(db.rows::<UserEntity>().is_empty());

        let version = db.publish(snap, ExpectedVersion::Exact(0)).unwrap();
        assert_eq!(version, 1);
        assert_eq!(db.rows::<UserEntity>().len(), 1);
    }

    #[test]
    fn stale_publish_is_rejected() {
        let db = users_db();
        let first = db.snapshot();
        let second = db.snapshot();

        db.publish(first, ExpectedVersion::Exact(0)).unwrap();
        let err = db.publish(second, ExpectedVersion::Exact(0)).unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));
        assert_eq!(db.version(), 1);
    }

    #[test]
    fn declarations_reach_snapshots_taken_earlier() {
        let db = InMemoryDatabase::new("late");
        let mut early = db.snapshot();
        db.declare_unique::<UserEntity>("user_code", |u| u.user_code.clone());

        let table = early.table_mut::<UserEntity>();
        table.insert(UserEntity::new("dup", "A")).unwrap();
        assert!(matches!(
            table.insert(UserEntity::new("dup", "B")),
            Err(StoreError::ConstraintViolation { index: "user_code", .. })
        ));
        assert_eq!(db.schema().unique_index_names::<UserEntity>(), vec!["user_code"]);
    }

    #[test]
    fn unique_indexes_survive_snapshots() {
        let db = users_db();
        let mut snap = db.snapshot();
        snap.table_mut::<UserEntity>().insert(UserEntity::new("dup", "A")).unwrap();
        db.publish(snap, ExpectedVersion::Any).unwrap();

        let mut again = db.snapshot();
        let err = again
            .table_mut::<UserEntity>()
            .insert(UserEntity::new("dup", "B"))
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation { .. }));
    }
}
