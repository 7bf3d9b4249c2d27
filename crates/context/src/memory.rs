//! Per-context scratch space for transient objects.
//!
//! Each Rust type gets its own ordered `Vec`, created empty on first access.
//! Nothing stored here is ever persisted.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

type Slot<T> = Arc<Mutex<Vec<T>>>;

/// Type-keyed, insertion-ordered scratch collections.
///
/// Every element type has its own lock, so code running inside
/// [`with`](Self::with) may use the collections of other types. Re-entering
/// the collection of the same type from inside `with` deadlocks.
#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the collection for `T`, creating it if needed.
    pub fn with<T, R>(&self, f: impl FnOnce(&mut Vec<T>) -> R) -> R
    where
        T: Send + 'static,
    {
        let slot = self.slot::<T>();
        let mut items = slot.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut items)
    }

    /// Shared handle to the collection for `T`; the map lock is released on return.
    fn slot<T>(&self) -> Slot<T>
    where
        T: Send + 'static,
    {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = slots
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::<T>::new())) as Arc<dyn Any + Send + Sync>);

        match Arc::clone(slot).downcast::<Mutex<Vec<T>>>() {
            Ok(slot) => slot,
            Err(_) => unreachable!("memory store slot is keyed by its element TypeId"),
        }
    }

    /// Copy of the current collection for `T`, in insertion order.
    pub fn snapshot<T>(&self) -> Vec<T>
    where
        T: Clone + Send + 'static,
    {
        self.with(|items: &mut Vec<T>| items.clone())
    }

    pub fn push<T>(&self, obj: T)
    where
        T: Send + 'static,
    {
        self.with(|items: &mut Vec<T>| items.push(obj));
    }

    /// Remove the first element equal to `obj`. Returns whether one was removed.
    pub fn remove_first<T>(&self, obj: &T) -> bool
    where
        T: PartialEq + Send + 'static,
    {
        self.with(|items: &mut Vec<T>| match items.iter().position(|item| item == obj) {
            Some(idx) => {
                items.remove(idx);
                true
            }
            None => false,
        })
    }

    pub fn len<T>(&self) -> usize
    where
        T: Send + 'static,
    {
        self.with(|items: &mut Vec<T>| items.len())
    }

    /// Number of element types that have been touched.
    pub fn type_count(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Drop every collection.
    pub fn clear(&self) {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl core::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("types", &self.type_count())
            .finish()
    }
}
