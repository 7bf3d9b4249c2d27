//! Service locator maps keyed by service type.
//!
//! Services are stored as `Arc<S>`, where `S` is usually a trait object
//! (`dyn Clock`, `dyn UserProvider`). Registration overwrites: the last writer
//! for a given `S` wins.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{ContextError, ContextResult, short_type_name};

struct ServiceEntry {
    name: &'static str,
    instance: Box<dyn Any + Send + Sync>,
}

/// Unsynchronised service map (owned by one call scope).
#[derive(Default)]
pub struct ServiceMap {
    entries: HashMap<TypeId, ServiceEntry>,
}

impl ServiceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `service` under `S`. Returns `true` when an earlier one was replaced.
    pub fn insert<S>(&mut self, service: Arc<S>) -> bool
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let entry = ServiceEntry {
            name: short_type_name::<S>(),
            instance: Box::new(service),
        };
        self.entries.insert(TypeId::of::<S>(), entry).is_some()
    }

    pub fn get<S>(&self) -> ContextResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.entries
            .get(&TypeId::of::<S>())
            .and_then(|entry| entry.instance.downcast_ref::<Arc<S>>())
            .cloned()
            .ok_or(ContextError::ServiceNotRegistered {
                service: short_type_name::<S>(),
            })
    }

    pub fn remove<S>(&mut self) -> bool
    where
        S: ?Sized + 'static,
    {
        self.entries.remove(&TypeId::of::<S>()).is_some()
    }

    pub fn contains<S>(&self) -> bool
    where
        S: ?Sized + 'static,
    {
        self.entries.contains_key(&TypeId::of::<S>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the registered service types (unordered).
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.values().map(|entry| entry.name).collect()
    }
}

impl core::fmt::Debug for ServiceMap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServiceMap")
            .field("services", &self.names())
            .finish()
    }
}

/// Process-wide services, shared by every call scope.
///
/// Internally synchronised; registrations may race, and the last one wins.
#[derive(Debug, Default)]
pub struct GlobalServices {
    inner: RwLock<ServiceMap>,
}

impl GlobalServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S>(&self, service: Arc<S>)
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let replaced = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(service);

        if replaced {
            tracing::debug!(service = short_type_name::<S>(), "global service replaced");
        } else {
            tracing::debug!(service = short_type_name::<S>(), "global service registered");
        }
    }

    pub fn get<S>(&self) -> ContextResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).get::<S>()
    }

    pub fn contains<S>(&self) -> bool
    where
        S: ?Sized + 'static,
    {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains::<S>()
    }
}
