//! Registry of live domain contexts and services.
//!
//! [`DomainManager`] is created once per process and owns the global services.
//! Each logical call opens a [`CallScope`] and threads it through the code that
//! needs a context; nothing is looked up from hidden ambient storage.
//!
//! Contexts are keyed by the *interface* they are registered under, typically
//! a `dyn` sub-trait of [`DomainContext`]:
//!
//! ```ignore
//! let manager = DomainManager::new();
//! let mut scope = manager.begin_scope();
//! scope.register_context::<dyn CustomerContext>(Arc::new(context))?;
//!
//! let ctx = scope.context::<dyn CustomerContext>()?;
//! ctx.add(Customer::new("Ada"));
//! ctx.submit_changes()?;
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use tracing::Span;
use uuid::Uuid;

use crate::context::DomainContext;
use crate::error::{ContextError, ContextResult, short_type_name};
use crate::services::{GlobalServices, ServiceMap};

/// Process-level entry point: global services + call scope factory.
#[derive(Debug, Clone, Default)]
pub struct DomainManager {
    globals: Arc<GlobalServices>,
}

impl DomainManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share an existing global service map.
    pub fn with_globals(globals: Arc<GlobalServices>) -> Self {
        Self { globals }
    }

    pub fn globals(&self) -> &Arc<GlobalServices> {
        &self.globals
    }

    /// Register a process-wide service. Last writer wins.
    pub fn register_global_service<S>(&self, service: Arc<S>)
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.globals.register(service);
    }

    pub fn global_service<S>(&self) -> ContextResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.globals.get::<S>()
    }

    /// Open a registry for one logical call.
    pub fn begin_scope(&self) -> CallScope {
        let id = Uuid::now_v7();
        let span = tracing::info_span!("call_scope", scope_id = %id);
        tracing::debug!(parent: &span, "call scope opened");

        CallScope {
            id,
            span,
            globals: Arc::clone(&self.globals),
            contexts: HashMap::new(),
            services: ServiceMap::new(),
        }
    }
}

struct ContextEntry {
    interface: &'static str,
    /// `Arc<I>` for the registered interface `I`.
    instance: Box<dyn Any + Send + Sync>,
    context: Arc<dyn DomainContext>,
}

/// Call-scoped registry: at most one live context per interface, plus
/// call-scoped services.
///
/// # Invariants
/// - Registering over a non-disposed context of the same interface fails.
/// - `default_context` resolves only when exactly one context is registered.
pub struct CallScope {
    id: Uuid,
    span: Span,
    globals: Arc<GlobalServices>,
    contexts: HashMap<TypeId, ContextEntry>,
    services: ServiceMap,
}

impl CallScope {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Tracing span covering this scope; enter it around scoped work.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Register `instance` as the live context for interface `I`.
    pub fn register_context<I>(&mut self, instance: Arc<I>) -> ContextResult<()>
    where
        I: ?Sized + DomainContext + 'static,
    {
        let interface = short_type_name::<I>();

        if let Some(existing) = self.contexts.get(&TypeId::of::<I>()) {
            if !existing.context.is_disposed() {
                tracing::warn!(parent: &self.span, interface, "domain context conflict");
                return Err(ContextError::Conflict { interface });
            }
        }

        let context = Arc::clone(&instance).into_domain_context();
        self.contexts.insert(
            TypeId::of::<I>(),
            ContextEntry {
                interface,
                instance: Box::new(instance),
                context,
            },
        );

        tracing::debug!(parent: &self.span, interface, "domain context registered");
        Ok(())
    }

    /// Remove the context for `I`, if any. The context is not disposed.
    pub fn unregister_context<I>(&mut self) -> Option<Arc<dyn DomainContext>>
    where
        I: ?Sized + DomainContext + 'static,
    {
        let removed = self.contexts.remove(&TypeId::of::<I>())?;
        tracing::debug!(parent: &self.span, interface = removed.interface, "domain context unregistered");
        Some(removed.context)
    }

    /// The live context registered for `I`.
    pub fn context<I>(&self) -> ContextResult<Arc<I>>
    where
        I: ?Sized + DomainContext + 'static,
    {
        self.contexts
            .get(&TypeId::of::<I>())
            .and_then(|entry| entry.instance.downcast_ref::<Arc<I>>())
            .cloned()
            .ok_or(ContextError::NotRegistered {
                interface: short_type_name::<I>(),
            })
    }

    pub fn has_context<I>(&self) -> bool
    where
        I: ?Sized + DomainContext + 'static,
    {
        self.contexts.contains_key(&TypeId::of::<I>())
    }

    /// The single registered context, whatever its interface.
    pub fn default_context(&self) -> ContextResult<Arc<dyn DomainContext>> {
        let mut entries = self.contexts.values();
        match (entries.next(), self.contexts.len()) {
            (None, _) => Err(ContextError::NoDefaultContext),
            (Some(entry), 1) => Ok(Arc::clone(&entry.context)),
            (Some(_), count) => Err(ContextError::AmbiguousDefaultContext { count }),
        }
    }

    /// Names of the registered context interfaces (unordered).
    pub fn contexts(&self) -> Vec<&'static str> {
        self.contexts.values().map(|entry| entry.interface).collect()
    }

    /// Register a service visible to this call only. Overwrites silently.
    pub fn register_context_service<S>(&mut self, service: Arc<S>)
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.services.insert(service);
    }

    pub fn context_service<S>(&self) -> ContextResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.services.get::<S>()
    }

    pub fn global_service<S>(&self) -> ContextResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.globals.get::<S>()
    }

    /// Call-scoped service if present, else the global one.
    pub fn service<S>(&self) -> ContextResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.context_service::<S>().or_else(|_| self.global_service::<S>())
    }

    /// Dispose and unregister every context, then end the scope.
    pub fn close(mut self) {
        for (_, entry) in self.contexts.drain() {
            entry.context.dispose();
        }
        tracing::debug!(parent: &self.span, "call scope closed");
    }
}

impl Drop for CallScope {
    fn drop(&mut self) {
        if !self.contexts.is_empty() {
            let open = self.contexts.values().filter(|e| !e.context.is_disposed()).count();
            tracing::debug!(parent: &self.span, registered = self.contexts.len(), open, "call scope dropped with contexts");
        }
    }
}

impl core::fmt::Debug for CallScope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CallScope")
            .field("id", &self.id)
            .field("contexts", &self.contexts())
            .field("services", &self.services)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DomainContextExt;
    use crate::testing::{NoteContext, Notes, OtherContext};

    #[test]
    fn register_then_resolve_by_interface() {
        let manager = DomainManager::new();
        let mut scope = manager.begin_scope();
        let ctx = Arc::new(NoteContext::default());

        scope.register_context::<dyn Notes>(ctx.clone()).unwrap();

        let resolved = scope.context::<dyn Notes>().unwrap();
        resolved.add_to_memory("hi".to_string());
        assert_eq!(ctx.memory_store::<String>(), vec!["hi".to_string()]);
        assert_eq!(scope.contexts(), vec!["Notes"]);
    }

    #[test]
    fn open_context_blocks_reregistration_until_disposed() {
        let manager = DomainManager::new();
        let mut scope = manager.begin_scope();
        let a = Arc::new(NoteContext::default());
        let b = Arc::new(NoteContext::default());

        scope.register_context::<dyn Notes>(a.clone()).unwrap();
        let err = scope.register_context::<dyn Notes>(b.clone()).unwrap_err();
        assert!(err.is_conflict());

        a.dispose();
        scope.register_context::<dyn Notes>(b.clone()).unwrap();
        assert!(Arc::ptr_eq(&scope.context::<dyn Notes>().unwrap(), &(b.clone() as Arc<dyn Notes>)));
    }

    #[test]
    fn unregister_allows_replacement_without_disposing() {
        let manager = DomainManager::new();
        let mut scope = manager.begin_scope();
        let a = Arc::new(NoteContext::default());

        scope.register_context::<dyn Notes>(a.clone()).unwrap();
        assert!(scope.unregister_context::<dyn Notes>().is_some());
        assert!(!a.is_disposed());
        assert!(scope.unregister_context::<dyn Notes>().is_none());

        scope.register_context::<dyn Notes>(Arc::new(NoteContext::default())).unwrap();
    }

    #[test]
    fn lookup_miss_is_an_error() {
        let scope = DomainManager::new().begin_scope();
        match scope.context::<dyn Notes>() {
            Err(ContextError::NotRegistered { interface }) => assert_eq!(interface, "Notes"),
            other => panic!("expected NotRegistered, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn default_context_requires_exactly_one() {
        let manager = DomainManager::new();
        let mut scope = manager.begin_scope();
        assert!(matches!(scope.default_context(), Err(ContextError::NoDefaultContext)));

        let notes = Arc::new(NoteContext::default());
        scope.register_context::<dyn Notes>(notes.clone()).unwrap();
        let default = scope.default_context().unwrap();
        default.dispose();
        assert!(notes.is_disposed());

        scope.register_context::<OtherContext>(Arc::new(OtherContext::default())).unwrap();
        assert!(matches!(
            scope.default_context(),
            Err(ContextError::AmbiguousDefaultContext { count: 2 })
        ));
    }

    #[test]
    fn scopes_are_isolated_but_share_globals() {
        let manager = DomainManager::new();
        manager.register_global_service::<String>(Arc::new("shared".to_string()));

        let mut first = manager.begin_scope();
        let second = manager.begin_scope();
        assert_ne!(first.id(), second.id());

        first.register_context::<dyn Notes>(Arc::new(NoteContext::default())).unwrap();
        first.register_context_service::<u32>(Arc::new(7));

        assert!(second.context::<dyn Notes>().is_err());
        assert!(second.context_service::<u32>().is_err());
        assert_eq!(*first.context_service::<u32>().unwrap(), 7);
        assert_eq!(second.global_service::<String>().unwrap().as_str(), "shared");
        assert_eq!(first.service::<String>().unwrap().as_str(), "shared");
    }

    #[test]
    fn context_service_shadows_global() {
        let manager = DomainManager::new();
        manager.register_global_service::<String>(Arc::new("global".to_string()));
        let mut scope = manager.begin_scope();
        scope.register_context_service::<String>(Arc::new("local".to_string()));

        assert_eq!(scope.service::<String>().unwrap().as_str(), "local");
        assert_eq!(manager.global_service::<String>().unwrap().as_str(), "global");
    }

    #[test]
    fn close_disposes_everything() {
        let manager = DomainManager::new();
        let mut scope = manager.begin_scope();
        let ctx = Arc::new(NoteContext::default());
        scope.register_context::<dyn Notes>(ctx.clone()).unwrap();

        scope.close();
        assert!(ctx.is_disposed());
    }
}
