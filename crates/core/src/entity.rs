//! Entity trait: identity + continuity across state changes.
//!
//! Every persisted object carries a store-assigned [`EntityId`]. Two entities
//! are equal when both ids are assigned and match. When both are still
//! [`EntityId::NONE`], equality falls back to "same object in memory".
//!
//! Callers must not change an entity's id after placing it in an id-sensitive
//! container (`HashSet`, `HashMap` key); the hash changes with the id.

use core::hash::{Hash, Hasher};

use crate::audit::AuditInfo;
use crate::id::{EntityId, EntityKey};

/// Entity marker + minimal interface.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Returns the entity identifier.
    fn id(&self) -> EntityId;

    /// Store-side id assignment. Application code should not call this.
    fn assign_id(&mut self, id: EntityId);

    /// `true` until the store has assigned an identifier.
    fn is_new(&self) -> bool {
        self.id().is_none()
    }

    /// Primary-key values used by `find`. Defaults to the single id.
    fn key(&self) -> EntityKey {
        EntityKey::from(self.id())
    }

    /// Audit fields, for entities that carry them.
    fn audit(&self) -> Option<&AuditInfo> {
        None
    }

    fn audit_mut(&mut self) -> Option<&mut AuditInfo> {
        None
    }
}

/// Identity comparison shared by all entity types.
pub fn entity_eq<T: Entity>(a: &T, b: &T) -> bool {
    let (left, right) = (a.id(), b.id());
    if left.is_none() && right.is_none() {
        return core::ptr::eq(a, b);
    }
    left == right
}

/// Hash consistent with [`entity_eq`].
pub fn entity_hash<T: Entity, H: Hasher>(entity: &T, state: &mut H) {
    let id = entity.id();
    if id.is_none() {
        core::ptr::hash(entity, state);
    } else {
        id.hash(state);
    }
}

/// Derive `PartialEq`, `Eq` and `Hash` from entity identity.
///
/// ```ignore
/// #[derive(Debug, Clone)]
/// struct Customer { id: EntityId, name: String }
///
/// impl Entity for Customer { /* ... */ }
/// impl_entity_identity!(Customer);
/// ```
#[macro_export]
macro_rules! impl_entity_identity {
    ($t:ty) => {
        impl ::core::cmp::PartialEq for $t {
            fn eq(&self, other: &Self) -> bool {
                $crate::entity::entity_eq(self, other)
            }
        }

        impl ::core::cmp::Eq for $t {}

        impl ::core::hash::Hash for $t {
            fn hash<H: ::core::hash::Hasher>(&self, state: &mut H) {
                $crate::entity::entity_hash(self, state)
            }
        }
    };
}
