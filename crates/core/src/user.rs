//! Users referenced for attribution (who created/updated what).

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::id::EntityId;

/// Contract shared by the framework user entity and any authentication-side user type.
pub trait UserBase: Entity {
    /// Unique external code (staff id, job id, ...).
    fn user_code(&self) -> &str;

    fn user_name(&self) -> &str;
}

/// The user entity used to track who created/updated records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntity {
    id: EntityId,
    pub user_code: String,
    pub user_name: String,
}

impl UserEntity {
    pub fn new(user_code: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            id: EntityId::NONE,
            user_code: user_code.into(),
            user_name: user_name.into(),
        }
    }

    pub fn to_ref(&self) -> UserRef {
        UserRef::from(self)
    }
}

impl Entity for UserEntity {
    fn id(&self) -> EntityId {
        self.id
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = id;
    }
}

impl UserBase for UserEntity {
    fn user_code(&self) -> &str {
        &self.user_code
    }

    fn user_name(&self) -> &str {
        &self.user_name
    }
}

crate::impl_entity_identity!(UserEntity);

/// Non-owning attribution handle stored in audit fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRef {
    pub id: EntityId,
    pub user_code: String,
}

impl UserRef {
    pub fn new(id: EntityId, user_code: impl Into<String>) -> Self {
        Self {
            id,
            user_code: user_code.into(),
        }
    }
}

impl<U: UserBase> From<&U> for UserRef {
    fn from(user: &U) -> Self {
        Self {
            id: user.id(),
            user_code: user.user_code().to_owned(),
        }
    }
}

impl core::fmt::Display for UserRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}#{}", self.user_code, self.id)
    }
}
