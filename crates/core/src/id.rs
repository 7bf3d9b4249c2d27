//! Store-assigned identifiers and primary-key values.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Integer identifier assigned by the persistence layer.
///
/// A freshly constructed entity carries [`EntityId::NONE`] until the store
/// assigns a real value on submit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(i64);

impl EntityId {
    /// Sentinel for "not yet persisted".
    pub const NONE: EntityId = EntityId(-1);

    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    pub const fn is_none(self) -> bool {
        self.0 == Self::NONE.0
    }

    pub const fn is_assigned(self) -> bool {
        !self.is_none()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NONE
    }
}

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_none() {
            f.write_str("<new>")
        } else {
            core::fmt::Display::fmt(&self.0, f)
        }
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<EntityId> for i64 {
    fn from(value: EntityId) -> Self {
        value.0
    }
}

impl FromStr for EntityId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = i64::from_str(s.trim())
            .map_err(|e| DomainError::with_code("InvalidId", format!("EntityId: {e}")))?;
        Ok(Self(value))
    }
}

/// One component of a primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    Int(i64),
    Text(String),
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<EntityId> for KeyValue {
    fn from(value: EntityId) -> Self {
        Self::Int(value.value())
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Ordered primary-key values (single or composite).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(Vec<KeyValue>);

impl EntityKey {
    pub fn new(values: Vec<KeyValue>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[KeyValue] {
        &self.0
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }
}

impl From<EntityId> for EntityKey {
    fn from(value: EntityId) -> Self {
        Self(vec![KeyValue::from(value)])
    }
}

impl From<i64> for EntityKey {
    fn from(value: i64) -> Self {
        Self(vec![KeyValue::Int(value)])
    }
}

impl<const N: usize> From<[KeyValue; N]> for EntityKey {
    fn from(values: [KeyValue; N]) -> Self {
        Self(values.into())
    }
}

impl core::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("(")?;
        for (idx, value) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            match value {
                KeyValue::Int(v) => write!(f, "{v}")?,
                KeyValue::Text(v) => write!(f, "{v:?}")?,
            }
        }
        f.write_str(")")
    }
}
