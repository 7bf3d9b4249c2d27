//! Creation/modification provenance attached to entities.
//!
//! The persistence layer populates these fields; application code only reads
//! them. An entity opts in by returning its [`AuditInfo`] from
//! [`Entity::audit_mut`](crate::entity::Entity::audit_mut), so the contract is
//! capability-based rather than tied to a shared base type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::UserRef;

/// Who created/updated an entity, and when.
///
/// # Invariants
/// - `created_by`/`created_at` are written once, on first persistence.
/// - `updated_by`/`updated_at` are refreshed on every committed mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditInfo {
    pub created_by: Option<UserRef>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_by: Option<UserRef>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AuditInfo {
    /// Stamp a row that is being inserted.
    pub fn stamp_created(&mut self, user: Option<UserRef>, at: DateTime<Utc>) {
        self.created_by = user.clone();
        self.created_at = Some(at);
        self.updated_by = user;
        self.updated_at = Some(at);
    }

    /// Stamp a row that is being updated; creation fields come from the stored row.
    pub fn stamp_updated(&mut self, stored: Option<&AuditInfo>, user: Option<UserRef>, at: DateTime<Utc>) {
        if let Some(stored) = stored {
            self.created_by = stored.created_by.clone();
            self.created_at = stored.created_at;
        }
        self.updated_by = user;
        self.updated_at = Some(at);
    }

    pub fn is_stamped(&self) -> bool {
        self.created_at.is_some()
    }
}

/// Structural audit contract: anything exposing an [`AuditInfo`].
pub trait Auditable {
    fn audit_info(&self) -> &AuditInfo;
    fn audit_info_mut(&mut self) -> &mut AuditInfo;

    fn created_by(&self) -> Option<&UserRef> {
        self.audit_info().created_by.as_ref()
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.audit_info().created_at
    }

    fn updated_by(&self) -> Option<&UserRef> {
        self.audit_info().updated_by.as_ref()
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.audit_info().updated_at
    }
}

impl Auditable for AuditInfo {
    fn audit_info(&self) -> &AuditInfo {
        self
    }

    fn audit_info_mut(&mut self) -> &mut AuditInfo {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::EntityId;
    use chrono::TimeZone;

    fn user(code: &str) -> UserRef {
        UserRef::new(EntityId::new(1), code)
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn created_stamp_fills_all_fields() {
        let mut info = AuditInfo::default();
        assert!(!info.is_stamped());

        info.stamp_created(Some(user("alice")), at(9));

        assert!(info.is_stamped());
        assert_eq!(info.created_by().map(|u| u.user_code.as_str()), Some("alice"));
        assert_eq!(info.created_at(), Some(at(9)));
        assert_eq!(info.updated_at(), Some(at(9)));
    }

    #[test]
    fn updated_stamp_preserves_creation() {
        let mut stored = AuditInfo::default();
        stored.stamp_created(Some(user("alice")), at(9));

        // Caller tampered with creation fields; the stored row wins.
        let mut incoming = stored.clone();
        incoming.created_at = Some(at(23));
        incoming.created_by = Some(user("mallory"));

        incoming.stamp_updated(Some(&stored), Some(user("bob")), at(11));

        assert_eq!(incoming.created_at, Some(at(9)));
        assert_eq!(incoming.created_by, Some(user("alice")));
        assert_eq!(incoming.updated_by, Some(user("bob")));
        assert_eq!(incoming.updated_at, Some(at(11)));
    }
}
