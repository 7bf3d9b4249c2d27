use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use baseframework_context::{DomainContext, EntityStore};
use baseframework_core::{
    AuditInfo, Auditable, DomainError, DomainResult, Entity, EntityId, UserEntity,
    impl_entity_identity,
};

/// Error code: the customer name is blank.
pub const NAME_REQUIRED: &str = "CustomerNameRequired";

/// Error code: the registration date lies after the reference time.
pub const REGISTERED_IN_FUTURE: &str = "CustomerRegisteredInFuture";

/// Auditable customer record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    id: EntityId,
    name: String,
    registered_at: DateTime<Utc>,
    #[serde(default)]
    audit: AuditInfo,
}

impl Customer {
    pub fn new(name: impl Into<String>, registered_at: DateTime<Utc>) -> Self {
        Self {
            id: EntityId::NONE,
            name: name.into(),
            registered_at,
            audit: AuditInfo::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    /// Change the display name. Blank names are rejected and leave the customer unchanged.
    pub fn rename(&mut self, name: impl Into<String>) -> DomainResult<()> {
        let name = name.into();
        ensure_name(&name)?;
        self.name = name;
        Ok(())
    }

    /// Business rules a customer must satisfy before it is persisted.
    ///
    /// - the name is not blank
    /// - the registration date is not later than `as_of`
    pub fn ensure_registrable(&self, as_of: DateTime<Utc>) -> DomainResult<()> {
        ensure_name(&self.name)?;

        if self.registered_at > as_of {
            return Err(DomainError::with_code_template(
                REGISTERED_IN_FUTURE,
                "registration date [{0}] is later than [{1}]",
                [self.registered_at.to_rfc3339(), as_of.to_rfc3339()],
            )
            .with_entry("customer", self.name.clone()));
        }

        Ok(())
    }
}

fn ensure_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::with_code(NAME_REQUIRED, "customer name cannot be empty"));
    }
    Ok(())
}

impl Entity for Customer {
    fn id(&self) -> EntityId {
        self.id
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn audit(&self) -> Option<&AuditInfo> {
        Some(&self.audit)
    }

    fn audit_mut(&mut self) -> Option<&mut AuditInfo> {
        Some(&mut self.audit)
    }
}

impl Auditable for Customer {
    fn audit_info(&self) -> &AuditInfo {
        &self.audit
    }

    fn audit_info_mut(&mut self) -> &mut AuditInfo {
        &mut self.audit
    }
}

impl_entity_identity!(Customer);

/// Context interface of the customers domain.
///
/// Any context that stores both customers and users qualifies; register one
/// with `scope.register_context::<dyn CustomerContext>(..)`.
pub trait CustomerContext: DomainContext + EntityStore<Customer> + EntityStore<UserEntity> {}

impl<C> CustomerContext for C where C: DomainContext + EntityStore<Customer> + EntityStore<UserEntity> {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn new_customer_is_unassigned_and_unaudited() {
        let customer = Customer::new("Acme", noon());
        assert!(customer.is_new());
        assert!(customer.created_at().is_none());
        assert_eq!(customer.name(), "Acme");
    }

    #[test]
    fn registrable_when_named_and_not_in_future() {
        let customer = Customer::new("Acme", noon());
        assert!(customer.ensure_registrable(noon()).is_ok());
        assert!(customer.ensure_registrable(noon() + Duration::days(1)).is_ok());
    }

    #[test]
    fn blank_name_is_rejected_with_code() {
        let customer = Customer::new("   ", noon());
        let err = customer.ensure_registrable(noon()).unwrap_err();
        assert!(err.has_code(NAME_REQUIRED));
    }

    #[test]
    fn future_registration_carries_formatted_message_and_args() {
        let customer = Customer::new("Acme", noon() + Duration::hours(1));
        let err = customer.ensure_registrable(noon()).unwrap_err();

        assert_eq!(err.code(), Some(REGISTERED_IN_FUTURE));
        assert_eq!(err.args().len(), 2);
        assert!(err.message().starts_with("registration date [2024-06-01T13:00:00"));
        assert!(!err.message().contains("{0}"));
        assert_eq!(err.data().get("customer").and_then(|v| v.as_str()), Some("Acme"));
    }

    #[test]
    fn rename_rejects_blank_and_keeps_old_name() {
        let mut customer = Customer::new("Acme", noon());
        assert!(customer.rename("").is_err());
        assert_eq!(customer.name(), "Acme");

        customer.rename("Acme Ltd").unwrap();
        assert_eq!(customer.name(), "Acme Ltd");
    }

    #[test]
    fn identity_follows_assigned_id() {
        let mut a = Customer::new("A", noon());
        let mut b = Customer::new("B", noon());
        assert_ne!(a, b);

        a.assign_id(EntityId::new(3));
        b.assign_id(EntityId::new(3));
        assert_eq!(a, b);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn whitespace_only_names_never_register(name in "[ \t\n]{0,8}") {
                let customer = Customer::new(name, noon());
                prop_assert!(customer.ensure_registrable(noon()).is_err());
            }

            #[test]
            fn past_registrations_with_names_always_register(name in "[A-Za-z][A-Za-z ]{0,20}", days in 0i64..3650) {
                let customer = Customer::new(name, noon() - Duration::days(days));
                prop_assert!(customer.ensure_registrable(noon()).is_ok());
            }
        }
    }
}
