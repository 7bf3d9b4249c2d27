//! Application service for the customers domain.
//!
//! Every mutating call validates, stages, submits and commits through the
//! call's [`CustomerContext`], so it also flushes whatever else is pending on
//! that context.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use baseframework_context::{
    CallScope, ContextError, ContextResult, DomainContext, DomainContextExt, EntityStore,
    SubmitSummary,
};
use baseframework_core::{Entity, EntityId, UserEntity};

use crate::customer::{Customer, CustomerContext};

pub struct CustomerService {
    context: Arc<dyn CustomerContext>,
}

impl CustomerService {
    pub fn new(context: Arc<dyn CustomerContext>) -> Self {
        Self { context }
    }

    /// Use the customer context registered in `scope`.
    pub fn from_scope(scope: &CallScope) -> ContextResult<Self> {
        Ok(Self::new(scope.context::<dyn CustomerContext>()?))
    }

    pub fn context(&self) -> &Arc<dyn CustomerContext> {
        &self.context
    }

    /// Persist a new customer and return the stored row (id and audit filled in).
    pub fn register(&self, customer: Customer, as_of: DateTime<Utc>) -> ContextResult<Customer> {
        customer.ensure_registrable(as_of)?;

        EntityStore::<Customer>::add(&*self.context, customer);
        let id = self.flush_inserting::<Customer>()?;

        tracing::info!(customer_id = %id, "customer registered");
        self.stored(id)
    }

    pub fn rename(&self, id: EntityId, name: &str) -> ContextResult<Customer> {
        let mut customer = self.stored(id)?;
        customer.rename(name)?;

        EntityStore::<Customer>::modify(&*self.context, &customer)?;
        self.flush()?;

        tracing::info!(customer_id = %id, "customer renamed");
        self.stored(id)
    }

    pub fn remove(&self, id: EntityId) -> ContextResult<()> {
        let customer = self.stored(id)?;
        EntityStore::<Customer>::remove(&*self.context, &customer)?;
        self.flush()?;

        tracing::info!(customer_id = %id, "customer removed");
        Ok(())
    }

    pub fn find(&self, id: EntityId) -> Option<Customer> {
        self.context.find_by::<Customer>(id)
    }

    /// All customers ordered by name, then id.
    pub fn list(&self) -> Vec<Customer> {
        let mut customers = self.context.query::<Customer>().to_vec();
        customers.sort_by(|a, b| a.name().cmp(b.name()).then(a.id().cmp(&b.id())));
        customers
    }

    pub fn registered_since(&self, since: DateTime<Utc>) -> Vec<Customer> {
        self.context
            .query_where(move |c: &Customer| c.registered_at() >= since)
            .to_vec()
    }

    /// The user with `user_code`, created if it does not exist yet.
    pub fn ensure_user(&self, user_code: &str, user_name: &str) -> ContextResult<UserEntity> {
        if let Some(user) = self.find_user(user_code) {
            return Ok(user);
        }

        EntityStore::<UserEntity>::add(&*self.context, UserEntity::new(user_code, user_name));
        let id = self.flush_inserting::<UserEntity>()?;

        tracing::info!(user_id = %id, user_code, "user created");
        self.context
            .find_by::<UserEntity>(id)
            .ok_or(ContextError::not_tracked::<UserEntity>(id))
    }

    pub fn find_user(&self, user_code: &str) -> Option<UserEntity> {
        let code = user_code.to_string();
        self.context
            .query_where(move |u: &UserEntity| u.user_code == code)
            .first()
    }

    fn stored(&self, id: EntityId) -> ContextResult<Customer> {
        self.find(id).ok_or(ContextError::not_tracked::<Customer>(id))
    }

    fn flush(&self) -> ContextResult<SubmitSummary> {
        let summary = self.context.submit_changes()?;
        self.context.commit_transaction()?;
        Ok(summary)
    }

    /// Flush after adding one `T`; returns the id of that `T`.
    ///
    /// The `T` added last is the one just queued, whatever else was pending.
    fn flush_inserting<T: Entity>(&self) -> ContextResult<EntityId> {
        self.flush()?
            .inserted_of::<T>()
            .last()
            .copied()
            .ok_or(ContextError::missing_insert::<T>())
    }
}

impl core::fmt::Debug for CustomerService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CustomerService")
            .field("disposed", &self.context.is_disposed())
            .finish()
    }
}
