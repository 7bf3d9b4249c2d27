//! Customers domain module.
//!
//! A small business domain built on the framework: the `Customer` entity and
//! its registration rules, the context interface it is persisted through, and
//! a service that resolves that context from a call scope.

pub mod customer;
pub mod service;

pub use customer::{Customer, CustomerContext, NAME_REQUIRED, REGISTERED_IN_FUTURE};
pub use service::CustomerService;
