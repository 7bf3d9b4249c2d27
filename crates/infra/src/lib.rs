//! Infrastructure layer: the in-memory backing store, the concrete domain
//! context over it, audit collaborators and configuration.

pub mod audit;
pub mod config;
pub mod store;


pub use audit::{Clock, FixedClock, StaticUser, SystemClock, UserProvider};
pub use config::StoreConfig;
pub use store::{InMemoryDatabase, InMemoryDomainContext, StoreError, Table};
