use std::sync::Arc;

use anyhow::Context as _;
use chrono::{Duration, Utc};

use baseframework_context::{CallScope, DomainManager};
use baseframework_core::{Auditable, Entity, UserEntity};
use baseframework_customers::{Customer, CustomerContext, CustomerService};
use baseframework_infra::{
    Clock, InMemoryDatabase, InMemoryDomainContext, StaticUser, StoreConfig, SystemClock,
    UserProvider,
};

/// (name, days since registration)
const DEMO_CUSTOMERS: &[(&str, i64)] = &[
    ("Northwind Traders", 120),
    ("Contoso Ltd", 45),
    ("Fabrikam", 3),
];

/// Used when `RUST_LOG` is unset: store and registry seams at debug.
const DEFAULT_LOG_FILTER: &str = "info,baseframework_infra=debug,baseframework_context=debug";

fn main() -> anyhow::Result<()> {
    baseframework_observability::init_with_default(DEFAULT_LOG_FILTER);

    let config = StoreConfig::from_env();
    tracing::info!(
        database = %config.database,
        seed_demo = config.seed_demo,
        operator = %config.operator,
        "console harness starting"
    );

    let database = Arc::new(InMemoryDatabase::new(config.database.clone()));
    database.declare_unique::<UserEntity>("user_code", |u| u.user_code.clone());

    let manager = DomainManager::new();
    manager.register_global_service::<dyn Clock>(Arc::new(SystemClock));

    // The operator row has to exist before writes can be attributed to it.
    let operator = {
        let scope = open_scope(&manager, &database)?;
        let user = CustomerService::from_scope(&scope)?
            .ensure_user(&config.operator, &config.operator)
            .context("creating operator user")?;
        scope.close();
        user
    };
    manager.register_global_service::<dyn UserProvider>(Arc::new(StaticUser::new(operator.to_ref())));

    let scope = open_scope(&manager, &database)?;
    let outcome = scope.span().in_scope(|| run(&scope, &database, config.seed_demo));
    scope.close();
    outcome
}

/// Seed, reject a bad write, then list what the store holds.
fn run(scope: &CallScope, database: &InMemoryDatabase, seed_demo: bool) -> anyhow::Result<()> {
    let service = CustomerService::from_scope(scope)?;
    let now = Utc::now();

    if seed_demo && service.list().is_empty() {
        for (name, days) in DEMO_CUSTOMERS {
            service
                .register(Customer::new(*name, now - Duration::days(*days)), now)
                .with_context(|| format!("seeding customer {name}"))?;
        }
    }

    if let Err(error) = service.register(Customer::new("", now), now) {
        tracing::warn!(%error, "blank customer rejected");
    }

    let customers = service.list();
    for customer in &customers {
        tracing::info!(
            id = %customer.id(),
            name = customer.name(),
            registered_at = %customer.registered_at(),
            created_by = ?customer.created_by().map(|u| u.user_code.as_str()),
            "customer"
        );
    }

    tracing::info!(
        total = customers.len(),
        recent = service.registered_since(now - Duration::days(30)).len(),
        version = database.version(),
        "console harness finished"
    );
    Ok(())
}

fn open_scope(manager: &DomainManager, database: &Arc<InMemoryDatabase>) -> anyhow::Result<CallScope> {
    let mut scope = manager.begin_scope();
    let context = InMemoryDomainContext::for_scope(&scope, Arc::clone(database));
    scope.register_context::<dyn CustomerContext>(Arc::new(context))?;
    Ok(scope)
}
