//! Collaborators the store uses to stamp audit fields.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

use baseframework_core::UserRef;

/// Source of "now" for audit timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Who is acting, for `created_by`/`updated_by`.
pub trait UserProvider: Send + Sync {
    fn current_user(&self) -> Option<UserRef>;
}

/// Always the same user (or nobody).
#[derive(Debug, Clone, Default)]
pub struct StaticUser(Option<UserRef>);

impl StaticUser {
    pub fn new(user: UserRef) -> Self {
        Self(Some(user))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl UserProvider for StaticUser {
    fn current_user(&self) -> Option<UserRef> {
        self.0.clone()
    }
}
