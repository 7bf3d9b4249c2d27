//! Optimistic concurrency expectations for store snapshots.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Optimistic concurrency expectation against a monotonically increasing version.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpectedVersion {
    /// Skip version checking.
    Any,
    /// Require the target to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> Result<(), DomainError> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::with_code(
                "Conflict",
                format!("optimistic concurrency check failed (expected: {self:?}, actual: {actual})"),
            )
            .with_entry("actual", actual))
        }
    }
}
