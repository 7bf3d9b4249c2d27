//! Configuration loading and representation.
//!
//! Everything comes from environment variables; unset or malformed values fall
//! back to development defaults with a warning.

pub const DATABASE_VAR: &str = "BASEFRAMEWORK_DATABASE";
pub const SEED_DEMO_VAR: &str = "BASEFRAMEWORK_SEED_DEMO";
pub const OPERATOR_VAR: &str = "BASEFRAMEWORK_OPERATOR";

const DEFAULT_DATABASE: &str = "CBDevDb";
const DEFAULT_OPERATOR: &str = "system";

/// Store and harness settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Logical database name (used for logging and to tell stores apart).
    pub database: String,
    /// Seed sample rows on startup.
    pub seed_demo: bool,
    /// User code attributed to writes made by the harness.
    pub operator: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            seed_demo: true,
            operator: DEFAULT_OPERATOR.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let database = non_blank(lookup(DATABASE_VAR)).unwrap_or_else(|| {
            tracing::warn!("{DATABASE_VAR} not set; using {DEFAULT_DATABASE}");
            defaults.database.clone()
        });

        let seed_demo = match non_blank(lookup(SEED_DEMO_VAR)) {
            None => defaults.seed_demo,
            Some(raw) => parse_flag(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "{SEED_DEMO_VAR} is not a boolean; using {}", defaults.seed_demo);
                defaults.seed_demo
            }),
        };

        let operator = non_blank(lookup(OPERATOR_VAR)).unwrap_or_else(|| {
            tracing::warn!("{OPERATOR_VAR} not set; attributing writes to {DEFAULT_OPERATOR}");
            defaults.operator.clone()
        });

        Self {
            database,
            seed_demo,
            operator,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(StoreConfig::from_lookup(lookup(&[])), StoreConfig::default());
    }

    #[test]
    fn reads_all_variables() {
        let cfg = StoreConfig::from_lookup(lookup(&[
            (DATABASE_VAR, " CBTestDb "),
            (SEED_DEMO_VAR, "off"),
            (OPERATOR_VAR, "E1024"),
        ]));
        assert_eq!(cfg.database, "CBTestDb");
        assert!(!cfg.seed_demo);
        assert_eq!(cfg.operator, "E1024");
    }

    #[test]
    fn malformed_flag_falls_back() {
        let cfg = StoreConfig::from_lookup(lookup(&[(SEED_DEMO_VAR, "maybe")]));
        assert!(cfg.seed_demo);
    }
}
