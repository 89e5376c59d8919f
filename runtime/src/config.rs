//! Runtime configuration.
//!
//! [`LedgerConfig`] carries the few knobs the command layer has. Values come
//! from the process environment via [`LedgerConfig::from_env`], falling back
//! to defaults for anything unset.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `MISE_UPSTREAM_TIMEOUT_MS` | `10000` | Bound on every upstream call |
//! | `MISE_LOG` | `info` | `tracing` filter directives |
//!
//! # Example
//!
//! ```
//! use mise_runtime::config::LedgerConfig;
//! use std::time::Duration;
//!
//! let config = LedgerConfig::default()
//!     .with_upstream_timeout(Duration::from_millis(250))
//!     .with_log_filter("mise_runtime=debug");
//!
//! assert_eq!(config.upstream_timeout(), Duration::from_millis(250));
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the upstream timeout in milliseconds.
pub const UPSTREAM_TIMEOUT_VAR: &str = "MISE_UPSTREAM_TIMEOUT_MS";

/// Environment variable holding the log filter.
pub const LOG_FILTER_VAR: &str = "MISE_LOG";

const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_LOG_FILTER: &str = "info";

/// Errors from loading configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set to something that cannot be used
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        /// Variable name
        key: &'static str,
        /// The rejected value
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Configuration for the command layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Upper bound on any single upstream call, in milliseconds
    pub upstream_timeout_ms: u64,
    /// `tracing` filter directives (`EnvFilter` syntax)
    pub log_filter: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            upstream_timeout_ms: DEFAULT_UPSTREAM_TIMEOUT_MS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl LedgerConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is set but
    /// unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to
    /// its value (or `None` when unset).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is set but
    /// unusable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(UPSTREAM_TIMEOUT_VAR) {
            config.upstream_timeout_ms = parse_timeout(&raw)?;
        }

        if let Some(raw) = lookup(LOG_FILTER_VAR) {
            let filter = raw.trim();
            if !filter.is_empty() {
                config.log_filter = filter.to_string();
            }
        }

        Ok(config)
    }

    /// Set the upstream timeout
    #[must_use]
    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the log filter
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Upstream timeout as a [`Duration`].
    #[must_use]
    pub const fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }
}

fn parse_timeout(raw: &str) -> Result<u64, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        key: UPSTREAM_TIMEOUT_VAR,
        value: raw.to_string(),
        reason,
    };
    let millis: u64 = raw.trim().parse().map_err(|e| invalid(format!("{e}")))?;
    if millis == 0 {
        return Err(invalid("must be greater than zero".to_string()));
    }
    Ok(millis)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = LedgerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.upstream_timeout(), Duration::from_secs(10));
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn reads_both_variables() {
        let config = LedgerConfig::from_lookup(lookup(&[
            (UPSTREAM_TIMEOUT_VAR, " 1500 "),
            (LOG_FILTER_VAR, "mise_core=debug"),
        ]))
        .unwrap();
        assert_eq!(config.upstream_timeout(), Duration::from_millis(1500));
        assert_eq!(config.log_filter, "mise_core=debug");
    }

    #[test]
    fn blank_log_filter_keeps_default() {
        let config = LedgerConfig::from_lookup(lookup(&[(LOG_FILTER_VAR, "  ")])).unwrap();
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn rejects_bad_timeouts() {
        for raw in ["soon", "-5", "0"] {
            let err = LedgerConfig::from_lookup(lookup(&[(UPSTREAM_TIMEOUT_VAR, raw)])).unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue { key: UPSTREAM_TIMEOUT_VAR, .. }
            ));
        }
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: LedgerConfig = serde_json::from_str(r#"{"upstream_timeout_ms": 42}"#).unwrap();
        assert_eq!(config.upstream_timeout_ms, 42);
        assert_eq!(config.log_filter, "info");
    }

    proptest! {
        #[test]
        fn any_positive_timeout_is_accepted(millis in 1_u64..=u64::from(u32::MAX)) {
            let raw = millis.to_string();
            let config = LedgerConfig::from_lookup(lookup(&[(UPSTREAM_TIMEOUT_VAR, raw.as_str())])).unwrap();
            prop_assert_eq!(config.upstream_timeout(), Duration::from_millis(millis));
        }
    }
}
