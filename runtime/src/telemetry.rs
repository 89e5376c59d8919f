//! Tracing initialisation.

use crate::config::{ConfigError, LOG_FILTER_VAR, LedgerConfig};
use tracing_subscriber::EnvFilter;

/// Installs a global `fmt` subscriber filtered by `config.log_filter`.
///
/// Calling this more than once (common in tests) is harmless: the first
/// subscriber stays installed and later calls log a warning.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if the filter directives do not
/// parse.
pub fn init_tracing(config: &LedgerConfig) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_new(&config.log_filter).map_err(|e| ConfigError::InvalidValue {
        key: LOG_FILTER_VAR,
        value: config.log_filter.clone(),
        reason: e.to_string(),
    })?;

    match tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        Ok(()) => {
            tracing::info!(filter = %config.log_filter, "tracing initialised");
        }
        Err(_) => {
            tracing::warn!("Tracing subscriber already installed, skipping re-initialization");
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn invalid_filter_is_a_config_error() {
        let config = LedgerConfig::default().with_log_filter("mise_core=loud");
        let err = init_tracing(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: LOG_FILTER_VAR, .. }));
    }

    #[test]
    fn repeated_initialisation_is_harmless() {
        let config = LedgerConfig::default().with_log_filter("warn");
        init_tracing(&config).unwrap();
        init_tracing(&config).unwrap();
    }
}
