//! Log output setup

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::{ExtensionError, Result};

/// Install the global fmt subscriber
///
/// Returns `false` when a subscriber was already installed, which makes it
/// safe to call from tests and embedding hosts alike.
pub fn init(config: &LoggingConfig) -> Result<bool> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| ExtensionError::config_error("logging.filter", e.to_string()))?;

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(true)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(filter = %config.filter, "Logging initialized");
    }
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_filter_is_a_config_error() {
        let config = LoggingConfig { filter: "framelink=loud".to_string(), ansi: false };
        let err = init(&config).unwrap_err();
        assert!(matches!(err, ExtensionError::Config { .. }));
    }

    #[test]
    fn second_init_is_harmless() {
        let config = LoggingConfig { filter: "warn".to_string(), ansi: false };
        let _ = init(&config).unwrap();
        assert!(!init(&config).unwrap());
    }
}
