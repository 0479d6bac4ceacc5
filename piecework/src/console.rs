//! Console logging setup.

use crate::config::ConsoleConfig;
use piecework_core::BoxError;
use tracing_subscriber::{EnvFilter, fmt};

/// Build the log filter: `RUST_LOG` when set, the configured level otherwise.
pub fn console_filter(config: &ConsoleConfig) -> Result<EnvFilter, BoxError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(&config.level)?),
    }
}

/// Install a global `tracing` subscriber writing to the console.
///
/// Fails if the level directive is invalid or a global subscriber is
/// already installed.
pub fn init_console(config: &ConsoleConfig) -> Result<(), BoxError> {
    let builder = fmt()
        .with_env_filter(console_filter(config)?)
        .with_target(false)
        .with_ansi(config.ansi);

    if config.timestamps {
        builder.try_init()
    } else {
        builder.without_time().try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_directive() {
        // Only meaningful when RUST_LOG does not take over.
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = ConsoleConfig {
            level: "piecework=notalevel".to_string(),
            ..ConsoleConfig::default()
        };
        assert!(console_filter(&config).is_err());
        assert!(console_filter(&ConsoleConfig::default()).is_ok());
    }
}
