use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or `restkit=debug`.
    pub log_level: String,

    /// Print events to stderr.
    pub enable_console: bool,

    /// Include the event target (module path) in console output.
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            enable_console: true,
            with_target: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ObservabilityError {
    #[error("Global subscriber already initialized")]
    AlreadyInitialized,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Install a global subscriber: `EnvFilter` plus an optional compact fmt layer.
///
/// `RUST_LOG` wins over `config.log_level`. Fails if a global subscriber is
/// already set.
pub fn init_logging(config: LoggingConfig) -> Result<(), ObservabilityError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| ObservabilityError::Config(format!("invalid log level: {e}")))?,
    };

    let fmt_layer = config.enable_console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(config.with_target)
            .with_writer(std::io::stderr)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|_| ObservabilityError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.log_level, "info");
        assert!(config.enable_console);
    }

    #[test]
    fn test_second_init_is_rejected() {
        let config = LoggingConfig {
            enable_console: false,
            ..LoggingConfig::default()
        };
        let _ = init_logging(config.clone());
        assert!(matches!(
            init_logging(config),
            Err(ObservabilityError::AlreadyInitialized)
        ));
    }
}
