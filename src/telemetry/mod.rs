//! Log subscriber setup.
//!
//! Library code only emits `tracing` events; binaries and tests that want
//! output call [`init_telemetry`] once at startup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::infra::{Result, VaultError};

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Emit events to stdout
    pub enable_console: bool,
    /// One JSON object per line instead of the compact format
    pub json_format: bool,
    /// `EnvFilter` directive, e.g. `info` or `fir_vault=debug`
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enable_console: true,
            json_format: false,
            log_level: "info".to_string(),
        }
    }
}

impl TelemetryConfig {
    pub fn from_env() -> Self {
        Self {
            enable_console: std::env::var("LOG_CONSOLE")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            json_format: std::env::var("LOG_JSON")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            log_level: std::env::var("LOG_LEVEL")
                .or_else(|_| std::env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),
        }
    }

    fn filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.log_level).map_err(|e| {
            VaultError::Configuration(format!("invalid log filter {:?}: {e}", self.log_level))
        })
    }
}

/// Install the global subscriber. Fails if one is already set.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(config.filter()?);

    let installed = match (config.enable_console, config.json_format) {
        (true, true) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        (true, false) => registry
            .with(tracing_subscriber::fmt::layer().with_target(true).compact())
            .try_init(),
        (false, _) => registry.try_init(),
    };

    installed.map_err(|e| VaultError::Internal(format!("failed to install log subscriber: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert!(config.enable_console);
        assert!(!config.json_format);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_filter_accepts_directives() {
        let config = TelemetryConfig {
            log_level: "warn,fir_vault=debug".to_string(),
            ..Default::default()
        };
        assert!(config.filter().is_ok());
    }

    #[test]
    fn test_filter_rejects_garbage() {
        let config = TelemetryConfig {
            log_level: "fir_vault=[".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.filter(), Err(VaultError::Configuration(_))));
    }
}
