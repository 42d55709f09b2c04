//! # Telemetry Configuration

use serde::{Deserialize, Serialize};

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive set, e.g. `info` or `info,lc::dag=debug`.
    pub filter: String,
    /// Coloured output.
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// Read settings from `LC_LOG` / `LC_LOG_ANSI`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            filter: std::env::var("LC_LOG").unwrap_or(defaults.filter),
            ansi: std::env::var("LC_LOG_ANSI")
                .map(|v| v != "0")
                .unwrap_or(defaults.ansi),
        }
    }
}
