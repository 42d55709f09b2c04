//! # Lattice Telemetry
//!
//! Structured logging for the node.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lattice_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() {
//!     let _guard = init_logging(&TelemetryConfig::from_env()).expect("logging init");
//!     // subsystems log under lc::store, lc::dag, lc::processor, ...
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LC_LOG` | `info` | Log level / `EnvFilter` directive set |
//! | `LC_LOG_ANSI` | `1` | Coloured output |

mod config;

pub use config::TelemetryConfig;

use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

/// Telemetry initialization errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Logging already initialized")]
    AlreadyInitialized,
}

/// Guard that keeps the logging pipeline installed.
pub struct TelemetryGuard {
    _private: (),
}

/// Install the global tracing subscriber.
///
/// Returns a guard to hold for the lifetime of the process. Tests may call
/// this repeatedly; only the first installation wins.
pub fn init_logging(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| TelemetryError::Filter(e.to_string()))?;
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|_| TelemetryError::AlreadyInitialized)?;
    tracing::info!(target: "lc::telemetry", filter = %config.filter, "logging initialized");
    Ok(TelemetryGuard { _private: () })
}

/// Best-effort initialization for tests; ignores double installation.
pub fn try_init_for_tests() {
    let _ = init_logging(&TelemetryConfig {
        filter: "warn".to_string(),
        ansi: false,
    });
}
