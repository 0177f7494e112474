//!
//! Logger of the system.
//!

pub use tracing::{debug, error, event as log, info, instrument, warn};

pub mod config;
mod setup;
pub mod types;

pub use config::{Config, Level as LogLevel, Log, LogConsole, LogFile, LogFormat};
pub use setup::{setup, TelemetryGuard};
/// Returned by [`setup`] when a global subscriber is already installed.
pub use tracing_subscriber::util::TryInitError;
pub use types::{Flow, Tag};

/// Re-export of `tracing::Level` for filters.
pub use tracing::Level;
