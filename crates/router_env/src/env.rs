//!
//! Current environment related stuff.
//!

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Parent dir where Cargo.toml is stored
pub const CARGO_MANIFEST_DIR: &str = "CARGO_MANIFEST_DIR";
/// Env variable that sets Development/Production env
pub const RUN_ENV: &str = "RUN_ENV";

///
/// Current environment.
///
#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, Display, EnumString, PartialEq, Eq)]
pub enum Env {
    /// Development environment.
    #[default]
    Development,
    /// Sandbox environment.
    Sandbox,
    /// Production environment.
    Production,
}

impl Env {
    /// Name of the config file, without extension, loaded for this environment.
    pub fn config_file_stem(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Sandbox => "sandbox",
            Self::Production => "production",
        }
    }
}

/// Name of current environment. Either "Development", "Sandbox" or "Production".
pub fn which() -> Env {
    #[cfg(debug_assertions)]
    let default_env = Env::Development;
    #[cfg(not(debug_assertions))]
    let default_env = Env::Production;

    std::env::var(RUN_ENV).map_or_else(|_| default_env, |v| v.parse().unwrap_or(default_env))
}

/// Base path to look for `config/` and `logs/`.
///
/// Binaries may be started from the workspace root or from a crate directory. When cargo sets
/// `CARGO_MANIFEST_DIR` the workspace root is two levels above it, otherwise the current
/// directory is used.
pub fn workspace_path() -> PathBuf {
    if let Ok(manifest_dir) = std::env::var(CARGO_MANIFEST_DIR) {
        let mut path = PathBuf::from(manifest_dir);
        path.pop();
        path.pop();
        path
    } else {
        PathBuf::from(".")
    }
}

///
/// Service name deduced from name of the crate.
///
/// Example: `router`.
///
#[macro_export]
macro_rules! service_name {
    () => {
        env!("CARGO_CRATE_NAME")
    };
}
