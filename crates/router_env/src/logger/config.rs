//!
//! Logger-specific config.
//!

use std::path::PathBuf;

use serde::Deserialize;

/// Config used when a binary only needs logging, e.g. tests of this crate.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Logging to a file and to the console.
    pub log: Log,
}

/// Log config settings.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Log {
    /// Logging to a file.
    pub file: LogFile,
    /// Logging to a console.
    pub console: LogConsole,
}

/// Logging to a file.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogFile {
    /// Whether you want to store log in log files.
    pub enabled: bool,
    /// Where to store log files.
    pub path: String,
    /// Name of log file without suffix.
    pub file_name: String,
    /// What gets into log files.
    pub level: Level,
}

impl Default for LogFile {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "logs".into(),
            file_name: "debug.log".into(),
            level: Level(tracing::Level::DEBUG),
        }
    }
}

/// Describes the level of verbosity of a span or event.
#[derive(Debug, Clone, Copy)]
pub struct Level(pub(super) tracing::Level);

impl Level {
    /// Returns the most verbose [`tracing::Level`]
    pub fn into_level(self) -> tracing::Level {
        self.0
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use std::str::FromStr as _;

        let s = String::deserialize(deserializer)?;
        tracing::Level::from_str(&s)
            .map(Level)
            .map_err(serde::de::Error::custom)
    }
}

/// Logging to a console.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogConsole {
    /// Whether you want to see log in your terminal.
    pub enabled: bool,
    /// What you see in your terminal.
    pub level: Level,
    /// Log format
    pub log_format: LogFormat,
}

impl Default for LogConsole {
    fn default() -> Self {
        Self {
            enabled: true,
            level: Level(tracing::Level::INFO),
            log_format: LogFormat::Default,
        }
    }
}

/// Telemetry / tracing.
#[derive(Default, Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Default pretty log format
    #[default]
    Default,
    /// JSON based structured logging
    Json,
}

impl Config {
    /// Load the `[log]` section from `config/<env>.toml` under the workspace root, then from
    /// `ROUTER__LOG__*` environment variables. A missing file leaves the defaults in place.
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::new_with_config_path(None)
    }

    /// Same as [`Config::new`] with an explicit config file.
    pub fn new_with_config_path(explicit_config_path: Option<PathBuf>) -> Result<Self, config::ConfigError> {
        let config_path = explicit_config_path.unwrap_or_else(|| {
            let mut path = crate::env::workspace_path();
            path.push("config");
            path.push(format!("{}.toml", crate::env::which().config_file_stem()));
            path
        });

        config::Config::builder()
            .add_source(config::File::from(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("ROUTER")
                    .try_parsing(true)
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}
