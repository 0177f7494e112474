//!
//! Setup logging subsystem.
//!

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::config;

/// Keeps the non-blocking log writers alive. Logs are flushed when it is dropped.
#[derive(Debug)]
pub struct TelemetryGuard {
    _log_guards: Vec<WorkerGuard>,
}

/// Setup logging sub-system specifying.
/// Expects config and list of names of crates to watch.
///
/// Fails when a global subscriber has already been installed.
pub fn setup<Str: AsRef<str>>(
    conf: &config::Log,
    service_name: &str,
    crates_to_watch: impl IntoIterator<Item = Str>,
) -> Result<TelemetryGuard, tracing_subscriber::util::TryInitError> {
    let mut guards = Vec::new();

    let crates_to_watch: Vec<String> = crates_to_watch
        .into_iter()
        .map(|name| name.as_ref().to_owned())
        .collect();

    let file_layer = if conf.file.enabled {
        let mut path: PathBuf = crate::env::workspace_path();
        path.push(&conf.file.path);
        let file_appender = tracing_appender::rolling::hourly(&path, &conf.file.file_name);
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
        guards.push(guard);

        let file_filter = filter::Targets::new().with_default(conf.file.level.into_level());
        Some(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(file_writer)
                .with_filter(file_filter),
        )
    } else {
        None
    };

    let console_layer = if conf.console.enabled {
        let (console_writer, guard) = tracing_appender::non_blocking(std::io::stdout());
        guards.push(guard);

        let level = conf.console.level.into_level();
        let console_filter = crates_to_watch.iter().fold(
            filter::Targets::new().with_default(tracing::Level::WARN),
            |filter, krate| filter.with_target(krate.as_str(), level),
        );

        let layer = match conf.console.log_format {
            config::LogFormat::Default => fmt::layer()
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_span_events(fmt::format::FmtSpan::CLOSE)
                .pretty()
                .with_writer(console_writer)
                .with_filter(console_filter)
                .boxed(),
            config::LogFormat::Json => fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(console_writer)
                .with_filter(console_filter)
                .boxed(),
        };
        Some(layer)
    } else {
        None
    };

    // `RUST_LOG` overrides the config settings.
    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .with(
            EnvFilter::builder()
                .with_default_directive(tracing::Level::TRACE.into())
                .from_env_lossy(),
        )
        .try_init()?;

    tracing::info!(service = service_name, watched = ?crates_to_watch, "logger initialised");

    Ok(TelemetryGuard {
        _log_guards: guards,
    })
}
