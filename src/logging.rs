use std::fs;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;
use crate::error::{StudioError, StudioResult};

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"))
    })
}

/// Installs the global subscriber: always a file layer, plus stderr when
/// `console` is set. Keep the returned guard alive to flush the file writer.
pub fn init_tracing(config: &LoggingConfig) -> StudioResult<WorkerGuard> {
    fs::create_dir_all(&config.dir)?;

    let file_appender = tracing_appender::rolling::never(&config.dir, &config.file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Layer for file (always active)
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);

    let console_layer = config
        .console
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| StudioError::Logging(e.to_string()))?;

    Ok(guard)
}
