//! Tracing setup for the service binary.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// File name prefix for rolling log files.
const LOG_FILE_PREFIX: &str = "kyc-onboarding.log";

/// Install the global subscriber: `RUST_LOG` filter (default `info`), compact
/// stderr output, and a daily-rolling file when `log_dir` is set.
///
/// Keep the returned guard alive for the life of the process so buffered
/// file output is flushed.
pub fn init(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>, TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}
