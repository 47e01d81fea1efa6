//! Logging setup
//!
//! Console output is always on; when [`LoggingSettings::directory`] is
//! configured, log lines are additionally written to a daily rolling file
//! through a non-blocking worker, so slow disks never stall a pipeline
//! task. The returned [`LogGuard`] must live as long as the process;
//! dropping it flushes and stops the file writer.
//!
//! # Example
//!
//! ```rust,no_run
//! use ragkit_core::logging::init_logging;
//! use ragkit_core::settings::LoggingSettings;
//!
//! let _guard = init_logging(&LoggingSettings::from_env()).unwrap();
//! ```

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Error, Result};
use crate::settings::LoggingSettings;

/// Keeps the background file writer alive
pub struct LogGuard {
    _file_writer: Option<WorkerGuard>,
}

/// Install the global subscriber described by `settings`.
///
/// `RUST_LOG` still takes precedence over the configured default level.
pub fn init_logging(settings: &LoggingSettings) -> Result<LogGuard> {
    let default_level: Directive = settings.level.parse().map_err(|e| {
        Error::validation(format!("invalid log level '{}': {}", settings.level, e))
    })?;
    let filter = EnvFilter::builder()
        .with_default_directive(default_level)
        .from_env_lossy();
    let console = fmt::layer().with_target(false).compact();

    let file_writer = match &settings.directory {
        Some(directory) => {
            let (writer, guard) = tracing_appender::non_blocking(rolling::daily(
                directory,
                &settings.file_prefix,
            ));
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .try_init()
                .map_err(|e| Error::internal(format!("failed to init tracing: {}", e)))?;
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .try_init()
                .map_err(|e| Error::internal(format!("failed to init tracing: {}", e)))?;
            None
        }
    };

    Ok(LogGuard {
        _file_writer: file_writer,
    })
}
