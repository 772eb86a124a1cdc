use std::sync::Arc;

use checkoutkit_core::{set_logger, LogLevel, Logger};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Routes core log records into `tracing`.
struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: String) {
        match level {
            LogLevel::Trace => tracing::trace!(target: "checkoutkit", "{message}"),
            LogLevel::Debug => tracing::debug!(target: "checkoutkit", "{message}"),
            LogLevel::Info => tracing::info!(target: "checkoutkit", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "checkoutkit", "{message}"),
            LogLevel::Error => tracing::error!(target: "checkoutkit", "{message}"),
        }
    }
}

/// Logs to stderr, filtered by `RUST_LOG` when set and by `default_directive` otherwise.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    set_logger(Arc::new(TracingLogger));
}
