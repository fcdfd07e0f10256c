use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_DIR: &str = "logs";
const LOG_FILE_PREFIX: &str = "gateway.log";
const DEFAULT_FILTER: &str = "waitlist_gateway=info,warn";

/// Installs the global subscriber: human-readable lines on stdout plus one
/// JSON object per event in `logs/gateway.log.<date>`. `RUST_LOG` overrides
/// the default filter.
pub fn init_logging() {
    // File output is optional; stdout still works without the directory
    if let Err(e) = fs::create_dir_all(LOG_DIR) {
        eprintln!("log directory '{}' unavailable: {}", LOG_DIR, e);
    }

    let appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_writer(writer))
        .with(fmt::layer().with_target(true).with_writer(std::io::stdout))
        .init();

    // Dropping the guard stops the background writer
    std::mem::forget(guard);
}
