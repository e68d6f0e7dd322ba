//! Logging initialisation via tracing-subscriber.
//!
//! Call [`init`] once at startup with the level resolved by
//! [`config`](crate::config), which has already validated it. Output goes to
//! stderr so rendered pages on stdout stay clean.

use std::env;

use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Initialise the global tracing subscriber.
///
/// `from_flag` marks a level given on the command line; it then wins over
/// `RUST_LOG`. Otherwise a valid `RUST_LOG` wins over the configured level.
pub fn init(level: &str, from_flag: bool) -> Result<(), AppError> {
    let rust_log = env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(filter(level, from_flag, rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

/// Pick the filter. A malformed `RUST_LOG` falls back to `level`.
fn filter(level: &str, from_flag: bool, rust_log: Option<&str>) -> EnvFilter {
    let configured = || EnvFilter::new(level);
    match rust_log.filter(|_| !from_flag) {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|_| configured()),
        None => configured(),
    }
}
