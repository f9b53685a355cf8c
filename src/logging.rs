//! Tracing subscriber setup.
//!
//! Logs go to stderr so stdout stays free for the terminal gate. The level
//! comes from `RUST_LOG` when set, otherwise from the `--verbose` flag.

use crate::constants::{DEFAULT_LOG_LEVEL, LOG_FORMAT_JSON, VERBOSE_LOG_LEVEL};
use crate::errors::{AppError, AppResult};
use std::io;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Picks the filter: `RUST_LOG` wins, then `--verbose`, then the default level.
pub fn build_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            VERBOSE_LOG_LEVEL
        } else {
            DEFAULT_LOG_LEVEL
        })
    })
}

/// Installs the global subscriber in text or JSON format.
///
/// # Errors
///
/// Returns `AppError::Config` if a global subscriber is already installed.
pub fn init_tracing(log_format: &str, verbose: bool) -> AppResult<()> {
    let filter = build_filter(verbose);
    let registry = tracing_subscriber::registry().with(filter);

    let result = if log_format == LOG_FORMAT_JSON {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_timer(ChronoLocal::rfc_3339())
                    .with_writer(io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_timer(ChronoLocal::rfc_3339())
                    .with_writer(io::stderr),
            )
            .try_init()
    };

    result.map_err(|e| AppError::Config(format!("Failed to initialize logging: {}", e)))
}
