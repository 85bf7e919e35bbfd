//!
//! src/logging.rs
//!
//! Initializes the logger; events go to stderr so the table and
//! any redirected output stay clean
//!

use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use tracing_error::ErrorLayer;
use tracing_appender::non_blocking;

use crate::config::{LogFormat, LoggingConfig};

pub struct LoggingGuard(#[allow(dead_code)] tracing_appender::non_blocking::WorkerGuard);

pub fn init_logging(cfg: &LoggingConfig) ->
    Result<LoggingGuard, crate::errors::ScrapeError> {

    let (writer, guard) = non_blocking(std::io::stderr());
    let filter = std::env::var("RUST_LOG")
        .ok()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(cfg.filter_directives.clone()));

    match cfg.format {
        LogFormat::Json => {
            let time = tracing_subscriber::fmt::time::UtcTime::rfc_3339();
            let fmt_layer = fmt::layer()
                .with_writer(writer)
                .with_timer(time)
                .with_target(cfg.include_target)
                .with_file(cfg.include_file_line)
                .with_line_number(cfg.include_file_line)
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .with(ErrorLayer::default())
                .init();
        }
        LogFormat::Pretty => {
            let time = tracing_subscriber::fmt::time::UtcTime::rfc_3339();
            let fmt_layer = fmt::layer()
                .with_writer(writer)
                .with_timer(time)
                .with_ansi(cfg.with_ansi)
                .with_target(cfg.include_target)
                .with_file(cfg.include_file_line)
                .with_line_number(cfg.include_file_line);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .with(ErrorLayer::default())
                .init();
        }
    }

    Ok( LoggingGuard(guard) )
}
