//! Logging initialization
//!
//! Respects the standard `RUST_LOG` environment variable; a filter from the
//! config file applies only when `RUST_LOG` is unset, and the final fallback
//! is "info".

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn resolve_filter(filter: Option<&str>) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }
    match filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::new("info"),
    }
}

/// Initialize human-readable logging to stderr.
///
/// `filter` comes from the config file; `RUST_LOG` takes precedence.
pub fn init_logging(filter: Option<&str>) {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_ansi(std::env::var("NO_COLOR").is_err()),
        )
        .with(resolve_filter(filter))
        .init();
}

/// Initialize JSON-formatted logging, for log aggregation systems.
#[cfg(feature = "json-logging")]
pub fn init_json_logging(filter: Option<&str>) {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_current_span(true),
        )
        .with(resolve_filter(filter))
        .init();
}

/// Initialize logging from the loaded configuration.
pub fn init_logging_from_config(config: Option<&crate::config::LoggingConfig>) {
    let filter = config.and_then(|c| c.filter.as_deref());

    if config.map(|c| c.json_format).unwrap_or(false) {
        #[cfg(feature = "json-logging")]
        {
            init_json_logging(filter);
            return;
        }
    }
    init_logging(filter);
}
