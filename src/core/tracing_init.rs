use crate::core::config::LoggingConfig;
use anyhow::{Context, Result};
use tracing_subscriber::{filter::Directive, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Dependencies that are too chatty at the portal's own level
const QUIET_TARGETS: &[&str] = &["hyper_util=warn", "reqwest=warn"];

/// `RUST_LOG` wins; otherwise the configured level
fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_for_level(&config.level))
}

fn filter_for_level(level: &str) -> EnvFilter {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    QUIET_TARGETS
        .iter()
        .filter_map(|target| target.parse::<Directive>().ok())
        .fold(filter, |filter, directive| filter.add_directive(directive))
}

pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let use_console = config.console || config.format == "console";

    let result = if use_console {
        // Human-readable output for local development
        tracing_subscriber::registry()
            .with(env_filter(config))
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_ansi(true)
                    .with_line_number(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter(config))
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()
    };

    result.context("Failed to install tracing subscriber")
}
