//! Tracing subscriber setup.

use tracing::Level;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` overrides the level chosen by `--verbose`.
pub fn init(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .without_time();

    tracing_subscriber::registry()
        .with(build_env_filter(level))
        .with(layer)
        .init();
}

/// Build an `EnvFilter` from the given level, respecting `RUST_LOG` env var.
fn build_env_filter(level: Level) -> EnvFilter {
    let level_str = level.as_str().to_lowercase();

    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,casedash={level},casedash_cli={level}",
            level = level_str
        ))
    })
}
