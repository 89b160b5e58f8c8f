//! Tracing subscriber setup.
//!
//! `RUST_LOG` overrides the default `info` level. Logs go to stderr so that
//! table, JSON and CSV output on stdout stay machine-readable.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// HTTP internals that are noisy at `info`.
const NOISY_MODULES: &[&str] = &["hyper", "hyper_util", "reqwest", "h2", "rustls"];

fn build_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let mut directives = String::from(level);
    for module in NOISY_MODULES {
        directives.push_str(&format!(",{module}=warn"));
    }
    EnvFilter::new(directives)
}

pub fn init(json: bool, verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::registry().with(build_filter(level));

    if json {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr);
        let _ = subscriber.with(layer).try_init();
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);
        let _ = subscriber.with(layer).try_init();
    }
}
