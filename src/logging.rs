//! Logging bootstrap.
//!
//! The library only emits `tracing` events. Binaries that want to see them
//! call [`init`], which installs a `fmt` subscriber filtered by `RUST_LOG`
//! (default `info`).

use std::env;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. Safe to call more than once; only the
/// first call takes effect.
pub fn init() {
    init_with_default("info");
}

/// Like [`init`], with an explicit fallback directive when `RUST_LOG` is
/// unset or unparseable.
pub fn init_with_default(directive: &str) {
    let filter = build_filter(env::var("RUST_LOG").ok(), directive);
    // Err means a subscriber is already installed.
    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}

fn build_filter(from_env: Option<String>, fallback: &str) -> EnvFilter {
    from_env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback))
}
