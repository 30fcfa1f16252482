//! Logging setup for the helper binaries.

use std::io::IsTerminal;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging based on `$RUST_LOG`; only warnings show when it is unset.
///
/// Output goes to stderr so stdout stays clean for listings and JSON.
pub fn set_up_logging() {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_ansi(should_emit_colors())
        .with_writer(std::io::stderr)
        .compact();

    let filter_layer = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init();
}

fn should_emit_colors() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}
