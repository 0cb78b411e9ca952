//! Logging setup for the CLI.
//!
//! The library emits `tracing` events; only the CLI installs a subscriber.
//! `RUST_LOG` overrides the defaults when set.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init(debug: bool, no_color: bool) {
    let filter = if debug {
        EnvFilter::new("stagehand_bundler=debug,stagehand_cli=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("stagehand_bundler=info,stagehand_cli=info"))
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}
