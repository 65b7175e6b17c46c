//! Tracing subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogFormat, ServerConfig};

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `server.log_level` when set.
pub fn init_tracing(server: &ServerConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let fmt_layer = match server.log_format {
        LogFormat::Json => fmt_layer.json().flatten_event(true).boxed(),
        LogFormat::Pretty => fmt_layer.boxed(),
    };

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
