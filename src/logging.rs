//! Tracing setup.

use crate::config::LoggingConfig;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// Returns `false` when a subscriber was already installed, which leaves the
/// existing one in place.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).try_init().is_ok()
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .try_init()
            .is_ok()
    }
}
