//! Tracing subscriber setup.
use crate::config::Settings;
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins over the configured level. Returns false if a global
/// subscriber was already installed.
pub fn init_tracing(settings: &Settings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.to_lowercase()));

    let installed = if settings.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };
    installed.is_ok()
}
