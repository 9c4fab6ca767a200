//! Subscriber setup for binaries. Library crates only emit events.

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingSettings;

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `settings.level`. `json_format` forces JSON output
/// regardless of the configured format.
///
/// # Errors
///
/// Returns error if a global subscriber is already installed.
pub fn setup_logging(
    settings: &LoggingSettings,
    json_format: bool,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));
    let registry = tracing_subscriber::registry().with(filter);

    if json_format || settings.json_format {
        registry
            .with(fmt::layer().json().with_thread_names(true).with_target(true))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_thread_names(true).with_target(false))
            .try_init()?;
    }

    info!(level = %settings.level, "logging initialized");
    Ok(())
}
