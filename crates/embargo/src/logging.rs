//! Subscriber setup.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{ConfigError, LoggingConfig};

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("global subscriber already installed: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Fails, rather
/// than panicking, if a subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(config.level()?).into())
        .from_env_lossy();

    let layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_filter(env_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_filter(env_filter)
            .boxed()
    };

    tracing_subscriber::registry().with(layer).try_init()?;
    Ok(())
}
