use crate::config::LoggingConfig;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(thiserror::Error, Debug)]
pub enum LoggingError {
    #[error("invalid sentry DSN: {0}")]
    InvalidDsn(#[from] sentry::types::ParseDsnError),
    #[error("could not install log subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

/// Installs the global subscriber. Events go to stderr, filtered by
/// `RUST_LOG` (default `info`), and to Sentry when a DSN is configured.
///
/// The returned guard flushes pending Sentry events when dropped.
pub fn init(config: Option<&LoggingConfig>) -> Result<Option<sentry::ClientInitGuard>, LoggingError> {
    let guard = match config {
        Some(config) => {
            let dsn: sentry::types::Dsn = config.sentry_dsn.parse()?;
            Some(sentry::init(sentry::ClientOptions {
                dsn: Some(dsn),
                release: sentry::release_name!(),
                ..Default::default()
            }))
        }
        None => None,
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let sentry_layer = guard
        .as_ref()
        .map(|_| sentry::integrations::tracing::layer());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_file(true).with_line_number(true))
        .with(sentry_layer)
        .try_init()?;

    Ok(guard)
}
