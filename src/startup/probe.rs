//! Database readiness probe
//!
//! Each check opens a fresh pool with the configured driver, pings it and
//! closes it again; nothing is kept between attempts.

use super::{Probe, Retryable};
use crate::config::DatabaseConfig;
use crate::db::{create_pool, redact_url};
use async_trait::async_trait;
use std::io::{self, ErrorKind};

/// Outcome of a failed database check
#[derive(Debug, thiserror::Error)]
pub enum DatabaseProbeError {
    /// The server could not be reached yet
    #[error("database unavailable: {0:#}")]
    Unavailable(anyhow::Error),

    /// Misconfiguration, bad credentials, filesystem problems...
    #[error("database check failed: {0:#}")]
    Fatal(anyhow::Error),
}

impl Retryable for DatabaseProbeError {
    fn is_retryable(&self) -> bool {
        matches!(self, DatabaseProbeError::Unavailable(_))
    }
}

impl From<anyhow::Error> for DatabaseProbeError {
    fn from(err: anyhow::Error) -> Self {
        if is_connectivity_error(&err) {
            DatabaseProbeError::Unavailable(err)
        } else {
            DatabaseProbeError::Fatal(err)
        }
    }
}

/// Checks that the configured database accepts connections
#[derive(Debug, Clone)]
pub struct DatabaseProbe {
    config: DatabaseConfig,
}

impl DatabaseProbe {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Probe for DatabaseProbe {
    type Error = DatabaseProbeError;

    async fn check(&self) -> Result<(), DatabaseProbeError> {
        tracing::debug!(
            driver = ?self.config.driver,
            url = %redact_url(&self.config.url),
            "Probing database"
        );

        let pool = create_pool(&self.config).await?;
        let ping = pool.ping().await;
        pool.close().await;

        ping.map_err(DatabaseProbeError::from)
    }
}

/// Whether any error in the chain means "not reachable right now"
fn is_connectivity_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(e) = cause.downcast_ref::<sqlx::Error>() {
            return is_retryable_sqlx(e);
        }
        if let Some(e) = cause.downcast_ref::<io::Error>() {
            return is_retryable_io(e);
        }
        false
    })
}

fn is_retryable_sqlx(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(e) => is_retryable_io(e),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => true,
        _ => false,
    }
}

fn is_retryable_io(err: &io::Error) -> bool {
    is_lookup_failure(err)
        || matches!(
            err.kind(),
            ErrorKind::ConnectionRefused
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::NotConnected
                | ErrorKind::AddrNotAvailable
                | ErrorKind::TimedOut
        )
}

/// The host name did not resolve (yet). Resolver failures carry no stable
/// `ErrorKind`, so they are recognised by the messages std and tokio use.
fn is_lookup_failure(err: &io::Error) -> bool {
    let message = err.to_string();
    message.starts_with("failed to lookup address information")
        || message.starts_with("could not resolve to any address")
}
