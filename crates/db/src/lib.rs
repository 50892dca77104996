//! Database liveness probe.
//!
//! Opens one connection to the configured database and closes it again.
//! The URL scheme (`mysql://`, `postgres://`) selects the driver.

use sqlx::{AnyConnection, Connection};

#[derive(Debug, thiserror::Error)]
pub enum DbProbeError {
    #[error("database connection failed: {0}")]
    Connect(#[from] sqlx::Error),
}

/// Establish and immediately release a connection to `database_url`.
pub async fn check_connection(database_url: &str) -> Result<(), DbProbeError> {
    sqlx::any::install_default_drivers();

    let conn = AnyConnection::connect(database_url).await?;
    conn.close().await?;
    tracing::debug!("Database connection check passed");
    Ok(())
}
