//! Host health signal collection.
//!
//! [`SignalReader`] runs up to four independent probes and bundles them
//! into a [`HealthSnapshot`]:
//!
//! - load average (mandatory; failure aborts the run)
//! - database liveness (`DATABASE_URL`)
//! - available memory (`sysinfo`)
//! - worker-process count (`pgrep`)
//!
//! Optional probes that fail are logged and recorded as unknown. A database
//! that refuses the connection is recorded as unreachable, which is evidence
//! in its own right.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use sysinfo::System;

use edgeguard_core::error::CoreError;
use edgeguard_core::loadavg::parse_load_average;
use edgeguard_core::snapshot::HealthSnapshot;

use crate::config::SignalConfig;
use crate::process;

/// The mandatory load signal could not be obtained.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("cannot read load average from {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Malformed(#[from] CoreError),
}

/// Source of one health snapshot per run.
#[async_trait]
pub trait SignalSource: Send + Sync {
    async fn collect(&self) -> Result<HealthSnapshot, SignalError>;
}

/// Reads signals from the local host.
pub struct SignalReader {
    config: SignalConfig,
}

impl SignalReader {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    async fn read_load(&self) -> Result<Vec<f64>, SignalError> {
        let path = &self.config.loadavg_path;
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SignalError::Unreadable {
                path: path.clone(),
                source,
            })?;
        Ok(parse_load_average(&text)?)
    }

    async fn probe_database(&self) -> Option<bool> {
        let url = self.config.database_url.as_deref()?;
        match edgeguard_db::check_connection(url).await {
            Ok(()) => Some(true),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot connect to database");
                Some(false)
            }
        }
    }

    async fn probe_workers(&self) -> Option<u32> {
        let pattern = self.config.worker_pattern.as_deref()?;
        match process::count_processes(pattern).await {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!(pattern, error = %e, "Could not count worker processes");
                None
            }
        }
    }
}

/// Available memory in bytes, or `None` on platforms `sysinfo` cannot read.
pub fn probe_free_memory() -> Option<u64> {
    let mut sys = System::new();
    sys.refresh_memory();

    if sys.total_memory() == 0 {
        tracing::warn!("Memory statistics unavailable on this platform");
        return None;
    }
    Some(sys.available_memory())
}

#[async_trait]
impl SignalSource for SignalReader {
    async fn collect(&self) -> Result<HealthSnapshot, SignalError> {
        let load_averages = self.read_load().await?;
        let db_reachable = self.probe_database().await;
        let free_memory_bytes = probe_free_memory();
        let worker_process_count = self.probe_workers().await;

        let snapshot = HealthSnapshot {
            load_averages,
            db_reachable,
            free_memory_bytes,
            worker_process_count,
            captured_at: Utc::now(),
        };

        tracing::debug!(
            load = ?snapshot.load_averages,
            db_reachable = ?snapshot.db_reachable,
            free_memory_bytes = ?snapshot.free_memory_bytes,
            worker_process_count = ?snapshot.worker_process_count,
            "Collected health snapshot",
        );
        Ok(snapshot)
    }
}
