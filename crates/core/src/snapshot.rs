//! Point-in-time bundle of host health indicators.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Host health captured once per run.
///
/// `None` means the probe for that field failed or was not configured.
/// The evaluator skips rules whose input is unknown, so an unknown value
/// never reads as healthy evidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    /// 1, 5 and 15 minute load, 1-minute first. May hold fewer than three.
    pub load_averages: Vec<f64>,
    /// `Some(false)` when a configured database refused the connection.
    pub db_reachable: Option<bool>,
    pub free_memory_bytes: Option<u64>,
    pub worker_process_count: Option<u32>,
    pub captured_at: DateTime<Utc>,
}

impl HealthSnapshot {
    /// Snapshot with only the mandatory load signal; every optional probe unknown.
    pub fn from_load(load_averages: Vec<f64>) -> Self {
        Self {
            load_averages,
            db_reachable: None,
            free_memory_bytes: None,
            worker_process_count: None,
            captured_at: Utc::now(),
        }
    }

    /// The 1-minute load figure, if any sample is present.
    pub fn one_minute_load(&self) -> Option<f64> {
        self.load_averages.first().copied()
    }
}
