//! Threshold evaluation engine for host health snapshots.
//!
//! Pure logic -- no I/O. The caller collects a [`HealthSnapshot`] and passes
//! it in with the configured [`Thresholds`].
//!
//! Rules are checked in severity order and the first match wins:
//!
//! 1. free memory below `min_free_bytes` -> lockdown
//! 2. database unreachable -> lockdown
//! 3. worker processes above `max_worker_processes` -> lockdown
//! 4. 1-minute load at/above `max_load` -> lockdown
//! 5. every load sample below `min_load` -> default
//! 6. otherwise hold the current posture

use std::fmt;

use serde::Serialize;

use crate::posture::Posture;
use crate::snapshot::HealthSnapshot;
use crate::thresholds::Thresholds;

/// The signal that produced a decision, kept for logging and run reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    LowMemory { free_bytes: u64, min_free_bytes: u64 },
    DatabaseUnreachable,
    WorkerSaturation { count: u32, max: u32 },
    LoadSpike { load: f64, max_load: f64 },
    LoadSettled { samples: Vec<f64>, min_load: f64 },
}

impl Trigger {
    /// Whether this trigger asks for the lockdown posture.
    pub fn is_lockdown(&self) -> bool {
        !matches!(self, Self::LoadSettled { .. })
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowMemory {
                free_bytes,
                min_free_bytes,
            } => write!(f, "free memory {free_bytes} B < {min_free_bytes} B"),
            Self::DatabaseUnreachable => f.write_str("database unreachable"),
            Self::WorkerSaturation { count, max } => {
                write!(f, "{count} worker processes > {max}")
            }
            Self::LoadSpike { load, max_load } => write!(f, "load {load} >= {max_load}"),
            Self::LoadSettled { samples, min_load } => {
                write!(f, "load {samples:?} all < {min_load}")
            }
        }
    }
}

/// Outcome of evaluating one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Converge the remote posture on `target`.
    Apply { target: Posture, trigger: Trigger },
    /// No rule matched; leave the remote posture as it is.
    Hold,
}

impl Decision {
    pub fn target(&self) -> Option<&Posture> {
        match self {
            Self::Apply { target, .. } => Some(target),
            Self::Hold => None,
        }
    }
}

/// Map a snapshot to a posture decision.
///
/// Deterministic: the same `(snapshot, thresholds)` always gives the same
/// decision. `captured_at` plays no part.
pub fn evaluate(snapshot: &HealthSnapshot, thresholds: &Thresholds) -> Decision {
    match find_trigger(snapshot, thresholds) {
        Some(trigger) => {
            let target = if trigger.is_lockdown() {
                thresholds.lockdown_posture().clone()
            } else {
                thresholds.default_posture().clone()
            };
            Decision::Apply { target, trigger }
        }
        None => Decision::Hold,
    }
}

fn find_trigger(snap: &HealthSnapshot, thresholds: &Thresholds) -> Option<Trigger> {
    if let (Some(free_bytes), Some(min_free_bytes)) =
        (snap.free_memory_bytes, thresholds.min_free_bytes())
    {
        if free_bytes < min_free_bytes {
            return Some(Trigger::LowMemory {
                free_bytes,
                min_free_bytes,
            });
        }
    }

    if snap.db_reachable == Some(false) {
        return Some(Trigger::DatabaseUnreachable);
    }

    if let (Some(count), Some(max)) = (snap.worker_process_count, thresholds.max_worker_processes())
    {
        if count > max {
            return Some(Trigger::WorkerSaturation { count, max });
        }
    }

    let load = snap.one_minute_load()?;
    if load >= thresholds.max_load() {
        return Some(Trigger::LoadSpike {
            load,
            max_load: thresholds.max_load(),
        });
    }

    // A dip in the 1-minute figure alone is not enough to relax.
    if all_below(&snap.load_averages, thresholds.min_load()) {
        return Some(Trigger::LoadSettled {
            samples: snap.load_averages.clone(),
            min_load: thresholds.min_load(),
        });
    }

    None
}

fn all_below(samples: &[f64], bound: f64) -> bool {
    samples.iter().all(|v| *v < bound)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
