//! Posture reconciliation for a single run.
//!
//! [`PostureController::run`] walks
//! `Collecting -> Evaluating -> Reconciling` and ends in one of three
//! terminal states: no change, applied, or failed. The remote posture is
//! only written when the evaluated target differs from what the edge
//! currently enforces.
//!
//! Compare-then-write is not atomic. Writes are plain assignments, so a
//! concurrent change is corrected by the next scheduled run.

use std::fmt;

use serde::Serialize;

use edgeguard_core::evaluator::{evaluate, Decision, Trigger};
use edgeguard_core::gateway::{GatewayError, RemoteStateGateway};
use edgeguard_core::posture::Posture;
use edgeguard_core::thresholds::Thresholds;

use crate::collector::{SignalError, SignalSource};

/// Run phases, used in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Collecting,
    Evaluating,
    Reconciling,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Collecting => "collecting",
            Self::Evaluating => "evaluating",
            Self::Reconciling => "reconciling",
        })
    }
}

/// What the remote read returned before a write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "observed", content = "value", rename_all = "snake_case")]
pub enum Observation {
    Known(Posture),
    /// Read succeeded but the setting or rule was absent.
    Missing,
    /// Read failed; the write went ahead regardless.
    Unreadable(String),
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(posture) => write!(f, "{posture}"),
            Self::Missing => f.write_str("<missing>"),
            Self::Unreadable(_) => f.write_str("<unreadable>"),
        }
    }
}

/// Why a run left the remote posture untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum NoChangeReason {
    /// No rule matched.
    Steady,
    /// The remote already holds the target.
    AlreadyApplied { posture: Posture, trigger: Trigger },
}

/// Successful end state of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    NoChange(NoChangeReason),
    Applied {
        previous: Observation,
        target: Posture,
        trigger: Trigger,
    },
}

/// Terminal failure of a run.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("health signal failure: {0}")]
    Signal(#[from] SignalError),

    #[error("failed to apply posture `{target}`: {source}")]
    Apply {
        target: Posture,
        #[source]
        source: GatewayError,
    },
}

/// One-shot controller wiring signals, thresholds and the remote gateway.
pub struct PostureController<'a> {
    signals: &'a dyn SignalSource,
    gateway: &'a dyn RemoteStateGateway,
    thresholds: &'a Thresholds,
}

impl<'a> PostureController<'a> {
    pub fn new(
        signals: &'a dyn SignalSource,
        gateway: &'a dyn RemoteStateGateway,
        thresholds: &'a Thresholds,
    ) -> Self {
        Self {
            signals,
            gateway,
            thresholds,
        }
    }

    /// Collect, evaluate and reconcile once.
    ///
    /// A load-signal failure aborts before any remote call. A failed remote
    /// read does not block the write; a failed write fails the run.
    pub async fn run(&self) -> Result<RunOutcome, ControllerError> {
        tracing::debug!(phase = %Phase::Collecting, "Collecting health signals");
        let snapshot = self.signals.collect().await?;

        tracing::debug!(phase = %Phase::Evaluating, "Evaluating thresholds");
        let (target, trigger) = match evaluate(&snapshot, self.thresholds) {
            Decision::Apply { target, trigger } => (target, trigger),
            Decision::Hold => {
                tracing::info!(
                    load = ?snapshot.load_averages,
                    "Signals within bounds, holding posture"
                );
                return Ok(RunOutcome::NoChange(NoChangeReason::Steady));
            }
        };

        tracing::debug!(
            phase = %Phase::Reconciling,
            %target,
            %trigger,
            "Reconciling remote posture"
        );
        let previous = match self.gateway.current().await {
            Ok(Some(current)) if current == target => {
                tracing::info!(
                    posture = %current,
                    %trigger,
                    "Remote posture already matches target, skipping write"
                );
                return Ok(RunOutcome::NoChange(NoChangeReason::AlreadyApplied {
                    posture: current,
                    trigger,
                }));
            }
            Ok(Some(current)) => Observation::Known(current),
            Ok(None) => Observation::Missing,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Could not fetch current posture, proceeding with update"
                );
                Observation::Unreadable(e.to_string())
            }
        };

        self.gateway
            .set_posture(&target)
            .await
            .map_err(|source| ControllerError::Apply {
                target: target.clone(),
                source,
            })?;

        tracing::info!(from = %previous, to = %target, %trigger, "Applied posture");
        Ok(RunOutcome::Applied {
            previous,
            target,
            trigger,
        })
    }
}
