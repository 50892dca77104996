//! Threshold configuration for the posture evaluator.
//!
//! Values are checked once at construction; a [`Thresholds`] that exists
//! is always internally consistent.

use serde::Serialize;

use crate::error::CoreError;
use crate::posture::{Posture, PostureControl};

/// Immutable evaluator configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thresholds {
    max_load: f64,
    min_load: f64,
    min_free_bytes: Option<u64>,
    max_worker_processes: Option<u32>,
    default_posture: Posture,
    lockdown_posture: Posture,
}

impl Thresholds {
    /// Build thresholds from the two load bounds and the two postures.
    ///
    /// Rejects non-finite bounds, `min_load >= max_load`, empty postures and
    /// identical default/lockdown postures.
    pub fn new(
        max_load: f64,
        min_load: f64,
        default_posture: Posture,
        lockdown_posture: Posture,
    ) -> Result<Self, CoreError> {
        validate_finite(max_load, "max_load")?;
        validate_finite(min_load, "min_load")?;
        if min_load >= max_load {
            return Err(CoreError::Validation(format!(
                "min_load ({min_load}) must be strictly less than max_load ({max_load})"
            )));
        }
        validate_posture(&default_posture, "default_posture")?;
        validate_posture(&lockdown_posture, "lockdown_posture")?;
        if default_posture == lockdown_posture {
            return Err(CoreError::Validation(format!(
                "default_posture and lockdown_posture are both `{default_posture}`"
            )));
        }

        Ok(Self {
            max_load,
            min_load,
            min_free_bytes: None,
            max_worker_processes: None,
            default_posture,
            lockdown_posture,
        })
    }

    /// Tighten when free memory drops below `bytes`.
    pub fn with_min_free_bytes(mut self, bytes: u64) -> Self {
        self.min_free_bytes = Some(bytes);
        self
    }

    /// Tighten when more than `count` worker processes are running.
    pub fn with_max_worker_processes(mut self, count: u32) -> Self {
        self.max_worker_processes = Some(count);
        self
    }

    /// Check both postures are values `control` can actually hold.
    pub fn validate_for(&self, control: PostureControl) -> Result<(), CoreError> {
        for (posture, name) in [
            (&self.default_posture, "default_posture"),
            (&self.lockdown_posture, "lockdown_posture"),
        ] {
            if !control.accepts(posture) {
                return Err(CoreError::Validation(format!(
                    "{name} `{posture}` is not valid for {control}; expected one of {}",
                    control.accepted().join(", ")
                )));
            }
        }
        Ok(())
    }

    pub fn max_load(&self) -> f64 {
        self.max_load
    }

    pub fn min_load(&self) -> f64 {
        self.min_load
    }

    pub fn min_free_bytes(&self) -> Option<u64> {
        self.min_free_bytes
    }

    pub fn max_worker_processes(&self) -> Option<u32> {
        self.max_worker_processes
    }

    pub fn default_posture(&self) -> &Posture {
        &self.default_posture
    }

    pub fn lockdown_posture(&self) -> &Posture {
        &self.lockdown_posture
    }
}

fn validate_finite(value: f64, name: &str) -> Result<(), CoreError> {
    if !value.is_finite() {
        return Err(CoreError::Validation(format!(
            "{name} must be a finite number, got {value}"
        )));
    }
    Ok(())
}

fn validate_posture(posture: &Posture, name: &str) -> Result<(), CoreError> {
    if posture.as_str().trim().is_empty() {
        return Err(CoreError::Validation(format!("{name} must not be empty")));
    }
    Ok(())
}
