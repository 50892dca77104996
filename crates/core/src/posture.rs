//! Posture values and the remote controls that accept them.
//!
//! A [`Posture`] is an opaque tag. The controller only ever compares two
//! postures for equality; what `under_attack` or `enabled` means is the
//! edge provider's business.

use std::fmt;

use serde::Serialize;

use crate::error::CoreError;

/// Security levels accepted by the zone `security_level` setting.
pub const SECURITY_LEVELS: &[&str] = &[
    "off",
    "essentially_off",
    "low",
    "medium",
    "high",
    "under_attack",
];

/// Posture tag for an enabled ruleset rule.
pub const RULE_ENABLED: &str = "enabled";

/// Posture tag for a disabled ruleset rule.
pub const RULE_DISABLED: &str = "disabled";

/// Named security setting enforced at the edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Posture(String);

impl Posture {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Posture tag for a rule's enabled flag.
    pub fn from_rule_state(enabled: bool) -> Self {
        Self::new(if enabled { RULE_ENABLED } else { RULE_DISABLED })
    }
}

impl fmt::Display for Posture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Posture {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Which remote control a run governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostureControl {
    /// Multi-valued zone security level.
    SecurityLevel,
    /// Boolean enabled flag of a single ruleset rule.
    Rule,
}

impl PostureControl {
    /// Parse the control name used in configuration.
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        match name.trim() {
            "security_level" => Ok(Self::SecurityLevel),
            "rule" => Ok(Self::Rule),
            other => Err(CoreError::Validation(format!(
                "posture control must be `security_level` or `rule`, got `{other}`"
            ))),
        }
    }

    /// Postures this control accepts.
    pub fn accepted(self) -> &'static [&'static str] {
        match self {
            Self::SecurityLevel => SECURITY_LEVELS,
            Self::Rule => &[RULE_ENABLED, RULE_DISABLED],
        }
    }

    pub fn accepts(self, posture: &Posture) -> bool {
        self.accepted().contains(&posture.as_str())
    }

    /// `(default, lockdown)` used when configuration names neither.
    pub fn default_postures(self) -> (Posture, Posture) {
        match self {
            Self::SecurityLevel => (Posture::new("medium"), Posture::new("under_attack")),
            Self::Rule => (Posture::new(RULE_DISABLED), Posture::new(RULE_ENABLED)),
        }
    }
}

impl fmt::Display for PostureControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SecurityLevel => "security_level",
            Self::Rule => "rule",
        })
    }
}
