//! Gateway over the enabled flag of one ruleset rule.
//!
//! The posture is `enabled` or `disabled`. Writes patch the rule with the
//! flag alone, so action, expression and description stay as configured in
//! the dashboard.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use edgeguard_core::gateway::{GatewayError, RemoteStateGateway};
use edgeguard_core::posture::{Posture, RULE_DISABLED, RULE_ENABLED};

use crate::api::{CloudflareApi, CloudflareError};
use crate::zone::Zone;

#[derive(Debug, Deserialize)]
struct Ruleset {
    #[serde(default)]
    rules: Vec<RulesetRule>,
}

#[derive(Debug, Deserialize)]
struct RulesetRule {
    id: String,
    /// Cloudflare omits the flag for rules that have never been disabled.
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Body of the rule PATCH. Cloudflare merges partial rule bodies, so the
/// rule's action, expression and description are kept.
#[derive(Debug, Serialize)]
struct RuleUpdate {
    enabled: bool,
}

/// Reads and toggles a single rule inside a zone ruleset.
pub struct RuleToggleGateway {
    api: CloudflareApi,
    zone: Zone,
    ruleset_id: String,
    rule_id: String,
}

impl RuleToggleGateway {
    pub fn new(
        api: CloudflareApi,
        zone: Zone,
        ruleset_id: impl Into<String>,
        rule_id: impl Into<String>,
    ) -> Self {
        Self {
            api,
            zone,
            ruleset_id: ruleset_id.into(),
            rule_id: rule_id.into(),
        }
    }

    async fn ruleset_path(&self) -> Result<String, CloudflareError> {
        let zone_id = self.zone.id(&self.api).await?;
        Ok(format!("/zones/{zone_id}/rulesets/{}", self.ruleset_id))
    }
}

/// Enabled flag for a rule posture, `None` for anything else.
fn rule_state(posture: &Posture) -> Option<bool> {
    match posture.as_str() {
        RULE_ENABLED => Some(true),
        RULE_DISABLED => Some(false),
        _ => None,
    }
}

#[async_trait]
impl RemoteStateGateway for RuleToggleGateway {
    async fn current(&self) -> Result<Option<Posture>, GatewayError> {
        let path = self
            .ruleset_path()
            .await
            .map_err(CloudflareError::into_read_error)?;
        let ruleset: Ruleset = self
            .api
            .get(&path, &[])
            .await
            .map_err(CloudflareError::into_read_error)?;

        let state = ruleset
            .rules
            .iter()
            .find(|r| r.id == self.rule_id)
            .map(|r| Posture::from_rule_state(r.enabled));

        if state.is_none() {
            tracing::warn!(
                ruleset = %self.ruleset_id,
                rule = %self.rule_id,
                "Rule not found in ruleset",
            );
        }
        Ok(state)
    }

    async fn set_posture(&self, posture: &Posture) -> Result<(), GatewayError> {
        // Status 0: refused locally, nothing was sent.
        let enabled = rule_state(posture).ok_or_else(|| GatewayError::Rejected {
            status: 0,
            detail: format!(
                "`{posture}` is not a rule state; \
                 expected `{RULE_ENABLED}` or `{RULE_DISABLED}`"
            ),
        })?;

        let path = self
            .ruleset_path()
            .await
            .map_err(CloudflareError::into_write_error)?;
        let path = format!("{path}/rules/{}", self.rule_id);

        self.api
            .patch(&path, &RuleUpdate { enabled })
            .await
            .map_err(CloudflareError::into_write_error)?;

        tracing::info!(rule = %self.rule_id, %posture, "Updated ruleset rule");
        Ok(())
    }
}
