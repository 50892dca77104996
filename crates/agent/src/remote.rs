//! Builds the Cloudflare gateway selected by configuration.

use edgeguard_cloudflare::api::CloudflareApi;
use edgeguard_cloudflare::rule::RuleToggleGateway;
use edgeguard_cloudflare::security_level::SecurityLevelGateway;
use edgeguard_cloudflare::zone::Zone;
use edgeguard_core::gateway::RemoteStateGateway;

use crate::config::{CloudflareConfig, RemoteTarget};

/// Gateway for the configured zone and target. No request is made here.
pub fn build_gateway(config: &CloudflareConfig) -> Box<dyn RemoteStateGateway> {
    let api = CloudflareApi::new(config.api_token.clone(), config.api_base.clone());
    let zone = Zone::new(config.zone.clone());

    match &config.target {
        RemoteTarget::SecurityLevel { setting_id } => {
            Box::new(SecurityLevelGateway::new(api, zone, setting_id.clone()))
        }
        RemoteTarget::Rule {
            ruleset_id,
            rule_id,
        } => Box::new(RuleToggleGateway::new(
            api,
            zone,
            ruleset_id.clone(),
            rule_id.clone(),
        )),
    }
}
