//! Cloudflare v4 REST client and posture gateways.
//!
//! [`api::CloudflareApi`] wraps the authenticated HTTP calls. The two
//! gateways implement [`edgeguard_core::gateway::RemoteStateGateway`] over
//! either the zone `security_level` setting or a single ruleset rule's
//! enabled flag.

pub mod api;
pub mod rule;
pub mod security_level;
pub mod zone;
