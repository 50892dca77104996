//! Integration tests for the Cloudflare posture gateways.
//!
//! Each test stands up a [`MockServer`] in place of the Cloudflare API and
//! checks the exact requests the gateway issues.

use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use edgeguard_cloudflare::api::CloudflareApi;
use edgeguard_cloudflare::rule::RuleToggleGateway;
use edgeguard_cloudflare::security_level::{SecurityLevelGateway, SECURITY_LEVEL_SETTING};
use edgeguard_cloudflare::zone::{Zone, ZoneRef};
use edgeguard_core::gateway::{GatewayError, RemoteStateGateway};
use edgeguard_core::posture::Posture;

fn settings_response() -> serde_json::Value {
    json!({
        "success": true,
        "errors": [],
        "messages": [],
        "result": [
            { "id": "always_online", "value": "on" },
            { "id": "security_level", "value": "medium" },
            { "id": "max_upload", "value": 100 }
        ]
    })
}

fn ok_envelope() -> serde_json::Value {
    json!({ "success": true, "errors": [], "messages": [], "result": null })
}

fn security_gateway(server: &MockServer, zone: ZoneRef) -> SecurityLevelGateway {
    let api = CloudflareApi::new("key", server.uri());
    SecurityLevelGateway::new(api, Zone::new(zone), SECURITY_LEVEL_SETTING)
}

fn rule_gateway(server: &MockServer) -> RuleToggleGateway {
    let api = CloudflareApi::new("key", server.uri());
    RuleToggleGateway::new(api, Zone::new(ZoneRef::Id("myzone".into())), "rs1", "rule1")
}

// ---------------------------------------------------------------------------
// Security level: read
// ---------------------------------------------------------------------------

/// The current level is extracted from the zone settings list, with the
/// bearer token attached.
#[tokio::test]
async fn security_level_reads_current_value() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones/myzone/settings"))
        .and(header("authorization", "Bearer key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(settings_response()))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = security_gateway(&server, ZoneRef::Id("myzone".into()));
    let current = gateway.current().await.unwrap();
    assert_eq!(current, Some(Posture::from("medium")));
}

/// A settings list without the governed id is an unknown state, not an error.
#[tokio::test]
async fn security_level_missing_setting_is_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones/myzone/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": [{ "id": "always_online", "value": "on" }]
        })))
        .mount(&server)
        .await;

    let gateway = security_gateway(&server, ZoneRef::Id("myzone".into()));
    assert_eq!(gateway.current().await.unwrap(), None);
}

/// A server error on read surfaces as `Unavailable`.
#[tokio::test]
async fn security_level_read_server_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones/myzone/settings"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let gateway = security_gateway(&server, ZoneRef::Id("myzone".into()));
    assert_matches!(gateway.current().await, Err(GatewayError::Unavailable(_)));
}

// ---------------------------------------------------------------------------
// Security level: write
// ---------------------------------------------------------------------------

/// The write is a partial settings update carrying exactly one item.
#[tokio::test]
async fn security_level_write_patches_single_item() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/zones/myzone/settings"))
        .and(header("authorization", "Bearer key"))
        .and(body_json(json!({
            "items": [{ "id": "security_level", "value": "under_attack" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(settings_response()))
        .expect(0)
        .mount(&server)
        .await;

    let gateway = security_gateway(&server, ZoneRef::Id("myzone".into()));
    gateway
        .set_posture(&Posture::from("under_attack"))
        .await
        .unwrap();
}

/// A 400 on write is a rejection carrying the status and body.
#[tokio::test]
async fn security_level_write_bad_request_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/zones/myzone/settings"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid value"))
        .mount(&server)
        .await;

    let gateway = security_gateway(&server, ZoneRef::Id("myzone".into()));
    let err = gateway
        .set_posture(&Posture::from("under_attack"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GatewayError::Rejected {
            status: 400,
            detail: "invalid value".into()
        }
    );
}

/// A 2xx answer whose envelope reports failure is still a rejection.
#[tokio::test]
async fn security_level_write_unsuccessful_envelope_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/zones/myzone/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "errors": [{ "code": 1007, "message": "Invalid value for zone setting" }],
            "messages": [],
            "result": null
        })))
        .mount(&server)
        .await;

    let gateway = security_gateway(&server, ZoneRef::Id("myzone".into()));
    let err = gateway.set_posture(&Posture::from("high")).await.unwrap_err();
    assert_matches!(
        err,
        GatewayError::Rejected { status: 200, ref detail } if detail.contains("1007")
    );
}

/// An auth failure on write is reported as unavailable, not rejected.
#[tokio::test]
async fn security_level_write_unauthorized_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let gateway = security_gateway(&server, ZoneRef::Id("myzone".into()));
    assert_matches!(
        gateway.set_posture(&Posture::from("high")).await,
        Err(GatewayError::Unavailable(_))
    );
}

// ---------------------------------------------------------------------------
// Zone resolution
// ---------------------------------------------------------------------------

/// A domain is resolved once and the id reused for later calls.
#[tokio::test]
async fn domain_is_resolved_once_per_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones"))
        .and(query_param("name", "example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": [
                { "id": "other", "name": "example.org" },
                { "id": "myzone", "name": "example.com" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/zones/myzone/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(settings_response()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/zones/myzone/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope()))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = security_gateway(&server, ZoneRef::Domain("example.com".into()));
    assert_eq!(
        gateway.current().await.unwrap(),
        Some(Posture::from("medium"))
    );
    gateway.set_posture(&Posture::from("high")).await.unwrap();
}

/// An unknown domain makes the gateway unavailable.
#[tokio::test]
async fn unknown_domain_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": [{ "id": "other", "name": "example.org" }]
        })))
        .mount(&server)
        .await;

    let gateway = security_gateway(&server, ZoneRef::Domain("example.com".into()));
    assert_matches!(
        gateway.current().await,
        Err(GatewayError::Unavailable(msg)) if msg.contains("example.com")
    );
    assert_matches!(
        gateway.set_posture(&Posture::from("high")).await,
        Err(GatewayError::Unavailable(_))
    );
}

// ---------------------------------------------------------------------------
// Rule toggle
// ---------------------------------------------------------------------------

/// The rule's enabled flag maps to the `enabled` / `disabled` postures.
#[tokio::test]
async fn rule_reads_enabled_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones/myzone/rulesets/rs1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": {
                "id": "rs1",
                "rules": [
                    { "id": "rule0", "enabled": true },
                    { "id": "rule1", "enabled": false }
                ]
            }
        })))
        .mount(&server)
        .await;

    let gateway = rule_gateway(&server);
    assert_eq!(
        gateway.current().await.unwrap(),
        Some(Posture::from("disabled"))
    );
}

/// A ruleset without the configured rule is unknown.
#[tokio::test]
async fn rule_missing_from_ruleset_is_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones/myzone/rulesets/rs1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": { "id": "rs1", "rules": [] }
        })))
        .mount(&server)
        .await;

    let gateway = rule_gateway(&server);
    assert_eq!(gateway.current().await.unwrap(), None);
}

/// Enabling the rule patches only its `enabled` flag.
#[tokio::test]
async fn rule_write_patches_enabled_flag_only() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/zones/myzone/rulesets/rs1/rules/rule1"))
        .and(body_json(json!({ "enabled": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope()))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = rule_gateway(&server);
    gateway.set_posture(&Posture::from("enabled")).await.unwrap();
}

/// Disabling the rule sends the flag alone; action, expression and
/// description are left for Cloudflare to keep.
#[tokio::test]
async fn rule_write_disable_sends_flag_alone() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/zones/myzone/rulesets/rs1/rules/rule1"))
        .and(body_json(json!({ "enabled": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope()))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = rule_gateway(&server);
    gateway.set_posture(&Posture::from("disabled")).await.unwrap();
}

/// A posture that is not a rule state is refused without any request.
#[tokio::test]
async fn rule_write_refuses_non_toggle_posture() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope()))
        .expect(0)
        .mount(&server)
        .await;

    let gateway = rule_gateway(&server);
    assert_matches!(
        gateway.set_posture(&Posture::from("under_attack")).await,
        Err(GatewayError::Rejected { status: 0, ref detail })
            if detail == "`under_attack` is not a rule state; expected `enabled` or `disabled`"
    );
}
