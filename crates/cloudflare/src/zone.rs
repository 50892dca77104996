//! Zone identification.
//!
//! A zone is configured either by id or by domain name. Domain lookups are
//! deferred until the first remote call and cached for the rest of the run,
//! so a run that aborts on local signals never touches the API.

use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::api::{CloudflareApi, CloudflareError};

/// How the target zone is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneRef {
    Id(String),
    Domain(String),
}

/// Entry of the `GET /zones` result list.
#[derive(Debug, Deserialize)]
struct ZoneSummary {
    id: String,
    name: String,
}

/// Lazily resolved zone id.
#[derive(Debug)]
pub struct Zone {
    reference: ZoneRef,
    id: OnceCell<String>,
}

impl Zone {
    pub fn new(reference: ZoneRef) -> Self {
        let id = match &reference {
            ZoneRef::Id(id) => OnceCell::new_with(Some(id.clone())),
            ZoneRef::Domain(_) => OnceCell::new(),
        };
        Self { reference, id }
    }

    /// Zone id, resolving the domain through the API on first use.
    pub async fn id(&self, api: &CloudflareApi) -> Result<&str, CloudflareError> {
        let id = self
            .id
            .get_or_try_init(|| async {
                match &self.reference {
                    ZoneRef::Id(id) => Ok(id.clone()),
                    ZoneRef::Domain(domain) => resolve_zone_id(api, domain).await,
                }
            })
            .await?;
        Ok(id.as_str())
    }
}

/// Look up the zone id whose name equals `domain`.
pub async fn resolve_zone_id(api: &CloudflareApi, domain: &str) -> Result<String, CloudflareError> {
    let zones: Vec<ZoneSummary> = api.get("/zones", &[("name", domain)]).await?;

    let zone = zones
        .into_iter()
        .find(|z| z.name.eq_ignore_ascii_case(domain))
        .ok_or_else(|| CloudflareError::ZoneNotFound(domain.to_string()))?;

    tracing::debug!(domain, zone_id = %zone.id, "Resolved Cloudflare zone");
    Ok(zone.id)
}
