//! Gateway over a zone setting such as `security_level`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use edgeguard_core::gateway::{GatewayError, RemoteStateGateway};
use edgeguard_core::posture::Posture;

use crate::api::{CloudflareApi, CloudflareError};
use crate::zone::Zone;

/// Zone setting id governed by default.
pub const SECURITY_LEVEL_SETTING: &str = "security_level";

#[derive(Debug, Deserialize)]
struct ZoneSetting {
    id: String,
    value: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct SettingItem<'a> {
    id: &'a str,
    value: &'a str,
}

/// Partial settings update: only the listed items change.
#[derive(Debug, Serialize)]
struct SettingsUpdate<'a> {
    items: [SettingItem<'a>; 1],
}

/// Reads and writes one zone setting.
pub struct SecurityLevelGateway {
    api: CloudflareApi,
    zone: Zone,
    setting_id: String,
}

impl SecurityLevelGateway {
    pub fn new(api: CloudflareApi, zone: Zone, setting_id: impl Into<String>) -> Self {
        Self {
            api,
            zone,
            setting_id: setting_id.into(),
        }
    }

    async fn settings_path(&self) -> Result<String, CloudflareError> {
        let zone_id = self.zone.id(&self.api).await?;
        Ok(format!("/zones/{zone_id}/settings"))
    }
}

#[async_trait]
impl RemoteStateGateway for SecurityLevelGateway {
    async fn current(&self) -> Result<Option<Posture>, GatewayError> {
        let path = self
            .settings_path()
            .await
            .map_err(CloudflareError::into_read_error)?;
        let settings: Vec<ZoneSetting> = self
            .api
            .get(&path, &[])
            .await
            .map_err(CloudflareError::into_read_error)?;

        let Some(setting) = settings.into_iter().find(|s| s.id == self.setting_id) else {
            tracing::warn!(setting = %self.setting_id, "Zone setting not present in response");
            return Ok(None);
        };

        match setting.value {
            serde_json::Value::String(value) => Ok(Some(Posture::new(value))),
            other => {
                tracing::warn!(
                    setting = %self.setting_id,
                    value = %other,
                    "Zone setting value is not a string",
                );
                Ok(None)
            }
        }
    }

    async fn set_posture(&self, posture: &Posture) -> Result<(), GatewayError> {
        let path = self
            .settings_path()
            .await
            .map_err(CloudflareError::into_write_error)?;
        let update = SettingsUpdate {
            items: [SettingItem {
                id: &self.setting_id,
                value: posture.as_str(),
            }],
        };

        self.api
            .patch(&path, &update)
            .await
            .map_err(CloudflareError::into_write_error)?;

        tracing::info!(setting = %self.setting_id, value = %posture, "Updated zone setting");
        Ok(())
    }
}
