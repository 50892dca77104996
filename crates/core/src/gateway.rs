//! Capability interface over the edge provider's posture setting.
//!
//! The controller only needs to read one setting and to overwrite that
//! same setting. Implementations live in `edgeguard-cloudflare`; tests use
//! in-memory fakes.

use async_trait::async_trait;

use crate::posture::Posture;

/// Failure talking to the remote control plane.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Transport, auth or zone-lookup failure. Nothing was changed remotely.
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// The API answered a write with a non-success response.
    #[error("remote rejected update ({status}): {detail}")]
    Rejected { status: u16, detail: String },
}

/// Read and conditionally overwrite the single remote posture of one zone.
#[async_trait]
pub trait RemoteStateGateway: Send + Sync {
    /// Current remote posture.
    ///
    /// `Ok(None)` means the read succeeded but the setting or rule was not
    /// present; callers treat that as "differs from target".
    async fn current(&self) -> Result<Option<Posture>, GatewayError>;

    /// Overwrite only the governed setting with `posture`.
    async fn set_posture(&self, posture: &Posture) -> Result<(), GatewayError>;
}
