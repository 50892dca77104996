//! REST API client for the Cloudflare v4 HTTP endpoints.
//!
//! Every call carries the bearer token and expects the standard Cloudflare
//! response envelope (`success`, `errors`, `messages`, `result`).

use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use edgeguard_core::gateway::GatewayError;

/// Public Cloudflare API base endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// HTTP client bound to one API token.
pub struct CloudflareApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

/// Standard Cloudflare response wrapper.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    pub result: Option<T>,
}

/// One entry of an envelope's `errors` or `messages` list.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

fn default_success() -> bool {
    true
}

/// Errors from the Cloudflare REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum CloudflareError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Cloudflare returned a non-2xx status code.
    #[error("Cloudflare API returned HTTP {status}: {body}")]
    ApiError { status: u16, body: String },

    /// A 2xx response whose envelope reported `success: false`.
    #[error("Cloudflare API reported failure ({status}): {errors}")]
    Unsuccessful { status: u16, errors: String },

    /// A successful read without a `result` payload.
    #[error("Cloudflare API response has no result")]
    MissingResult,

    /// No zone matched the configured domain.
    #[error("zone ID not found for domain {0}")]
    ZoneNotFound(String),
}

impl CloudflareError {
    /// Classify a failed read. Reads never reject; any failure means the
    /// current state could not be observed.
    pub fn into_read_error(self) -> GatewayError {
        GatewayError::Unavailable(self.to_string())
    }

    /// Classify a failed write. Auth-level statuses count as unavailable;
    /// any other non-success answer is a rejection.
    pub fn into_write_error(self) -> GatewayError {
        match self {
            Self::ApiError { status, body } if !is_auth_status(status) => {
                GatewayError::Rejected {
                    status,
                    detail: body,
                }
            }
            Self::Unsuccessful { status, errors } if !is_auth_status(status) => {
                GatewayError::Rejected {
                    status,
                    detail: errors,
                }
            }
            other => GatewayError::Unavailable(other.to_string()),
        }
    }
}

fn is_auth_status(status: u16) -> bool {
    status == 401 || status == 403
}

fn join_messages(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "no error detail".to_string();
    }
    errors
        .iter()
        .map(|e| format!("{}: {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl CloudflareApi {
    /// Create a client for `base_url` (normally [`DEFAULT_API_BASE`]).
    pub fn new(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), token, base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET {base}{path}` and return the envelope's `result`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CloudflareError> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "application/json")
            .query(query)
            .send()
            .await?;

        let status = response.status().as_u16();
        let response = Self::ensure_success(response).await?;
        let envelope: Envelope<T> = response.json().await?;
        if !envelope.success {
            return Err(CloudflareError::Unsuccessful {
                status,
                errors: join_messages(&envelope.errors),
            });
        }
        envelope.result.ok_or(CloudflareError::MissingResult)
    }

    /// `PATCH {base}{path}` with a JSON body.
    ///
    /// A 2xx answer is accepted unless its envelope explicitly says
    /// `success: false`; the result payload is not needed.
    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), CloudflareError> {
        let response = self
            .client
            .patch(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let response = Self::ensure_success(response).await?;
        let text = response.text().await?;
        if let Ok(envelope) = serde_json::from_str::<Envelope<serde_json::Value>>(&text) {
            if !envelope.success {
                return Err(CloudflareError::Unsuccessful {
                    status,
                    errors: join_messages(&envelope.errors),
                });
            }
        }
        Ok(())
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Return the response unchanged on a 2xx status, otherwise an
    /// [`CloudflareError::ApiError`] with the status and body text.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, CloudflareError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(CloudflareError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn trailing_slash_is_trimmed_from_base() {
        let api = CloudflareApi::new("token", "http://localhost:9999/client/v4/");
        assert_eq!(api.base_url(), "http://localhost:9999/client/v4");
        assert_eq!(api.url("/zones"), "http://localhost:9999/client/v4/zones");
    }

    #[test]
    fn write_rejection_keeps_status_and_body() {
        let err = CloudflareError::ApiError {
            status: 400,
            body: "bad value".into(),
        };
        assert_eq!(
            err.into_write_error(),
            GatewayError::Rejected {
                status: 400,
                detail: "bad value".into()
            }
        );
    }

    #[test]
    fn auth_failures_are_unavailable_on_write() {
        let err = CloudflareError::ApiError {
            status: 403,
            body: "forbidden".into(),
        };
        assert_matches!(err.into_write_error(), GatewayError::Unavailable(_));
    }

    #[test]
    fn zone_lookup_failure_is_unavailable_on_write() {
        let err = CloudflareError::ZoneNotFound("example.com".into());
        assert_matches!(
            err.into_write_error(),
            GatewayError::Unavailable(msg) if msg.contains("example.com")
        );
    }

    #[test]
    fn read_failures_are_always_unavailable() {
        let err = CloudflareError::ApiError {
            status: 500,
            body: "oops".into(),
        };
        assert_matches!(err.into_read_error(), GatewayError::Unavailable(_));
    }

    #[test]
    fn envelope_without_success_field_defaults_to_success() {
        let envelope: Envelope<Vec<serde_json::Value>> =
            serde_json::from_str(r#"{"result": []}"#).unwrap();
        assert!(envelope.success);
        assert!(envelope.errors.is_empty());
    }

    #[test]
    fn messages_are_joined_with_codes() {
        let errors = vec![
            ApiMessage {
                code: 1007,
                message: "Invalid value".into(),
            },
            ApiMessage {
                code: 9109,
                message: "Unauthorized".into(),
            },
        ];
        assert_eq!(
            join_messages(&errors),
            "1007: Invalid value; 9109: Unauthorized"
        );
        assert_eq!(join_messages(&[]), "no error detail");
    }
}
