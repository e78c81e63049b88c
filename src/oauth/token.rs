use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::TokenRefreshError;
use crate::oauth::expiry::DEFAULT_EXPIRES_IN_SECS;
use crate::types::Secret;

pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://console.anthropic.com/v1/oauth/token";
pub const DEFAULT_CLIENT_ID: &str = "9d1c250a-e61b-44d9-88ed-5944d1962f5e";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of a successful refresh grant.
#[derive(Debug, Clone)]
pub struct AccessCredential {
    pub access_token: Secret,
    /// `None` when the server did not rotate the refresh token.
    pub refresh_token: Option<Secret>,
    pub expires_in_seconds: u64,
}

impl AccessCredential {
    /// The refresh token downstream consumers should keep using: the rotated
    /// one if the server issued it, otherwise the one we sent.
    pub fn effective_refresh_token<'a>(&'a self, original: &'a Secret) -> &'a Secret {
        self.refresh_token.as_ref().unwrap_or(original)
    }

    pub fn refresh_rotated(&self, original: &Secret) -> bool {
        matches!(&self.refresh_token, Some(new) if new != original)
    }
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_id: Option<&'a str>,
}

/// Raw token response from the OAuth server.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_credential(self) -> Result<AccessCredential, TokenRefreshError> {
        let access_token = Secret::non_empty(self.access_token)
            .ok_or(TokenRefreshError::MissingAccessToken)?;
        let expires_in_seconds = match self.expires_in {
            Some(secs) if secs > 0 => secs as u64,
            Some(secs) => {
                warn!(expires_in = secs, "Ignoring non-positive expires_in, using default");
                DEFAULT_EXPIRES_IN_SECS
            }
            None => DEFAULT_EXPIRES_IN_SECS,
        };
        Ok(AccessCredential {
            access_token,
            refresh_token: Secret::non_empty(self.refresh_token),
            expires_in_seconds,
        })
    }
}

/// Performs the OAuth2 refresh-grant exchange against a fixed token endpoint.
#[derive(Debug, Clone)]
pub struct TokenRefresher {
    client: reqwest::Client,
    endpoint: String,
    client_id: Option<String>,
}

impl TokenRefresher {
    pub fn new(
        endpoint: impl Into<String>,
        client_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TokenRefreshError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tokrot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(TokenRefreshError::Network)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            client_id,
        })
    }

    /// Exchange `refresh_credential` for a new access credential. Single
    /// attempt, no retry.
    pub async fn refresh(
        &self,
        refresh_credential: &Secret,
    ) -> Result<AccessCredential, TokenRefreshError> {
        let body = RefreshRequest {
            grant_type: "refresh_token",
            refresh_token: refresh_credential.expose(),
            client_id: self.client_id.as_deref(),
        };

        debug!(endpoint = %self.endpoint, "Sending refresh grant");
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| TokenRefreshError::Network(e.without_url()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| TokenRefreshError::Network(e.without_url()))?;

        if status != reqwest::StatusCode::OK {
            return Err(TokenRefreshError::HttpStatus {
                code: status.as_u16(),
                body: refresh_credential.redact_in(&text),
            });
        }

        let token_resp: TokenResponse =
            serde_json::from_str(&text).map_err(TokenRefreshError::Parse)?;
        let credential = token_resp.into_credential()?;
        debug!(
            expires_in = credential.expires_in_seconds,
            rotated_refresh = credential.refresh_token.is_some(),
            "Refresh grant succeeded"
        );
        Ok(credential)
    }
}
