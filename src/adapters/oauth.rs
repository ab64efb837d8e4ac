//! OAuth2 token file and refresh-token grant for the Google adapter.
//!
//! The token file has the shape written by the usual installed-app flow:
//! `access_token`, `token_type`, `refresh_token` and an RFC3339 `expiry`.
//! The client credentials come from the `credentials.json` downloaded from
//! the Google console (`installed` or `web` section).

use crate::utils::error::{Result, SyncError};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const EXPIRY_LEEWAY_SECS: i64 = 60;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OAuthToken {
    #[serde(default)]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl OAuthToken {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: Some("Bearer".to_string()),
            ..Self::default()
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|e| SyncError::ConfigError {
            message: format!("Cannot read token file '{}': {}", path.display(), e),
        })?;
        let token: OAuthToken =
            serde_json::from_slice(&raw).map_err(|e| SyncError::ConfigError {
                message: format!("Token file '{}' is not valid JSON: {}", path.display(), e),
            })?;
        if token.access_token.is_empty() && !token.can_refresh() {
            return Err(SyncError::MissingConfigError {
                field: "access_token".to_string(),
            });
        }
        Ok(token)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// True when the access token is missing or expires within the leeway.
    /// A zero or absent expiry means the token does not expire.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_empty() {
            return true;
        }
        match self.expiry {
            Some(expiry) if expiry.timestamp() > 0 => {
                expiry - Duration::seconds(EXPIRY_LEEWAY_SECS) <= now
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<OAuthClient>,
    web: Option<OAuthClient>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    token_type: Option<String>,
}

impl OAuthClient {
    pub fn from_credentials_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|e| SyncError::ConfigError {
            message: format!("Cannot read credentials file '{}': {}", path.display(), e),
        })?;
        let file: CredentialsFile =
            serde_json::from_slice(&raw).map_err(|e| SyncError::ConfigError {
                message: format!("Credentials file '{}' is not valid JSON: {}", path.display(), e),
            })?;
        file.installed
            .or(file.web)
            .ok_or_else(|| SyncError::MissingConfigError {
                field: "installed.client_id".to_string(),
            })
    }

    /// Exchanges the refresh token for a new access token. Google usually
    /// omits `refresh_token` from the answer, so the old one is carried over.
    pub async fn refresh(&self, client: &Client, token: &OAuthToken) -> Result<OAuthToken> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SyncError::AuthenticationError {
                message: "token file has no refresh_token".to_string(),
            })?;

        let response = client
            .post(&self.token_uri)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SyncError::AuthenticationError {
                message: format!("token refresh failed ({}): {}", status, error_text),
            });
        }

        let refreshed: RefreshResponse = response.json().await?;
        Ok(OAuthToken {
            access_token: refreshed.access_token,
            token_type: refreshed.token_type.or_else(|| token.token_type.clone()),
            refresh_token: refreshed
                .refresh_token
                .filter(|t| !t.is_empty())
                .or_else(|| token.refresh_token.clone()),
            expiry: refreshed
                .expires_in
                .filter(|secs| *secs > 0)
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        })
    }
}
