//! Google Calendar v3 over plain REST with a bearer token.
//!
//! Expired access tokens are refreshed with the stored refresh token when
//! client credentials are available, and the new token is written back to
//! the token file.

use crate::adapters::oauth::{OAuthClient, OAuthToken};
use crate::core::CalendarService;
use crate::domain::model::{RemoteEvent, TimeWindow};
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub const DEFAULT_CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";
const PAGE_SIZE: &str = "2500";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<RemoteEvent>,
    next_page_token: Option<String>,
}

pub struct GoogleCalendar {
    client: Client,
    base_url: String,
    token: Mutex<OAuthToken>,
    oauth: Option<OAuthClient>,
    token_path: Option<PathBuf>,
}

fn encode(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

impl GoogleCalendar {
    /// Client with a fixed access token and no refresh.
    pub fn new(base_url: &str, access_token: String) -> Result<Self> {
        Self::with_token(base_url, OAuthToken::bearer(access_token))
    }

    fn with_token(base_url: &str, token: OAuthToken) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Mutex::new(token),
            oauth: None,
            token_path: None,
        })
    }

    /// Reads a stored OAuth token file. Refreshed tokens are saved back to it.
    pub fn from_token_file(base_url: &str, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut calendar = Self::with_token(base_url, OAuthToken::from_file(path)?)?;
        calendar.token_path = Some(path.to_path_buf());
        Ok(calendar)
    }

    pub fn with_oauth_client(mut self, oauth: OAuthClient) -> Self {
        self.oauth = Some(oauth);
        self
    }

    /// Token file plus, when the credentials file exists, the OAuth client
    /// used to refresh it.
    pub fn connect(
        base_url: &str,
        token_path: impl AsRef<Path>,
        credentials_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let calendar = Self::from_token_file(base_url, token_path)?;
        let credentials_path = credentials_path.as_ref();
        if !credentials_path.exists() {
            tracing::warn!(
                "⚠️ No OAuth client credentials at {}, expired tokens cannot be refreshed",
                credentials_path.display()
            );
            return Ok(calendar);
        }
        Ok(calendar.with_oauth_client(OAuthClient::from_credentials_file(credentials_path)?))
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!("{}/calendars/{}/events", self.base_url, encode(calendar_id))
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        format!("{}/{}", self.events_url(calendar_id), encode(event_id))
    }

    /// Refreshes the token in place and saves it to the token file.
    async fn refresh_locked(&self, oauth: &OAuthClient, token: &mut OAuthToken) -> Result<()> {
        *token = oauth.refresh(&self.client, token).await?;
        tracing::info!("🔑 Access token refreshed");
        if let Some(path) = &self.token_path {
            token.save(path).await?;
            tracing::debug!("Saved refreshed token to {}", path.display());
        }
        Ok(())
    }

    async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if token.needs_refresh(Utc::now()) {
            match &self.oauth {
                Some(oauth) if token.can_refresh() => self.refresh_locked(oauth, &mut token).await?,
                _ if token.access_token.is_empty() => {
                    return Err(SyncError::AuthenticationError {
                        message: "no access token and no OAuth client credentials to refresh it"
                            .to_string(),
                    })
                }
                _ => tracing::warn!("⚠️ Access token has expired and cannot be refreshed"),
            }
        }
        Ok(token.access_token.clone())
    }

    /// New access token after a 401, or `None` when refreshing is impossible.
    async fn refresh_after_rejection(&self, rejected: &str) -> Result<Option<String>> {
        let mut token = self.token.lock().await;
        if token.access_token != rejected {
            // 其他請求已經更新過
            return Ok(Some(token.access_token.clone()));
        }
        match &self.oauth {
            Some(oauth) if token.can_refresh() => {
                self.refresh_locked(oauth, &mut token).await?;
                Ok(Some(token.access_token.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let retry = request.try_clone();
        let access_token = self.access_token().await?;
        let response = request.bearer_auth(&access_token).send().await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        let Some(retry) = retry else {
            return Ok(response);
        };
        match self.refresh_after_rejection(&access_token).await? {
            Some(fresh) => {
                tracing::debug!("Retrying request with refreshed token");
                Ok(retry.bearer_auth(&fresh).send().await?)
            }
            None => Ok(response),
        }
    }
}

async fn api_error(response: Response) -> SyncError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    SyncError::ApiError { status, message }
}

async fn expect_event(response: Response) -> Result<RemoteEvent> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    Ok(response.json::<RemoteEvent>().await?)
}

#[async_trait]
impl CalendarService for GoogleCalendar {
    async fn list_events(
        &self,
        calendar_id: &str,
        window: Option<TimeWindow>,
    ) -> Result<Vec<RemoteEvent>> {
        let url = self.events_url(calendar_id);
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = vec![
                ("showDeleted", "true".to_string()),
                ("singleEvents", "true".to_string()),
                ("maxResults", PAGE_SIZE.to_string()),
            ];
            if let Some(window) = &window {
                query.push(("timeMin", window.start.to_rfc3339_opts(SecondsFormat::Secs, false)));
                query.push(("timeMax", window.end.to_rfc3339_opts(SecondsFormat::Secs, false)));
            }
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self.send(self.client.get(&url).query(&query)).await?;
            if !response.status().is_success() {
                return Err(api_error(response).await);
            }
            let page: EventsPage = response.json().await?;
            tracing::debug!("Listed {} events", page.items.len());
            events.extend(page.items);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(events)
    }

    async fn get_event(&self, calendar_id: &str, event_id: &str) -> Result<Option<RemoteEvent>> {
        let response = self
            .send(self.client.get(self.event_url(calendar_id, event_id)))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        expect_event(response).await.map(Some)
    }

    async fn insert_event(&self, calendar_id: &str, event: &RemoteEvent) -> Result<RemoteEvent> {
        let response = self
            .send(self.client.post(self.events_url(calendar_id)).json(event))
            .await?;
        expect_event(response).await
    }

    async fn update_event(&self, calendar_id: &str, event: &RemoteEvent) -> Result<RemoteEvent> {
        let response = self
            .send(self.client.put(self.event_url(calendar_id, &event.id)).json(event))
            .await?;
        expect_event(response).await
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<()> {
        let response = self
            .send(self.client.delete(self.event_url(calendar_id, event_id)))
            .await?;
        match response.status() {
            // 已經不存在也算成功
            StatusCode::NOT_FOUND | StatusCode::GONE => Ok(()),
            status if status.is_success() => Ok(()),
            _ => Err(api_error(response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_urls_encode_calendar_id() {
        let calendar = GoogleCalendar::new(DEFAULT_CALENDAR_API_URL, "t".to_string()).unwrap();
        assert_eq!(
            calendar.event_url("skole@group.calendar.google.com", "lec123"),
            "https://www.googleapis.com/calendar/v3/calendars/skole%40group.calendar.google.com/events/lec123"
        );
    }

    #[test]
    fn test_token_file() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("token.json");
        std::fs::write(&good, r#"{"access_token":"ya29.abc","refresh_token":"r"}"#).unwrap();
        let calendar = GoogleCalendar::from_token_file(DEFAULT_CALENDAR_API_URL, &good).unwrap();
        assert_eq!(calendar.token_path.as_deref(), Some(good.as_path()));
        assert!(calendar.oauth.is_none());

        let bad = temp_dir.path().join("empty.json");
        std::fs::write(&bad, r#"{"token_type":"Bearer"}"#).unwrap();
        let err = GoogleCalendar::from_token_file(DEFAULT_CALENDAR_API_URL, &bad)
            .err()
            .unwrap();
        assert!(matches!(err, SyncError::MissingConfigError { .. }));

        let missing = temp_dir.path().join("nope.json");
        assert!(GoogleCalendar::from_token_file(DEFAULT_CALENDAR_API_URL, &missing).is_err());

        // credentials file is optional
        let calendar =
            GoogleCalendar::connect(DEFAULT_CALENDAR_API_URL, &good, &missing).unwrap();
        assert!(calendar.oauth.is_none());
    }

    #[tokio::test]
    async fn test_refresh_token_without_client_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("token.json");
        std::fs::write(&path, r#"{"refresh_token":"r"}"#).unwrap();

        let calendar = GoogleCalendar::from_token_file(DEFAULT_CALENDAR_API_URL, &path).unwrap();
        let err = calendar.access_token().await.unwrap_err();
        assert!(matches!(err, SyncError::AuthenticationError { .. }));
    }
}
