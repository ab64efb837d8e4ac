//! HTTP session against the Lectio schedule portal.
//!
//! Login is the ASP.NET form post: the hidden inputs of the login page are
//! echoed back together with the credentials, and the session cookie is kept
//! in the client's cookie store for the week requests that follow.

use crate::core::ScheduleSource;
use crate::domain::model::WeekRef;
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::atomic::{AtomicBool, Ordering};

pub const DEFAULT_PORTAL_URL: &str = "https://www.lectio.dk";
const SCHEDULE_TABLE_ID: &str = "s_m_Content_Content_SkemaNyMedNavigation_skema_skematabel";
const USERNAME_FIELD: &str = "m$Content$username";
const PASSWORD_FIELD: &str = "m$Content$password";
const SUBMIT_TARGET: &str = "m$Content$submitbtn2";

#[derive(Debug, Clone)]
pub struct PortalCredentials {
    pub username: String,
    pub password: String,
    pub school_id: String,
}

pub struct PortalSession {
    client: Client,
    base_url: String,
    credentials: PortalCredentials,
    logged_in: AtomicBool,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| SyncError::ConfigError {
        message: format!("Invalid selector '{}': {}", css, e),
    })
}

/// Name/value pairs of every hidden input on the page.
fn hidden_inputs(page: &str) -> Result<Vec<(String, String)>> {
    let document = Html::parse_document(page);
    let hidden = selector("input[type=hidden]")?;
    Ok(document
        .select(&hidden)
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            let value = input.value().attr("value").unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect())
}

/// Inner HTML of the schedule table, or `None` when the page has none.
pub fn schedule_table(page: &str) -> Result<Option<String>> {
    let document = Html::parse_document(page);
    let table = selector(&format!("#{}", SCHEDULE_TABLE_ID))?;
    Ok(document.select(&table).next().map(|element| element.inner_html()))
}

impl PortalSession {
    pub fn new(base_url: &str, credentials: PortalCredentials) -> Result<Self> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            logged_in: AtomicBool::new(false),
        })
    }

    fn school_url(&self, page: &str) -> String {
        format!(
            "{}/lectio/{}/{}",
            self.base_url, self.credentials.school_id, page
        )
    }

    pub fn login_url(&self) -> String {
        self.school_url("login.aspx")
    }

    pub fn week_url(&self, week: WeekRef) -> String {
        self.school_url(&format!("SkemaNy.aspx?week={:02}{}", week.week, week.year))
    }

    async fn get_text(&self, url: &str) -> Result<(String, String)> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let final_url = response.url().to_string();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SyncError::ApiError {
                status: status.as_u16(),
                message: format!("GET {} failed", url),
            });
        }
        Ok((final_url, body))
    }
}

#[async_trait]
impl ScheduleSource for PortalSession {
    async fn open(&self) -> Result<()> {
        let login_url = self.login_url();
        tracing::info!("🔐 Logging in to {}", login_url);

        let (_, login_page) = self.get_text(&login_url).await?;
        let mut form = hidden_inputs(&login_page)?;
        form.retain(|(name, _)| name != "__EVENTTARGET");
        form.push(("__EVENTTARGET".to_string(), SUBMIT_TARGET.to_string()));
        form.push((USERNAME_FIELD.to_string(), self.credentials.username.clone()));
        form.push((PASSWORD_FIELD.to_string(), self.credentials.password.clone()));

        let response = self.client.post(&login_url).form(&form).send().await?;
        let status = response.status();
        let landed_on = response.url().path().to_string();

        if !status.is_success() {
            return Err(SyncError::AuthenticationError {
                message: format!("login returned {}", status),
            });
        }
        // 登入失敗時會停留在 login.aspx
        if landed_on.ends_with("login.aspx") {
            return Err(SyncError::AuthenticationError {
                message: format!(
                    "portal rejected the credentials for school {}",
                    self.credentials.school_id
                ),
            });
        }

        self.logged_in.store(true, Ordering::SeqCst);
        tracing::debug!("Logged in, landed on {}", landed_on);
        Ok(())
    }

    async fn fetch_week(&self, week: WeekRef) -> Result<String> {
        if !self.logged_in.load(Ordering::SeqCst) {
            return Err(SyncError::FetchError {
                week: week.to_string(),
                message: "portal session is not open".to_string(),
            });
        }

        let url = self.week_url(week);
        let (_, page) = self.get_text(&url).await.map_err(|e| SyncError::FetchError {
            week: week.to_string(),
            message: e.to_string(),
        })?;

        schedule_table(&page)?.ok_or_else(|| SyncError::FetchError {
            week: week.to_string(),
            message: "schedule table not found on page".to_string(),
        })
    }

    async fn release(&self) -> Result<()> {
        if self.logged_in.swap(false, Ordering::SeqCst) {
            tracing::debug!("Logging out of portal");
            self.client.get(self.school_url("logout.aspx")).send().await?;
        }
        Ok(())
    }
}
