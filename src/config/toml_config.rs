use crate::adapters::google::DEFAULT_CALENDAR_API_URL;
use crate::adapters::portal::DEFAULT_PORTAL_URL;
use crate::config::{validate_provider, DEFAULT_CALENDAR_ID, DEFAULT_CREDENTIALS_PATH, DEFAULT_TIMEZONE, DEFAULT_TOKEN_PATH, DEFAULT_WEEKS};
use crate::core::blacklist::{Blacklist, BlacklistRule};
use crate::core::ConfigProvider;
use crate::utils::error::{Result, SyncError};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    pub portal: PortalConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub blacklist: Vec<BlacklistRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    #[serde(default = "default_portal_url")]
    pub url: String,
    pub school_id: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_calendar_id")]
    pub id: String,
    #[serde(default = "default_calendar_api_url")]
    pub api_url: String,
    #[serde(default = "default_token_path")]
    pub token_path: String,
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_weeks")]
    pub weeks: u32,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub hide_cancelled: bool,
    #[serde(default)]
    pub decode_groups: bool,
    pub groups_file: Option<String>,
    #[serde(default)]
    pub delete_extra: bool,
    pub dump_json: Option<String>,
}

fn default_portal_url() -> String {
    DEFAULT_PORTAL_URL.to_string()
}

fn default_calendar_id() -> String {
    DEFAULT_CALENDAR_ID.to_string()
}

fn default_calendar_api_url() -> String {
    DEFAULT_CALENDAR_API_URL.to_string()
}

fn default_token_path() -> String {
    DEFAULT_TOKEN_PATH.to_string()
}

fn default_credentials_path() -> String {
    DEFAULT_CREDENTIALS_PATH.to_string()
}

fn default_weeks() -> u32 {
    DEFAULT_WEEKS
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            id: default_calendar_id(),
            api_url: default_calendar_api_url(),
            token_path: default_token_path(),
            credentials_path: default_credentials_path(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            weeks: default_weeks(),
            timezone: default_timezone(),
            hide_cancelled: false,
            decode_groups: false,
            groups_file: None,
            delete_extra: false,
            dump_json: None,
        }
    }
}

fn env_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("env pattern is valid"))
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        let mut config: TomlConfig =
            toml::from_str(&processed_content).map_err(|e| SyncError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;

        // 關鍵字統一轉小寫
        config.blacklist = Blacklist::new(config.blacklist).rules().to_vec();
        Ok(config)
    }

    /// 替換環境變數 (例如 ${LECTIO_PASSWORD})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        env_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn dump_json(&self) -> Option<&str> {
        self.sync.dump_json.as_deref()
    }
}

impl ConfigProvider for TomlConfig {
    fn username(&self) -> &str {
        &self.portal.username
    }

    fn password(&self) -> &str {
        &self.portal.password
    }

    fn school_id(&self) -> &str {
        &self.portal.school_id
    }

    fn portal_url(&self) -> &str {
        &self.portal.url
    }

    fn calendar_id(&self) -> &str {
        &self.calendar.id
    }

    fn calendar_api_url(&self) -> &str {
        &self.calendar.api_url
    }

    fn token_path(&self) -> &str {
        &self.calendar.token_path
    }

    fn credentials_path(&self) -> &str {
        &self.calendar.credentials_path
    }

    fn timezone(&self) -> &str {
        &self.sync.timezone
    }

    fn weeks(&self) -> u32 {
        self.sync.weeks
    }

    fn hide_cancelled(&self) -> bool {
        self.sync.hide_cancelled
    }

    fn decode_groups(&self) -> bool {
        self.sync.decode_groups
    }

    fn groups_file(&self) -> Option<&str> {
        self.sync.groups_file.as_deref()
    }

    fn blacklist_rules(&self) -> &[BlacklistRule] {
        &self.blacklist
    }

    fn delete_extra(&self) -> bool {
        self.sync.delete_extra
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_provider(self)?;
        // 未替換的 ${VAR} 代表環境變數沒有設定
        for (field, value) in [
            ("portal.username", self.username()),
            ("portal.password", self.password()),
        ] {
            if env_pattern().is_match(value) {
                return Err(SyncError::InvalidConfigValueError {
                    field: field.to_string(),
                    value: value.to_string(),
                    reason: "Environment variable is not set".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[portal]
school_id = "681"
username = "elev"
password = "hemmeligt"

[sync]
weeks = 3
hide_cancelled = true

[[blacklist]]
after = "15:00"
keywords = ["Studiecafé"]
titles = ["Lektiehjælp"]
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.portal_url(), "https://www.lectio.dk");
        assert_eq!(config.calendar_id(), "primary");
        assert_eq!(config.weeks(), 3);
        assert!(config.hide_cancelled());
        assert!(!config.delete_extra());
        assert_eq!(config.timezone(), "Europe/Copenhagen");

        let rule = &config.blacklist_rules()[0];
        assert_eq!(rule.after, NaiveTime::from_hms_opt(15, 0, 0).unwrap());
        assert_eq!(rule.keywords, vec!["studiecafé".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SKEMA_TEST_PASSWORD", "fra-miljøet");

        let toml_content = r#"
[portal]
school_id = "681"
username = "elev"
password = "${SKEMA_TEST_PASSWORD}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.password(), "fra-miljøet");

        std::env::remove_var("SKEMA_TEST_PASSWORD");
    }

    #[test]
    fn test_unset_env_var_fails_validation() {
        let toml_content = r#"
[portal]
school_id = "681"
username = "elev"
password = "${SKEMA_TEST_SURELY_UNSET}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[portal]
url = "invalid-url"
school_id = "681"
username = "elev"
password = "x"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_portal_section() {
        assert!(matches!(
            TomlConfig::from_toml_str("[sync]\nweeks = 1\n"),
            Err(SyncError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[portal]
school_id = "681"
username = "elev"
password = "x"

[calendar]
id = "skole@group.calendar.google.com"
credentials_path = "secrets/client.json"

[sync]
dump_json = "schedule"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.calendar_id(), "skole@group.calendar.google.com");
        assert_eq!(config.dump_json(), Some("schedule"));
        assert_eq!(config.credentials_path(), "secrets/client.json");
        assert_eq!(config.token_path(), "token.json");
    }
}
