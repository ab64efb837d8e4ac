use crate::utils::error::{Result, SyncError};
use chrono::{DateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlacklistRule {
    /// Rule applies to entries starting at or after this time of day.
    #[serde(deserialize_with = "deserialize_time_of_day")]
    pub after: NaiveTime,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub titles: Vec<String>,
}

impl BlacklistRule {
    pub fn new(after: NaiveTime, keywords: &[&str], titles: &[&str]) -> Self {
        Self {
            after,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            titles: titles.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn matches(&self, title: &str, lowered: &str, time_of_day: NaiveTime) -> bool {
        time_of_day >= self.after
            && (self.keywords.iter().any(|k| lowered.contains(k.as_str()))
                || self.titles.iter().any(|t| t == title))
    }
}

fn deserialize_time_of_day<'de, D>(deserializer: D) -> std::result::Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveTime::parse_from_str(&raw, "%H:%M").map_err(serde::de::Error::custom)
}

/// Time-gated suppression list consulted during extraction.
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    rules: Vec<BlacklistRule>,
}

#[derive(Deserialize)]
struct BlacklistFile {
    #[serde(default)]
    rules: Vec<BlacklistRule>,
}

impl Blacklist {
    pub fn new(rules: Vec<BlacklistRule>) -> Self {
        // 關鍵字一律以小寫比對
        let rules = rules
            .into_iter()
            .map(|mut rule| {
                rule.keywords = rule.keywords.iter().map(|k| k.to_lowercase()).collect();
                rule
            })
            .collect();
        Self { rules }
    }

    /// 從 TOML 字串載入 `[[rules]]`
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: BlacklistFile =
            toml::from_str(content).map_err(|e| SyncError::ConfigValidationError {
                field: "blacklist".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;
        Ok(Self::new(file.rules))
    }

    pub fn rules(&self) -> &[BlacklistRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Only the time of day of `start` is considered.
    pub fn is_suppressed<Tz: TimeZone>(&self, title: &str, start: &DateTime<Tz>) -> bool {
        let time_of_day = start.time();
        let lowered = title.to_lowercase();
        self.rules
            .iter()
            .any(|rule| rule.matches(title, &lowered, time_of_day))
    }
}
