use crate::utils::error::{Result, SyncError};
use std::collections::HashMap;

/// Lookup from raw portal group codes ("3a Da") to display names.
#[derive(Debug, Clone, Default)]
pub struct GroupAbbreviations {
    names: HashMap<String, String>,
}

/// Group label and title after resolving a `Hold:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGroup {
    pub group: String,
    pub title: String,
}

impl GroupAbbreviations {
    pub fn new(names: HashMap<String, String>) -> Self {
        Self { names }
    }

    /// Decoding switched off: every code resolves as unmapped.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// 從 JSON 物件載入對照表，例如 `{"Da": "Dansk"}`
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let names: HashMap<String, String> =
            serde_json::from_slice(bytes).map_err(|e| SyncError::ConfigError {
                message: format!("Group abbreviation file is not a JSON object: {}", e),
            })?;
        Ok(Self::new(names))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn resolve(&self, raw_code: &str, current_title: Option<&str>) -> ResolvedGroup {
        let current_title = current_title.filter(|t| !t.is_empty());
        match self.names.get(raw_code) {
            Some(display) => ResolvedGroup {
                group: display.clone(),
                title: match current_title {
                    Some(title) => format!("{}: {}", display, title),
                    None => display.clone(),
                },
            },
            None => ResolvedGroup {
                group: raw_code.to_string(),
                title: match current_title {
                    Some(title) => format!("{} - {}", title, raw_code),
                    None => raw_code.to_string(),
                },
            },
        }
    }
}
