#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::TomlConfig;

use crate::core::ConfigProvider;
use crate::utils::error::{Result, SyncError};
use crate::utils::validation::*;

pub const DEFAULT_TIMEZONE: &str = "Europe/Copenhagen";
pub const DEFAULT_CALENDAR_ID: &str = "primary";
pub const DEFAULT_TOKEN_PATH: &str = "token.json";
pub const DEFAULT_CREDENTIALS_PATH: &str = "credentials.json";
pub const DEFAULT_WEEKS: u32 = 2;
const MAX_WEEKS: u32 = 52;

/// 所有設定來源共用的檢查
pub fn validate_provider<C: ConfigProvider>(config: &C) -> Result<()> {
    validate_non_empty_string("username", config.username())?;
    validate_non_empty_string("password", config.password())?;
    validate_non_empty_string("school_id", config.school_id())?;
    if !config.school_id().chars().all(|c| c.is_ascii_digit()) {
        return Err(SyncError::InvalidConfigValueError {
            field: "school_id".to_string(),
            value: config.school_id().to_string(),
            reason: "School id must be numeric".to_string(),
        });
    }

    validate_url("portal_url", config.portal_url())?;
    validate_url("calendar_api_url", config.calendar_api_url())?;
    validate_non_empty_string("calendar_id", config.calendar_id())?;
    validate_path("token_path", config.token_path())?;
    validate_path("credentials_path", config.credentials_path())?;

    validate_range("weeks", config.weeks(), 1, MAX_WEEKS)?;
    validate_timezone("timezone", config.timezone())?;

    if config.decode_groups() {
        validate_required_field("groups_file", &config.groups_file())?;
    }
    if let Some(groups_file) = config.groups_file() {
        validate_file_extensions("groups_file", &[groups_file.to_string()], &["json"])?;
    }

    Ok(())
}
