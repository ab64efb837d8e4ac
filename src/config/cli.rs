use crate::adapters::google::DEFAULT_CALENDAR_API_URL;
use crate::adapters::portal::DEFAULT_PORTAL_URL;
use crate::config::validate_provider;
use crate::core::blacklist::{Blacklist, BlacklistRule};
use crate::core::ConfigProvider;
use crate::utils::error::{Result, SyncError};
use crate::utils::validation::Validate;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "skema-sync")]
#[command(about = "Copy a Lectio schedule into a Google Calendar")]
pub struct CliConfig {
    #[arg(long, env = "LECTIO_USERNAME")]
    pub username: String,

    #[arg(long, env = "LECTIO_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[arg(long, env = "LECTIO_SCHOOL_ID")]
    pub school_id: String,

    #[arg(long, default_value = super::DEFAULT_CALENDAR_ID)]
    pub calendar_id: String,

    #[arg(long, default_value = super::DEFAULT_TOKEN_PATH, help = "OAuth token file, rewritten on refresh")]
    pub token_path: String,

    #[arg(long, default_value = super::DEFAULT_CREDENTIALS_PATH, help = "OAuth client credentials used to refresh the token")]
    pub credentials_path: String,

    #[arg(long, default_value_t = super::DEFAULT_WEEKS)]
    pub weeks: u32,

    #[arg(long, help = "Leave cancelled classes out of the calendar")]
    pub hide_cancelled: bool,

    #[arg(long, help = "Expand group codes using --groups-file")]
    pub decode_groups: bool,

    #[arg(long)]
    pub groups_file: Option<String>,

    #[arg(long, help = "TOML file with [[rules]] entries")]
    pub blacklist_file: Option<String>,

    #[arg(long, help = "Delete managed events no longer on the schedule")]
    pub delete_extra: bool,

    #[arg(long, default_value = super::DEFAULT_TIMEZONE)]
    pub timezone: String,

    #[arg(long, default_value = DEFAULT_PORTAL_URL)]
    pub portal_url: String,

    #[arg(long, default_value = DEFAULT_CALENDAR_API_URL)]
    pub calendar_api_url: String,

    #[arg(long, help = "Also write the extracted schedule to this JSON file")]
    pub dump_json: Option<String>,

    #[arg(long, help = "Plan the changes without writing to the calendar")]
    pub dry_run: bool,

    #[arg(long, help = "Log as JSON lines")]
    pub json_logs: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(skip)]
    pub blacklist_rules: Vec<BlacklistRule>,
}

impl CliConfig {
    /// Loads `--blacklist-file` into `blacklist_rules`.
    pub fn load_blacklist(&mut self) -> Result<()> {
        if let Some(path) = &self.blacklist_file {
            let content = std::fs::read_to_string(path).map_err(|e| SyncError::ConfigError {
                message: format!("Cannot read blacklist file '{}': {}", path, e),
            })?;
            let blacklist = Blacklist::from_toml_str(&content)?;
            tracing::debug!("Loaded {} blacklist rules from {}", blacklist.rules().len(), path);
            self.blacklist_rules = blacklist.rules().to_vec();
        }
        Ok(())
    }
}

impl ConfigProvider for CliConfig {
    fn username(&self) -> &str {
        &self.username
    }

    fn password(&self) -> &str {
        &self.password
    }

    fn school_id(&self) -> &str {
        &self.school_id
    }

    fn portal_url(&self) -> &str {
        &self.portal_url
    }

    fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    fn calendar_api_url(&self) -> &str {
        &self.calendar_api_url
    }

    fn token_path(&self) -> &str {
        &self.token_path
    }

    fn credentials_path(&self) -> &str {
        &self.credentials_path
    }

    fn timezone(&self) -> &str {
        &self.timezone
    }

    fn weeks(&self) -> u32 {
        self.weeks
    }

    fn hide_cancelled(&self) -> bool {
        self.hide_cancelled
    }

    fn decode_groups(&self) -> bool {
        self.decode_groups
    }

    fn groups_file(&self) -> Option<&str> {
        self.groups_file.as_deref()
    }

    fn blacklist_rules(&self) -> &[BlacklistRule] {
        &self.blacklist_rules
    }

    fn delete_extra(&self) -> bool {
        self.delete_extra
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_provider(self)
    }
}
