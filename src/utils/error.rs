use thiserror::Error;

/// 單一欄位或時間區段解析失敗，只影響該筆課程
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed time span '{token}': {reason}")]
    FormatError { token: String, reason: String },

    #[error("Entry {id} has no date/time span")]
    MissingSpan { id: String },
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Failed to fetch schedule for week {week}: {message}")]
    FetchError { week: String, message: String },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Authentication failed: {message}")]
    AuthenticationError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Calendar {operation} failed for event {event_id}: {message}")]
    ReconcileError {
        operation: String,
        event_id: String,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Parse,
    Fetch,
    Config,
    Reconcile,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// 根據錯誤嚴重程度決定退出碼
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,      // 警告，但成功
            ErrorSeverity::Medium => 2,   // 重試錯誤
            ErrorSeverity::High => 1,     // 處理錯誤
            ErrorSeverity::Critical => 3, // 系統錯誤
        }
    }
}

impl SyncError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SyncError::Parse(_) => ErrorCategory::Parse,
            SyncError::FetchError { .. }
            | SyncError::HttpError(_)
            | SyncError::ApiError { .. }
            | SyncError::AuthenticationError { .. } => ErrorCategory::Fetch,
            SyncError::ConfigError { .. }
            | SyncError::MissingConfigError { .. }
            | SyncError::InvalidConfigValueError { .. }
            | SyncError::ConfigValidationError { .. } => ErrorCategory::Config,
            SyncError::ReconcileError { .. } => ErrorCategory::Reconcile,
            SyncError::IoError(_) | SyncError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Parse => ErrorSeverity::Low,
            // 網路或 API 問題，重跑通常即可
            ErrorCategory::Fetch => ErrorSeverity::Medium,
            ErrorCategory::Reconcile | ErrorCategory::Config => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            SyncError::Parse(_) => {
                "The entry was skipped; check the portal page if it should have been synced".to_string()
            }
            SyncError::FetchError { week, .. } => {
                format!("Check portal availability for week {} and rerun", week)
            }
            SyncError::HttpError(_) | SyncError::ApiError { .. } => {
                "Check network connectivity and rerun; event ids are stable so reruns are safe".to_string()
            }
            SyncError::AuthenticationError { .. } => {
                "Verify username, password and school id, or refresh the calendar token".to_string()
            }
            SyncError::ConfigError { .. }
            | SyncError::ConfigValidationError { .. }
            | SyncError::InvalidConfigValueError { .. } => {
                "Review the configuration file and command line flags".to_string()
            }
            SyncError::MissingConfigError { field } => {
                format!("Provide a value for '{}'", field)
            }
            SyncError::ReconcileError { event_id, .. } => format!(
                "The calendar was partially updated; rerun to continue from event {}",
                event_id
            ),
            SyncError::IoError(_) => "Check file paths and permissions".to_string(),
            SyncError::SerializationError(_) => {
                "The file or response is not valid JSON".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Parse => format!("Could not read a schedule entry: {}", self),
            ErrorCategory::Fetch => format!("Could not reach the portal or calendar: {}", self),
            ErrorCategory::Config => format!("Configuration problem: {}", self),
            ErrorCategory::Reconcile => format!("Calendar update stopped: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
