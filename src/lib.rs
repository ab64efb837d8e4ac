pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::google::GoogleCalendar;
pub use adapters::portal::{PortalCredentials, PortalSession};
pub use adapters::storage::LocalStorage;
pub use app::pipelines::sync_pipeline::{SyncPipeline, SyncSettings};
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;
pub use core::etl::SyncEngine;
pub use utils::error::{Result, SyncError};
