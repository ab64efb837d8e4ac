pub mod abbreviations;
pub mod assembler;
pub mod blacklist;
pub mod etl;
pub mod extractor;
pub mod reconcile;
pub mod timespan;

pub use crate::domain::model::{RemoteEvent, ScheduleEntry, ScheduleSnapshot, SyncReport};
pub use crate::domain::ports::{CalendarService, ConfigProvider, Pipeline, ScheduleSource, Storage};
pub use crate::utils::error::Result;
