use crate::core::blacklist::BlacklistRule;
use crate::domain::model::{RemoteEvent, ScheduleSnapshot, SyncReport, TimeWindow, WeekRef};
use crate::core::reconcile::ReconcilePlan;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn username(&self) -> &str;
    fn password(&self) -> &str;
    fn school_id(&self) -> &str;
    fn portal_url(&self) -> &str;
    fn calendar_id(&self) -> &str;
    fn calendar_api_url(&self) -> &str;
    fn token_path(&self) -> &str;
    fn credentials_path(&self) -> &str;
    fn timezone(&self) -> &str;
    fn weeks(&self) -> u32;
    fn hide_cancelled(&self) -> bool;
    fn decode_groups(&self) -> bool;
    fn groups_file(&self) -> Option<&str>;
    fn blacklist_rules(&self) -> &[BlacklistRule];
    fn delete_extra(&self) -> bool;
}

/// Logged-in session against the schedule portal.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn open(&self) -> Result<()>;
    /// Raw markup holding the week's schedule cells.
    async fn fetch_week(&self, week: WeekRef) -> Result<String>;
    async fn release(&self) -> Result<()>;
}

#[async_trait]
pub trait CalendarService: Send + Sync {
    async fn list_events(
        &self,
        calendar_id: &str,
        window: Option<TimeWindow>,
    ) -> Result<Vec<RemoteEvent>>;
    async fn get_event(&self, calendar_id: &str, event_id: &str) -> Result<Option<RemoteEvent>>;
    async fn insert_event(&self, calendar_id: &str, event: &RemoteEvent) -> Result<RemoteEvent>;
    async fn update_event(&self, calendar_id: &str, event: &RemoteEvent) -> Result<RemoteEvent>;
    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<()>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ScheduleSnapshot>;
    async fn transform(&self, snapshot: ScheduleSnapshot) -> Result<ReconcilePlan>;
    async fn load(&self, plan: ReconcilePlan) -> Result<SyncReport>;
}
