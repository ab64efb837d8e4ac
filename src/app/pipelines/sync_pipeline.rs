use crate::core::abbreviations::GroupAbbreviations;
use crate::core::assembler::{assemble, week_start, weeks_from};
use crate::core::blacklist::Blacklist;
use crate::core::extractor::ExtractorConfig;
use crate::core::reconcile::{apply_plan, compute_plan, destination_snapshot, ReconcilePlan};
use crate::core::{CalendarService, ConfigProvider, Pipeline, ScheduleSource, Storage};
use crate::domain::model::{EntryStatus, ScheduleSnapshot, SyncReport, TimeWindow, WeekRef};
use crate::utils::error::{Result, SyncError};
use crate::utils::validation::{validate_required_field, validate_timezone};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

/// Run-level settings resolved from a [`ConfigProvider`].
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub calendar_id: String,
    pub timezone: Tz,
    pub weeks: u32,
    pub hide_cancelled: bool,
    pub delete_extra: bool,
    /// First day of the sync; the run covers whole ISO weeks from here.
    pub today: NaiveDate,
}

impl SyncSettings {
    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        let timezone = validate_timezone("timezone", config.timezone())?;
        Ok(Self {
            calendar_id: config.calendar_id().to_string(),
            timezone,
            weeks: config.weeks(),
            hide_cancelled: config.hide_cancelled(),
            delete_extra: config.delete_extra(),
            today: Utc::now().with_timezone(&timezone).date_naive(),
        })
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn weeks_to_sync(&self) -> Vec<WeekRef> {
        weeks_from(self.today, self.weeks)
    }

    pub fn window(&self) -> Result<TimeWindow> {
        TimeWindow::from_days(self.timezone, week_start(self.today), self.weeks).ok_or_else(|| {
            SyncError::ConfigError {
                message: format!("Cannot build a sync window starting {}", self.today),
            }
        })
    }
}

/// 依設定組出擷取用的黑名單與縮寫對照表
pub async fn extractor_config<C: ConfigProvider, S: Storage>(
    config: &C,
    storage: &S,
) -> Result<ExtractorConfig> {
    let timezone = validate_timezone("timezone", config.timezone())?;
    let blacklist = Blacklist::new(config.blacklist_rules().to_vec());

    let abbreviations = if config.decode_groups() {
        let groups_file = config.groups_file();
        let path = *validate_required_field("groups_file", &groups_file)?;
        let bytes = storage.read_file(path).await.map_err(|e| SyncError::ConfigError {
            message: format!("Cannot read group abbreviations from '{}': {}", path, e),
        })?;
        let abbreviations = GroupAbbreviations::from_json(&bytes)?;
        tracing::info!("🔤 Loaded {} group abbreviations", abbreviations.len());
        abbreviations
    } else {
        GroupAbbreviations::disabled()
    };

    Ok(ExtractorConfig::new(timezone)
        .with_blacklist(blacklist)
        .with_abbreviations(abbreviations))
}

/// Opens `source`, assembles `weeks` and always releases the session.
pub async fn fetch_schedule<S: ScheduleSource + ?Sized>(
    source: &S,
    weeks: &[WeekRef],
    extractor: &ExtractorConfig,
) -> Result<ScheduleSnapshot> {
    tracing::info!("🚀 Fetching {} week(s) of schedule", weeks.len());

    source.open().await?;
    let assembled = assemble(source, weeks, extractor).await;

    // 不論擷取成功與否都要釋放連線
    if let Err(e) = source.release().await {
        tracing::warn!("Failed to release portal session: {}", e);
    }

    assembled
}

pub struct SyncPipeline<S: ScheduleSource, C: CalendarService> {
    source: S,
    calendar: C,
    extractor: ExtractorConfig,
    settings: SyncSettings,
}

impl<S: ScheduleSource, C: CalendarService> SyncPipeline<S, C> {
    pub fn new(source: S, calendar: C, extractor: ExtractorConfig, settings: SyncSettings) -> Self {
        Self {
            source,
            calendar,
            extractor,
            settings,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn calendar(&self) -> &C {
        &self.calendar
    }
}

#[async_trait::async_trait]
impl<S: ScheduleSource, C: CalendarService> Pipeline for SyncPipeline<S, C> {
    async fn extract(&self) -> Result<ScheduleSnapshot> {
        fetch_schedule(&self.source, &self.settings.weeks_to_sync(), &self.extractor).await
    }

    async fn transform(&self, mut snapshot: ScheduleSnapshot) -> Result<ReconcilePlan> {
        if self.settings.hide_cancelled {
            let before = snapshot.len();
            snapshot.retain(|_, entry| entry.status != EntryStatus::Cancelled);
            tracing::info!("Hiding {} cancelled entries", before - snapshot.len());
        }

        let window = self.settings.window()?;
        tracing::debug!("Listing calendar events from {} to {}", window.start, window.end);
        let events = self
            .calendar
            .list_events(&self.settings.calendar_id, Some(window))
            .await?;

        let destination = destination_snapshot(events);
        tracing::debug!("{} managed events in calendar window", destination.len());

        Ok(compute_plan(&snapshot, &destination))
    }

    async fn load(&self, plan: ReconcilePlan) -> Result<SyncReport> {
        apply_plan(
            &self.calendar,
            &self.settings.calendar_id,
            plan,
            self.settings.delete_extra,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn settings(today: NaiveDate, weeks: u32) -> SyncSettings {
        SyncSettings {
            calendar_id: "primary".to_string(),
            timezone: "Europe/Copenhagen".parse().unwrap(),
            weeks,
            hide_cancelled: false,
            delete_extra: false,
            today,
        }
    }

    #[test]
    fn test_window_starts_on_monday() {
        let wednesday = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let settings = settings(wednesday, 2);
        let window = settings.window().unwrap();

        assert_eq!(
            window.start,
            settings.timezone.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap()
        );
        assert_eq!(
            window.end,
            settings.timezone.with_ymd_and_hms(2024, 1, 22, 0, 0, 0).unwrap()
        );
        assert_eq!(
            settings.weeks_to_sync(),
            vec![WeekRef { year: 2024, week: 2 }, WeekRef { year: 2024, week: 3 }]
        );
    }

    #[test]
    fn test_weeks_roll_over_the_year() {
        let settings = settings(NaiveDate::from_ymd_opt(2024, 12, 27).unwrap(), 2);
        assert_eq!(
            settings.weeks_to_sync(),
            vec![WeekRef { year: 2024, week: 52 }, WeekRef { year: 2025, week: 1 }]
        );
    }
}
