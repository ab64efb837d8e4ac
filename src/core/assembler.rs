use crate::core::extractor::{extract_week, ExtractorConfig};
use crate::domain::model::{ScheduleSnapshot, WeekRef};
use crate::domain::ports::ScheduleSource;
use crate::utils::error::{Result, SyncError};
use chrono::{Datelike, Duration, NaiveDate};

/// Monday of the ISO week containing `day`.
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.weekday().num_days_from_monday()))
}

/// `count` consecutive ISO weeks starting with the week of `today`.
pub fn weeks_from(today: NaiveDate, count: u32) -> Vec<WeekRef> {
    let monday = week_start(today);
    (0..count)
        .map(|offset| {
            let iso = (monday + Duration::weeks(i64::from(offset))).iso_week();
            WeekRef {
                year: iso.year(),
                week: iso.week(),
            }
        })
        .collect()
}

/// Fetches and extracts each week in turn and merges the results. The first
/// failed fetch aborts the whole assembly.
pub async fn assemble<S>(
    source: &S,
    weeks: &[WeekRef],
    config: &ExtractorConfig,
) -> Result<ScheduleSnapshot>
where
    S: ScheduleSource + ?Sized,
{
    let mut snapshot = ScheduleSnapshot::new();

    for &week in weeks {
        tracing::debug!("Fetching schedule for week {}", week);
        let markup = source.fetch_week(week).await.map_err(|e| match e {
            SyncError::FetchError { .. } => e,
            other => SyncError::FetchError {
                week: week.to_string(),
                message: other.to_string(),
            },
        })?;

        let entries = extract_week(&markup, config);
        tracing::info!("📅 Week {}: {} entries", week, entries.len());

        for (id, entry) in entries {
            if snapshot.insert(id.clone(), entry).is_some() {
                tracing::warn!("Entry {} appeared in more than one week, keeping the latest", id);
            }
        }
    }

    Ok(snapshot)
}
