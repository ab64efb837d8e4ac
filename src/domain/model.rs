use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Prefix that marks calendar events owned by this tool.
pub const NAMESPACE_PREFIX: &str = "lec";

pub const CHANGED_MARKER: &str = "Ændret!";
pub const CANCELLED_MARKER: &str = "Aflyst!";

const CANCELLED_COLOR: &str = "4";
const CHANGED_COLOR: &str = "2";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    #[default]
    None,
    Changed,
    Cancelled,
}

impl EntryStatus {
    pub fn from_marker(line: &str) -> Option<Self> {
        match line {
            CHANGED_MARKER => Some(EntryStatus::Changed),
            CANCELLED_MARKER => Some(EntryStatus::Cancelled),
            _ => None,
        }
    }

    pub fn color_id(self) -> Option<String> {
        match self {
            EntryStatus::Cancelled => Some(CANCELLED_COLOR.to_string()),
            EntryStatus::Changed => Some(CHANGED_COLOR.to_string()),
            EntryStatus::None => None,
        }
    }
}

/// One class occurrence as read from the schedule portal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleEntry {
    pub id: String,
    pub title: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub room: String,
    pub teacher: String,
    pub group: String,
    pub homework: String,
    pub notes: String,
    pub status: EntryStatus,
}

impl ScheduleEntry {
    pub fn event_id(&self) -> String {
        format!("{}{}", NAMESPACE_PREFIX, self.id)
    }

    pub fn description(&self) -> String {
        let mut description = format!("{}\n", self.teacher);
        if !self.notes.is_empty() {
            description.push_str(&format!("Noter: {}", self.notes));
        }
        if !self.homework.is_empty() {
            description.push_str(&format!("Lektier:\n{}", self.homework));
        }
        description
    }

    pub fn to_remote_event(&self) -> RemoteEvent {
        let time_zone = self.start.timezone().name().to_string();
        RemoteEvent {
            id: self.event_id(),
            summary: self.title.clone(),
            description: self.description(),
            location: self.room.clone(),
            start: EventDateTime {
                date_time: Some(self.start.fixed_offset()),
                time_zone: Some(time_zone.clone()),
            },
            end: EventDateTime {
                date_time: Some(self.end.fixed_offset()),
                time_zone: Some(time_zone),
            },
            status: EventStatus::Confirmed,
            color_id: self.status.color_id(),
        }
    }
}

/// Identifier-keyed result of one extraction pass.
pub type ScheduleSnapshot = BTreeMap<String, ScheduleEntry>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Confirmed,
    Tentative,
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Google Calendar event as sent to and read from the v3 API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEvent {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub start: EventDateTime,
    #[serde(default)]
    pub end: EventDateTime,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
}

impl RemoteEvent {
    pub fn is_managed(&self) -> bool {
        is_managed_id(&self.id)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == EventStatus::Cancelled
    }

    /// Compares the fields this tool writes. Instants are compared, not
    /// offsets, and trailing whitespace in the description is ignored.
    pub fn same_content(&self, other: &RemoteEvent) -> bool {
        self.summary == other.summary
            && self.description.trim_end() == other.description.trim_end()
            && self.location == other.location
            && self.start.date_time == other.start.date_time
            && self.end.date_time == other.end.date_time
            && self.color_id == other.color_id
            && self.status == other.status
    }
}

pub fn is_managed_id(id: &str) -> bool {
    id.starts_with(NAMESPACE_PREFIX)
}

/// Event id keyed map of the calendar state inside the sync window.
pub type RemoteSnapshot = BTreeMap<String, RemoteEvent>;

/// ISO week as the portal addresses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekRef {
    pub year: i32,
    pub week: u32,
}

impl fmt::Display for WeekRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{}", self.week, self.year)
    }
}

/// Half-open `[start, end)` range of instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl TimeWindow {
    /// Midnight of `first_day` through midnight `weeks * 7` days later.
    pub fn from_days(tz: Tz, first_day: NaiveDate, weeks: u32) -> Option<Self> {
        let last_day = first_day + chrono::Duration::days(i64::from(weeks) * 7);
        let start = tz
            .from_local_datetime(&first_day.and_hms_opt(0, 0, 0)?)
            .earliest()?;
        let end = tz
            .from_local_datetime(&last_day.and_hms_opt(0, 0, 0)?)
            .earliest()?;
        Some(Self { start, end })
    }
}

/// Counts reported after a sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub inserted: usize,
    pub restored: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub extra: usize,
}

impl SyncReport {
    pub fn operations(&self) -> usize {
        self.inserted + self.restored + self.updated + self.deleted
    }
}
