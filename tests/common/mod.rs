#![allow(dead_code)]

use async_trait::async_trait;
use skema_sync::core::{CalendarService, ScheduleSource};
use skema_sync::domain::model::{EventStatus, RemoteEvent, TimeWindow, WeekRef};
use skema_sync::{Result, SyncError};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

pub const WEEK_FIXTURE: &str = include_str!("../fixtures/week_02_2024.html");

/// One schedule cell the way the portal renders it.
pub fn cell(absid: &str, details: &str) -> String {
    format!(
        r#"<a href="/lectio/681/aktivitet/aktivitetforside2.aspx?absid={}&amp;prevurl=SkemaNy.aspx" class="s2skemabrik" style="left:0" data-additionalinfo="{}">x</a>"#,
        absid, details
    )
}

/// Serves canned week markup; unknown weeks come back empty.
#[derive(Default)]
pub struct StubSource {
    pub pages: HashMap<WeekRef, String>,
    pub calls: Mutex<Vec<String>>,
    pub failing_week: Option<WeekRef>,
}

impl StubSource {
    pub fn with_week(week: WeekRef, markup: &str) -> Self {
        let mut source = Self::default();
        source.pages.insert(week, markup.to_string());
        source
    }

    /// Fetching `week` fails as if the portal dropped the request.
    pub fn failing_on(mut self, week: WeekRef) -> Self {
        self.failing_week = Some(week);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScheduleSource for StubSource {
    async fn open(&self) -> Result<()> {
        self.calls.lock().unwrap().push("open".to_string());
        Ok(())
    }

    async fn fetch_week(&self, week: WeekRef) -> Result<String> {
        self.calls.lock().unwrap().push(format!("fetch {}", week));
        if self.failing_week == Some(week) {
            return Err(SyncError::FetchError {
                week: week.to_string(),
                message: "connection reset".to_string(),
            });
        }
        Ok(self.pages.get(&week).cloned().unwrap_or_default())
    }

    async fn release(&self) -> Result<()> {
        self.calls.lock().unwrap().push("release".to_string());
        Ok(())
    }
}

/// Calendar kept in memory. Deletes are soft, as in Google Calendar: the
/// event stays listed with status `cancelled`.
#[derive(Default)]
pub struct InMemoryCalendar {
    pub events: Mutex<BTreeMap<String, RemoteEvent>>,
    pub writes: Mutex<Vec<String>>,
    pub fail_on: Mutex<Option<String>>,
}

impl InMemoryCalendar {
    pub fn with_events(events: Vec<RemoteEvent>) -> Self {
        let calendar = Self::default();
        {
            let mut stored = calendar.events.lock().unwrap();
            for event in events {
                stored.insert(event.id.clone(), event);
            }
        }
        calendar
    }

    pub fn event(&self, id: &str) -> Option<RemoteEvent> {
        self.events.lock().unwrap().get(id).cloned()
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().unwrap().clear();
    }

    /// Writes to `event_id` fail with a server error until `None` is set.
    pub fn fail_on(&self, event_id: Option<&str>) {
        *self.fail_on.lock().unwrap() = event_id.map(str::to_string);
    }

    fn check_failure(&self, event_id: &str) -> Result<()> {
        if self.fail_on.lock().unwrap().as_deref() == Some(event_id) {
            return Err(SyncError::ApiError {
                status: 503,
                message: "Backend Error".to_string(),
            });
        }
        Ok(())
    }
}

fn in_window(event: &RemoteEvent, window: &Option<TimeWindow>) -> bool {
    match (window, event.start.date_time) {
        (None, _) => true,
        (Some(window), Some(start)) => start >= window.start && start < window.end,
        (Some(_), None) => false,
    }
}

#[async_trait]
impl CalendarService for InMemoryCalendar {
    async fn list_events(
        &self,
        _calendar_id: &str,
        window: Option<TimeWindow>,
    ) -> Result<Vec<RemoteEvent>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|event| in_window(event, &window))
            .cloned()
            .collect())
    }

    async fn get_event(&self, _calendar_id: &str, event_id: &str) -> Result<Option<RemoteEvent>> {
        Ok(self.event(event_id))
    }

    async fn insert_event(&self, _calendar_id: &str, event: &RemoteEvent) -> Result<RemoteEvent> {
        self.check_failure(&event.id)?;
        let mut events = self.events.lock().unwrap();
        if events.contains_key(&event.id) {
            return Err(SyncError::ApiError {
                status: 409,
                message: format!("The requested identifier already exists: {}", event.id),
            });
        }
        events.insert(event.id.clone(), event.clone());
        self.writes.lock().unwrap().push(format!("insert {}", event.id));
        Ok(event.clone())
    }

    async fn update_event(&self, _calendar_id: &str, event: &RemoteEvent) -> Result<RemoteEvent> {
        self.check_failure(&event.id)?;
        let mut events = self.events.lock().unwrap();
        if !events.contains_key(&event.id) {
            return Err(SyncError::ApiError {
                status: 404,
                message: "Not Found".to_string(),
            });
        }
        events.insert(event.id.clone(), event.clone());
        self.writes.lock().unwrap().push(format!("update {}", event.id));
        Ok(event.clone())
    }

    async fn delete_event(&self, _calendar_id: &str, event_id: &str) -> Result<()> {
        self.check_failure(event_id)?;
        if let Some(event) = self.events.lock().unwrap().get_mut(event_id) {
            event.status = EventStatus::Cancelled;
        }
        self.writes.lock().unwrap().push(format!("delete {}", event_id));
        Ok(())
    }
}
