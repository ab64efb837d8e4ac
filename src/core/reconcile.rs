//! Plans and applies the calendar changes that bring the remote calendar in
//! line with an extracted schedule snapshot.
//!
//! Planning is a pure function of the two snapshots. Only events whose id
//! carries [`NAMESPACE_PREFIX`] are ever looked at or written.

use crate::domain::model::{
    is_managed_id, RemoteEvent, RemoteSnapshot, ScheduleSnapshot, SyncReport, NAMESPACE_PREFIX,
};
use crate::domain::ports::CalendarService;
use crate::utils::error::{Result, SyncError};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    /// Not present downstream at all.
    pub inserts: Vec<RemoteEvent>,
    /// Present downstream but soft-deleted; updated in place to un-delete.
    pub restores: Vec<RemoteEvent>,
    /// Live downstream with different content.
    pub updates: Vec<RemoteEvent>,
    /// Live downstream events no longer in the schedule.
    pub extras: Vec<RemoteEvent>,
    pub unchanged: usize,
}

impl ReconcilePlan {
    /// True when applying the plan would write nothing (extras are report-only).
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.restores.is_empty() && self.updates.is_empty()
    }

    pub fn write_count(&self) -> usize {
        self.inserts.len() + self.restores.len() + self.updates.len()
    }
}

/// Keeps only events created by this tool, keyed by event id.
pub fn destination_snapshot(events: Vec<RemoteEvent>) -> RemoteSnapshot {
    events
        .into_iter()
        .filter(RemoteEvent::is_managed)
        .map(|event| (event.id.clone(), event))
        .collect()
}

pub fn compute_plan(source: &ScheduleSnapshot, destination: &RemoteSnapshot) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();
    let mut source_ids = HashSet::with_capacity(source.len());

    for entry in source.values() {
        let desired = entry.to_remote_event();
        source_ids.insert(desired.id.clone());

        match destination.get(&desired.id) {
            None => plan.inserts.push(desired),
            Some(existing) if existing.is_cancelled() => plan.restores.push(desired),
            Some(existing) if existing.same_content(&desired) => plan.unchanged += 1,
            Some(_) => plan.updates.push(desired),
        }
    }

    plan.extras = destination
        .values()
        .filter(|event| event.is_managed() && !event.is_cancelled())
        .filter(|event| !source_ids.contains(&event.id))
        .cloned()
        .collect();

    plan
}

fn ensure_managed(operation: &str, event_id: &str) -> Result<()> {
    if is_managed_id(event_id) {
        Ok(())
    } else {
        Err(SyncError::ReconcileError {
            operation: operation.to_string(),
            event_id: event_id.to_string(),
            message: format!("event id lacks the '{}' prefix", NAMESPACE_PREFIX),
        })
    }
}

fn operation_error(operation: &str, event_id: &str, error: SyncError) -> SyncError {
    SyncError::ReconcileError {
        operation: operation.to_string(),
        event_id: event_id.to_string(),
        message: error.to_string(),
    }
}

async fn update<C>(calendar: &C, calendar_id: &str, event: &RemoteEvent) -> Result<()>
where
    C: CalendarService + ?Sized,
{
    ensure_managed("update", &event.id)?;
    calendar
        .update_event(calendar_id, event)
        .await
        .map_err(|e| operation_error("update", &event.id, e))?;
    Ok(())
}

/// Applies `plan` in order and stops at the first failed call.
pub async fn apply_plan<C>(
    calendar: &C,
    calendar_id: &str,
    plan: ReconcilePlan,
    delete_extra: bool,
) -> Result<SyncReport>
where
    C: CalendarService + ?Sized,
{
    let mut report = SyncReport {
        unchanged: plan.unchanged,
        extra: plan.extras.len(),
        ..SyncReport::default()
    };

    for event in &plan.inserts {
        ensure_managed("insert", &event.id)?;

        // 事件可能在查詢範圍之外，先以 id 確認
        let existing = calendar
            .get_event(calendar_id, &event.id)
            .await
            .map_err(|e| operation_error("get", &event.id, e))?;

        match existing {
            Some(found) if found.is_cancelled() => {
                tracing::info!("♻️ Restoring deleted event {}", event.id);
                update(calendar, calendar_id, event).await?;
                report.restored += 1;
            }
            Some(found) if found.same_content(event) => {
                tracing::debug!("Event {} already exists", event.id);
                report.unchanged += 1;
            }
            Some(_) => {
                tracing::info!("✏️ Updating event {} found outside the listed window", event.id);
                update(calendar, calendar_id, event).await?;
                report.updated += 1;
            }
            None => {
                tracing::info!("➕ Inserting event {} ({})", event.id, event.summary);
                calendar
                    .insert_event(calendar_id, event)
                    .await
                    .map_err(|e| operation_error("insert", &event.id, e))?;
                report.inserted += 1;
            }
        }
    }

    for event in &plan.restores {
        tracing::info!("♻️ Restoring deleted event {}", event.id);
        update(calendar, calendar_id, event).await?;
        report.restored += 1;
    }

    for event in &plan.updates {
        tracing::info!("✏️ Updating event {} ({})", event.id, event.summary);
        update(calendar, calendar_id, event).await?;
        report.updated += 1;
    }

    for event in &plan.extras {
        if delete_extra {
            ensure_managed("delete", &event.id)?;
            tracing::info!("🗑️ Deleting removed event {}", event.id);
            calendar
                .delete_event(calendar_id, &event.id)
                .await
                .map_err(|e| operation_error("delete", &event.id, e))?;
            report.deleted += 1;
        } else {
            tracing::info!(
                "Event {} ({}) is no longer in the schedule; deletion is disabled",
                event.id,
                event.summary
            );
        }
    }

    Ok(report)
}

/// Deletes every live event this tool created and returns how many were removed.
pub async fn clear_managed<C>(calendar: &C, calendar_id: &str) -> Result<usize>
where
    C: CalendarService + ?Sized,
{
    let events = calendar.list_events(calendar_id, None).await?;
    let mut deleted = 0;

    for event in events.iter().filter(|e| e.is_managed() && !e.is_cancelled()) {
        tracing::info!("🗑️ Deleting {} ({})", event.id, event.summary);
        calendar
            .delete_event(calendar_id, &event.id)
            .await
            .map_err(|e| operation_error("delete", &event.id, e))?;
        deleted += 1;
    }

    Ok(deleted)
}
