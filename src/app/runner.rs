use crate::adapters::google::GoogleCalendar;
use crate::adapters::portal::{PortalCredentials, PortalSession};
use crate::adapters::storage::save_snapshot;
use crate::app::pipelines::sync_pipeline::{extractor_config, SyncPipeline, SyncSettings};
use crate::core::etl::SyncEngine;
use crate::core::reconcile::ReconcilePlan;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::SyncReport;
use crate::utils::error::Result;

pub type LectioSync = SyncPipeline<PortalSession, GoogleCalendar>;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub dump_json: Option<String>,
}

#[derive(Debug)]
pub enum RunOutcome {
    Planned(ReconcilePlan),
    Applied(SyncReport),
}

pub fn portal_session<C: ConfigProvider>(config: &C) -> Result<PortalSession> {
    PortalSession::new(
        config.portal_url(),
        PortalCredentials {
            username: config.username().to_string(),
            password: config.password().to_string(),
            school_id: config.school_id().to_string(),
        },
    )
}

/// Wires the portal and Google adapters from `config`.
pub async fn build_pipeline<C: ConfigProvider, S: Storage>(
    config: &C,
    storage: &S,
) -> Result<LectioSync> {
    let settings = SyncSettings::from_config(config)?;
    let extractor = extractor_config(config, storage).await?;
    let source = portal_session(config)?;
    let calendar = GoogleCalendar::connect(
        config.calendar_api_url(),
        config.token_path(),
        config.credentials_path(),
    )?;

    Ok(SyncPipeline::new(source, calendar, extractor, settings))
}

pub async fn run_sync<P: Pipeline, S: Storage>(
    engine: &SyncEngine<P>,
    storage: &S,
    options: &RunOptions,
) -> Result<RunOutcome> {
    let snapshot = engine.extract().await?;

    if let Some(name) = &options.dump_json {
        let filename = save_snapshot(storage, name, &snapshot).await?;
        tracing::info!("💾 Schedule written to {}", filename);
    }

    let plan = engine.plan_for(snapshot).await?;
    if options.dry_run {
        tracing::info!("🔍 DRY RUN - {} change(s) not applied", plan.write_count());
        return Ok(RunOutcome::Planned(plan));
    }

    Ok(RunOutcome::Applied(engine.apply(plan).await?))
}

/// One line per planned change, for dry runs.
pub fn describe_plan(plan: &ReconcilePlan) -> Vec<String> {
    let mut lines = Vec::with_capacity(plan.write_count() + plan.extras.len());
    for (label, events) in [
        ("insert", &plan.inserts),
        ("restore", &plan.restores),
        ("update", &plan.updates),
        ("extra", &plan.extras),
    ] {
        lines.extend(
            events
                .iter()
                .map(|event| format!("{:<8}{} {}", label, event.id, event.summary)),
        );
    }
    lines
}
