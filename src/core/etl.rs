use crate::core::reconcile::ReconcilePlan;
use crate::core::Pipeline;
use crate::domain::model::{ScheduleSnapshot, SyncReport};
use crate::utils::error::Result;
use std::time::Instant;

pub struct SyncEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> SyncEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn extract(&self) -> Result<ScheduleSnapshot> {
        tracing::info!("📥 Extracting schedule...");
        let snapshot = self.pipeline.extract().await?;
        tracing::info!("Extracted {} entries", snapshot.len());
        Ok(snapshot)
    }

    pub async fn plan_for(&self, snapshot: ScheduleSnapshot) -> Result<ReconcilePlan> {
        let started = Instant::now();

        tracing::info!("🔍 Comparing with calendar...");
        let plan = self.pipeline.transform(snapshot).await?;
        tracing::info!(
            "Planned {} inserts, {} restores, {} updates; {} unchanged, {} extra ({:?})",
            plan.inserts.len(),
            plan.restores.len(),
            plan.updates.len(),
            plan.unchanged,
            plan.extras.len(),
            started.elapsed()
        );

        Ok(plan)
    }

    pub async fn apply(&self, plan: ReconcilePlan) -> Result<SyncReport> {
        tracing::info!("📤 Updating calendar...");
        self.pipeline.load(plan).await
    }

    /// Extract and transform only; nothing is written to the calendar.
    pub async fn plan(&self) -> Result<ReconcilePlan> {
        let snapshot = self.extract().await?;
        self.plan_for(snapshot).await
    }

    pub async fn run(&self) -> Result<SyncReport> {
        let started = Instant::now();
        let plan = self.plan().await?;
        let report = self.apply(plan).await?;

        tracing::info!(
            "Sync finished in {:?}: {} inserted, {} restored, {} updated, {} deleted",
            started.elapsed(),
            report.inserted,
            report.restored,
            report.updated,
            report.deleted
        );

        Ok(report)
    }
}
