//! Roast import service: validate, run the pipeline, persist

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use shared::pipeline::{self, PipelineOutput};
use shared::{
    parse_roast_import, MilestoneIssue, MilestoneSet, PhaseSet, RoastImport, TemperatureUnit,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::{RoastProfile, RoastStore};

/// Import service over an injected store
#[derive(Clone)]
pub struct ImportService {
    store: Arc<dyn RoastStore>,
    target_unit: TemperatureUnit,
}

/// Outcome of one import
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub roast_id: Uuid,
    pub log_rows: usize,
    pub event_rows: usize,
    pub phase_rows: usize,
    pub device_rows: usize,
    /// Bean/environment readings nulled by sanitization
    pub sanitized_readings: usize,
    /// Device readings missing or nulled
    pub missing_device_readings: usize,
    pub milestones: MilestoneSet,
    pub phases: PhaseSet,
    /// Milestone problems; the import still succeeded
    pub warnings: Vec<MilestoneIssue>,
}

impl ImportReport {
    fn new(roast_id: Uuid, out: &PipelineOutput) -> Self {
        let rows = &out.rows;
        Self {
            roast_id,
            log_rows: rows.log_rows.len(),
            event_rows: rows.event_rows.len(),
            phase_rows: rows.phase_rows.len(),
            device_rows: rows.device_rows.len(),
            sanitized_readings: out.sanitized_readings,
            missing_device_readings: rows.missing_device_readings(),
            milestones: rows.profile.derived.milestones,
            phases: rows.profile.derived.phases,
            warnings: out
                .malformed
                .as_ref()
                .map(|m| m.issues.clone())
                .unwrap_or_default(),
        }
    }
}

impl ImportService {
    pub fn new(store: Arc<dyn RoastStore>, target_unit: TemperatureUnit) -> Self {
        Self { store, target_unit }
    }

    /// Validate a payload and run it through the pipeline without persisting
    pub fn prepare(&self, payload: Value) -> AppResult<PipelineOutput> {
        let import = parse_roast_import(payload)?;
        Ok(self.run_pipeline(&import))
    }

    fn run_pipeline(&self, import: &RoastImport) -> PipelineOutput {
        let out = pipeline::run(import, self.target_unit);

        if let Some(malformed) = &out.malformed {
            tracing::warn!(
                title = %import.title,
                issues = malformed.issues.len(),
                "Importing roast with malformed milestones: {}",
                malformed
            );
        }
        if out.sanitized_readings > 0 {
            tracing::debug!(
                sanitized = out.sanitized_readings,
                "Nulled implausible temperature readings"
            );
        }
        out
    }

    /// Import a payload as a new roast profile owned by `user_id`
    pub async fn import_new(&self, user_id: Uuid, payload: Value) -> AppResult<ImportReport> {
        let out = self.prepare(payload)?;
        let profile = self.store.create_import(user_id, &out.rows).await?;
        let report = ImportReport::new(profile.id, &out);
        log_import(&report, "Imported roast");
        Ok(report)
    }

    /// Replace the data of an existing roast with a new payload
    pub async fn reimport(&self, user_id: Uuid, roast_id: Uuid, payload: Value) -> AppResult<ImportReport> {
        // Ownership first, so a bad payload for someone else's roast is a 404
        self.get_profile(user_id, roast_id).await?;
        let out = self.prepare(payload)?;
        let profile = self.store.replace_import(roast_id, &out.rows).await?;
        let report = ImportReport::new(profile.id, &out);
        log_import(&report, "Re-imported roast");
        Ok(report)
    }

    /// Delete all child rows of a roast and null its derived fields
    pub async fn clear_roast_data(&self, user_id: Uuid, roast_id: Uuid) -> AppResult<()> {
        self.get_profile(user_id, roast_id).await?;
        self.store.clear_roast_data(roast_id).await?;
        tracing::info!(%roast_id, "Cleared roast data");
        Ok(())
    }

    /// Profile owned by `user_id`
    pub async fn get_profile(&self, user_id: Uuid, roast_id: Uuid) -> AppResult<RoastProfile> {
        self.store
            .get_profile(user_id, roast_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Roast profile".to_string()))
    }
}

fn log_import(report: &ImportReport, message: &str) {
    tracing::info!(
        roast_id = %report.roast_id,
        log_rows = report.log_rows,
        event_rows = report.event_rows,
        phase_rows = report.phase_rows,
        device_rows = report.device_rows,
        warnings = report.warnings.len(),
        "{}",
        message
    );
}
