//! In-process store used by the test suites and local tooling

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use shared::{
    DecomposedImport, DerivedFields, ExtraDeviceRow, RoastEventRow, RoastPhaseRow,
    TemperatureLogRow,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{RoastProfile, RoastStore, StoredSample, StoredSeries};
use crate::error::{AppError, AppResult};

/// A profile together with its child rows
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRoast {
    pub profile: RoastProfile,
    pub log_rows: Vec<TemperatureLogRow>,
    pub event_rows: Vec<RoastEventRow>,
    pub phase_rows: Vec<RoastPhaseRow>,
    pub device_rows: Vec<ExtraDeviceRow>,
}

impl StoredRoast {
    fn replace_children(&mut self, rows: &DecomposedImport) {
        self.log_rows = rows.log_rows.clone();
        self.event_rows = rows.event_rows.clone();
        self.phase_rows = rows.phase_rows.clone();
        self.device_rows = rows.device_rows.clone();
    }

    fn has_source_data(&self) -> bool {
        !self.log_rows.is_empty()
    }
}

/// `RoastStore` backed by a map keyed by roast id
#[derive(Debug, Default)]
pub struct MemoryRoastStore {
    roasts: Mutex<BTreeMap<Uuid, StoredRoast>>,
}

impl MemoryRoastStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a roast as-is, e.g. a historical profile awaiting backfill
    pub async fn seed(&self, roast: StoredRoast) {
        self.roasts.lock().await.insert(roast.profile.id, roast);
    }

    /// Copy of a stored roast and its children
    pub async fn snapshot(&self, roast_id: Uuid) -> Option<StoredRoast> {
        self.roasts.lock().await.get(&roast_id).cloned()
    }
}

#[async_trait]
impl RoastStore for MemoryRoastStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid, roast_id: Uuid) -> AppResult<Option<RoastProfile>> {
        let roasts = self.roasts.lock().await;
        Ok(roasts
            .get(&roast_id)
            .filter(|r| r.profile.user_id == user_id)
            .map(|r| r.profile.clone()))
    }

    async fn create_import(&self, user_id: Uuid, rows: &DecomposedImport) -> AppResult<RoastProfile> {
        let profile = RoastProfile::from_import(Uuid::new_v4(), user_id, rows, Utc::now());
        let mut roast = StoredRoast {
            profile: profile.clone(),
            log_rows: Vec::new(),
            event_rows: Vec::new(),
            phase_rows: Vec::new(),
            device_rows: Vec::new(),
        };
        roast.replace_children(rows);
        self.roasts.lock().await.insert(profile.id, roast);
        Ok(profile)
    }

    async fn replace_import(&self, roast_id: Uuid, rows: &DecomposedImport) -> AppResult<RoastProfile> {
        let mut roasts = self.roasts.lock().await;
        let roast = roasts
            .get_mut(&roast_id)
            .ok_or_else(|| AppError::NotFound("Roast profile".to_string()))?;
        roast.profile.apply_import(rows, Utc::now());
        roast.replace_children(rows);
        Ok(roast.profile.clone())
    }

    async fn clear_roast_data(&self, roast_id: Uuid) -> AppResult<()> {
        let mut roasts = self.roasts.lock().await;
        let roast = roasts
            .get_mut(&roast_id)
            .ok_or_else(|| AppError::NotFound("Roast profile".to_string()))?;
        roast.log_rows.clear();
        roast.event_rows.clear();
        roast.phase_rows.clear();
        roast.device_rows.clear();
        let now = Utc::now();
        roast.profile.derived = None;
        roast.profile.data_cleared_at = Some(now);
        roast.profile.updated_at = now;
        Ok(())
    }

    async fn find_backfill_candidates(&self, after: Option<Uuid>, limit: i64) -> AppResult<Vec<Uuid>> {
        let roasts = self.roasts.lock().await;
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(roasts
            .values()
            .filter(|r| after.map_or(true, |after| r.profile.id > after))
            .filter(|r| r.profile.derived.is_none() && r.profile.data_cleared_at.is_none())
            .filter(|r| r.has_source_data())
            .take(limit)
            .map(|r| r.profile.id)
            .collect())
    }

    async fn load_series(&self, roast_id: Uuid) -> AppResult<StoredSeries> {
        let roasts = self.roasts.lock().await;
        let roast = roasts
            .get(&roast_id)
            .ok_or_else(|| AppError::NotFound("Roast profile".to_string()))?;
        Ok(StoredSeries {
            samples: roast
                .log_rows
                .iter()
                .map(|row| StoredSample {
                    time_seconds: row.time_seconds,
                    flags: row.flags,
                })
                .collect(),
            milestone_indices: roast.profile.milestone_indices,
        })
    }

    async fn update_derived_fields(&self, roast_id: Uuid, derived: &DerivedFields) -> AppResult<()> {
        let mut roasts = self.roasts.lock().await;
        let roast = roasts
            .get_mut(&roast_id)
            .ok_or_else(|| AppError::NotFound("Roast profile".to_string()))?;
        roast.profile.derived = Some(*derived);
        roast.profile.updated_at = Utc::now();
        Ok(())
    }
}
