//! Storage collaborator for roast profiles and their child rows
//!
//! The pipeline never talks to a database directly. Import and backfill go
//! through [`RoastStore`], injected as `Arc<dyn RoastStore>`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{DecomposedImport, DerivedFields, MilestoneFlags, MilestoneIndices, TemperatureUnit};
use uuid::Uuid;

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::{MemoryRoastStore, StoredRoast};
pub use postgres::PgRoastStore;

/// A persisted roast profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoastProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub roaster_type: Option<String>,
    pub roaster_size: Option<f64>,
    pub temperature_unit: TemperatureUnit,
    pub weight_in: Option<Decimal>,
    pub weight_out: Option<Decimal>,
    pub weight_unit: Option<String>,
    pub weight_loss_percent: Option<Decimal>,
    pub beans: Option<String>,
    pub notes: Option<String>,
    pub roast_date: Option<NaiveDate>,
    pub sample_count: i64,
    pub charge_bean_temp: Option<f64>,
    pub drop_bean_temp: Option<f64>,
    /// Named milestone indices kept from the last import
    pub milestone_indices: MilestoneIndices,
    /// Null until an import or backfill computes them
    pub derived: Option<DerivedFields>,
    pub data_cleared_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoastProfile {
    /// Build a new profile record from the summary an import produced
    pub fn from_import(id: Uuid, user_id: Uuid, rows: &DecomposedImport, now: DateTime<Utc>) -> Self {
        let mut profile = Self {
            id,
            user_id,
            title: String::new(),
            roaster_type: None,
            roaster_size: None,
            temperature_unit: rows.profile.temperature_unit,
            weight_in: None,
            weight_out: None,
            weight_unit: None,
            weight_loss_percent: None,
            beans: None,
            notes: None,
            roast_date: None,
            sample_count: 0,
            charge_bean_temp: None,
            drop_bean_temp: None,
            milestone_indices: MilestoneIndices::default(),
            derived: None,
            data_cleared_at: None,
            created_at: now,
            updated_at: now,
        };
        profile.apply_import(rows, now);
        profile
    }

    /// Overwrite summary and derived fields with a fresh import
    pub fn apply_import(&mut self, rows: &DecomposedImport, now: DateTime<Utc>) {
        let summary = &rows.profile;
        self.title = summary.title.clone();
        self.roaster_type = summary.roaster_type.clone();
        self.roaster_size = summary.roaster_size;
        self.temperature_unit = summary.temperature_unit;
        self.weight_in = summary.weight_in;
        self.weight_out = summary.weight_out;
        self.weight_unit = summary.weight_unit.clone();
        self.weight_loss_percent = summary.weight_loss_percent;
        self.beans = summary.beans.clone();
        self.notes = summary.notes.clone();
        self.roast_date = summary.roast_date;
        self.sample_count = summary.sample_count as i64;
        self.charge_bean_temp = summary.charge_bean_temp;
        self.drop_bean_temp = summary.drop_bean_temp;
        self.milestone_indices = summary.milestone_indices;
        self.derived = Some(summary.derived);
        self.data_cleared_at = None;
        self.updated_at = now;
    }
}

/// Time offset and milestone point flags of one stored log row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoredSample {
    pub time_seconds: f64,
    pub flags: MilestoneFlags,
}

/// What backfill needs to re-derive a profile
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoredSeries {
    /// Log rows in sample order
    pub samples: Vec<StoredSample>,
    pub milestone_indices: MilestoneIndices,
}

impl StoredSeries {
    pub fn timex(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time_seconds).collect()
    }
}

/// Persistence operations used by the import and backfill services
#[async_trait]
pub trait RoastStore: Send + Sync {
    /// Connectivity check for the health endpoint
    async fn ping(&self) -> AppResult<()>;

    /// Profile owned by `user_id`, or `None`
    async fn get_profile(&self, user_id: Uuid, roast_id: Uuid) -> AppResult<Option<RoastProfile>>;

    /// Create a profile and insert every child row atomically
    async fn create_import(&self, user_id: Uuid, rows: &DecomposedImport) -> AppResult<RoastProfile>;

    /// Replace an existing profile's child rows and summary atomically
    async fn replace_import(&self, roast_id: Uuid, rows: &DecomposedImport) -> AppResult<RoastProfile>;

    /// Delete all child rows, null derived fields, keep the summary
    async fn clear_roast_data(&self, roast_id: Uuid) -> AppResult<()>;

    /// Uncleared profiles with null derived fields that still have log rows,
    /// ordered by id and starting after `after`
    async fn find_backfill_candidates(&self, after: Option<Uuid>, limit: i64) -> AppResult<Vec<Uuid>>;

    /// Log row times and point flags plus stored milestone indices
    async fn load_series(&self, roast_id: Uuid) -> AppResult<StoredSeries>;

    async fn update_derived_fields(&self, roast_id: Uuid, derived: &DerivedFields) -> AppResult<()>;
}
