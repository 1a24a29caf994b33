//! Normalized rows produced from a single roast import

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{MilestoneIndices, MilestoneSet, PhaseSet, SensorType};
use crate::types::{Milestone, RoastPhase, TemperatureUnit};

/// Summary fields written to the roast profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
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
    pub sample_count: usize,
    pub charge_bean_temp: Option<f64>,
    pub drop_bean_temp: Option<f64>,
    pub milestone_indices: MilestoneIndices,
    pub derived: DerivedFields,
}

/// Milestone and phase fields recomputed by import and backfill
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedFields {
    pub milestones: MilestoneSet,
    pub phases: PhaseSet,
}

/// One temperature sample with milestone membership flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemperatureLogRow {
    pub time_seconds: f64,
    pub bean_temp: Option<f64>,
    pub env_temp: Option<f64>,
    pub fan_setting: Option<f64>,
    pub heat_setting: Option<f64>,
    pub flags: MilestoneFlags,
}

/// Point flags mark the sample a milestone was recorded on. State flags are
/// true from the sample at/after the opening milestone until the sample
/// at/after the next present closing milestone (exclusive), or the end of
/// the series when nothing closes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneFlags {
    pub charge: bool,
    pub dry_end: bool,
    pub fc_start: bool,
    pub fc_end: bool,
    pub sc_start: bool,
    pub sc_end: bool,
    pub drop: bool,
    pub cool: bool,

    pub drying: bool,
    pub maillard: bool,
    pub development: bool,
    pub fc_rolling: bool,
    pub sc_rolling: bool,
    pub cooling: bool,
}

impl MilestoneFlags {
    pub fn point(&self, milestone: Milestone) -> bool {
        match milestone {
            Milestone::Charge => self.charge,
            Milestone::DryEnd => self.dry_end,
            Milestone::FcStart => self.fc_start,
            Milestone::FcEnd => self.fc_end,
            Milestone::ScStart => self.sc_start,
            Milestone::ScEnd => self.sc_end,
            Milestone::Drop => self.drop,
            Milestone::Cool => self.cool,
        }
    }

    pub fn set_point(&mut self, milestone: Milestone) {
        let flag = match milestone {
            Milestone::Charge => &mut self.charge,
            Milestone::DryEnd => &mut self.dry_end,
            Milestone::FcStart => &mut self.fc_start,
            Milestone::FcEnd => &mut self.fc_end,
            Milestone::ScStart => &mut self.sc_start,
            Milestone::ScEnd => &mut self.sc_end,
            Milestone::Drop => &mut self.drop,
            Milestone::Cool => &mut self.cool,
        };
        *flag = true;
    }
}

/// Category of milestone events on event rows
pub const ROAST_PHASE_CATEGORY: &str = "roast-phase";
/// Category of operator control events on event rows
pub const CONTROL_CATEGORY: &str = "control";

/// A discrete roast event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoastEventRow {
    pub time_seconds: f64,
    pub event_type: String,
    pub label: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub value: Option<f64>,
    pub user_generated: bool,
}

/// Confidence attached to phase rows
pub mod confidence {
    /// Both canonical boundaries were recorded
    pub const MILESTONE_DERIVED: f64 = 1.0;
    /// Closed by a later milestone or the end of the series
    pub const FALLBACK: f64 = 0.6;
    /// The import had milestone order or index problems
    pub const MALFORMED: f64 = 0.3;
}

/// Per-phase summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoastPhaseRow {
    pub phase: RoastPhase,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub duration_seconds: f64,
    pub percent: f64,
    pub confidence: f64,
}

/// Reading quality on device rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingQuality {
    Good,
    Missing,
}

impl ReadingQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingQuality::Good => "good",
            ReadingQuality::Missing => "missing",
        }
    }
}

/// One auxiliary sensor sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraDeviceRow {
    pub device_id: i64,
    pub device_name: String,
    pub sensor_type: SensorType,
    pub time_seconds: f64,
    pub value: Option<f64>,
    pub unit: String,
    pub quality: ReadingQuality,
}

/// Everything one import fans out into
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecomposedImport {
    pub profile: ProfileSummary,
    pub log_rows: Vec<TemperatureLogRow>,
    pub event_rows: Vec<RoastEventRow>,
    pub phase_rows: Vec<RoastPhaseRow>,
    pub device_rows: Vec<ExtraDeviceRow>,
}

impl DecomposedImport {
    /// Device readings that were missing or sanitized away
    pub fn missing_device_readings(&self) -> usize {
        self.device_rows
            .iter()
            .filter(|r| r.quality == ReadingQuality::Missing)
            .count()
    }
}
