//! Import pipeline: normalize → resolve milestones → compute phases → decompose

pub mod decompose;
pub mod milestones;
pub mod phases;
pub mod temperature;

use serde::Serialize;

use crate::error::MalformedImport;
use crate::models::{DecomposedImport, RoastImport};
use crate::types::TemperatureUnit;

pub use decompose::decompose;
pub use milestones::resolve;
pub use phases::compute;
pub use temperature::normalize;

/// Result of running one import through every stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub rows: DecomposedImport,
    /// Present when milestones were out of order or out of range
    pub malformed: Option<MalformedImport>,
    /// Bean/environment readings nulled by sanitization
    pub sanitized_readings: usize,
}

/// Run a validated import through the pipeline, storing temperatures in `target_unit`
pub fn run(import: &RoastImport, target_unit: TemperatureUnit) -> PipelineOutput {
    let temps = normalize(&import.temp1, &import.temp2, import.unit, target_unit);
    let (milestones, malformed) = milestones::resolve_lenient(&import.timex, &import.milestones);
    let phases = phases::compute_from_series(&milestones, &import.timex);
    let rows = decompose(import, &temps, &milestones, &phases, malformed.as_ref());

    PipelineOutput {
        rows,
        malformed,
        sanitized_readings: temps.sanitized_count,
    }
}
