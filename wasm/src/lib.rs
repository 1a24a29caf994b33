//! WebAssembly module for the roast import pipeline
//!
//! Provides client-side computation for:
//! - Import preview (milestones, phases, warnings) before upload
//! - Temperature unit conversion

use serde::Serialize;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

use shared::pipeline;

/// Summary returned to the upload form
#[derive(Debug, Serialize)]
pub struct ImportPreview {
    pub title: String,
    pub sample_count: usize,
    pub unit: TemperatureUnit,
    pub milestones: MilestoneSet,
    pub phases: PhaseSet,
    pub phase_rows: Vec<RoastPhaseRow>,
    pub warnings: Vec<String>,
    pub sanitized_readings: usize,
}

fn preview(json: &str, target_unit: &str) -> Result<ImportPreview, String> {
    let target = TemperatureUnit::from_mode(target_unit)
        .ok_or_else(|| format!("Unsupported temperature unit: {}", target_unit))?;
    let import = parse_roast_import_str(json).map_err(|e| e.to_string())?;
    let out = pipeline::run(&import, target);

    let warnings = out
        .malformed
        .iter()
        .flat_map(|m| m.issues.iter().map(ToString::to_string))
        .collect();

    Ok(ImportPreview {
        title: out.rows.profile.title,
        sample_count: out.rows.profile.sample_count,
        unit: target,
        milestones: out.rows.profile.derived.milestones,
        phases: out.rows.profile.derived.phases,
        phase_rows: out.rows.phase_rows,
        warnings,
        sanitized_readings: out.sanitized_readings,
    })
}

/// Run an export through the pipeline and return the preview as JSON
#[wasm_bindgen]
pub fn preview_import(json: &str, target_unit: &str) -> Result<String, JsValue> {
    let preview = preview(json, target_unit).map_err(|e| JsValue::from_str(&e))?;
    if !preview.warnings.is_empty() {
        web_sys::console::warn_1(&JsValue::from_str(&preview.warnings.join("; ")));
    }
    serde_json::to_string(&preview).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Convert a temperature between "F" and "C"; NaN for an unknown unit
#[wasm_bindgen]
pub fn convert_temperature(value: f64, from: &str, to: &str) -> f64 {
    match (TemperatureUnit::from_mode(from), TemperatureUnit::from_mode(to)) {
        (Some(from), Some(to)) => pipeline::temperature::convert(value, from, to),
        _ => f64::NAN,
    }
}

/// Development percent of a roast from first crack and drop times
#[wasm_bindgen]
pub fn development_percent(charge: f64, fc_start: f64, drop: f64) -> f64 {
    pipeline::phases::span_percent(Some(fc_start), Some(drop), drop - charge)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = r#"{
        "title": "Kenya AA",
        "mode": "F",
        "timex": [0, 30, 60, 90, 120, 150, 180],
        "temp1": [300, 300, 300, 300, 300, 300, 300],
        "temp2": [150, 183, 217, 250, 283, 317, 350],
        "timeindex": [0, 1, 3, 0, 0, 0, 5, 6]
    }"#;

    #[test]
    fn test_preview_reference_roast() {
        let preview = preview(EXPORT, "F").unwrap();
        assert_eq!(preview.title, "Kenya AA");
        assert_eq!(preview.sample_count, 7);
        assert!((preview.phases.development_percent - 40.0).abs() < 1e-9);
        assert_eq!(preview.phase_rows.len(), 3);
        assert!(preview.warnings.is_empty());
    }

    #[test]
    fn test_preview_rejects_bad_unit() {
        assert!(preview(EXPORT, "K").is_err());
        assert!(preview("{}", "C").is_err());
    }

    #[test]
    fn test_convert_temperature() {
        assert!((convert_temperature(212.0, "F", "C") - 100.0).abs() < 1e-9);
        assert!(convert_temperature(100.0, "F", "K").is_nan());
    }

    #[test]
    fn test_development_percent() {
        let dev = development_percent(0.0, 480.0, 600.0);
        assert!((dev - 20.0).abs() < 1e-9);
    }
}
