//! Temperature unit conversion and reading sanitization

use serde::Serialize;

use crate::types::TemperatureUnit;

/// Value the logger writes when a probe returned nothing
pub const MISSING_READING_SENTINEL: f64 = -1.0;

/// Absolute zero in °F; anything colder is a glitch
pub const ABSOLUTE_ZERO_F: f64 = -459.67;

/// Generous ceiling for any roaster probe, in °F
pub const MAX_PLAUSIBLE_F: f64 = 1000.0;

/// Bean and environmental series in a single unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTemperatures {
    pub bean_temps: Vec<Option<f64>>,
    pub env_temps: Vec<Option<f64>>,
    pub unit: TemperatureUnit,
    /// Readings nulled by sanitization, including ones that were already missing
    pub sanitized_count: usize,
}

/// Convert a temperature between scales
pub fn convert(value: f64, from: TemperatureUnit, to: TemperatureUnit) -> f64 {
    match (from, to) {
        (TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius) => (value - 32.0) * 5.0 / 9.0,
        (TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit) => value * 9.0 / 5.0 + 32.0,
        _ => value,
    }
}

/// Plausible reading range in the given unit
pub fn plausible_range(unit: TemperatureUnit) -> (f64, f64) {
    (
        convert(ABSOLUTE_ZERO_F, TemperatureUnit::Fahrenheit, unit),
        convert(MAX_PLAUSIBLE_F, TemperatureUnit::Fahrenheit, unit),
    )
}

/// Drop readings the pipeline must not compute with
pub fn sanitize(value: Option<f64>, unit: TemperatureUnit) -> Option<f64> {
    let value = value?;
    let (min, max) = plausible_range(unit);
    if !value.is_finite() || value == MISSING_READING_SENTINEL || value < min || value > max {
        None
    } else {
        Some(value)
    }
}

/// Sanitize one channel in its source unit, then convert it.
///
/// Returns the converted series and how many readings were nulled.
pub fn normalize_channel(
    raw: &[Option<f64>],
    source: TemperatureUnit,
    target: TemperatureUnit,
) -> (Vec<Option<f64>>, usize) {
    let mut nulled = 0;
    let values = raw
        .iter()
        .map(|reading| {
            let clean = sanitize(*reading, source).map(|v| convert(v, source, target));
            if clean.is_none() {
                nulled += 1;
            }
            clean
        })
        .collect();
    (values, nulled)
}

/// Normalize the two logger channels.
///
/// Channel 1 is the environmental probe and channel 2 the bean probe; this
/// mapping is fixed by the export format.
pub fn normalize(
    raw_temp1: &[Option<f64>],
    raw_temp2: &[Option<f64>],
    source: TemperatureUnit,
    target: TemperatureUnit,
) -> NormalizedTemperatures {
    let (env_temps, env_nulled) = normalize_channel(raw_temp1, source, target);
    let (bean_temps, bean_nulled) = normalize_channel(raw_temp2, source, target);

    NormalizedTemperatures {
        bean_temps,
        env_temps,
        unit: target,
        sanitized_count: env_nulled + bean_nulled,
    }
}
