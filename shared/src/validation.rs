//! Boundary validation for roast imports
//!
//! The only place the logger's loosely typed JSON is read. Everything past
//! [`parse_roast_import`] works with [`RoastImport`], and the positional
//! `timeindex` array is turned into named [`MilestoneIndices`] here.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::InvalidInput;
use crate::models::{
    ArtisanProfile, AuxChannel, BatchWeight, MilestoneIndices, RoastImport, SensorType,
    SpecialEvent,
};
use crate::types::{ControlKind, Milestone, TemperatureUnit};

/// Title used when the export carries none
pub const UNTITLED_ROAST: &str = "Untitled roast";

/// Parse a JSON document into a validated roast import
pub fn parse_roast_import_str(json: &str) -> Result<RoastImport, InvalidInput> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| InvalidInput::Malformed(e.to_string()))?;
    parse_roast_import(value)
}

/// Validate a decoded payload and build a [`RoastImport`]
pub fn parse_roast_import(payload: Value) -> Result<RoastImport, InvalidInput> {
    if !payload.is_object() {
        return Err(InvalidInput::WrongType {
            field: "payload".to_string(),
            expected: "a JSON object",
        });
    }

    let raw: ArtisanProfile =
        serde_json::from_value(payload).map_err(|e| InvalidInput::Malformed(e.to_string()))?;

    let unit = match raw.mode.as_deref() {
        Some(mode) => TemperatureUnit::from_mode(mode)
            .ok_or_else(|| InvalidInput::UnsupportedUnit(mode.to_string()))?,
        None => return Err(InvalidInput::MissingField { field: "mode" }),
    };

    let timex = number_array("timex", required(raw.timex.as_ref(), "timex")?)?;
    if timex.is_empty() {
        return Err(InvalidInput::EmptySeries);
    }
    expect_non_decreasing(&timex)?;
    let temp1 = reading_array("temp1", required(raw.temp1.as_ref(), "temp1")?)?;
    let temp2 = reading_array("temp2", required(raw.temp2.as_ref(), "temp2")?)?;
    expect_len("timex", timex.len(), "temp1", temp1.len())?;
    expect_len("timex", timex.len(), "temp2", temp2.len())?;

    let milestones = match raw.timeindex.as_ref() {
        Some(value) if !value.is_null() => parse_timeindex(value)?,
        _ => MilestoneIndices::default(),
    };

    let aux_channels = parse_aux_channels(&raw, &timex)?;
    let special_events = parse_special_events(&raw, timex.len())?;

    let weight = match raw.weight.as_ref() {
        Some(value) if !value.is_null() => parse_weight(value)?,
        _ => None,
    };

    let roast_date = raw
        .roastisodate
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| InvalidInput::WrongType {
                field: "roastisodate".to_string(),
                expected: "an ISO date (YYYY-MM-DD)",
            })
        })
        .transpose()?;

    let roaster_size = match raw.roastersize.as_ref() {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.as_f64().ok_or_else(|| InvalidInput::WrongType {
            field: "roastersize".to_string(),
            expected: "a number",
        })?),
    };

    Ok(RoastImport {
        title: non_empty(raw.title).unwrap_or_else(|| UNTITLED_ROAST.to_string()),
        roaster_type: non_empty(raw.roastertype),
        roaster_size,
        unit,
        timex,
        temp1,
        temp2,
        milestones,
        aux_channels,
        special_events,
        weight,
        beans: non_empty(raw.beans),
        notes: non_empty(raw.roastingnotes),
        roast_date,
    })
}

/// Convert the 8-slot `timeindex` array into named indices.
///
/// Charge is unset when negative, so index 0 means "charged at the first
/// sample". Every other slot is unset at 0 or below. Missing trailing slots
/// and `null` slots are unset.
pub fn parse_timeindex(value: &Value) -> Result<MilestoneIndices, InvalidInput> {
    let slots = value.as_array().ok_or_else(|| InvalidInput::WrongType {
        field: "timeindex".to_string(),
        expected: "an array of integers",
    })?;
    if slots.len() > Milestone::ALL.len() {
        return Err(InvalidInput::TooManyMilestoneSlots(slots.len()));
    }

    let mut indices = MilestoneIndices::default();
    for (i, (milestone, slot)) in Milestone::ALL.iter().zip(slots).enumerate() {
        if slot.is_null() {
            continue;
        }
        let raw = integer(slot).ok_or_else(|| InvalidInput::WrongType {
            field: format!("timeindex[{}]", i),
            expected: "an integer",
        })?;
        indices.set(*milestone, slot_index(*milestone, raw));
    }
    Ok(indices)
}

fn slot_index(milestone: Milestone, raw: i64) -> Option<usize> {
    let unset = match milestone {
        Milestone::Charge => raw < 0,
        _ => raw <= 0,
    };
    if unset {
        None
    } else {
        usize::try_from(raw).ok()
    }
}

/// The logger stores control settings as `1 + setting / 10`; map back to 0..=100
pub fn event_value_to_percent(raw: f64) -> f64 {
    if raw > -1.0 && raw < 1.0 {
        0.0
    } else if raw >= 1.0 {
        (raw * 10.0).round() - 10.0
    } else {
        (raw * 10.0).round() + 10.0
    }
}

fn parse_aux_channels(raw: &ArtisanProfile, timex: &[f64]) -> Result<Vec<AuxChannel>, InvalidInput> {
    let devices = match raw.extradevices.as_ref() {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(value) => value.as_array().ok_or_else(|| InvalidInput::WrongType {
            field: "extradevices".to_string(),
            expected: "an array of device ids",
        })?,
    };
    if devices.is_empty() {
        return Ok(Vec::new());
    }

    let names1 = string_list("extraname1", raw.extraname1.as_ref())?;
    let names2 = string_list("extraname2", raw.extraname2.as_ref())?;
    let timexes = nested("extratimex", raw.extratimex.as_ref(), number_array)?;
    let temps1 = nested("extratemp1", raw.extratemp1.as_ref(), reading_array)?;
    let temps2 = nested("extratemp2", raw.extratemp2.as_ref(), reading_array)?;

    let mut channels = Vec::new();
    for (i, device) in devices.iter().enumerate() {
        let device_id = integer(device).ok_or_else(|| InvalidInput::WrongType {
            field: format!("extradevices[{}]", i),
            expected: "an integer",
        })?;

        let channel_timex = match timexes.get(i) {
            Some(t) if !t.is_empty() => t.clone(),
            _ => timex.to_vec(),
        };

        for (channel, names, temps) in [(1, &names1, &temps1), (2, &names2, &temps2)] {
            let values = match temps.get(i) {
                Some(values) if !values.is_empty() => values,
                _ => continue,
            };
            expect_len(
                &format!("extratimex[{}]", i),
                channel_timex.len(),
                &format!("extratemp{}[{}]", channel, i),
                values.len(),
            )?;

            let device_name = names
                .get(i)
                .map(|n| n.trim())
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Device {} channel {}", device_id, channel));

            channels.push(AuxChannel {
                device_id,
                sensor_type: SensorType::from_channel_name(&device_name),
                device_name,
                timex: channel_timex.clone(),
                values: values.clone(),
            });
        }
    }

    Ok(channels)
}

fn parse_special_events(raw: &ArtisanProfile, len: usize) -> Result<Vec<SpecialEvent>, InvalidInput> {
    let indices = match raw.specialevents.as_ref() {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(value) => integer_array("specialevents", value)?,
    };

    let types = match raw.specialeventstype.as_ref() {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => integer_array("specialeventstype", value)?,
    };
    let values = match raw.specialeventsvalue.as_ref() {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => reading_array("specialeventsvalue", value)?,
    };
    let labels = string_list("specialeventsStrings", raw.specialevents_strings.as_ref())?;

    if !types.is_empty() {
        expect_len("specialevents", indices.len(), "specialeventstype", types.len())?;
    }
    if !values.is_empty() {
        expect_len("specialevents", indices.len(), "specialeventsvalue", values.len())?;
    }
    if !labels.is_empty() {
        expect_len("specialevents", indices.len(), "specialeventsStrings", labels.len())?;
    }

    indices
        .iter()
        .enumerate()
        .map(|(i, &index)| {
            let sample_index = usize::try_from(index)
                .ok()
                .filter(|&ix| ix < len)
                .ok_or_else(|| InvalidInput::SampleIndexOutOfRange {
                    field: format!("specialevents[{}]", i),
                    index,
                    len,
                })?;

            Ok(SpecialEvent {
                sample_index,
                kind: types
                    .get(i)
                    .map(|t| ControlKind::from_event_type(*t))
                    .unwrap_or(ControlKind::Other),
                value: values
                    .get(i)
                    .copied()
                    .flatten()
                    .map(event_value_to_percent)
                    .unwrap_or(0.0),
                label: labels
                    .get(i)
                    .map(|l| l.trim())
                    .filter(|l| !l.is_empty())
                    .map(str::to_string),
            })
        })
        .collect()
}

fn parse_weight(value: &Value) -> Result<Option<BatchWeight>, InvalidInput> {
    let parts = value.as_array().ok_or_else(|| InvalidInput::WrongType {
        field: "weight".to_string(),
        expected: "an array [green, roasted, unit]",
    })?;

    let green = match parts.first().and_then(Value::as_f64).filter(|g| *g > 0.0) {
        Some(green) => to_decimal("weight[0]", green)?,
        None => return Ok(None),
    };
    let roasted = parts
        .get(1)
        .and_then(Value::as_f64)
        .filter(|r| *r > 0.0)
        .map(|r| to_decimal("weight[1]", r))
        .transpose()?;
    let unit = parts
        .get(2)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or("g")
        .to_string();

    Ok(Some(BatchWeight {
        green,
        roasted,
        unit,
    }))
}

// ============================================================================
// JSON helpers
// ============================================================================

fn required<'a>(value: Option<&'a Value>, field: &'static str) -> Result<&'a Value, InvalidInput> {
    match value {
        Some(v) if !v.is_null() => Ok(v),
        _ => Err(InvalidInput::MissingField { field }),
    }
}

fn array<'a>(field: &str, value: &'a Value) -> Result<&'a Vec<Value>, InvalidInput> {
    value.as_array().ok_or_else(|| InvalidInput::WrongType {
        field: field.to_string(),
        expected: "an array",
    })
}

/// Every element must be numeric
fn number_array(field: &str, value: &Value) -> Result<Vec<f64>, InvalidInput> {
    array(field, value)?
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_f64().ok_or_else(|| InvalidInput::WrongType {
                field: format!("{}[{}]", field, i),
                expected: "a number",
            })
        })
        .collect()
}

/// Non-numeric elements become missing readings
fn reading_array(field: &str, value: &Value) -> Result<Vec<Option<f64>>, InvalidInput> {
    Ok(array(field, value)?.iter().map(Value::as_f64).collect())
}

fn integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn integer_array(field: &str, value: &Value) -> Result<Vec<i64>, InvalidInput> {
    array(field, value)?
        .iter()
        .enumerate()
        .map(|(i, v)| {
            integer(v).ok_or_else(|| InvalidInput::WrongType {
                field: format!("{}[{}]", field, i),
                expected: "an integer",
            })
        })
        .collect()
}

fn string_list(field: &str, value: Option<&Value>) -> Result<Vec<String>, InvalidInput> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => Ok(array(field, value)?
            .iter()
            .map(|v| v.as_str().unwrap_or_default().to_string())
            .collect()),
    }
}

fn nested<T>(
    field: &str,
    value: Option<&Value>,
    parse: fn(&str, &Value) -> Result<Vec<T>, InvalidInput>,
) -> Result<Vec<Vec<T>>, InvalidInput> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => array(field, value)?
            .iter()
            .enumerate()
            .map(|(i, inner)| parse(&format!("{}[{}]", field, i), inner))
            .collect(),
    }
}

fn expect_len(left: &str, left_len: usize, right: &str, right_len: usize) -> Result<(), InvalidInput> {
    if left_len == right_len {
        Ok(())
    } else {
        Err(InvalidInput::LengthMismatch {
            left: left.to_string(),
            left_len,
            right: right.to_string(),
            right_len,
        })
    }
}

/// Sample times may repeat but never go backwards
fn expect_non_decreasing(timex: &[f64]) -> Result<(), InvalidInput> {
    match timex.windows(2).position(|pair| pair[1] < pair[0]) {
        Some(i) => Err(InvalidInput::DecreasingTime {
            index: i + 1,
            previous: timex[i],
            seconds: timex[i + 1],
        }),
        None => Ok(()),
    }
}

fn to_decimal(field: &str, value: f64) -> Result<Decimal, InvalidInput> {
    Decimal::try_from(value).map_err(|_| InvalidInput::WrongType {
        field: field.to_string(),
        expected: "a finite number",
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
