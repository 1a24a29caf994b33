//! Roast import and derived milestone/phase models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ControlKind, Milestone, TemperatureUnit};

/// A validated roast import.
///
/// Produced by [`crate::validation::parse_roast_import`]; all parallel arrays
/// have equal length and milestone indices are named.
#[derive(Debug, Clone, PartialEq)]
pub struct RoastImport {
    pub title: String,
    pub roaster_type: Option<String>,
    pub roaster_size: Option<f64>,
    pub unit: TemperatureUnit,
    /// Seconds from the start of recording
    pub timex: Vec<f64>,
    /// Raw channel 1 (environmental temperature)
    pub temp1: Vec<Option<f64>>,
    /// Raw channel 2 (bean temperature)
    pub temp2: Vec<Option<f64>>,
    pub milestones: MilestoneIndices,
    pub aux_channels: Vec<AuxChannel>,
    pub special_events: Vec<SpecialEvent>,
    pub weight: Option<BatchWeight>,
    pub beans: Option<String>,
    pub notes: Option<String>,
    pub roast_date: Option<NaiveDate>,
}

impl RoastImport {
    pub fn sample_count(&self) -> usize {
        self.timex.len()
    }
}

/// Sample indices of each recorded milestone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneIndices {
    pub charge: Option<usize>,
    pub dry_end: Option<usize>,
    pub fc_start: Option<usize>,
    pub fc_end: Option<usize>,
    pub sc_start: Option<usize>,
    pub sc_end: Option<usize>,
    pub drop: Option<usize>,
    pub cool: Option<usize>,
}

impl MilestoneIndices {
    pub fn get(&self, milestone: Milestone) -> Option<usize> {
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

    pub fn set(&mut self, milestone: Milestone, index: Option<usize>) {
        let slot = match milestone {
            Milestone::Charge => &mut self.charge,
            Milestone::DryEnd => &mut self.dry_end,
            Milestone::FcStart => &mut self.fc_start,
            Milestone::FcEnd => &mut self.fc_end,
            Milestone::ScStart => &mut self.sc_start,
            Milestone::ScEnd => &mut self.sc_end,
            Milestone::Drop => &mut self.drop,
            Milestone::Cool => &mut self.cool,
        };
        *slot = index;
    }

    pub fn is_empty(&self) -> bool {
        Milestone::ALL.iter().all(|m| self.get(*m).is_none())
    }
}

/// Resolved milestone times in seconds from the start of recording
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MilestoneSet {
    pub charge: Option<f64>,
    pub dry_end: Option<f64>,
    pub fc_start: Option<f64>,
    pub fc_end: Option<f64>,
    pub sc_start: Option<f64>,
    pub sc_end: Option<f64>,
    pub drop: Option<f64>,
    pub cool: Option<f64>,
}

impl MilestoneSet {
    pub fn get(&self, milestone: Milestone) -> Option<f64> {
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

    pub fn set(&mut self, milestone: Milestone, seconds: Option<f64>) {
        let slot = match milestone {
            Milestone::Charge => &mut self.charge,
            Milestone::DryEnd => &mut self.dry_end,
            Milestone::FcStart => &mut self.fc_start,
            Milestone::FcEnd => &mut self.fc_end,
            Milestone::ScStart => &mut self.sc_start,
            Milestone::ScEnd => &mut self.sc_end,
            Milestone::Drop => &mut self.drop,
            Milestone::Cool => &mut self.cool,
        };
        *slot = seconds;
    }

    /// Present milestones in roast order
    pub fn present(&self) -> Vec<(Milestone, f64)> {
        Milestone::ALL
            .iter()
            .filter_map(|m| self.get(*m).map(|t| (*m, t)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.present().is_empty()
    }
}

/// Where the total roast time came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalTimeSource {
    /// `drop - charge`
    Milestones,
    /// Last sample time minus charge (or zero)
    SeriesFallback,
}

impl TotalTimeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TotalTimeSource::Milestones => "milestones",
            TotalTimeSource::SeriesFallback => "series_fallback",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "milestones" => Some(TotalTimeSource::Milestones),
            "series_fallback" => Some(TotalTimeSource::SeriesFallback),
            _ => None,
        }
    }
}

/// Total roast duration and its provenance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoastDuration {
    pub seconds: f64,
    pub source: TotalTimeSource,
}

/// Phase percentages of total roast time.
///
/// A phase with a missing boundary reports 0, not null. The three values
/// need not sum to 100 and are never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseSet {
    pub drying_percent: f64,
    pub maillard_percent: f64,
    pub development_percent: f64,
    pub total_time_seconds: f64,
    pub total_time_source: TotalTimeSource,
}

/// An auxiliary logger channel (fan, heater, extra probes)
#[derive(Debug, Clone, PartialEq)]
pub struct AuxChannel {
    pub device_id: i64,
    pub device_name: String,
    pub sensor_type: SensorType,
    pub timex: Vec<f64>,
    pub values: Vec<Option<f64>>,
}

/// What an auxiliary channel measures, inferred from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    Temperature,
    Fan,
    Heat,
}

impl SensorType {
    pub fn from_channel_name(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if ["fan", "air"].iter().any(|k| name.contains(k)) {
            SensorType::Fan
        } else if ["heat", "burner", "power", "gas"].iter().any(|k| name.contains(k)) {
            SensorType::Heat
        } else {
            SensorType::Temperature
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Temperature => "temperature",
            SensorType::Fan => "fan",
            SensorType::Heat => "heat",
        }
    }
}

/// Operator annotation recorded on a sample
#[derive(Debug, Clone, PartialEq)]
pub struct SpecialEvent {
    pub sample_index: usize,
    pub kind: ControlKind,
    /// Control setting on a 0..=100 scale
    pub value: f64,
    pub label: Option<String>,
}

/// Green and roasted batch weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchWeight {
    pub green: Decimal,
    pub roasted: Option<Decimal>,
    pub unit: String,
}

impl BatchWeight {
    pub fn weight_loss_percent(&self) -> Option<Decimal> {
        self.roasted
            .map(|roasted| calculate_weight_loss(self.green, roasted))
    }
}

/// Calculate weight loss percentage
pub fn calculate_weight_loss(green_weight: Decimal, roasted_weight: Decimal) -> Decimal {
    if green_weight.is_zero() {
        Decimal::ZERO
    } else {
        ((green_weight - roasted_weight) / green_weight) * Decimal::from(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_weight_loss_calculation_basic() {
        assert_eq!(calculate_weight_loss(dec("100.0"), dec("85.0")), dec("15.0"));
        assert_eq!(calculate_weight_loss(Decimal::ZERO, dec("85.0")), Decimal::ZERO);
    }

    #[test]
    fn test_batch_weight_without_roasted_weight() {
        let weight = BatchWeight {
            green: dec("500"),
            roasted: None,
            unit: "g".to_string(),
        };
        assert_eq!(weight.weight_loss_percent(), None);
    }

    #[test]
    fn test_milestone_set_present_in_roast_order() {
        let mut set = MilestoneSet::default();
        set.set(Milestone::Drop, Some(600.0));
        set.set(Milestone::Charge, Some(0.0));
        assert_eq!(
            set.present(),
            vec![(Milestone::Charge, 0.0), (Milestone::Drop, 600.0)]
        );
        assert!(!set.is_empty());
        assert!(MilestoneSet::default().is_empty());
    }

    #[test]
    fn test_sensor_type_from_name() {
        assert_eq!(SensorType::from_channel_name("Fan"), SensorType::Fan);
        assert_eq!(SensorType::from_channel_name("Burner %"), SensorType::Heat);
        assert_eq!(SensorType::from_channel_name("Exhaust"), SensorType::Temperature);
    }
}
