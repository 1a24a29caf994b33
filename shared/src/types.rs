//! Common types used across the import pipeline

use serde::{Deserialize, Serialize};

/// Temperature scale of a reading series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[serde(rename = "F")]
    Fahrenheit,
    #[serde(rename = "C")]
    Celsius,
}

impl TemperatureUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureUnit::Fahrenheit => "F",
            TemperatureUnit::Celsius => "C",
        }
    }

    /// Parse the logger's `mode` field
    pub fn from_mode(mode: &str) -> Option<Self> {
        match mode.trim() {
            "F" | "f" => Some(TemperatureUnit::Fahrenheit),
            "C" | "c" => Some(TemperatureUnit::Celsius),
            _ => None,
        }
    }
}

impl std::fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named roast milestones, in roast order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    Charge,
    DryEnd,
    FcStart,
    FcEnd,
    ScStart,
    ScEnd,
    Drop,
    Cool,
}

impl Milestone {
    /// All milestones in the order they occur during a roast
    pub const ALL: [Milestone; 8] = [
        Milestone::Charge,
        Milestone::DryEnd,
        Milestone::FcStart,
        Milestone::FcEnd,
        Milestone::ScStart,
        Milestone::ScEnd,
        Milestone::Drop,
        Milestone::Cool,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Milestone::Charge => "charge",
            Milestone::DryEnd => "dry_end",
            Milestone::FcStart => "fc_start",
            Milestone::FcEnd => "fc_end",
            Milestone::ScStart => "sc_start",
            Milestone::ScEnd => "sc_end",
            Milestone::Drop => "drop",
            Milestone::Cool => "cool",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Milestone::ALL.into_iter().find(|m| m.as_str() == s)
    }

    /// Event type code stored on event rows
    pub fn event_code(&self) -> &'static str {
        match self {
            Milestone::Charge => "CHARGE",
            Milestone::DryEnd => "DRY",
            Milestone::FcStart => "FCs",
            Milestone::FcEnd => "FCe",
            Milestone::ScStart => "SCs",
            Milestone::ScEnd => "SCe",
            Milestone::Drop => "DROP",
            Milestone::Cool => "COOL",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Milestone::Charge => "Charge",
            Milestone::DryEnd => "Dry End",
            Milestone::FcStart => "First Crack Start",
            Milestone::FcEnd => "First Crack End",
            Milestone::ScStart => "Second Crack Start",
            Milestone::ScEnd => "Second Crack End",
            Milestone::Drop => "Drop",
            Milestone::Cool => "Cool",
        }
    }
}

impl std::fmt::Display for Milestone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roast phases derived from milestones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoastPhase {
    Drying,
    Maillard,
    Development,
}

impl RoastPhase {
    pub const ALL: [RoastPhase; 3] = [
        RoastPhase::Drying,
        RoastPhase::Maillard,
        RoastPhase::Development,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoastPhase::Drying => "drying",
            RoastPhase::Maillard => "maillard",
            RoastPhase::Development => "development",
        }
    }

    /// Milestone that opens the phase
    pub fn opened_by(&self) -> Milestone {
        match self {
            RoastPhase::Drying => Milestone::Charge,
            RoastPhase::Maillard => Milestone::DryEnd,
            RoastPhase::Development => Milestone::FcStart,
        }
    }

    /// Milestones that may close the phase, canonical closer first
    pub fn closed_by(&self) -> &'static [Milestone] {
        match self {
            RoastPhase::Drying => &[Milestone::DryEnd, Milestone::FcStart, Milestone::Drop],
            RoastPhase::Maillard => &[Milestone::FcStart, Milestone::Drop],
            RoastPhase::Development => &[Milestone::Drop],
        }
    }
}

impl std::fmt::Display for RoastPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator control channels recorded as special events by the logger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    Air,
    Drum,
    Damper,
    Burner,
    Other,
}

impl ControlKind {
    /// Map the logger's numeric event type (0..=3, anything else is free-form)
    pub fn from_event_type(code: i64) -> Self {
        match code {
            0 => ControlKind::Air,
            1 => ControlKind::Drum,
            2 => ControlKind::Damper,
            3 => ControlKind::Burner,
            _ => ControlKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ControlKind::Air => "air",
            ControlKind::Drum => "drum",
            ControlKind::Damper => "damper",
            ControlKind::Burner => "burner",
            ControlKind::Other => "other",
        }
    }

    pub fn event_code(&self) -> &'static str {
        match self {
            ControlKind::Air => "AIR",
            ControlKind::Drum => "DRUM",
            ControlKind::Damper => "DAMPER",
            ControlKind::Burner => "BURNER",
            ControlKind::Other => "EVENT",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ControlKind::Air => "Air",
            ControlKind::Drum => "Drum",
            ControlKind::Damper => "Damper",
            ControlKind::Burner => "Burner",
            ControlKind::Other => "Event",
        }
    }
}
