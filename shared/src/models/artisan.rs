//! Wire format of the roaster-logger export.
//!
//! Mirrors the exported JSON field names 1:1 and keeps numeric arrays as raw
//! JSON values. Use [`crate::validation::parse_roast_import`] to turn it into
//! a [`crate::models::RoastImport`].

use serde::Deserialize;
use serde_json::Value;

/// Raw roaster-logger profile as exported
#[derive(Debug, Default, Deserialize)]
pub struct ArtisanProfile {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub roastertype: Option<String>,

    #[serde(default)]
    pub roastersize: Option<Value>,

    /// Temperature unit, "F" or "C"
    #[serde(default)]
    pub mode: Option<String>,

    /// Seconds from the start of recording
    #[serde(default)]
    pub timex: Option<Value>,

    /// Environmental temperature channel
    #[serde(default)]
    pub temp1: Option<Value>,

    /// Bean temperature channel
    #[serde(default)]
    pub temp2: Option<Value>,

    /// `[CHARGE, DRY_END, FC_START, FC_END, SC_START, SC_END, DROP, COOL]`
    #[serde(default)]
    pub timeindex: Option<Value>,

    /// `[green, roasted, unit]`
    #[serde(default)]
    pub weight: Option<Value>,

    #[serde(default)]
    pub beans: Option<String>,

    #[serde(default)]
    pub roastingnotes: Option<String>,

    #[serde(default)]
    pub roastisodate: Option<String>,

    #[serde(default)]
    pub extradevices: Option<Value>,

    #[serde(default)]
    pub extraname1: Option<Value>,

    #[serde(default)]
    pub extraname2: Option<Value>,

    #[serde(default)]
    pub extratimex: Option<Value>,

    #[serde(default)]
    pub extratemp1: Option<Value>,

    #[serde(default)]
    pub extratemp2: Option<Value>,

    #[serde(default)]
    pub specialevents: Option<Value>,

    #[serde(default)]
    pub specialeventstype: Option<Value>,

    #[serde(default)]
    pub specialeventsvalue: Option<Value>,

    #[serde(rename = "specialeventsStrings", default)]
    pub specialevents_strings: Option<Value>,
}
