//! Error taxonomy of the import pipeline
//!
//! `InvalidInput` rejects a payload outright. `MalformedImport` is a
//! warning-level condition: the import proceeds with degraded confidence.

use serde::Serialize;
use thiserror::Error;

use crate::models::MilestoneSet;
use crate::types::Milestone;

/// Payload shape violations. Nothing is persisted when one of these occurs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidInput {
    #[error("payload could not be decoded: {0}")]
    Malformed(String),

    #[error("field `{field}` is required")]
    MissingField { field: &'static str },

    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("`{left}` has {left_len} elements but `{right}` has {right_len}")]
    LengthMismatch {
        left: String,
        left_len: usize,
        right: String,
        right_len: usize,
    },

    #[error("unsupported temperature unit `{0}`, expected F or C")]
    UnsupportedUnit(String),

    #[error("`timex` must contain at least one sample")]
    EmptySeries,

    #[error("`timex` goes backwards at sample {index}: {seconds}s after {previous}s")]
    DecreasingTime {
        index: usize,
        previous: f64,
        seconds: f64,
    },

    #[error("`timeindex` has {0} slots, at most 8 are allowed")]
    TooManyMilestoneSlots(usize),

    #[error("`{field}` references sample {index} but the series has {len} samples")]
    SampleIndexOutOfRange {
        field: String,
        index: i64,
        len: usize,
    },
}

impl InvalidInput {
    /// Name of the offending field, when one can be identified
    pub fn field(&self) -> Option<&str> {
        match self {
            InvalidInput::Malformed(_) | InvalidInput::EmptySeries => None,
            InvalidInput::MissingField { field } => Some(field),
            InvalidInput::WrongType { field, .. } => Some(field),
            InvalidInput::LengthMismatch { right, .. } => Some(right),
            InvalidInput::UnsupportedUnit(_) => Some("mode"),
            InvalidInput::DecreasingTime { .. } => Some("timex"),
            InvalidInput::TooManyMilestoneSlots(_) => Some("timeindex"),
            InvalidInput::SampleIndexOutOfRange { field, .. } => Some(field),
        }
    }
}

/// One problem found while resolving milestones
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MilestoneIssue {
    /// Index does not point into `timex`; the slot is treated as unset
    IndexOutOfRange {
        milestone: Milestone,
        index: usize,
        len: usize,
    },
    /// A later milestone was recorded before an earlier one
    OrderViolation {
        earlier: Milestone,
        earlier_seconds: f64,
        later: Milestone,
        later_seconds: f64,
    },
}

impl std::fmt::Display for MilestoneIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MilestoneIssue::IndexOutOfRange {
                milestone,
                index,
                len,
            } => write!(
                f,
                "{} index {} is outside a series of {} samples",
                milestone, index, len
            ),
            MilestoneIssue::OrderViolation {
                earlier,
                earlier_seconds,
                later,
                later_seconds,
            } => write!(
                f,
                "{} at {}s comes after {} at {}s",
                earlier, earlier_seconds, later, later_seconds
            ),
        }
    }
}

/// Milestones that could not be resolved cleanly.
///
/// `partial` holds what could be resolved, in recorded order: out-of-range
/// slots are unset and order violations are left as found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MalformedImport {
    pub issues: Vec<MilestoneIssue>,
    pub partial: MilestoneSet,
}

impl std::fmt::Display for MalformedImport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed milestones: ")?;
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for MalformedImport {}
