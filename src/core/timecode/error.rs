//! Typed timecode errors
//!
//! Malformed input is always rejected with a structured error; the engine
//! never clamps or guesses.

use std::fmt;

use itertools::Itertools;
use miette::Diagnostic;
use serde::Serialize;

use super::profile::FrameRateProfile;

/// One of the four timecode fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimecodeField {
    Hours,
    Minutes,
    Seconds,
    Frames,
}

impl fmt::Display for TimecodeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimecodeField::Hours => write!(f, "hours"),
            TimecodeField::Minutes => write!(f, "minutes"),
            TimecodeField::Seconds => write!(f, "seconds"),
            TimecodeField::Frames => write!(f, "frames"),
        }
    }
}

/// A single out-of-range field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: TimecodeField,
    pub value: u32,
    /// Smallest accepted value; non-zero only for drop-frame minute starts
    pub min: u32,
    /// Largest accepted value for this field under the profile
    pub max: u32,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min > 0 {
            write!(f, "{} {} (dropped label, allowed {}-{})", self.field, self.value, self.min, self.max)
        } else {
            write!(f, "{} {} (max {})", self.field, self.value, self.max)
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error, Diagnostic)]
pub enum TimecodeError {
    #[error("invalid timecode format `{input}`: {reason}")]
    #[diagnostic(code(timecode::invalid_format), help("expected HH:MM:SS:FF"))]
    InvalidFormat { input: String, reason: String },

    #[error("timecode `{input}` out of range: {}", join_violations(.violations))]
    #[diagnostic(
        code(timecode::invalid_range),
        help("hours 0-23, minutes and seconds 0-59, frames below the profile's timebase")
    )]
    InvalidRange {
        input: String,
        violations: Vec<FieldViolation>,
    },

    #[error("unsupported frame rate: {requested}")]
    #[diagnostic(
        code(timecode::unsupported_rate),
        help("supported: 23.976, 24, 25, 29.97, 30, 50, 59.94, 60; drop-frame only at 29.97/59.94")
    )]
    UnsupportedFrameRate { requested: String },

    #[error("frame rate profile mismatch: expected {expected}, found {found}")]
    #[diagnostic(code(timecode::profile_mismatch))]
    ProfileMismatch {
        expected: FrameRateProfile,
        found: FrameRateProfile,
    },

    #[error("timecode calculation failed: {0}")]
    #[diagnostic(code(timecode::calculation))]
    CalculationError(String),
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations.iter().join(", ")
}

impl TimecodeError {
    /// Fields cited by an `InvalidRange` error
    pub fn violated_fields(&self) -> Vec<TimecodeField> {
        match self {
            TimecodeError::InvalidRange { violations, .. } => {
                violations.iter().map(|v| v.field).collect()
            }
            _ => Vec::new(),
        }
    }
}
