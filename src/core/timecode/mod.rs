//! SMPTE timecode engine
//!
//! Parses, validates and formats `HH:MM:SS:FF` timecodes and performs
//! frame-accurate arithmetic under an explicit [`FrameRateProfile`]:
//! - timecode ⇄ absolute frame count (with NTSC drop-frame correction)
//! - addition with 24h wrap and reported day overflow
//! - durations that may cross midnight
//!
//! A [`Timecode`] always carries the profile that produced it. Operations that
//! combine two timecodes reject mismatched profiles.

pub mod dropframe;
pub mod error;
pub mod profile;

use std::fmt;

use serde::{Serialize, Serializer};

pub use error::{FieldViolation, TimecodeError, TimecodeField};
pub use profile::{FrameRate, FrameRateProfile};

/// Immutable timecode label paired with its frame-rate profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timecode {
    hours: u8,
    minutes: u8,
    seconds: u8,
    frames: u8,
    profile: FrameRateProfile,
}

/// Result of converting a frame count back to a label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConversion {
    pub timecode: Timecode,
    /// Whole days past 24h that were wrapped away
    pub day_overflow: u64,
}

/// Result of [`Timecode::add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimecodeSum {
    pub result: Timecode,
    pub day_overflow: u64,
}

/// Result of [`Timecode::duration`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimecodeSpan {
    pub duration: Timecode,
    pub frames: u64,
    pub crosses_midnight: bool,
}

/// Non-throwing parse outcome for callers that keep going on bad input
#[derive(Debug, Clone, PartialEq)]
pub struct TimecodeValidation {
    pub valid: bool,
    pub timecode: Option<Timecode>,
    pub error: Option<TimecodeError>,
}

impl Timecode {
    /// Build from components, validating every field against the profile
    pub fn new(
        hours: u32,
        minutes: u32,
        seconds: u32,
        frames: u32,
        profile: FrameRateProfile,
    ) -> Result<Self, TimecodeError> {
        let max_frame = profile.integer_fps() - 1;
        let checks = [
            (TimecodeField::Hours, hours, 23),
            (TimecodeField::Minutes, minutes, 59),
            (TimecodeField::Seconds, seconds, 59),
            (TimecodeField::Frames, frames, max_frame),
        ];

        let mut violations: Vec<FieldViolation> = checks
            .iter()
            .filter(|(_, value, max)| value > max)
            .map(|&(field, value, max)| FieldViolation { field, value, min: 0, max })
            .collect();

        // Drop-frame counting skips the first frame numbers of most minutes
        if violations.is_empty()
            && let Some(table) = profile.drop_table()
            && table.is_dropped_label(minutes as u8, seconds as u8, frames as u8)
        {
            violations.push(FieldViolation {
                field: TimecodeField::Frames,
                value: frames,
                min: table.dropped_per_minute as u32,
                max: max_frame,
            });
        }

        if !violations.is_empty() {
            return Err(TimecodeError::InvalidRange {
                input: format!("{hours:02}:{minutes:02}:{seconds:02}:{frames:02}"),
                violations,
            });
        }

        Ok(Self {
            hours: hours as u8,
            minutes: minutes as u8,
            seconds: seconds as u8,
            frames: frames as u8,
            profile,
        })
    }

    /// 00:00:00:00 under the given profile
    pub fn zero(profile: FrameRateProfile) -> Self {
        Self {
            hours: 0,
            minutes: 0,
            seconds: 0,
            frames: 0,
            profile,
        }
    }

    /// Parse `HH:MM:SS:FF` (`;` accepted before the frame field)
    ///
    /// All-or-nothing: any out-of-range field fails the whole parse and the
    /// error names every violated field.
    pub fn parse(text: &str, profile: FrameRateProfile) -> Result<Self, TimecodeError> {
        let input = text.trim();
        let invalid = |reason: &str| TimecodeError::InvalidFormat {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if input.is_empty() {
            return Err(invalid("empty input"));
        }

        let fields: Vec<&str> = input.split([':', ';']).collect();
        if fields.len() != 4 {
            return Err(invalid(&format!("expected 4 fields, found {}", fields.len())));
        }
        // ';' is only meaningful as the frame separator
        if input[..input.rfind([':', ';']).unwrap_or(0)].contains(';') {
            return Err(invalid("';' may only separate the frame field"));
        }

        let mut values = [0u32; 4];
        for (slot, field) in values.iter_mut().zip(&fields) {
            if field.is_empty() || field.len() > 3 || !field.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(&format!("non-numeric field `{field}`")));
            }
            *slot = field
                .parse()
                .map_err(|_| invalid(&format!("non-numeric field `{field}`")))?;
        }

        Self::new(values[0], values[1], values[2], values[3], profile).map_err(|e| match e {
            TimecodeError::InvalidRange { violations, .. } => TimecodeError::InvalidRange {
                input: input.to_string(),
                violations,
            },
            other => other,
        })
    }

    /// Non-throwing wrapper around [`Timecode::parse`]
    pub fn validate(text: &str, profile: FrameRateProfile) -> TimecodeValidation {
        match Self::parse(text, profile) {
            Ok(tc) => TimecodeValidation {
                valid: true,
                timecode: Some(tc),
                error: None,
            },
            Err(e) => TimecodeValidation {
                valid: false,
                timecode: None,
                error: Some(e),
            },
        }
    }

    pub fn hours(&self) -> u8 {
        self.hours
    }

    pub fn minutes(&self) -> u8 {
        self.minutes
    }

    pub fn seconds(&self) -> u8 {
        self.seconds
    }

    pub fn frames(&self) -> u8 {
        self.frames
    }

    pub fn profile(&self) -> FrameRateProfile {
        self.profile
    }

    /// True for the 00:00:00:00 sentinel
    pub fn is_zero(&self) -> bool {
        self.hours == 0 && self.minutes == 0 && self.seconds == 0 && self.frames == 0
    }

    /// Component-wise label equality, ignoring the profile
    pub fn same_label(&self, other: &Timecode) -> bool {
        (self.hours, self.minutes, self.seconds, self.frames)
            == (other.hours, other.minutes, other.seconds, other.frames)
    }

    /// True if drop-frame counting never produces this label
    pub fn is_dropped_label(&self) -> bool {
        self.profile
            .drop_table()
            .is_some_and(|t| t.is_dropped_label(self.minutes, self.seconds, self.frames))
    }

    /// Absolute frame count from 00:00:00:00
    pub fn to_frame_count(&self) -> u64 {
        let fps = self.profile.integer_fps() as u64;
        let total_seconds =
            self.hours as u64 * 3600 + self.minutes as u64 * 60 + self.seconds as u64;
        let raw = total_seconds * fps + self.frames as u64;

        match self.profile.drop_table() {
            Some(table) => {
                let total_minutes = self.hours as u64 * 60 + self.minutes as u64;
                raw.saturating_sub(table.dropped_before(total_minutes))
            }
            None => raw,
        }
    }

    /// Frame count under an explicit profile; rejects a mismatched profile
    pub fn frame_count_in(&self, profile: FrameRateProfile) -> Result<u64, TimecodeError> {
        self.ensure_profile(profile)?;
        Ok(self.to_frame_count())
    }

    /// Label for an absolute frame count; hours wrap at 24
    pub fn from_frame_count(frames: u64, profile: FrameRateProfile) -> FrameConversion {
        let per_day = profile.frames_per_day();
        let day_overflow = frames / per_day;
        let within_day = frames % per_day;

        let label_index = match profile.drop_table() {
            Some(table) => table.frames_to_label_index(within_day),
            None => within_day,
        };

        let fps = profile.integer_fps() as u64;
        let total_seconds = label_index / fps;
        let timecode = Self {
            hours: (total_seconds / 3600 % 24) as u8,
            minutes: (total_seconds / 60 % 60) as u8,
            seconds: (total_seconds % 60) as u8,
            frames: (label_index % fps) as u8,
            profile,
        };

        FrameConversion {
            timecode,
            day_overflow,
        }
    }

    /// Sum two timecodes under the same profile
    pub fn add(&self, other: &Timecode) -> Result<TimecodeSum, TimecodeError> {
        self.ensure_profile(other.profile)?;
        let total = self
            .to_frame_count()
            .checked_add(other.to_frame_count())
            .ok_or_else(|| TimecodeError::CalculationError("frame count overflow".into()))?;

        let conv = Self::from_frame_count(total, self.profile);
        Ok(TimecodeSum {
            result: conv.timecode,
            day_overflow: conv.day_overflow,
        })
    }

    /// Shift forward by a number of frames
    pub fn offset_frames(&self, frames: u64) -> Result<FrameConversion, TimecodeError> {
        let total = self
            .to_frame_count()
            .checked_add(frames)
            .ok_or_else(|| TimecodeError::CalculationError("frame offset overflow".into()))?;
        Ok(Self::from_frame_count(total, self.profile))
    }

    /// `end - start`; wraps through midnight when `end` precedes `start`
    pub fn duration(start: &Timecode, end: &Timecode) -> Result<TimecodeSpan, TimecodeError> {
        start.ensure_profile(end.profile)?;
        let profile = start.profile;
        let a = start.to_frame_count() as i64;
        let b = end.to_frame_count() as i64;

        let mut diff = b - a;
        let crosses_midnight = diff < 0;
        if crosses_midnight {
            diff += profile.frames_per_day() as i64;
        }

        let frames = u64::try_from(diff)
            .map_err(|_| TimecodeError::CalculationError(format!("negative duration {diff}")))?;

        Ok(TimecodeSpan {
            duration: Self::from_frame_count(frames, profile).timecode,
            frames,
            crosses_midnight,
        })
    }

    /// Absolute distance in frames between two timecodes of the same profile
    pub fn distance_frames(&self, other: &Timecode) -> Result<u64, TimecodeError> {
        self.ensure_profile(other.profile)?;
        Ok(self.to_frame_count().abs_diff(other.to_frame_count()))
    }

    /// Zero-padded `HH:MM:SS:FF`
    pub fn format(&self) -> String {
        self.to_string()
    }

    fn ensure_profile(&self, other: FrameRateProfile) -> Result<(), TimecodeError> {
        if self.profile != other {
            return Err(TimecodeError::ProfileMismatch {
                expected: self.profile,
                found: other,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds, self.frames
        )
    }
}

impl Serialize for Timecode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Frames expressed in timecode seconds (labels per second of the profile)
pub fn frames_to_seconds(frames: u64, profile: FrameRateProfile) -> f64 {
    frames as f64 / profile.integer_fps() as f64
}
