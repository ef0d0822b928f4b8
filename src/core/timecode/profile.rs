//! Frame-rate profiles
//!
//! A profile pairs a broadcast frame rate with the drop-frame flag. Every
//! timecode carries the profile that produced it; arithmetic refuses to mix
//! two different profiles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::dropframe::DropFrameTable;
use super::error::TimecodeError;

/// Supported nominal frame rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameRate {
    Fps23_976,
    Fps24,
    Fps25,
    Fps29_97,
    Fps30,
    Fps50,
    Fps59_94,
    Fps60,
}

impl FrameRate {
    pub const ALL: [FrameRate; 8] = [
        FrameRate::Fps23_976,
        FrameRate::Fps24,
        FrameRate::Fps25,
        FrameRate::Fps29_97,
        FrameRate::Fps30,
        FrameRate::Fps50,
        FrameRate::Fps59_94,
        FrameRate::Fps60,
    ];

    /// Nominal rate as labelled by editing applications
    pub fn nominal(self) -> f64 {
        match self {
            FrameRate::Fps23_976 => 23.976,
            FrameRate::Fps24 => 24.0,
            FrameRate::Fps25 => 25.0,
            FrameRate::Fps29_97 => 29.97,
            FrameRate::Fps30 => 30.0,
            FrameRate::Fps50 => 50.0,
            FrameRate::Fps59_94 => 59.94,
            FrameRate::Fps60 => 60.0,
        }
    }

    /// Frame labels per timecode second (the "timebase")
    pub fn integer_fps(self) -> u32 {
        match self {
            FrameRate::Fps23_976 | FrameRate::Fps24 => 24,
            FrameRate::Fps25 => 25,
            FrameRate::Fps29_97 | FrameRate::Fps30 => 30,
            FrameRate::Fps50 => 50,
            FrameRate::Fps59_94 | FrameRate::Fps60 => 60,
        }
    }

    /// Only the NTSC rates have a drop-frame convention
    pub fn supports_drop_frame(self) -> bool {
        matches!(self, FrameRate::Fps29_97 | FrameRate::Fps59_94)
    }

    fn label(self) -> &'static str {
        match self {
            FrameRate::Fps23_976 => "23.976",
            FrameRate::Fps24 => "24",
            FrameRate::Fps25 => "25",
            FrameRate::Fps29_97 => "29.97",
            FrameRate::Fps30 => "30",
            FrameRate::Fps50 => "50",
            FrameRate::Fps59_94 => "59.94",
            FrameRate::Fps60 => "60",
        }
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FrameRate {
    type Err = TimecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches("fps").trim();
        let rate = match trimmed {
            "23.976" | "23.98" => FrameRate::Fps23_976,
            "24" => FrameRate::Fps24,
            "25" => FrameRate::Fps25,
            "29.97" => FrameRate::Fps29_97,
            "30" => FrameRate::Fps30,
            "50" => FrameRate::Fps50,
            "59.94" => FrameRate::Fps59_94,
            "60" => FrameRate::Fps60,
            _ => {
                return Err(TimecodeError::UnsupportedFrameRate {
                    requested: s.to_string(),
                });
            }
        };
        Ok(rate)
    }
}

/// Frame rate plus drop-frame flag; governs all arithmetic on a timecode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FrameRateProfile {
    rate: FrameRate,
    drop_frame: bool,
}

impl FrameRateProfile {
    /// Build a profile, rejecting drop-frame on rates without the convention
    pub fn new(rate: FrameRate, drop_frame: bool) -> Result<Self, TimecodeError> {
        if drop_frame && !rate.supports_drop_frame() {
            return Err(TimecodeError::UnsupportedFrameRate {
                requested: format!("{rate} drop-frame"),
            });
        }
        Ok(Self { rate, drop_frame })
    }

    /// Non-drop profile; always valid
    pub const fn non_drop(rate: FrameRate) -> Self {
        Self {
            rate,
            drop_frame: false,
        }
    }

    pub fn rate(&self) -> FrameRate {
        self.rate
    }

    pub fn nominal_fps(&self) -> f64 {
        self.rate.nominal()
    }

    pub fn drop_frame(&self) -> bool {
        self.drop_frame
    }

    pub fn integer_fps(&self) -> u32 {
        self.rate.integer_fps()
    }

    /// Drop-frame table when this profile drops frame numbers
    pub(crate) fn drop_table(&self) -> Option<DropFrameTable> {
        if self.drop_frame {
            DropFrameTable::for_timebase(self.integer_fps())
        } else {
            None
        }
    }

    /// Number of countable frames in 24 hours of timecode
    pub fn frames_per_day(&self) -> u64 {
        match self.drop_table() {
            Some(table) => table.frames_per_ten_minutes * 6 * 24,
            None => 24 * 3600 * self.integer_fps() as u64,
        }
    }
}

impl Default for FrameRateProfile {
    fn default() -> Self {
        Self::non_drop(FrameRate::Fps29_97)
    }
}

impl fmt::Display for FrameRateProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.drop_frame {
            write!(f, "{}df", self.rate)
        } else {
            write!(f, "{}", self.rate)
        }
    }
}

impl FromStr for FrameRateProfile {
    type Err = TimecodeError;

    /// Accepts `"29.97"`, `"29.97df"`, `"59.94 DF"`, `"30ndf"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let (rate_part, drop_frame) = if let Some(rest) = lower.strip_suffix("ndf") {
            (rest, false)
        } else if let Some(rest) = lower.strip_suffix("df") {
            (rest, true)
        } else {
            (lower.as_str(), false)
        };

        let rate: FrameRate = rate_part.trim().parse().map_err(|_| {
            TimecodeError::UnsupportedFrameRate {
                requested: s.to_string(),
            }
        })?;
        Self::new(rate, drop_frame)
    }
}

impl TryFrom<String> for FrameRateProfile {
    type Error = TimecodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FrameRateProfile> for String {
    fn from(profile: FrameRateProfile) -> Self {
        profile.to_string()
    }
}
