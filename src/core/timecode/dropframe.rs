//! NTSC drop-frame counting
//!
//! Drop-frame timecode skips frame *labels* (never frames) so the label keeps
//! pace with wall-clock time at 29.97/59.94 fps:
//! - labels `;00` and `;01` (`;00`-`;03` at 59.94) are skipped at the start
//!   of every minute
//! - except minutes 0, 10, 20, 30, 40 and 50
//!
//! The inverse (`frame count -> label`) is closed-form and exact; there is no
//! drift at minute boundaries.

/// Constants for one drop-frame timebase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DropFrameTable {
    /// Labels per timecode second (30 or 60)
    pub timebase: u64,
    /// Labels skipped at the start of each non-tenth minute
    pub dropped_per_minute: u64,
    /// Countable frames in a minute that drops labels
    pub frames_per_minute: u64,
    /// Countable frames in a ten-minute block
    pub frames_per_ten_minutes: u64,
}

impl DropFrameTable {
    /// Table for an integer timebase; only 30 and 60 drop labels
    pub fn for_timebase(timebase: u32) -> Option<Self> {
        let dropped_per_minute = match timebase {
            30 => 2,
            60 => 4,
            _ => return None,
        };
        let timebase = timebase as u64;
        let frames_per_minute = timebase * 60 - dropped_per_minute;
        Some(Self {
            timebase,
            dropped_per_minute,
            frames_per_minute,
            // first minute of the block keeps all its labels
            frames_per_ten_minutes: timebase * 600 - 9 * dropped_per_minute,
        })
    }

    /// Labels skipped before `total_minutes` minutes have elapsed
    pub fn dropped_before(&self, total_minutes: u64) -> u64 {
        self.dropped_per_minute * (total_minutes - total_minutes / 10)
    }

    /// Countable frame number → label index (as if no labels were skipped)
    pub fn frames_to_label_index(&self, frames: u64) -> u64 {
        let blocks = frames / self.frames_per_ten_minutes;
        let remainder = frames % self.frames_per_ten_minutes;

        let mut skipped = 9 * self.dropped_per_minute * blocks;
        if remainder >= self.dropped_per_minute {
            skipped += self.dropped_per_minute
                * ((remainder - self.dropped_per_minute) / self.frames_per_minute);
        }
        frames + skipped
    }

    /// True for labels that drop-frame counting never produces
    pub fn is_dropped_label(&self, minutes: u8, seconds: u8, frames: u8) -> bool {
        seconds == 0 && minutes % 10 != 0 && (frames as u64) < self.dropped_per_minute
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ntsc() -> DropFrameTable {
        DropFrameTable::for_timebase(30).unwrap()
    }

    #[test]
    fn table_constants() {
        let t = ntsc();
        assert_eq!(t.frames_per_minute, 1798);
        assert_eq!(t.frames_per_ten_minutes, 17982);

        let t = DropFrameTable::for_timebase(60).unwrap();
        assert_eq!(t.dropped_per_minute, 4);
        assert_eq!(t.frames_per_ten_minutes, 35964);

        assert!(DropFrameTable::for_timebase(25).is_none());
    }

    #[test]
    fn label_index_around_first_minute() {
        let t = ntsc();
        // 00:00:59;29
        assert_eq!(t.frames_to_label_index(1799), 1799);
        // 00:01:00;02 is the first label of minute one
        assert_eq!(t.frames_to_label_index(1800), 1802);
    }

    #[test]
    fn label_index_at_tenth_minute() {
        let t = ntsc();
        // 00:10:00;00 keeps its labels
        assert_eq!(t.frames_to_label_index(17982), 18000);
        // 00:09:59;29
        assert_eq!(t.frames_to_label_index(17981), 17999);
    }

    #[test]
    fn dropped_labels() {
        let t = ntsc();
        assert!(t.is_dropped_label(1, 0, 0));
        assert!(t.is_dropped_label(1, 0, 1));
        assert!(!t.is_dropped_label(1, 0, 2));
        assert!(!t.is_dropped_label(10, 0, 0));
        assert_eq!(t.dropped_before(10), 18);
    }
}
