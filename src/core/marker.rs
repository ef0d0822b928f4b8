//! Candidate markers built from parsed comments
//!
//! A comment's timecode is relative to media start; a marker sits at
//! `session_start + comment.timecode` on the target timeline.

use serde::Serialize;
use tracing::warn;

use crate::core::comments::CommentRecord;
use crate::core::timecode::{Timecode, TimecodeError, frames_to_seconds};

/// Default cap on generated marker names, in characters
pub const DEFAULT_MAX_NAME_LENGTH: usize = 80;

/// Where an offset marker originally wanted to sit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OffsetInfo {
    pub original_timecode: Timecode,
    pub original_name: String,
    pub offset_frames: u64,
    pub offset_seconds: f64,
}

/// Marker proposed for creation
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub name: String,
    /// Absolute position on the session timeline
    pub timecode: Timecode,
    pub source: CommentRecord,
    pub offset: Option<OffsetInfo>,
}

impl Marker {
    pub fn new(name: impl Into<String>, timecode: Timecode, source: CommentRecord) -> Self {
        Self {
            name: name.into(),
            timecode,
            source,
            offset: None,
        }
    }

    /// Copy shifted forward by `frames` from the unshifted position
    ///
    /// The name gets a `(+N.Ns)` suffix. Shifting an already shifted marker
    /// starts again from its original position and name.
    pub fn shifted(&self, frames: u64) -> Result<Marker, TimecodeError> {
        let (origin, base_name) = match &self.offset {
            Some(info) => (info.original_timecode, info.original_name.clone()),
            None => (self.timecode, self.name.clone()),
        };

        let conv = origin.offset_frames(frames)?;
        if conv.day_overflow > 0 {
            warn!(marker = %base_name, "offset wrapped past 24h");
        }

        let seconds = frames_to_seconds(frames, origin.profile());
        Ok(Marker {
            name: format!("{base_name} (+{seconds:.1}s)"),
            timecode: conv.timecode,
            source: self.source.clone(),
            offset: Some(OffsetInfo {
                original_timecode: origin,
                original_name: base_name,
                offset_frames: frames,
                offset_seconds: seconds,
            }),
        })
    }
}

/// Marker already present on the timeline; never written by this crate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExistingMarker {
    pub name: String,
    pub start: Timecode,
}

impl ExistingMarker {
    pub fn new(name: impl Into<String>, start: Timecode) -> Self {
        Self {
            name: name.into(),
            start,
        }
    }
}

impl From<&Marker> for ExistingMarker {
    fn from(marker: &Marker) -> Self {
        Self::new(marker.name.clone(), marker.timecode)
    }
}

/// How marker names are derived from comments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerNaming {
    pub include_author: bool,
    /// Zero disables truncation
    pub max_name_length: usize,
}

impl Default for MarkerNaming {
    fn default() -> Self {
        Self {
            include_author: true,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
        }
    }
}

impl MarkerNaming {
    pub fn name_for(&self, comment: &CommentRecord) -> String {
        let full = if self.include_author && !comment.author.is_empty() {
            format!("{}: {}", comment.author, comment.text)
        } else {
            comment.text.clone()
        };
        truncate_name(&full, self.max_name_length)
    }
}

/// Cut on a char boundary, marking the cut with `…`
pub fn truncate_name(name: &str, max_chars: usize) -> String {
    if max_chars == 0 || name.chars().count() <= max_chars {
        return name.to_string();
    }
    let kept: String = name.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", kept.trim_end())
}

/// One candidate per comment at `session_start + comment.timecode`
pub fn build_markers(
    comments: &[CommentRecord],
    session_start: &Timecode,
    naming: &MarkerNaming,
    include_replies: bool,
) -> Result<Vec<Marker>, TimecodeError> {
    let mut markers = Vec::with_capacity(comments.len());
    for comment in comments.iter().filter(|c| include_replies || !c.is_reply) {
        let sum = session_start.add(&comment.timecode)?;
        if sum.day_overflow > 0 {
            warn!(
                comment = %comment.timecode,
                session_start = %session_start,
                "marker position wrapped past 24h"
            );
        }
        markers.push(Marker::new(naming.name_for(comment), sum.result, comment.clone()));
    }
    Ok(markers)
}
