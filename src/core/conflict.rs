//! Marker conflict detection
//!
//! Every candidate is compared with every existing marker. Per pair the first
//! matching class wins:
//! 1. ExactMatch    → same normalised name, same label
//! 2. ExactName     → same normalised name, different label
//! 3. ExactTimecode → same label, different name
//! 4. NearTimecode  → within the near threshold (0 < distance ≤ threshold)
//!
//! A candidate keeps every conflict it has, one per colliding existing marker.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::core::marker::{ExistingMarker, Marker};
use crate::core::resolve::ResolutionStrategy;

/// Default near-timecode window in frames
pub const DEFAULT_NEAR_THRESHOLD_FRAMES: u64 = 15;

/// Default offset step in frames
pub const DEFAULT_OFFSET_FRAMES: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictKind {
    ExactMatch,
    ExactName,
    ExactTimecode,
    NearTimecode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl ConflictKind {
    pub fn severity(self) -> Severity {
        match self {
            ConflictKind::ExactMatch => Severity::High,
            ConflictKind::ExactName | ConflictKind::ExactTimecode => Severity::Medium,
            ConflictKind::NearTimecode => Severity::Low,
        }
    }

    /// Strategies that make sense for this class
    pub fn suggested_actions(self) -> &'static [ResolutionStrategy] {
        use ResolutionStrategy::*;
        match self {
            ConflictKind::ExactMatch => &[Skip, Replace],
            ConflictKind::ExactName | ConflictKind::ExactTimecode => &[Skip, Replace, Offset],
            ConflictKind::NearTimecode => &[Skip, Offset],
        }
    }

    /// Stable tag for tables and JSON
    pub fn tag(self) -> &'static str {
        match self {
            ConflictKind::ExactMatch => "exact-match",
            ConflictKind::ExactName => "exact-name",
            ConflictKind::ExactTimecode => "exact-timecode",
            ConflictKind::NearTimecode => "near-timecode",
        }
    }
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// One collision between a candidate and an existing marker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub existing: ExistingMarker,
    pub candidate_index: usize,
    pub severity: Severity,
    /// Absent when the two positions use different frame-rate profiles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_frames: Option<u64>,
}

/// Detection and offset tunables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictSettings {
    pub near_threshold_frames: u64,
    pub default_offset_frames: u64,
    pub enable_near_detection: bool,
    pub case_sensitive_names: bool,
    /// Re-check offset markers against existing and accepted markers
    pub recheck_offsets: bool,
}

impl Default for ConflictSettings {
    fn default() -> Self {
        Self {
            near_threshold_frames: DEFAULT_NEAR_THRESHOLD_FRAMES,
            default_offset_frames: DEFAULT_OFFSET_FRAMES,
            enable_near_detection: true,
            case_sensitive_names: false,
            recheck_offsets: false,
        }
    }
}

/// Conflicts gathered for one candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateConflicts {
    pub candidate_index: usize,
    pub conflicts: Vec<Conflict>,
}

impl CandidateConflicts {
    /// Most severe class on this candidate
    pub fn worst(&self) -> Option<Severity> {
        self.conflicts.iter().map(|c| c.severity).max()
    }
}

/// Output of [`detect_conflicts`]; owns the candidates for resolution
#[derive(Debug, Clone)]
pub struct DetectionReport {
    pub candidates: Vec<Marker>,
    pub existing: Vec<ExistingMarker>,
    /// Only candidates with at least one conflict, in candidate order
    pub conflicted: Vec<CandidateConflicts>,
}

impl DetectionReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicted.is_empty()
    }

    /// Total conflicts across all candidates
    pub fn conflict_count(&self) -> usize {
        self.conflicted.iter().map(|c| c.conflicts.len()).sum()
    }

    pub fn conflicts_for(&self, candidate_index: usize) -> &[Conflict] {
        self.conflicted
            .iter()
            .find(|c| c.candidate_index == candidate_index)
            .map_or(&[], |c| c.conflicts.as_slice())
    }
}

/// Trim, collapse inner whitespace and optionally case-fold
pub fn normalize_name(name: &str, case_sensitive: bool) -> String {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if case_sensitive {
        collapsed
    } else {
        collapsed.to_lowercase()
    }
}

/// Classify one pair; `None` when they do not collide
pub fn classify(
    candidate: &Marker,
    existing: &ExistingMarker,
    settings: &ConflictSettings,
) -> Option<(ConflictKind, Option<u64>)> {
    let same_name = normalize_name(&candidate.name, settings.case_sensitive_names)
        == normalize_name(&existing.name, settings.case_sensitive_names);
    let same_label = candidate.timecode.same_label(&existing.start);
    let distance = candidate.timecode.distance_frames(&existing.start).ok();

    let kind = match (same_name, same_label) {
        (true, true) => ConflictKind::ExactMatch,
        (true, false) => ConflictKind::ExactName,
        (false, true) => ConflictKind::ExactTimecode,
        (false, false) => {
            let near = settings.enable_near_detection
                && distance.is_some_and(|d| d > 0 && d <= settings.near_threshold_frames);
            if !near {
                return None;
            }
            ConflictKind::NearTimecode
        }
    };
    Some((kind, distance))
}

/// Compare every candidate against every existing marker
#[instrument(skip_all, fields(candidates = candidates.len(), existing = existing.len()))]
pub fn detect_conflicts(
    candidates: Vec<Marker>,
    existing: Vec<ExistingMarker>,
    settings: &ConflictSettings,
) -> DetectionReport {
    let mut conflicted = Vec::new();

    for (index, candidate) in candidates.iter().enumerate() {
        let conflicts: Vec<Conflict> = existing
            .iter()
            .filter_map(|ex| {
                classify(candidate, ex, settings).map(|(kind, distance_frames)| Conflict {
                    kind,
                    existing: ex.clone(),
                    candidate_index: index,
                    severity: kind.severity(),
                    distance_frames,
                })
            })
            .collect();

        if !conflicts.is_empty() {
            debug!(index, name = %candidate.name, count = conflicts.len(), "candidate conflicts");
            conflicted.push(CandidateConflicts {
                candidate_index: index,
                conflicts,
            });
        }
    }

    DetectionReport {
        candidates,
        existing,
        conflicted,
    }
}
