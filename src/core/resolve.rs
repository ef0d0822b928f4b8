//! Conflict resolution with fixed and per-candidate policies
//!
//! Conflicting candidates are resolved strictly in candidate order:
//! - `skip`     → candidate left out of the creation set
//! - `replace`  → candidate kept; the creator overwrites the colliding markers
//! - `offset`   → candidate shifted just past every conflict, name suffixed
//! - `ask-each` → a [`ConflictDecider`] chooses, optionally for all remaining
//! - `cancel`   → nothing is created
//!
//! Without a decider `ask-each` behaves as `skip`: existing markers are only
//! ever overwritten by an explicit `replace`.

use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::core::conflict::{
    Conflict, ConflictKind, ConflictSettings, DetectionReport, classify,
};
use crate::core::marker::{ExistingMarker, Marker};
use crate::core::timecode::TimecodeError;

/// Upper bound on re-check shifts for a single offset marker
pub const MAX_OFFSET_ATTEMPTS: usize = 16;

/// Resolution policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    /// Leave the candidate out
    Skip,
    /// Create the candidate over the existing marker
    Replace,
    /// Move the candidate past the conflict
    Offset,
    /// Decide per candidate
    AskEach,
    /// Abort the whole import
    Cancel,
}

impl ResolutionStrategy {
    /// Stable tag for JSON and prompts
    pub fn tag(self) -> &'static str {
        match self {
            ResolutionStrategy::Skip => "skip",
            ResolutionStrategy::Replace => "replace",
            ResolutionStrategy::Offset => "offset",
            ResolutionStrategy::AskEach => "ask-each",
            ResolutionStrategy::Cancel => "cancel",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// What a decider is shown for one conflicting candidate
#[derive(Debug)]
pub struct DecisionPrompt<'a> {
    pub candidate: &'a Marker,
    pub conflicts: &'a [Conflict],
    pub summary: String,
    /// 1-based position among conflicting candidates
    pub position: usize,
    pub total: usize,
}

/// A decider's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub strategy: ResolutionStrategy,
    /// Use `strategy` for every remaining candidate without asking again
    pub apply_to_all: bool,
}

impl Decision {
    pub fn once(strategy: ResolutionStrategy) -> Self {
        Self { strategy, apply_to_all: false }
    }

    pub fn for_all(strategy: ResolutionStrategy) -> Self {
        Self { strategy, apply_to_all: true }
    }
}

/// Chooses a strategy for one conflicting candidate
pub trait ConflictDecider {
    fn decide(&mut self, prompt: &DecisionPrompt<'_>) -> Decision;
}

impl<F> ConflictDecider for F
where
    F: FnMut(&DecisionPrompt<'_>) -> Decision,
{
    fn decide(&mut self, prompt: &DecisionPrompt<'_>) -> Decision {
        self(prompt)
    }
}

/// Headless decider returning a fixed answer
#[derive(Debug, Clone, Copy)]
pub struct BatchDecider {
    pub strategy: ResolutionStrategy,
}

impl Default for BatchDecider {
    fn default() -> Self {
        Self { strategy: ResolutionStrategy::Skip }
    }
}

impl ConflictDecider for BatchDecider {
    fn decide(&mut self, _prompt: &DecisionPrompt<'_>) -> Decision {
        Decision::for_all(self.strategy)
    }
}

/// Running totals for one resolver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionStats {
    /// Candidates examined
    pub checked: usize,
    /// Conflicts found across all candidates
    pub conflicts: usize,
    /// Conflicting candidates that received a decision
    pub resolved: usize,
    pub skipped: usize,
    pub replaced: usize,
    pub offset: usize,
    pub cancelled: usize,
}

impl ResolutionStats {
    fn absorb(&mut self, other: &ResolutionStats) {
        self.checked += other.checked;
        self.conflicts += other.conflicts;
        self.resolved += other.resolved;
        self.skipped += other.skipped;
        self.replaced += other.replaced;
        self.offset += other.offset;
        self.cancelled += other.cancelled;
    }
}

impl fmt::Display for ResolutionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} checked, {} conflicts, {} skipped, {} replaced, {} offset",
            self.checked, self.conflicts, self.skipped, self.replaced, self.offset
        )
    }
}

/// Candidate created over existing markers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Replacement {
    /// Index into [`ResolutionOutcome::markers`]
    pub marker_index: usize,
    pub existing: Vec<ExistingMarker>,
}

/// Final creation set and what happened on the way
#[derive(Debug, Clone, Default)]
pub struct ResolutionOutcome {
    /// Markers to create, in candidate order
    pub markers: Vec<Marker>,
    pub skipped: Vec<Marker>,
    pub replacements: Vec<Replacement>,
    pub cancelled: bool,
    pub stats: ResolutionStats,
}

/// Applies a policy to a [`DetectionReport`]
#[derive(Debug, Clone, Default)]
pub struct ConflictResolver {
    settings: ConflictSettings,
    totals: ResolutionStats,
}

impl ConflictResolver {
    pub fn new(settings: ConflictSettings) -> Self {
        Self {
            settings,
            totals: ResolutionStats::default(),
        }
    }

    pub fn settings(&self) -> &ConflictSettings {
        &self.settings
    }

    /// Totals across every run of this resolver
    pub fn stats(&self) -> ResolutionStats {
        self.totals
    }

    pub fn reset(&mut self) {
        self.totals = ResolutionStats::default();
    }

    /// Resolve every conflicting candidate in order
    #[instrument(skip_all, fields(policy = %policy, candidates = report.candidates.len()))]
    pub fn resolve(
        &mut self,
        report: DetectionReport,
        policy: ResolutionStrategy,
        mut decider: Option<&mut dyn ConflictDecider>,
    ) -> Result<ResolutionOutcome, TimecodeError> {
        let DetectionReport {
            candidates,
            existing,
            conflicted,
        } = report;

        let mut outcome = ResolutionOutcome::default();
        outcome.stats.checked = candidates.len();
        outcome.stats.conflicts = conflicted.iter().map(|c| c.conflicts.len()).sum();

        let total = conflicted.len();
        let mut pending = conflicted.into_iter().peekable();
        let mut position = 0usize;
        let mut policy = policy;

        for (index, candidate) in candidates.into_iter().enumerate() {
            let Some(entry) = pending.next_if(|c| c.candidate_index == index) else {
                outcome.markers.push(candidate);
                continue;
            };
            position += 1;

            let strategy = match policy {
                ResolutionStrategy::AskEach => match decider.as_deref_mut() {
                    None => {
                        debug!(index, "no decider, skipping");
                        policy = ResolutionStrategy::Skip;
                        ResolutionStrategy::Skip
                    }
                    Some(decider) => {
                        let prompt = DecisionPrompt {
                            candidate: &candidate,
                            conflicts: &entry.conflicts,
                            summary: summarize(&candidate, &entry.conflicts),
                            position,
                            total,
                        };
                        let decision = decider.decide(&prompt);
                        let chosen = match decision.strategy {
                            ResolutionStrategy::AskEach => ResolutionStrategy::Skip,
                            other => other,
                        };
                        if decision.apply_to_all {
                            policy = chosen;
                        }
                        chosen
                    }
                },
                fixed => fixed,
            };
            debug!(index, name = %candidate.name, %strategy, "resolving");

            match strategy {
                ResolutionStrategy::Cancel => {
                    outcome.stats.cancelled += 1;
                    outcome.cancelled = true;
                    outcome.markers.clear();
                    outcome.replacements.clear();
                    warn!(index, "resolution cancelled");
                    break;
                }
                ResolutionStrategy::Skip | ResolutionStrategy::AskEach => {
                    outcome.stats.skipped += 1;
                    outcome.skipped.push(candidate);
                }
                ResolutionStrategy::Replace => {
                    outcome.stats.replaced += 1;
                    outcome.replacements.push(Replacement {
                        marker_index: outcome.markers.len(),
                        existing: entry.conflicts.iter().map(|c| c.existing.clone()).collect(),
                    });
                    outcome.markers.push(candidate);
                }
                ResolutionStrategy::Offset => {
                    let shifted = self.offset(&candidate, &entry.conflicts, &existing, &outcome.markers)?;
                    outcome.stats.offset += 1;
                    outcome.markers.push(shifted);
                }
            }
            outcome.stats.resolved += 1;
        }

        self.totals.absorb(&outcome.stats);
        info!(stats = %outcome.stats, cancelled = outcome.cancelled, "conflicts resolved");
        Ok(outcome)
    }

    /// Shift clearing every conflict on the candidate
    fn offset(
        &self,
        candidate: &Marker,
        conflicts: &[Conflict],
        existing: &[ExistingMarker],
        accepted: &[Marker],
    ) -> Result<Marker, TimecodeError> {
        let step = self.settings.default_offset_frames;
        let mut frames = required_offset(conflicts, step);
        let mut shifted = candidate.shifted(frames)?;

        if !self.settings.recheck_offsets {
            return Ok(shifted);
        }

        for attempt in 1..=MAX_OFFSET_ATTEMPTS {
            if !self.collides(&shifted, existing, accepted) {
                return Ok(shifted);
            }
            if attempt == MAX_OFFSET_ATTEMPTS {
                break;
            }
            frames += step;
            shifted = candidate.shifted(frames)?;
        }
        warn!(name = %candidate.name, frames, "offset marker still collides after re-checks");
        Ok(shifted)
    }

    fn collides(&self, marker: &Marker, existing: &[ExistingMarker], accepted: &[Marker]) -> bool {
        existing
            .iter()
            .any(|ex| classify(marker, ex, &self.settings).is_some())
            || accepted
                .iter()
                .any(|m| classify(marker, &ExistingMarker::from(m), &self.settings).is_some())
    }
}

/// Smallest shift clearing every conflict: the default step for exact
/// positions, `distance + step` for near ones, maximum over all of them
pub fn required_offset(conflicts: &[Conflict], default_offset_frames: u64) -> u64 {
    conflicts
        .iter()
        .map(|c| match c.kind {
            ConflictKind::NearTimecode => c.distance_frames.unwrap_or(0) + default_offset_frames,
            _ => default_offset_frames,
        })
        .fold(default_offset_frames, u64::max)
}

/// One-line description of a candidate and its conflicts
pub fn summarize(candidate: &Marker, conflicts: &[Conflict]) -> String {
    let details = conflicts
        .iter()
        .map(|c| match c.distance_frames {
            Some(d) if c.kind == ConflictKind::NearTimecode => {
                format!("{} \"{}\" at {} ({d} frames away)", c.kind, c.existing.name, c.existing.start)
            }
            _ => format!("{} \"{}\" at {}", c.kind, c.existing.name, c.existing.start),
        })
        .join("; ");
    format!(
        "\"{}\" at {} conflicts with {} existing marker(s): {}",
        candidate.name,
        candidate.timecode,
        conflicts.len(),
        details
    )
}
