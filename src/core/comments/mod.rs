//! Review-comment export parser
//!
//! Turns a loosely formatted comment export into ordered [`CommentRecord`]s:
//! 1. strip transport corruption (NUL, U+FFFD)
//! 2. whole-document guards (empty, too short, nothing recognisable)
//! 3. three-state line classifier ([`machine`])
//! 4. order-preserving deduplication ([`dedupe`])
//!
//! Parsing is a pure function of its input and options; an optional
//! diagnostic trace is collected on the side and never alters the result.

pub mod dedupe;
pub mod diagnostics;
pub mod machine;
pub mod patterns;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::core::timecode::{FrameRateProfile, Timecode};

pub use diagnostics::DiagnosticReport;

/// Inputs shorter than this are rejected without parsing
pub const MIN_INPUT_CHARS: usize = 20;

/// Emission stops once this many comments have been produced
pub const DEFAULT_MAX_COMMENTS: usize = 2000;

/// One parsed comment or reply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub author: String,
    /// Relative to media start
    pub timecode: Timecode,
    pub text: String,
    pub is_reply: bool,
    /// Header timestamp when it could be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<NaiveDateTime>,
}

impl CommentRecord {
    /// Stable id over the dedupe key (timecode, text, author)
    pub fn fingerprint(&self) -> String {
        let key = dedupe::DedupeKey::of(self);
        let raw = format!("{}\u{1f}{}\u{1f}{}", key.timecode, key.text, key.author);
        format!("{:016x}", xxhash_rust::xxh64::xxh64(raw.as_bytes(), 0))
    }
}

/// Why a document produced no records without being parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GuardRejection {
    Empty,
    TooShort,
    NoRecognisablePattern,
}

/// Parser result
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub comments: Vec<CommentRecord>,
    /// Set when the comment cap stopped parsing early
    pub truncated: bool,
    pub rejected: Option<GuardRejection>,
    /// Present only when diagnostics were requested
    pub diagnostics: Option<DiagnosticReport>,
}

/// Comment parser configuration
#[derive(Debug, Clone)]
pub struct CommentParser {
    profile: FrameRateProfile,
    diagnostics: bool,
    max_comments: usize,
}

impl Default for CommentParser {
    fn default() -> Self {
        Self {
            profile: FrameRateProfile::default(),
            diagnostics: false,
            max_comments: DEFAULT_MAX_COMMENTS,
        }
    }
}

impl CommentParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile used to validate every timecode
    pub fn with_profile(mut self, profile: FrameRateProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    pub fn with_max_comments(mut self, max: usize) -> Self {
        self.max_comments = max.max(1);
        self
    }

    pub fn profile(&self) -> FrameRateProfile {
        self.profile
    }

    /// Parse an export into deduplicated comment records
    #[instrument(skip_all, fields(len = input.len(), profile = %self.profile))]
    pub fn parse(&self, input: &str) -> ParseOutput {
        let cleaned = strip_corruption(input);

        if let Some(rejection) = guard(&cleaned) {
            debug!(?rejection, "export rejected before parsing");
            return ParseOutput {
                rejected: Some(rejection),
                diagnostics: self.diagnostics.then(DiagnosticReport::default),
                ..ParseOutput::default()
            };
        }

        let mut trace = self.diagnostics.then(DiagnosticReport::default);
        let machine = machine::LineMachine::new(self.profile, self.max_comments, trace.as_mut());
        let (raw, truncated) = machine.run(&cleaned);

        let comments = dedupe::dedupe(raw);
        if let Some(report) = trace.as_mut() {
            report.record_authors(&comments);
        }
        debug!(count = comments.len(), truncated, "export parsed");

        ParseOutput {
            comments,
            truncated,
            rejected: None,
            diagnostics: trace,
        }
    }
}

/// Convenience: parse with the default profile and no diagnostics
pub fn parse_comments(input: &str) -> Vec<CommentRecord> {
    CommentParser::default().parse(input).comments
}

/// NUL bytes and replacement characters are transport corruption
fn strip_corruption(input: &str) -> String {
    input
        .chars()
        .filter(|&c| c != '\0' && c != '\u{FFFD}')
        .collect()
}

fn guard(text: &str) -> Option<GuardRejection> {
    if text.trim().is_empty() {
        return Some(GuardRejection::Empty);
    }
    if text.chars().count() < MIN_INPUT_CHARS {
        return Some(GuardRejection::TooShort);
    }
    if !patterns::has_timecode_shape(text) && !patterns::has_author_header_shape(text) {
        return Some(GuardRejection::NoRecognisablePattern);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_return_empty() {
        let parser = CommentParser::new();
        assert_eq!(parser.parse("").rejected, Some(GuardRejection::Empty));
        assert_eq!(parser.parse("   \n\t ").rejected, Some(GuardRejection::Empty));
        assert_eq!(parser.parse("00:00:01:00 - hi").rejected, Some(GuardRejection::TooShort));
        assert_eq!(
            parser.parse("just some prose without anything useful in it").rejected,
            Some(GuardRejection::NoRecognisablePattern)
        );
    }

    #[test]
    fn corruption_is_stripped_not_rejected() {
        let input = "001 - Jane - 1:00PM Jan 1, 2025\n00:00:10:00 - Fix\0 the \u{FFFD}color";
        let out = CommentParser::new().parse(input);
        assert_eq!(out.comments.len(), 1);
        assert_eq!(out.comments[0].text, "Fix the color");
    }

    #[test]
    fn diagnostics_do_not_change_results() {
        let input = "001 - Jane - 1:00PM Jan 1, 2025\n00:00:10:00 - Fix the color\n  John - 1:05PM Jan 1, 2025\n  Agreed\n";
        let plain = CommentParser::new().parse(input);
        let traced = CommentParser::new().with_diagnostics(true).parse(input);
        assert_eq!(plain.comments, traced.comments);
        assert!(plain.diagnostics.is_none());
        assert!(traced.diagnostics.is_some());
    }

    #[test]
    fn fingerprint_ignores_case_and_padding() {
        let records = parse_comments(
            "001 - Jane - 1:00PM Jan 1, 2025\n00:00:10:00 - Fix the color\n00:00:11:00 - Fix the color",
        );
        assert_eq!(records.len(), 2);
        let mut copy = records[0].clone();
        copy.text = "  FIX THE COLOR ".into();
        assert_eq!(copy.fingerprint(), records[0].fingerprint());
        assert_ne!(records[0].fingerprint(), records[1].fingerprint());
    }
}
