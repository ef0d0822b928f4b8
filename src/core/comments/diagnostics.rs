//! Side-channel parse trace
//!
//! Collected only on request. The report is inert data for logs or a UI and
//! is never read back by the parser.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use super::CommentRecord;
use super::dedupe::normalize_author;
use super::machine::ParserState;
use super::patterns::TimecodeSyntax;

/// How a single line was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineClass {
    Blank,
    AuthorHeader,
    CommentStart,
    TimecodedLine,
    Continuation,
    ReplyHeader,
    ReplyText,
    SyntheticReply,
    /// Line handed back to be classified again in another state
    Pushback,
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnomalyKind {
    InvalidTimecode,
    ZeroTimecode,
    NoiseText,
    OrphanReply,
    UnrecognizedLine,
    CommentCapReached,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineTrace {
    pub line: usize,
    pub state: ParserState,
    pub class: LineClass,
}

#[derive(Debug, Clone, Serialize)]
pub struct Transition {
    pub line: usize,
    pub from: ParserState,
    pub to: ParserState,
}

#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    pub line: usize,
    pub kind: AnomalyKind,
    pub detail: String,
}

/// Structured trace of one parse
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiagnosticReport {
    pub lines: Vec<LineTrace>,
    pub transitions: Vec<Transition>,
    pub anomalies: Vec<Anomaly>,
    /// Normalised author token → raw spellings seen
    pub authors: IndexMap<String, IndexSet<String>>,
    pub timecode_formats: IndexMap<TimecodeSyntax, usize>,
    /// Timecodes written with `;` before the frame field
    pub semicolon_timecodes: usize,
}

impl DiagnosticReport {
    pub(crate) fn line(&mut self, line: usize, state: ParserState, class: LineClass) {
        self.lines.push(LineTrace { line, state, class });
    }

    pub(crate) fn transition(&mut self, line: usize, from: ParserState, to: ParserState) {
        if from != to {
            self.transitions.push(Transition { line, from, to });
        }
    }

    pub(crate) fn anomaly(&mut self, line: usize, kind: AnomalyKind, detail: impl Into<String>) {
        self.anomalies.push(Anomaly {
            line,
            kind,
            detail: detail.into(),
        });
    }

    pub(crate) fn timecode_format(&mut self, syntax: TimecodeSyntax, raw_line: &str) {
        *self.timecode_formats.entry(syntax).or_insert(0) += 1;
        if raw_line.contains(';') {
            self.semicolon_timecodes += 1;
        }
    }

    pub(crate) fn record_authors(&mut self, comments: &[CommentRecord]) {
        for c in comments {
            self.authors
                .entry(normalize_author(&c.author))
                .or_default()
                .insert(c.author.clone());
        }
    }

    /// Count of anomalies of one kind
    pub fn anomaly_count(&self, kind: AnomalyKind) -> usize {
        self.anomalies.iter().filter(|a| a.kind == kind).count()
    }
}
