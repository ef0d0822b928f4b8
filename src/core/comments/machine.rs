//! Three-state line classifier
//!
//! States:
//! - `SCANNING`   → looking for author headers and comment starts
//! - `IN_COMMENT` → a main comment is open; plain lines continue its text
//! - `IN_REPLY`   → indented reply block under the last main comment
//!
//! Lines are walked by index. A handler either advances to the next line or
//! asks for the same line to be classified again in the new state (one-line
//! pushback), which keeps the walk bounded without recursion.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, warn};

use super::CommentRecord;
use super::diagnostics::{AnomalyKind, DiagnosticReport, LineClass};
use super::patterns::{
    AuthorHeader, TimecodeSyntax, extract_timecode, has_timecode_shape, match_author_header, match_comment_start,
    match_reply_header, strip_timecodes,
};
use crate::core::timecode::{FrameRateProfile, Timecode};

/// Author used until the first header is seen
const UNKNOWN_AUTHOR: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParserState {
    Scanning,
    InComment,
    InReply,
}

/// What the walker does after a line has been handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Advance,
    Reprocess,
}

#[derive(Debug)]
struct OpenComment {
    author: String,
    posted_at: Option<NaiveDateTime>,
    timecode: Timecode,
    parts: Vec<String>,
    line: usize,
}

#[derive(Debug)]
struct OpenReply {
    author: String,
    posted_at: Option<NaiveDateTime>,
    parts: Vec<String>,
    line: usize,
}

/// Tab or at least two leading spaces
fn is_indented(raw: &str) -> bool {
    raw.starts_with('\t') || raw.starts_with("  ")
}

/// Join buffered fragments with single spaces
fn join_parts(parts: &[String]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) struct LineMachine<'r> {
    profile: FrameRateProfile,
    max_comments: usize,
    state: ParserState,
    author: String,
    author_posted_at: Option<NaiveDateTime>,
    comment: Option<OpenComment>,
    reply: Option<OpenReply>,
    /// Timecode of the most recently emitted main comment; replies inherit it
    thread_timecode: Option<Timecode>,
    replies_in_thread: usize,
    out: Vec<CommentRecord>,
    trace: Option<&'r mut DiagnosticReport>,
}

impl<'r> LineMachine<'r> {
    pub fn new(
        profile: FrameRateProfile,
        max_comments: usize,
        trace: Option<&'r mut DiagnosticReport>,
    ) -> Self {
        Self {
            profile,
            max_comments,
            state: ParserState::Scanning,
            author: UNKNOWN_AUTHOR.to_string(),
            author_posted_at: None,
            comment: None,
            reply: None,
            thread_timecode: None,
            replies_in_thread: 0,
            out: Vec::new(),
            trace,
        }
    }

    /// Walk every line; returns the raw records and whether the cap was hit
    pub fn run(mut self, text: &str) -> (Vec<CommentRecord>, bool) {
        let lines: Vec<&str> = text.lines().collect();
        let mut truncated = false;
        let mut i = 0usize;

        while i < lines.len() {
            if self.out.len() >= self.max_comments {
                truncated = true;
                self.note(i + 1, AnomalyKind::CommentCapReached, "comment cap reached");
                warn!(cap = self.max_comments, line = i + 1, "comment cap reached, stopping");
                break;
            }

            let line_no = i + 1;
            let raw = lines[i].trim_end_matches('\r');
            let step = match self.state {
                ParserState::Scanning => self.on_scanning(line_no, raw),
                ParserState::InComment => self.on_comment(line_no, raw),
                ParserState::InReply => self.on_reply(line_no, raw),
            };

            if step == Step::Advance {
                i += 1;
            }
        }

        let end = lines.len() + 1;
        self.finish_comment(end);
        self.finish_reply(end);

        if self.out.len() > self.max_comments {
            self.out.truncate(self.max_comments);
            truncated = true;
        }
        (self.out, truncated)
    }

    fn on_scanning(&mut self, line_no: usize, raw: &str) -> Step {
        let line = raw.trim();
        if line.is_empty() {
            self.classify(line_no, LineClass::Blank);
            return Step::Advance;
        }

        if let Some(header) = match_author_header(line) {
            self.classify(line_no, LineClass::AuthorHeader);
            self.set_author(header);
            return Step::Advance;
        }

        if self.try_open_comment(line_no, line) {
            self.enter(line_no, ParserState::InComment);
            return Step::Advance;
        }

        self.reject_line(line_no, line);
        Step::Advance
    }

    fn on_comment(&mut self, line_no: usize, raw: &str) -> Step {
        let line = raw.trim();
        if line.is_empty() {
            self.classify(line_no, LineClass::Blank);
            return Step::Advance;
        }

        if let Some(header) = match_author_header(line) {
            self.classify(line_no, LineClass::AuthorHeader);
            self.finish_comment(line_no);
            self.set_author(header);
            self.enter(line_no, ParserState::Scanning);
            return Step::Advance;
        }

        if let Some((tc, text)) = self.comment_start(line_no, line) {
            self.finish_comment(line_no);
            self.classify(line_no, LineClass::CommentStart);
            self.open_comment(line_no, tc, text);
            return Step::Advance;
        }

        if is_indented(raw) {
            self.finish_comment(line_no);
            self.classify(line_no, LineClass::Pushback);
            self.replies_in_thread = 0;
            self.enter(line_no, ParserState::InReply);
            return Step::Reprocess;
        }

        // Comment-start form already failed above; only the extractor tiers remain
        if has_timecode_shape(line) {
            self.finish_comment(line_no);
            if !self.open_extracted(line_no, line) {
                self.reject_line(line_no, line);
                self.enter(line_no, ParserState::Scanning);
            }
            return Step::Advance;
        }

        self.classify(line_no, LineClass::Continuation);
        if let Some(open) = self.comment.as_mut() {
            open.parts.push(line.to_string());
        }
        Step::Advance
    }

    fn on_reply(&mut self, line_no: usize, raw: &str) -> Step {
        let line = raw.trim();
        if line.is_empty() {
            self.classify(line_no, LineClass::Blank);
            return Step::Advance;
        }

        // Back at column zero, or a line only SCANNING understands.
        // A timecode quoted inside reply text stays in the reply.
        if !is_indented(raw) || match_author_header(line).is_some() || match_comment_start(line).is_some() {
            self.finish_reply(line_no);
            self.classify(line_no, LineClass::Pushback);
            self.enter(line_no, ParserState::Scanning);
            return Step::Reprocess;
        }

        if let Some((name, posted_at)) = match_reply_header(line) {
            self.finish_reply(line_no);
            self.classify(line_no, LineClass::ReplyHeader);
            self.reply = Some(OpenReply {
                author: name,
                posted_at,
                parts: Vec::new(),
                line: line_no,
            });
            return Step::Advance;
        }

        match self.reply.as_mut() {
            Some(open) => {
                open.parts.push(line.to_string());
                self.classify(line_no, LineClass::ReplyText);
            }
            None => {
                let label = if self.replies_in_thread == 0 {
                    format!("{} (Continuation)", self.author)
                } else {
                    format!("{} (Reply)", self.author)
                };
                debug!(line = line_no, %label, "indented text without reply header");
                self.reply = Some(OpenReply {
                    author: label,
                    posted_at: None,
                    parts: vec![line.to_string()],
                    line: line_no,
                });
                self.classify(line_no, LineClass::SyntheticReply);
            }
        }
        Step::Advance
    }

    /// Validated comment-start line; an invalid timecode is reported and `None`
    fn comment_start(&mut self, line_no: usize, line: &str) -> Option<(Timecode, String)> {
        let (raw_tc, text) = match_comment_start(line)?;
        match Timecode::parse(raw_tc, self.profile) {
            Ok(tc) => {
                if let Some(trace) = self.trace.as_deref_mut() {
                    trace.timecode_format(TimecodeSyntax::LineStart, raw_tc);
                }
                Some((tc, text.trim().to_string()))
            }
            Err(e) => {
                warn!(line = line_no, error = %e, "invalid comment-start timecode");
                self.note(line_no, AnomalyKind::InvalidTimecode, e.to_string());
                None
            }
        }
    }

    /// Comment-start form first, then the extractor tiers
    fn try_open_comment(&mut self, line_no: usize, line: &str) -> bool {
        if let Some((tc, text)) = self.comment_start(line_no, line) {
            self.classify(line_no, LineClass::CommentStart);
            self.open_comment(line_no, tc, text);
            return true;
        }

        self.open_extracted(line_no, line)
    }

    /// Bracketed, line-start, then anywhere-in-line timecodes
    fn open_extracted(&mut self, line_no: usize, line: &str) -> bool {
        if let Some((tc, syntax)) = extract_timecode(line, self.profile) {
            if let Some(trace) = self.trace.as_deref_mut() {
                trace.timecode_format(syntax, line);
            }
            self.classify(line_no, LineClass::TimecodedLine);
            self.open_comment(line_no, tc, strip_timecodes(line));
            return true;
        }

        false
    }

    fn open_comment(&mut self, line_no: usize, timecode: Timecode, text: String) {
        self.replies_in_thread = 0;
        self.comment = Some(OpenComment {
            author: self.author.clone(),
            posted_at: self.author_posted_at,
            timecode,
            parts: vec![text],
            line: line_no,
        });
    }

    fn reject_line(&mut self, line_no: usize, line: &str) {
        if match_comment_start(line).is_some() {
            // comment_start already reported the bad timecode
        } else if has_timecode_shape(line) {
            warn!(line = line_no, "dropping line with invalid timecode");
            self.note(line_no, AnomalyKind::InvalidTimecode, line);
        } else {
            self.note(line_no, AnomalyKind::UnrecognizedLine, line);
        }
        self.classify(line_no, LineClass::Unrecognized);
    }

    fn set_author(&mut self, header: AuthorHeader) {
        debug!(index = header.index, author = %header.name, "author header");
        self.author = header.name;
        self.author_posted_at = header.posted_at;
    }

    fn finish_comment(&mut self, line_no: usize) {
        let Some(open) = self.comment.take() else {
            return;
        };
        let text = join_parts(&open.parts);
        let record = self.finalize(open.line, open.author, open.timecode, text, false, open.posted_at);
        if let Some(record) = record {
            self.thread_timecode = Some(record.timecode);
            self.out.push(record);
        }
        debug!(line = line_no, "comment closed");
    }

    fn finish_reply(&mut self, line_no: usize) {
        let Some(open) = self.reply.take() else {
            return;
        };
        let Some(timecode) = self.thread_timecode else {
            self.note(open.line, AnomalyKind::OrphanReply, open.author);
            return;
        };
        let text = join_parts(&open.parts);
        let record = self.finalize(open.line, open.author, timecode, text, true, open.posted_at);
        if let Some(record) = record {
            self.replies_in_thread += 1;
            self.out.push(record);
        }
        debug!(line = line_no, "reply closed");
    }

    /// Noise filter shared by comments and replies
    fn finalize(
        &mut self,
        line_no: usize,
        author: String,
        timecode: Timecode,
        text: String,
        is_reply: bool,
        posted_at: Option<NaiveDateTime>,
    ) -> Option<CommentRecord> {
        if timecode.is_zero() {
            self.note(line_no, AnomalyKind::ZeroTimecode, text);
            return None;
        }
        if text.chars().count() <= 1 {
            self.note(line_no, AnomalyKind::NoiseText, text);
            return None;
        }
        Some(CommentRecord {
            author,
            timecode,
            text,
            is_reply,
            posted_at,
        })
    }

    fn enter(&mut self, line_no: usize, next: ParserState) {
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.transition(line_no, self.state, next);
        }
        self.state = next;
    }

    fn classify(&mut self, line_no: usize, class: LineClass) {
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.line(line_no, self.state, class);
        }
    }

    fn note(&mut self, line_no: usize, kind: AnomalyKind, detail: impl Into<String>) {
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.anomaly(line_no, kind, detail);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timecode::FrameRate;

    fn run(text: &str) -> Vec<CommentRecord> {
        LineMachine::new(FrameRateProfile::default(), 2000, None).run(text).0
    }

    fn run_traced(text: &str) -> (Vec<CommentRecord>, DiagnosticReport) {
        let mut report = DiagnosticReport::default();
        let (out, _) = LineMachine::new(FrameRateProfile::default(), 2000, Some(&mut report)).run(text);
        (out, report)
    }

    #[test]
    fn header_then_comment() {
        let out = run("001 - Jane - 1:00PM Jan 1, 2025\n00:00:10:00 - Fix the color");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].author, "Jane");
        assert_eq!(out[0].text, "Fix the color");
        assert!(!out[0].is_reply);
    }

    #[test]
    fn multi_line_comment_is_joined() {
        let out = run("001 - Jane - 1:00PM Jan 1, 2025\n00:00:10:00 - Fix the\ncolor in\nthis shot\n");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "Fix the color in this shot");
    }

    #[test]
    fn reply_block_inherits_timecode() {
        let text = "\
001 - Jane - 1:00PM Jan 1, 2025
00:00:10:00 - Fix the color
  John - 1:05PM Jan 1, 2025
  Agreed, it is
  too warm
  Mia - 1:07PM Jan 1, 2025
  Same here
00:00:20:00 - Next one
";
        let out = run(text);
        assert_eq!(out.len(), 4);
        assert_eq!(out[1].author, "John");
        assert_eq!(out[1].text, "Agreed, it is too warm");
        assert!(out[1].is_reply);
        assert_eq!(out[1].timecode.to_string(), "00:00:10:00");
        assert_eq!(out[2].author, "Mia");
        assert_eq!(out[3].timecode.to_string(), "00:00:20:00");
        assert!(!out[3].is_reply);
    }

    #[test]
    fn dedent_pushes_line_back_to_scanning() {
        let text = "\
001 - Jane - 1:00PM Jan 1, 2025
00:00:10:00 - First
  John - 1:05PM Jan 1, 2025
  Ok
002 - Mia - 2:00PM Jan 1, 2025
00:00:30:00 - Second
";
        let (out, report) = run_traced(text);
        assert_eq!(out.len(), 3);
        assert_eq!(out[2].author, "Mia");
        assert!(report.lines.iter().any(|l| l.class == LineClass::Pushback));
        assert!(report
            .transitions
            .iter()
            .any(|t| t.from == ParserState::InReply && t.to == ParserState::Scanning));
    }

    #[test]
    fn indented_text_without_header_gets_synthetic_author() {
        let out = run("001 - Jane - 1:00PM Jan 1, 2025\n00:00:10:00 - Fix the color\n  and the sky too\n");
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].author, "Jane (Continuation)");
        assert!(out[1].is_reply);
    }

    #[test]
    fn bracketed_timecodes_start_comments() {
        let out = run("001 - Jane - 1:00PM Jan 1, 2025\n[00:00:05:00 - 00:00:07:00] Sky looks flat\nCheck [00:00:09:12] again\n");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].timecode.to_string(), "00:00:05:00");
        assert_eq!(out[0].text, "Sky looks flat");
        assert_eq!(out[1].timecode.to_string(), "00:00:09:12");
        assert_eq!(out[1].text, "Check again");
    }

    #[test]
    fn invalid_timecode_line_is_dropped() {
        let (out, report) = run_traced("001 - Jane - 1:00PM Jan 1, 2025\n00:00:75:00 - Broken\n00:00:10:00 - Good one\n");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "Good one");
        assert_eq!(report.anomaly_count(AnomalyKind::InvalidTimecode), 1);
    }

    #[test]
    fn invalid_comment_start_inside_comment_is_reported_once() {
        let text = "001 - Jane - 1:00PM Jan 1, 2025\n00:00:10:00 - Good one\n00:00:75:00 - Broken\n00:00:20:00 - Next\n";
        let (out, report) = run_traced(text);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].text, "Next");
        assert_eq!(report.anomaly_count(AnomalyKind::InvalidTimecode), 1);
    }

    #[test]
    fn reply_under_discarded_comment_attaches_to_last_emitted() {
        let text = "\
001 - Jane - 1:00PM Jan 1, 2025
00:00:05:00 - Real note
00:00:10:00 - x
  John - 1:05PM Jan 1, 2025
  Agreed with that
";
        let out = run(text);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].author, "John");
        assert!(out[1].is_reply);
        assert_eq!(out[1].timecode.to_string(), "00:00:05:00");
    }

    #[test]
    fn reply_without_emitted_parent_is_orphaned() {
        let (out, report) = run_traced("001 - Jane - 1:00PM Jan 1, 2025\n00:00:10:00 - x\n  John - 1:05PM Jan 1, 2025\n  Agreed\n");
        assert!(out.is_empty());
        assert_eq!(report.anomaly_count(AnomalyKind::OrphanReply), 1);
    }

    #[test]
    fn timecode_mentioned_in_reply_stays_in_reply() {
        let text = "\
001 - Jane - 1:00PM Jan 1, 2025
00:00:10:00 - Fix the color
  John - 1:05PM Jan 1, 2025
  Agreed
  again at 00:00:12:00 too
00:00:20:00 - Next one
";
        let out = run(text);
        assert_eq!(out.len(), 3);
        assert_eq!(out[1].author, "John");
        assert!(out[1].is_reply);
        assert_eq!(out[1].text, "Agreed again at 00:00:12:00 too");
        assert_eq!(out[1].timecode.to_string(), "00:00:10:00");
        assert_eq!(out[2].text, "Next one");
        assert!(out.iter().all(|c| c.author != "Jane" || !c.text.contains("again")));
    }

    #[test]
    fn zero_and_noise_are_discarded() {
        let out = run("001 - Jane - 1:00PM Jan 1, 2025\n00:00:00:00 - At zero\n00:00:01:00 - x\n00:00:02:00 - Real\n");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "Real");
    }

    #[test]
    fn cap_stops_parsing() {
        let mut text = String::from("001 - Jane - 1:00PM Jan 1, 2025\n");
        for s in 1..=20 {
            text.push_str(&format!("00:00:{s:02}:00 - Note {s}\n"));
        }
        let (out, truncated) = LineMachine::new(FrameRateProfile::default(), 5, None).run(&text);
        assert_eq!(out.len(), 5);
        assert!(truncated);
    }

    #[test]
    fn frames_validated_against_profile() {
        let pal = FrameRateProfile::non_drop(FrameRate::Fps25);
        let text = "001 - Jane - 1:00PM Jan 1, 2025\n00:00:01:27 - Too many frames\n00:00:01:24 - Fine\n";
        let (out, _) = LineMachine::new(pal, 2000, None).run(text);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "Fine");
    }
}
