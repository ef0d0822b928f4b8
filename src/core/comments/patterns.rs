//! Line patterns and prioritised timecode extractors
//!
//! Extraction precedence, highest first:
//! 1. bracketed range `[TC - TC]` (start of the range wins)
//! 2. bracketed single `[TC]`
//! 3. timecode at line start
//! 4. timecode anywhere in the line
//!
//! Each tier only yields timecodes that pass range validation; an invalid
//! candidate falls through to the next tier.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;

use crate::core::timecode::{FrameRateProfile, Timecode};

/// Timecode-shaped token, `:` or `;` before frames
const TC: &str = r"\d{1,2}:\d{2}:\d{2}[:;]\d{2}";

static TIMECODE_ANY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?:^|[^\d:;])({TC})(?:$|[^\d:;])")).expect("timecode regex"));

static BARE_TIMECODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TC).expect("bare timecode regex"));

static BRACKET_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\[\s*({TC})\s*[-–—]\s*({TC})\s*\]")).expect("bracket range regex")
});

static BRACKET_SINGLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\[\s*({TC})\s*\]")).expect("bracket single regex"));

static LINE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^\s*({TC})(?:$|[^\d:;])")).expect("line start regex"));

/// `00:00:10:00 - text`
static COMMENT_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^({TC})\s*[-–—]\s*(.*)$")).expect("comment start regex")
});

/// `001 - Jane Doe - 06:56PM April 06, 2025`
static AUTHOR_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s+[-–—]\s+(.+?)\s+[-–—]\s+(.+?)\s*$").expect("author header regex")
});

/// Cheap whole-document probe for author headers
static AUTHOR_HEADER_ANYWHERE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*\d+\s+[-–—]\s+\S.*?\s+[-–—]\s+\S").expect("author header probe regex")
});

/// `John - 1:05PM Jan 1, 2025` or `John - 2 days ago`
static REPLY_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([^\d\s\-–—][^\-–—]*?)\s+[-–—]\s+((?:\d{1,2}:\d{2}\s*[AaPp][Mm]\b|\d+\s+\w+\s+ago\b).*)$",
    )
    .expect("reply header regex")
});

static LEADING_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s\-–—:|,]+").expect("leading punctuation regex"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Which syntax produced a timecode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimecodeSyntax {
    BracketedRange,
    BracketedSingle,
    LineStart,
    Anywhere,
}

type Extractor = fn(&str, FrameRateProfile) -> Option<Timecode>;

/// Extractors in precedence order
const EXTRACTORS: [(TimecodeSyntax, Extractor); 4] = [
    (TimecodeSyntax::BracketedRange, extract_bracketed_range),
    (TimecodeSyntax::BracketedSingle, extract_bracketed_single),
    (TimecodeSyntax::LineStart, extract_line_start),
    (TimecodeSyntax::Anywhere, extract_anywhere),
];

/// First valid timecode from the capture group of each match
fn first_valid(re: &Regex, group: usize, line: &str, profile: FrameRateProfile) -> Option<Timecode> {
    re.captures_iter(line)
        .filter_map(|caps| caps.get(group))
        .find_map(|m| Timecode::parse(m.as_str(), profile).ok())
}

pub fn extract_bracketed_range(line: &str, profile: FrameRateProfile) -> Option<Timecode> {
    first_valid(&BRACKET_RANGE, 1, line, profile)
}

pub fn extract_bracketed_single(line: &str, profile: FrameRateProfile) -> Option<Timecode> {
    first_valid(&BRACKET_SINGLE, 1, line, profile)
}

pub fn extract_line_start(line: &str, profile: FrameRateProfile) -> Option<Timecode> {
    first_valid(&LINE_START, 1, line, profile)
}

pub fn extract_anywhere(line: &str, profile: FrameRateProfile) -> Option<Timecode> {
    // Adjacent timecodes share a delimiter, so captures_iter can skip one
    let mut rest = line;
    while let Some(caps) = TIMECODE_ANY.captures(rest) {
        let m = caps.get(1)?;
        if let Ok(tc) = Timecode::parse(m.as_str(), profile) {
            return Some(tc);
        }
        rest = &rest[m.end()..];
    }
    None
}

/// Highest-priority valid timecode in the line and the syntax it came from
pub fn extract_timecode(line: &str, profile: FrameRateProfile) -> Option<(Timecode, TimecodeSyntax)> {
    EXTRACTORS
        .iter()
        .find_map(|(syntax, extract)| extract(line, profile).map(|tc| (tc, *syntax)))
}

/// True if the line holds any timecode-shaped token, valid or not
pub fn has_timecode_shape(line: &str) -> bool {
    TIMECODE_ANY.is_match(line)
}

/// True if the text holds an author-header-shaped line
pub fn has_author_header_shape(text: &str) -> bool {
    AUTHOR_HEADER_ANYWHERE.is_match(text)
}

/// Remove every recognised timecode syntax and tidy the remainder
pub fn strip_timecodes(line: &str) -> String {
    let without_ranges = BRACKET_RANGE.replace_all(line, " ");
    let without_singles = BRACKET_SINGLE.replace_all(&without_ranges, " ");
    let bare = BARE_TIMECODE.replace_all(&without_singles, " ");
    let tidy = LEADING_PUNCT.replace(&bare, "");
    WHITESPACE_RUN.replace_all(tidy.trim(), " ").into_owned()
}

/// Parsed author header
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorHeader {
    pub index: u32,
    pub name: String,
    pub timestamp: String,
    pub posted_at: Option<NaiveDateTime>,
}

pub fn match_author_header(line: &str) -> Option<AuthorHeader> {
    let caps = AUTHOR_HEADER.captures(line)?;
    let timestamp = caps[3].trim().to_string();
    // A timecode in the "timestamp" slot means this is not a header
    if has_timecode_shape(&timestamp) || has_timecode_shape(&caps[2]) {
        return None;
    }
    Some(AuthorHeader {
        index: caps[1].parse().ok()?,
        name: caps[2].trim().to_string(),
        posted_at: parse_posted_at(&timestamp),
        timestamp,
    })
}

/// Comment-start line: timecode at column 0 of the trimmed line, then `- text`
///
/// Returns the raw timecode token and the text; validation is the caller's.
pub fn match_comment_start(line: &str) -> Option<(&str, &str)> {
    let caps = COMMENT_START.captures(line)?;
    let tc = caps.get(1)?.as_str();
    let text = caps.get(2).map_or("", |m| m.as_str());
    Some((tc, text))
}

/// Reply header `Name - timestamp` carrying no timecode
pub fn match_reply_header(line: &str) -> Option<(String, Option<NaiveDateTime>)> {
    if has_timecode_shape(line) {
        return None;
    }
    let caps = REPLY_HEADER.captures(line)?;
    Some((caps[1].trim().to_string(), parse_posted_at(caps[2].trim())))
}

/// Export timestamps look like `06:56PM April 06, 2025`
fn parse_posted_at(timestamp: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%I:%M%p %B %d, %Y", "%I:%M %p %B %d, %Y", "%B %d, %Y %I:%M%p"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(timestamp, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timecode::FrameRate;

    fn p30() -> FrameRateProfile {
        FrameRateProfile::non_drop(FrameRate::Fps30)
    }

    #[test]
    fn precedence_prefers_bracketed_range() {
        let line = "00:00:05:00 see [00:00:10:00 - 00:00:12:00] and [00:00:20:00]";
        let (tc, syntax) = extract_timecode(line, p30()).unwrap();
        assert_eq!(tc.to_string(), "00:00:10:00");
        assert_eq!(syntax, TimecodeSyntax::BracketedRange);
    }

    #[test]
    fn precedence_single_over_line_start() {
        let (tc, syntax) = extract_timecode("00:00:05:00 see [00:00:20:00]", p30()).unwrap();
        assert_eq!(tc.to_string(), "00:00:20:00");
        assert_eq!(syntax, TimecodeSyntax::BracketedSingle);
    }

    #[test]
    fn invalid_candidate_falls_through() {
        // bracketed timecode is out of range; the bare one wins
        let (tc, syntax) = extract_timecode("note [00:00:75:00] at 00:00:03:10", p30()).unwrap();
        assert_eq!(tc.to_string(), "00:00:03:10");
        assert_eq!(syntax, TimecodeSyntax::Anywhere);

        assert!(extract_timecode("only 99:99:99:99 here", p30()).is_none());
    }

    #[test]
    fn strips_all_timecode_syntax() {
        assert_eq!(strip_timecodes("[00:00:10:00 - 00:00:12:00] Fix the sky"), "Fix the sky");
        assert_eq!(strip_timecodes("00:00:10:00 - Fix the color"), "Fix the color");
        assert_eq!(strip_timecodes("Trim here 00:00:10;02 please"), "Trim here please");
    }

    #[test]
    fn author_header() {
        let h = match_author_header("001 - Jane Doe - 06:56PM April 06, 2025").unwrap();
        assert_eq!(h.index, 1);
        assert_eq!(h.name, "Jane Doe");
        let posted = h.posted_at.unwrap();
        assert_eq!(posted.format("%Y-%m-%d %H:%M").to_string(), "2025-04-06 18:56");

        assert!(match_author_header("00:00:10:00 - Fix - it").is_none());
    }

    #[test]
    fn comment_start() {
        let (tc, text) = match_comment_start("00:00:10:00 - Fix the color").unwrap();
        assert_eq!(tc, "00:00:10:00");
        assert_eq!(text, "Fix the color");
        assert!(match_comment_start("Fix at 00:00:10:00").is_none());
    }

    #[test]
    fn reply_header() {
        let (name, _) = match_reply_header("John - 1:05PM Jan 1, 2025").unwrap();
        assert_eq!(name, "John");
        assert!(match_reply_header("Agreed").is_none());
        assert!(match_reply_header("Looks good - thanks").is_none());
        assert!(match_reply_header("00:00:10:00 - John").is_none());
    }

    #[test]
    fn document_probes() {
        assert!(has_timecode_shape("at 1:00:00;12 ok"));
        assert!(!has_timecode_shape("10:00 only"));
        assert!(has_author_header_shape("intro\n001 - Jane - 1:00PM Jan 1, 2025\n"));
        assert!(!has_author_header_shape("nothing to see here at all"));
    }
}
