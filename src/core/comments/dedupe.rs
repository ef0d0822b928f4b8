//! Order-preserving comment deduplication
//!
//! Exports frequently repeat a comment (re-exports, copy/paste, the same note
//! under a short and a full author name). First occurrence wins:
//! - exact duplicates share `(timecode, text, author)` after normalisation
//! - author variations share `(timecode, text)` and one author's words are a
//!   prefix of the other's, within two words ("Baron" / "Baron Ryan")

use indexmap::IndexSet;
use tracing::debug;

use super::CommentRecord;

/// Normalised identity of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupeKey {
    pub timecode: String,
    pub text: String,
    pub author: String,
}

impl DedupeKey {
    pub fn of(record: &CommentRecord) -> Self {
        Self {
            timecode: record.timecode.to_string(),
            text: normalize_text(&record.text),
            author: normalize_author(&record.author),
        }
    }
}

/// Trim and case-fold
pub fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}

/// First whitespace-delimited token, case-folded, letters only
pub fn normalize_author(author: &str) -> String {
    author
        .split_whitespace()
        .next()
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Every word of the author, case-folded, letters only
fn author_words(author: &str) -> Vec<String> {
    author
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphabetic())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

/// One name is a word-for-word prefix of the other, at most two words apart
pub fn is_author_variation(a: &str, b: &str) -> bool {
    let (wa, wb) = (author_words(a), author_words(b));
    let (short, long) = if wa.len() <= wb.len() { (&wa, &wb) } else { (&wb, &wa) };
    long.len() - short.len() <= 2 && long.starts_with(short)
}

/// Drop exact and author-variation duplicates, keeping first occurrences
pub fn dedupe(records: Vec<CommentRecord>) -> Vec<CommentRecord> {
    let mut seen: IndexSet<DedupeKey> = IndexSet::with_capacity(records.len());
    let mut kept: Vec<CommentRecord> = Vec::with_capacity(records.len());
    let mut dropped = 0usize;

    for record in records {
        let key = DedupeKey::of(&record);
        if seen.contains(&key) {
            dropped += 1;
            continue;
        }

        let variation = kept.iter().any(|k| {
            k.timecode.same_label(&record.timecode)
                && normalize_text(&k.text) == key.text
                && is_author_variation(&k.author, &record.author)
        });
        if variation {
            dropped += 1;
            continue;
        }

        seen.insert(key);
        kept.push(record);
    }

    if dropped > 0 {
        debug!(dropped, kept = kept.len(), "duplicate comments removed");
    }
    kept
}
