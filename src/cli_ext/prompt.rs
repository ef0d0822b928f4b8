//! Terminal conflict decider
//!
//! Answers: `s`kip, `r`eplace, `o`ffset, `c`ancel. An upper-case letter (or a
//! trailing `!`) applies the choice to every remaining conflict. EOF cancels.

use std::io::{self, BufRead, Write};

use owo_colors::OwoColorize;
use tracing::warn;

use crate::core::resolve::{ConflictDecider, Decision, DecisionPrompt, ResolutionStrategy};

/// Reads decisions line by line from `input`, writes prompts to `output`
pub struct TerminalDecider<R, W> {
    input: R,
    output: W,
    color: bool,
}

impl TerminalDecider<io::StdinLock<'static>, io::Stderr> {
    /// Prompts on stderr so stdout stays machine-readable
    pub fn stdio(color: bool) -> Self {
        Self::new(io::stdin().lock(), io::stderr(), color)
    }
}

impl<R: BufRead, W: Write> TerminalDecider<R, W> {
    pub fn new(input: R, output: W, color: bool) -> Self {
        Self { input, output, color }
    }

    fn ask(&mut self, prompt: &DecisionPrompt<'_>) -> io::Result<Decision> {
        let header = format!("[{}/{}]", prompt.position, prompt.total);
        if self.color {
            writeln!(self.output, "{} {}", header.cyan().bold(), prompt.summary)?;
        } else {
            writeln!(self.output, "{header} {}", prompt.summary)?;
        }

        let hint = prompt
            .conflicts
            .iter()
            .flat_map(|c| c.kind.suggested_actions())
            .fold(Vec::new(), |mut acc, s| {
                if !acc.contains(s) {
                    acc.push(*s);
                }
                acc
            })
            .iter()
            .map(|s| s.tag())
            .collect::<Vec<_>>()
            .join("/");

        loop {
            write!(
                self.output,
                "  [s]kip [r]eplace [o]ffset [c]ancel (suggested: {hint}; capital = all) > "
            )?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(Decision::for_all(ResolutionStrategy::Cancel));
            }
            if let Some(decision) = parse_answer(line.trim()) {
                return Ok(decision);
            }
            writeln!(self.output, "  please answer s, r, o or c")?;
        }
    }
}

impl<R: BufRead, W: Write> ConflictDecider for TerminalDecider<R, W> {
    fn decide(&mut self, prompt: &DecisionPrompt<'_>) -> Decision {
        match self.ask(prompt) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(error = %e, "prompt failed, skipping remaining conflicts");
                Decision::for_all(ResolutionStrategy::Skip)
            }
        }
    }
}

/// `s`, `skip`, `S`, `skip!` and the like
pub fn parse_answer(answer: &str) -> Option<Decision> {
    let (word, bang) = match answer.strip_suffix('!') {
        Some(rest) => (rest.trim(), true),
        None => (answer, false),
    };
    let first = word.chars().next()?;
    let apply_to_all = bang || first.is_uppercase();

    let strategy = match word.to_lowercase().as_str() {
        "s" | "skip" => ResolutionStrategy::Skip,
        "r" | "replace" => ResolutionStrategy::Replace,
        "o" | "offset" => ResolutionStrategy::Offset,
        "c" | "cancel" => ResolutionStrategy::Cancel,
        _ => return None,
    };
    Some(Decision { strategy, apply_to_all })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::comments::CommentRecord;
    use crate::core::conflict::{ConflictSettings, detect_conflicts};
    use crate::core::marker::{ExistingMarker, Marker};
    use crate::core::resolve::ConflictResolver;
    use crate::core::timecode::{FrameRate, FrameRateProfile, Timecode};

    #[test]
    fn answers() {
        assert_eq!(parse_answer("s"), Some(Decision::once(ResolutionStrategy::Skip)));
        assert_eq!(parse_answer("R"), Some(Decision::for_all(ResolutionStrategy::Replace)));
        assert_eq!(parse_answer("offset!"), Some(Decision::for_all(ResolutionStrategy::Offset)));
        assert_eq!(parse_answer("cancel"), Some(Decision::once(ResolutionStrategy::Cancel)));
        assert_eq!(parse_answer(""), None);
        assert_eq!(parse_answer("x"), None);
    }

    #[test]
    fn scripted_session() {
        let p = FrameRateProfile::non_drop(FrameRate::Fps30);
        let tc = |s: &str| Timecode::parse(s, p).unwrap();
        let cand = |name: &str, at: &str| {
            let source = CommentRecord {
                author: "Jane".into(),
                timecode: tc(at),
                text: name.into(),
                is_reply: false,
                posted_at: None,
            };
            Marker::new(name, tc(at), source)
        };
        let report = detect_conflicts(
            vec![cand("A", "00:00:10:00"), cand("B", "00:00:20:00")],
            vec![ExistingMarker::new("A", tc("00:00:10:00")), ExistingMarker::new("B", tc("00:00:20:00"))],
            &ConflictSettings::default(),
        );

        let input = io::Cursor::new("what\no\ns\n");
        let mut out = Vec::new();
        let mut decider = TerminalDecider::new(input, &mut out, false);
        let outcome = ConflictResolver::new(ConflictSettings::default())
            .resolve(report, ResolutionStrategy::AskEach, Some(&mut decider))
            .unwrap();

        assert_eq!(outcome.stats.offset, 1);
        assert_eq!(outcome.stats.skipped, 1);
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("[1/2]"));
        assert!(shown.contains("please answer"));
    }

    #[test]
    fn eof_cancels() {
        let p = FrameRateProfile::non_drop(FrameRate::Fps30);
        let at = Timecode::parse("00:00:10:00", p).unwrap();
        let source = CommentRecord {
            author: "Jane".into(),
            timecode: at,
            text: "A".into(),
            is_reply: false,
            posted_at: None,
        };
        let report = detect_conflicts(
            vec![Marker::new("A", at, source)],
            vec![ExistingMarker::new("A", at)],
            &ConflictSettings::default(),
        );
        let mut decider = TerminalDecider::new(io::Cursor::new(""), Vec::new(), false);
        let outcome = ConflictResolver::new(ConflictSettings::default())
            .resolve(report, ResolutionStrategy::AskEach, Some(&mut decider))
            .unwrap();
        assert!(outcome.cancelled);
    }
}
