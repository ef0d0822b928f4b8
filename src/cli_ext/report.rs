//! Human-readable tables for parse and plan results

use owo_colors::OwoColorize;
use tabled::{Table, Tabled};

use crate::cli::AppContext;
use crate::core::comments::{CommentRecord, GuardRejection, ParseOutput};
use crate::core::conflict::Severity;
use crate::core::import::ImportReport;
use crate::core::marker::truncate_name;
use crate::core::resolve::ResolutionStats;

/// Width cap for free text in table cells
const CELL_CHARS: usize = 60;

#[derive(Tabled)]
struct CommentRow {
    #[tabled(rename = "#")]
    index: usize,
    timecode: String,
    author: String,
    reply: String,
    text: String,
}

#[derive(Tabled)]
struct ConflictRow {
    candidate: String,
    at: String,
    kind: String,
    severity: String,
    existing: String,
    distance: String,
}

#[derive(Tabled)]
struct PlanRow {
    name: String,
    timecode: String,
    note: String,
}

fn paint_severity(severity: Severity, ctx: &AppContext) -> String {
    let label = format!("{severity:?}").to_lowercase();
    if ctx.no_color {
        return label;
    }
    match severity {
        Severity::High => label.red().bold().to_string(),
        Severity::Medium => label.yellow().to_string(),
        Severity::Low => label.dimmed().to_string(),
    }
}

fn rejection_message(rejection: GuardRejection) -> &'static str {
    match rejection {
        GuardRejection::Empty => "export is empty",
        GuardRejection::TooShort => "export is too short to hold a comment",
        GuardRejection::NoRecognisablePattern => "no timecodes or author headers found",
    }
}

pub fn comments_table(comments: &[CommentRecord]) -> String {
    let rows: Vec<CommentRow> = comments
        .iter()
        .enumerate()
        .map(|(i, c)| CommentRow {
            index: i + 1,
            timecode: c.timecode.to_string(),
            author: c.author.clone(),
            reply: if c.is_reply { "yes".into() } else { String::new() },
            text: truncate_name(&c.text, CELL_CHARS),
        })
        .collect();
    Table::new(rows).to_string()
}

pub fn print_parse(output: &ParseOutput, ctx: &AppContext) {
    if ctx.quiet {
        return;
    }

    if let Some(rejection) = output.rejected {
        println!("No comments: {}", rejection_message(rejection));
        return;
    }

    if output.comments.is_empty() {
        println!("No comments found.");
        return;
    }

    println!("{}", comments_table(&output.comments));
    let replies = output.comments.iter().filter(|c| c.is_reply).count();
    println!(
        "{} comment(s), {} repl{}",
        output.comments.len(),
        replies,
        if replies == 1 { "y" } else { "ies" }
    );
    if output.truncated {
        let note = "Stopped early: comment limit reached";
        if ctx.no_color {
            println!("{note}");
        } else {
            println!("{}", note.yellow());
        }
    }
}

pub fn stats_line(stats: &ResolutionStats) -> String {
    format!(
        "checked {} · conflicts {} · skipped {} · replaced {} · offset {}",
        stats.checked, stats.conflicts, stats.skipped, stats.replaced, stats.offset
    )
}

pub fn print_plan(report: &ImportReport, ctx: &AppContext) {
    if ctx.quiet {
        return;
    }

    if let Some(rejection) = report.rejected {
        println!("No comments: {}", rejection_message(rejection));
    }

    if !report.conflicted.is_empty() {
        let rows: Vec<ConflictRow> = report
            .conflicted
            .iter()
            .flat_map(|entry| {
                let candidate = &report.candidates[entry.candidate_index];
                entry.conflicts.iter().map(move |c| ConflictRow {
                    candidate: truncate_name(&candidate.name, CELL_CHARS),
                    at: candidate.timecode.to_string(),
                    kind: c.kind.to_string(),
                    severity: paint_severity(c.severity, ctx),
                    existing: format!("{} @ {}", c.existing.name, c.existing.start),
                    distance: c.distance_frames.map(|d| d.to_string()).unwrap_or_default(),
                })
            })
            .collect();
        println!("Conflicts:");
        println!("{}", Table::new(rows));
        println!();
    }

    let rows: Vec<PlanRow> = report
        .plan
        .markers
        .iter()
        .map(|m| PlanRow {
            name: truncate_name(&m.name, CELL_CHARS),
            timecode: m.timecode.to_string(),
            note: match &m.offset {
                Some(info) => format!("moved from {}", info.original_timecode),
                None => String::new(),
            },
        })
        .collect();

    if rows.is_empty() {
        println!("No markers to create.");
    } else {
        println!("Markers:");
        println!("{}", Table::new(rows));
    }

    println!("{}", stats_line(&report.stats));
    match report.created {
        Some(n) => println!("Created {n} marker(s)"),
        None => println!("Dry run: {} marker(s) planned, nothing written", report.plan.markers.len()),
    }
}
