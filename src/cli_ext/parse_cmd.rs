//! `msync parse` handler

use anyhow::Result;
use serde_json::json;
use tracing::{info, instrument};

use crate::cli::{AppContext, ParseArgs};
use crate::cli_ext::report;
use crate::cli_ext::timecode_cmd::resolve_profile;
use crate::core::comments::CommentParser;
use crate::infra::config::Config;
use crate::infra::io::read_export;

#[instrument(skip_all, fields(export = %args.export.display()))]
pub fn run(args: ParseArgs, config: &Config, ctx: &AppContext) -> Result<()> {
    let profile = resolve_profile(&args.rate, &config.timecode)?;
    let text = read_export(&args.export)?;

    let parser = CommentParser::new()
        .with_profile(profile)
        .with_diagnostics(args.diagnostics || config.parser.diagnostics)
        .with_max_comments(args.max_comments.unwrap_or(config.parser.max_comments));
    let output = parser.parse(&text);
    info!(comments = output.comments.len(), truncated = output.truncated, "parsed export");

    if args.json {
        let comments: Vec<_> = output
            .comments
            .iter()
            .map(|c| {
                json!({
                    "source_id": c.fingerprint(),
                    "author": c.author,
                    "timecode": c.timecode,
                    "text": c.text,
                    "is_reply": c.is_reply,
                    "posted_at": c.posted_at,
                })
            })
            .collect();
        let mut doc = json!({
            "profile": profile,
            "truncated": output.truncated,
            "rejected": output.rejected,
            "comments": comments,
        });
        if let Some(diag) = &output.diagnostics {
            doc["diagnostics"] = serde_json::to_value(diag)?;
        }
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    report::print_parse(&output, ctx);
    if let Some(diag) = &output.diagnostics {
        // Trace goes to stderr so the table stays pipeable
        eprintln!("{}", serde_json::to_string_pretty(diag)?);
    }
    Ok(())
}
