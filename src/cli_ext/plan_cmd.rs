//! `msync plan` handler: the full import against a JSON-backed timeline

use anyhow::{Context, Result};
use serde_json::json;
use tracing::instrument;

use crate::cli::{AppContext, PlanArgs};
use crate::cli_ext::prompt::TerminalDecider;
use crate::cli_ext::report;
use crate::cli_ext::timecode_cmd::resolve_profile;
use crate::core::comments::CommentParser;
use crate::core::conflict::ConflictSettings;
use crate::core::import::{ImportRequest, JsonMarkerStore, run_import};
use crate::core::resolve::{ConflictDecider, ResolutionStrategy};
use crate::core::timecode::Timecode;
use crate::infra::config::Config;
use crate::infra::io::read_export;

/// Command-line flags layered over `[conflict]`
pub fn conflict_settings(args: &PlanArgs, config: &Config) -> ConflictSettings {
    let mut settings = config.conflict.settings();
    if let Some(n) = args.near_threshold {
        settings.near_threshold_frames = n;
    }
    if let Some(n) = args.offset_frames {
        settings.default_offset_frames = n;
    }
    settings.enable_near_detection &= !args.no_near;
    settings.case_sensitive_names |= args.case_sensitive;
    settings.recheck_offsets |= args.recheck_offsets;
    settings
}

#[instrument(skip_all, fields(export = %args.export.display()))]
pub fn run(args: PlanArgs, config: &Config, ctx: &AppContext) -> Result<()> {
    let profile = resolve_profile(&args.rate, &config.timecode)?;
    let session_start = Timecode::parse(&args.session_start, profile)
        .with_context(|| format!("Invalid --session-start `{}`", args.session_start))?;
    let text = read_export(&args.export)?;

    let policy = args.policy.unwrap_or(config.conflict.policy);
    let request = ImportRequest {
        parser: CommentParser::new()
            .with_profile(profile)
            .with_diagnostics(false)
            .with_max_comments(config.parser.max_comments),
        session_start,
        naming: config.markers.naming(),
        include_replies: config.markers.include_replies && !args.no_replies,
        settings: conflict_settings(&args, config),
        policy,
        dry_run: ctx.dry_run,
    };

    let mut store = JsonMarkerStore::new(args.markers.clone(), args.out.clone(), profile);
    let mut terminal = TerminalDecider::stdio(!ctx.no_color);
    let decider: Option<&mut dyn ConflictDecider> = match policy {
        ResolutionStrategy::AskEach => Some(&mut terminal),
        _ => None,
    };

    // ImportError passes through untouched so main can map its exit code
    let report = run_import(&request, &text, &mut store, decider)?;

    if args.json {
        let doc = json!({
            "comments": report.comments,
            "truncated": report.truncated,
            "conflicts": report.conflicted,
            "skipped": report.skipped.iter().map(|m| json!({"name": m.name, "timecode": m.timecode})).collect::<Vec<_>>(),
            "stats": report.stats,
            "created": report.created,
            "plan": report.plan,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        report::print_plan(&report, ctx);
        if let (Some(path), Some(_)) = (&args.out, report.created)
            && !ctx.quiet
        {
            println!("Plan written to {}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn plan_args(argv: &[&str]) -> PlanArgs {
        match Cli::parse_from(argv).command {
            Commands::Plan(args) => args,
            _ => panic!("expected plan"),
        }
    }

    #[test]
    fn flags_override_config_settings() {
        let args = plan_args(&[
            "msync", "plan", "x.txt", "--session-start", "01:00:00:00", "--near-threshold", "4", "--no-near",
            "--recheck-offsets",
        ]);
        let s = conflict_settings(&args, &Config::default());
        assert_eq!(s.near_threshold_frames, 4);
        assert_eq!(s.default_offset_frames, 30);
        assert!(!s.enable_near_detection);
        assert!(s.recheck_offsets);
        assert!(!s.case_sensitive_names);
    }
}
