//! `msync timecode ...` handlers and frame-rate flag resolution

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde_json::json;
use tracing::debug;

use crate::cli::{AppContext, RateArgs, TcFromFramesArgs, TcPairArgs, TcValidateArgs, TimecodeCommand};
use crate::core::timecode::{FrameRate, FrameRateProfile, Timecode};
use crate::infra::config::{Config, TimecodeConfig};

/// `--fps`/`--drop-frame` over the config's `[timecode]` section
pub fn resolve_profile(rate: &RateArgs, config: &TimecodeConfig) -> Result<FrameRateProfile> {
    let profile = match &rate.fps {
        Some(label) => {
            let profile: FrameRateProfile = label
                .parse()
                .with_context(|| format!("Invalid --fps `{label}` (supported: {})", supported_rates()))?;
            if rate.drop_frame {
                FrameRateProfile::new(profile.rate(), true)?
            } else {
                profile
            }
        }
        None => {
            let base = config.profile()?;
            if rate.drop_frame {
                FrameRateProfile::new(base.rate(), true)?
            } else {
                base
            }
        }
    };
    debug!(%profile, "frame rate profile");
    Ok(profile)
}

pub fn run(command: TimecodeCommand, config: &Config, ctx: &AppContext) -> Result<()> {
    match command {
        TimecodeCommand::Validate(args) => validate(args, config, ctx),
        TimecodeCommand::Add(args) => add(args, config, ctx),
        TimecodeCommand::Duration(args) => duration(args, config, ctx),
        TimecodeCommand::Frames(args) => frames(args, config, ctx),
        TimecodeCommand::FromFrames(args) => from_frames(args, config, ctx),
    }
}

fn validate(args: TcValidateArgs, config: &Config, ctx: &AppContext) -> Result<()> {
    let profile = resolve_profile(&args.rate, &config.timecode)?;
    let check = Timecode::validate(&args.timecode, profile);

    if args.json {
        let output = json!({
            "input": args.timecode,
            "profile": profile,
            "valid": check.valid,
            "timecode": check.timecode,
            "error": check.error.as_ref().map(|e| e.to_string()),
            "violations": check.error.as_ref().map(|e| e.violated_fields()),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        match (&check.timecode, &check.error) {
            (Some(tc), _) => {
                let mark = if ctx.no_color { "valid".to_string() } else { "valid".green().to_string() };
                println!("{tc} {mark} at {profile}");
            }
            (None, Some(e)) => {
                let mark = if ctx.no_color { "invalid".to_string() } else { "invalid".red().to_string() };
                println!("{mark}: {e}");
            }
            (None, None) => {}
        }
    }

    // Invalid input is reported as an error so the exit code reflects it
    match check.error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn parse_pair(args: &TcPairArgs, config: &Config) -> Result<(Timecode, Timecode, FrameRateProfile)> {
    let profile = resolve_profile(&args.rate, &config.timecode)?;
    let first = Timecode::parse(&args.first, profile)?;
    let second = Timecode::parse(&args.second, profile)?;
    Ok((first, second, profile))
}

fn add(args: TcPairArgs, config: &Config, ctx: &AppContext) -> Result<()> {
    let (a, b, profile) = parse_pair(&args, config)?;
    let sum = a.add(&b)?;

    if args.json {
        let output = json!({
            "profile": profile,
            "result": sum.result,
            "frames": sum.result.to_frame_count(),
            "day_overflow": sum.day_overflow,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        if sum.day_overflow > 0 {
            println!("{} (+{} day)", sum.result, sum.day_overflow);
        } else {
            println!("{}", sum.result);
        }
    }
    Ok(())
}

fn duration(args: TcPairArgs, config: &Config, ctx: &AppContext) -> Result<()> {
    let (start, end, profile) = parse_pair(&args, config)?;
    let span = Timecode::duration(&start, &end)?;

    if args.json {
        let output = json!({
            "profile": profile,
            "duration": span.duration,
            "frames": span.frames,
            "crosses_midnight": span.crosses_midnight,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        let note = if span.crosses_midnight { " (crosses midnight)" } else { "" };
        println!("{} ({} frames){note}", span.duration, span.frames);
    }
    Ok(())
}

fn frames(args: TcValidateArgs, config: &Config, ctx: &AppContext) -> Result<()> {
    let profile = resolve_profile(&args.rate, &config.timecode)?;
    let tc = Timecode::parse(&args.timecode, profile)?;
    let count = tc.to_frame_count();

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "profile": profile, "timecode": tc, "frames": count }))?
        );
    } else if !ctx.quiet {
        println!("{count}");
    }
    Ok(())
}

fn from_frames(args: TcFromFramesArgs, config: &Config, ctx: &AppContext) -> Result<()> {
    let profile = resolve_profile(&args.rate, &config.timecode)?;
    let conv = Timecode::from_frame_count(args.frames, profile);

    if args.json {
        let output = json!({
            "profile": profile,
            "timecode": conv.timecode,
            "day_overflow": conv.day_overflow,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        println!("{}", conv.timecode);
    }
    Ok(())
}

/// Rates accepted by `--fps`, for help output and errors
pub fn supported_rates() -> String {
    FrameRate::ALL.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(fps: Option<&str>, drop_frame: bool) -> RateArgs {
        RateArgs { fps: fps.map(str::to_string), drop_frame }
    }

    #[test]
    fn flags_override_config() {
        let cfg = TimecodeConfig::default();
        assert_eq!(resolve_profile(&rate(None, false), &cfg).unwrap().to_string(), "29.97");
        assert_eq!(resolve_profile(&rate(None, true), &cfg).unwrap().to_string(), "29.97df");
        assert_eq!(resolve_profile(&rate(Some("25"), false), &cfg).unwrap().to_string(), "25");
        assert_eq!(resolve_profile(&rate(Some("59.94df"), false), &cfg).unwrap().to_string(), "59.94df");
        assert!(resolve_profile(&rate(Some("25"), true), &cfg).is_err());
        assert!(resolve_profile(&rate(Some("48"), false), &cfg).is_err());
    }

    #[test]
    fn rate_list() {
        assert!(supported_rates().starts_with("23.976, 24, 25"));
    }
}
