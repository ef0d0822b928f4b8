use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::resolve::ResolutionStrategy;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

#[derive(Parser)]
#[command(name = "msync")]
#[command(
    about = "Turn review-comment exports into frame-accurate, conflict-free timeline markers"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without writing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Debug logging on stderr (overrides MSYNC_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a comment export and print the records
    Parse(ParseArgs),

    /// Build markers, check them against the timeline and write the final set
    Plan(PlanArgs),

    /// Timecode arithmetic
    #[command(subcommand)]
    Timecode(TimecodeCommand),

    /// Initialize a markersync.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Frame-rate flags shared by every command that reads timecodes
#[derive(Debug, Clone, Args)]
pub struct RateArgs {
    /// Frame rate (23.976, 24, 25, 29.97, 30, 50, 59.94, 60); config default otherwise
    #[arg(long, value_name = "RATE")]
    pub fps: Option<String>,

    /// Use drop-frame counting (29.97 and 59.94 only)
    #[arg(long)]
    pub drop_frame: bool,
}

#[derive(Debug, Parser)]
pub struct ParseArgs {
    /// Comment export file
    pub export: PathBuf,

    #[command(flatten)]
    pub rate: RateArgs,

    /// Print the parse trace as JSON
    #[arg(long)]
    pub diagnostics: bool,

    /// Stop after this many comments
    #[arg(long)]
    pub max_comments: Option<usize>,

    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct PlanArgs {
    /// Comment export file
    pub export: PathBuf,

    /// Timeline position of media start (HH:MM:SS:FF)
    #[arg(long, value_name = "TC")]
    pub session_start: String,

    #[command(flatten)]
    pub rate: RateArgs,

    /// Existing timeline markers (JSON: [{"name": .., "start": "HH:MM:SS:FF"}])
    #[arg(long, value_name = "FILE")]
    pub markers: Option<PathBuf>,

    /// How to resolve conflicts with existing markers
    #[arg(long, value_enum)]
    pub policy: Option<ResolutionStrategy>,

    /// Frames within which two markers count as near each other
    #[arg(long, value_name = "FRAMES")]
    pub near_threshold: Option<u64>,

    /// Base shift for the offset policy
    #[arg(long, value_name = "FRAMES")]
    pub offset_frames: Option<u64>,

    /// Disable near-timecode detection
    #[arg(long)]
    pub no_near: bool,

    /// Compare marker names case-sensitively
    #[arg(long)]
    pub case_sensitive: bool,

    /// Re-check offset markers and shift again until clear
    #[arg(long)]
    pub recheck_offsets: bool,

    /// Only create markers for main comments
    #[arg(long)]
    pub no_replies: bool,

    /// Write the marker plan here
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Emit JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum TimecodeCommand {
    /// Check a timecode against a frame rate
    Validate(TcValidateArgs),

    /// Add two timecodes (wraps at 24h)
    Add(TcPairArgs),

    /// Duration from START to END (crosses midnight if END < START)
    Duration(TcPairArgs),

    /// Absolute frame count of a timecode
    Frames(TcValidateArgs),

    /// Timecode for an absolute frame count
    FromFrames(TcFromFramesArgs),
}

#[derive(Debug, Parser)]
pub struct TcValidateArgs {
    pub timecode: String,

    #[command(flatten)]
    pub rate: RateArgs,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct TcPairArgs {
    pub first: String,

    pub second: String,

    #[command(flatten)]
    pub rate: RateArgs,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct TcFromFramesArgs {
    pub frames: u64,

    #[command(flatten)]
    pub rate: RateArgs,

    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
