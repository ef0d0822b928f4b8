use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};
use crate::core::comments::DEFAULT_MAX_COMMENTS;
use crate::core::conflict::{ConflictSettings, DEFAULT_NEAR_THRESHOLD_FRAMES, DEFAULT_OFFSET_FRAMES};
use crate::core::marker::{DEFAULT_MAX_NAME_LENGTH, MarkerNaming};
use crate::core::resolve::ResolutionStrategy;
use crate::core::timecode::{FrameRate, FrameRateProfile};

/// Config files probed in the working directory, first hit wins
pub const CONFIG_FILES: [&str; 4] = [
    "markersync.toml",
    "markersync.yaml",
    "markersync.json",
    ".markersync.toml",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Frame rate used when none is given on the command line
    pub timecode: TimecodeConfig,

    /// Comment export parsing
    pub parser: ParserConfig,

    /// Conflict detection and resolution
    pub conflict: ConflictConfig,

    /// Marker naming
    pub markers: MarkersConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimecodeConfig
{
    /// One of 23.976, 24, 25, 29.97, 30, 50, 59.94, 60
    pub frame_rate: String,
    pub drop_frame: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig
{
    pub diagnostics: bool,
    pub max_comments: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictConfig
{
    pub near_threshold_frames: u64,
    pub default_offset_frames: u64,
    pub enable_near_detection: bool,
    pub case_sensitive_names: bool,
    pub recheck_offsets: bool,
    pub policy: ResolutionStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkersConfig
{
    pub include_replies: bool,
    pub include_author: bool,
    pub max_name_length: usize,
}

impl Default for TimecodeConfig
{
    fn default() -> Self
    {
        Self { frame_rate: FrameRate::Fps29_97.to_string(), drop_frame: false }
    }
}

impl Default for ParserConfig
{
    fn default() -> Self
    {
        Self { diagnostics: false, max_comments: DEFAULT_MAX_COMMENTS }
    }
}

impl Default for ConflictConfig
{
    fn default() -> Self
    {
        Self {
            near_threshold_frames: DEFAULT_NEAR_THRESHOLD_FRAMES,
            default_offset_frames: DEFAULT_OFFSET_FRAMES,
            enable_near_detection: true,
            case_sensitive_names: false,
            recheck_offsets: false,
            policy: ResolutionStrategy::AskEach,
        }
    }
}

impl Default for MarkersConfig
{
    fn default() -> Self
    {
        Self {
            include_replies: true,
            include_author: true,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
        }
    }
}

impl TimecodeConfig
{
    pub fn profile(&self) -> Result<FrameRateProfile>
    {
        let rate: FrameRate = self
            .frame_rate
            .parse()
            .with_context(|| format!("Invalid timecode.frame_rate `{}`", self.frame_rate))?;
        FrameRateProfile::new(rate, self.drop_frame).context("Invalid timecode profile in config")
    }
}

impl ConflictConfig
{
    pub fn settings(&self) -> ConflictSettings
    {
        ConflictSettings {
            near_threshold_frames: self.near_threshold_frames,
            default_offset_frames: self.default_offset_frames,
            enable_near_detection: self.enable_near_detection,
            case_sensitive_names: self.case_sensitive_names,
            recheck_offsets: self.recheck_offsets,
        }
    }
}

impl MarkersConfig
{
    pub fn naming(&self) -> MarkerNaming
    {
        MarkerNaming { include_author: self.include_author, max_name_length: self.max_name_length }
    }
}

pub fn load_config() -> Result<Config>
{
    load_config_from(Path::new("."))
}

/// Load from the first config file in `dir`, then `MSYNC__SECTION__KEY` env vars
pub fn load_config_from(dir: &Path) -> Result<Config>
{
    let mut builder = config::Config::builder();

    for name in &CONFIG_FILES
    {
        let path = dir.join(name);
        if path.exists()
        {
            builder = builder.add_source(config::File::from(path));
            break;
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("MSYNC")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILES[0]);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    if ctx.dry_run
    {
        println!("Would create config file at {}", config_path.display());
        return Ok(());
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml()
    {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(text.contains("policy = \"ask-each\""));
        assert!(text.contains("frame_rate = \"29.97\""));
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, Config::default());
    }

    #[test]
    fn partial_file_keeps_defaults()
    {
        let dir = assert_fs::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("markersync.toml"),
            "[conflict]\nnear_threshold_frames = 5\npolicy = \"offset\"\n",
        )
        .unwrap();

        let cfg = load_config_from(dir.path()).unwrap();
        assert_eq!(cfg.conflict.near_threshold_frames, 5);
        assert_eq!(cfg.conflict.policy, ResolutionStrategy::Offset);
        assert_eq!(cfg.conflict.default_offset_frames, DEFAULT_OFFSET_FRAMES);
        assert_eq!(cfg.markers, MarkersConfig::default());
    }

    #[test]
    fn profile_from_config()
    {
        let tc = TimecodeConfig { frame_rate: "59.94".into(), drop_frame: true };
        assert_eq!(tc.profile().unwrap().to_string(), "59.94df");

        let bad = TimecodeConfig { frame_rate: "25".into(), drop_frame: true };
        assert!(bad.profile().is_err());
    }
}
