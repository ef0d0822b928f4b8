//! **markersync** - review-comment exports to frame-accurate timeline markers
//!
//! Parses loosely formatted comment exports, places each comment on the
//! session timeline with SMPTE timecode arithmetic (drop-frame aware), and
//! reconciles the result with markers already on the timeline.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Core engines - pure transforms, no I/O outside the timeline service seam
pub mod core {
    /// SMPTE timecode parsing, validation and frame arithmetic
    pub mod timecode;
    pub use timecode::{FrameRate, FrameRateProfile, Timecode, TimecodeError};

    /// Three-state comment export parser with dedupe and diagnostics
    pub mod comments;
    pub use comments::{CommentParser, CommentRecord, ParseOutput, parse_comments};

    /// Candidate and existing markers, naming
    pub mod marker;
    pub use marker::{ExistingMarker, Marker, MarkerNaming, build_markers};

    /// Conflict detection between candidates and existing markers
    pub mod conflict;
    pub use conflict::{Conflict, ConflictKind, ConflictSettings, DetectionReport, detect_conflicts};

    /// Skip / replace / offset / ask-each / cancel resolution
    pub mod resolve;
    pub use resolve::{ConflictDecider, ConflictResolver, Decision, ResolutionStrategy};

    /// End-to-end import pipeline and the timeline service seam
    pub mod import;
    pub use import::{ImportError, ImportRequest, TimelineService, run_import};
}

/// Infrastructure - configuration and file I/O
pub mod infra {
    /// Layered configuration (file + MSYNC__ env) with TOML init
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Lossy, memory-mapped export reading and JSON marker files
    pub mod io;
    pub use io::{read_export, read_existing_markers, write_json};
}

/// Command handlers and terminal output
pub mod cli_ext {
    pub mod parse_cmd;
    pub mod plan_cmd;
    /// Interactive conflict decider
    pub mod prompt;
    /// Tables for parse and plan results
    pub mod report;
    pub mod timecode_cmd;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use infra::{Config, load_config};

// Core types for external consumers
pub use core::{
    CommentRecord, ConflictResolver, FrameRateProfile, ImportError, Marker, ResolutionStrategy,
    Timecode, TimecodeError,
};
