//! End-to-end import: export text → markers on the timeline
//!
//! Pipeline:
//! 1. parse the export into comment records
//! 2. build candidates at `session_start + comment.timecode`
//! 3. list existing markers from the [`TimelineService`]
//! 4. detect and resolve conflicts
//! 5. hand the final set to the service (skipped on dry runs)
//!
//! The service is the only I/O boundary; everything before step 5 is pure.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use crate::core::comments::{CommentParser, GuardRejection};
use crate::core::conflict::{CandidateConflicts, ConflictSettings, detect_conflicts};
use crate::core::marker::{ExistingMarker, Marker, MarkerNaming, OffsetInfo, build_markers};
use crate::core::resolve::{
    ConflictDecider, ConflictResolver, Replacement, ResolutionStats, ResolutionStrategy,
};
use crate::core::timecode::{FrameRateProfile, Timecode, TimecodeError};
use crate::infra::io;

/// Version tag written into every plan document
pub const PLAN_SCHEMA_VERSION: &str = "1";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Timecode(#[from] TimecodeError),

    #[error("import cancelled during conflict resolution ({stats})")]
    Cancelled { stats: ResolutionStats },

    #[error("timeline service failed: {0}")]
    Service(String),
}

impl ImportError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            ImportError::Cancelled { .. } => 2,
            ImportError::Timecode(_) => 3,
            ImportError::Service(_) => 4,
        }
    }
}

/// The timeline application, reduced to what an import needs
pub trait TimelineService {
    fn list_markers(&mut self) -> Result<Vec<ExistingMarker>, ImportError>;

    /// Create every marker in the plan; returns how many were created
    fn create_markers(&mut self, plan: &MarkerPlan) -> Result<usize, ImportError>;
}

/// Marker as handed to the creator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedMarker {
    pub name: String,
    pub timecode: Timecode,
    /// Fingerprint of the source comment
    pub source_id: String,
    pub author: String,
    pub comment_timecode: Timecode,
    pub is_reply: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<OffsetInfo>,
}

impl From<&Marker> for PlannedMarker {
    fn from(marker: &Marker) -> Self {
        Self {
            name: marker.name.clone(),
            timecode: marker.timecode,
            source_id: marker.source.fingerprint(),
            author: marker.source.author.clone(),
            comment_timecode: marker.source.timecode,
            is_reply: marker.source.is_reply,
            offset: marker.offset.clone(),
        }
    }
}

/// Serialisable creation set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerPlan {
    pub schema_version: &'static str,
    pub profile: FrameRateProfile,
    pub session_start: Timecode,
    pub markers: Vec<PlannedMarker>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replacements: Vec<Replacement>,
}

/// Everything an import needs besides the export text
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub parser: CommentParser,
    pub session_start: Timecode,
    pub naming: MarkerNaming,
    pub include_replies: bool,
    pub settings: ConflictSettings,
    pub policy: ResolutionStrategy,
    pub dry_run: bool,
}

impl ImportRequest {
    pub fn new(session_start: Timecode) -> Self {
        Self {
            parser: CommentParser::new().with_profile(session_start.profile()),
            session_start,
            naming: MarkerNaming::default(),
            include_replies: true,
            settings: ConflictSettings::default(),
            policy: ResolutionStrategy::Skip,
            dry_run: false,
        }
    }
}

/// What an import did
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub comments: usize,
    pub truncated: bool,
    pub rejected: Option<GuardRejection>,
    pub candidates: Vec<Marker>,
    pub conflicted: Vec<CandidateConflicts>,
    pub skipped: Vec<Marker>,
    pub plan: MarkerPlan,
    pub stats: ResolutionStats,
    /// `None` on dry runs
    pub created: Option<usize>,
}

/// Run the whole pipeline against a timeline service
#[instrument(skip_all, fields(policy = %request.policy, dry_run = request.dry_run))]
pub fn run_import(
    request: &ImportRequest,
    export: &str,
    service: &mut dyn TimelineService,
    decider: Option<&mut dyn ConflictDecider>,
) -> Result<ImportReport, ImportError> {
    let parsed = request.parser.parse(export);
    let candidates = build_markers(
        &parsed.comments,
        &request.session_start,
        &request.naming,
        request.include_replies,
    )?;

    let existing = service.list_markers()?;
    let detection = detect_conflicts(candidates.clone(), existing, &request.settings);
    let conflicted = detection.conflicted.clone();

    let mut resolver = ConflictResolver::new(request.settings.clone());
    let outcome = resolver.resolve(detection, request.policy, decider)?;
    if outcome.cancelled {
        return Err(ImportError::Cancelled {
            stats: outcome.stats,
        });
    }

    let plan = MarkerPlan {
        schema_version: PLAN_SCHEMA_VERSION,
        profile: request.session_start.profile(),
        session_start: request.session_start,
        markers: outcome.markers.iter().map(PlannedMarker::from).collect(),
        replacements: outcome.replacements.clone(),
    };

    let created = if request.dry_run {
        None
    } else {
        Some(service.create_markers(&plan)?)
    };

    info!(
        comments = parsed.comments.len(),
        planned = plan.markers.len(),
        created = ?created,
        "import finished"
    );

    Ok(ImportReport {
        comments: parsed.comments.len(),
        truncated: parsed.truncated,
        rejected: parsed.rejected,
        candidates,
        conflicted,
        skipped: outcome.skipped,
        plan,
        stats: outcome.stats,
        created,
    })
}

/// Timeline stand-in backed by JSON files
///
/// Existing markers come from `[{"name": ..., "start": "HH:MM:SS:FF"}]`; the
/// plan is written to `output` when set and kept in memory either way.
#[derive(Debug, Clone)]
pub struct JsonMarkerStore {
    existing: Option<PathBuf>,
    output: Option<PathBuf>,
    profile: FrameRateProfile,
    written: Option<MarkerPlan>,
}

impl JsonMarkerStore {
    pub fn new(existing: Option<PathBuf>, output: Option<PathBuf>, profile: FrameRateProfile) -> Self {
        Self {
            existing,
            output,
            profile,
            written: None,
        }
    }

    /// Last plan handed to [`TimelineService::create_markers`]
    pub fn written(&self) -> Option<&MarkerPlan> {
        self.written.as_ref()
    }
}

impl TimelineService for JsonMarkerStore {
    fn list_markers(&mut self) -> Result<Vec<ExistingMarker>, ImportError> {
        let Some(path) = &self.existing else {
            return Ok(Vec::new());
        };
        io::read_existing_markers(path, self.profile)
            .map_err(|e| ImportError::Service(format!("{e:#}")))
    }

    fn create_markers(&mut self, plan: &MarkerPlan) -> Result<usize, ImportError> {
        if let Some(path) = &self.output {
            io::write_json(path, plan).map_err(|e| ImportError::Service(format!("{e:#}")))?;
        }
        self.written = Some(plan.clone());
        Ok(plan.markers.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timecode::FrameRate;

    const EXPORT: &str = "\
001 - Jane - 1:00PM Jan 1, 2025
00:00:10:00 - Fix the color
  John - 1:05PM Jan 1, 2025
  Agreed
00:00:20:00 - Music swells
";

    /// In-memory timeline
    #[derive(Default)]
    struct MemoryTimeline {
        existing: Vec<ExistingMarker>,
        created: Vec<PlannedMarker>,
        fail: bool,
    }

    impl TimelineService for MemoryTimeline {
        fn list_markers(&mut self) -> Result<Vec<ExistingMarker>, ImportError> {
            if self.fail {
                return Err(ImportError::Service("offline".into()));
            }
            Ok(self.existing.clone())
        }

        fn create_markers(&mut self, plan: &MarkerPlan) -> Result<usize, ImportError> {
            self.created.extend(plan.markers.iter().cloned());
            Ok(plan.markers.len())
        }
    }

    fn start() -> Timecode {
        Timecode::parse("01:00:00:00", FrameRateProfile::non_drop(FrameRate::Fps30)).unwrap()
    }

    #[test]
    fn creates_all_markers_without_conflicts() {
        let mut timeline = MemoryTimeline::default();
        let report = run_import(&ImportRequest::new(start()), EXPORT, &mut timeline, None).unwrap();
        assert_eq!(report.comments, 3);
        assert_eq!(report.created, Some(3));
        assert_eq!(timeline.created[0].timecode.to_string(), "01:00:10:00");
        assert_eq!(timeline.created[1].author, "John");
        assert!(timeline.created[1].is_reply);
    }

    #[test]
    fn dry_run_creates_nothing() {
        let mut timeline = MemoryTimeline::default();
        let request = ImportRequest {
            dry_run: true,
            ..ImportRequest::new(start())
        };
        let report = run_import(&request, EXPORT, &mut timeline, None).unwrap();
        assert_eq!(report.created, None);
        assert_eq!(report.plan.markers.len(), 3);
        assert!(timeline.created.is_empty());
    }

    #[test]
    fn cancel_maps_to_exit_code_two() {
        let at = Timecode::parse("01:00:10:00", start().profile()).unwrap();
        let mut timeline = MemoryTimeline {
            existing: vec![ExistingMarker::new("Jane: Fix the color", at)],
            ..MemoryTimeline::default()
        };
        let request = ImportRequest {
            policy: ResolutionStrategy::Cancel,
            ..ImportRequest::new(start())
        };
        let err = run_import(&request, EXPORT, &mut timeline, None).unwrap_err();
        assert!(matches!(err, ImportError::Cancelled { .. }));
        assert_eq!(err.exit_code(), 2);
        assert!(timeline.created.is_empty());
    }

    #[test]
    fn service_failure_surfaces() {
        let mut timeline = MemoryTimeline {
            fail: true,
            ..MemoryTimeline::default()
        };
        let err = run_import(&ImportRequest::new(start()), EXPORT, &mut timeline, None).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn rejected_export_is_empty_not_error() {
        let mut timeline = MemoryTimeline::default();
        let report = run_import(&ImportRequest::new(start()), "", &mut timeline, None).unwrap();
        assert_eq!(report.rejected, Some(GuardRejection::Empty));
        assert_eq!(report.created, Some(0));
    }
}
