//! Pipeline orchestration: prep, detect, plan, execute, bake.
//!
//! A single `run` executes every stage sequentially on the caller's
//! thread. Between stages the coordinator reports progress, honors
//! cancellation, and wraps failures with the stage they came from.
//! Intermediate files live in a scoped workspace that is deleted on every
//! exit path unless the caller keeps it.

use crate::executor::{execute_plan, ExecutorConfig};
use crate::options::{Intent, MoshOptions};
use crate::planner::{plan_bloom, plan_combined, plan_melt};
use crate::scene::{PixelFrameSource, SceneDetector};
use crate::transcoder::Transcode;
use mosh_core::error::{MoshError, Result, Stage};
use mosh_core::PlanWarning;
use mosh_formats::open_container;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{info, warn};

/// Environment variable overriding the scratch directory.
pub const WORKDIR_ENV: &str = "MOSH_WORKDIR";

// Monotonic progress marks at stage boundaries.
const PREP_DONE: f32 = 0.35;
const DETECT_DONE: f32 = 0.55;
const PLAN_DONE: f32 = 0.6;
const EXECUTE_DONE: f32 = 0.8;
const BAKE_DONE: f32 = 1.0;

/// Cooperative cancellation flag, checked at stage boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Outcome of a full pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub output: PathBuf,
    pub frames_in: usize,
    pub frames_out: usize,
    pub cuts_detected: usize,
    pub ops_applied: usize,
    pub warnings: Vec<PlanWarning>,
}

type ProgressFn = Box<dyn Fn(f32, Stage)>;

/// The coordinator. Construction requires both external capabilities: a
/// transcoder and a pixel-frame source for scene detection.
pub struct Pipeline<T, S> {
    transcoder: T,
    frame_source: S,
    progress: Option<ProgressFn>,
    cancel: CancelToken,
}

impl<T: Transcode, S: PixelFrameSource> Pipeline<T, S> {
    pub fn new(transcoder: T, frame_source: S) -> Self {
        Self {
            transcoder,
            frame_source,
            progress: None,
            cancel: CancelToken::new(),
        }
    }

    /// Install a progress observer, called with a monotonic fraction and
    /// the current stage.
    pub fn with_progress(mut self, observer: impl Fn(f32, Stage) + 'static) -> Self {
        self.progress = Some(Box::new(observer));
        self
    }

    /// A token that cancels this pipeline at the next stage boundary.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn report(&self, fraction: f32, stage: Stage) {
        if let Some(progress) = &self.progress {
            progress(fraction, stage);
        }
    }

    fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(MoshError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run the full workflow: `source` through prep, detection, planning,
    /// execution, and bake into `output`.
    pub fn run(
        &self,
        source: &Path,
        output: &Path,
        intent: &Intent,
        options: &MoshOptions,
    ) -> Result<PipelineResult> {
        let workspace = Workspace::create(options.keep_intermediates)?;

        self.checkpoint()?;
        self.report(0.0, Stage::Prep);
        let prepped = workspace.file("prepped.avi");
        self.transcoder
            .prep(source, &prepped, options)
            .map_err(|e| e.in_stage(Stage::Prep))?;
        let (container, index) =
            open_container(&prepped).map_err(|e| e.in_stage(Stage::Prep))?;
        info!(frames = index.len(), "prep transcode complete");
        self.report(PREP_DONE, Stage::Prep);

        self.checkpoint()?;
        let cuts = if intent.needs_cuts() {
            let detector = SceneDetector::new(options.scene_threshold);
            let cuts = detector
                .detect_or_empty(&self.frame_source, &prepped, &index)
                .map_err(|e| e.in_stage(Stage::Detect))?;
            if cuts.is_empty() {
                warn!(
                    threshold = options.scene_threshold,
                    "no scene cuts at or above threshold"
                );
            }
            cuts
        } else {
            Vec::new()
        };
        let scores: Vec<(usize, f32)> = cuts
            .iter()
            .map(|cut| (cut.at_decoding_index, cut.score))
            .collect();
        let index = index.with_scene_scores(&scores);
        self.report(DETECT_DONE, Stage::Detect);

        self.checkpoint()?;
        let outcome = match intent {
            Intent::BloomAtCuts(params) => plan_bloom(&cuts, &index, params),
            Intent::MeltAt(targets) => plan_melt(targets, &index),
            Intent::Combined(params, targets) => plan_combined(&cuts, targets, &index, params),
        }
        .map_err(|e| e.in_stage(Stage::Plan))?;
        if outcome.plan.is_empty() {
            warn!("plan is empty; output will match the prepped stream");
        }
        self.report(PLAN_DONE, Stage::Plan);

        self.checkpoint()?;
        let moshed = workspace.file("moshed.avi");
        let config = ExecutorConfig {
            preserve_frame_count: options.preserve_frame_count,
            rebuild_index: options.rebuild_index,
        };
        let report = execute_plan(&container, &index, &outcome.plan, &config, &moshed)
            .map_err(|e| e.in_stage(Stage::Execute))?;
        self.report(EXECUTE_DONE, Stage::Execute);

        self.checkpoint()?;
        self.transcoder
            .bake(&moshed, output, options)
            .map_err(|e| e.in_stage(Stage::Bake))?;
        self.report(BAKE_DONE, Stage::Bake);

        workspace.finish();
        Ok(PipelineResult {
            output: output.to_path_buf(),
            frames_in: report.frames_in,
            frames_out: report.frames_out,
            cuts_detected: cuts.len(),
            ops_applied: outcome.plan.len(),
            warnings: outcome.warnings,
        })
    }
}

/// Scoped scratch directory for intermediate files. Dropping it deletes
/// everything; `finish` persists it when intermediates are kept.
struct Workspace {
    dir: TempDir,
    keep: bool,
}

impl Workspace {
    fn create(keep: bool) -> Result<Self> {
        let builder = {
            let mut b = tempfile::Builder::new();
            b.prefix("mosh-");
            b
        };
        let dir = match std::env::var_os(WORKDIR_ENV) {
            Some(base) => builder.tempdir_in(base),
            None => builder.tempdir(),
        }?;
        Ok(Self { dir, keep })
    }

    fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn finish(self) {
        if self.keep {
            let path = self.dir.into_path();
            info!(path = %path.display(), "intermediates kept");
        }
    }
}
