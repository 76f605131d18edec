//! mosh-engine: the datamosh engine
//!
//! Everything between a parsed container and a finished output file:
//!
//! - [`scene`]: scene-cut detection over externally decoded thumbnails
//! - [`planner`]: bloom/melt intent into a validated edit plan
//! - [`executor`]: plan application with bit-exact copy-range output
//! - [`transcoder`]: the external transcoder contract (prep/bake and the
//!   piped thumbnail source)
//! - [`pipeline`]: the prep → detect → plan → execute → bake coordinator
//! - [`options`]: run configuration and intent

pub mod executor;
pub mod options;
pub mod pipeline;
pub mod planner;
pub mod scene;
pub mod transcoder;

pub use executor::{execute_plan, ExecutionReport, ExecutorConfig};
pub use options::{BloomParams, Intent, MeltTarget, MoshOptions};
pub use pipeline::{CancelToken, Pipeline, PipelineResult, WORKDIR_ENV};
pub use planner::{plan_bloom, plan_combined, plan_melt, PlanOutcome};
pub use scene::{PixelFrameSource, SceneCut, SceneDetector, Thumbnail, THUMB_DIM, THUMB_LEN};
pub use transcoder::{
    bake_args, prep_args, thumbnail_args, CommandTranscoder, Transcode, TranscoderFrameSource,
    TRANSCODER_ENV,
};
