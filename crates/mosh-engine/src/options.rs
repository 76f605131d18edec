//! Pipeline configuration and intent.

use serde::{Deserialize, Serialize};

/// Full pipeline configuration. Every field has a serde default so
/// partial configs deserialize cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MoshOptions {
    /// Similarity threshold for cut detection.
    pub scene_threshold: f32,
    /// Requested GOP size for the prep transcode.
    pub max_gop: u32,
    /// When false, the prep transcode disables B-frames.
    pub allow_b_frames: bool,
    /// On Remove, substitute the neighboring frame's payload so the frame
    /// count (and duration metadata) is preserved.
    pub preserve_frame_count: bool,
    /// Regenerate the AVI idx1 table in the output; elide it otherwise.
    pub rebuild_index: bool,
    /// Quality factor for the final bake transcode.
    pub bake_crf: u32,
    /// Codec id for the final bake.
    pub bake_codec: String,
    /// Retain prep and pre-bake files on disk.
    pub keep_intermediates: bool,
}

impl Default for MoshOptions {
    fn default() -> Self {
        Self {
            scene_threshold: 0.35,
            max_gop: 999,
            allow_b_frames: false,
            preserve_frame_count: true,
            rebuild_index: true,
            bake_crf: 18,
            bake_codec: "h264".to_string(),
            keep_intermediates: false,
        }
    }
}

/// Bloom planning parameters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomParams {
    /// Act on at most this many cuts.
    pub limit: Option<usize>,
    /// Skip cuts scoring below this.
    pub min_score: Option<f32>,
}

/// One melt request: duplicate the frame at `decoding_index` `count`
/// times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeltTarget {
    pub decoding_index: usize,
    pub count: usize,
}

/// What the caller wants done.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Intent {
    /// Remove the I-frame after each detected scene cut.
    BloomAtCuts(BloomParams),
    /// Duplicate specific P-frames.
    MeltAt(Vec<MeltTarget>),
    /// Both.
    Combined(BloomParams, Vec<MeltTarget>),
}

impl Intent {
    /// Whether this intent requires scene detection.
    pub fn needs_cuts(&self) -> bool {
        matches!(self, Intent::BloomAtCuts(_) | Intent::Combined(..))
    }
}
