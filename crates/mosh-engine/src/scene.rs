//! Scene-cut detection over externally decoded thumbnails.
//!
//! The engine never decodes pixels itself; a [`PixelFrameSource`]
//! capability supplies 16x16 grayscale thumbnails in decoding order, and
//! the detector scores consecutive pairs by normalized sum of absolute
//! differences. Detection failures never kill a pipeline: the recovery
//! entry point degrades to an empty cut list with a warning.

use mosh_core::error::{MoshError, Result};
use mosh_core::FrameIndex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Thumbnail edge length.
pub const THUMB_DIM: usize = 16;
/// Bytes per grayscale thumbnail.
pub const THUMB_LEN: usize = THUMB_DIM * THUMB_DIM;

/// One decoded frame, reduced to a grayscale thumbnail.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub decoding_index: usize,
    /// Row-major grayscale samples, `THUMB_LEN` bytes.
    pub gray: Vec<u8>,
}

/// Capability the host provides for reading decoded frames.
///
/// Implementations may shell out to a transcoder that pipes raw frames,
/// or decode in-process; the detector does not care.
pub trait PixelFrameSource {
    /// Open a stream of thumbnails for the given container file, in
    /// decoding order.
    fn open(&self, path: &Path) -> Result<Box<dyn Iterator<Item = Result<Thumbnail>>>>;
}

/// A detected scene boundary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SceneCut {
    /// The first frame of the new scene.
    pub at_decoding_index: usize,
    /// Dissimilarity to the previous frame, 0.0 identical to 1.0 maximal.
    pub score: f32,
    /// Last intra frame at or before the cut.
    pub left_intra: Option<usize>,
    /// First intra frame at or after the cut.
    pub right_intra: Option<usize>,
    /// Set when the nearest intra frame is farther than the detector's
    /// `max_distance`; such cuts are low-value for moshing.
    pub far_from_intra: bool,
}

/// Normalized SAD between two thumbnails; 0.0 identical, 1.0 maximally
/// different.
pub fn thumbnail_distance(a: &[u8], b: &[u8]) -> f32 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }
    let sum: u64 = a[..len]
        .iter()
        .zip(&b[..len])
        .map(|(&x, &y)| u64::from(x.abs_diff(y)))
        .sum();
    sum as f32 / (255.0 * len as f32)
}

/// Consecutive-frame scene-cut detector.
#[derive(Debug, Clone, Copy)]
pub struct SceneDetector {
    /// Score at or above which a cut is emitted.
    pub threshold: f32,
    /// Cuts farther than this many frames from an intra frame are flagged
    /// `far_from_intra`.
    pub max_distance: usize,
}

impl Default for SceneDetector {
    fn default() -> Self {
        Self {
            threshold: 0.35,
            max_distance: 60,
        }
    }
}

impl SceneDetector {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    /// Detect cuts from a thumbnail stream.
    ///
    /// The first frame never generates a cut; consecutive cuts are all
    /// reported. Fails with `InsufficientFrames` below two frames and
    /// with `DecoderUnavailable` when a thumbnail violates the size
    /// contract.
    pub fn detect(
        &self,
        thumbnails: impl Iterator<Item = Result<Thumbnail>>,
        index: &FrameIndex,
    ) -> Result<Vec<SceneCut>> {
        let mut cuts = Vec::new();
        let mut prev: Option<Thumbnail> = None;
        let mut seen = 0usize;

        for thumbnail in thumbnails {
            let thumbnail = thumbnail?;
            if thumbnail.gray.len() != THUMB_LEN {
                return Err(MoshError::DecoderUnavailable(format!(
                    "thumbnail for frame {} is {} bytes, expected {THUMB_LEN}",
                    thumbnail.decoding_index,
                    thumbnail.gray.len()
                )));
            }
            seen += 1;

            if let Some(prev) = &prev {
                let score = thumbnail_distance(&prev.gray, &thumbnail.gray);
                if score >= self.threshold {
                    cuts.push(self.locate(thumbnail.decoding_index, score, index));
                }
            }
            prev = Some(thumbnail);
        }

        if seen < 2 {
            return Err(MoshError::InsufficientFrames { count: seen });
        }

        cuts.sort_by_key(|cut| cut.at_decoding_index);
        Ok(cuts)
    }

    /// Detection with the recovery contract: a missing decoder or a
    /// too-short stream yields an empty cut list and a warning, so the
    /// planner can fall back to intra-indexed heuristics.
    pub fn detect_or_empty(
        &self,
        source: &dyn PixelFrameSource,
        path: &Path,
        index: &FrameIndex,
    ) -> Result<Vec<SceneCut>> {
        let thumbnails = match source.open(path) {
            Ok(thumbnails) => thumbnails,
            Err(MoshError::DecoderUnavailable(reason)) => {
                warn!("scene detection skipped, decoder unavailable: {reason}");
                return Ok(Vec::new());
            }
            Err(other) => return Err(other),
        };

        match self.detect(thumbnails, index) {
            Ok(cuts) => Ok(cuts),
            Err(MoshError::DecoderUnavailable(reason)) => {
                warn!("scene detection skipped, decoder unavailable: {reason}");
                Ok(Vec::new())
            }
            Err(MoshError::InsufficientFrames { count }) => {
                warn!("scene detection skipped, only {count} decoded frame(s)");
                Ok(Vec::new())
            }
            Err(other) => Err(other),
        }
    }

    fn locate(&self, at: usize, score: f32, index: &FrameIndex) -> SceneCut {
        let left_intra = index.nearest_intra_at_or_before(at);
        let right_intra = index.nearest_intra_at_or_after(at);

        let distance = [left_intra, right_intra]
            .iter()
            .flatten()
            .map(|&i| at.abs_diff(i))
            .min();
        let far_from_intra = distance.map(|d| d > self.max_distance).unwrap_or(true);
        if far_from_intra {
            warn!(
                cut = at,
                "scene cut is more than {} frames from the nearest keyframe", self.max_distance
            );
        }

        SceneCut {
            at_decoding_index: at,
            score,
            left_intra,
            right_intra,
            far_from_intra,
        }
    }
}
