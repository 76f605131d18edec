//! Bloom: remove keyframes at scene cuts.

use mosh_core::Result;
use mosh_engine::{
    BloomParams, CommandTranscoder, Intent, MoshOptions, Pipeline, TranscoderFrameSource,
};
use std::path::PathBuf;
use tracing::info;

pub struct BloomArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub threshold: f32,
    pub limit: Option<usize>,
    pub min_score: Option<f32>,
    pub max_gop: u32,
    pub bake_crf: u32,
    pub preserve_frame_count: bool,
    pub rebuild_index: bool,
    pub keep_intermediates: bool,
}

pub fn run(args: BloomArgs) -> Result<u8> {
    let options = MoshOptions {
        scene_threshold: args.threshold,
        max_gop: args.max_gop,
        bake_crf: args.bake_crf,
        preserve_frame_count: args.preserve_frame_count,
        rebuild_index: args.rebuild_index,
        keep_intermediates: args.keep_intermediates,
        ..Default::default()
    };
    let intent = Intent::BloomAtCuts(BloomParams {
        limit: args.limit,
        min_score: args.min_score,
    });

    let pipeline = Pipeline::new(
        CommandTranscoder::from_env(),
        TranscoderFrameSource::from_env(),
    );
    let result = pipeline.run(&args.input, &args.output, &intent, &options)?;

    if result.cuts_detected == 0 {
        eprintln!("no scene cuts found at or above threshold {}", args.threshold);
        return Ok(crate::EXIT_NO_CUTS);
    }
    if result.ops_applied == 0 {
        eprintln!("no usable keyframes behind the detected cuts; nothing to bloom");
        return Ok(crate::EXIT_PLAN_EMPTY);
    }

    info!(
        cuts = result.cuts_detected,
        ops = result.ops_applied,
        "bloom complete"
    );
    println!(
        "bloomed {} of {} cut(s) -> {}",
        result.ops_applied,
        result.cuts_detected,
        result.output.display()
    );
    Ok(0)
}
