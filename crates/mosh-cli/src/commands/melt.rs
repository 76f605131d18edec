//! Melt: duplicate P-frames.

use mosh_core::Result;
use mosh_engine::{CommandTranscoder, Intent, MeltTarget, MoshOptions, Pipeline, TranscoderFrameSource};
use std::path::PathBuf;
use tracing::info;

pub struct MeltArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub at: Vec<usize>,
    pub count: usize,
    pub max_gop: u32,
    pub bake_crf: u32,
    pub keep_intermediates: bool,
}

pub fn run(args: MeltArgs) -> Result<u8> {
    let options = MoshOptions {
        max_gop: args.max_gop,
        bake_crf: args.bake_crf,
        keep_intermediates: args.keep_intermediates,
        ..Default::default()
    };
    let targets: Vec<MeltTarget> = args
        .at
        .iter()
        .map(|&decoding_index| MeltTarget {
            decoding_index,
            count: args.count,
        })
        .collect();

    let pipeline = Pipeline::new(
        CommandTranscoder::from_env(),
        TranscoderFrameSource::from_env(),
    );
    let result = pipeline.run(&args.input, &args.output, &Intent::MeltAt(targets), &options)?;

    info!(
        targets = args.at.len(),
        frames_out = result.frames_out,
        "melt complete"
    );
    println!(
        "melted {} frame(s) x{} -> {}",
        args.at.len(),
        args.count,
        result.output.display()
    );
    Ok(0)
}
