//! mosh - bitstream-level datamoshing
//!
//! Removes keyframes at scene cuts (bloom) and duplicates P-frames
//! (melt) without re-encoding, then bakes the result through an external
//! transcoder.

use clap::{Parser, Subcommand};
use mosh_core::MoshError;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

/// Exit codes beyond success: clap uses 2 for argument errors.
const EXIT_FAILURE: u8 = 1;
const EXIT_PREP_FAILED: u8 = 3;
const EXIT_NO_CUTS: u8 = 4;
const EXIT_PLAN_EMPTY: u8 = 5;
const EXIT_BAD_MELT_TARGET: u8 = 6;

/// mosh - controlled corruption for compressed video
#[derive(Parser, Debug)]
#[command(name = "mosh")]
#[command(about = "Datamosh video at the bitstream level (bloom, melt)", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Remove the keyframe after each detected scene cut
    Bloom {
        /// Source video file
        input: PathBuf,

        /// Output video file
        output: PathBuf,

        /// Scene-cut similarity threshold
        #[arg(long, default_value = "0.35")]
        threshold: f32,

        /// Act on at most this many cuts
        #[arg(long)]
        limit: Option<usize>,

        /// Skip cuts scoring below this
        #[arg(long)]
        min_score: Option<f32>,

        /// Requested GOP size for the prep transcode
        #[arg(long, default_value = "999")]
        max_gop: u32,

        /// Quality factor for the final bake transcode
        #[arg(long, default_value = "18")]
        bake_crf: u32,

        /// Drop removed frames instead of substituting the next payload
        #[arg(long)]
        no_preserve_frame_count: bool,

        /// Leave the AVI idx1 table out of the intermediate output
        #[arg(long)]
        no_rebuild_index: bool,

        /// Retain prep and pre-bake files on disk
        #[arg(long)]
        keep_intermediates: bool,
    },

    /// Duplicate P-frames so their motion re-applies repeatedly
    Melt {
        /// Source video file
        input: PathBuf,

        /// Output video file
        output: PathBuf,

        /// Frame indices to melt (decoding order)
        #[arg(long, value_delimiter = ',', required = true)]
        at: Vec<usize>,

        /// Copies appended after each melted frame
        #[arg(long)]
        count: usize,

        /// Requested GOP size for the prep transcode
        #[arg(long, default_value = "999")]
        max_gop: u32,

        /// Quality factor for the final bake transcode
        #[arg(long, default_value = "18")]
        bake_crf: u32,

        /// Retain prep and pre-bake files on disk
        #[arg(long)]
        keep_intermediates: bool,
    },

    /// List frame types without modifying anything
    Inspect {
        /// Video file (AVI or raw .h264)
        input: PathBuf,

        /// Output format (text, json)
        #[arg(short = 'F', long, default_value = "text")]
        format: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level.parse().unwrap_or(tracing::Level::WARN))
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Bloom {
            input,
            output,
            threshold,
            limit,
            min_score,
            max_gop,
            bake_crf,
            no_preserve_frame_count,
            no_rebuild_index,
            keep_intermediates,
        } => commands::bloom::run(commands::bloom::BloomArgs {
            input,
            output,
            threshold,
            limit,
            min_score,
            max_gop,
            bake_crf,
            preserve_frame_count: !no_preserve_frame_count,
            rebuild_index: !no_rebuild_index,
            keep_intermediates,
        }),
        Commands::Melt {
            input,
            output,
            at,
            count,
            max_gop,
            bake_crf,
            keep_intermediates,
        } => commands::melt::run(commands::melt::MeltArgs {
            input,
            output,
            at,
            count,
            max_gop,
            bake_crf,
            keep_intermediates,
        }),
        Commands::Inspect { input, format } => commands::inspect::run(&input, &format),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            let code = exit_code_for(&err);
            eprintln!("error: {:#}", anyhow::Error::new(err));
            ExitCode::from(code)
        }
    }
}

fn exit_code_for(err: &MoshError) -> u8 {
    if err.stage() == Some(mosh_core::Stage::Prep) {
        return EXIT_PREP_FAILED;
    }
    match err.cause() {
        MoshError::BadMeltTarget { .. } => EXIT_BAD_MELT_TARGET,
        _ => EXIT_FAILURE,
    }
}
