//! Full-pipeline scenarios with in-memory transcoder and decoder fakes.

use mosh_core::{ByteSource, FrameIndex, FrameType, MoshError, Result, Stage};
use mosh_engine::scene::{PixelFrameSource, Thumbnail, THUMB_LEN};
use mosh_engine::transcoder::Transcode;
use mosh_engine::{BloomParams, Intent, MeltTarget, MoshOptions, Pipeline};
use mosh_formats::{parse_container, ContainerKind};
use mosh_test_data::AviBuilder;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Stands in for the external transcoder: "prep" writes a canned AVI,
/// "bake" copies the moshed stream through.
struct FakeTranscoder {
    prepped: Vec<u8>,
}

impl Transcode for FakeTranscoder {
    fn prep(&self, _input: &Path, output: &Path, _options: &MoshOptions) -> Result<()> {
        std::fs::write(output, &self.prepped)?;
        Ok(())
    }

    fn bake(&self, input: &Path, output: &Path, _options: &MoshOptions) -> Result<()> {
        std::fs::copy(input, output)?;
        Ok(())
    }
}

/// A transcoder whose prep always fails.
struct BrokenTranscoder;

impl Transcode for BrokenTranscoder {
    fn prep(&self, _input: &Path, _output: &Path, _options: &MoshOptions) -> Result<()> {
        Err(MoshError::Io(std::io::Error::other("encoder exploded")))
    }

    fn bake(&self, _input: &Path, _output: &Path, _options: &MoshOptions) -> Result<()> {
        Ok(())
    }
}

/// Serves flat-gray thumbnails at the given levels.
struct FakePixels {
    levels: Vec<u8>,
}

impl PixelFrameSource for FakePixels {
    fn open(&self, _path: &Path) -> Result<Box<dyn Iterator<Item = Result<Thumbnail>>>> {
        let thumbs: Vec<Result<Thumbnail>> = self
            .levels
            .iter()
            .enumerate()
            .map(|(i, &level)| {
                Ok(Thumbnail {
                    decoding_index: i,
                    gray: vec![level; THUMB_LEN],
                })
            })
            .collect();
        Ok(Box::new(thumbs.into_iter()))
    }
}

/// A pixel source with no decoder behind it.
struct NoPixels;

impl PixelFrameSource for NoPixels {
    fn open(&self, _path: &Path) -> Result<Box<dyn Iterator<Item = Result<Thumbnail>>>> {
        Err(MoshError::DecoderUnavailable("no decoder in tests".to_string()))
    }
}

/// [I P P I P] with a content jump entering frame 3.
fn sample_avi() -> Vec<u8> {
    AviBuilder::new()
        .frame(true, &[0x10; 12])
        .frame(false, &[0x21; 12])
        .frame(false, &[0x32; 12])
        .frame(true, &[0x43; 12])
        .frame(false, &[0x54; 12])
        .build()
}

fn sample_levels() -> Vec<u8> {
    vec![10, 12, 11, 200, 201]
}

fn reparse(path: &Path) -> (Vec<u8>, FrameIndex) {
    let bytes = std::fs::read(path).unwrap();
    let (_, index) = parse_container(
        ByteSource::from_vec(bytes.clone()).unwrap(),
        ContainerKind::Avi,
    )
    .unwrap();
    (bytes, index)
}

fn payload_of(bytes: &[u8], index: &FrameIndex, i: usize) -> Vec<u8> {
    let frame = index.get(i).unwrap();
    bytes[frame.byte_offset as usize..(frame.byte_offset + frame.byte_length as u64) as usize]
        .to_vec()
}

#[test]
fn bloom_removes_the_keyframe_after_the_cut() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.avi");
    let pipeline = Pipeline::new(
        FakeTranscoder {
            prepped: sample_avi(),
        },
        FakePixels {
            levels: sample_levels(),
        },
    );

    let result = pipeline
        .run(
            Path::new("source.mp4"),
            &output,
            &Intent::BloomAtCuts(BloomParams::default()),
            &MoshOptions::default(),
        )
        .unwrap();

    assert_eq!(result.cuts_detected, 1);
    assert_eq!(result.ops_applied, 1);
    assert_eq!(result.frames_in, 5);
    assert_eq!(result.frames_out, 5); // preserve_frame_count default

    // The removed keyframe's slot now carries the following P payload.
    let (bytes, index) = reparse(&output);
    let prepped = sample_avi();
    let (_, prepped_index) = parse_container(
        ByteSource::from_vec(prepped.clone()).unwrap(),
        ContainerKind::Avi,
    )
    .unwrap();
    assert_eq!(
        payload_of(&bytes, &index, 3),
        payload_of(&prepped, &prepped_index, 4)
    );
    assert_eq!(index.get(0).unwrap().frame_type, FrameType::IIdr);
}

#[test]
fn impossible_threshold_runs_to_identity() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.avi");
    let pipeline = Pipeline::new(
        FakeTranscoder {
            prepped: sample_avi(),
        },
        FakePixels {
            levels: sample_levels(),
        },
    );

    let options = MoshOptions {
        scene_threshold: 1.01,
        ..Default::default()
    };
    let result = pipeline
        .run(
            Path::new("source.mp4"),
            &output,
            &Intent::BloomAtCuts(BloomParams::default()),
            &options,
        )
        .unwrap();

    assert_eq!(result.cuts_detected, 0);
    assert_eq!(result.ops_applied, 0);
    assert!(result.warnings.is_empty());
    // Empty plan + fake bake copy: the output is the prepped stream.
    assert_eq!(std::fs::read(&output).unwrap(), sample_avi());
}

#[test]
fn melt_duplicates_the_target() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.avi");
    let pipeline = Pipeline::new(
        FakeTranscoder {
            prepped: sample_avi(),
        },
        NoPixels,
    );

    let result = pipeline
        .run(
            Path::new("source.mp4"),
            &output,
            &Intent::MeltAt(vec![MeltTarget {
                decoding_index: 2,
                count: 5,
            }]),
            &MoshOptions::default(),
        )
        .unwrap();

    assert_eq!(result.frames_out, 10);

    let (bytes, index) = reparse(&output);
    assert_eq!(index.len(), 10);
    let melted = payload_of(&bytes, &index, 2);
    for i in 2..8 {
        assert_eq!(payload_of(&bytes, &index, i), melted);
    }
    // Keyframes survive.
    assert!(index.intra_count() >= 2);
}

#[test]
fn melt_on_a_keyframe_fails_in_the_plan_stage() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.avi");
    let pipeline = Pipeline::new(
        FakeTranscoder {
            prepped: sample_avi(),
        },
        NoPixels,
    );

    let err = pipeline
        .run(
            Path::new("source.mp4"),
            &output,
            &Intent::MeltAt(vec![MeltTarget {
                decoding_index: 3,
                count: 3,
            }]),
            &MoshOptions::default(),
        )
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Plan));
    assert!(matches!(
        err.cause(),
        MoshError::BadMeltTarget { index: 3, .. }
    ));
    assert!(!output.exists());
}

#[test]
fn missing_decoder_degrades_to_no_cuts() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.avi");
    let pipeline = Pipeline::new(
        FakeTranscoder {
            prepped: sample_avi(),
        },
        NoPixels,
    );

    let result = pipeline
        .run(
            Path::new("source.mp4"),
            &output,
            &Intent::BloomAtCuts(BloomParams::default()),
            &MoshOptions::default(),
        )
        .unwrap();

    assert_eq!(result.cuts_detected, 0);
    assert_eq!(result.ops_applied, 0);
    assert!(output.exists());
}

#[test]
fn prep_failure_carries_the_stage() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.avi");
    let pipeline = Pipeline::new(BrokenTranscoder, NoPixels);

    let err = pipeline
        .run(
            Path::new("source.mp4"),
            &output,
            &Intent::MeltAt(vec![]),
            &MoshOptions::default(),
        )
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Prep));
    assert!(!output.exists());
}

#[test]
fn cancellation_is_honored_at_stage_boundaries() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.avi");
    let pipeline = Pipeline::new(
        FakeTranscoder {
            prepped: sample_avi(),
        },
        NoPixels,
    );

    pipeline.cancel_token().cancel();
    let err = pipeline
        .run(
            Path::new("source.mp4"),
            &output,
            &Intent::MeltAt(vec![]),
            &MoshOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, MoshError::Cancelled));
    assert!(!output.exists());
}

#[test]
fn progress_is_monotonic_and_finishes_at_one() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.avi");
    let seen: Rc<RefCell<Vec<(f32, Stage)>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);

    let pipeline = Pipeline::new(
        FakeTranscoder {
            prepped: sample_avi(),
        },
        FakePixels {
            levels: sample_levels(),
        },
    )
    .with_progress(move |fraction, stage| sink.borrow_mut().push((fraction, stage)));

    pipeline
        .run(
            Path::new("source.mp4"),
            &output,
            &Intent::BloomAtCuts(BloomParams::default()),
            &MoshOptions::default(),
        )
        .unwrap();

    let seen = seen.borrow();
    assert!(!seen.is_empty());
    assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
    assert_eq!(seen.last().unwrap().0, 1.0);
    assert_eq!(seen.last().unwrap().1, Stage::Bake);
    assert_eq!(seen.first().unwrap().1, Stage::Prep);
}

#[test]
fn keep_intermediates_persists_the_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    std::fs::create_dir(&work).unwrap();
    std::env::set_var(mosh_engine::WORKDIR_ENV, &work);

    let output = dir.path().join("out.avi");
    let pipeline = Pipeline::new(
        FakeTranscoder {
            prepped: sample_avi(),
        },
        NoPixels,
    );
    let options = MoshOptions {
        keep_intermediates: true,
        ..Default::default()
    };
    pipeline
        .run(
            Path::new("source.mp4"),
            &output,
            &Intent::MeltAt(vec![]),
            &options,
        )
        .unwrap();
    std::env::remove_var(mosh_engine::WORKDIR_ENV);

    let kept: Vec<_> = std::fs::read_dir(&work).unwrap().flatten().collect();
    assert_eq!(kept.len(), 1);
    assert!(kept[0].path().join("prepped.avi").exists());
    assert!(kept[0].path().join("moshed.avi").exists());
}
