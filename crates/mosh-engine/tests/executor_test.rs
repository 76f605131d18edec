//! Executor properties over synthetic AVI and Annex-B streams.

use mosh_core::{ByteSource, EditOp, FrameIndex, FrameType, MoshError, MoshPlan};
use mosh_engine::executor::{execute_plan, ExecutorConfig};
use mosh_formats::{parse_container, Container, ContainerKind};
use mosh_test_data::{AnnexBBuilder, AviBuilder};
use std::path::PathBuf;

fn parse(bytes: Vec<u8>, kind: ContainerKind) -> (Container, FrameIndex) {
    parse_container(ByteSource::from_vec(bytes).unwrap(), kind).unwrap()
}

fn out_path(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

fn payload_of(bytes: &[u8], index: &FrameIndex, decoding_index: usize) -> Vec<u8> {
    let frame = index.get(decoding_index).unwrap();
    bytes[frame.byte_offset as usize..(frame.byte_offset + frame.byte_length as u64) as usize]
        .to_vec()
}

/// A 5-frame AVI: [I P P I P], distinguishable payloads, a mix of odd
/// (padded) and even chunk sizes.
fn sample_avi() -> Vec<u8> {
    AviBuilder::new()
        .frame(true, &[0x10; 12])
        .frame(false, &[0x21; 13])
        .frame(false, &[0x32; 12])
        .frame(true, &[0x43; 12])
        .frame(false, &[0x54; 12])
        .build()
}

#[test]
fn empty_plan_is_byte_identical_with_rebuilt_index() {
    let input = sample_avi();
    let (container, index) = parse(input.clone(), ContainerKind::Avi);
    let dir = tempfile::tempdir().unwrap();
    let out = out_path(&dir, "out.avi");

    execute_plan(
        &container,
        &index,
        &MoshPlan::default(),
        &ExecutorConfig::default(),
        &out,
    )
    .unwrap();

    assert_eq!(std::fs::read(&out).unwrap(), input);
}

#[test]
fn empty_plan_with_elided_index_drops_only_idx1() {
    let input = sample_avi();
    let (container, index) = parse(input.clone(), ContainerKind::Avi);
    let dir = tempfile::tempdir().unwrap();
    let out = out_path(&dir, "out.avi");

    let config = ExecutorConfig {
        rebuild_index: false,
        ..Default::default()
    };
    execute_plan(&container, &index, &MoshPlan::default(), &config, &out).unwrap();

    let written = std::fs::read(&out).unwrap();
    assert!(written.len() < input.len());
    let riff_size = u32::from_le_bytes(written[4..8].try_into().unwrap());
    assert_eq!(riff_size as usize, written.len() - 8);

    let (container, reparsed) = parse(written.clone(), ContainerKind::Avi);
    assert!(container.avi.unwrap().idx1.is_none());
    assert_eq!(reparsed.len(), index.len());
    for i in 0..index.len() {
        assert_eq!(payload_of(&written, &reparsed, i), payload_of(&input, &index, i));
    }
}

#[test]
fn duplication_round_trip() {
    let input = sample_avi();
    let (container, index) = parse(input.clone(), ContainerKind::Avi);
    let dir = tempfile::tempdir().unwrap();
    let out = out_path(&dir, "out.avi");

    let plan = MoshPlan::from_ops(vec![EditOp::Duplicate {
        decoding_index: 2,
        count: 3,
    }]);
    let report = execute_plan(&container, &index, &plan, &ExecutorConfig::default(), &out).unwrap();
    assert_eq!(report.frames_in, 5);
    assert_eq!(report.frames_out, 8);

    let written = std::fs::read(&out).unwrap();
    let (_, reparsed) = parse(written.clone(), ContainerKind::Avi);
    assert_eq!(reparsed.len(), 8);

    let original = payload_of(&input, &index, 2);
    for i in 2..6 {
        assert_eq!(payload_of(&written, &reparsed, i), original);
    }
    // The frame after the copies is the original frame 3.
    assert_eq!(
        payload_of(&written, &reparsed, 6),
        payload_of(&input, &index, 3)
    );
}

#[test]
fn duplication_grows_output_by_exact_chunk_size() {
    let input = sample_avi();
    let (container, index) = parse(input.clone(), ContainerKind::Avi);
    let dir = tempfile::tempdir().unwrap();

    let n = 4usize;
    let frame = index.get(1).unwrap();
    let chunk_bytes = frame.total_length();
    let idx1_entry_bytes = 16u64;

    let plan = MoshPlan::from_ops(vec![EditOp::Duplicate {
        decoding_index: 1,
        count: n,
    }]);
    let out = out_path(&dir, "out.avi");
    execute_plan(&container, &index, &plan, &ExecutorConfig::default(), &out).unwrap();

    let written = std::fs::read(&out).unwrap();
    assert_eq!(
        written.len() as u64,
        input.len() as u64 + n as u64 * (chunk_bytes + idx1_entry_bytes)
    );
}

#[test]
fn removal_without_preserve_shrinks_frame_count() {
    let input = sample_avi();
    let (container, index) = parse(input.clone(), ContainerKind::Avi);
    let dir = tempfile::tempdir().unwrap();
    let out = out_path(&dir, "out.avi");

    let plan = MoshPlan::from_ops(vec![
        EditOp::Remove { decoding_index: 1 },
        EditOp::Remove { decoding_index: 3 },
    ]);
    let config = ExecutorConfig {
        preserve_frame_count: false,
        ..Default::default()
    };
    let report = execute_plan(&container, &index, &plan, &config, &out).unwrap();
    assert_eq!(report.frames_out, 3);

    let written = std::fs::read(&out).unwrap();
    assert!(written.len() < input.len());
    let (_, reparsed) = parse(written.clone(), ContainerKind::Avi);
    assert_eq!(reparsed.len(), 3);
    assert_eq!(payload_of(&written, &reparsed, 0), payload_of(&input, &index, 0));
    assert_eq!(payload_of(&written, &reparsed, 1), payload_of(&input, &index, 2));
    assert_eq!(payload_of(&written, &reparsed, 2), payload_of(&input, &index, 4));

    // dwTotalFrames follows the new count.
    let (container, _) = parse(written.clone(), ContainerKind::Avi);
    let offset = container.avi.unwrap().total_frames_offset.unwrap() as usize;
    let total = u32::from_le_bytes(written[offset..offset + 4].try_into().unwrap());
    assert_eq!(total, 3);
}

#[test]
fn removal_with_preserve_substitutes_next_payload() {
    let input = sample_avi();
    let (container, index) = parse(input.clone(), ContainerKind::Avi);
    let dir = tempfile::tempdir().unwrap();
    let out = out_path(&dir, "out.avi");

    // Remove the keyframe at 3; its slot should carry frame 4's payload.
    let plan = MoshPlan::from_ops(vec![EditOp::Remove { decoding_index: 3 }]);
    let report =
        execute_plan(&container, &index, &plan, &ExecutorConfig::default(), &out).unwrap();
    assert_eq!(report.frames_out, 5);

    let written = std::fs::read(&out).unwrap();
    let (_, reparsed) = parse(written.clone(), ContainerKind::Avi);
    assert_eq!(reparsed.len(), 5);
    assert_eq!(
        payload_of(&written, &reparsed, 3),
        payload_of(&input, &index, 4)
    );
    // The substituted slot now classifies as P, not I.
    assert_eq!(reparsed.get(3).unwrap().frame_type, FrameType::P);
    // Frames before and after are untouched.
    assert_eq!(payload_of(&written, &reparsed, 2), payload_of(&input, &index, 2));
    assert_eq!(payload_of(&written, &reparsed, 4), payload_of(&input, &index, 4));
}

#[test]
fn removing_the_last_frame_substitutes_the_previous_payload() {
    let input = sample_avi();
    let (container, index) = parse(input.clone(), ContainerKind::Avi);
    let dir = tempfile::tempdir().unwrap();
    let out = out_path(&dir, "out.avi");

    let plan = MoshPlan::from_ops(vec![EditOp::Remove { decoding_index: 4 }]);
    execute_plan(&container, &index, &plan, &ExecutorConfig::default(), &out).unwrap();

    let written = std::fs::read(&out).unwrap();
    let (_, reparsed) = parse(written.clone(), ContainerKind::Avi);
    assert_eq!(reparsed.len(), 5);
    assert_eq!(
        payload_of(&written, &reparsed, 4),
        payload_of(&input, &index, 3)
    );
}

#[test]
fn removal_never_grows_the_output() {
    let input = sample_avi();
    let (container, index) = parse(input.clone(), ContainerKind::Avi);
    let dir = tempfile::tempdir().unwrap();

    for preserve in [false, true] {
        let out = out_path(&dir, if preserve { "p.avi" } else { "np.avi" });
        let plan = MoshPlan::from_ops(vec![EditOp::Remove { decoding_index: 3 }]);
        let config = ExecutorConfig {
            preserve_frame_count: preserve,
            ..Default::default()
        };
        execute_plan(&container, &index, &plan, &config, &out).unwrap();
        assert!(std::fs::read(&out).unwrap().len() <= input.len());
    }
}

#[test]
fn executor_rejects_remove_of_frame_zero() {
    let (container, index) = parse(sample_avi(), ContainerKind::Avi);
    let dir = tempfile::tempdir().unwrap();
    let out = out_path(&dir, "out.avi");

    let plan = MoshPlan::from_ops(vec![EditOp::Remove { decoding_index: 0 }]);
    let err = execute_plan(&container, &index, &plan, &ExecutorConfig::default(), &out)
        .unwrap_err();
    assert!(matches!(err, MoshError::PlanInvalid(_)));
    assert!(!out.exists());
}

#[test]
fn executor_rejects_out_of_range_targets() {
    let (container, index) = parse(sample_avi(), ContainerKind::Avi);
    let dir = tempfile::tempdir().unwrap();
    let out = out_path(&dir, "out.avi");

    let plan = MoshPlan::from_ops(vec![EditOp::Duplicate {
        decoding_index: 99,
        count: 1,
    }]);
    assert!(matches!(
        execute_plan(&container, &index, &plan, &ExecutorConfig::default(), &out),
        Err(MoshError::PlanInvalid(_))
    ));
}

#[test]
fn single_frame_file_round_trips() {
    let input = AviBuilder::new().frame(true, &[0x77; 16]).build();
    let (container, index) = parse(input.clone(), ContainerKind::Avi);
    let dir = tempfile::tempdir().unwrap();
    let out = out_path(&dir, "out.avi");

    execute_plan(
        &container,
        &index,
        &MoshPlan::default(),
        &ExecutorConfig::default(),
        &out,
    )
    .unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), input);
}

#[test]
fn replace_payload_rewrites_chunk_size() {
    let input = sample_avi();
    let (container, index) = parse(input.clone(), ContainerKind::Avi);
    let dir = tempfile::tempdir().unwrap();
    let out = out_path(&dir, "out.avi");

    let replacement = mosh_test_data::vop_payload(1, &[0x99; 21]);
    let plan = MoshPlan::from_ops(vec![EditOp::ReplacePayload {
        decoding_index: 2,
        payload: replacement.clone(),
    }]);
    execute_plan(&container, &index, &plan, &ExecutorConfig::default(), &out).unwrap();

    let written = std::fs::read(&out).unwrap();
    let (_, reparsed) = parse(written.clone(), ContainerKind::Avi);
    assert_eq!(reparsed.len(), 5);
    assert_eq!(payload_of(&written, &reparsed, 2), replacement);
    assert_eq!(
        reparsed.get(2).unwrap().byte_length as usize,
        replacement.len()
    );
}

#[test]
fn annexb_duplicate_and_remove() {
    let input = AnnexBBuilder::new()
        .parameter_sets()
        .idr_frame(1)
        .p_frame(2)
        .p_frame(3)
        .p_frame(4)
        .build();
    let (container, index) = parse(input.clone(), ContainerKind::AnnexB);
    assert_eq!(index.len(), 4);
    let dir = tempfile::tempdir().unwrap();
    let out = out_path(&dir, "out.h264");

    let plan = MoshPlan::from_ops(vec![
        EditOp::Duplicate {
            decoding_index: 1,
            count: 2,
        },
        // Raw streams have no duration metadata: removal skips even with
        // preserve_frame_count set.
        EditOp::Remove { decoding_index: 3 },
    ]);
    let report =
        execute_plan(&container, &index, &plan, &ExecutorConfig::default(), &out).unwrap();
    assert_eq!(report.frames_out, 5);

    let written = std::fs::read(&out).unwrap();
    let (_, reparsed) = parse(written.clone(), ContainerKind::AnnexB);
    assert_eq!(reparsed.len(), 5);

    let original = payload_of(&input, &index, 1);
    for i in 1..4 {
        assert_eq!(payload_of(&written, &reparsed, i), original);
    }
    assert_eq!(
        payload_of(&written, &reparsed, 4),
        payload_of(&input, &index, 2)
    );
}

#[test]
fn annexb_empty_plan_is_identity() {
    let input = AnnexBBuilder::new()
        .parameter_sets()
        .idr_frame(1)
        .p_frame(2)
        .build();
    let (container, index) = parse(input.clone(), ContainerKind::AnnexB);
    let dir = tempfile::tempdir().unwrap();
    let out = out_path(&dir, "out.h264");

    execute_plan(
        &container,
        &index,
        &MoshPlan::default(),
        &ExecutorConfig::default(),
        &out,
    )
    .unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), input);
}
