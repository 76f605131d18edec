//! Plan execution: rewriting the bitstream.
//!
//! The output is composed of verbatim copy ranges over the source plus
//! freshly built headers, so every byte outside an edited frame or a
//! rewritten size field survives bit-exact. AVI outputs get their RIFF
//! and movi LIST sizes rewritten from a measurement pass, and the idx1
//! table regenerated (or elided). The output lands in a temp file that is
//! renamed into place only on full success.

use mosh_core::error::{MoshError, Result};
use mosh_core::{ByteSource, ComposedWrite, EditOp, Frame, FrameIndex, MoshPlan};
use mosh_formats::avi::AviLayout;
use mosh_formats::{chunk_header, patch_u32_le, Container, Idx1Builder};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Executor behavior toggles.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    /// On Remove, emit the neighboring frame's payload under the removed
    /// frame's chunk header so the frame count is preserved (AVI only).
    pub preserve_frame_count: bool,
    /// Regenerate the idx1 table in the output; elide it when false.
    pub rebuild_index: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            preserve_frame_count: true,
            rebuild_index: true,
        }
    }
}

/// What a run did.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionReport {
    pub frames_in: usize,
    pub frames_out: usize,
    pub bytes_written: u64,
}

/// Apply `plan` to `container` and write the result to `out_path`.
pub fn execute_plan(
    container: &Container,
    index: &FrameIndex,
    plan: &MoshPlan,
    config: &ExecutorConfig,
    out_path: &Path,
) -> Result<ExecutionReport> {
    plan.validate(index)?;

    let report = match &container.avi {
        Some(layout) => execute_avi(container, layout, index, plan, config, out_path)?,
        None => execute_annexb(container, index, plan, out_path)?,
    };

    info!(
        frames_in = report.frames_in,
        frames_out = report.frames_out,
        bytes = report.bytes_written,
        out = %out_path.display(),
        "plan applied"
    );
    Ok(report)
}

/// The payload donor for a preserved-count removal: the next frame, or
/// the previous one when the removed frame is last in the stream.
fn substitute_donor(index: &FrameIndex, removed: usize) -> Result<&Frame> {
    index
        .get(removed + 1)
        .or_else(|| removed.checked_sub(1).and_then(|i| index.get(i)))
        .ok_or_else(|| {
            MoshError::PlanInvalid(format!("no substitute payload for removed frame {removed}"))
        })
}

/// Accumulates the movi body: emitted chunks, their idx1 entries, and the
/// running output position.
struct AviEmitter<'a> {
    source: &'a ByteSource,
    body: ComposedWrite,
    idx1: Idx1Builder,
    pos: u64,
    frames_out: usize,
}

impl<'a> AviEmitter<'a> {
    fn new(source: &'a ByteSource, start_pos: u64, movi_fourcc_offset: u64) -> Self {
        Self {
            source,
            body: ComposedWrite::new(),
            idx1: Idx1Builder::new(movi_fourcc_offset),
            pos: start_pos,
            frames_out: 0,
        }
    }

    fn fourcc_of(&self, frame: &Frame) -> Result<[u8; 4]> {
        let bytes = self.source.read_range(frame.chunk_header_offset, 4)?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// Verbatim bytes between frame chunks (audio interleave, rec lists).
    fn gap(&mut self, offset: u64, length: u64) {
        self.body.push_copy(offset, length);
        self.pos += length;
    }

    /// The whole chunk, header and pad included, copied verbatim.
    fn copy_chunk(&mut self, frame: &Frame) -> Result<()> {
        let fourcc = self.fourcc_of(frame)?;
        self.idx1
            .push(fourcc, frame.frame_type.is_intra(), self.pos, frame.byte_length);
        self.body
            .push_copy(frame.chunk_header_offset, frame.total_length());
        self.pos += frame.total_length();
        self.frames_out += 1;
        Ok(())
    }

    /// A fresh chunk header carrying `fourcc`, with an arbitrary payload
    /// behind it.
    fn fresh_chunk(&mut self, fourcc: [u8; 4], keyframe: bool, payload: WritePayload) {
        let size = payload.len();
        self.idx1.push(fourcc, keyframe, self.pos, size);
        self.body.push_literal(chunk_header(fourcc, size).to_vec());
        match payload {
            WritePayload::Copy { offset, length } => self.body.push_copy(offset, length as u64),
            WritePayload::Literal(bytes) => self.body.push_literal(bytes),
        }
        let pad = (size % 2) as u64;
        if pad == 1 {
            self.body.push_literal(vec![0]);
        }
        self.pos += 8 + size as u64 + pad;
        self.frames_out += 1;
    }
}

enum WritePayload {
    Copy { offset: u64, length: u32 },
    Literal(Vec<u8>),
}

impl WritePayload {
    fn len(&self) -> u32 {
        match self {
            WritePayload::Copy { length, .. } => *length,
            WritePayload::Literal(bytes) => bytes.len() as u32,
        }
    }
}

fn execute_avi(
    container: &Container,
    layout: &AviLayout,
    index: &FrameIndex,
    plan: &MoshPlan,
    config: &ExecutorConfig,
    out_path: &Path,
) -> Result<ExecutionReport> {
    let source = &container.source;
    let header_len = container.header_end;
    // The movi FourCC sits just before the frame chunks, in both files.
    let movi_fourcc_offset = layout.movi_data_start - 4;

    let mut emitter = AviEmitter::new(source, header_len, movi_fourcc_offset);
    let mut src_cursor = layout.movi_data_start;

    for frame in index {
        if frame.chunk_header_offset > src_cursor {
            emitter.gap(src_cursor, frame.chunk_header_offset - src_cursor);
        }
        src_cursor = frame.end_offset();

        match plan.op_for(frame.decoding_index) {
            None => emitter.copy_chunk(frame)?,
            Some(EditOp::Remove { .. }) => {
                if config.preserve_frame_count {
                    let donor = substitute_donor(index, frame.decoding_index)?;
                    debug!(
                        removed = frame.decoding_index,
                        donor = donor.decoding_index,
                        "substituting payload for removed frame"
                    );
                    let fourcc = emitter.fourcc_of(frame)?;
                    emitter.fresh_chunk(
                        fourcc,
                        donor.frame_type.is_intra(),
                        WritePayload::Copy {
                            offset: donor.byte_offset,
                            length: donor.byte_length,
                        },
                    );
                }
                // Otherwise the frame's bytes are simply skipped.
            }
            Some(EditOp::Duplicate { count, .. }) => {
                for _ in 0..count + 1 {
                    emitter.copy_chunk(frame)?;
                }
            }
            Some(EditOp::ReplacePayload { payload, .. }) => {
                let fourcc = emitter.fourcc_of(frame)?;
                emitter.fresh_chunk(
                    fourcc,
                    frame.frame_type.is_intra(),
                    WritePayload::Literal(payload.clone()),
                );
            }
        }
    }

    if layout.movi_end > src_cursor {
        emitter.gap(src_cursor, layout.movi_end - src_cursor);
    }

    let AviEmitter {
        body,
        idx1,
        pos,
        frames_out,
        ..
    } = emitter;
    let movi_size = 4 + (pos - header_len);

    // Tail: everything after movi, with the idx1 chunk regenerated or
    // elided in place.
    let mut tail = ComposedWrite::new();
    match &layout.idx1 {
        // An index placed before movi cannot be spliced out of the tail;
        // leave the tail verbatim instead.
        Some(src_idx1) if src_idx1.chunk_offset < container.tail_start => {
            tail.push_copy(container.tail_start, source.len() - container.tail_start);
        }
        Some(src_idx1) => {
            tail.push_copy(
                container.tail_start,
                src_idx1.chunk_offset - container.tail_start,
            );
            if config.rebuild_index {
                tail.push_literal(idx1.build());
            }
            let after = src_idx1.chunk_offset + src_idx1.chunk_length;
            tail.push_copy(after, source.len() - after);
        }
        None => {
            tail.push_copy(container.tail_start, source.len() - container.tail_start);
        }
    }

    let total_len = header_len + body.measure() + tail.measure();
    let riff_size = total_len - 8;
    if riff_size > u32::MAX as u64 || movi_size > u32::MAX as u64 {
        return Err(MoshError::OverflowSize { size: total_len });
    }

    let mut header = source.read_range(0, header_len as usize)?.to_vec();
    patch_u32_le(&mut header, 4, riff_size as u32);
    patch_u32_le(&mut header, layout.movi_list_offset as usize + 4, movi_size as u32);
    if let Some(offset) = layout.total_frames_offset {
        patch_u32_le(&mut header, offset as usize, frames_out as u32);
    }

    let mut composed = ComposedWrite::new();
    composed.push_literal(header);
    composed.append(body);
    composed.append(tail);

    let bytes_written = write_out(source, &composed, out_path)?;
    Ok(ExecutionReport {
        frames_in: index.len(),
        frames_out,
        bytes_written,
    })
}

fn execute_annexb(
    container: &Container,
    index: &FrameIndex,
    plan: &MoshPlan,
    out_path: &Path,
) -> Result<ExecutionReport> {
    let source = &container.source;
    let mut composed = ComposedWrite::new();
    let mut frames_out = 0usize;

    composed.push_copy(0, container.header_end);

    for frame in index {
        let span = frame.byte_length as u64;
        match plan.op_for(frame.decoding_index) {
            None => {
                composed.push_copy(frame.byte_offset, span);
                frames_out += 1;
            }
            // A raw stream carries no duration metadata, so removal is
            // always a plain skip.
            Some(EditOp::Remove { .. }) => {}
            Some(EditOp::Duplicate { count, .. }) => {
                for _ in 0..count + 1 {
                    composed.push_copy(frame.byte_offset, span);
                    frames_out += 1;
                }
            }
            Some(EditOp::ReplacePayload { payload, .. }) => {
                composed.push_literal(payload.clone());
                frames_out += 1;
            }
        }
    }

    composed.push_copy(container.tail_start, source.len() - container.tail_start);

    let bytes_written = write_out(source, &composed, out_path)?;
    Ok(ExecutionReport {
        frames_in: index.len(),
        frames_out,
        bytes_written,
    })
}

/// Stream the composition to a temp file next to the destination and
/// rename it into place; a failed run leaves nothing behind.
fn write_out(source: &ByteSource, composed: &ComposedWrite, out_path: &Path) -> Result<u64> {
    let parent = match out_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| MoshError::IoAt {
        path: parent.to_path_buf(),
        source: e,
    })?;

    let mut writer = BufWriter::new(tmp.as_file());
    composed.write_to(source, &mut writer)?;
    writer.flush()?;
    drop(writer);

    tmp.persist(out_path).map_err(|e| MoshError::IoAt {
        path: out_path.to_path_buf(),
        source: e.error,
    })?;

    Ok(composed.measure())
}
