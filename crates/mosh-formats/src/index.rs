//! Container dispatch: raw bytes in, classified frame index out.
//!
//! Each container kind pairs a parse step with a classify step behind the
//! same entry point; adding a codec means adding one dispatch arm, not a
//! type hierarchy.

use crate::annexb::{parse_annexb, AnnexBLayout};
use crate::avi::{parse_avi, scan_movi, AviLayout, RawFrameChunk, VideoCodec};
use crate::container::{detect_container_kind, ContainerKind};
use mosh_core::error::{MoshError, Result};
use mosh_core::{ByteSource, Frame, FrameIndex, FrameType};
use std::path::Path;
use tracing::{debug, warn};

/// A parsed container: the owned byte buffer plus the spans the executor
/// preserves verbatim around the frame stream.
#[derive(Debug)]
pub struct Container {
    pub source: ByteSource,
    pub kind: ContainerKind,
    /// AVI structure, when `kind` is [`ContainerKind::Avi`].
    pub avi: Option<AviLayout>,
    /// Bytes `[0, header_end)` are container header.
    pub header_end: u64,
    /// Bytes `[tail_start, len)` are container tail (index tables, end
    /// markers).
    pub tail_start: u64,
}

/// Open a file, detect its container kind, and build the frame index.
pub fn open_container(path: &Path) -> Result<(Container, FrameIndex)> {
    let source = ByteSource::open(path)?;
    let kind = detect_container_kind(path, source.bytes()).ok_or_else(|| {
        MoshError::FormatUnsupported(format!("unrecognized container: {}", path.display()))
    })?;
    debug!(kind = kind.name(), path = %path.display(), "detected container");
    parse_container(source, kind)
}

/// Parse a byte source as the given container kind.
pub fn parse_container(source: ByteSource, kind: ContainerKind) -> Result<(Container, FrameIndex)> {
    match kind {
        ContainerKind::Avi => parse_avi_container(source),
        ContainerKind::AnnexB => parse_annexb_container(source),
    }
}

fn parse_avi_container(source: ByteSource) -> Result<(Container, FrameIndex)> {
    let layout = parse_avi(&source)?;
    let raw = scan_movi(&source, &layout)?;
    let codec = resolve_codec(&source, &layout, &raw)?;

    let mut frames = Vec::with_capacity(raw.len());
    for (i, chunk) in raw.iter().enumerate() {
        let payload = source.read_range(chunk.payload_offset, chunk.payload_len as usize)?;
        frames.push(Frame {
            chunk_header_offset: chunk.header_offset,
            chunk_header_length: 8,
            byte_offset: chunk.payload_offset,
            byte_length: chunk.payload_len,
            pad_length: chunk.pad,
            frame_type: classify_payload(codec, payload),
            display_index: i,
            decoding_index: i,
            is_first: i == 0,
            scene_score: None,
        });
    }

    let index = FrameIndex::new(frames)?;
    let container = Container {
        header_end: layout.movi_data_start,
        tail_start: layout.movi_end,
        kind: ContainerKind::Avi,
        avi: Some(layout),
        source,
    };
    Ok((container, index))
}

fn parse_annexb_container(source: ByteSource) -> Result<(Container, FrameIndex)> {
    let (layout, frames) = parse_annexb(&source)?;
    let index = FrameIndex::new(frames)?;
    let AnnexBLayout {
        first_unit_start,
        last_unit_end,
    } = layout;
    let container = Container {
        header_end: first_unit_start,
        tail_start: last_unit_end,
        kind: ContainerKind::AnnexB,
        avi: None,
        source,
    };
    Ok((container, index))
}

/// Settle the codec for classification. An unrecognized `strh` handler is
/// sniffed from the first frame payload before giving up.
fn resolve_codec(
    source: &ByteSource,
    layout: &AviLayout,
    raw: &[RawFrameChunk],
) -> Result<VideoCodec> {
    if let VideoCodec::Unknown(fourcc) = layout.codec {
        let first = &raw[0];
        let payload = source.read_range(first.payload_offset, first.payload_len as usize)?;
        if mosh_mpeg4::classify_chunk(payload) != FrameType::Unknown {
            debug!("handler {fourcc:?} unknown; payload sniffs as MPEG-4 ASP");
            return Ok(VideoCodec::Mpeg4Asp);
        }
        if mosh_avc::classify_frame_payload(payload) != FrameType::Unknown {
            debug!("handler {fourcc:?} unknown; payload sniffs as H.264");
            return Ok(VideoCodec::H264);
        }
        warn!("unrecognized video codec {fourcc:?}; all frames classify as unknown");
    }
    Ok(layout.codec)
}

fn classify_payload(codec: VideoCodec, payload: &[u8]) -> FrameType {
    match codec {
        VideoCodec::Mpeg4Asp => mosh_mpeg4::classify_chunk(payload),
        VideoCodec::H264 => mosh_avc::classify_frame_payload(payload),
        VideoCodec::Unknown(_) => FrameType::Unknown,
    }
}
