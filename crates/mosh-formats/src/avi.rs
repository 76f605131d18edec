//! AVI (RIFF) container parsing.
//!
//! Walks the top-level LIST/chunk hierarchy for the `hdrl` headers, the
//! `movi` frame list, and the `idx1` index, and scans `movi` for the first
//! video stream's frame chunks (`NNdc`/`NNdb`). Video payloads are never
//! decoded here; classification happens at the dispatch layer.

use mosh_core::error::{MoshError, Result};
use mosh_core::ByteSource;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// idx1 flag marking a keyframe entry.
pub const AVIIF_KEYFRAME: u32 = 0x10;

/// Codec carried by the video stream, from the `strh` FourCC handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoCodec {
    /// MPEG-4 Part 2 ASP (Xvid, DivX, FMP4)
    Mpeg4Asp,
    /// H.264/AVC
    H264,
    /// Unrecognized handler FourCC
    Unknown([u8; 4]),
}

impl VideoCodec {
    /// Map a `strh` handler FourCC to a codec.
    pub fn from_fourcc(fourcc: [u8; 4]) -> Self {
        let mut lower = fourcc;
        lower.iter_mut().for_each(|b| *b = b.to_ascii_lowercase());
        match &lower {
            b"mpg4" | b"mp4v" | b"xvid" | b"divx" | b"dx50" | b"fmp4" | b"3iv2" => {
                VideoCodec::Mpeg4Asp
            }
            b"h264" | b"x264" | b"avc1" | b"davc" | b"vssh" => VideoCodec::H264,
            _ => VideoCodec::Unknown(fourcc),
        }
    }
}

/// One entry of the `idx1` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Idx1Entry {
    pub fourcc: [u8; 4],
    pub flags: u32,
    /// Offset relative to the `movi` FourCC position.
    pub offset: u32,
    pub size: u32,
}

/// The parsed `idx1` chunk.
#[derive(Debug, Clone)]
pub struct Idx1Table {
    /// Offset of the chunk header in the file.
    pub chunk_offset: u64,
    /// Full chunk length including header and pad.
    pub chunk_length: u64,
    pub entries: Vec<Idx1Entry>,
}

/// Byte layout of the structures the executor must preserve or rewrite.
#[derive(Debug, Clone)]
pub struct AviLayout {
    /// Offset of the `LIST....movi` header.
    pub movi_list_offset: u64,
    /// First byte after the `movi` FourCC; frame chunks start here.
    pub movi_data_start: u64,
    /// End of the movi list payload (exclusive).
    pub movi_end: u64,
    /// Offset of `avih.dwTotalFrames`, when the main header was found.
    pub total_frames_offset: Option<u64>,
    /// Zero-based number of the video stream the frame chunks belong to.
    pub video_stream: u8,
    /// Codec hint from the stream header.
    pub codec: VideoCodec,
    /// Parsed index, when present and well-formed.
    pub idx1: Option<Idx1Table>,
}

/// A located frame chunk, before classification.
#[derive(Debug, Clone, Copy)]
pub struct RawFrameChunk {
    pub header_offset: u64,
    pub payload_offset: u64,
    pub payload_len: u32,
    pub pad: u8,
    pub fourcc: [u8; 4],
}

fn u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn fourcc_at(bytes: &[u8], offset: usize) -> [u8; 4] {
    [
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ]
}

/// True for `NNdc`/`NNdb` chunks belonging to `stream`.
fn is_video_chunk(fourcc: &[u8; 4], stream: u8) -> bool {
    let digits = [b'0' + stream / 10, b'0' + stream % 10];
    fourcc[0] == digits[0]
        && fourcc[1] == digits[1]
        && (&fourcc[2..4] == b"dc" || &fourcc[2..4] == b"db")
}

/// Parse the RIFF structure of an AVI file.
pub fn parse_avi(source: &ByteSource) -> Result<AviLayout> {
    let bytes = source.bytes();
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"AVI " {
        return Err(MoshError::FormatUnsupported(
            "not an AVI (RIFF/AVI magic mismatch)".to_string(),
        ));
    }

    let len = bytes.len();
    let mut pos = 12usize;
    let mut movi: Option<(u64, u64, u64)> = None;
    let mut hdrl: Option<(usize, usize)> = None;
    let mut idx1: Option<Idx1Table> = None;

    while pos + 8 <= len {
        let fourcc = fourcc_at(bytes, pos);
        let size = u32_le(bytes, pos + 4) as usize;
        let data_start = pos + 8;
        let data_end = data_start.checked_add(size).ok_or_else(|| {
            MoshError::corrupt(pos as u64, "chunk size overflows")
        })?;
        if data_end > len {
            return Err(MoshError::corrupt(
                pos as u64,
                format!("chunk size {size} extends past EOF"),
            ));
        }

        if &fourcc == b"LIST" {
            if size < 4 {
                return Err(MoshError::corrupt(pos as u64, "LIST chunk shorter than its type"));
            }
            match &bytes[data_start..data_start + 4] {
                b"hdrl" => hdrl = Some((data_start + 4, data_end)),
                b"movi" => {
                    movi = Some((pos as u64, data_start as u64 + 4, data_end as u64));
                }
                _ => {}
            }
        } else if &fourcc == b"idx1" {
            idx1 = parse_idx1(bytes, pos, size);
        }

        pos = data_end + (size & 1);
    }

    let (movi_list_offset, movi_data_start, movi_end) =
        movi.ok_or_else(|| MoshError::corrupt(len as u64, "no movi list"))?;

    let mut total_frames_offset = None;
    let mut video_stream = None;
    let mut codec = VideoCodec::Unknown([0; 4]);

    if let Some((start, end)) = hdrl {
        let mut stream_no = 0u8;
        let mut pos = start;
        while pos + 8 <= end {
            let fourcc = fourcc_at(bytes, pos);
            let size = u32_le(bytes, pos + 4) as usize;
            let data_start = pos + 8;
            let data_end = data_start.saturating_add(size);
            if data_end > end {
                return Err(MoshError::corrupt(
                    pos as u64,
                    "hdrl child extends past its list",
                ));
            }

            if &fourcc == b"avih" {
                // dwTotalFrames is the fifth dword of the main header.
                if size >= 20 {
                    total_frames_offset = Some(data_start as u64 + 16);
                }
            } else if &fourcc == b"LIST" && size >= 4 && &bytes[data_start..data_start + 4] == b"strl"
            {
                // The first child of strl is the stream header.
                let strh_pos = data_start + 4;
                if strh_pos + 16 <= data_end && &bytes[strh_pos..strh_pos + 4] == b"strh" {
                    let fcc_type = fourcc_at(bytes, strh_pos + 8);
                    if &fcc_type == b"vids" && video_stream.is_none() {
                        video_stream = Some(stream_no);
                        codec = VideoCodec::from_fourcc(fourcc_at(bytes, strh_pos + 12));
                    }
                }
                stream_no = stream_no.saturating_add(1);
            }

            pos = data_end + (size & 1);
        }
    } else {
        warn!("AVI has no hdrl list; assuming video stream 0");
    }

    Ok(AviLayout {
        movi_list_offset,
        movi_data_start,
        movi_end,
        total_frames_offset,
        video_stream: video_stream.unwrap_or(0),
        codec,
        idx1,
    })
}

fn parse_idx1(bytes: &[u8], chunk_offset: usize, size: usize) -> Option<Idx1Table> {
    if size % 16 != 0 {
        warn!(
            offset = chunk_offset,
            "idx1 size {size} is not a multiple of 16; ignoring index"
        );
        return None;
    }

    let data_start = chunk_offset + 8;
    let entries = (0..size / 16)
        .map(|i| {
            let at = data_start + i * 16;
            Idx1Entry {
                fourcc: fourcc_at(bytes, at),
                flags: u32_le(bytes, at + 4),
                offset: u32_le(bytes, at + 8),
                size: u32_le(bytes, at + 12),
            }
        })
        .collect();

    Some(Idx1Table {
        chunk_offset: chunk_offset as u64,
        chunk_length: 8 + size as u64 + (size & 1) as u64,
        entries,
    })
}

/// Scan `movi` for the video stream's frame chunks, in stream order.
///
/// Non-video chunks (audio, `rec ` grouping lists) are left alone; the
/// executor copies the gaps between frame chunks verbatim.
pub fn scan_movi(source: &ByteSource, layout: &AviLayout) -> Result<Vec<RawFrameChunk>> {
    let bytes = source.bytes();
    let mut frames = Vec::new();
    scan_movi_range(
        bytes,
        layout.movi_data_start as usize,
        layout.movi_end as usize,
        layout.video_stream,
        &mut frames,
    )?;

    if frames.is_empty() {
        return Err(MoshError::corrupt(
            layout.movi_data_start,
            "movi list contains no video frame chunks",
        ));
    }

    Ok(frames)
}

fn scan_movi_range(
    bytes: &[u8],
    start: usize,
    end: usize,
    stream: u8,
    frames: &mut Vec<RawFrameChunk>,
) -> Result<()> {
    let mut pos = start;
    while pos + 8 <= end {
        let fourcc = fourcc_at(bytes, pos);
        let size = u32_le(bytes, pos + 4) as usize;
        let data_start = pos + 8;
        let data_end = data_start.saturating_add(size);
        if data_end > end {
            return Err(MoshError::corrupt(
                pos as u64,
                format!("movi chunk size {size} extends past the list"),
            ));
        }

        if &fourcc == b"LIST" && size >= 4 && &bytes[data_start..data_start + 4] == b"rec " {
            scan_movi_range(bytes, data_start + 4, data_end, stream, frames)?;
        } else if is_video_chunk(&fourcc, stream) {
            frames.push(RawFrameChunk {
                header_offset: pos as u64,
                payload_offset: data_start as u64,
                payload_len: size as u32,
                pad: (size & 1) as u8,
                fourcc,
            });
        }

        pos = data_end + (size & 1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosh_test_data::AviBuilder;

    #[test]
    fn rejects_non_avi() {
        let source = ByteSource::from_vec(b"RIFF\x04\x00\x00\x00WAVE".to_vec()).unwrap();
        assert!(matches!(
            parse_avi(&source),
            Err(MoshError::FormatUnsupported(_))
        ));
    }

    #[test]
    fn rejects_truncated_chunk() {
        let mut bytes = b"RIFF\xFF\x00\x00\x00AVI ".to_vec();
        bytes.extend_from_slice(b"LIST");
        bytes.extend_from_slice(&100u32.to_le_bytes());
        bytes.extend_from_slice(b"movi");
        let source = ByteSource::from_vec(bytes).unwrap();
        assert!(matches!(
            parse_avi(&source),
            Err(MoshError::ContainerCorrupt { .. })
        ));
    }

    #[test]
    fn rejects_missing_movi() {
        let mut bytes = b"RIFF\x0C\x00\x00\x00AVI ".to_vec();
        bytes.extend_from_slice(b"JUNK");
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 4]);
        let source = ByteSource::from_vec(bytes).unwrap();
        let err = parse_avi(&source).unwrap_err();
        assert!(err.to_string().contains("no movi list"));
    }

    #[test]
    fn parses_layout_and_frames() {
        let avi = AviBuilder::new()
            .frame(true, &[0x11; 30]) // 35-byte payload exercises the pad byte
            .frame(false, &[0x22; 20])
            .frame(false, &[0x33; 20])
            .build();
        let source = ByteSource::from_vec(avi).unwrap();

        let layout = parse_avi(&source).unwrap();
        assert_eq!(layout.video_stream, 0);
        assert_eq!(layout.codec, VideoCodec::Mpeg4Asp);
        assert!(layout.total_frames_offset.is_some());
        let idx1 = layout.idx1.as_ref().expect("builder writes idx1");
        assert_eq!(idx1.entries.len(), 3);
        assert_eq!(idx1.entries[0].flags, AVIIF_KEYFRAME);

        let frames = scan_movi(&source, &layout).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].payload_len, 30 + 5); // VOP header + filler
        assert_eq!(frames[0].pad, 1);
        // Chunks are contiguous within movi.
        assert_eq!(
            frames[1].header_offset,
            frames[0].payload_offset + frames[0].payload_len as u64 + frames[0].pad as u64
        );
    }

    #[test]
    fn empty_movi_is_an_error() {
        let avi = AviBuilder::new().build();
        let source = ByteSource::from_vec(avi).unwrap();
        let layout = parse_avi(&source).unwrap();
        let err = scan_movi(&source, &layout).unwrap_err();
        assert!(err.to_string().contains("no video frame chunks"));
    }

    #[test]
    fn malformed_idx1_degrades_to_absent() {
        let mut avi = AviBuilder::new().frame(true, &[0x11; 8]).build();
        // Truncate one byte off idx1 so its size is no longer 16-aligned.
        let idx1_pos = avi.windows(4).position(|w| w == b"idx1").unwrap();
        let bad_size = 15u32;
        avi[idx1_pos + 4..idx1_pos + 8].copy_from_slice(&bad_size.to_le_bytes());
        avi.truncate(idx1_pos + 8 + 15);
        // Fix up the RIFF size for the shortened file.
        let riff_size = (avi.len() - 8) as u32;
        avi[4..8].copy_from_slice(&riff_size.to_le_bytes());

        let source = ByteSource::from_vec(avi).unwrap();
        let layout = parse_avi(&source).unwrap();
        assert!(layout.idx1.is_none());
    }
}
