//! Annex-B raw stream adapter.
//!
//! Lifts `mosh-avc` access units into the shared frame model. An access
//! unit already includes the parameter sets and SEI attached to its first
//! slice, so every frame span is self-extractable; there is no chunk
//! framing to record.

use mosh_core::error::{MoshError, Result};
use mosh_core::{ByteSource, Frame};
use mosh_avc::{group_access_units, AvcError};

/// Byte layout of an Annex-B stream: everything outside the access units.
#[derive(Debug, Clone, Copy)]
pub struct AnnexBLayout {
    /// Start of the first access unit. Bytes before it (leading garbage)
    /// are preserved as header.
    pub first_unit_start: u64,
    /// End of the last access unit. Bytes after it (end-of-stream
    /// markers) are preserved as tail.
    pub last_unit_end: u64,
}

fn lift_error(err: AvcError) -> MoshError {
    match err {
        AvcError::NoStartCode => {
            MoshError::FormatUnsupported("no NAL start codes in stream".to_string())
        }
        AvcError::TruncatedNal(offset) => {
            MoshError::corrupt(offset as u64, "truncated NAL unit")
        }
        other => MoshError::corrupt(0, other.to_string()),
    }
}

/// Parse an Annex-B stream into classified frames.
pub fn parse_annexb(source: &ByteSource) -> Result<(AnnexBLayout, Vec<Frame>)> {
    let units = group_access_units(source.bytes()).map_err(lift_error)?;
    if units.is_empty() {
        return Err(MoshError::corrupt(0, "no access units in stream"));
    }

    let layout = AnnexBLayout {
        first_unit_start: units[0].start as u64,
        last_unit_end: units[units.len() - 1].end as u64,
    };

    let frames = units
        .iter()
        .enumerate()
        .map(|(i, unit)| Frame {
            chunk_header_offset: unit.start as u64,
            chunk_header_length: 0,
            byte_offset: unit.start as u64,
            byte_length: unit.len() as u32,
            pad_length: 0,
            frame_type: unit.frame_type,
            display_index: i,
            decoding_index: i,
            is_first: i == 0,
            scene_score: None,
        })
        .collect();

    Ok((layout, frames))
}
