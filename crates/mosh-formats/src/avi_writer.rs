//! AVI output helpers.
//!
//! The executor composes its output from verbatim copy ranges; what it
//! cannot copy are the size fields that change when frames are added or
//! removed, and the idx1 table, which references absolute positions. These
//! helpers build those fresh.

use crate::avi::AVIIF_KEYFRAME;

/// An 8-byte RIFF chunk header.
pub fn chunk_header(fourcc: [u8; 4], size: u32) -> [u8; 8] {
    let mut header = [0u8; 8];
    header[0..4].copy_from_slice(&fourcc);
    header[4..8].copy_from_slice(&size.to_le_bytes());
    header
}

/// Overwrite a little-endian u32 field in place.
pub fn patch_u32_le(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Regenerates the idx1 table from the output frame layout.
///
/// Entry offsets are relative to the `movi` FourCC position, the dominant
/// player convention.
pub struct Idx1Builder {
    movi_fourcc_offset: u64,
    entries: Vec<u8>,
    count: u32,
}

impl Idx1Builder {
    /// `movi_fourcc_offset` is the position of the `movi` FourCC in the
    /// output file.
    pub fn new(movi_fourcc_offset: u64) -> Self {
        Self {
            movi_fourcc_offset,
            entries: Vec::new(),
            count: 0,
        }
    }

    /// Record a chunk at `chunk_offset` (output-file position of its
    /// header) with `size` payload bytes.
    pub fn push(&mut self, fourcc: [u8; 4], keyframe: bool, chunk_offset: u64, size: u32) {
        let relative = chunk_offset.saturating_sub(self.movi_fourcc_offset) as u32;
        let flags = if keyframe { AVIIF_KEYFRAME } else { 0 };
        self.entries.extend_from_slice(&fourcc);
        self.entries.extend_from_slice(&flags.to_le_bytes());
        self.entries.extend_from_slice(&relative.to_le_bytes());
        self.entries.extend_from_slice(&size.to_le_bytes());
        self.count += 1;
    }

    pub fn entry_count(&self) -> u32 {
        self.count
    }

    /// The complete idx1 chunk, header included. Entries are 16 bytes
    /// each, so no pad byte is ever needed.
    pub fn build(self) -> Vec<u8> {
        let mut chunk = Vec::with_capacity(8 + self.entries.len());
        chunk.extend_from_slice(&chunk_header(*b"idx1", self.entries.len() as u32));
        chunk.extend_from_slice(&self.entries);
        chunk
    }
}
