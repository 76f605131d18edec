//! Slice-header prefix parsing.
//!
//! Frame classification needs only the first two Exp-Golomb codes of a
//! slice header (`first_mb_in_slice`, `slice_type`), so no SPS/PPS context
//! is required.

use crate::bitreader::{remove_emulation_prevention_bytes, BitReader};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Longest prefix de-emulated before reading the two leading codes. Both
/// fit comfortably in a handful of bytes even for pathological values.
const SLICE_PREFIX_LEN: usize = 16;

/// Slice type, after the mod-5 fold of the raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SliceType {
    /// P slice (predictive)
    P,
    /// B slice (bi-predictive)
    B,
    /// I slice (intra)
    I,
    /// SP slice (switching P)
    Sp,
    /// SI slice (switching I)
    Si,
}

impl SliceType {
    /// Create from the raw `slice_type` syntax element (0-9).
    pub fn from_u32(value: u32) -> Self {
        match value % 5 {
            0 => SliceType::P,
            1 => SliceType::B,
            2 => SliceType::I,
            3 => SliceType::Sp,
            _ => SliceType::Si,
        }
    }

    /// Check if this is an intra slice.
    pub fn is_intra(&self) -> bool {
        matches!(self, SliceType::I | SliceType::Si)
    }

    /// Check if this is a predictive slice.
    pub fn is_p(&self) -> bool {
        matches!(self, SliceType::P | SliceType::Sp)
    }

    /// Check if this is a bi-predictive slice.
    pub fn is_b(&self) -> bool {
        matches!(self, SliceType::B)
    }
}

/// The leading fields of a slice header.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SlicePrefix {
    /// first_mb_in_slice; 0 marks the first slice of a picture.
    pub first_mb_in_slice: u32,
    /// Folded slice type.
    pub slice_type: SliceType,
    /// Raw slice_type value before the mod-5 fold.
    pub slice_type_raw: u32,
}

impl SlicePrefix {
    /// Check if this slice starts a new picture.
    pub fn is_first_slice(&self) -> bool {
        self.first_mb_in_slice == 0
    }
}

/// Parse the slice-header prefix from a slice NAL body (bytes after the
/// NAL header byte).
pub fn parse_slice_prefix(body: &[u8]) -> Result<SlicePrefix> {
    let prefix = &body[..body.len().min(SLICE_PREFIX_LEN)];
    let clean = remove_emulation_prevention_bytes(prefix);
    let mut reader = BitReader::new(&clean);

    let first_mb_in_slice = reader.read_ue()?;
    let slice_type_raw = reader.read_ue()?;

    Ok(SlicePrefix {
        first_mb_in_slice,
        slice_type: SliceType::from_u32(slice_type_raw),
        slice_type_raw,
    })
}
