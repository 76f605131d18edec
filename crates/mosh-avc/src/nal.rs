//! H.264/AVC NAL (Network Abstraction Layer) unit scanning.

use crate::error::{AvcError, Result};
use serde::{Deserialize, Serialize};

/// NAL unit types this engine distinguishes. Everything else folds into
/// `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NalUnitType {
    /// Coded slice of a non-IDR picture
    NonIdrSlice,
    /// Coded slice of an IDR picture
    IdrSlice,
    /// Supplemental enhancement information
    Sei,
    /// Sequence parameter set
    Sps,
    /// Picture parameter set
    Pps,
    /// Access unit delimiter
    Aud,
    /// End of sequence
    EndOfSequence,
    /// End of stream
    EndOfStream,
    /// Filler data
    FillerData,
    /// Any other type, with its raw value
    Other(u8),
}

impl NalUnitType {
    /// Create from the 5-bit raw value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => NalUnitType::NonIdrSlice,
            5 => NalUnitType::IdrSlice,
            6 => NalUnitType::Sei,
            7 => NalUnitType::Sps,
            8 => NalUnitType::Pps,
            9 => NalUnitType::Aud,
            10 => NalUnitType::EndOfSequence,
            11 => NalUnitType::EndOfStream,
            12 => NalUnitType::FillerData,
            other => NalUnitType::Other(other),
        }
    }

    /// Check if this is a VCL (Video Coding Layer) NAL unit.
    pub fn is_vcl(&self) -> bool {
        matches!(self, NalUnitType::NonIdrSlice | NalUnitType::IdrSlice)
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            NalUnitType::NonIdrSlice => "Non-IDR Slice",
            NalUnitType::IdrSlice => "IDR Slice",
            NalUnitType::Sei => "SEI",
            NalUnitType::Sps => "SPS",
            NalUnitType::Pps => "PPS",
            NalUnitType::Aud => "AUD",
            NalUnitType::EndOfSequence => "End of Sequence",
            NalUnitType::EndOfStream => "End of Stream",
            NalUnitType::FillerData => "Filler Data",
            NalUnitType::Other(_) => "Other",
        }
    }
}

/// NAL unit header fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NalHeader {
    /// nal_ref_idc (0-3)
    pub nal_ref_idc: u8,
    /// nal_unit_type
    pub nal_unit_type: NalUnitType,
}

/// A NAL unit located in the byte stream, start code included.
#[derive(Debug, Clone, Copy)]
pub struct NalSpan {
    /// Offset of the start code's first byte.
    pub start: usize,
    /// Offset of the NAL header byte (first byte after the start code).
    pub payload_start: usize,
    /// End offset (exclusive); the next unit's start or EOF.
    pub end: usize,
    /// Parsed header.
    pub header: NalHeader,
}

impl NalSpan {
    /// Payload after the NAL header byte.
    pub fn body<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.payload_start + 1..self.end]
    }
}

/// Parse the NAL unit header from its single byte.
pub fn parse_nal_header(byte: u8) -> Result<NalHeader> {
    if (byte >> 7) & 1 != 0 {
        return Err(AvcError::InvalidNalUnit(
            "forbidden_zero_bit is set".to_string(),
        ));
    }

    Ok(NalHeader {
        nal_ref_idc: (byte >> 5) & 0x03,
        nal_unit_type: NalUnitType::from_u8(byte & 0x1F),
    })
}

/// Offsets of the byte after each start code (0x000001 or 0x00000001).
fn find_start_codes(data: &[u8]) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut i = 0;

    while i + 2 < data.len() {
        if data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1 {
            positions.push(i + 3);
            i += 3;
        } else {
            i += 1;
        }
    }

    positions
}

/// Scan an Annex-B byte stream into NAL unit spans.
///
/// Each span runs from its start code's first byte (a 4-byte prefix keeps
/// its leading zero) to the next unit's start code or EOF. Units with an
/// unparsable header byte are skipped. Fails with `NoStartCode` when the
/// stream contains no NAL boundaries and `TruncatedNal` when a start code
/// has no header byte behind it.
pub fn scan_nal_units(data: &[u8]) -> Result<Vec<NalSpan>> {
    let positions = find_start_codes(data);
    if positions.is_empty() {
        return Err(AvcError::NoStartCode);
    }

    let mut spans = Vec::with_capacity(positions.len());
    for (idx, &payload_start) in positions.iter().enumerate() {
        // A 4-byte start code owns the zero in front of the 3-byte match.
        let start = if payload_start >= 4 && data[payload_start - 4] == 0 {
            payload_start - 4
        } else {
            payload_start - 3
        };

        let end = if idx + 1 < positions.len() {
            let next = positions[idx + 1];
            if next >= 4 && data[next - 4] == 0 {
                next - 4
            } else {
                next - 3
            }
        } else {
            data.len()
        };

        if payload_start >= end {
            return Err(AvcError::TruncatedNal(start));
        }

        let header = match parse_nal_header(data[payload_start]) {
            Ok(header) => header,
            Err(_) => continue,
        };

        spans.push(NalSpan {
            start,
            payload_start,
            end,
            header,
        });
    }

    if spans.is_empty() {
        return Err(AvcError::NoStartCode);
    }

    Ok(spans)
}
