//! Access-unit grouping.
//!
//! Groups a scanned NAL unit sequence into access units, one per coded
//! picture. Parameter sets, SEI, and delimiters that precede a picture's
//! first slice are folded into that picture's span so every frame is
//! self-extractable.

use crate::error::Result;
use crate::nal::{scan_nal_units, NalSpan, NalUnitType};
use crate::slice::parse_slice_prefix;
use mosh_core::FrameType;
use tracing::debug;

/// One access unit: a frame-sized byte span plus its classification.
#[derive(Debug, Clone, Copy)]
pub struct AccessUnit {
    /// Start offset, covering any leading SPS/PPS/SEI/AUD units.
    pub start: usize,
    /// End offset (exclusive), after the last slice NAL of the picture.
    pub end: usize,
    /// Classification from the first slice NAL.
    pub frame_type: FrameType,
}

impl AccessUnit {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Classify a slice NAL by its type and header prefix.
///
/// IDR slices classify directly; non-IDR slices map through `slice_type`
/// (I/SI intra, P/SP predictive, B bi-predictive). An unparsable header
/// yields `Unknown`.
fn classify_slice(data: &[u8], span: &NalSpan) -> FrameType {
    if span.header.nal_unit_type == NalUnitType::IdrSlice {
        return FrameType::IIdr;
    }

    match parse_slice_prefix(span.body(data)) {
        Ok(prefix) if prefix.slice_type.is_intra() => FrameType::INonIdr,
        Ok(prefix) if prefix.slice_type.is_b() => FrameType::B,
        Ok(_) => FrameType::P,
        Err(e) => {
            debug!(offset = span.start, "unparsable slice header: {e}");
            FrameType::Unknown
        }
    }
}

/// Classify a frame-sized payload (an AVI chunk carrying H.264) by its
/// first slice NAL. `Unknown` when no slice is found.
pub fn classify_frame_payload(data: &[u8]) -> FrameType {
    match scan_nal_units(data) {
        Ok(spans) => spans
            .iter()
            .find(|span| span.header.nal_unit_type.is_vcl())
            .map(|span| classify_slice(data, span))
            .unwrap_or(FrameType::Unknown),
        Err(_) => FrameType::Unknown,
    }
}

/// Group an Annex-B byte stream into access units.
///
/// A new unit opens at a slice whose `first_mb_in_slice` is zero (or at an
/// IDR/non-IDR boundary when the header is unreadable); an AUD also closes
/// the unit in progress. Non-VCL units between pictures accumulate and
/// attach to the next picture. Trailing non-VCL units after the last slice
/// (end-of-stream markers) are left outside every unit, for the caller's
/// tail span.
pub fn group_access_units(data: &[u8]) -> Result<Vec<AccessUnit>> {
    let spans = scan_nal_units(data)?;

    let mut units: Vec<AccessUnit> = Vec::new();
    // Start of the pending non-VCL run that will prefix the next picture.
    let mut pending_start: Option<usize> = None;
    // The unit currently being extended with continuation slices.
    let mut current: Option<AccessUnit> = None;

    for span in &spans {
        if !span.header.nal_unit_type.is_vcl() {
            if span.header.nal_unit_type == NalUnitType::Aud {
                if let Some(unit) = current.take() {
                    units.push(unit);
                }
            }
            if pending_start.is_none() {
                pending_start = Some(span.start);
            }
            continue;
        }

        let is_idr = span.header.nal_unit_type == NalUnitType::IdrSlice;
        let first_slice = parse_slice_prefix(span.body(data))
            .map(|p| p.is_first_slice())
            .unwrap_or_else(|_| {
                // Unreadable header: fall back to IDR-boundary detection.
                current
                    .map(|u| (u.frame_type == FrameType::IIdr) != is_idr)
                    .unwrap_or(true)
            });

        if !first_slice && current.is_some() {
            // Continuation slice of the open picture.
            if let Some(unit) = current.as_mut() {
                unit.end = span.end;
            }
            pending_start = None;
        } else if let Some(unit) = current.replace(AccessUnit {
            start: pending_start.take().unwrap_or(span.start),
            end: span.end,
            frame_type: classify_slice(data, span),
        }) {
            units.push(unit);
        }
    }

    if let Some(unit) = current.take() {
        units.push(unit);
    }

    Ok(units)
}
