//! mosh-avc: H.264/AVC Annex-B parsing for mosh
//!
//! Scans start-code-delimited NAL units, reads the slice-header prefix
//! needed for I/P/B classification, and groups units into access units
//! (one per coded picture). No SPS/PPS state is kept: classification only
//! needs the first two Exp-Golomb codes of each slice header.

pub mod access_unit;
pub mod bitreader;
pub mod error;
pub mod nal;
pub mod slice;

pub use access_unit::{classify_frame_payload, group_access_units, AccessUnit};
pub use bitreader::BitReader;
pub use error::{AvcError, Result};
pub use nal::{parse_nal_header, scan_nal_units, NalHeader, NalSpan, NalUnitType};
pub use slice::{parse_slice_prefix, SlicePrefix, SliceType};
