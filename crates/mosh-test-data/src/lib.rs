//! Synthetic bitstream fixtures for mosh tests.
//!
//! Builds minimal but structurally honest AVI files (MPEG-4 ASP payloads,
//! hdrl/movi/idx1 in place) and Annex-B H.264 streams, so parser and
//! executor tests can assert against real byte layouts without shipping
//! binary fixtures.

pub mod annexb;
pub mod avi;

pub use annexb::AnnexBBuilder;
pub use avi::{vop_payload, AviBuilder};
