//! mosh-formats: container parsing for mosh
//!
//! Turns raw container bytes into the classified frame index the planner
//! and executor work from, without ever decoding video payloads:
//!
//! - [`container`]: AVI / Annex-B detection
//! - [`avi`]: RIFF structure walking and movi frame scanning
//! - [`annexb`]: raw H.264 stream adapter over `mosh-avc`
//! - [`index`]: per-kind dispatch producing a [`Container`] + frame index
//! - [`avi_writer`]: rewritten size fields and idx1 regeneration

pub mod annexb;
pub mod avi;
pub mod avi_writer;
pub mod container;
pub mod index;

pub use avi::{AviLayout, Idx1Entry, Idx1Table, VideoCodec, AVIIF_KEYFRAME};
pub use avi_writer::{chunk_header, patch_u32_le, Idx1Builder};
pub use container::{detect_container_kind, ContainerKind};
pub use index::{open_container, parse_container, Container};
