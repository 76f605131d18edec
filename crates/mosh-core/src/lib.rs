//! mosh-core: Core types for the mosh datamosh engine
//!
//! The engine edits compressed video at the bitstream level, removing
//! intra frames at scene boundaries (bloom) and duplicating predicted
//! frames (melt) without re-encoding. This crate carries the pieces every
//! other crate builds on:
//!
//! - [`frame`]: the frame model and the validated [`FrameIndex`]
//! - [`plan`]: [`EditOp`] and the deduplicated [`MoshPlan`]
//! - [`source`]: bounds-checked, memory-mapped byte access
//! - [`compose`]: copy-range/literal output composition
//! - [`error`]: the [`MoshError`] taxonomy shared across the workspace

pub mod compose;
pub mod error;
pub mod frame;
pub mod plan;
pub mod source;

pub use compose::{ComposedWrite, WriteChunk};
pub use error::{MoshError, Result, Stage};
pub use frame::{Frame, FrameIndex, FrameType};
pub use plan::{EditOp, MoshPlan, PlanWarning};
pub use source::ByteSource;
