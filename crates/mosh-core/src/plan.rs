//! Edit operations and the mosh plan.

use crate::error::{MoshError, Result};
use crate::frame::FrameIndex;
use serde::{Deserialize, Serialize};

/// A single bitstream edit, addressed by decoding index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOp {
    /// Drop the frame (or substitute the neighboring payload when the
    /// executor runs with `preserve_frame_count`).
    Remove { decoding_index: usize },
    /// Append `count` copies of the frame immediately after it.
    Duplicate { decoding_index: usize, count: usize },
    /// Swap the frame's payload for caller-supplied bytes. Reserved; the
    /// planner never emits it, but the executor honors it.
    ReplacePayload {
        decoding_index: usize,
        payload: Vec<u8>,
    },
}

impl EditOp {
    /// Decoding index this op targets.
    pub fn decoding_index(&self) -> usize {
        match self {
            EditOp::Remove { decoding_index }
            | EditOp::Duplicate { decoding_index, .. }
            | EditOp::ReplacePayload { decoding_index, .. } => *decoding_index,
        }
    }
}

/// Non-fatal conditions surfaced during plan construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanWarning {
    /// The requested ops would have removed every intra frame; the op on
    /// the first intra frame was dropped to keep the stream decodable.
    AllIntraRemoved,
}

/// An ordered, deduplicated sequence of edit operations.
///
/// Ops are sorted by decoding index and each index is targeted at most
/// once; when the input contains conflicting ops for an index, the
/// earliest by input order wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoshPlan {
    ops: Vec<EditOp>,
}

impl MoshPlan {
    /// Build a plan from ops in caller order: dedupe by target (earliest
    /// wins), then sort by decoding index.
    pub fn from_ops(ops: Vec<EditOp>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let mut kept: Vec<EditOp> = ops
            .into_iter()
            .filter(|op| seen.insert(op.decoding_index()))
            .collect();
        kept.sort_by_key(|op| op.decoding_index());
        Self { ops: kept }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn ops(&self) -> &[EditOp] {
        &self.ops
    }

    /// The op targeting `decoding_index`, if any.
    pub fn op_for(&self, decoding_index: usize) -> Option<&EditOp> {
        self.ops
            .binary_search_by_key(&decoding_index, |op| op.decoding_index())
            .ok()
            .map(|i| &self.ops[i])
    }

    /// Drop the op targeting `decoding_index`, returning whether one was
    /// present.
    pub fn drop_op(&mut self, decoding_index: usize) -> bool {
        match self
            .ops
            .binary_search_by_key(&decoding_index, |op| op.decoding_index())
        {
            Ok(i) => {
                self.ops.remove(i);
                true
            }
            Err(_) => false,
        }
    }

    /// Check the plan against a frame index before execution.
    ///
    /// Rejects out-of-range targets, `Remove` of frame 0, and duplicate
    /// counts of zero. The planner never produces such plans; this guards
    /// caller-supplied ones.
    pub fn validate(&self, index: &FrameIndex) -> Result<()> {
        for op in &self.ops {
            let target = op.decoding_index();
            if target >= index.len() {
                return Err(MoshError::PlanInvalid(format!(
                    "op targets decoding index {target} but the stream has {} frames",
                    index.len()
                )));
            }
            match op {
                EditOp::Remove { decoding_index: 0 } => {
                    return Err(MoshError::PlanInvalid(
                        "the first frame must never be removed".to_string(),
                    ));
                }
                EditOp::Duplicate { count: 0, .. } => {
                    return Err(MoshError::PlanInvalid(format!(
                        "duplicate of frame {target} with count 0"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}
