//! Mosh planning: translating intent into edit operations.

use crate::options::{BloomParams, MeltTarget};
use crate::scene::SceneCut;
use mosh_core::error::{MoshError, Result};
use mosh_core::{EditOp, FrameIndex, FrameType, MoshPlan, PlanWarning};
use tracing::{debug, warn};

/// A finished plan plus the non-fatal conditions met while building it.
#[derive(Debug, Clone, Default)]
pub struct PlanOutcome {
    pub plan: MoshPlan,
    pub warnings: Vec<PlanWarning>,
}

/// Plan I-frame removals at scene cuts.
///
/// Each cut contributes a `Remove` of its right-side intra frame; cuts
/// with no right intra, or whose right intra is the stream's first frame,
/// are skipped. `params.min_score` filters weak cuts and `params.limit`
/// caps how many cuts act.
pub fn plan_bloom(
    cuts: &[SceneCut],
    index: &FrameIndex,
    params: &BloomParams,
) -> Result<PlanOutcome> {
    let mut ops = Vec::new();
    let mut acted = 0usize;

    for cut in cuts {
        if let Some(limit) = params.limit {
            if acted >= limit {
                break;
            }
        }
        if let Some(min_score) = params.min_score {
            if cut.score < min_score {
                continue;
            }
        }

        let target = match cut.right_intra {
            Some(0) | None => continue,
            Some(target) => target,
        };

        debug!(cut = cut.at_decoding_index, target, "bloom removes keyframe");
        ops.push(EditOp::Remove {
            decoding_index: target,
        });
        acted += 1;
    }

    Ok(finish(ops, index))
}

/// Plan P-frame duplications.
///
/// Every target must name an in-range P frame and ask for at least one
/// copy; anything else is a `BadMeltTarget`.
pub fn plan_melt(targets: &[MeltTarget], index: &FrameIndex) -> Result<PlanOutcome> {
    let mut ops = Vec::new();

    for target in targets {
        let frame = index.get(target.decoding_index).ok_or_else(|| {
            MoshError::BadMeltTarget {
                index: target.decoding_index,
                found: "no frame at this index".to_string(),
            }
        })?;
        if frame.frame_type != FrameType::P {
            return Err(MoshError::BadMeltTarget {
                index: target.decoding_index,
                found: frame.frame_type.as_str().to_string(),
            });
        }
        if target.count < 1 {
            return Err(MoshError::BadMeltTarget {
                index: target.decoding_index,
                found: "repeat count below 1".to_string(),
            });
        }

        ops.push(EditOp::Duplicate {
            decoding_index: target.decoding_index,
            count: target.count,
        });
    }

    Ok(finish(ops, index))
}

/// Plan blooms and melts together. Bloom ops come first in input order,
/// so on a target collision the bloom wins.
pub fn plan_combined(
    cuts: &[SceneCut],
    targets: &[MeltTarget],
    index: &FrameIndex,
    params: &BloomParams,
) -> Result<PlanOutcome> {
    let bloom = plan_bloom(cuts, index, params)?;
    let melt = plan_melt(targets, index)?;

    let mut ops: Vec<EditOp> = bloom.plan.ops().to_vec();
    ops.extend(melt.plan.ops().iter().cloned());
    let mut outcome = finish(ops, index);

    let mut warnings = bloom.warnings;
    warnings.extend(melt.warnings);
    warnings.extend(outcome.warnings.drain(..));
    warnings.dedup();
    outcome.warnings = warnings;
    Ok(outcome)
}

/// Seal ops into a plan and enforce intra survival: a plan must leave at
/// least one intra frame in the stream. When every intra is targeted for
/// removal, the op on the first intra frame is dropped and the condition
/// is surfaced as a warning.
fn finish(ops: Vec<EditOp>, index: &FrameIndex) -> PlanOutcome {
    let mut plan = MoshPlan::from_ops(ops);
    let mut warnings = Vec::new();

    let intra_total = index.intra_count();
    let intra_removed = plan
        .ops()
        .iter()
        .filter(|op| {
            matches!(op, EditOp::Remove { decoding_index }
                if index.get(*decoding_index).is_some_and(|f| f.frame_type.is_intra()))
        })
        .count();

    if intra_total > 0 && intra_removed >= intra_total {
        if let Some(first_intra) = index.first_intra() {
            if plan.drop_op(first_intra) {
                warn!(
                    frame = first_intra,
                    "plan would remove every keyframe; keeping the first"
                );
                warnings.push(PlanWarning::AllIntraRemoved);
            }
        }
    }

    PlanOutcome { plan, warnings }
}
