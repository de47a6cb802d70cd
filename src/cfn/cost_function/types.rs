//! Cost function and scratch space traits.

use crate::error::{OptimizationError, Result};
use std::any::Any;
use std::fmt::Debug;

/// Per-attempt cache owned by a single cost function.
///
/// Created by [`CostFunction::generate_scratch_space`] at the start of a
/// solve attempt and passed back into every scoring call of that attempt.
/// Scratch spaces are `Send` so an attempt can run on any worker thread, but
/// never shared between threads.
pub trait CostFunctionScratchSpace: Send + Debug {
    /// Commits the state staged by the last scoring call.
    ///
    /// Optimizers call this once they keep the candidate they last scored.
    fn accept_last_move(&mut self);

    /// Downcast access for the cost function that created this space.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A weighted term of a cost function network's score.
///
/// A cost function is configured by absolute node index, then finalized
/// once with the problem's sorted list of variable nodes. After that it
/// scores candidates indexed by variable-node position. Values returned by
/// the scoring methods are already multiplied by [`weight`](Self::weight).
pub trait CostFunction: Send + Sync + Debug {
    fn class_name(&self) -> &'static str;

    fn weight(&self) -> f64;

    /// Fails with [`OptimizationError::Finalized`] once finalized.
    fn set_weight(&mut self, weight: f64) -> Result<()>;

    /// One-time transition to the scoring state.
    ///
    /// `variable_node_indices` is sorted ascending; position `i` of every
    /// candidate assignment holds the choice at node `variable_node_indices[i]`.
    fn finalize(&mut self, variable_node_indices: &[usize]) -> Result<()>;

    fn finalized(&self) -> bool;

    fn uses_scratch_space(&self) -> bool {
        false
    }

    fn generate_scratch_space(&self) -> Option<Box<dyn CostFunctionScratchSpace>> {
        None
    }

    /// Weighted cost of a candidate.
    fn compute_cost_function(
        &self,
        candidate: &[usize],
        scratch: Option<&mut dyn CostFunctionScratchSpace>,
    ) -> Result<f64>;

    /// Weighted `cost(new) - cost(old)`.
    ///
    /// The default scores both candidates in full. Implementations override
    /// it to touch only the positions that differ.
    fn compute_cost_function_difference(
        &self,
        old_candidate: &[usize],
        new_candidate: &[usize],
        scratch: Option<&mut dyn CostFunctionScratchSpace>,
    ) -> Result<f64> {
        let _ = scratch;
        let old = self.compute_cost_function(old_candidate, None)?;
        let new = self.compute_cost_function(new_candidate, None)?;
        Ok(new - old)
    }

    fn deep_clone(&self) -> Box<dyn CostFunction>;
}

/// Fails when a mutation is attempted on a finalized object.
pub(crate) fn require_unfinalized(
    finalized: bool,
    class: &'static str,
    operation: &'static str,
) -> Result<()> {
    if finalized {
        Err(OptimizationError::Finalized { class, operation })
    } else {
        Ok(())
    }
}
