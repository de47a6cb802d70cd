//! Problem-level scratch space.

use super::cost_function::{CostFunction, CostFunctionScratchSpace};
use super::pairwise::PairwiseScratch;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies the frozen data that filled a cache.
///
/// Every finalization draws a fresh owner, so a cache filled by one problem
/// (or one cost function) is never trusted by another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CacheOwner(u64);

impl CacheOwner {
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Everything one solve attempt caches while scoring a cost function network.
///
/// Holds one optional slot per cost function of the problem, in the same
/// order, and the pairwise energy cache when the problem has precomputed
/// pairwise terms. Generated by
/// [`CostFunctionNetworkProblem::generate_scratch_space`](super::CostFunctionNetworkProblem::generate_scratch_space);
/// a space is only meaningful for the problem that generated it.
#[derive(Debug, Default)]
pub struct CostFunctionNetworkScratchSpace {
    cost_function_spaces: Vec<Option<Box<dyn CostFunctionScratchSpace>>>,
    pairwise: Option<PairwiseScratch>,
}

impl CostFunctionNetworkScratchSpace {
    pub(crate) fn new(cost_functions: &[Box<dyn CostFunction>]) -> Self {
        Self {
            cost_function_spaces: cost_functions
                .iter()
                .map(|cf| {
                    if cf.uses_scratch_space() {
                        cf.generate_scratch_space()
                    } else {
                        None
                    }
                })
                .collect(),
            pairwise: None,
        }
    }

    pub(crate) fn with_pairwise(mut self, pairwise: PairwiseScratch) -> Self {
        self.pairwise = Some(pairwise);
        self
    }

    pub fn n_cost_function_spaces(&self) -> usize {
        self.cost_function_spaces.len()
    }

    /// Slot of the cost function at `index`, if it uses one.
    pub fn cost_function_space(&mut self, index: usize) -> Option<&mut dyn CostFunctionScratchSpace> {
        match self.cost_function_spaces.get_mut(index) {
            Some(Some(space)) => Some(space.as_mut()),
            _ => None,
        }
    }

    pub(crate) fn pairwise_mut(&mut self) -> Option<&mut PairwiseScratch> {
        self.pairwise.as_mut()
    }

    /// Commits the move last scored through this space.
    pub fn accept_last_move(&mut self) {
        for space in self.cost_function_spaces.iter_mut().flatten() {
            space.accept_last_move();
        }
        if let Some(pairwise) = &mut self.pairwise {
            pairwise.accept_last_move();
        }
    }
}
