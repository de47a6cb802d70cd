//! Cost function network (CFN) optimization problems.
//!
//! A cost function network is a set of nodes, each offering a finite number
//! of mutually exclusive choices, and a score that sums pluggable cost terms
//! over one choice per node. Nodes with a single choice are fixed; the rest
//! are *variable* and make up a candidate assignment, ordered by node index.
//!
//! - [`CostFunctionNetworkProblem`]: what an optimizer sees
//! - [`CostFunctionNetworkOptimizationProblem`]: a network scored only by
//!   [`CostFunction`]s
//! - [`PairwisePrecomputedOptimizationProblem`]: adds tabulated one-body and
//!   two-body penalties with an incremental pair-energy cache
//! - [`CostFunctionNetworkScratchSpace`]: per-attempt caches
//!
//! # References
//!
//! - Cooper, de Givry & Schiex (2007), "Optimal soft arc consistency"
//! - Desmet, De Maeyer, Hazes & Lasters (1992), "The dead-end elimination
//!   theorem and its use in protein side-chain positioning"

pub mod cost_function;
mod pairwise;
mod problem;
mod scratch;
mod solution;

pub use cost_function::{
    ChoicePenaltySumCostFunction, CostFunction, CostFunctionScratchSpace,
    SquareOfChoicePenaltySumCostFunction,
};
pub use pairwise::PairwisePrecomputedOptimizationProblem;
pub use problem::{CostFunctionNetworkOptimizationProblem, CostFunctionNetworkProblem};
pub use scratch::CostFunctionNetworkScratchSpace;
pub use solution::CostFunctionNetworkSolution;
