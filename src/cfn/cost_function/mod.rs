//! Pluggable cost terms of a cost function network.
//!
//! A [`CostFunction`] scores a whole candidate assignment and, more
//! importantly for local search, the score difference between two
//! candidates. Implementations that can reuse work between calls keep it in
//! a [`CostFunctionScratchSpace`] owned by the solve attempt.
//!
//! # References
//!
//! - Cooper, de Givry, Sanchez, Schiex, Zytnicki & Werner (2010), "Soft arc
//!   consistency revisited"

mod penalty_sum;
mod types;

pub use penalty_sum::{
    ChoicePenaltySumCostFunction, ChoicePenaltySumScratchSpace, Clamp, Identity, Linear,
    PenaltySumTransform, Square, SquareOfChoicePenaltySumCostFunction,
};
pub use types::{CostFunction, CostFunctionScratchSpace};
