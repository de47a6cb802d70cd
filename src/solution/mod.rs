//! Optimizer output: scored solutions and per-problem solution sets.
//!
//! Cost function network solutions live in [`crate::cfn`]; this module holds
//! the category-agnostic trait, the container, and [`RealValuedLocalSolution`].

mod container;
mod types;

pub use container::OptimizationSolutions;
pub use types::{OptimizationSolution, RealValuedLocalSolution};
