//! Optimization problems and the container passed to optimizers.
//!
//! [`OptimizationProblem`] is the category-agnostic interface: a lifecycle
//! (`finalize`, `reset`), deep cloning, and runtime checks for the concrete
//! interfaces. Discrete problems live in [`crate::cfn`];
//! [`RealValuedLocalOptimizationProblem`] covers continuous objectives.

mod container;
pub(crate) mod lifecycle;
mod real_valued;
mod types;

pub use container::OptimizationProblems;
pub use real_valued::{Gradient, Objective, RealValuedLocalOptimizationProblem};
pub use types::{OptimizationProblem, ProblemCategory};
