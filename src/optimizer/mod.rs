//! Optimizers: turning finalized problems into ranked solutions.
//!
//! - [`Optimizer`]: the category-agnostic entry point, one solution set per
//!   problem
//! - [`CostFunctionNetworkOptimizer`]: the narrow entry point for cost
//!   function networks; every implementor is an [`Optimizer`]
//! - [`MonteCarloOptimizer`]: simulated annealing with incremental scoring
//! - [`ExhaustiveOptimizer`]: complete enumeration of small search spaces
//!
//! # References
//!
//! - Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"

mod collector;
mod exhaustive;
mod monte_carlo;
mod types;

pub use exhaustive::ExhaustiveOptimizer;
pub use monte_carlo::{MonteCarloConfig, MonteCarloOptimizer};
pub use types::{CostFunctionNetworkOptimizer, Optimizer};
