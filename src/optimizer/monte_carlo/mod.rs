//! Monte Carlo simulated annealing.
//!
//! Independent annealing trajectories over a cost function network. Each
//! trajectory proposes single-node changes, scores them incrementally and
//! accepts worsening moves with a probability that shrinks as the cooling
//! schedule lowers the temperature.
//!
//! # References
//!
//! - Metropolis, Rosenbluth, Rosenbluth, Teller & Teller (1953), "Equation of
//!   State Calculations by Fast Computing Machines"
//! - Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"

mod config;
mod runner;

pub use config::MonteCarloConfig;
pub use runner::MonteCarloOptimizer;
