//! Optimizer contracts.

use crate::cfn::{CostFunctionNetworkProblem, CostFunctionNetworkSolution};
use crate::error::{OptimizationError, Result};
use crate::problem::{OptimizationProblems, ProblemCategory};
use crate::solution::OptimizationSolutions;
use std::sync::Arc;
use tracing::info;

/// Turns a set of problems into one solution set per problem.
pub trait Optimizer: Send + Sync {
    /// Solves every problem in `problems`.
    ///
    /// The `i`-th returned set belongs to the `i`-th problem. Fails before
    /// doing any work if a problem is of a kind this optimizer cannot handle
    /// or is not finalized.
    fn run_optimizer(&self, problems: &OptimizationProblems) -> Result<Vec<OptimizationSolutions>>;
}

/// An optimizer for cost function network problems.
///
/// Implementors only see problems that are already type checked and
/// finalized; the blanket [`Optimizer`] impl does the checking and wraps the
/// results.
pub trait CostFunctionNetworkOptimizer: Send + Sync {
    /// Name used in error messages and by the creator registry.
    fn class_name(&self) -> &'static str;

    /// Solves every problem, returning each problem's solutions best first.
    fn run_cost_function_network_optimizer(
        &self,
        problems: &[&dyn CostFunctionNetworkProblem],
    ) -> Result<Vec<Vec<CostFunctionNetworkSolution>>>;
}

impl<T: CostFunctionNetworkOptimizer> Optimizer for T {
    fn run_optimizer(&self, problems: &OptimizationProblems) -> Result<Vec<OptimizationSolutions>> {
        let class = self.class_name();
        let mut networks: Vec<&dyn CostFunctionNetworkProblem> =
            Vec::with_capacity(problems.n_problems());
        for problem in problems.iter() {
            let network = problem.as_cost_function_network().ok_or_else(|| {
                OptimizationError::TypeMismatch {
                    class,
                    operation: "run_optimizer",
                    expected: format!("a {} problem", ProblemCategory::CostFunctionNetwork),
                    found: problem.class_name().to_string(),
                }
            })?;
            if !network.finalized() {
                return Err(OptimizationError::NotFinalized {
                    class: problem.class_name(),
                    operation: "run_optimizer",
                });
            }
            networks.push(network);
        }

        info!(event = "optimizer_started", optimizer = class, problems = networks.len());
        let per_problem = self.run_cost_function_network_optimizer(&networks)?;
        if per_problem.len() != networks.len() {
            return Err(OptimizationError::SizeMismatch {
                class,
                operation: "run_optimizer",
                expected: networks.len(),
                found: per_problem.len(),
            });
        }

        per_problem
            .into_iter()
            .map(|solutions| {
                let mut set = OptimizationSolutions::for_category(ProblemCategory::CostFunctionNetwork);
                for solution in solutions {
                    set.add_optimization_solution(Arc::new(solution))?;
                }
                Ok(set)
            })
            .collect()
    }
}
