//! Brute-force enumeration of small cost function networks.

use super::collector::SolutionCollector;
use super::types::CostFunctionNetworkOptimizer;
use crate::cfn::{CostFunctionNetworkProblem, CostFunctionNetworkSolution};
use crate::error::{OptimizationError, Result};
use crate::threads::WorkExecutor;
use tracing::{debug, info};

/// Scores every assignment of each problem and keeps the best ones.
///
/// Assignments are visited in odometer order (first variable node fastest),
/// each one scored as a change from its predecessor. Problems whose search
/// space exceeds `max_assignments` are refused rather than truncated.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExhaustiveOptimizer {
    /// Largest search space this optimizer will enumerate.
    pub max_assignments: f64,

    /// Best distinct solutions kept per problem.
    pub solutions_to_store_per_problem: usize,

    /// Worker threads, one problem per job. 0 = all available.
    pub threads: usize,
}

impl Default for ExhaustiveOptimizer {
    fn default() -> Self {
        Self {
            max_assignments: 1e7,
            solutions_to_store_per_problem: 10,
            threads: 0,
        }
    }
}

impl ExhaustiveOptimizer {
    pub const CLASS: &'static str = "ExhaustiveOptimizer";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_assignments(mut self, n: f64) -> Self {
        self.max_assignments = n;
        self
    }

    pub fn with_solutions_to_store_per_problem(mut self, n: usize) -> Self {
        self.solutions_to_store_per_problem = n;
        self
    }

    pub fn with_threads(mut self, n: usize) -> Self {
        self.threads = n;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.max_assignments >= 1.0) {
            return Err(OptimizationError::InvalidConfig(format!(
                "max_assignments must be at least 1, got {}",
                self.max_assignments
            )));
        }
        if self.solutions_to_store_per_problem == 0 {
            return Err(OptimizationError::InvalidConfig(
                "solutions_to_store_per_problem must be at least 1".into(),
            ));
        }
        Ok(())
    }

    fn enumerate(&self, problem: &dyn CostFunctionNetworkProblem) -> Result<SolutionCollector> {
        let space = problem.total_combinatorial_solutions()?;
        if space > self.max_assignments {
            return Err(OptimizationError::InvalidInput {
                class: Self::CLASS,
                operation: "run_optimizer",
                message: format!(
                    "{} has {space} assignments, more than the limit of {}",
                    problem.class_name(),
                    self.max_assignments
                ),
            });
        }

        let choices = problem.n_choices_at_variable_nodes()?;
        let mut scratch = problem.generate_scratch_space()?;
        let mut collector = SolutionCollector::new(self.solutions_to_store_per_problem);

        let mut current = vec![0usize; choices.len()];
        let mut score = problem.compute_absolute_score(&current, Some(&mut scratch))?;
        collector.offer(&current, score);

        let mut next = current.clone();
        let mut visited = 1usize;
        while advance(&mut next, choices) {
            score += problem.compute_score_change(&current, &next, Some(&mut scratch))?;
            scratch.accept_last_move();
            current.copy_from_slice(&next);
            collector.offer(&current, score);
            visited += 1;
        }

        debug!(event = "enumeration_finished", problem = problem.class_name(), visited);
        collector.rescore(|assignment| problem.compute_absolute_score(assignment, None))?;
        Ok(collector)
    }
}

/// Steps `assignment` to its odometer successor. False once every
/// assignment has been produced.
fn advance(assignment: &mut [usize], choices: &[(usize, usize)]) -> bool {
    for (value, &(_, n_choices)) in assignment.iter_mut().zip(choices) {
        *value += 1;
        if *value < n_choices {
            return true;
        }
        *value = 0;
    }
    false
}

impl CostFunctionNetworkOptimizer for ExhaustiveOptimizer {
    fn class_name(&self) -> &'static str {
        Self::CLASS
    }

    fn run_cost_function_network_optimizer(
        &self,
        problems: &[&dyn CostFunctionNetworkProblem],
    ) -> Result<Vec<Vec<CostFunctionNetworkSolution>>> {
        self.validate()?;
        let outcome = WorkExecutor::new().execute(self.threads, problems.to_vec(), |problem| {
            self.enumerate(problem).map(SolutionCollector::into_solutions)
        })?;
        info!(
            event = "exhaustive_finished",
            problems = problems.len(),
            threads = outcome.summary.threads_used,
            elapsed_ms = outcome.summary.elapsed.as_millis() as u64
        );
        outcome.into_results()
    }
}
