//! Monte Carlo annealing loop.

use super::config::MonteCarloConfig;
use crate::cfn::{CostFunctionNetworkProblem, CostFunctionNetworkSolution};
use crate::error::Result;
use crate::optimizer::collector::SolutionCollector;
use crate::optimizer::types::CostFunctionNetworkOptimizer;
use crate::threads::WorkExecutor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

/// Simulated annealing over cost function networks.
///
/// Every attempt walks from a starting assignment by changing one variable
/// node at a time, scoring each move incrementally against its own scratch
/// space and accepting it with the Metropolis criterion at the schedule's
/// current temperature. Attempts of all problems share one thread pool.
///
/// # Examples
///
/// ```
/// use u_cfnopt::cfn::{CostFunctionNetworkOptimizationProblem, ChoicePenaltySumCostFunction};
/// use u_cfnopt::optimizer::{MonteCarloConfig, MonteCarloOptimizer, Optimizer};
/// use u_cfnopt::problem::{OptimizationProblem, OptimizationProblems};
/// use u_cfnopt::solution::OptimizationSolution;
/// use std::sync::Arc;
///
/// let mut penalties: ChoicePenaltySumCostFunction = ChoicePenaltySumCostFunction::new();
/// penalties.set_penalties_for_all_choices_at_node(0, vec![3.0, 1.0, 2.0]).unwrap();
/// let problem = CostFunctionNetworkOptimizationProblem::new();
/// problem.set_minimum_number_of_choices_at_node(0, 3).unwrap();
/// problem.add_cost_function(Box::new(penalties)).unwrap();
/// problem.finalize().unwrap();
///
/// let mut problems = OptimizationProblems::new();
/// problems.add_optimization_problem(Arc::new(problem)).unwrap();
///
/// let optimizer = MonteCarloOptimizer::new(MonteCarloConfig::default().with_seed(7)).unwrap();
/// let solutions = optimizer.run_optimizer(&problems).unwrap();
/// assert_eq!(solutions[0].solution(0).unwrap().score(), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct MonteCarloOptimizer {
    config: MonteCarloConfig,
}

impl MonteCarloOptimizer {
    pub const CLASS: &'static str = "MonteCarloOptimizer";

    /// Creates an optimizer, rejecting an invalid configuration.
    pub fn new(config: MonteCarloConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    /// Runs one annealing trajectory.
    fn run_attempt(
        &self,
        problem: &dyn CostFunctionNetworkProblem,
        attempt: usize,
        seed: u64,
    ) -> Result<SolutionCollector> {
        let config = &self.config;
        let choices = problem.n_choices_at_variable_nodes()?;
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(attempt as u64));
        let mut scratch = problem.generate_scratch_space()?;
        let schedule = config.cooling.build(config.annealing_steps_per_attempt.max(1))?;
        let mut collector = SolutionCollector::new(config.solutions_to_store_per_problem);

        let starts = problem.candidate_solutions()?;
        let mut current: Vec<usize> = if starts.is_empty() {
            choices.iter().map(|&(_, n)| rng.random_range(0..n)).collect()
        } else {
            starts[attempt % starts.len()].clone()
        };
        let mut current_score = problem.compute_absolute_score(&current, Some(&mut scratch))?;
        collector.offer(&current, current_score);
        if choices.is_empty() {
            return Ok(collector);
        }

        let mut proposal = current.clone();
        let mut accepted = 0usize;
        let mut improving = 0usize;
        for _ in 0..config.annealing_steps_per_attempt {
            let temperature = schedule.temperature()?;
            let position = rng.random_range(0..choices.len());
            let n_choices = choices[position].1;
            proposal[position] = (current[position] + rng.random_range(1..n_choices)) % n_choices;

            let delta = problem.compute_score_change(&current, &proposal, Some(&mut scratch))?;

            // Metropolis acceptance criterion
            let accept = if delta <= 0.0 {
                if delta < 0.0 {
                    improving += 1;
                }
                true
            } else if temperature > 0.0 {
                rng.random_range(0.0..1.0) < (-delta / temperature).exp()
            } else {
                false
            };

            if accept {
                scratch.accept_last_move();
                current[position] = proposal[position];
                current_score += delta;
                accepted += 1;
                collector.offer(&current, current_score);
            } else {
                proposal[position] = current[position];
            }
        }

        debug!(
            event = "attempt_finished",
            attempt,
            steps = config.annealing_steps_per_attempt,
            accepted,
            improving,
            stored = collector.len(),
            final_score = current_score
        );
        Ok(collector)
    }
}

impl CostFunctionNetworkOptimizer for MonteCarloOptimizer {
    fn class_name(&self) -> &'static str {
        Self::CLASS
    }

    fn run_cost_function_network_optimizer(
        &self,
        problems: &[&dyn CostFunctionNetworkProblem],
    ) -> Result<Vec<Vec<CostFunctionNetworkSolution>>> {
        let config = &self.config;
        let seed = config.seed.unwrap_or_else(rand::random);
        let jobs: Vec<(usize, usize)> = (0..problems.len())
            .flat_map(|p| (0..config.attempts_per_problem).map(move |a| (p, a)))
            .collect();

        let outcome = WorkExecutor::new().execute(config.threads, jobs, |(p, attempt)| {
            self.run_attempt(problems[p], attempt, seed)
                .map(|collector| (p, collector))
        })?;
        info!(
            event = "monte_carlo_finished",
            problems = problems.len(),
            attempts = outcome.summary.jobs,
            threads = outcome.summary.threads_used,
            elapsed_ms = outcome.summary.elapsed.as_millis() as u64
        );

        let mut merged: Vec<SolutionCollector> = (0..problems.len())
            .map(|_| SolutionCollector::new(config.solutions_to_store_per_problem))
            .collect();
        for (p, collector) in outcome.into_results()? {
            merged[p].merge(collector);
        }

        problems
            .iter()
            .zip(merged)
            .map(|(problem, mut collector)| {
                collector.rescore(|assignment| problem.compute_absolute_score(assignment, None))?;
                Ok(collector.into_solutions())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annealing::CoolingSchedule;
    use crate::cfn::fixtures::three_node_problem;
    use crate::cfn::CostFunctionNetworkOptimizationProblem;
    use crate::error::OptimizationError;
    use crate::optimizer::Optimizer;
    use crate::problem::{OptimizationProblem, OptimizationProblems, RealValuedLocalOptimizationProblem};
    use crate::solution::OptimizationSolution;
    use std::sync::Arc;

    fn config() -> MonteCarloConfig {
        MonteCarloConfig::default()
            .with_attempts_per_problem(4)
            .with_threads(2)
            .with_annealing_steps_per_attempt(2_000)
            .with_solutions_to_store_per_problem(3)
            .with_cooling(CoolingSchedule::Geometric {
                initial_temperature: 20.0,
                final_temperature: 0.05,
            })
            .with_seed(42)
    }

    fn network(problem: &dyn CostFunctionNetworkProblem) -> &dyn CostFunctionNetworkProblem {
        problem
    }

    fn finalized_three_node() -> Arc<dyn OptimizationProblem> {
        let problem = three_node_problem();
        problem.finalize().unwrap();
        Arc::new(problem)
    }

    #[test]
    fn test_finds_known_optimum() {
        let mut problems = OptimizationProblems::new();
        problems.add_optimization_problem(finalized_three_node()).unwrap();

        let optimizer = MonteCarloOptimizer::new(config()).unwrap();
        let solutions = optimizer.run_optimizer(&problems).unwrap();
        assert_eq!(solutions.len(), 1);
        let best = solutions[0].solution(0).unwrap();
        let best = best
            .as_any()
            .downcast_ref::<CostFunctionNetworkSolution>()
            .unwrap();
        assert_eq!(best.assignment(), &[2, 2, 1]);
        assert!((best.score() - 6.0).abs() < 1e-9);
        assert!(best.times_seen() >= 1);

        let second = solutions[0].solution(1).unwrap();
        assert!((second.score() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_solutions_sorted_and_distinct() {
        let optimizer = MonteCarloOptimizer::new(config().with_solutions_to_store_per_problem(5)).unwrap();
        let problem = three_node_problem();
        problem.finalize().unwrap();
        let solutions = optimizer
            .run_cost_function_network_optimizer(&[&problem as &dyn CostFunctionNetworkProblem])
            .unwrap();
        let found = &solutions[0];
        assert_eq!(found.len(), 5);
        assert!(found.windows(2).all(|w| w[0].score() <= w[1].score()));
        for (i, a) in found.iter().enumerate() {
            for b in &found[i + 1..] {
                assert_ne!(a.assignment(), b.assignment());
            }
            let exact = problem.compute_absolute_score(a.assignment(), None).unwrap();
            assert!((a.score() - exact).abs() < 1e-9);
        }
    }

    #[test]
    fn test_same_seed_same_result() {
        let problem = three_node_problem();
        problem.finalize().unwrap();
        let optimizer = MonteCarloOptimizer::new(config().with_annealing_steps_per_attempt(50)).unwrap();
        let a = optimizer.run_cost_function_network_optimizer(&[network(&problem)]).unwrap();
        let b = optimizer.run_cost_function_network_optimizer(&[network(&problem)]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_starts_from_candidate_solution() {
        let problem = three_node_problem();
        problem.add_candidate_solution(vec![0, 1, 0]).unwrap();
        problem.finalize().unwrap();
        let optimizer = MonteCarloOptimizer::new(
            config()
                .with_attempts_per_problem(1)
                .with_annealing_steps_per_attempt(0)
                .with_solutions_to_store_per_problem(1),
        )
        .unwrap();
        let solutions = optimizer.run_cost_function_network_optimizer(&[network(&problem)]).unwrap();
        assert_eq!(solutions[0][0].assignment(), &[0, 1, 0]);
    }

    #[test]
    fn test_problem_without_variable_nodes() {
        let problem = CostFunctionNetworkOptimizationProblem::new();
        problem.set_minimum_number_of_choices_at_node(0, 1).unwrap();
        problem.finalize().unwrap();
        let optimizer = MonteCarloOptimizer::new(config()).unwrap();
        let solutions = optimizer.run_cost_function_network_optimizer(&[network(&problem)]).unwrap();
        assert_eq!(solutions[0].len(), 1);
        assert!(solutions[0][0].assignment().is_empty());
        assert_eq!(solutions[0][0].times_seen(), 4);
    }

    #[test]
    fn test_rejects_real_valued_problem() {
        let real = RealValuedLocalOptimizationProblem::new();
        real.set_objective(|x: &[f64]| x[0] * x[0]).unwrap();
        real.add_starting_point(vec![1.0]).unwrap();
        real.finalize().unwrap();
        let mut problems = OptimizationProblems::new();
        problems.add_optimization_problem(Arc::new(real)).unwrap();

        let optimizer = MonteCarloOptimizer::new(config()).unwrap();
        let err = optimizer.run_optimizer(&problems).unwrap_err();
        assert!(matches!(
            err,
            OptimizationError::TypeMismatch { class: "MonteCarloOptimizer", .. }
        ));
    }

    #[test]
    fn test_rejects_unfinalized_problem() {
        let mut problems = OptimizationProblems::new();
        problems
            .add_optimization_problem(Arc::new(three_node_problem()))
            .unwrap();
        let optimizer = MonteCarloOptimizer::new(config()).unwrap();
        assert!(matches!(
            optimizer.run_optimizer(&problems),
            Err(OptimizationError::NotFinalized { .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(MonteCarloOptimizer::new(MonteCarloConfig::default().with_attempts_per_problem(0)).is_err());
    }
}
