//! Monte Carlo optimizer configuration.

use crate::annealing::CoolingSchedule;
use crate::error::{OptimizationError, Result};

/// Configuration for [`MonteCarloOptimizer`](super::MonteCarloOptimizer).
///
/// # Examples
///
/// ```
/// use u_cfnopt::annealing::CoolingSchedule;
/// use u_cfnopt::optimizer::MonteCarloConfig;
///
/// let config = MonteCarloConfig::default()
///     .with_attempts_per_problem(8)
///     .with_threads(4)
///     .with_annealing_steps_per_attempt(5_000)
///     .with_cooling(CoolingSchedule::LundyMees {
///         initial_temperature: 50.0,
///         final_temperature: 0.1,
///     })
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MonteCarloConfig {
    /// Independent annealing trajectories per problem.
    pub attempts_per_problem: usize,

    /// Worker threads shared by all attempts. 0 = all available.
    pub threads: usize,

    /// Proposed moves per attempt.
    pub annealing_steps_per_attempt: usize,

    /// Best distinct solutions kept per problem.
    pub solutions_to_store_per_problem: usize,

    /// Temperature curve of every attempt.
    pub cooling: CoolingSchedule,

    /// Random seed for reproducibility. Attempt `k` uses `seed + k`.
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            attempts_per_problem: 4,
            threads: 0,
            annealing_steps_per_attempt: 10_000,
            solutions_to_store_per_problem: 10,
            cooling: CoolingSchedule::default(),
            seed: None,
        }
    }
}

impl MonteCarloConfig {
    pub fn with_attempts_per_problem(mut self, n: usize) -> Self {
        self.attempts_per_problem = n;
        self
    }

    pub fn with_threads(mut self, n: usize) -> Self {
        self.threads = n;
        self
    }

    pub fn with_annealing_steps_per_attempt(mut self, n: usize) -> Self {
        self.annealing_steps_per_attempt = n;
        self
    }

    pub fn with_solutions_to_store_per_problem(mut self, n: usize) -> Self {
        self.solutions_to_store_per_problem = n;
        self
    }

    pub fn with_cooling(mut self, cooling: CoolingSchedule) -> Self {
        self.cooling = cooling;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.attempts_per_problem == 0 {
            return Err(OptimizationError::InvalidConfig(
                "attempts_per_problem must be at least 1".into(),
            ));
        }
        if self.solutions_to_store_per_problem == 0 {
            return Err(OptimizationError::InvalidConfig(
                "solutions_to_store_per_problem must be at least 1".into(),
            ));
        }
        self.cooling.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MonteCarloConfig::default();
        assert_eq!(config.attempts_per_problem, 4);
        assert_eq!(config.threads, 0);
        assert_eq!(config.solutions_to_store_per_problem, 10);
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_attempts() {
        let config = MonteCarloConfig::default().with_attempts_per_problem(0);
        assert!(matches!(config.validate(), Err(OptimizationError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_zero_solutions() {
        let config = MonteCarloConfig::default().with_solutions_to_store_per_problem(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_cooling() {
        let config = MonteCarloConfig::default().with_cooling(CoolingSchedule::Geometric {
            initial_temperature: -1.0,
            final_temperature: 0.1,
        });
        assert!(config.validate().is_err());
    }
}
