//! Solutions to cost function network problems.

use crate::problem::ProblemCategory;
use crate::solution::OptimizationSolution;
use std::any::Any;

/// One choice per variable node, its score, and how often an optimizer
/// reached it.
///
/// # Examples
///
/// ```
/// use u_cfnopt::cfn::CostFunctionNetworkSolution;
/// use u_cfnopt::solution::OptimizationSolution;
///
/// let solution = CostFunctionNetworkSolution::new(vec![2, 2, 1], 6.0).with_times_seen(3);
/// assert_eq!(solution.assignment(), &[2, 2, 1]);
/// assert_eq!(solution.score(), 6.0);
/// assert_eq!(solution.times_seen(), 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CostFunctionNetworkSolution {
    assignment: Vec<usize>,
    score: f64,
    times_seen: usize,
}

impl CostFunctionNetworkSolution {
    pub fn new(assignment: Vec<usize>, score: f64) -> Self {
        Self {
            assignment,
            score,
            times_seen: 1,
        }
    }

    pub fn with_times_seen(mut self, times_seen: usize) -> Self {
        self.times_seen = times_seen;
        self
    }

    /// Choice at each variable node, by variable-node position.
    pub fn assignment(&self) -> &[usize] {
        &self.assignment
    }

    pub fn times_seen(&self) -> usize {
        self.times_seen
    }
}

impl OptimizationSolution for CostFunctionNetworkSolution {
    fn class_name(&self) -> &'static str {
        "CostFunctionNetworkSolution"
    }

    fn category(&self) -> ProblemCategory {
        ProblemCategory::CostFunctionNetwork
    }

    fn score(&self) -> f64 {
        self.score
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn deep_clone(&self) -> Box<dyn OptimizationSolution> {
        Box::new(self.clone())
    }
}
