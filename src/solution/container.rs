//! Ordered collection of solutions for one problem.

use super::types::OptimizationSolution;
use crate::error::{OptimizationError, Result};
use crate::problem::ProblemCategory;
use std::cmp::Ordering;
use std::sync::Arc;

const CLASS: &str = "OptimizationSolutions";

/// Ascending by score, NaN after every number.
fn score_order(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => Ordering::Equal,
    }
}

/// The solutions an optimizer found for one problem.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use u_cfnopt::cfn::CostFunctionNetworkSolution;
/// use u_cfnopt::problem::ProblemCategory;
/// use u_cfnopt::solution::{OptimizationSolution, OptimizationSolutions};
///
/// let mut solutions = OptimizationSolutions::for_category(ProblemCategory::CostFunctionNetwork);
/// for score in [3.0, 1.0, 2.0] {
///     solutions
///         .add_optimization_solution(Arc::new(CostFunctionNetworkSolution::new(vec![], score)))
///         .unwrap();
/// }
/// solutions.sort_by_score();
/// assert_eq!(solutions.solution(0).unwrap().score(), 1.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct OptimizationSolutions {
    category: Option<ProblemCategory>,
    solutions: Vec<Arc<dyn OptimizationSolution>>,
}

impl OptimizationSolutions {
    /// Unrestricted container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Container that only accepts solutions of `category`.
    pub fn for_category(category: ProblemCategory) -> Self {
        Self {
            category: Some(category),
            solutions: Vec::new(),
        }
    }

    pub fn category(&self) -> Option<ProblemCategory> {
        self.category
    }

    /// Appends a solution, rejecting the wrong kind on a restricted container.
    pub fn add_optimization_solution(&mut self, solution: Arc<dyn OptimizationSolution>) -> Result<()> {
        if let Some(category) = self.category {
            if solution.category() != category {
                return Err(OptimizationError::TypeMismatch {
                    class: CLASS,
                    operation: "add_optimization_solution",
                    expected: format!("a {category} solution"),
                    found: solution.class_name().to_string(),
                });
            }
        }
        self.solutions.push(solution);
        Ok(())
    }

    pub fn n_solutions(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    pub fn solution(&self, index: usize) -> Result<&Arc<dyn OptimizationSolution>> {
        self.solutions
            .get(index)
            .ok_or(OptimizationError::IndexOutOfRange {
                class: CLASS,
                operation: "solution",
                index,
                len: self.solutions.len(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn OptimizationSolution>> + '_ {
        self.solutions.iter()
    }

    /// Removes every solution. The category restriction is kept.
    pub fn reset(&mut self) {
        self.solutions.clear();
    }

    /// Sorts from lowest to highest score.
    ///
    /// The sort is stable: equal scores keep their insertion order. NaN
    /// scores sort after every number.
    pub fn sort_by_score(&mut self) {
        self.solutions
            .sort_by(|a, b| score_order(a.score(), b.score()));
    }

    /// Copy whose solutions are deep clones, sharing nothing with `self`.
    pub fn deep_clone(&self) -> Self {
        let mut copy = self.clone();
        copy.make_independent();
        copy
    }

    /// Replaces every shared solution with a private deep clone.
    pub fn make_independent(&mut self) {
        for solution in &mut self.solutions {
            *solution = Arc::from(solution.deep_clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfn::CostFunctionNetworkSolution;
    use crate::solution::RealValuedLocalSolution;
    use proptest::prelude::*;

    fn cfn(tag: usize, score: f64) -> Arc<dyn OptimizationSolution> {
        Arc::new(CostFunctionNetworkSolution::new(vec![tag], score))
    }

    fn tags(solutions: &OptimizationSolutions) -> Vec<usize> {
        solutions
            .iter()
            .map(|s| {
                s.as_any()
                    .downcast_ref::<CostFunctionNetworkSolution>()
                    .unwrap()
                    .assignment()[0]
            })
            .collect()
    }

    #[test]
    fn test_category_restriction() {
        let mut solutions = OptimizationSolutions::for_category(ProblemCategory::CostFunctionNetwork);
        solutions.add_optimization_solution(cfn(0, 1.0)).unwrap();
        let err = solutions
            .add_optimization_solution(Arc::new(RealValuedLocalSolution::new(vec![0.0], 1.0)))
            .unwrap_err();
        assert!(matches!(err, OptimizationError::TypeMismatch { .. }));
        assert_eq!(solutions.n_solutions(), 1);

        let mut mixed = OptimizationSolutions::new();
        mixed.add_optimization_solution(cfn(0, 1.0)).unwrap();
        mixed
            .add_optimization_solution(Arc::new(RealValuedLocalSolution::new(vec![0.0], 1.0)))
            .unwrap();
        assert_eq!(mixed.n_solutions(), 2);
    }

    #[test]
    fn test_bounds_checked_access() {
        let mut solutions = OptimizationSolutions::new();
        assert!(matches!(
            solutions.solution(0),
            Err(OptimizationError::IndexOutOfRange { index: 0, len: 0, .. })
        ));
        solutions.add_optimization_solution(cfn(0, 1.0)).unwrap();
        assert!(solutions.solution(0).is_ok());
        solutions.reset();
        assert!(solutions.is_empty());
    }

    #[test]
    fn test_sort_is_stable() {
        let mut solutions = OptimizationSolutions::new();
        for (tag, score) in [(0, 2.0), (1, 1.0), (2, 2.0), (3, 1.0), (4, 0.5)] {
            solutions.add_optimization_solution(cfn(tag, score)).unwrap();
        }
        solutions.sort_by_score();
        assert_eq!(tags(&solutions), vec![4, 1, 3, 0, 2]);
    }

    #[test]
    fn test_nan_sorts_last() {
        let mut solutions = OptimizationSolutions::new();
        for (tag, score) in [(0, f64::NAN), (1, 3.0), (2, f64::NEG_INFINITY), (3, f64::NAN)] {
            solutions.add_optimization_solution(cfn(tag, score)).unwrap();
        }
        solutions.sort_by_score();
        assert_eq!(tags(&solutions), vec![2, 1, 0, 3]);
    }

    #[test]
    fn test_deep_clone_breaks_sharing() {
        let shared = cfn(7, 1.0);
        let mut solutions = OptimizationSolutions::new();
        solutions.add_optimization_solution(shared.clone()).unwrap();
        let copy = solutions.deep_clone();
        assert!(!Arc::ptr_eq(copy.solution(0).unwrap(), &shared));
        assert_eq!(tags(&copy), vec![7]);
        solutions.make_independent();
        assert_eq!(Arc::strong_count(&shared), 1);
    }

    proptest! {
        #[test]
        fn prop_sort_orders_and_is_idempotent(scores in prop::collection::vec(-100i32..100, 0..40)) {
            let mut solutions = OptimizationSolutions::new();
            for (tag, &score) in scores.iter().enumerate() {
                solutions.add_optimization_solution(cfn(tag, score as f64)).unwrap();
            }
            solutions.sort_by_score();
            let sorted: Vec<f64> = solutions.iter().map(|s| s.score()).collect();
            prop_assert!(sorted.windows(2).all(|w| w[0] <= w[1]));

            let order = tags(&solutions);
            for w in order.windows(2) {
                if scores[w[0]] == scores[w[1]] {
                    prop_assert!(w[0] < w[1]);
                }
            }

            solutions.sort_by_score();
            prop_assert_eq!(tags(&solutions), order);
        }
    }
}
