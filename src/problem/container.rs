//! Ordered collection of problems handed to an optimizer.

use super::types::{OptimizationProblem, ProblemCategory};
use crate::error::{OptimizationError, Result};
use std::sync::Arc;

const CLASS: &str = "OptimizationProblems";

/// An ordered, optionally category-restricted list of shared problems.
///
/// Optimizers return one solution set per entry, in the same order.
#[derive(Debug, Clone, Default)]
pub struct OptimizationProblems {
    category: Option<ProblemCategory>,
    problems: Vec<Arc<dyn OptimizationProblem>>,
}

impl OptimizationProblems {
    /// Unrestricted container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Container that only accepts problems of `category`.
    pub fn for_category(category: ProblemCategory) -> Self {
        Self {
            category: Some(category),
            problems: Vec::new(),
        }
    }

    pub fn category(&self) -> Option<ProblemCategory> {
        self.category
    }

    /// Appends a problem, rejecting the wrong kind on a restricted container.
    pub fn add_optimization_problem(&mut self, problem: Arc<dyn OptimizationProblem>) -> Result<()> {
        if let Some(category) = self.category {
            if problem.category() != category {
                return Err(OptimizationError::TypeMismatch {
                    class: CLASS,
                    operation: "add_optimization_problem",
                    expected: category.problem_class_name().to_string(),
                    found: problem.class_name().to_string(),
                });
            }
        }
        self.problems.push(problem);
        Ok(())
    }

    pub fn n_problems(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn problem(&self, index: usize) -> Result<&Arc<dyn OptimizationProblem>> {
        self.problems
            .get(index)
            .ok_or(OptimizationError::IndexOutOfRange {
                class: CLASS,
                operation: "problem",
                index,
                len: self.problems.len(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn OptimizationProblem>> + '_ {
        self.problems.iter()
    }

    /// Removes every problem. The category restriction is kept.
    pub fn reset(&mut self) {
        self.problems.clear();
    }

    /// Copy whose problems are deep clones, sharing nothing with `self`.
    pub fn deep_clone(&self) -> Self {
        let mut copy = self.clone();
        copy.make_independent();
        copy
    }

    /// Replaces every shared problem with a private deep clone.
    pub fn make_independent(&mut self) {
        for problem in &mut self.problems {
            *problem = Arc::from(problem.deep_clone());
        }
    }
}
