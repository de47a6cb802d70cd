//! Solution trait and the real-valued solution.

use crate::problem::ProblemCategory;
use std::any::Any;
use std::fmt::Debug;

/// A scored result produced by an optimizer. Immutable once created.
pub trait OptimizationSolution: Send + Sync + Debug {
    fn class_name(&self) -> &'static str;

    /// Kind of problem this solves.
    fn category(&self) -> ProblemCategory;

    /// Lower is better.
    fn score(&self) -> f64;

    /// Downcast access to the concrete solution.
    fn as_any(&self) -> &dyn Any;

    fn deep_clone(&self) -> Box<dyn OptimizationSolution>;
}

/// A point found by a local minimizer and its objective value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RealValuedLocalSolution {
    point: Vec<f64>,
    score: f64,
}

impl RealValuedLocalSolution {
    pub fn new(point: Vec<f64>, score: f64) -> Self {
        Self { point, score }
    }

    pub fn point(&self) -> &[f64] {
        &self.point
    }
}

impl OptimizationSolution for RealValuedLocalSolution {
    fn class_name(&self) -> &'static str {
        "RealValuedLocalSolution"
    }

    fn category(&self) -> ProblemCategory {
        ProblemCategory::RealValuedLocal
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
