//! Continuous problems minimized locally from starting points.

use super::lifecycle;
use super::types::{OptimizationProblem, ProblemCategory};
use crate::error::{OptimizationError, Result};
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

const CLASS: &str = "RealValuedLocalOptimizationProblem";

/// Objective function `f(x)`.
pub type Objective = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// Gradient `∇f(x)`, same length as `x`.
pub type Gradient = Arc<dyn Fn(&[f64]) -> Vec<f64> + Send + Sync>;

#[derive(Clone, Default)]
struct Builder {
    objective: Option<Objective>,
    gradient: Option<Gradient>,
    starting_points: Vec<Vec<f64>>,
}

#[derive(Clone)]
struct Frozen {
    objective: Objective,
    gradient: Option<Gradient>,
    starting_points: Vec<Vec<f64>>,
    dimension: usize,
}

/// A real-valued function to be minimized from one or more starting points.
///
/// # Examples
///
/// ```
/// use u_cfnopt::problem::{OptimizationProblem, RealValuedLocalOptimizationProblem};
///
/// let problem = RealValuedLocalOptimizationProblem::new();
/// problem.set_objective(|x: &[f64]| x.iter().map(|v| v * v).sum()).unwrap();
/// problem.add_starting_point(vec![1.0, 2.0]).unwrap();
/// problem.finalize().unwrap();
/// assert_eq!(problem.evaluate(&[1.0, 2.0]).unwrap(), 5.0);
/// ```
#[derive(Default)]
pub struct RealValuedLocalOptimizationProblem {
    builder: Mutex<Builder>,
    frozen: OnceLock<Frozen>,
}

impl fmt::Debug for RealValuedLocalOptimizationProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(CLASS)
            .field("finalized", &self.finalized())
            .field("dimension", &self.frozen.get().map(|frozen| frozen.dimension))
            .finish_non_exhaustive()
    }
}

impl RealValuedLocalOptimizationProblem {
    pub fn new() -> Self {
        Self::default()
    }

    fn frozen(&self, operation: &'static str) -> Result<&Frozen> {
        lifecycle::frozen(&self.frozen, CLASS, operation)
    }

    pub fn set_objective<F>(&self, objective: F) -> Result<()>
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        let mut builder =
            lifecycle::lock_unfinalized(&self.builder, &self.frozen, CLASS, "set_objective")?;
        builder.objective = Some(Arc::new(objective));
        Ok(())
    }

    pub fn set_gradient<G>(&self, gradient: G) -> Result<()>
    where
        G: Fn(&[f64]) -> Vec<f64> + Send + Sync + 'static,
    {
        let mut builder =
            lifecycle::lock_unfinalized(&self.builder, &self.frozen, CLASS, "set_gradient")?;
        builder.gradient = Some(Arc::new(gradient));
        Ok(())
    }

    pub fn add_starting_point(&self, point: Vec<f64>) -> Result<()> {
        lifecycle::lock_unfinalized(&self.builder, &self.frozen, CLASS, "add_starting_point")?
            .starting_points
            .push(point);
        Ok(())
    }

    /// Number of coordinates of every point.
    pub fn dimension(&self) -> Result<usize> {
        Ok(self.frozen("dimension")?.dimension)
    }

    pub fn starting_points(&self) -> Result<&[Vec<f64>]> {
        Ok(&self.frozen("starting_points")?.starting_points)
    }

    pub fn has_gradient(&self) -> bool {
        self.frozen
            .get()
            .is_some_and(|frozen| frozen.gradient.is_some())
    }

    fn check_dimension(&self, operation: &'static str, x: &[f64]) -> Result<&Frozen> {
        let frozen = self.frozen(operation)?;
        if x.len() != frozen.dimension {
            return Err(OptimizationError::SizeMismatch {
                class: CLASS,
                operation,
                expected: frozen.dimension,
                found: x.len(),
            });
        }
        Ok(frozen)
    }

    /// Objective value at `x`.
    pub fn evaluate(&self, x: &[f64]) -> Result<f64> {
        let frozen = self.check_dimension("evaluate", x)?;
        Ok((frozen.objective)(x))
    }

    /// Gradient at `x`, or `None` when no gradient was supplied.
    pub fn gradient(&self, x: &[f64]) -> Result<Option<Vec<f64>>> {
        let frozen = self.check_dimension("gradient", x)?;
        Ok(frozen.gradient.as_ref().map(|gradient| gradient(x)))
    }
}

impl OptimizationProblem for RealValuedLocalOptimizationProblem {
    fn class_name(&self) -> &'static str {
        CLASS
    }

    fn category(&self) -> ProblemCategory {
        ProblemCategory::RealValuedLocal
    }

    fn finalize(&self) -> Result<()> {
        let builder = lifecycle::lock_for_finalize(&self.builder, &self.frozen, CLASS)?;
        let objective = builder
            .objective
            .clone()
            .ok_or_else(|| OptimizationError::InvalidInput {
                class: CLASS,
                operation: "finalize",
                message: "no objective function was set".into(),
            })?;
        let dimension = match builder.starting_points.first() {
            Some(point) => point.len(),
            None => {
                return Err(OptimizationError::InvalidInput {
                    class: CLASS,
                    operation: "finalize",
                    message: "at least one starting point is required".into(),
                })
            }
        };
        if let Some(bad) = builder
            .starting_points
            .iter()
            .find(|point| point.len() != dimension)
        {
            return Err(OptimizationError::SizeMismatch {
                class: CLASS,
                operation: "finalize",
                expected: dimension,
                found: bad.len(),
            });
        }
        let frozen = Frozen {
            objective,
            gradient: builder.gradient.clone(),
            starting_points: builder.starting_points.clone(),
            dimension,
        };
        lifecycle::publish(&self.frozen, frozen, CLASS)?;
        tracing::debug!(
            event = "problem_finalized",
            class = CLASS,
            dimension,
            starting_points = builder.starting_points.len()
        );
        Ok(())
    }

    fn finalized(&self) -> bool {
        self.frozen.get().is_some()
    }

    fn reset(&mut self) {
        *self.builder.get_mut().unwrap_or_else(PoisonError::into_inner) = Builder::default();
        self.frozen.take();
    }

    fn deep_clone(&self) -> Box<dyn OptimizationProblem> {
        Box::new(Self {
            builder: Mutex::new(lifecycle::lock(&self.builder).clone()),
            frozen: lifecycle::clone_frozen(&self.frozen),
        })
    }

    fn as_real_valued_local(&self) -> Option<&RealValuedLocalOptimizationProblem> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere() -> RealValuedLocalOptimizationProblem {
        let problem = RealValuedLocalOptimizationProblem::new();
        problem
            .set_objective(|x: &[f64]| x.iter().map(|v| v * v).sum())
            .unwrap();
        problem
            .set_gradient(|x: &[f64]| x.iter().map(|v| 2.0 * v).collect())
            .unwrap();
        problem.add_starting_point(vec![1.0, -1.0, 0.5]).unwrap();
        problem
    }

    #[test]
    fn test_lifecycle() {
        let mut problem = sphere();
        assert!(!problem.finalized());
        assert!(problem.evaluate(&[0.0, 0.0, 0.0]).is_err());
        problem.finalize().unwrap();
        assert!(matches!(
            problem.finalize(),
            Err(OptimizationError::AlreadyFinalized { .. })
        ));
        assert!(matches!(
            problem.add_starting_point(vec![0.0; 3]),
            Err(OptimizationError::Finalized { .. })
        ));
        assert_eq!(problem.dimension().unwrap(), 3);
        assert_eq!(problem.gradient(&[1.0, 2.0, 3.0]).unwrap(), Some(vec![2.0, 4.0, 6.0]));

        problem.reset();
        assert!(!problem.finalized());
        assert!(problem.finalize().is_err(), "objective was cleared by reset");
        problem.set_objective(|x: &[f64]| x[0]).unwrap();
        problem.add_starting_point(vec![4.0]).unwrap();
        problem.finalize().unwrap();
        assert_eq!(problem.evaluate(&[4.0]).unwrap(), 4.0);
    }

    #[test]
    fn test_finalize_validates_starting_points() {
        let problem = sphere();
        problem.add_starting_point(vec![1.0]).unwrap();
        assert!(matches!(
            problem.finalize(),
            Err(OptimizationError::SizeMismatch { expected: 3, found: 1, .. })
        ));
        assert!(!problem.finalized());
    }

    #[test]
    fn test_evaluate_checks_dimension() {
        let problem = sphere();
        problem.finalize().unwrap();
        assert!(matches!(
            problem.evaluate(&[1.0]),
            Err(OptimizationError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_deep_clone_keeps_state() {
        let problem = sphere();
        let unfinalized = problem.deep_clone();
        problem.finalize().unwrap();
        let finalized = problem.deep_clone();
        assert!(!unfinalized.finalized());
        assert!(finalized.finalized());
        let rv = finalized.as_real_valued_local().unwrap();
        assert_eq!(rv.evaluate(&[1.0, 1.0, 1.0]).unwrap(), 3.0);
        assert!(finalized.as_cost_function_network().is_none());
    }
}
