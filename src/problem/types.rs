//! Core problem trait and categories.

use crate::cfn::CostFunctionNetworkProblem;
use crate::error::Result;
use std::fmt::{self, Debug};

use super::real_valued::RealValuedLocalOptimizationProblem;

/// The broad kind of a problem, solution or optimizer.
///
/// Containers restricted to a category reject objects of any other kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProblemCategory {
    /// Discrete choice-per-node problems.
    CostFunctionNetwork,
    /// Continuous problems solved by local minimization from starting points.
    RealValuedLocal,
}

impl ProblemCategory {
    /// Name of the problem class that represents this category.
    pub fn problem_class_name(&self) -> &'static str {
        match self {
            ProblemCategory::CostFunctionNetwork => "CostFunctionNetworkOptimizationProblem",
            ProblemCategory::RealValuedLocal => "RealValuedLocalOptimizationProblem",
        }
    }
}

impl fmt::Display for ProblemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemCategory::CostFunctionNetwork => f.write_str("CostFunctionNetwork"),
            ProblemCategory::RealValuedLocal => f.write_str("RealValuedLocal"),
        }
    }
}

/// An optimization problem with a one-way finalize lifecycle.
///
/// A problem is built up through its concrete setters while unfinalized.
/// [`finalize`](Self::finalize) precomputes everything the optimizers need
/// and freezes the problem; afterwards it is read-only and may be shared
/// between threads. [`reset`](Self::reset) discards all data and returns it
/// to the unfinalized state.
///
/// Setters and `finalize` take `&self` and serialize through an internal
/// lock, so a problem behind an `Arc` can still be populated.
pub trait OptimizationProblem: Send + Sync + Debug {
    /// Name used in error messages and by the creator registry.
    fn class_name(&self) -> &'static str;

    fn category(&self) -> ProblemCategory;

    /// Precomputes derived data and freezes the problem.
    ///
    /// Fails with [`OptimizationError::AlreadyFinalized`](crate::OptimizationError::AlreadyFinalized)
    /// on a second call.
    fn finalize(&self) -> Result<()>;

    fn finalized(&self) -> bool;

    /// Clears all data, leaving an empty unfinalized problem.
    fn reset(&mut self);

    /// Fully independent copy in the same lifecycle state.
    fn deep_clone(&self) -> Box<dyn OptimizationProblem>;

    /// Runtime check for the cost-function-network interface.
    fn as_cost_function_network(&self) -> Option<&dyn CostFunctionNetworkProblem> {
        None
    }

    /// Runtime check for the real-valued local interface.
    fn as_real_valued_local(&self) -> Option<&RealValuedLocalOptimizationProblem> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_names() {
        assert_eq!(
            ProblemCategory::CostFunctionNetwork.problem_class_name(),
            "CostFunctionNetworkOptimizationProblem"
        );
        assert_eq!(ProblemCategory::RealValuedLocal.to_string(), "RealValuedLocal");
    }
}
