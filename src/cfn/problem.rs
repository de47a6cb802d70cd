//! Cost function network problems.

use super::cost_function::CostFunction;
use super::scratch::CostFunctionNetworkScratchSpace;
use crate::error::{OptimizationError, Result};
use crate::problem::lifecycle;
use crate::problem::{OptimizationProblem, ProblemCategory};
use std::collections::BTreeMap;
use std::sync::{Mutex, OnceLock, PoisonError};
use tracing::debug;

const CLASS: &str = "CostFunctionNetworkOptimizationProblem";

/// The interface optimizers use to search a cost function network.
///
/// A candidate assignment holds one choice per *variable* node (a node with
/// at least two choices), ordered by ascending node index. Nodes with a single
/// choice are fixed and never appear in candidates.
pub trait CostFunctionNetworkProblem: OptimizationProblem {
    /// One more than the largest node index with any choices.
    fn total_nodes(&self) -> usize;

    fn total_variable_nodes(&self) -> Result<usize>;

    /// `(node index, number of choices)` for every variable node, ascending.
    fn n_choices_at_variable_nodes(&self) -> Result<&[(usize, usize)]>;

    /// Size of the search space, as a float since it overflows quickly.
    fn total_combinatorial_solutions(&self) -> Result<f64>;

    /// Starting points suggested to optimizers.
    fn candidate_solutions(&self) -> Result<&[Vec<usize>]>;

    /// Fresh scratch space for one solve attempt.
    fn generate_scratch_space(&self) -> Result<CostFunctionNetworkScratchSpace>;

    /// Full score of a candidate.
    ///
    /// With a scratch space, the caches are re-seated on `candidate`.
    fn compute_absolute_score(
        &self,
        candidate: &[usize],
        scratch: Option<&mut CostFunctionNetworkScratchSpace>,
    ) -> Result<f64>;

    /// `score(new) - score(old)`.
    ///
    /// With a scratch space, the move is staged and committed by
    /// [`CostFunctionNetworkScratchSpace::accept_last_move`].
    fn compute_score_change(
        &self,
        old_candidate: &[usize],
        new_candidate: &[usize],
        scratch: Option<&mut CostFunctionNetworkScratchSpace>,
    ) -> Result<f64>;
}

/// Setup data shared by every network problem.
#[derive(Debug, Default)]
pub(crate) struct NetworkBuilder {
    n_choices_by_node: BTreeMap<usize, usize>,
    cost_functions: Vec<Box<dyn CostFunction>>,
    candidate_solutions: Vec<Vec<usize>>,
}

impl Clone for NetworkBuilder {
    fn clone(&self) -> Self {
        Self {
            n_choices_by_node: self.n_choices_by_node.clone(),
            cost_functions: self.cost_functions.iter().map(|cf| cf.deep_clone()).collect(),
            candidate_solutions: self.candidate_solutions.clone(),
        }
    }
}

impl NetworkBuilder {
    /// Grows the choice count of `node` to at least `n_choices`.
    pub(crate) fn set_minimum_number_of_choices_at_node(&mut self, node: usize, n_choices: usize) {
        let entry = self.n_choices_by_node.entry(node).or_insert(0);
        *entry = (*entry).max(n_choices);
    }

    pub(crate) fn n_choices_at_node(&self, node: usize) -> usize {
        self.n_choices_by_node.get(&node).copied().unwrap_or(0)
    }

    pub(crate) fn add_cost_function(
        &mut self,
        class: &'static str,
        cost_function: Box<dyn CostFunction>,
    ) -> Result<()> {
        if cost_function.finalized() {
            return Err(OptimizationError::InvalidInput {
                class,
                operation: "add_cost_function",
                message: format!(
                    "{} was finalized before being added",
                    cost_function.class_name()
                ),
            });
        }
        self.cost_functions.push(cost_function);
        Ok(())
    }

    pub(crate) fn add_candidate_solution(&mut self, candidate: Vec<usize>) {
        self.candidate_solutions.push(candidate);
    }

    pub(crate) fn clear_candidate_solutions(&mut self) {
        self.candidate_solutions.clear();
    }

    pub(crate) fn n_cost_functions(&self) -> usize {
        self.cost_functions.len()
    }

    pub(crate) fn total_nodes(&self) -> usize {
        self.n_choices_by_node
            .last_key_value()
            .map_or(0, |(&node, _)| node + 1)
    }

    /// Computes the variable-node list, finalizes copies of the cost
    /// functions with it and validates the candidate starts.
    ///
    /// Leaves `self` untouched, so a failed finalize can be retried.
    pub(crate) fn freeze(&self, class: &'static str) -> Result<FrozenNetwork> {
        let variable_nodes: Vec<(usize, usize)> = self
            .n_choices_by_node
            .iter()
            .filter(|(_, &n)| n > 1)
            .map(|(&node, &n)| (node, n))
            .collect();
        let variable_node_indices: Vec<usize> = variable_nodes.iter().map(|&(node, _)| node).collect();

        for candidate in &self.candidate_solutions {
            check_candidate(class, "finalize", &variable_nodes, candidate)?;
        }

        let mut cost_functions = Vec::with_capacity(self.cost_functions.len());
        for cost_function in &self.cost_functions {
            let mut copy = cost_function.deep_clone();
            copy.finalize(&variable_node_indices)?;
            cost_functions.push(copy);
        }

        Ok(FrozenNetwork {
            total_nodes: self.total_nodes(),
            variable_nodes,
            cost_functions,
            candidate_solutions: self.candidate_solutions.clone(),
        })
    }
}

/// Length and choice-range check for a candidate assignment.
pub(crate) fn check_candidate(
    class: &'static str,
    operation: &'static str,
    variable_nodes: &[(usize, usize)],
    candidate: &[usize],
) -> Result<()> {
    if candidate.len() != variable_nodes.len() {
        return Err(OptimizationError::SizeMismatch {
            class,
            operation,
            expected: variable_nodes.len(),
            found: candidate.len(),
        });
    }
    for (&choice, &(node, n_choices)) in candidate.iter().zip(variable_nodes) {
        if choice >= n_choices {
            return Err(OptimizationError::InvalidInput {
                class,
                operation,
                message: format!("choice {choice} at node {node} exceeds its {n_choices} choices"),
            });
        }
    }
    Ok(())
}

/// Finalized network data, read without locking.
#[derive(Debug)]
pub(crate) struct FrozenNetwork {
    total_nodes: usize,
    variable_nodes: Vec<(usize, usize)>,
    cost_functions: Vec<Box<dyn CostFunction>>,
    candidate_solutions: Vec<Vec<usize>>,
}

impl Clone for FrozenNetwork {
    fn clone(&self) -> Self {
        Self {
            total_nodes: self.total_nodes,
            variable_nodes: self.variable_nodes.clone(),
            cost_functions: self.cost_functions.iter().map(|cf| cf.deep_clone()).collect(),
            candidate_solutions: self.candidate_solutions.clone(),
        }
    }
}

impl FrozenNetwork {
    pub(crate) fn total_nodes(&self) -> usize {
        self.total_nodes
    }

    pub(crate) fn variable_nodes(&self) -> &[(usize, usize)] {
        &self.variable_nodes
    }

    /// Position of `node` in candidates, or `None` for fixed and unknown nodes.
    pub(crate) fn position_of(&self, node: usize) -> Option<usize> {
        self.variable_nodes
            .binary_search_by_key(&node, |&(index, _)| index)
            .ok()
    }

    pub(crate) fn candidate_solutions(&self) -> &[Vec<usize>] {
        &self.candidate_solutions
    }

    pub(crate) fn total_combinatorial_solutions(&self) -> f64 {
        self.variable_nodes
            .iter()
            .map(|&(_, n)| n as f64)
            .product()
    }

    pub(crate) fn generate_scratch_space(&self) -> CostFunctionNetworkScratchSpace {
        CostFunctionNetworkScratchSpace::new(&self.cost_functions)
    }

    fn check_scratch(
        &self,
        class: &'static str,
        operation: &'static str,
        scratch: Option<&CostFunctionNetworkScratchSpace>,
    ) -> Result<()> {
        match scratch {
            Some(space) if space.n_cost_function_spaces() != self.cost_functions.len() => {
                Err(OptimizationError::SizeMismatch {
                    class,
                    operation,
                    expected: self.cost_functions.len(),
                    found: space.n_cost_function_spaces(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Sum of every cost function's weighted score.
    pub(crate) fn cost_functions_score(
        &self,
        class: &'static str,
        candidate: &[usize],
        mut scratch: Option<&mut CostFunctionNetworkScratchSpace>,
    ) -> Result<f64> {
        self.check_scratch(class, "compute_absolute_score", scratch.as_deref())?;
        let mut total = 0.0;
        for (index, cost_function) in self.cost_functions.iter().enumerate() {
            let space = match scratch.as_deref_mut() {
                Some(space) => space.cost_function_space(index),
                None => None,
            };
            total += cost_function.compute_cost_function(candidate, space)?;
        }
        Ok(total)
    }

    /// Sum of every cost function's weighted difference.
    pub(crate) fn cost_functions_difference(
        &self,
        class: &'static str,
        old_candidate: &[usize],
        new_candidate: &[usize],
        mut scratch: Option<&mut CostFunctionNetworkScratchSpace>,
    ) -> Result<f64> {
        self.check_scratch(class, "compute_score_change", scratch.as_deref())?;
        let mut total = 0.0;
        for (index, cost_function) in self.cost_functions.iter().enumerate() {
            let space = match scratch.as_deref_mut() {
                Some(space) => space.cost_function_space(index),
                None => None,
            };
            total += cost_function.compute_cost_function_difference(old_candidate, new_candidate, space)?;
        }
        Ok(total)
    }
}

/// A network whose score is the sum of its cost functions.
///
/// # Examples
///
/// ```
/// use u_cfnopt::cfn::{
///     ChoicePenaltySumCostFunction, CostFunctionNetworkOptimizationProblem,
///     CostFunctionNetworkProblem,
/// };
/// use u_cfnopt::problem::OptimizationProblem;
///
/// let problem = CostFunctionNetworkOptimizationProblem::new();
/// problem.set_minimum_number_of_choices_at_node(0, 2).unwrap();
/// problem.set_minimum_number_of_choices_at_node(1, 2).unwrap();
///
/// let mut cf: ChoicePenaltySumCostFunction = ChoicePenaltySumCostFunction::new();
/// cf.set_penalties_for_all_choices_at_node(0, vec![1.0, 5.0]).unwrap();
/// cf.set_penalties_for_all_choices_at_node(1, vec![2.0, 0.0]).unwrap();
/// problem.add_cost_function(Box::new(cf)).unwrap();
/// problem.finalize().unwrap();
///
/// assert_eq!(problem.compute_absolute_score(&[0, 1], None).unwrap(), 1.0);
/// assert_eq!(problem.compute_score_change(&[0, 1], &[1, 0], None).unwrap(), 6.0);
/// ```
#[derive(Debug, Default)]
pub struct CostFunctionNetworkOptimizationProblem {
    builder: Mutex<NetworkBuilder>,
    frozen: OnceLock<FrozenNetwork>,
}

impl CostFunctionNetworkOptimizationProblem {
    pub fn new() -> Self {
        Self::default()
    }

    fn frozen(&self, operation: &'static str) -> Result<&FrozenNetwork> {
        lifecycle::frozen(&self.frozen, CLASS, operation)
    }

    /// Ensures `node` offers at least `n_choices` choices. Never shrinks.
    pub fn set_minimum_number_of_choices_at_node(&self, node: usize, n_choices: usize) -> Result<()> {
        lifecycle::lock_unfinalized(
            &self.builder,
            &self.frozen,
            CLASS,
            "set_minimum_number_of_choices_at_node",
        )?
        .set_minimum_number_of_choices_at_node(node, n_choices);
        Ok(())
    }

    /// Adds an unfinalized cost function; the problem finalizes it.
    pub fn add_cost_function(&self, cost_function: Box<dyn CostFunction>) -> Result<()> {
        lifecycle::lock_unfinalized(&self.builder, &self.frozen, CLASS, "add_cost_function")?
            .add_cost_function(CLASS, cost_function)
    }

    /// Adds a starting point for optimizers, validated at finalize.
    pub fn add_candidate_solution(&self, candidate: Vec<usize>) -> Result<()> {
        lifecycle::lock_unfinalized(&self.builder, &self.frozen, CLASS, "add_candidate_solution")?
            .add_candidate_solution(candidate);
        Ok(())
    }

    pub fn clear_candidate_solutions(&self) -> Result<()> {
        lifecycle::lock_unfinalized(
            &self.builder,
            &self.frozen,
            CLASS,
            "clear_candidate_solutions",
        )?
        .clear_candidate_solutions();
        Ok(())
    }

    pub fn n_cost_functions(&self) -> usize {
        lifecycle::lock(&self.builder).n_cost_functions()
    }
}

impl OptimizationProblem for CostFunctionNetworkOptimizationProblem {
    fn class_name(&self) -> &'static str {
        CLASS
    }

    fn category(&self) -> ProblemCategory {
        ProblemCategory::CostFunctionNetwork
    }

    fn finalize(&self) -> Result<()> {
        let builder = lifecycle::lock_for_finalize(&self.builder, &self.frozen, CLASS)?;
        let network = builder.freeze(CLASS)?;
        debug!(
            event = "problem_finalized",
            class = CLASS,
            total_nodes = network.total_nodes(),
            variable_nodes = network.variable_nodes().len(),
            cost_functions = builder.n_cost_functions()
        );
        lifecycle::publish(&self.frozen, network, CLASS)
    }

    fn finalized(&self) -> bool {
        self.frozen.get().is_some()
    }

    fn reset(&mut self) {
        *self.builder.get_mut().unwrap_or_else(PoisonError::into_inner) = NetworkBuilder::default();
        self.frozen.take();
    }

    fn deep_clone(&self) -> Box<dyn OptimizationProblem> {
        Box::new(Self {
            builder: Mutex::new(lifecycle::lock(&self.builder).clone()),
            frozen: lifecycle::clone_frozen(&self.frozen),
        })
    }

    fn as_cost_function_network(&self) -> Option<&dyn CostFunctionNetworkProblem> {
        Some(self)
    }
}

impl CostFunctionNetworkProblem for CostFunctionNetworkOptimizationProblem {
    fn total_nodes(&self) -> usize {
        match self.frozen.get() {
            Some(network) => network.total_nodes(),
            None => lifecycle::lock(&self.builder).total_nodes(),
        }
    }

    fn total_variable_nodes(&self) -> Result<usize> {
        Ok(self.frozen("total_variable_nodes")?.variable_nodes().len())
    }

    fn n_choices_at_variable_nodes(&self) -> Result<&[(usize, usize)]> {
        Ok(self.frozen("n_choices_at_variable_nodes")?.variable_nodes())
    }

    fn total_combinatorial_solutions(&self) -> Result<f64> {
        Ok(self
            .frozen("total_combinatorial_solutions")?
            .total_combinatorial_solutions())
    }

    fn candidate_solutions(&self) -> Result<&[Vec<usize>]> {
        Ok(self.frozen("candidate_solutions")?.candidate_solutions())
    }

    fn generate_scratch_space(&self) -> Result<CostFunctionNetworkScratchSpace> {
        Ok(self.frozen("generate_scratch_space")?.generate_scratch_space())
    }

    fn compute_absolute_score(
        &self,
        candidate: &[usize],
        scratch: Option<&mut CostFunctionNetworkScratchSpace>,
    ) -> Result<f64> {
        const OPERATION: &str = "compute_absolute_score";
        let network = self.frozen(OPERATION)?;
        check_candidate(CLASS, OPERATION, network.variable_nodes(), candidate)?;
        network.cost_functions_score(CLASS, candidate, scratch)
    }

    fn compute_score_change(
        &self,
        old_candidate: &[usize],
        new_candidate: &[usize],
        scratch: Option<&mut CostFunctionNetworkScratchSpace>,
    ) -> Result<f64> {
        const OPERATION: &str = "compute_score_change";
        let network = self.frozen(OPERATION)?;
        check_candidate(CLASS, OPERATION, network.variable_nodes(), old_candidate)?;
        check_candidate(CLASS, OPERATION, network.variable_nodes(), new_candidate)?;
        network.cost_functions_difference(CLASS, old_candidate, new_candidate, scratch)
    }
}
