//! Networks with precomputed one-body and two-body penalty tables.

use super::cost_function::CostFunction;
use super::problem::{check_candidate, CostFunctionNetworkProblem, FrozenNetwork, NetworkBuilder};
use super::scratch::{CacheOwner, CostFunctionNetworkScratchSpace};
use crate::error::{OptimizationError, Result};
use crate::matrix::IndexedMatrix;
use crate::problem::lifecycle;
use crate::problem::{OptimizationProblem, ProblemCategory};
use std::collections::BTreeMap;
use std::sync::{Mutex, OnceLock, PoisonError};
use tracing::{debug, trace};

const CLASS: &str = "PairwisePrecomputedOptimizationProblem";

#[derive(Debug, Clone, Default)]
struct PairwiseBuilder {
    network: NetworkBuilder,
    background_offset: f64,
    onebody: BTreeMap<usize, Vec<f64>>,
    twobody: BTreeMap<(usize, usize), BTreeMap<(usize, usize), f64>>,
}

/// Penalties between two variable nodes; rows are choices at `position_a`.
#[derive(Debug, Clone)]
struct PairTable {
    position_a: usize,
    position_b: usize,
    penalties: IndexedMatrix<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Neighbour {
    position: usize,
    pair: usize,
}

#[derive(Debug, Clone)]
struct PairwiseTables {
    owner: CacheOwner,
    background_offset: f64,
    one_choice_node_offset: f64,
    onebody: Vec<Vec<f64>>,
    pairs: Vec<PairTable>,
    neighbours: Vec<Vec<Neighbour>>,
}

#[derive(Debug, Clone)]
struct FrozenPairwise {
    network: FrozenNetwork,
    tables: PairwiseTables,
}

/// Pair energies for the candidate a solve attempt currently sits on.
///
/// `pair_energies[(i, j)]` holds the two-body penalty between variable
/// positions `i` and `j` under the cached candidate, stored symmetrically.
/// [`compute_score_change`](CostFunctionNetworkProblem::compute_score_change)
/// stages the entries a move would change; `accept_last_move` writes them.
#[derive(Debug)]
pub struct PairwiseScratch {
    n_positions: usize,
    owner: Option<CacheOwner>,
    current: Vec<usize>,
    valid: bool,
    pair_energies: IndexedMatrix<f64>,
    staged_candidate: Vec<usize>,
    staged_updates: Vec<(usize, usize, f64)>,
    staged: bool,
}

impl PairwiseScratch {
    fn new(n_positions: usize) -> Result<Self> {
        Ok(Self {
            n_positions,
            owner: None,
            current: Vec::with_capacity(n_positions),
            valid: false,
            pair_energies: IndexedMatrix::new(n_positions, n_positions)?,
            staged_candidate: Vec::with_capacity(n_positions),
            staged_updates: Vec::new(),
            staged: false,
        })
    }

    fn describes(&self, owner: CacheOwner, candidate: &[usize]) -> bool {
        self.valid && self.owner == Some(owner) && self.current.as_slice() == candidate
    }

    pub(crate) fn accept_last_move(&mut self) {
        if !self.staged {
            return;
        }
        for &(i, j, energy) in &self.staged_updates {
            self.pair_energies[(i, j)] = energy;
            self.pair_energies[(j, i)] = energy;
        }
        std::mem::swap(&mut self.current, &mut self.staged_candidate);
        self.valid = true;
        self.staged = false;
    }
}

impl PairwiseTables {
    fn constant_offset(&self) -> f64 {
        self.background_offset + self.one_choice_node_offset
    }

    #[inline]
    fn pair_energy(&self, neighbour: Neighbour, position: usize, choice: usize, other_choice: usize) -> f64 {
        let table = &self.pairs[neighbour.pair];
        if table.position_a == position {
            table.penalties[(choice, other_choice)]
        } else {
            table.penalties[(other_choice, choice)]
        }
    }

    /// Constant, one-body and two-body terms of a validated candidate.
    fn score(&self, candidate: &[usize]) -> f64 {
        let onebody: f64 = candidate
            .iter()
            .enumerate()
            .map(|(position, &choice)| self.onebody[position][choice])
            .sum();
        let twobody: f64 = self
            .pairs
            .iter()
            .map(|t| t.penalties[(candidate[t.position_a], candidate[t.position_b])])
            .sum();
        self.constant_offset() + onebody + twobody
    }

    /// Rejects a cache sized for a different number of variable nodes.
    fn check_scratch(&self, scratch: &PairwiseScratch, operation: &'static str) -> Result<()> {
        if scratch.n_positions != self.onebody.len() {
            return Err(OptimizationError::SizeMismatch {
                class: CLASS,
                operation,
                expected: self.onebody.len(),
                found: scratch.n_positions,
            });
        }
        Ok(())
    }

    /// Rebuilds the scratch cache for a validated candidate.
    fn seat(&self, scratch: &mut PairwiseScratch, candidate: &[usize]) {
        scratch.pair_energies.fill(0.0);
        for t in &self.pairs {
            let energy = t.penalties[(candidate[t.position_a], candidate[t.position_b])];
            scratch.pair_energies[(t.position_a, t.position_b)] = energy;
            scratch.pair_energies[(t.position_b, t.position_a)] = energy;
        }
        scratch.current.clear();
        scratch.current.extend_from_slice(candidate);
        scratch.owner = Some(self.owner);
        scratch.valid = true;
        scratch.staged = false;
    }

    fn onebody_change(&self, old: &[usize], new: &[usize]) -> f64 {
        old.iter()
            .zip(new)
            .enumerate()
            .filter(|(_, (o, n))| o != n)
            .map(|(position, (&o, &n))| self.onebody[position][n] - self.onebody[position][o])
            .sum()
    }

    /// Two-body change of a move, without a cache.
    fn twobody_change(&self, old: &[usize], new: &[usize]) -> f64 {
        let mut delta = 0.0;
        for (position, (&o, &n)) in old.iter().zip(new).enumerate() {
            if o == n {
                continue;
            }
            for &neighbour in &self.neighbours[position] {
                let other = neighbour.position;
                // Pairs where both ends moved are counted from the lower end.
                if old[other] != new[other] && other < position {
                    continue;
                }
                delta += self.pair_energy(neighbour, position, n, new[other])
                    - self.pair_energy(neighbour, position, o, old[other]);
            }
        }
        delta
    }

    /// Two-body change of a move, reading old energies from the cache and
    /// staging the new ones.
    fn twobody_change_cached(&self, scratch: &mut PairwiseScratch, old: &[usize], new: &[usize]) -> f64 {
        if !scratch.describes(self.owner, old) {
            self.seat(scratch, old);
        }
        scratch.staged_updates.clear();
        let mut changed = old
            .iter()
            .zip(new)
            .enumerate()
            .filter(|(_, (o, n))| o != n)
            .map(|(position, _)| position);

        let mut delta = 0.0;
        match (changed.next(), changed.next()) {
            (None, _) => {}
            (Some(position), None) => {
                // Single change: the old contribution is one row of the cache.
                let old_row: f64 = scratch.pair_energies.row_iter(position).sum();
                let choice = new[position];
                let mut new_row = 0.0;
                for &neighbour in &self.neighbours[position] {
                    let energy = self.pair_energy(neighbour, position, choice, new[neighbour.position]);
                    new_row += energy;
                    scratch.staged_updates.push((position, neighbour.position, energy));
                }
                delta = new_row - old_row;
            }
            _ => {
                for (position, (&o, &n)) in old.iter().zip(new).enumerate() {
                    if o == n {
                        continue;
                    }
                    for &neighbour in &self.neighbours[position] {
                        let other = neighbour.position;
                        if old[other] != new[other] && other < position {
                            continue;
                        }
                        let energy = self.pair_energy(neighbour, position, n, new[other]);
                        delta += energy - scratch.pair_energies[(position, other)];
                        scratch.staged_updates.push((position, other, energy));
                    }
                }
            }
        }

        scratch.staged_candidate.clear();
        scratch.staged_candidate.extend_from_slice(new);
        scratch.staged = true;
        delta
    }
}

impl PairwiseBuilder {
    fn freeze(&self) -> Result<FrozenPairwise> {
        let network = self.network.freeze(CLASS)?;
        let n_positions = network.variable_nodes().len();
        let is_fixed = |node: usize| self.network.n_choices_at_node(node) == 1;

        let mut onebody: Vec<Vec<f64>> = network
            .variable_nodes()
            .iter()
            .map(|&(_, n_choices)| vec![0.0; n_choices])
            .collect();
        let mut one_choice_node_offset = 0.0;

        for (&node, penalties) in &self.onebody {
            match network.position_of(node) {
                Some(position) => {
                    for (choice, &penalty) in penalties.iter().enumerate() {
                        onebody[position][choice] += penalty;
                    }
                }
                None if is_fixed(node) => {
                    one_choice_node_offset += penalties.first().copied().unwrap_or(0.0);
                }
                None => {}
            }
        }

        let mut pairs = Vec::new();
        let mut neighbours = vec![Vec::new(); n_positions];
        for (&(node_a, node_b), entries) in &self.twobody {
            match (network.position_of(node_a), network.position_of(node_b)) {
                (Some(position_a), Some(position_b)) => {
                    let rows = onebody[position_a].len();
                    let cols = onebody[position_b].len();
                    let mut penalties = IndexedMatrix::new(rows, cols)?;
                    for (&(choice_a, choice_b), &penalty) in entries {
                        penalties.set(choice_a, choice_b, penalty)?;
                    }
                    let pair = pairs.len();
                    neighbours[position_a].push(Neighbour {
                        position: position_b,
                        pair,
                    });
                    neighbours[position_b].push(Neighbour {
                        position: position_a,
                        pair,
                    });
                    pairs.push(PairTable {
                        position_a,
                        position_b,
                        penalties,
                    });
                }
                (Some(position), None) if is_fixed(node_b) => {
                    for (&(choice_a, choice_b), &penalty) in entries {
                        if choice_b == 0 {
                            onebody[position][choice_a] += penalty;
                        }
                    }
                }
                (None, Some(position)) if is_fixed(node_a) => {
                    for (&(choice_a, choice_b), &penalty) in entries {
                        if choice_a == 0 {
                            onebody[position][choice_b] += penalty;
                        }
                    }
                }
                (None, None) if is_fixed(node_a) && is_fixed(node_b) => {
                    one_choice_node_offset += entries.get(&(0, 0)).copied().unwrap_or(0.0);
                }
                _ => {}
            }
        }

        Ok(FrozenPairwise {
            network,
            tables: PairwiseTables {
                owner: CacheOwner::fresh(),
                background_offset: self.background_offset,
                one_choice_node_offset,
                onebody,
                pairs,
                neighbours,
            },
        })
    }
}

/// A cost function network whose score is dominated by tabulated one-body
/// and two-body penalties, plus any number of extra cost functions.
///
/// Penalties are set by absolute node index; setting a penalty for a choice
/// grows the node's choice count to include it. At finalization,
///
/// - penalties involving a single-choice (fixed) node and a variable node
///   fold into the variable node's one-body penalties,
/// - penalties involving only fixed nodes fold into
///   [`one_choice_node_offset`](Self::one_choice_node_offset),
/// - every interacting pair of variable nodes gets a dense
///   [`IndexedMatrix`] of pair penalties.
///
/// The score of a candidate is
/// `background + one-choice-node offset + Σ one-body + Σ two-body + Σ cost functions`.
///
/// # Examples
///
/// ```
/// use u_cfnopt::cfn::{CostFunctionNetworkProblem, PairwisePrecomputedOptimizationProblem};
/// use u_cfnopt::problem::OptimizationProblem;
///
/// let problem = PairwisePrecomputedOptimizationProblem::new();
/// problem.set_onebody_penalty(0, 1, 2.0).unwrap();
/// problem.set_onebody_penalty(1, 1, 3.0).unwrap();
/// problem.set_twobody_penalty((0, 1), (1, 1), -4.0).unwrap();
/// problem.set_background_offset(10.0).unwrap();
/// problem.finalize().unwrap();
///
/// assert_eq!(problem.compute_absolute_score(&[1, 1], None).unwrap(), 11.0);
/// assert_eq!(problem.compute_score_change(&[0, 0], &[1, 1], None).unwrap(), 1.0);
/// ```
#[derive(Debug, Default)]
pub struct PairwisePrecomputedOptimizationProblem {
    builder: Mutex<PairwiseBuilder>,
    frozen: OnceLock<FrozenPairwise>,
}

impl PairwisePrecomputedOptimizationProblem {
    pub fn new() -> Self {
        Self::default()
    }

    fn frozen(&self, operation: &'static str) -> Result<&FrozenPairwise> {
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
        .network
        .set_minimum_number_of_choices_at_node(node, n_choices);
        Ok(())
    }

    /// Sets the penalty for `choice` at `node`.
    pub fn set_onebody_penalty(&self, node: usize, choice: usize, penalty: f64) -> Result<()> {
        let mut builder =
            lifecycle::lock_unfinalized(&self.builder, &self.frozen, CLASS, "set_onebody_penalty")?;
        builder
            .network
            .set_minimum_number_of_choices_at_node(node, choice + 1);
        let penalties = builder.onebody.entry(node).or_default();
        if penalties.len() <= choice {
            penalties.resize(choice + 1, 0.0);
        }
        penalties[choice] = penalty;
        Ok(())
    }

    /// Sets the penalty for the choice pair `(choice_a, choice_b)` at
    /// `(node_a, node_b)`. Requires `node_a < node_b`.
    pub fn set_twobody_penalty(
        &self,
        (node_a, node_b): (usize, usize),
        (choice_a, choice_b): (usize, usize),
        penalty: f64,
    ) -> Result<()> {
        const OPERATION: &str = "set_twobody_penalty";
        if node_b <= node_a {
            return Err(OptimizationError::InvalidInput {
                class: CLASS,
                operation: OPERATION,
                message: format!(
                    "the second node index ({node_b}) must be greater than the first ({node_a})"
                ),
            });
        }
        let mut builder = lifecycle::lock_unfinalized(&self.builder, &self.frozen, CLASS, OPERATION)?;
        builder
            .network
            .set_minimum_number_of_choices_at_node(node_a, choice_a + 1);
        builder
            .network
            .set_minimum_number_of_choices_at_node(node_b, choice_b + 1);
        builder
            .twobody
            .entry((node_a, node_b))
            .or_default()
            .insert((choice_a, choice_b), penalty);
        Ok(())
    }

    /// Constant added to every score.
    pub fn set_background_offset(&self, offset: f64) -> Result<()> {
        lifecycle::lock_unfinalized(&self.builder, &self.frozen, CLASS, "set_background_offset")?
            .background_offset = offset;
        Ok(())
    }

    /// Adds an unfinalized cost function; the problem finalizes it.
    pub fn add_cost_function(&self, cost_function: Box<dyn CostFunction>) -> Result<()> {
        lifecycle::lock_unfinalized(&self.builder, &self.frozen, CLASS, "add_cost_function")?
            .network
            .add_cost_function(CLASS, cost_function)
    }

    /// Adds a starting point for optimizers, validated at finalize.
    pub fn add_candidate_solution(&self, candidate: Vec<usize>) -> Result<()> {
        lifecycle::lock_unfinalized(&self.builder, &self.frozen, CLASS, "add_candidate_solution")?
            .network
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
        .network
        .clear_candidate_solutions();
        Ok(())
    }

    pub fn background_offset(&self) -> f64 {
        match self.frozen.get() {
            Some(frozen) => frozen.tables.background_offset,
            None => lifecycle::lock(&self.builder).background_offset,
        }
    }

    /// Fixed-node penalties folded in at finalization.
    pub fn one_choice_node_offset(&self) -> Result<f64> {
        Ok(self
            .frozen("one_choice_node_offset")?
            .tables
            .one_choice_node_offset)
    }

    /// Background plus one-choice-node offset.
    pub fn total_constant_offset(&self) -> Result<f64> {
        Ok(self
            .frozen("total_constant_offset")?
            .tables
            .constant_offset())
    }

    /// Number of interacting variable-node pairs with a precomputed table.
    pub fn n_interacting_pairs(&self) -> Result<usize> {
        Ok(self.frozen("n_interacting_pairs")?.tables.pairs.len())
    }
}

impl OptimizationProblem for PairwisePrecomputedOptimizationProblem {
    fn class_name(&self) -> &'static str {
        CLASS
    }

    fn category(&self) -> ProblemCategory {
        ProblemCategory::CostFunctionNetwork
    }

    fn finalize(&self) -> Result<()> {
        let builder = lifecycle::lock_for_finalize(&self.builder, &self.frozen, CLASS)?;
        let frozen = builder.freeze()?;
        debug!(
            event = "problem_finalized",
            class = CLASS,
            total_nodes = frozen.network.total_nodes(),
            variable_nodes = frozen.network.variable_nodes().len(),
            interacting_pairs = frozen.tables.pairs.len(),
            constant_offset = frozen.tables.constant_offset()
        );
        lifecycle::publish(&self.frozen, frozen, CLASS)
    }

    fn finalized(&self) -> bool {
        self.frozen.get().is_some()
    }

    fn reset(&mut self) {
        *self.builder.get_mut().unwrap_or_else(PoisonError::into_inner) = PairwiseBuilder::default();
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

impl CostFunctionNetworkProblem for PairwisePrecomputedOptimizationProblem {
    fn total_nodes(&self) -> usize {
        match self.frozen.get() {
            Some(frozen) => frozen.network.total_nodes(),
            None => lifecycle::lock(&self.builder).network.total_nodes(),
        }
    }

    fn total_variable_nodes(&self) -> Result<usize> {
        Ok(self
            .frozen("total_variable_nodes")?
            .network
            .variable_nodes()
            .len())
    }

    fn n_choices_at_variable_nodes(&self) -> Result<&[(usize, usize)]> {
        Ok(self
            .frozen("n_choices_at_variable_nodes")?
            .network
            .variable_nodes())
    }

    fn total_combinatorial_solutions(&self) -> Result<f64> {
        Ok(self
            .frozen("total_combinatorial_solutions")?
            .network
            .total_combinatorial_solutions())
    }

    fn candidate_solutions(&self) -> Result<&[Vec<usize>]> {
        Ok(self
            .frozen("candidate_solutions")?
            .network
            .candidate_solutions())
    }

    fn generate_scratch_space(&self) -> Result<CostFunctionNetworkScratchSpace> {
        let frozen = self.frozen("generate_scratch_space")?;
        let pairwise = PairwiseScratch::new(frozen.network.variable_nodes().len())?;
        Ok(frozen.network.generate_scratch_space().with_pairwise(pairwise))
    }

    fn compute_absolute_score(
        &self,
        candidate: &[usize],
        mut scratch: Option<&mut CostFunctionNetworkScratchSpace>,
    ) -> Result<f64> {
        const OPERATION: &str = "compute_absolute_score";
        let frozen = self.frozen(OPERATION)?;
        check_candidate(CLASS, OPERATION, frozen.network.variable_nodes(), candidate)?;
        if let Some(cache) = scratch.as_deref_mut().and_then(|s| s.pairwise_mut()) {
            frozen.tables.check_scratch(cache, OPERATION)?;
        }
        let cost_functions = frozen
            .network
            .cost_functions_score(CLASS, candidate, scratch.as_deref_mut())?;
        // Seated only once every cost function has accepted the candidate.
        if let Some(cache) = scratch.and_then(|s| s.pairwise_mut()) {
            frozen.tables.seat(cache, candidate);
        }
        Ok(frozen.tables.score(candidate) + cost_functions)
    }

    fn compute_score_change(
        &self,
        old_candidate: &[usize],
        new_candidate: &[usize],
        mut scratch: Option<&mut CostFunctionNetworkScratchSpace>,
    ) -> Result<f64> {
        const OPERATION: &str = "compute_score_change";
        let frozen = self.frozen(OPERATION)?;
        let variable_nodes = frozen.network.variable_nodes();
        check_candidate(CLASS, OPERATION, variable_nodes, old_candidate)?;
        check_candidate(CLASS, OPERATION, variable_nodes, new_candidate)?;

        let tables = &frozen.tables;
        if let Some(cache) = scratch.as_deref_mut().and_then(|s| s.pairwise_mut()) {
            tables.check_scratch(cache, OPERATION)?;
        }
        let cost_functions = frozen.network.cost_functions_difference(
            CLASS,
            old_candidate,
            new_candidate,
            scratch.as_deref_mut(),
        )?;
        let onebody = tables.onebody_change(old_candidate, new_candidate);
        let twobody = match scratch.and_then(|s| s.pairwise_mut()) {
            Some(cache) => tables.twobody_change_cached(cache, old_candidate, new_candidate),
            None => tables.twobody_change(old_candidate, new_candidate),
        };
        trace!(
            event = "score_change",
            onebody,
            twobody,
            cost_functions
        );
        Ok(onebody + twobody + cost_functions)
    }
}
