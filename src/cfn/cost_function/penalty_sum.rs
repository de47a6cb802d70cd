//! Cost functions over a sum of per-choice penalties.

use super::types::{require_unfinalized, CostFunction, CostFunctionScratchSpace};
use crate::cfn::scratch::CacheOwner;
use crate::error::{OptimizationError, Result};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Maps the raw penalty sum to the cost (before weighting).
pub trait PenaltySumTransform: Clone + Debug + Send + Sync + 'static {
    /// Class name of the cost function using this transform.
    const CLASS_NAME: &'static str;

    fn apply(&self, sum: f64) -> f64;

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// `f(x) = x`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Identity;

impl PenaltySumTransform for Identity {
    const CLASS_NAME: &'static str = "ChoicePenaltySumCostFunction";

    #[inline]
    fn apply(&self, sum: f64) -> f64 {
        sum
    }
}

/// `f(x) = x²`. Penalizes large sums of either sign.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Square;

impl PenaltySumTransform for Square {
    const CLASS_NAME: &'static str = "SquareOfChoicePenaltySumCostFunction";

    #[inline]
    fn apply(&self, sum: f64) -> f64 {
        sum * sum
    }
}

/// `f(x) = clamp(x, min, max)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Clamp {
    pub min: f64,
    pub max: f64,
}

impl PenaltySumTransform for Clamp {
    const CLASS_NAME: &'static str = "ClampedChoicePenaltySumCostFunction";

    #[inline]
    fn apply(&self, sum: f64) -> f64 {
        sum.clamp(self.min, self.max)
    }

    fn validate(&self) -> Result<()> {
        if self.min <= self.max {
            Ok(())
        } else {
            Err(OptimizationError::InvalidConfig(format!(
                "clamp min ({}) exceeds max ({})",
                self.min, self.max
            )))
        }
    }
}

/// `f(x) = slope * x`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Linear {
    pub slope: f64,
}

impl PenaltySumTransform for Linear {
    const CLASS_NAME: &'static str = "LinearChoicePenaltySumCostFunction";

    #[inline]
    fn apply(&self, sum: f64) -> f64 {
        self.slope * sum
    }
}

#[derive(Debug)]
struct CachedSum {
    owner: CacheOwner,
    candidate: Vec<usize>,
    sum: f64,
}

impl CachedSum {
    fn store(slot: &mut Option<CachedSum>, owner: CacheOwner, candidate: &[usize], sum: f64) {
        match slot {
            Some(cached) => {
                cached.owner = owner;
                cached.candidate.clear();
                cached.candidate.extend_from_slice(candidate);
                cached.sum = sum;
            }
            None => {
                *slot = Some(CachedSum {
                    owner,
                    candidate: candidate.to_vec(),
                    sum,
                })
            }
        }
    }
}

/// Cached sum for the last accepted candidate, plus one staged move.
#[derive(Debug, Default)]
pub struct ChoicePenaltySumScratchSpace {
    accepted: Option<CachedSum>,
    staged: Option<CachedSum>,
}

impl ChoicePenaltySumScratchSpace {
    fn cached_sum(&self, owner: CacheOwner, candidate: &[usize]) -> Option<f64> {
        match &self.accepted {
            Some(cached) if cached.owner == owner && cached.candidate.as_slice() == candidate => {
                Some(cached.sum)
            }
            _ => None,
        }
    }

    fn seat(&mut self, owner: CacheOwner, candidate: &[usize], sum: f64) {
        self.staged = None;
        CachedSum::store(&mut self.accepted, owner, candidate, sum);
    }

    fn stage(&mut self, owner: CacheOwner, candidate: &[usize], sum: f64) {
        CachedSum::store(&mut self.staged, owner, candidate, sum);
    }
}

impl CostFunctionScratchSpace for ChoicePenaltySumScratchSpace {
    fn accept_last_move(&mut self) {
        if let Some(staged) = self.staged.take() {
            self.accepted = Some(staged);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Clone)]
struct FrozenPenalties {
    owner: CacheOwner,
    by_position: Vec<Vec<f64>>,
    offset: f64,
}

/// `weight * f(offset + Σ penalty(node, chosen choice))`.
///
/// Penalties are given per absolute node index. At finalization they are
/// re-keyed by variable-node position, and the penalty of choice 0 at each
/// fixed node is folded into the offset. Choices without a penalty
/// contribute zero.
///
/// # Examples
///
/// ```
/// use u_cfnopt::cfn::{ChoicePenaltySumCostFunction, CostFunction};
///
/// let mut cf: ChoicePenaltySumCostFunction = ChoicePenaltySumCostFunction::new();
/// cf.set_penalties_for_all_choices_at_node(0, vec![1.0, 5.0]).unwrap();
/// cf.set_penalties_for_all_choices_at_node(1, vec![2.0, 0.0]).unwrap();
/// cf.finalize(&[0, 1]).unwrap();
/// assert_eq!(cf.compute_cost_function(&[0, 1], None).unwrap(), 1.0);
/// assert_eq!(cf.compute_cost_function(&[1, 0], None).unwrap(), 7.0);
/// ```
#[derive(Debug, Clone)]
pub struct ChoicePenaltySumCostFunction<F: PenaltySumTransform = Identity> {
    transform: F,
    weight: f64,
    constant_offset: f64,
    penalties_by_node: BTreeMap<usize, Vec<f64>>,
    frozen: Option<FrozenPenalties>,
}

/// Squared penalty sum.
pub type SquareOfChoicePenaltySumCostFunction = ChoicePenaltySumCostFunction<Square>;

impl<F: PenaltySumTransform + Default> ChoicePenaltySumCostFunction<F> {
    pub fn new() -> Self {
        Self::with_transform(F::default())
    }
}

impl<F: PenaltySumTransform + Default> Default for ChoicePenaltySumCostFunction<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: PenaltySumTransform> ChoicePenaltySumCostFunction<F> {
    pub fn with_transform(transform: F) -> Self {
        Self {
            transform,
            weight: 1.0,
            constant_offset: 0.0,
            penalties_by_node: BTreeMap::new(),
            frozen: None,
        }
    }

    pub fn transform(&self) -> &F {
        &self.transform
    }

    pub fn constant_offset(&self) -> f64 {
        self.constant_offset
    }

    /// Constant added to the penalty sum before the transform.
    pub fn set_constant_offset(&mut self, offset: f64) -> Result<()> {
        require_unfinalized(self.frozen.is_some(), F::CLASS_NAME, "set_constant_offset")?;
        self.constant_offset = offset;
        Ok(())
    }

    /// Sets the penalty of every choice at `node`. Each node may be set once.
    pub fn set_penalties_for_all_choices_at_node(
        &mut self,
        node: usize,
        penalties: Vec<f64>,
    ) -> Result<()> {
        const OPERATION: &str = "set_penalties_for_all_choices_at_node";
        require_unfinalized(self.frozen.is_some(), F::CLASS_NAME, OPERATION)?;
        if self.penalties_by_node.contains_key(&node) {
            return Err(OptimizationError::InvalidInput {
                class: F::CLASS_NAME,
                operation: OPERATION,
                message: format!("penalties for node {node} were already set"),
            });
        }
        self.penalties_by_node.insert(node, penalties);
        Ok(())
    }

    fn frozen(&self, operation: &'static str) -> Result<&FrozenPenalties> {
        self.frozen.as_ref().ok_or(OptimizationError::NotFinalized {
            class: F::CLASS_NAME,
            operation,
        })
    }

    fn check_len(&self, frozen: &FrozenPenalties, operation: &'static str, candidate: &[usize]) -> Result<()> {
        if candidate.len() == frozen.by_position.len() {
            Ok(())
        } else {
            Err(OptimizationError::SizeMismatch {
                class: F::CLASS_NAME,
                operation,
                expected: frozen.by_position.len(),
                found: candidate.len(),
            })
        }
    }

    #[inline]
    fn penalty(frozen: &FrozenPenalties, position: usize, choice: usize) -> f64 {
        frozen.by_position[position]
            .get(choice)
            .copied()
            .unwrap_or(0.0)
    }

    fn penalty_sum(frozen: &FrozenPenalties, candidate: &[usize]) -> f64 {
        candidate
            .iter()
            .enumerate()
            .fold(frozen.offset, |sum, (position, &choice)| {
                sum + Self::penalty(frozen, position, choice)
            })
    }

    fn downcast<'a>(
        scratch: Option<&'a mut dyn CostFunctionScratchSpace>,
        operation: &'static str,
    ) -> Result<Option<&'a mut ChoicePenaltySumScratchSpace>> {
        match scratch {
            None => Ok(None),
            Some(space) => space
                .as_any_mut()
                .downcast_mut::<ChoicePenaltySumScratchSpace>()
                .map(Some)
                .ok_or(OptimizationError::TypeMismatch {
                    class: F::CLASS_NAME,
                    operation,
                    expected: "ChoicePenaltySumScratchSpace".into(),
                    found: "a foreign scratch space".into(),
                }),
        }
    }
}

impl<F: PenaltySumTransform> CostFunction for ChoicePenaltySumCostFunction<F> {
    fn class_name(&self) -> &'static str {
        F::CLASS_NAME
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn set_weight(&mut self, weight: f64) -> Result<()> {
        require_unfinalized(self.frozen.is_some(), F::CLASS_NAME, "set_weight")?;
        self.weight = weight;
        Ok(())
    }

    fn finalize(&mut self, variable_node_indices: &[usize]) -> Result<()> {
        if self.frozen.is_some() {
            return Err(OptimizationError::AlreadyFinalized {
                class: F::CLASS_NAME,
                operation: "finalize",
            });
        }
        self.transform.validate()?;
        let mut by_position = vec![Vec::new(); variable_node_indices.len()];
        let mut offset = self.constant_offset;
        for (node, penalties) in &self.penalties_by_node {
            match variable_node_indices.binary_search(node) {
                Ok(position) => by_position[position] = penalties.clone(),
                Err(_) => offset += penalties.first().copied().unwrap_or(0.0),
            }
        }
        self.frozen = Some(FrozenPenalties {
            owner: CacheOwner::fresh(),
            by_position,
            offset,
        });
        Ok(())
    }

    fn finalized(&self) -> bool {
        self.frozen.is_some()
    }

    fn uses_scratch_space(&self) -> bool {
        true
    }

    fn generate_scratch_space(&self) -> Option<Box<dyn CostFunctionScratchSpace>> {
        Some(Box::new(ChoicePenaltySumScratchSpace::default()))
    }

    fn compute_cost_function(
        &self,
        candidate: &[usize],
        scratch: Option<&mut dyn CostFunctionScratchSpace>,
    ) -> Result<f64> {
        const OPERATION: &str = "compute_cost_function";
        let frozen = self.frozen(OPERATION)?;
        self.check_len(frozen, OPERATION, candidate)?;
        let sum = Self::penalty_sum(frozen, candidate);
        if let Some(space) = Self::downcast(scratch, OPERATION)? {
            space.seat(frozen.owner, candidate, sum);
        }
        Ok(self.weight * self.transform.apply(sum))
    }

    fn compute_cost_function_difference(
        &self,
        old_candidate: &[usize],
        new_candidate: &[usize],
        scratch: Option<&mut dyn CostFunctionScratchSpace>,
    ) -> Result<f64> {
        const OPERATION: &str = "compute_cost_function_difference";
        let frozen = self.frozen(OPERATION)?;
        self.check_len(frozen, OPERATION, old_candidate)?;
        self.check_len(frozen, OPERATION, new_candidate)?;
        let mut space = Self::downcast(scratch, OPERATION)?;

        let old_sum = space
            .as_ref()
            .and_then(|s| s.cached_sum(frozen.owner, old_candidate))
            .unwrap_or_else(|| Self::penalty_sum(frozen, old_candidate));
        let new_sum = old_candidate
            .iter()
            .zip(new_candidate)
            .enumerate()
            .filter(|(_, (old, new))| old != new)
            .fold(old_sum, |sum, (position, (&old, &new))| {
                sum + Self::penalty(frozen, position, new) - Self::penalty(frozen, position, old)
            });

        if let Some(space) = space.as_deref_mut() {
            space.stage(frozen.owner, new_candidate, new_sum);
        }
        Ok(self.weight * (self.transform.apply(new_sum) - self.transform.apply(old_sum)))
    }

    fn deep_clone(&self) -> Box<dyn CostFunction> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn two_node<F: PenaltySumTransform>(transform: F) -> ChoicePenaltySumCostFunction<F> {
        let mut cf = ChoicePenaltySumCostFunction::with_transform(transform);
        cf.set_penalties_for_all_choices_at_node(0, vec![1.0, 5.0])
            .unwrap();
        cf.set_penalties_for_all_choices_at_node(1, vec![2.0, 0.0])
            .unwrap();
        cf.finalize(&[0, 1]).unwrap();
        cf
    }

    #[test]
    fn test_two_node_scenario() {
        let cf = two_node(Identity);
        assert_eq!(cf.compute_cost_function(&[0, 1], None).unwrap(), 1.0);
        assert_eq!(cf.compute_cost_function(&[1, 0], None).unwrap(), 7.0);
        assert_eq!(
            cf.compute_cost_function_difference(&[0, 1], &[1, 0], None)
                .unwrap(),
            6.0
        );
    }

    #[test]
    fn test_square_and_weight() {
        let mut cf = SquareOfChoicePenaltySumCostFunction::new();
        cf.set_penalties_for_all_choices_at_node(0, vec![1.0, 5.0])
            .unwrap();
        cf.set_penalties_for_all_choices_at_node(1, vec![2.0, 0.0])
            .unwrap();
        cf.set_weight(0.5).unwrap();
        cf.finalize(&[0, 1]).unwrap();
        assert_eq!(cf.class_name(), "SquareOfChoicePenaltySumCostFunction");
        assert_eq!(cf.compute_cost_function(&[1, 0], None).unwrap(), 24.5);
        assert_eq!(
            cf.compute_cost_function_difference(&[0, 1], &[1, 0], None)
                .unwrap(),
            24.0
        );
    }

    #[test]
    fn test_lifecycle_errors() {
        let mut cf = two_node(Identity);
        assert!(matches!(
            cf.finalize(&[0, 1]),
            Err(OptimizationError::AlreadyFinalized { .. })
        ));
        assert!(matches!(
            cf.set_weight(2.0),
            Err(OptimizationError::Finalized { .. })
        ));
        assert!(cf
            .set_penalties_for_all_choices_at_node(3, vec![1.0])
            .is_err());

        let unfinalized = ChoicePenaltySumCostFunction::<Identity>::new();
        assert!(matches!(
            unfinalized.compute_cost_function(&[], None),
            Err(OptimizationError::NotFinalized { .. })
        ));
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut cf = ChoicePenaltySumCostFunction::<Identity>::new();
        cf.set_penalties_for_all_choices_at_node(4, vec![1.0])
            .unwrap();
        assert!(matches!(
            cf.set_penalties_for_all_choices_at_node(4, vec![2.0]),
            Err(OptimizationError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_fixed_nodes_fold_into_offset() {
        let mut cf = ChoicePenaltySumCostFunction::<Identity>::new();
        cf.set_constant_offset(0.25).unwrap();
        cf.set_penalties_for_all_choices_at_node(0, vec![3.0]).unwrap();
        cf.set_penalties_for_all_choices_at_node(2, vec![1.0, 2.0])
            .unwrap();
        cf.finalize(&[2]).unwrap();
        assert_eq!(cf.compute_cost_function(&[1], None).unwrap(), 5.25);
        assert!(matches!(
            cf.compute_cost_function(&[1, 0], None),
            Err(OptimizationError::SizeMismatch { expected: 1, found: 2, .. })
        ));
    }

    #[test]
    fn test_clamp_validation() {
        let mut cf = ChoicePenaltySumCostFunction::with_transform(Clamp { min: 2.0, max: 1.0 });
        assert!(matches!(
            cf.finalize(&[]),
            Err(OptimizationError::InvalidConfig(_))
        ));
        let cf = two_node(Clamp { min: 0.0, max: 4.0 });
        assert_eq!(cf.compute_cost_function(&[1, 0], None).unwrap(), 4.0);
    }

    #[test]
    fn test_scratch_cache_follows_accepted_moves() {
        let cf = two_node(Identity);
        let mut scratch = cf.generate_scratch_space().unwrap();
        cf.compute_cost_function(&[0, 0], Some(scratch.as_mut()))
            .unwrap();
        let d = cf
            .compute_cost_function_difference(&[0, 0], &[1, 0], Some(scratch.as_mut()))
            .unwrap();
        assert_eq!(d, 4.0);
        scratch.accept_last_move();
        let d = cf
            .compute_cost_function_difference(&[1, 0], &[1, 1], Some(scratch.as_mut()))
            .unwrap();
        assert_eq!(d, -2.0);
        // Not accepted: the cache still describes [1, 0].
        let d = cf
            .compute_cost_function_difference(&[0, 1], &[1, 1], Some(scratch.as_mut()))
            .unwrap();
        assert_eq!(d, 4.0);
    }

    #[test]
    fn test_cache_filled_by_another_cost_function_is_ignored() {
        let filler = two_node(Square);
        let mut other = ChoicePenaltySumCostFunction::with_transform(Square);
        other.set_penalties_for_all_choices_at_node(0, vec![10.0, 50.0]).unwrap();
        other.set_penalties_for_all_choices_at_node(1, vec![20.0, 0.0]).unwrap();
        other.finalize(&[0, 1]).unwrap();

        let mut scratch = filler.generate_scratch_space().unwrap();
        filler
            .compute_cost_function(&[0, 1], Some(scratch.as_mut()))
            .unwrap();
        let cached = other
            .compute_cost_function_difference(&[0, 1], &[1, 0], Some(scratch.as_mut()))
            .unwrap();
        let plain = other
            .compute_cost_function_difference(&[0, 1], &[1, 0], None)
            .unwrap();
        assert_eq!(cached, plain);
        assert_eq!(plain, 70.0 * 70.0 - 10.0 * 10.0);
    }

    #[test]
    fn test_foreign_scratch_rejected() {
        #[derive(Debug)]
        struct Foreign;
        impl CostFunctionScratchSpace for Foreign {
            fn accept_last_move(&mut self) {}
            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }
        let cf = two_node(Identity);
        let mut foreign = Foreign;
        assert!(matches!(
            cf.compute_cost_function(&[0, 0], Some(&mut foreign as &mut dyn CostFunctionScratchSpace)),
            Err(OptimizationError::TypeMismatch { .. })
        ));
    }

    fn arb_problem() -> impl Strategy<Value = (Vec<Vec<f64>>, Vec<usize>, Vec<usize>)> {
        prop::collection::vec(prop::collection::vec(-10.0f64..10.0, 2..5), 1..8).prop_flat_map(
            |penalties| {
                let choice_strategies: Vec<_> =
                    penalties.iter().map(|p| 0..p.len()).collect();
                (
                    Just(penalties),
                    choice_strategies.clone(),
                    choice_strategies,
                )
            },
        )
    }

    fn build<F: PenaltySumTransform>(transform: F, penalties: &[Vec<f64>]) -> ChoicePenaltySumCostFunction<F> {
        let mut cf = ChoicePenaltySumCostFunction::with_transform(transform);
        for (node, p) in penalties.iter().enumerate() {
            cf.set_penalties_for_all_choices_at_node(node, p.clone())
                .unwrap();
        }
        cf.set_weight(1.5).unwrap();
        let nodes: Vec<usize> = (0..penalties.len()).collect();
        cf.finalize(&nodes).unwrap();
        cf
    }

    fn check_difference<F: PenaltySumTransform>(
        cf: &ChoicePenaltySumCostFunction<F>,
        old: &[usize],
        new: &[usize],
    ) -> std::result::Result<(), TestCaseError> {
        let expected = cf.compute_cost_function(new, None).unwrap()
            - cf.compute_cost_function(old, None).unwrap();
        let plain = cf.compute_cost_function_difference(old, new, None).unwrap();
        prop_assert!((plain - expected).abs() < 1e-6, "{} vs {}", plain, expected);

        let mut scratch = cf.generate_scratch_space().unwrap();
        cf.compute_cost_function(old, Some(scratch.as_mut())).unwrap();
        let cached = cf
            .compute_cost_function_difference(old, new, Some(scratch.as_mut()))
            .unwrap();
        prop_assert!((cached - expected).abs() < 1e-6, "{} vs {}", cached, expected);
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_difference_matches_full_scores((penalties, old, new) in arb_problem()) {
            check_difference(&build(Identity, &penalties), &old, &new)?;
            check_difference(&build(Square, &penalties), &old, &new)?;
            check_difference(&build(Clamp { min: -5.0, max: 5.0 }, &penalties), &old, &new)?;
            check_difference(&build(Linear { slope: -0.75 }, &penalties), &old, &new)?;
        }
    }
}
