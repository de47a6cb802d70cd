//! Named factories for optimizers, schedules, cost functions and problems.
//!
//! A [`CreatorRegistry`] maps `namespace::name` to a [`Creator`] that builds
//! a fresh [`Component`]. Callers that only know a component by name (a
//! configuration file, a scripting layer) look it up here, by full name, by
//! category prefix, or by keyword.
//!
//! ```
//! use u_cfnopt::registry::{Component, CreatorRegistry};
//!
//! let registry = CreatorRegistry::with_builtin_creators().unwrap();
//! let annealers = registry.handles_with_keyword("simulated annealing");
//! assert!(!annealers.is_empty());
//!
//! match registry.create("u_cfnopt::MonteCarloOptimizer").unwrap() {
//!     Component::Optimizer(_) => {}
//!     other => panic!("unexpected {}", other.kind()),
//! }
//! ```

use crate::annealing::{AnnealingSchedule, CoolingSchedule};
use crate::cfn::{
    ChoicePenaltySumCostFunction, CostFunction, CostFunctionNetworkOptimizationProblem,
    PairwisePrecomputedOptimizationProblem, SquareOfChoicePenaltySumCostFunction,
};
use crate::error::{OptimizationError, Result};
use crate::optimizer::{ExhaustiveOptimizer, MonteCarloConfig, MonteCarloOptimizer, Optimizer};
use crate::problem::{OptimizationProblem, RealValuedLocalOptimizationProblem};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

const CLASS: &str = "CreatorRegistry";
const BUILTIN_NAMESPACE: &str = "u_cfnopt";

/// Anything a [`Creator`] can build.
pub enum Component {
    Optimizer(Box<dyn Optimizer>),
    AnnealingSchedule(Box<dyn AnnealingSchedule>),
    CostFunction(Box<dyn CostFunction>),
    Problem(Box<dyn OptimizationProblem>),
}

impl Component {
    pub fn kind(&self) -> &'static str {
        match self {
            Component::Optimizer(_) => "optimizer",
            Component::AnnealingSchedule(_) => "annealing schedule",
            Component::CostFunction(_) => "cost function",
            Component::Problem(_) => "problem",
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Optimizer(_) => f.write_str("Component::Optimizer(..)"),
            Component::AnnealingSchedule(s) => write!(f, "Component::AnnealingSchedule({})", s.class_name()),
            Component::CostFunction(c) => write!(f, "Component::CostFunction({})", c.class_name()),
            Component::Problem(p) => write!(f, "Component::Problem({})", p.class_name()),
        }
    }
}

/// Describes and builds one kind of component.
pub trait Creator: Send + Sync {
    fn name(&self) -> &str;

    fn namespace(&self) -> &str;

    /// `::`-separated paths such as `Optimizers::CostFunctionNetwork`.
    fn categories(&self) -> &[String];

    fn keywords(&self) -> &[String];

    /// Builds a new instance with default settings.
    fn create(&self) -> Result<Component>;

    fn full_name(&self) -> String {
        format!("{}::{}", self.namespace(), self.name())
    }
}

type Factory = Box<dyn Fn() -> Result<Component> + Send + Sync>;

/// A [`Creator`] backed by a closure.
pub struct FnCreator {
    namespace: String,
    name: String,
    categories: Vec<String>,
    keywords: Vec<String>,
    factory: Factory,
}

impl FnCreator {
    pub fn new<F>(namespace: impl Into<String>, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Component> + Send + Sync + 'static,
    {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            categories: Vec::new(),
            keywords: Vec::new(),
            factory: Box::new(factory),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.extend(keywords.into_iter().map(Into::into));
        self
    }
}

impl Creator for FnCreator {
    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn categories(&self) -> &[String] {
        &self.categories
    }

    fn keywords(&self) -> &[String] {
        &self.keywords
    }

    fn create(&self) -> Result<Component> {
        (self.factory)()
    }
}

impl fmt::Debug for FnCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCreator")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("categories", &self.categories)
            .field("keywords", &self.keywords)
            .finish_non_exhaustive()
    }
}

/// Position of a creator inside its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CreatorHandle(usize);

impl CreatorHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Arena of creators, looked up by handle or by `namespace::name`.
#[derive(Default)]
pub struct CreatorRegistry {
    creators: Vec<Box<dyn Creator>>,
    by_full_name: HashMap<String, CreatorHandle>,
}

impl CreatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every component this crate ships.
    pub fn with_builtin_creators() -> Result<Self> {
        let mut registry = Self::new();
        registry.register_builtin_creators()?;
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.creators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }

    /// Adds a creator. Full names must be unique.
    pub fn register(&mut self, creator: Box<dyn Creator>) -> Result<CreatorHandle> {
        let full_name = creator.full_name();
        if self.by_full_name.contains_key(&full_name) {
            return Err(OptimizationError::InvalidInput {
                class: CLASS,
                operation: "register",
                message: format!("a creator named {full_name} is already registered"),
            });
        }
        let handle = CreatorHandle(self.creators.len());
        debug!(event = "creator_registered", creator = %full_name, handle = handle.0);
        self.creators.push(creator);
        self.by_full_name.insert(full_name, handle);
        Ok(handle)
    }

    pub fn creator(&self, handle: CreatorHandle) -> Result<&dyn Creator> {
        self.creators
            .get(handle.0)
            .map(|c| c.as_ref())
            .ok_or(OptimizationError::IndexOutOfRange {
                class: CLASS,
                operation: "creator",
                index: handle.0,
                len: self.creators.len(),
            })
    }

    /// Handle of the creator registered as `namespace::name`.
    pub fn find(&self, full_name: &str) -> Option<CreatorHandle> {
        self.by_full_name.get(full_name).copied()
    }

    /// Builds the component registered as `namespace::name`.
    pub fn create(&self, full_name: &str) -> Result<Component> {
        let handle = self.find(full_name).ok_or_else(|| OptimizationError::InvalidInput {
            class: CLASS,
            operation: "create",
            message: format!("no creator named {full_name}"),
        })?;
        self.creator(handle)?.create()
    }

    /// Creators with a category equal to `prefix` or nested below it.
    pub fn handles_in_category(&self, prefix: &str) -> Vec<CreatorHandle> {
        self.handles_where(|c| {
            c.categories().iter().any(|category| {
                category == prefix
                    || category
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with("::"))
            })
        })
    }

    /// Creators tagged with `keyword`, ignoring case.
    pub fn handles_with_keyword(&self, keyword: &str) -> Vec<CreatorHandle> {
        self.handles_where(|c| c.keywords().iter().any(|k| k.eq_ignore_ascii_case(keyword)))
    }

    fn handles_where<P>(&self, predicate: P) -> Vec<CreatorHandle>
    where
        P: Fn(&dyn Creator) -> bool,
    {
        self.creators
            .iter()
            .enumerate()
            .filter(|(_, c)| predicate(c.as_ref()))
            .map(|(i, _)| CreatorHandle(i))
            .collect()
    }

    /// Registers every optimizer, schedule, cost function and problem this
    /// crate ships, under the `u_cfnopt` namespace.
    pub fn register_builtin_creators(&mut self) -> Result<()> {
        let builtin = |name: &str, category: &str, factory: fn() -> Result<Component>| {
            FnCreator::new(BUILTIN_NAMESPACE, name, factory).with_category(category)
        };

        self.register(Box::new(
            builtin("MonteCarloOptimizer", "Optimizers::CostFunctionNetwork", || {
                Ok(Component::Optimizer(Box::new(MonteCarloOptimizer::new(
                    MonteCarloConfig::default(),
                )?)))
            })
            .with_keywords(["simulated annealing", "monte carlo", "stochastic"]),
        ))?;
        self.register(Box::new(
            builtin("ExhaustiveOptimizer", "Optimizers::CostFunctionNetwork", || {
                Ok(Component::Optimizer(Box::new(ExhaustiveOptimizer::new())))
            })
            .with_keywords(["exhaustive", "brute force", "deterministic"]),
        ))?;

        let schedules: [(&str, fn() -> Result<Component>); 4] = [
            ("ConstantAnnealingSchedule", || {
                schedule(CoolingSchedule::Constant { temperature: 1.0 })
            }),
            ("LinearAnnealingSchedule", || {
                schedule(CoolingSchedule::Linear {
                    initial_temperature: 100.0,
                    final_temperature: 0.3,
                })
            }),
            ("GeometricAnnealingSchedule", || schedule(CoolingSchedule::default())),
            ("LundyMeesAnnealingSchedule", || {
                schedule(CoolingSchedule::LundyMees {
                    initial_temperature: 100.0,
                    final_temperature: 0.3,
                })
            }),
        ];
        for (name, factory) in schedules {
            self.register(Box::new(
                builtin(name, "AnnealingSchedules", factory)
                    .with_keywords(["annealing schedule", "temperature"]),
            ))?;
        }

        self.register(Box::new(
            builtin("ChoicePenaltySumCostFunction", "CostFunctions::CostFunctionNetwork", || {
                let cost_function: ChoicePenaltySumCostFunction = ChoicePenaltySumCostFunction::new();
                Ok(Component::CostFunction(Box::new(cost_function)))
            })
            .with_keywords(["penalty", "one-body"]),
        ))?;
        self.register(Box::new(
            builtin(
                "SquareOfChoicePenaltySumCostFunction",
                "CostFunctions::CostFunctionNetwork",
                || {
                    Ok(Component::CostFunction(Box::new(
                        SquareOfChoicePenaltySumCostFunction::with_transform(Default::default()),
                    )))
                },
            )
            .with_keywords(["penalty", "square", "nonlinear"]),
        ))?;

        self.register(Box::new(
            builtin(
                "CostFunctionNetworkOptimizationProblem",
                "Problems::CostFunctionNetwork",
                || {
                    Ok(Component::Problem(Box::new(
                        CostFunctionNetworkOptimizationProblem::new(),
                    )))
                },
            )
            .with_keywords(["cost function network", "discrete"]),
        ))?;
        self.register(Box::new(
            builtin(
                "PairwisePrecomputedOptimizationProblem",
                "Problems::CostFunctionNetwork",
                || {
                    Ok(Component::Problem(Box::new(
                        PairwisePrecomputedOptimizationProblem::new(),
                    )))
                },
            )
            .with_keywords(["cost function network", "discrete", "pairwise"]),
        ))?;
        self.register(Box::new(
            builtin(
                "RealValuedLocalOptimizationProblem",
                "Problems::RealValuedLocal",
                || {
                    Ok(Component::Problem(Box::new(
                        RealValuedLocalOptimizationProblem::new(),
                    )))
                },
            )
            .with_keywords(["continuous", "local"]),
        ))?;
        Ok(())
    }
}

fn schedule(cooling: CoolingSchedule) -> Result<Component> {
    Ok(Component::AnnealingSchedule(Box::<dyn AnnealingSchedule>::try_from(cooling)?))
}

impl fmt::Debug for CreatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.creators.iter().map(|c| c.full_name()).collect();
        f.debug_struct("CreatorRegistry")
            .field("creators", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(registry: &CreatorRegistry, handles: Vec<CreatorHandle>) -> Vec<String> {
        handles
            .into_iter()
            .map(|h| registry.creator(h).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_builtins_create_matching_classes() {
        let registry = CreatorRegistry::with_builtin_creators().unwrap();
        assert_eq!(registry.len(), 11);
        for i in 0..registry.len() {
            let creator = registry.creator(CreatorHandle(i)).unwrap();
            let component = creator.create().unwrap();
            let class = match &component {
                Component::Optimizer(_) => continue,
                Component::AnnealingSchedule(s) => s.class_name(),
                Component::CostFunction(c) => c.class_name(),
                Component::Problem(p) => p.class_name(),
            };
            assert_eq!(class, creator.name());
        }
    }

    #[test]
    fn test_lookup_by_full_name() {
        let registry = CreatorRegistry::with_builtin_creators().unwrap();
        let handle = registry.find("u_cfnopt::LundyMeesAnnealingSchedule").unwrap();
        assert_eq!(registry.creator(handle).unwrap().namespace(), "u_cfnopt");
        assert!(registry.find("LundyMeesAnnealingSchedule").is_none());
        assert!(matches!(
            registry.create("u_cfnopt::Nope"),
            Err(OptimizationError::InvalidInput { .. })
        ));
        assert!(matches!(
            registry.creator(CreatorHandle(99)),
            Err(OptimizationError::IndexOutOfRange { index: 99, .. })
        ));
    }

    #[test]
    fn test_lookup_by_category_prefix() {
        let registry = CreatorRegistry::with_builtin_creators().unwrap();
        assert_eq!(
            names(&registry, registry.handles_in_category("Optimizers")),
            vec!["MonteCarloOptimizer", "ExhaustiveOptimizer"]
        );
        assert_eq!(registry.handles_in_category("Problems").len(), 3);
        assert_eq!(registry.handles_in_category("Problems::RealValuedLocal").len(), 1);
        assert!(registry.handles_in_category("Problem").is_empty());
    }

    #[test]
    fn test_lookup_by_keyword() {
        let registry = CreatorRegistry::with_builtin_creators().unwrap();
        assert_eq!(
            names(&registry, registry.handles_with_keyword("PAIRWISE")),
            vec!["PairwisePrecomputedOptimizationProblem"]
        );
        assert_eq!(registry.handles_with_keyword("temperature").len(), 4);
        assert!(registry.handles_with_keyword("genetic").is_empty());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = CreatorRegistry::new();
        let make = || {
            FnCreator::new("mine", "Flat", || {
                Ok(Component::Problem(Box::new(CostFunctionNetworkOptimizationProblem::new())))
            })
        };
        let first = registry.register(Box::new(make())).unwrap();
        assert_eq!(first.index(), 0);
        assert!(registry.register(Box::new(make())).is_err());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.creator(first).unwrap().full_name(), "mine::Flat");
    }

    #[test]
    fn test_created_components_are_independent() {
        let registry = CreatorRegistry::with_builtin_creators().unwrap();
        let a = registry.create("u_cfnopt::GeometricAnnealingSchedule").unwrap();
        let b = registry.create("u_cfnopt::GeometricAnnealingSchedule").unwrap();
        match (a, b) {
            (Component::AnnealingSchedule(a), Component::AnnealingSchedule(b)) => {
                a.temperature().unwrap();
                assert_eq!(a.call_count(), 1);
                assert_eq!(b.call_count(), 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
