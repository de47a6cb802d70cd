//! Cost function network optimization.
//!
//! Finds one choice per node that minimizes a sum of pluggable cost terms
//! over a set of nodes with finite, mutually exclusive choices (weighted
//! constraint satisfaction, e.g. side-chain packing).
//!
//! - **Problems** ([`problem`], [`cfn`]): nodes, choices and cost terms,
//!   frozen by `finalize()` into read-only data that many threads can score
//!   against at once.
//! - **Cost functions** ([`cfn::cost_function`]): full and incremental
//!   scoring of candidate assignments, with per-attempt scratch spaces.
//! - **Annealing schedules** ([`annealing`]): temperature as a function of
//!   an internal call counter.
//! - **Optimizers** ([`optimizer`]): Monte Carlo simulated annealing and
//!   exhaustive enumeration, behind a common contract.
//! - **Solutions** ([`solution`]): scored results, ranked per problem.
//! - **Indexed matrix** ([`matrix`]): square storage laid out along a
//!   Hilbert curve, used for pairwise penalty tables.
//!
//! # Architecture
//!
//! Problems are built through shared references and guarded by a mutex
//! until `finalize()`; afterwards they are immutable. Optimizers own all
//! mutable search state (assignments, scratch spaces, random generators) per
//! attempt, and run attempts on a [`threads::WorkExecutor`]. Components can
//! be created by name through a [`registry::CreatorRegistry`].

pub mod annealing;
pub mod cfn;
pub mod error;
pub mod matrix;
pub mod optimizer;
pub mod problem;
pub mod registry;
pub mod solution;
pub mod threads;

pub use error::{OptimizationError, Result};
