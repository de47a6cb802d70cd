//! Lock helpers shared by the concrete problems.
//!
//! Every problem keeps its mutable setup data behind a `Mutex` and its
//! precomputed data in a `OnceLock`. Setters hold the lock for the whole
//! call; `finalize` holds it for the whole precomputation pass and publishes
//! the result through the `OnceLock`, which readers access without locking.

use crate::error::{OptimizationError, Result};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

/// Locks `builder`, recovering the guard from a poisoned lock.
pub(crate) fn lock<B>(builder: &Mutex<B>) -> MutexGuard<'_, B> {
    builder.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Locks `builder` for a setter, failing once the problem is finalized.
pub(crate) fn lock_unfinalized<'a, B, F>(
    builder: &'a Mutex<B>,
    frozen: &OnceLock<F>,
    class: &'static str,
    operation: &'static str,
) -> Result<MutexGuard<'a, B>> {
    let guard = lock(builder);
    if frozen.get().is_some() {
        return Err(OptimizationError::Finalized { class, operation });
    }
    Ok(guard)
}

/// Locks `builder` for `finalize`, failing on a second call.
pub(crate) fn lock_for_finalize<'a, B, F>(
    builder: &'a Mutex<B>,
    frozen: &OnceLock<F>,
    class: &'static str,
) -> Result<MutexGuard<'a, B>> {
    let guard = lock(builder);
    if frozen.get().is_some() {
        return Err(OptimizationError::AlreadyFinalized {
            class,
            operation: "finalize",
        });
    }
    Ok(guard)
}

/// Publishes precomputed data. Must be called with the builder lock held.
pub(crate) fn publish<F>(frozen: &OnceLock<F>, data: F, class: &'static str) -> Result<()> {
    frozen
        .set(data)
        .map_err(|_| OptimizationError::AlreadyFinalized {
            class,
            operation: "finalize",
        })
}

/// Precomputed data, or `NotFinalized`.
pub(crate) fn frozen<'a, F>(
    frozen: &'a OnceLock<F>,
    class: &'static str,
    operation: &'static str,
) -> Result<&'a F> {
    frozen
        .get()
        .ok_or(OptimizationError::NotFinalized { class, operation })
}

/// Copy of a `OnceLock`, set iff the source is set.
pub(crate) fn clone_frozen<F: Clone>(source: &OnceLock<F>) -> OnceLock<F> {
    let copy = OnceLock::new();
    if let Some(data) = source.get() {
        let _ = copy.set(data.clone());
    }
    copy
}
