//! Core trait for annealing schedules.

use crate::error::{OptimizationError, Result};
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Thread-safe call counter shared by all schedules.
///
/// Cloning copies the current count; the copies then advance independently.
#[derive(Debug, Default)]
pub struct CallCounter(AtomicUsize);

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current number of recorded calls.
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    /// Records one call and returns the count from before it.
    pub fn advance(&self) -> usize {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

impl Clone for CallCounter {
    fn clone(&self) -> Self {
        Self(AtomicUsize::new(self.get()))
    }
}

/// A temperature-versus-time function for stochastic local search.
///
/// Implementors supply the curve through [`temperature_at`](Self::temperature_at)
/// and [`set_final_time_index`](Self::set_final_time_index). The defaults of
/// both report [`OptimizationError::NotImplemented`], so a type that only
/// provides a counter is a valid but unusable schedule.
///
/// # Call counting
///
/// [`temperature`](Self::temperature) evaluates the curve at the current call
/// count and advances the counter, so successive calls walk down the curve:
/// the first call returns `temperature_at(0)`, the second `temperature_at(1)`,
/// and so on. [`temperature_at`](Self::temperature_at) never touches the counter.
///
/// # Examples
///
/// ```
/// use u_cfnopt::annealing::{AnnealingSchedule, LinearAnnealingSchedule};
///
/// let mut schedule = LinearAnnealingSchedule::new(10.0, 0.0).unwrap();
/// schedule.set_final_time_index(10).unwrap();
/// assert_eq!(schedule.temperature().unwrap(), 10.0);
/// assert_eq!(schedule.temperature().unwrap(), 9.0);
/// assert_eq!(schedule.call_count(), 2);
/// assert_eq!(schedule.temperature_at(5).unwrap(), 5.0);
/// assert_eq!(schedule.call_count(), 2);
/// ```
pub trait AnnealingSchedule: Send + Sync + Debug {
    /// Name used in error messages and by the creator registry.
    fn class_name(&self) -> &'static str;

    /// The schedule's call counter.
    fn call_counter(&self) -> &CallCounter;

    /// Temperature at an arbitrary time index. Pure.
    fn temperature_at(&self, time_index: usize) -> Result<f64> {
        let _ = time_index;
        Err(OptimizationError::NotImplemented {
            class: self.class_name(),
            operation: "temperature_at",
        })
    }

    /// Sets the time index at which the curve reaches its final temperature.
    fn set_final_time_index(&mut self, final_time_index: usize) -> Result<()> {
        let _ = final_time_index;
        Err(OptimizationError::NotImplemented {
            class: self.class_name(),
            operation: "set_final_time_index",
        })
    }

    /// Independent copy with its call counter reset to zero.
    fn deep_clone(&self) -> Box<dyn AnnealingSchedule>;

    /// Temperature at the current call count; advances the counter.
    fn temperature(&self) -> Result<f64> {
        let time_index = self.call_counter().advance();
        self.temperature_at(time_index)
    }

    fn call_count(&self) -> usize {
        self.call_counter().get()
    }

    /// Zeroes the call counter. Curve parameters are untouched.
    fn reset_call_count(&self) {
        self.call_counter().reset();
    }
}
