//! Concrete cooling curves.
//!
//! Every schedule reaches its final temperature at the configured final time
//! index and stays there for later indices.

use super::types::{AnnealingSchedule, CallCounter};
use crate::error::{OptimizationError, Result};

const DEFAULT_FINAL_TIME_INDEX: usize = 1000;

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(OptimizationError::InvalidConfig(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}

/// Fraction of the schedule elapsed at `time_index`, clamped to `[0, 1]`.
#[inline]
fn progress(time_index: usize, final_time_index: usize) -> f64 {
    if final_time_index == 0 {
        1.0
    } else {
        time_index.min(final_time_index) as f64 / final_time_index as f64
    }
}

/// Fixed temperature, independent of time.
#[derive(Debug, Clone)]
pub struct ConstantAnnealingSchedule {
    temperature: f64,
    counter: CallCounter,
}

impl ConstantAnnealingSchedule {
    pub fn new(temperature: f64) -> Result<Self> {
        check_positive("temperature", temperature)?;
        Ok(Self {
            temperature,
            counter: CallCounter::new(),
        })
    }
}

impl AnnealingSchedule for ConstantAnnealingSchedule {
    fn class_name(&self) -> &'static str {
        "ConstantAnnealingSchedule"
    }

    fn call_counter(&self) -> &CallCounter {
        &self.counter
    }

    fn temperature_at(&self, _time_index: usize) -> Result<f64> {
        Ok(self.temperature)
    }

    fn set_final_time_index(&mut self, _final_time_index: usize) -> Result<()> {
        Ok(())
    }

    fn deep_clone(&self) -> Box<dyn AnnealingSchedule> {
        let copy = self.clone();
        copy.counter.reset();
        Box::new(copy)
    }
}

/// Linear cooling: `T(t) = T_0 + (T_f - T_0) * t / t_f`.
#[derive(Debug, Clone)]
pub struct LinearAnnealingSchedule {
    initial_temperature: f64,
    final_temperature: f64,
    final_time_index: usize,
    counter: CallCounter,
}

impl LinearAnnealingSchedule {
    /// `final_temperature` may be zero; `initial_temperature` must be positive.
    pub fn new(initial_temperature: f64, final_temperature: f64) -> Result<Self> {
        check_positive("initial_temperature", initial_temperature)?;
        if !(final_temperature >= 0.0 && final_temperature.is_finite()) {
            return Err(OptimizationError::InvalidConfig(format!(
                "final_temperature must be non-negative, got {final_temperature}"
            )));
        }
        Ok(Self {
            initial_temperature,
            final_temperature,
            final_time_index: DEFAULT_FINAL_TIME_INDEX,
            counter: CallCounter::new(),
        })
    }

    pub fn final_time_index(&self) -> usize {
        self.final_time_index
    }
}

impl AnnealingSchedule for LinearAnnealingSchedule {
    fn class_name(&self) -> &'static str {
        "LinearAnnealingSchedule"
    }

    fn call_counter(&self) -> &CallCounter {
        &self.counter
    }

    fn temperature_at(&self, time_index: usize) -> Result<f64> {
        if self.final_time_index == 0 {
            return Ok(self.final_temperature);
        }
        // Weighted form keeps integer steps exact.
        let t = time_index.min(self.final_time_index) as f64;
        let remaining = self.final_time_index as f64 - t;
        Ok((self.initial_temperature * remaining + self.final_temperature * t)
            / self.final_time_index as f64)
    }

    fn set_final_time_index(&mut self, final_time_index: usize) -> Result<()> {
        self.final_time_index = final_time_index;
        Ok(())
    }

    fn deep_clone(&self) -> Box<dyn AnnealingSchedule> {
        let copy = self.clone();
        copy.counter.reset();
        Box::new(copy)
    }
}

/// Geometric (exponential) cooling: `T(t) = T_0 * (T_f / T_0)^(t / t_f)`.
///
/// Equivalent to multiplying by a constant factor each step.
#[derive(Debug, Clone)]
pub struct GeometricAnnealingSchedule {
    initial_temperature: f64,
    final_temperature: f64,
    final_time_index: usize,
    counter: CallCounter,
}

impl GeometricAnnealingSchedule {
    pub fn new(initial_temperature: f64, final_temperature: f64) -> Result<Self> {
        check_positive("initial_temperature", initial_temperature)?;
        check_positive("final_temperature", final_temperature)?;
        Ok(Self {
            initial_temperature,
            final_temperature,
            final_time_index: DEFAULT_FINAL_TIME_INDEX,
            counter: CallCounter::new(),
        })
    }

    /// Per-step multiplication factor for the current final time index.
    pub fn alpha(&self) -> f64 {
        if self.final_time_index == 0 {
            return 1.0;
        }
        (self.final_temperature / self.initial_temperature).powf(1.0 / self.final_time_index as f64)
    }
}

impl AnnealingSchedule for GeometricAnnealingSchedule {
    fn class_name(&self) -> &'static str {
        "GeometricAnnealingSchedule"
    }

    fn call_counter(&self) -> &CallCounter {
        &self.counter
    }

    fn temperature_at(&self, time_index: usize) -> Result<f64> {
        let ratio = self.final_temperature / self.initial_temperature;
        Ok(self.initial_temperature * ratio.powf(progress(time_index, self.final_time_index)))
    }

    fn set_final_time_index(&mut self, final_time_index: usize) -> Result<()> {
        self.final_time_index = final_time_index;
        Ok(())
    }

    fn deep_clone(&self) -> Box<dyn AnnealingSchedule> {
        let copy = self.clone();
        copy.counter.reset();
        Box::new(copy)
    }
}

/// Lundy-Mees cooling: `T_{k+1} = T_k / (1 + beta * T_k)`.
///
/// In closed form `T(t) = T_0 / (1 + t * beta * T_0)`, with `beta` chosen so
/// that `T(t_f) = T_f`. Cools fast while hot and slowly when cold.
///
/// Reference: Lundy & Mees (1986), "Convergence of an Annealing Algorithm"
#[derive(Debug, Clone)]
pub struct LundyMeesAnnealingSchedule {
    initial_temperature: f64,
    final_temperature: f64,
    final_time_index: usize,
    counter: CallCounter,
}

impl LundyMeesAnnealingSchedule {
    pub fn new(initial_temperature: f64, final_temperature: f64) -> Result<Self> {
        check_positive("initial_temperature", initial_temperature)?;
        check_positive("final_temperature", final_temperature)?;
        if final_temperature > initial_temperature {
            return Err(OptimizationError::InvalidConfig(format!(
                "lundy-mees final_temperature ({final_temperature}) exceeds initial_temperature ({initial_temperature})"
            )));
        }
        Ok(Self {
            initial_temperature,
            final_temperature,
            final_time_index: DEFAULT_FINAL_TIME_INDEX,
            counter: CallCounter::new(),
        })
    }

    /// `(T_0 - T_f) / (t_f * T_0 * T_f)`.
    pub fn beta(&self) -> f64 {
        if self.final_time_index == 0 {
            return 0.0;
        }
        (self.initial_temperature - self.final_temperature)
            / (self.final_time_index as f64 * self.initial_temperature * self.final_temperature)
    }
}

impl AnnealingSchedule for LundyMeesAnnealingSchedule {
    fn class_name(&self) -> &'static str {
        "LundyMeesAnnealingSchedule"
    }

    fn call_counter(&self) -> &CallCounter {
        &self.counter
    }

    fn temperature_at(&self, time_index: usize) -> Result<f64> {
        if self.final_time_index == 0 {
            return Ok(self.final_temperature);
        }
        let t = time_index.min(self.final_time_index) as f64;
        Ok(self.initial_temperature / (1.0 + t * self.beta() * self.initial_temperature))
    }

    fn set_final_time_index(&mut self, final_time_index: usize) -> Result<()> {
        self.final_time_index = final_time_index;
        Ok(())
    }

    fn deep_clone(&self) -> Box<dyn AnnealingSchedule> {
        let copy = self.clone();
        copy.counter.reset();
        Box::new(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_constant() {
        let mut s = ConstantAnnealingSchedule::new(2.5).unwrap();
        s.set_final_time_index(10).unwrap();
        for _ in 0..5 {
            assert_close(s.temperature().unwrap(), 2.5);
        }
        assert_eq!(s.call_count(), 5);
        assert!(ConstantAnnealingSchedule::new(0.0).is_err());
    }

    #[test]
    fn test_linear_endpoints_and_clamp() {
        let mut s = LinearAnnealingSchedule::new(100.0, 0.5).unwrap();
        s.set_final_time_index(200).unwrap();
        assert_close(s.temperature_at(0).unwrap(), 100.0);
        assert_close(s.temperature_at(100).unwrap(), 50.25);
        assert_close(s.temperature_at(200).unwrap(), 0.5);
        assert_close(s.temperature_at(10_000).unwrap(), 0.5);
    }

    #[test]
    fn test_linear_zero_final_index() {
        let mut s = LinearAnnealingSchedule::new(10.0, 1.0).unwrap();
        s.set_final_time_index(0).unwrap();
        assert_close(s.temperature_at(0).unwrap(), 1.0);
    }

    #[test]
    fn test_geometric_is_monotone_and_hits_final() {
        let mut s = GeometricAnnealingSchedule::new(100.0, 0.1).unwrap();
        s.set_final_time_index(50).unwrap();
        let mut previous = f64::INFINITY;
        for t in 0..=50 {
            let temp = s.temperature_at(t).unwrap();
            assert!(temp < previous);
            previous = temp;
        }
        assert_close(s.temperature_at(0).unwrap(), 100.0);
        assert_close(s.temperature_at(50).unwrap(), 0.1);
        let ratio = s.temperature_at(11).unwrap() / s.temperature_at(10).unwrap();
        assert_close(ratio, s.alpha());
    }

    #[test]
    fn test_lundy_mees_recurrence() {
        let mut s = LundyMeesAnnealingSchedule::new(10.0, 0.01).unwrap();
        s.set_final_time_index(1000).unwrap();
        let beta = s.beta();
        let mut temp = s.temperature_at(0).unwrap();
        for t in 1..=1000 {
            temp /= 1.0 + beta * temp;
            assert!((temp - s.temperature_at(t).unwrap()).abs() < 1e-6);
        }
        assert_close(s.temperature_at(1000).unwrap(), 0.01);
        assert!(LundyMeesAnnealingSchedule::new(1.0, 2.0).is_err());
    }

    #[test]
    fn test_reset_call_count_keeps_curve() {
        let mut s = LinearAnnealingSchedule::new(4.0, 0.0).unwrap();
        s.set_final_time_index(4).unwrap();
        assert_close(s.temperature().unwrap(), 4.0);
        assert_close(s.temperature().unwrap(), 3.0);
        s.reset_call_count();
        assert_eq!(s.call_count(), 0);
        assert_close(s.temperature().unwrap(), 4.0);
        assert_eq!(s.final_time_index(), 4);
    }

    #[test]
    fn test_deep_clone_resets_counter() {
        let mut s = GeometricAnnealingSchedule::new(5.0, 1.0).unwrap();
        s.set_final_time_index(3).unwrap();
        s.temperature().unwrap();
        s.temperature().unwrap();
        let copy = s.deep_clone();
        assert_eq!(copy.call_count(), 0);
        assert_close(copy.temperature_at(3).unwrap(), 1.0);
        assert_eq!(s.call_count(), 2);
    }

    #[test]
    fn test_deep_clone_of_every_decaying_schedule() {
        let mut linear = LinearAnnealingSchedule::new(6.0, 0.0).unwrap();
        let mut lundy = LundyMeesAnnealingSchedule::new(6.0, 0.5).unwrap();
        linear.set_final_time_index(6).unwrap();
        lundy.set_final_time_index(6).unwrap();
        let schedules: [&dyn AnnealingSchedule; 2] = [&linear, &lundy];
        for schedule in schedules {
            schedule.temperature().unwrap();
            let copy = schedule.deep_clone();
            assert_eq!(copy.call_count(), 0);
            assert_eq!(schedule.call_count(), 1);
            assert_close(copy.temperature().unwrap(), 6.0);
            assert_close(copy.temperature_at(6).unwrap(), schedule.temperature_at(6).unwrap());
        }
    }
}
