//! Schedule configuration.

use super::schedules::{
    ConstantAnnealingSchedule, GeometricAnnealingSchedule, LinearAnnealingSchedule,
    LundyMeesAnnealingSchedule,
};
use super::types::AnnealingSchedule;
use crate::error::{OptimizationError, Result};

/// Cooling schedule description, turned into a live schedule with [`build`](Self::build).
///
/// # References
///
/// - Geometric: standard textbook approach
/// - Linear: fixed-duration cooling
/// - LundyMees: Lundy & Mees (1986), with convergence proof
///
/// # Examples
///
/// ```
/// use u_cfnopt::annealing::CoolingSchedule;
///
/// let cooling = CoolingSchedule::Geometric {
///     initial_temperature: 50.0,
///     final_temperature: 0.5,
/// };
/// let schedule = cooling.build(100).unwrap();
/// assert!((schedule.temperature_at(100).unwrap() - 0.5).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CoolingSchedule {
    /// Fixed temperature for the whole run.
    Constant { temperature: f64 },

    /// Temperature decreases uniformly to `final_temperature`.
    Linear {
        initial_temperature: f64,
        final_temperature: f64,
    },

    /// Exponential cooling. Most widely used.
    Geometric {
        initial_temperature: f64,
        final_temperature: f64,
    },

    /// Fast at high temperature, slow at low temperature.
    LundyMees {
        initial_temperature: f64,
        final_temperature: f64,
    },
}

impl Default for CoolingSchedule {
    fn default() -> Self {
        CoolingSchedule::Geometric {
            initial_temperature: 100.0,
            final_temperature: 0.3,
        }
    }
}

impl CoolingSchedule {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        self.build(1).map(|_| ())
    }

    /// Temperature at time zero.
    pub fn initial_temperature(&self) -> f64 {
        match *self {
            CoolingSchedule::Constant { temperature } => temperature,
            CoolingSchedule::Linear {
                initial_temperature,
                ..
            }
            | CoolingSchedule::Geometric {
                initial_temperature,
                ..
            }
            | CoolingSchedule::LundyMees {
                initial_temperature,
                ..
            } => initial_temperature,
        }
    }

    /// Builds a schedule reaching its final temperature at `final_time_index`.
    pub fn build(&self, final_time_index: usize) -> Result<Box<dyn AnnealingSchedule>> {
        let mut schedule: Box<dyn AnnealingSchedule> = match *self {
            CoolingSchedule::Constant { temperature } => {
                Box::new(ConstantAnnealingSchedule::new(temperature)?)
            }
            CoolingSchedule::Linear {
                initial_temperature,
                final_temperature,
            } => Box::new(LinearAnnealingSchedule::new(
                initial_temperature,
                final_temperature,
            )?),
            CoolingSchedule::Geometric {
                initial_temperature,
                final_temperature,
            } => Box::new(GeometricAnnealingSchedule::new(
                initial_temperature,
                final_temperature,
            )?),
            CoolingSchedule::LundyMees {
                initial_temperature,
                final_temperature,
            } => Box::new(LundyMeesAnnealingSchedule::new(
                initial_temperature,
                final_temperature,
            )?),
        };
        schedule.set_final_time_index(final_time_index)?;
        Ok(schedule)
    }
}

impl TryFrom<CoolingSchedule> for Box<dyn AnnealingSchedule> {
    type Error = OptimizationError;

    fn try_from(cooling: CoolingSchedule) -> Result<Self> {
        cooling.build(1000)
    }
}
