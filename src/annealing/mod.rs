//! Annealing schedules.
//!
//! A schedule maps a time index to a temperature for stochastic local
//! search. Each schedule counts how often its temperature has been requested,
//! so an optimizer can simply call [`AnnealingSchedule::temperature`] once
//! per move and walk down the curve.
//!
//! # References
//!
//! - Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"
//! - Lundy & Mees (1986), "Convergence of an Annealing Algorithm"

mod config;
mod schedules;
mod types;

pub use config::CoolingSchedule;
pub use schedules::{
    ConstantAnnealingSchedule, GeometricAnnealingSchedule, LinearAnnealingSchedule,
    LundyMeesAnnealingSchedule,
};
pub use types::{AnnealingSchedule, CallCounter};
