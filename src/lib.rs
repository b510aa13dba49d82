//! Home energy management: hourly simulation of a PV home with battery, EV,
//! and a schedulable appliance, plus a genetic optimizer for the schedule.

/// TOML scenarios and built-in presets.
pub mod config;
pub mod context;
pub mod devices;
pub mod error;
pub mod forecast;
pub mod io;
/// Genetic search over charge and appliance schedules.
pub mod optimizer;
/// Simulation engine, schedules, and result types.
pub mod sim;

pub use error::{ConfigError, Error, Result};
