/// Hour iterator over the simulated window.
pub mod clock;
pub mod engine;
pub mod kpi;
pub mod power_balance;
/// Decoded hourly control schedules.
pub mod schedule;
pub mod types;

pub use engine::SimulationEngine;
pub use schedule::Schedule;
pub use types::SimulationResult;
