//! Device models stepped hour by hour by the simulation engine.

/// Storage and electric vehicle battery model.
pub mod battery;
/// Schedulable household appliance.
pub mod home_appliance;
/// Hybrid PV inverter with an optional attached battery.
pub mod inverter;
pub mod types;

// Re-export the main types for convenience
pub use battery::{Battery, BatteryKind, BatteryParameters, VehicleParameters};
pub use home_appliance::{HomeAppliance, HomeApplianceParameters, TimeWindow};
pub use inverter::{Inverter, InverterFlow, InverterParameters};
pub use types::{FullSelfConsumption, LinearSelfConsumption, SelfConsumption};
