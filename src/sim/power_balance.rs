//! Per-hour energy balance.

/// Energy flows of one simulated hour, all in Wh.
///
/// Sign convention: every field is a non-negative magnitude except the
/// storage deltas, which are positive when energy was stored.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HourFlows {
    pub pv_wh: f64,
    pub grid_import_wh: f64,
    pub grid_export_wh: f64,
    pub losses_wh: f64,
    pub battery_delta_wh: f64,
    pub ev_delta_wh: f64,
    /// Household and appliance load, excluding battery and EV charging.
    pub demand_wh: f64,
}

/// Returns the energy left unaccounted in one hour.
///
/// `pv + import - export - losses - Δbattery - Δev - demand`, which is zero
/// for a physically consistent hour.
pub fn residual_wh(flows: &HourFlows) -> f64 {
    flows.pv_wh + flows.grid_import_wh
        - flows.grid_export_wh
        - flows.losses_wh
        - flows.battery_delta_wh
        - flows.ev_delta_wh
        - flows.demand_wh
}
