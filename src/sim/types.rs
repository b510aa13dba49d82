//! Simulation output types.

use super::power_balance::HourFlows;

/// Outcome of one simulation call.
///
/// Every per-hour array has `total_hours()` entries; index `i` is absolute
/// hour `start_hour + i`. SOC arrays hold the state at the beginning of the
/// hour and are `None` when the device is absent.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    /// First simulated absolute hour.
    pub start_hour: usize,
    /// PV generation (DC).
    pub pv_wh: Vec<f64>,
    /// Household load from the forecast.
    pub household_load_wh: Vec<f64>,
    /// Appliance load.
    pub appliance_wh: Vec<f64>,
    /// AC energy drawn by EV charging, losses included.
    pub ev_charge_wh: Vec<f64>,
    /// AC energy drawn by grid charging of the storage battery.
    pub ac_charge_wh: Vec<f64>,
    /// Total AC consumption: household, appliance, EV, and AC charging.
    pub load_wh: Vec<f64>,
    pub grid_export_wh: Vec<f64>,
    pub grid_import_wh: Vec<f64>,
    /// Consumption served from PV or the battery.
    pub self_consumption_wh: Vec<f64>,
    pub losses_wh: Vec<f64>,
    /// Import cost.
    pub cost: Vec<f64>,
    /// Export revenue.
    pub revenue: Vec<f64>,
    /// Import price per Wh.
    pub electricity_price: Vec<f64>,
    pub battery_soc_percent: Vec<Option<f64>>,
    pub ev_soc_percent: Vec<Option<f64>>,
    /// Change of stored energy in the storage battery.
    pub battery_delta_wh: Vec<f64>,
    /// Change of stored energy in the EV battery.
    pub ev_delta_wh: Vec<f64>,
    pub total_costs: f64,
    pub total_revenue: f64,
    pub total_losses: f64,
    /// `total_costs - total_revenue`.
    pub total_balance: f64,
    /// SOC after the last simulated hour.
    pub final_battery_soc_percent: Option<f64>,
    pub final_ev_soc_percent: Option<f64>,
    /// Deliverable energy left in the storage battery after the last hour.
    pub final_battery_energy_content_wh: f64,
    /// Start hour the appliance actually got, if one is configured.
    pub appliance_start_hour: Option<usize>,
}

impl SimulationResult {
    pub fn total_hours(&self) -> usize {
        self.load_wh.len()
    }

    /// Absolute hour of array index `index`.
    pub fn hour_at(&self, index: usize) -> usize {
        self.start_hour + index
    }

    /// Energy flows of array index `index` for balance checks.
    pub fn flows(&self, index: usize) -> Option<HourFlows> {
        if index >= self.total_hours() {
            return None;
        }
        Some(HourFlows {
            pv_wh: self.pv_wh[index],
            grid_import_wh: self.grid_import_wh[index],
            grid_export_wh: self.grid_export_wh[index],
            losses_wh: self.losses_wh[index],
            battery_delta_wh: self.battery_delta_wh[index],
            ev_delta_wh: self.ev_delta_wh[index],
            demand_wh: self.household_load_wh[index] + self.appliance_wh[index],
        })
    }
}
