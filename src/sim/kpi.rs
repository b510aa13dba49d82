//! Aggregates computed from simulation results.

use std::fmt;

use super::types::SimulationResult;

/// Sums the present (finite) values, treating anything else as missing.
///
/// Hours at the edge of a horizon may carry no value; they contribute zero
/// instead of poisoning the total.
pub fn sum_present(values: &[f64]) -> f64 {
    values.iter().copied().filter(|v| v.is_finite()).sum()
}

/// Energy and money totals of one simulation run.
#[derive(Debug, Clone)]
pub struct EnergySummary {
    pub pv_wh: f64,
    pub load_wh: f64,
    pub grid_import_wh: f64,
    pub grid_export_wh: f64,
    pub losses_wh: f64,
    /// Share of consumption served without the grid (percent).
    pub autarky_pct: f64,
    pub total_costs: f64,
    pub total_revenue: f64,
    pub total_balance: f64,
}

impl EnergySummary {
    /// Computes the summary from a complete simulation result.
    pub fn from_result(result: &SimulationResult) -> Self {
        let load_wh = sum_present(&result.load_wh);
        let grid_import_wh = sum_present(&result.grid_import_wh);
        let autarky_pct = if load_wh > 0.0 {
            (100.0 * (1.0 - grid_import_wh / load_wh)).clamp(0.0, 100.0)
        } else {
            100.0
        };
        Self {
            pv_wh: sum_present(&result.pv_wh),
            load_wh,
            grid_import_wh,
            grid_export_wh: sum_present(&result.grid_export_wh),
            losses_wh: sum_present(&result.losses_wh),
            autarky_pct,
            total_costs: result.total_costs,
            total_revenue: result.total_revenue,
            total_balance: result.total_balance,
        }
    }
}

impl fmt::Display for EnergySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Energy Summary ---")?;
        writeln!(f, "PV generation:   {:.3} kWh", self.pv_wh / 1000.0)?;
        writeln!(f, "Consumption:     {:.3} kWh", self.load_wh / 1000.0)?;
        writeln!(f, "Grid import:     {:.3} kWh", self.grid_import_wh / 1000.0)?;
        writeln!(f, "Grid export:     {:.3} kWh", self.grid_export_wh / 1000.0)?;
        writeln!(f, "Losses:          {:.3} kWh", self.losses_wh / 1000.0)?;
        writeln!(f, "Autarky:         {:.1}%", self.autarky_pct)?;
        writeln!(f, "Costs:           {:.4}", self.total_costs)?;
        writeln!(f, "Revenue:         {:.4}", self.total_revenue)?;
        write!(f, "Balance:         {:.4}", self.total_balance)
    }
}
