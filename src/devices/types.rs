//! Collaborator traits shared by the device models.

use std::fmt::Debug;

/// Predicts how much of an hour's PV surplus coincides with household load.
///
/// Hourly energy totals hide intra-hour timing: an hour with a net surplus may
/// still contain minutes where load exceeded PV. The returned ratio is the
/// matched share; `1 - ratio` of the surplus is treated as load that had to
/// be served from the battery or the grid.
pub trait SelfConsumption: Debug + Send + Sync {
    /// Returns the self-consumption ratio for one hour.
    ///
    /// # Arguments
    ///
    /// * `consumption_wh` - AC consumption in the hour
    /// * `generation_ac_wh` - PV generation after DC to AC conversion
    /// * `hour` - Absolute hour index
    ///
    /// # Returns
    ///
    /// Ratio in `[0, 1]`; callers clamp values outside this range.
    fn ratio(&self, consumption_wh: f64, generation_ac_wh: f64, hour: usize) -> f64;
}

/// Assumes perfectly matched load and generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullSelfConsumption;

impl SelfConsumption for FullSelfConsumption {
    fn ratio(&self, _consumption_wh: f64, _generation_ac_wh: f64, _hour: usize) -> f64 {
        1.0
    }
}

/// Linear fit over the load-to-generation ratio:
/// `intercept + slope * consumption / generation`.
#[derive(Debug, Clone, Copy)]
pub struct LinearSelfConsumption {
    pub intercept: f64,
    pub slope: f64,
}

impl SelfConsumption for LinearSelfConsumption {
    fn ratio(&self, consumption_wh: f64, generation_ac_wh: f64, _hour: usize) -> f64 {
        if generation_ac_wh <= 0.0 {
            return 1.0;
        }
        (self.intercept + self.slope * consumption_wh / generation_ac_wh).clamp(0.0, 1.0)
    }
}
