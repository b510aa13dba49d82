use std::sync::Arc;

use crate::devices::battery::Battery;
use crate::devices::types::{FullSelfConsumption, SelfConsumption};
use crate::error::{ConfigError, Error, Result};

/// Static inverter parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct InverterParameters {
    pub device_id: String,
    /// AC power ceiling per hour.
    pub max_power_wh: f64,
    pub dc_to_ac_efficiency: f64,
    pub ac_to_dc_efficiency: f64,
    /// Grid charging ceiling; defaults to the battery's max charge power.
    pub max_ac_charge_power_w: Option<f64>,
    /// Id of the battery behind this inverter, if any.
    pub battery_id: Option<String>,
}

impl InverterParameters {
    /// Creates lossless inverter parameters with no battery reference.
    pub fn new(device_id: impl Into<String>, max_power_wh: f64) -> Self {
        Self {
            device_id: device_id.into(),
            max_power_wh,
            dc_to_ac_efficiency: 1.0,
            ac_to_dc_efficiency: 1.0,
            max_ac_charge_power_w: None,
            battery_id: None,
        }
    }

    pub fn with_battery_id(mut self, battery_id: impl Into<String>) -> Self {
        self.battery_id = Some(battery_id.into());
        self
    }

    /// # Errors
    ///
    /// Returns the first `ConfigError` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let id = &self.device_id;
        if !(self.max_power_wh.is_finite() && self.max_power_wh > 0.0) {
            return Err(ConfigError::new(
                format!("{id}.max_power_wh"),
                format!("must be > 0, got {}", self.max_power_wh),
            ));
        }
        for (name, eff) in [
            ("dc_to_ac_efficiency", self.dc_to_ac_efficiency),
            ("ac_to_dc_efficiency", self.ac_to_dc_efficiency),
        ] {
            if !(eff.is_finite() && eff > 0.0 && eff <= 1.0) {
                return Err(ConfigError::new(
                    format!("{id}.{name}"),
                    format!("must be in (0, 1], got {eff}"),
                ));
            }
        }
        if let Some(power) = self.max_ac_charge_power_w {
            if !(power.is_finite() && power > 0.0) {
                return Err(ConfigError::new(
                    format!("{id}.max_ac_charge_power_w"),
                    format!("must be > 0, got {power}"),
                ));
            }
        }
        Ok(())
    }
}

/// Energy flows of one inverter hour, all in Wh and non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InverterFlow {
    pub grid_export_wh: f64,
    pub grid_import_wh: f64,
    pub losses_wh: f64,
    /// AC consumption served from PV or the battery.
    pub self_consumption_wh: f64,
}

/// Hybrid inverter routing PV, battery, and grid energy for one hour at a time.
#[derive(Debug, Clone)]
pub struct Inverter {
    params: InverterParameters,
    battery: Option<Battery>,
    self_consumption: Arc<dyn SelfConsumption>,
}

impl Inverter {
    /// Creates an inverter with an optional attached battery.
    ///
    /// # Errors
    ///
    /// * `Error::Config` - a parameter is out of range
    /// * `Error::BatteryMismatch` - the attached battery has a different id
    /// * `Error::MissingBattery` - a battery id is configured but none attached
    pub fn new(
        params: InverterParameters,
        battery: Option<Battery>,
        self_consumption: Arc<dyn SelfConsumption>,
    ) -> Result<Self> {
        params.validate()?;
        match (&params.battery_id, &battery) {
            (Some(expected), Some(battery)) if battery.device_id() != expected => {
                return Err(Error::BatteryMismatch {
                    inverter: params.device_id.clone(),
                    expected: expected.clone(),
                    actual: battery.device_id().to_string(),
                });
            }
            (Some(expected), None) => {
                return Err(Error::MissingBattery {
                    inverter: params.device_id.clone(),
                    expected: expected.clone(),
                });
            }
            _ => {}
        }
        Ok(Self {
            params,
            battery,
            self_consumption,
        })
    }

    /// Creates an inverter that assumes fully matched self-consumption.
    pub fn with_full_self_consumption(
        params: InverterParameters,
        battery: Option<Battery>,
    ) -> Result<Self> {
        Self::new(params, battery, Arc::new(FullSelfConsumption))
    }

    pub fn device_id(&self) -> &str {
        &self.params.device_id
    }

    pub fn parameters(&self) -> &InverterParameters {
        &self.params
    }

    pub fn battery(&self) -> Option<&Battery> {
        self.battery.as_ref()
    }

    pub fn battery_mut(&mut self) -> Option<&mut Battery> {
        self.battery.as_mut()
    }

    /// Grid charging ceiling in Wh per hour; zero without a battery.
    pub fn max_ac_charge_power_w(&self) -> f64 {
        match &self.battery {
            Some(battery) => self
                .params
                .max_ac_charge_power_w
                .unwrap_or(battery.max_charge_power_w()),
            None => 0.0,
        }
    }

    /// Routes one hour of PV generation against AC consumption.
    ///
    /// DC charging of the attached battery follows the battery's
    /// charge-allowed flag for `hour`.
    ///
    /// # Arguments
    ///
    /// * `generation_dc_wh` - PV generation on the DC side
    /// * `consumption_ac_wh` - AC load to serve
    /// * `hour` - Absolute hour index
    ///
    /// # Returns
    ///
    /// The hour's grid, loss, and self-consumption flows. The battery's
    /// stored energy changes by `generation + import - export - losses - consumption`.
    pub fn process_energy(
        &mut self,
        generation_dc_wh: f64,
        consumption_ac_wh: f64,
        hour: usize,
    ) -> InverterFlow {
        let generation = generation_dc_wh.max(0.0);
        let consumption = consumption_ac_wh.max(0.0);
        let pv_ac = generation * self.params.dc_to_ac_efficiency;

        if pv_ac >= consumption || pv_ac >= self.params.max_power_wh {
            self.route_surplus(generation, consumption, hour)
        } else {
            self.route_deficit(generation, consumption, hour)
        }
    }

    fn route_surplus(&mut self, generation: f64, consumption: f64, hour: usize) -> InverterFlow {
        let eff = self.params.dc_to_ac_efficiency;
        let max_power = self.params.max_power_wh;
        let mut flow = InverterFlow::default();

        let (direct_ac, unmatched_ac) = if consumption > max_power {
            flow.grid_import_wh = consumption - max_power;
            (max_power, 0.0)
        } else {
            let pv_ac = generation * eff;
            let scr = self
                .self_consumption
                .ratio(consumption, pv_ac, hour)
                .clamp(0.0, 1.0);
            let unmatched = ((pv_ac - consumption) * (1.0 - scr)).clamp(0.0, consumption);
            (consumption - unmatched, unmatched)
        };
        flow.losses_wh += direct_ac / eff - direct_ac;
        flow.self_consumption_wh = direct_ac;

        if unmatched_ac > 0.0 {
            let battery_ac = self.discharge_for_ac(unmatched_ac, hour, &mut flow);
            flow.self_consumption_wh += battery_ac;
            flow.grid_import_wh += unmatched_ac - battery_ac;
        }

        let mut remaining_dc = (generation - direct_ac / eff).max(0.0);
        if let Some(battery) = self.battery.as_mut() {
            let (charged, loss) = battery.charge_energy(Some(remaining_dc), hour, 0.0);
            flow.losses_wh += loss;
            remaining_dc = (remaining_dc - charged - loss).max(0.0);
        }

        let export_cap = (max_power - consumption).max(0.0);
        flow.grid_export_wh = (remaining_dc * eff).min(export_cap);
        flow.losses_wh += remaining_dc - flow.grid_export_wh;
        flow
    }

    fn route_deficit(&mut self, generation: f64, consumption: f64, hour: usize) -> InverterFlow {
        let eff = self.params.dc_to_ac_efficiency;
        let pv_ac = generation * eff;
        let mut flow = InverterFlow {
            losses_wh: generation - pv_ac,
            self_consumption_wh: pv_ac,
            ..InverterFlow::default()
        };

        let shortfall = consumption - pv_ac;
        let headroom = (self.params.max_power_wh - pv_ac).max(0.0);
        let battery_ac = self.discharge_for_ac(shortfall.min(headroom), hour, &mut flow);
        flow.self_consumption_wh += battery_ac;
        flow.grid_import_wh = shortfall - battery_ac;
        flow
    }

    /// Discharges enough DC to deliver `need_ac` on the AC side, accounting
    /// storage and conversion losses. Returns the AC energy delivered.
    fn discharge_for_ac(&mut self, need_ac: f64, hour: usize, flow: &mut InverterFlow) -> f64 {
        let eff = self.params.dc_to_ac_efficiency;
        let Some(battery) = self.battery.as_mut() else {
            return 0.0;
        };
        let (discharged_dc, loss) = battery.discharge_energy(need_ac / eff, hour);
        let delivered_ac = (discharged_dc * eff).min(need_ac);
        flow.losses_wh += loss + (discharged_dc - delivered_ac);
        delivered_ac
    }
}
