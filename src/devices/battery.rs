use crate::error::{ConfigError, Error, Result, ensure_in_range};

/// Static parameters of a battery, shared by storage and vehicle batteries.
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryParameters {
    /// Identifier used by the inverter to reference this battery.
    pub device_id: String,
    /// Usable capacity in watt-hours (must be > 0).
    pub capacity_wh: f64,
    /// Charging efficiency (0 < e <= 1).
    pub charging_efficiency: f64,
    /// Discharging efficiency (0 < e <= 1).
    pub discharging_efficiency: f64,
    /// Maximum charge (and discharge) power per hour; defaults to `capacity_wh`.
    pub max_charge_power_w: Option<f64>,
    /// State of charge at the start of every simulation (0-100).
    pub initial_soc_percentage: f64,
    /// Lower SOC bound (0-100).
    pub min_soc_percentage: f64,
    /// Upper SOC bound (0-100).
    pub max_soc_percentage: f64,
}

impl BatteryParameters {
    /// Creates parameters with 88 % efficiencies, empty initial state, and
    /// the full 0-100 % SOC range.
    pub fn new(device_id: impl Into<String>, capacity_wh: f64) -> Self {
        Self {
            device_id: device_id.into(),
            capacity_wh,
            charging_efficiency: 0.88,
            discharging_efficiency: 0.88,
            max_charge_power_w: None,
            initial_soc_percentage: 0.0,
            min_soc_percentage: 0.0,
            max_soc_percentage: 100.0,
        }
    }

    /// Validates ranges of all fields.
    ///
    /// The initial SOC is allowed outside `[min, max]`; it is clamped on reset.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let id = &self.device_id;
        if !(self.capacity_wh.is_finite() && self.capacity_wh > 0.0) {
            return Err(ConfigError::new(
                format!("{id}.capacity_wh"),
                format!("must be > 0, got {}", self.capacity_wh),
            ));
        }
        for (name, eff) in [
            ("charging_efficiency", self.charging_efficiency),
            ("discharging_efficiency", self.discharging_efficiency),
        ] {
            if !(eff.is_finite() && eff > 0.0 && eff <= 1.0) {
                return Err(ConfigError::new(
                    format!("{id}.{name}"),
                    format!("must be in (0, 1], got {eff}"),
                ));
            }
        }
        if let Some(power) = self.max_charge_power_w {
            if !(power.is_finite() && power > 0.0) {
                return Err(ConfigError::new(
                    format!("{id}.max_charge_power_w"),
                    format!("must be > 0, got {power}"),
                ));
            }
        }
        ensure_in_range(
            &format!("{id}.initial_soc_percentage"),
            self.initial_soc_percentage,
            0.0..=100.0,
        )?;
        ensure_in_range(
            &format!("{id}.min_soc_percentage"),
            self.min_soc_percentage,
            0.0..=100.0,
        )?;
        ensure_in_range(
            &format!("{id}.max_soc_percentage"),
            self.max_soc_percentage,
            0.0..=100.0,
        )?;
        if self.min_soc_percentage > self.max_soc_percentage {
            return Err(ConfigError::new(
                format!("{id}.min_soc_percentage"),
                "must be <= max_soc_percentage",
            ));
        }
        Ok(())
    }
}

/// Parameters of an electric vehicle battery.
///
/// `battery.min_soc_percentage` is the SOC the vehicle must reach by the end
/// of the horizon; the physical floor of a vehicle battery is 0 %.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleParameters {
    pub battery: BatteryParameters,
    /// Discrete charge rates as fractions of the maximum charge power.
    pub charge_rates: Option<Vec<f64>>,
}

impl VehicleParameters {
    pub fn new(battery: BatteryParameters) -> Self {
        Self {
            battery,
            charge_rates: None,
        }
    }

    pub fn with_charge_rates(mut self, rates: Vec<f64>) -> Self {
        self.charge_rates = Some(rates);
        self
    }
}

/// Storage batteries and vehicle batteries differ only in a few fields.
#[derive(Debug, Clone, PartialEq)]
pub enum BatteryKind {
    Storage(BatteryParameters),
    Vehicle(VehicleParameters),
}

impl BatteryKind {
    pub fn parameters(&self) -> &BatteryParameters {
        match self {
            Self::Storage(params) => params,
            Self::Vehicle(vehicle) => &vehicle.battery,
        }
    }
}

/// Hour-stepped battery model with SOC bounds and efficiency losses.
///
/// Every operation saturates instead of failing: requests beyond the
/// available power or capacity are silently reduced, and the state of charge
/// always stays within `[min_soc_wh, max_soc_wh]`.
#[derive(Debug, Clone)]
pub struct Battery {
    kind: BatteryKind,
    hours: usize,
    capacity_wh: f64,
    charging_efficiency: f64,
    discharging_efficiency: f64,
    max_charge_power_w: f64,
    initial_soc_wh: f64,
    min_soc_wh: f64,
    max_soc_wh: f64,
    soc_wh: f64,
    charge_allowed: Vec<bool>,
    discharge_allowed: Vec<bool>,
}

impl Battery {
    /// Creates a battery for a horizon of `hours` and resets it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if any parameter is out of range or a vehicle
    /// charge rate is outside `[0, 1]`.
    pub fn new(kind: BatteryKind, hours: usize) -> Result<Self> {
        let params = kind.parameters();
        params.validate()?;

        let (discharging_efficiency, min_soc_wh) = match &kind {
            BatteryKind::Storage(p) => (
                p.discharging_efficiency,
                p.min_soc_percentage / 100.0 * p.capacity_wh,
            ),
            BatteryKind::Vehicle(v) => {
                if let Some(rates) = &v.charge_rates {
                    if rates.is_empty() {
                        return Err(ConfigError::new(
                            format!("{}.charge_rates", v.battery.device_id),
                            "must not be empty",
                        )
                        .into());
                    }
                    for rate in rates {
                        ensure_in_range(
                            &format!("{}.charge_rates", v.battery.device_id),
                            *rate,
                            0.0..=1.0,
                        )?;
                    }
                }
                (1.0, 0.0)
            }
        };

        let mut battery = Self {
            hours,
            capacity_wh: params.capacity_wh,
            charging_efficiency: params.charging_efficiency,
            discharging_efficiency,
            max_charge_power_w: params.max_charge_power_w.unwrap_or(params.capacity_wh),
            initial_soc_wh: params.initial_soc_percentage / 100.0 * params.capacity_wh,
            min_soc_wh,
            max_soc_wh: params.max_soc_percentage / 100.0 * params.capacity_wh,
            soc_wh: 0.0,
            charge_allowed: vec![true; hours],
            discharge_allowed: vec![true; hours],
            kind,
        };
        battery.reset();
        Ok(battery)
    }

    /// Shorthand for a stationary storage battery.
    pub fn storage(params: BatteryParameters, hours: usize) -> Result<Self> {
        Self::new(BatteryKind::Storage(params), hours)
    }

    /// Shorthand for an electric vehicle battery.
    pub fn vehicle(params: VehicleParameters, hours: usize) -> Result<Self> {
        Self::new(BatteryKind::Vehicle(params), hours)
    }

    /// Restores the initial SOC (clamped into bounds) and re-allows charging
    /// in every hour. Discharging is re-allowed for storage batteries only.
    pub fn reset(&mut self) {
        self.soc_wh = self.initial_soc_wh.clamp(self.min_soc_wh, self.max_soc_wh);
        let discharge = !self.is_vehicle();
        self.charge_allowed.iter_mut().for_each(|a| *a = true);
        self.discharge_allowed.iter_mut().for_each(|a| *a = discharge);
    }

    pub fn device_id(&self) -> &str {
        &self.kind.parameters().device_id
    }

    pub fn is_vehicle(&self) -> bool {
        matches!(self.kind, BatteryKind::Vehicle(_))
    }

    /// Discrete charge-rate alphabet, if this is a vehicle with one configured.
    pub fn charge_rates(&self) -> Option<&[f64]> {
        match &self.kind {
            BatteryKind::Vehicle(v) => v.charge_rates.as_deref(),
            BatteryKind::Storage(_) => None,
        }
    }

    /// Configured minimum SOC percentage (the charging target for vehicles).
    pub fn min_soc_percentage(&self) -> f64 {
        self.kind.parameters().min_soc_percentage
    }

    pub fn hours(&self) -> usize {
        self.hours
    }

    pub fn capacity_wh(&self) -> f64 {
        self.capacity_wh
    }

    pub fn charging_efficiency(&self) -> f64 {
        self.charging_efficiency
    }

    pub fn discharging_efficiency(&self) -> f64 {
        self.discharging_efficiency
    }

    pub fn max_charge_power_w(&self) -> f64 {
        self.max_charge_power_w
    }

    pub fn soc_wh(&self) -> f64 {
        self.soc_wh
    }

    pub fn min_soc_wh(&self) -> f64 {
        self.min_soc_wh
    }

    pub fn max_soc_wh(&self) -> f64 {
        self.max_soc_wh
    }

    /// Allows or forbids charging in `hour`. Hours past the horizon are ignored.
    pub fn set_charge_allowed_for_hour(&mut self, hour: usize, allowed: bool) {
        if let Some(slot) = self.charge_allowed.get_mut(hour) {
            *slot = allowed;
        }
    }

    /// Allows or forbids discharging in `hour`. Vehicles never discharge.
    pub fn set_discharge_allowed_for_hour(&mut self, hour: usize, allowed: bool) {
        let allowed = allowed && !self.is_vehicle();
        if let Some(slot) = self.discharge_allowed.get_mut(hour) {
            *slot = allowed;
        }
    }

    fn charge_allowed(&self, hour: usize) -> bool {
        self.charge_allowed.get(hour).copied().unwrap_or(true)
    }

    fn discharge_allowed(&self, hour: usize) -> bool {
        self.discharge_allowed
            .get(hour)
            .copied()
            .unwrap_or(!self.is_vehicle())
    }

    /// Charges the battery and returns `(charged_wh, loss_wh)`.
    ///
    /// The request is `relative_power * max_charge_power_w` when
    /// `relative_power > 0`, else `requested_wh`, else the maximum charge
    /// power. `charged_wh` is the energy stored; `charged_wh + loss_wh` is the
    /// energy drawn from the source.
    pub fn charge_energy(
        &mut self,
        requested_wh: Option<f64>,
        hour: usize,
        relative_power: f64,
    ) -> (f64, f64) {
        if !self.charge_allowed(hour) {
            return (0.0, 0.0);
        }

        let requested = if relative_power > 0.0 {
            relative_power * self.max_charge_power_w
        } else {
            requested_wh.unwrap_or(self.max_charge_power_w)
        };
        let requested = requested.clamp(0.0, self.max_charge_power_w);

        let headroom = ((self.max_soc_wh - self.soc_wh) / self.charging_efficiency).max(0.0);
        let effective = requested.min(headroom);
        let charged = effective * self.charging_efficiency;

        self.soc_wh = (self.soc_wh + charged).min(self.max_soc_wh);
        (charged, effective - charged)
    }

    /// Discharges the battery and returns `(discharged_wh, loss_wh)`.
    ///
    /// `discharged_wh` is the energy delivered; the stored energy drops by
    /// `discharged_wh + loss_wh`.
    pub fn discharge_energy(&mut self, requested_wh: f64, hour: usize) -> (f64, f64) {
        if !self.discharge_allowed(hour) {
            return (0.0, 0.0);
        }

        let available =
            ((self.soc_wh - self.min_soc_wh) * self.discharging_efficiency).max(0.0);
        let deliverable = available.min(self.max_charge_power_w);
        let discharged = requested_wh.max(0.0).min(deliverable);
        let withdrawn = discharged / self.discharging_efficiency;

        self.soc_wh = (self.soc_wh - withdrawn).max(self.min_soc_wh);
        (discharged, withdrawn - discharged)
    }

    pub fn current_soc_percentage(&self) -> f64 {
        self.soc_wh / self.capacity_wh * 100.0
    }

    /// Energy that can still be delivered before hitting the minimum SOC.
    pub fn current_energy_content(&self) -> f64 {
        ((self.soc_wh - self.min_soc_wh) * self.discharging_efficiency).max(0.0)
    }

    /// Fails if `hours` differs from the horizon this battery was built for.
    pub(crate) fn ensure_hours(&self, hours: usize) -> Result<()> {
        if self.hours == hours {
            Ok(())
        } else {
            Err(Error::DeviceHorizon {
                device: self.device_id().to_string(),
                expected: hours,
                actual: self.hours,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn half_full(hours: usize) -> Battery {
        let mut params = BatteryParameters::new("battery1", 10_000.0);
        params.initial_soc_percentage = 50.0;
        params.min_soc_percentage = 20.0;
        params.max_soc_percentage = 80.0;
        Battery::storage(params, hours).expect("valid battery")
    }

    #[test]
    fn discharge_is_bounded_by_min_soc_and_efficiency() {
        let mut battery = half_full(24);
        let (discharged, loss) = battery.discharge_energy(5000.0, 0);
        assert_relative_eq!(discharged, 2640.0, epsilon = 1e-9);
        assert_relative_eq!(loss, 3000.0 - 2640.0, epsilon = 1e-9);
        assert_relative_eq!(battery.soc_wh(), battery.min_soc_wh(), epsilon = 1e-9);
    }

    #[test]
    fn charge_is_bounded_by_max_soc_and_efficiency() {
        let mut battery = half_full(24);
        let (charged, loss) = battery.charge_energy(Some(5000.0), 0, 0.0);
        assert_relative_eq!(charged, 3000.0, epsilon = 1e-9);
        assert_relative_eq!(loss, 3000.0 / 0.88 - 3000.0, epsilon = 1e-9);
        assert_relative_eq!(battery.current_soc_percentage(), 80.0, epsilon = 1e-9);
    }

    #[test]
    fn charging_at_max_soc_returns_nothing() {
        let mut battery = half_full(24);
        battery.charge_energy(None, 0, 0.0);
        assert_eq!(battery.charge_energy(Some(1000.0), 1, 0.0), (0.0, 0.0));
        assert_eq!(battery.charge_energy(None, 2, 1.0), (0.0, 0.0));
    }

    #[test]
    fn discharging_at_min_soc_returns_nothing() {
        let mut battery = half_full(24);
        battery.discharge_energy(10_000.0, 0);
        assert_eq!(battery.discharge_energy(1000.0, 1), (0.0, 0.0));
    }

    #[test]
    fn disallowed_hour_blocks_charge_and_discharge() {
        let mut battery = half_full(24);
        battery.set_charge_allowed_for_hour(3, false);
        battery.set_discharge_allowed_for_hour(4, false);
        assert_eq!(battery.charge_energy(Some(1000.0), 3, 0.0), (0.0, 0.0));
        assert_eq!(battery.discharge_energy(1000.0, 4), (0.0, 0.0));
        assert!(battery.charge_energy(Some(1000.0), 4, 0.0).0 > 0.0);
    }

    #[test]
    fn relative_power_scales_max_charge_power() {
        let mut params = BatteryParameters::new("battery1", 10_000.0);
        params.max_charge_power_w = Some(4000.0);
        params.charging_efficiency = 1.0;
        let mut battery = Battery::storage(params, 24).expect("valid battery");
        let (charged, loss) = battery.charge_energy(None, 0, 0.25);
        assert_relative_eq!(charged, 1000.0);
        assert_eq!(loss, 0.0);
        // No explicit request means full power.
        let (charged, _) = battery.charge_energy(None, 1, 0.0);
        assert_relative_eq!(charged, 4000.0);
    }

    #[test]
    fn discharge_respects_max_power() {
        let mut params = BatteryParameters::new("battery1", 10_000.0);
        params.max_charge_power_w = Some(1500.0);
        params.initial_soc_percentage = 100.0;
        let mut battery = Battery::storage(params, 24).expect("valid battery");
        let (discharged, _) = battery.discharge_energy(5000.0, 0);
        assert_relative_eq!(discharged, 1500.0);
    }

    #[test]
    fn negative_request_is_a_no_op() {
        let mut battery = half_full(24);
        let soc = battery.soc_wh();
        assert_eq!(battery.discharge_energy(-100.0, 0), (0.0, 0.0));
        assert_eq!(battery.charge_energy(Some(-100.0), 0, 0.0), (0.0, 0.0));
        assert_eq!(battery.soc_wh(), soc);
    }

    #[test]
    fn reset_clamps_initial_soc_into_bounds() {
        let mut params = BatteryParameters::new("battery1", 5000.0);
        params.initial_soc_percentage = 5.0;
        params.min_soc_percentage = 10.0;
        let mut battery = Battery::storage(params, 24).expect("valid battery");
        assert_relative_eq!(battery.current_soc_percentage(), 10.0);

        battery.charge_energy(None, 0, 1.0);
        battery.reset();
        assert_relative_eq!(battery.current_soc_percentage(), 10.0);
    }

    #[test]
    fn reset_restores_initial_soc() {
        let mut battery = half_full(24);
        battery.discharge_energy(700.0, 0);
        battery.set_charge_allowed_for_hour(5, false);
        battery.reset();
        assert_relative_eq!(battery.current_soc_percentage(), 50.0);
        assert!(battery.charge_energy(Some(100.0), 5, 0.0).0 > 0.0);
    }

    #[test]
    fn soc_stays_within_bounds_under_random_operations() {
        let mut battery = half_full(48);
        let mut rng = StdRng::seed_from_u64(7);
        for i in 0..2000 {
            let hour = i % 48;
            let wh = rng.random_range(0.0..12_000.0);
            if rng.random_bool(0.5) {
                battery.charge_energy(Some(wh), hour, 0.0);
            } else {
                battery.discharge_energy(wh, hour);
            }
            assert!(battery.soc_wh() >= battery.min_soc_wh());
            assert!(battery.soc_wh() <= battery.max_soc_wh());
        }
    }

    #[test]
    fn energy_content_is_efficiency_adjusted() {
        let battery = half_full(24);
        assert_relative_eq!(battery.current_energy_content(), 3000.0 * 0.88);
    }

    #[test]
    fn vehicle_never_discharges_and_has_unit_discharge_efficiency() {
        let mut params = BatteryParameters::new("ev1", 26_400.0);
        params.initial_soc_percentage = 50.0;
        params.min_soc_percentage = 80.0;
        let vehicle = VehicleParameters::new(params).with_charge_rates(vec![0.0, 0.5, 1.0]);
        let mut ev = Battery::vehicle(vehicle, 24).expect("valid vehicle");

        assert_eq!(ev.discharging_efficiency(), 1.0);
        assert_relative_eq!(ev.current_soc_percentage(), 50.0);
        assert_eq!(ev.discharge_energy(1000.0, 0), (0.0, 0.0));
        ev.set_discharge_allowed_for_hour(0, true);
        assert_eq!(ev.discharge_energy(1000.0, 0), (0.0, 0.0));
        assert_eq!(ev.charge_rates(), Some(&[0.0, 0.5, 1.0][..]));
        assert_eq!(ev.min_soc_percentage(), 80.0);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let mut params = BatteryParameters::new("battery1", 0.0);
        assert!(Battery::storage(params.clone(), 24).is_err());

        params.capacity_wh = 1000.0;
        params.charging_efficiency = 1.2;
        assert!(Battery::storage(params.clone(), 24).is_err());

        params.charging_efficiency = 0.9;
        params.min_soc_percentage = 90.0;
        params.max_soc_percentage = 80.0;
        assert!(Battery::storage(params, 24).is_err());
    }

    #[test]
    fn invalid_charge_rates_are_rejected() {
        let vehicle = VehicleParameters::new(BatteryParameters::new("ev1", 1000.0))
            .with_charge_rates(vec![0.0, 1.5]);
        assert!(Battery::vehicle(vehicle, 24).is_err());

        let vehicle =
            VehicleParameters::new(BatteryParameters::new("ev1", 1000.0)).with_charge_rates(vec![]);
        assert!(Battery::vehicle(vehicle, 24).is_err());
    }
}
