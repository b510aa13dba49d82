//! TOML-based scenario configuration and preset definitions.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::context::RunContext;
use crate::devices::{
    Battery, BatteryParameters, FullSelfConsumption, HomeAppliance, HomeApplianceParameters,
    Inverter, InverterParameters, LinearSelfConsumption, SelfConsumption, TimeWindow,
    VehicleParameters,
};
use crate::error::{ConfigError, Result};
use crate::forecast::{FeedInTariff, Forecast, NaiveForecast};
use crate::optimizer::OptimizationParameters;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the demo scenario. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or use [`ScenarioConfig::demo`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub battery: BatteryConfig,
    #[serde(default)]
    pub inverter: InverterConfig,
    #[serde(default)]
    pub ev: EvConfig,
    #[serde(default)]
    pub appliance: ApplianceConfig,
    #[serde(default)]
    pub optimization: OptimizationConfig,
}

/// Horizon layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Horizon length in hours, counted from midnight of the first day.
    pub hours: usize,
    /// First hour to optimise (the current hour of day).
    pub start_hour: usize,
    /// Repeat the forecast profiles over the horizon ("tomorrow is today").
    pub repeat_daily: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            hours: 48,
            start_hour: 0,
            repeat_daily: true,
        }
    }
}

/// Export remuneration: one value for all hours or one per hour.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FeedInConfig {
    Flat(f64),
    Hourly(Vec<f64>),
}

/// Forecast profiles, one value per hour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForecastConfig {
    /// PV generation (Wh, DC side).
    pub pv_wh: Vec<f64>,
    /// Household load (Wh).
    pub load_wh: Vec<f64>,
    /// Import price per Wh.
    pub price_per_wh: Vec<f64>,
    pub feed_in_tariff_per_wh: FeedInConfig,
    /// Value per Wh of energy left in the battery at the end of the horizon.
    pub price_per_wh_battery: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            pv_wh: vec![
                0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 40.0, 350.0, 900.0, 1600.0, 2300.0, 2800.0, 3000.0,
                2900.0, 2500.0, 1900.0, 1200.0, 500.0, 120.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            ],
            load_wh: vec![
                310.0, 280.0, 260.0, 250.0, 260.0, 300.0, 420.0, 650.0, 700.0, 560.0, 480.0,
                520.0, 610.0, 540.0, 470.0, 500.0, 620.0, 880.0, 1100.0, 1050.0, 900.0, 720.0,
                520.0, 380.0,
            ],
            price_per_wh: vec![
                0.00026, 0.00024, 0.00023, 0.00022, 0.00023, 0.00025, 0.00029, 0.00034, 0.00036,
                0.00032, 0.00028, 0.00025, 0.00023, 0.00022, 0.00024, 0.00027, 0.00031, 0.00038,
                0.00042, 0.00040, 0.00036, 0.00032, 0.00029, 0.00027,
            ],
            feed_in_tariff_per_wh: FeedInConfig::Flat(0.00007),
            price_per_wh_battery: 0.0001,
        }
    }
}

/// Storage battery behind the inverter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    pub enabled: bool,
    pub device_id: String,
    pub capacity_wh: f64,
    pub charging_efficiency: f64,
    pub discharging_efficiency: f64,
    pub max_charge_power_w: Option<f64>,
    pub initial_soc_percentage: f64,
    pub min_soc_percentage: f64,
    pub max_soc_percentage: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device_id: "battery1".to_string(),
            capacity_wh: 10_000.0,
            charging_efficiency: 0.88,
            discharging_efficiency: 0.88,
            max_charge_power_w: Some(5000.0),
            initial_soc_percentage: 50.0,
            min_soc_percentage: 10.0,
            max_soc_percentage: 100.0,
        }
    }
}

impl BatteryConfig {
    fn parameters(&self) -> BatteryParameters {
        BatteryParameters {
            device_id: self.device_id.clone(),
            capacity_wh: self.capacity_wh,
            charging_efficiency: self.charging_efficiency,
            discharging_efficiency: self.discharging_efficiency,
            max_charge_power_w: self.max_charge_power_w,
            initial_soc_percentage: self.initial_soc_percentage,
            min_soc_percentage: self.min_soc_percentage,
            max_soc_percentage: self.max_soc_percentage,
        }
    }
}

/// Self-consumption model of the inverter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfConsumptionModel {
    /// The whole surplus counts as matched.
    #[default]
    Full,
    /// Ratio grows linearly with the load-to-PV ratio.
    Linear,
}

/// Hybrid inverter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InverterConfig {
    pub enabled: bool,
    pub device_id: String,
    pub max_power_wh: f64,
    pub dc_to_ac_efficiency: f64,
    pub ac_to_dc_efficiency: f64,
    pub max_ac_charge_power_w: Option<f64>,
    pub self_consumption: SelfConsumptionModel,
    /// Intercept of the linear self-consumption model.
    pub scr_intercept: f64,
    /// Slope of the linear self-consumption model.
    pub scr_slope: f64,
}

impl Default for InverterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device_id: "inverter1".to_string(),
            max_power_wh: 10_000.0,
            dc_to_ac_efficiency: 0.97,
            ac_to_dc_efficiency: 0.97,
            max_ac_charge_power_w: None,
            self_consumption: SelfConsumptionModel::Full,
            scr_intercept: 0.6,
            scr_slope: 0.4,
        }
    }
}

/// Electric vehicle battery.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvConfig {
    pub enabled: bool,
    pub device_id: String,
    pub capacity_wh: f64,
    pub charging_efficiency: f64,
    pub max_charge_power_w: Option<f64>,
    pub initial_soc_percentage: f64,
    /// SOC to reach by the end of the horizon.
    pub min_soc_percentage: f64,
    pub max_soc_percentage: f64,
    /// Discrete charge rates as fractions of the max charge power.
    pub charge_rates: Option<Vec<f64>>,
}

impl Default for EvConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device_id: "ev1".to_string(),
            capacity_wh: 60_000.0,
            charging_efficiency: 0.9,
            max_charge_power_w: Some(11_000.0),
            initial_soc_percentage: 40.0,
            min_soc_percentage: 80.0,
            max_soc_percentage: 100.0,
            charge_rates: Some(vec![0.0, 0.375, 0.5, 0.625, 0.75, 0.875, 1.0]),
        }
    }
}

impl EvConfig {
    fn parameters(&self) -> VehicleParameters {
        VehicleParameters {
            battery: BatteryParameters {
                device_id: self.device_id.clone(),
                capacity_wh: self.capacity_wh,
                charging_efficiency: self.charging_efficiency,
                discharging_efficiency: 1.0,
                max_charge_power_w: self.max_charge_power_w,
                initial_soc_percentage: self.initial_soc_percentage,
                min_soc_percentage: self.min_soc_percentage,
                max_soc_percentage: self.max_soc_percentage,
            },
            charge_rates: self.charge_rates.clone(),
        }
    }
}

/// One allowed start window of the appliance.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeWindowConfig {
    pub start_hour: usize,
    pub duration_h: usize,
}

/// Schedulable household appliance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApplianceConfig {
    pub enabled: bool,
    pub device_id: String,
    pub consumption_wh: f64,
    pub duration_h: usize,
    /// Allowed start windows; empty means any hour.
    pub time_windows: Vec<TimeWindowConfig>,
}

impl Default for ApplianceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device_id: "dishwasher".to_string(),
            consumption_wh: 2000.0,
            duration_h: 2,
            time_windows: vec![TimeWindowConfig {
                start_hour: 9,
                duration_h: 8,
            }],
        }
    }
}

impl ApplianceConfig {
    fn parameters(&self) -> HomeApplianceParameters {
        HomeApplianceParameters {
            device_id: self.device_id.clone(),
            consumption_wh: self.consumption_wh,
            duration_h: self.duration_h,
            time_windows: self
                .time_windows
                .iter()
                .map(|w| TimeWindow::new(w.start_hour, w.duration_h))
                .collect(),
        }
    }
}

/// Genetic optimizer settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizationConfig {
    pub individuals: usize,
    pub generations: usize,
    pub seed: Option<u64>,
    pub crossover_probability: f64,
    pub mutation_probability: f64,
    pub gene_mutation_rate: f64,
    pub tournament_size: usize,
    pub workers: Option<usize>,
    /// Wall-clock budget in seconds.
    pub deadline_secs: Option<f64>,
    /// Penalty weights by name.
    pub penalties: BTreeMap<String, f64>,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        let defaults = OptimizationParameters::default();
        Self {
            individuals: defaults.individuals,
            generations: defaults.generations,
            seed: Some(42),
            crossover_probability: defaults.crossover_probability,
            mutation_probability: defaults.mutation_probability,
            gene_mutation_rate: defaults.gene_mutation_rate,
            tournament_size: defaults.tournament_size,
            workers: None,
            deadline_secs: None,
            penalties: BTreeMap::new(),
        }
    }
}

impl OptimizationConfig {
    fn parameters(&self) -> OptimizationParameters {
        OptimizationParameters {
            individuals: self.individuals,
            generations: self.generations,
            seed: self.seed,
            penalties: self.penalties.clone(),
            start_solution: None,
            crossover_probability: self.crossover_probability,
            mutation_probability: self.mutation_probability,
            gene_mutation_rate: self.gene_mutation_rate,
            tournament_size: self.tournament_size,
            workers: self.workers,
            deadline: self
                .deadline_secs
                .filter(|s| s.is_finite() && *s > 0.0)
                .map(Duration::from_secs_f64),
        }
    }
}

/// A validated scenario ready to optimise.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub context: RunContext,
    pub params: OptimizationParameters,
}

impl ScenarioConfig {
    /// Returns the demo scenario: battery, EV, and dishwasher over two days.
    pub fn demo() -> Self {
        Self::default()
    }

    /// Returns the demo scenario without a storage battery.
    pub fn no_battery() -> Self {
        Self {
            battery: BatteryConfig {
                enabled: false,
                ..BatteryConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["demo", "no_battery"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "demo" => Ok(Self::demo()),
            "no_battery" => Ok(Self::no_battery()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new(
                "scenario",
                format!("cannot read \"{}\": {e}", path.display()),
            )
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.hours == 0 {
            errors.push(ConfigError::new("simulation.hours", "must be > 0"));
        }
        if s.start_hour >= s.hours {
            errors.push(ConfigError::new(
                "simulation.start_hour",
                "must be < simulation.hours",
            ));
        }

        let f = &self.forecast;
        let mut profiles = vec![
            ("forecast.pv_wh", f.pv_wh.len()),
            ("forecast.load_wh", f.load_wh.len()),
            ("forecast.price_per_wh", f.price_per_wh.len()),
        ];
        if let FeedInConfig::Hourly(values) = &f.feed_in_tariff_per_wh {
            profiles.push(("forecast.feed_in_tariff_per_wh", values.len()));
        }
        for (field, len) in profiles {
            if len == 0 {
                errors.push(ConfigError::new(field, "must not be empty"));
            } else if !s.repeat_daily && len != s.hours {
                errors.push(ConfigError::new(
                    field,
                    format!(
                        "has {len} entries, expected {} (or set simulation.repeat_daily)",
                        s.hours
                    ),
                ));
            }
        }

        if self.battery.enabled {
            if let Err(e) = self.battery.parameters().validate() {
                errors.push(e);
            }
            if !self.inverter.enabled {
                errors.push(ConfigError::new(
                    "battery.enabled",
                    "a battery needs an enabled inverter",
                ));
            }
        }
        if self.inverter.enabled {
            if let Err(e) = self.inverter_parameters().validate() {
                errors.push(e);
            }
        }
        if self.ev.enabled {
            let params = self.ev.parameters();
            if let Err(e) = params.battery.validate() {
                errors.push(e);
            }
            if let Some(rates) = &params.charge_rates {
                if rates.is_empty() || rates.iter().any(|r| !(0.0..=1.0).contains(r)) {
                    errors.push(ConfigError::new(
                        "ev.charge_rates",
                        "must be a non-empty list of values in [0, 1]",
                    ));
                }
            }
        }
        if self.appliance.enabled {
            if let Err(e) = self.appliance.parameters().validate() {
                errors.push(e);
            }
        }
        if let Err(e) = self.optimization.parameters().validate() {
            errors.push(e);
        }

        errors
    }

    /// Builds the run context and optimizer parameters.
    ///
    /// # Errors
    ///
    /// Returns the first validation error, or any error raised while
    /// constructing forecasts and devices.
    pub fn build(&self) -> Result<Scenario> {
        if let Some(first) = self.validate().into_iter().next() {
            return Err(first.into());
        }

        let hours = self.simulation.hours;
        let f = &self.forecast;
        let profile = |values: &[f64]| {
            if self.simulation.repeat_daily {
                NaiveForecast.forecast(values, hours)
            } else {
                values.to_vec()
            }
        };
        let feed_in = match &f.feed_in_tariff_per_wh {
            FeedInConfig::Flat(value) => FeedInTariff::Flat(*value),
            FeedInConfig::Hourly(values) => FeedInTariff::Hourly(profile(values)),
        };
        let forecast = Forecast::new(
            profile(&f.pv_wh),
            profile(&f.load_wh),
            profile(&f.price_per_wh),
            feed_in,
            f.price_per_wh_battery,
        )?;

        let mut context = RunContext::new(forecast, self.simulation.start_hour)?;
        if self.inverter.enabled {
            let battery = if self.battery.enabled {
                Some(Battery::storage(self.battery.parameters(), hours)?)
            } else {
                None
            };
            let self_consumption: Arc<dyn SelfConsumption> =
                match self.inverter.self_consumption {
                    SelfConsumptionModel::Linear => Arc::new(LinearSelfConsumption {
                        intercept: self.inverter.scr_intercept,
                        slope: self.inverter.scr_slope,
                    }),
                    SelfConsumptionModel::Full => Arc::new(FullSelfConsumption),
                };
            let inverter = Inverter::new(self.inverter_parameters(), battery, self_consumption)?;
            context = context.with_inverter(inverter)?;
        }
        if self.ev.enabled {
            context = context.with_ev(Battery::vehicle(self.ev.parameters(), hours)?)?;
        }
        if self.appliance.enabled {
            context = context.with_appliance(HomeAppliance::new(
                self.appliance.parameters(),
                hours,
            )?)?;
        }

        Ok(Scenario {
            context,
            params: self.optimization.parameters(),
        })
    }

    fn inverter_parameters(&self) -> InverterParameters {
        let inv = &self.inverter;
        InverterParameters {
            device_id: inv.device_id.clone(),
            max_power_wh: inv.max_power_wh,
            dc_to_ac_efficiency: inv.dc_to_ac_efficiency,
            ac_to_dc_efficiency: inv.ac_to_dc_efficiency,
            max_ac_charge_power_w: inv.max_ac_charge_power_w,
            battery_id: self
                .battery
                .enabled
                .then(|| self.battery.device_id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_preset_valid() {
        let cfg = ScenarioConfig::demo();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "demo should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent").expect_err("unknown");
        assert!(err.message.contains("unknown preset"));
    }

    #[test]
    fn all_presets_build() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name).expect("preset loads");
            let errors = cfg.validate();
            assert!(errors.is_empty(), "preset \"{name}\" invalid: {errors:?}");
            let scenario = cfg.build().expect("preset builds");
            assert_eq!(scenario.context.hours(), 48);
        }
    }

    #[test]
    fn no_battery_has_inverter_without_battery() {
        let scenario = ScenarioConfig::no_battery().build().expect("builds");
        assert!(scenario.context.inverter().is_some());
        assert!(scenario.context.battery().is_none());
        assert!(scenario.context.ev().is_some());
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[simulation]
hours = 24
start_hour = 6
repeat_daily = true

[forecast]
pv_wh = [0.0, 100.0]
load_wh = [300.0]
price_per_wh = [0.0003, 0.0002]
feed_in_tariff_per_wh = [0.00007, 0.00005]

[battery]
capacity_wh = 5000.0
max_charge_power_w = 2500.0

[inverter]
self_consumption = "linear"
scr_intercept = 0.5

[ev]
enabled = false

[appliance]
time_windows = [{ start_hour = 10, duration_h = 4 }]

[optimization]
individuals = 20
generations = 15
penalties = { ev_soc_miss = 5.0 }
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).expect("valid TOML");
        assert_eq!(cfg.simulation.start_hour, 6);
        assert!(matches!(
            cfg.forecast.feed_in_tariff_per_wh,
            FeedInConfig::Hourly(ref v) if v.len() == 2
        ));
        assert_eq!(cfg.optimization.penalties.get("ev_soc_miss"), Some(&5.0));

        let scenario = cfg.build().expect("builds");
        assert_eq!(scenario.context.hours(), 24);
        assert_eq!(scenario.context.forecast().load_wh(), &[300.0; 24][..]);
        assert!(scenario.context.ev().is_none());
        assert_eq!(scenario.params.individuals, 20);
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[battery]
capacity_wh = 1000.0
bogus_field = true
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let cfg = ScenarioConfig::from_toml_str("[optimization]\nseed = 99\n").expect("parses");
        assert_eq!(cfg.optimization.seed, Some(99));
        assert_eq!(cfg.simulation.hours, 48);
        assert_eq!(cfg.battery.capacity_wh, 10_000.0);
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut cfg = ScenarioConfig::demo();
        cfg.battery.charging_efficiency = 1.5;
        cfg.simulation.start_hour = 48;
        cfg.optimization.individuals = 2;
        let errors = cfg.validate();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"battery1.charging_efficiency"));
        assert!(fields.contains(&"simulation.start_hour"));
        assert!(fields.contains(&"optimization.individuals"));
        assert!(cfg.build().is_err());
    }

    #[test]
    fn unknown_self_consumption_model_fails_to_parse() {
        let err = ScenarioConfig::from_toml_str("[inverter]\nself_consumption = \"bogus\"\n");
        assert!(err.is_err());
        let cfg = ScenarioConfig::from_toml_str("[inverter]\nself_consumption = \"linear\"\n")
            .expect("parses");
        assert_eq!(cfg.inverter.self_consumption, SelfConsumptionModel::Linear);
    }

    #[test]
    fn battery_requires_inverter() {
        let mut cfg = ScenarioConfig::demo();
        cfg.inverter.enabled = false;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "battery.enabled"));
    }

    #[test]
    fn exact_profiles_must_match_horizon() {
        let mut cfg = ScenarioConfig::demo();
        cfg.simulation.repeat_daily = false;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "forecast.pv_wh"));
    }
}
