//! Error types shared by the device models, simulation engine, and optimizer.

use thiserror::Error;

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"battery.capacity_wh"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("forecast `{field}` has {actual} entries, expected {expected}")]
    ForecastLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("forecast horizon is empty")]
    EmptyHorizon,

    #[error("start hour {start_hour} is outside the {horizon}-hour horizon")]
    StartHour { start_hour: usize, horizon: usize },

    #[error("inverter `{inverter}` expects battery `{expected}`, got `{actual}`")]
    BatteryMismatch {
        inverter: String,
        expected: String,
        actual: String,
    },

    #[error("inverter `{inverter}` expects battery `{expected}` but none is attached")]
    MissingBattery { inverter: String, expected: String },

    #[error("device `{device}` covers {actual} hours, horizon has {expected}")]
    DeviceHorizon {
        device: String,
        expected: usize,
        actual: usize,
    },

    #[error("`{device}` must be an electric vehicle battery")]
    NotAVehicle { device: String },

    #[error("schedule covers {actual} hours, horizon has {expected}")]
    ScheduleLength { expected: usize, actual: usize },

    #[error("genome does not fit the run layout: {0}")]
    GenomeLayout(String),

    #[error("population is empty after selection")]
    EmptyPopulation,

    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Checks that `value` lies in `range`, reporting `field` otherwise.
pub(crate) fn ensure_in_range(
    field: &str,
    value: f64,
    range: std::ops::RangeInclusive<f64>,
) -> Result<(), ConfigError> {
    if value.is_finite() && range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::new(
            field,
            format!(
                "must be in [{}, {}], got {value}",
                range.start(),
                range.end()
            ),
        ))
    }
}
