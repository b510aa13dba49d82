//! Hourly forecast inputs for one optimisation run.

use crate::error::{ConfigError, Error, Result};

/// Export remuneration per Wh, either constant or per hour.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedInTariff {
    Flat(f64),
    Hourly(Vec<f64>),
}

impl FeedInTariff {
    /// Tariff for `hour`; hourly tariffs are validated to cover the horizon.
    pub fn at(&self, hour: usize) -> f64 {
        match self {
            Self::Flat(value) => *value,
            Self::Hourly(values) => values.get(hour).copied().unwrap_or(0.0),
        }
    }
}

/// Validated, equal-length forecast arrays. Their length is the horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pv_forecast_wh: Vec<f64>,
    load_wh: Vec<f64>,
    price_per_wh: Vec<f64>,
    feed_in_tariff: FeedInTariff,
    price_per_wh_battery: f64,
}

impl Forecast {
    /// Builds a forecast, checking that every array matches the PV length.
    ///
    /// # Arguments
    ///
    /// * `pv_forecast_wh` - PV generation per hour (DC side)
    /// * `load_wh` - Household load per hour
    /// * `price_per_wh` - Import price per hour
    /// * `feed_in_tariff` - Export remuneration
    /// * `price_per_wh_battery` - Value of energy left in the battery at the end
    ///
    /// # Errors
    ///
    /// * `Error::EmptyHorizon` - the PV array is empty
    /// * `Error::ForecastLength` - an array differs in length from the PV array
    /// * `Error::Config` - a value is not finite, or PV/load is negative
    pub fn new(
        pv_forecast_wh: Vec<f64>,
        load_wh: Vec<f64>,
        price_per_wh: Vec<f64>,
        feed_in_tariff: FeedInTariff,
        price_per_wh_battery: f64,
    ) -> Result<Self> {
        let hours = pv_forecast_wh.len();
        if hours == 0 {
            return Err(Error::EmptyHorizon);
        }
        let lengths = [
            ("load_wh", load_wh.len()),
            ("price_per_wh", price_per_wh.len()),
        ];
        for (field, actual) in lengths {
            if actual != hours {
                return Err(Error::ForecastLength {
                    field,
                    expected: hours,
                    actual,
                });
            }
        }
        if let FeedInTariff::Hourly(values) = &feed_in_tariff {
            if values.len() != hours {
                return Err(Error::ForecastLength {
                    field: "feed_in_tariff_per_wh",
                    expected: hours,
                    actual: values.len(),
                });
            }
        }

        check_values("pv_forecast_wh", &pv_forecast_wh, true)?;
        check_values("load_wh", &load_wh, true)?;
        check_values("price_per_wh", &price_per_wh, false)?;
        match &feed_in_tariff {
            FeedInTariff::Flat(value) => check_values("feed_in_tariff_per_wh", &[*value], false)?,
            FeedInTariff::Hourly(values) => check_values("feed_in_tariff_per_wh", values, false)?,
        }
        check_values("price_per_wh_battery", &[price_per_wh_battery], false)?;

        Ok(Self {
            pv_forecast_wh,
            load_wh,
            price_per_wh,
            feed_in_tariff,
            price_per_wh_battery,
        })
    }

    pub fn hours(&self) -> usize {
        self.pv_forecast_wh.len()
    }

    pub fn pv_forecast_wh(&self) -> &[f64] {
        &self.pv_forecast_wh
    }

    pub fn load_wh(&self) -> &[f64] {
        &self.load_wh
    }

    pub fn price_per_wh(&self) -> &[f64] {
        &self.price_per_wh
    }

    pub fn feed_in_tariff(&self) -> &FeedInTariff {
        &self.feed_in_tariff
    }

    pub fn price_per_wh_battery(&self) -> f64 {
        self.price_per_wh_battery
    }
}

fn check_values(field: &str, values: &[f64], non_negative: bool) -> Result<(), ConfigError> {
    for (hour, value) in values.iter().enumerate() {
        if !value.is_finite() || (non_negative && *value < 0.0) {
            return Err(ConfigError::new(
                format!("{field}[{hour}]"),
                format!("invalid value {value}"),
            ));
        }
    }
    Ok(())
}

/// Naive "tomorrow is today" forecaster.
///
/// This forecast simply copies the provided baseline and repeats/truncates
/// it to match the requested horizon.
#[derive(Debug, Default, Clone, Copy)]
pub struct NaiveForecast;

impl NaiveForecast {
    /// Produce a naive forecast for the given horizon.
    ///
    /// # Arguments
    ///
    /// * `baseline` - Daily profile or history used as the template
    /// * `horizon` - Number of hours to forecast
    ///
    /// # Returns
    ///
    /// A vector of forecast values with length equal to `horizon`.
    pub fn forecast(&self, baseline: &[f64], horizon: usize) -> Vec<f64> {
        if baseline.is_empty() {
            return vec![0.0; horizon];
        }
        baseline.iter().copied().cycle().take(horizon).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_matches_horizon_length() {
        let baseline = vec![1.0, 2.0, 3.0];
        let forecast = NaiveForecast.forecast(&baseline, 7);
        assert_eq!(forecast, vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn forecast_truncates_long_baseline() {
        let baseline = vec![0.5, 1.0, 1.5, 2.0];
        assert_eq!(NaiveForecast.forecast(&baseline, 2), vec![0.5, 1.0]);
        assert_eq!(NaiveForecast.forecast(&[], 3), vec![0.0; 3]);
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let err = Forecast::new(
            vec![0.0; 24],
            vec![0.0; 23],
            vec![0.0; 24],
            FeedInTariff::Flat(0.0),
            0.0,
        )
        .expect_err("mismatch");
        assert!(matches!(
            err,
            Error::ForecastLength {
                field: "load_wh",
                expected: 24,
                actual: 23
            }
        ));

        let err = Forecast::new(
            vec![0.0; 24],
            vec![0.0; 24],
            vec![0.0; 24],
            FeedInTariff::Hourly(vec![0.0; 12]),
            0.0,
        )
        .expect_err("mismatch");
        assert!(matches!(err, Error::ForecastLength { .. }));
    }

    #[test]
    fn empty_and_invalid_values_are_rejected() {
        assert!(matches!(
            Forecast::new(vec![], vec![], vec![], FeedInTariff::Flat(0.0), 0.0),
            Err(Error::EmptyHorizon)
        ));
        assert!(
            Forecast::new(
                vec![-1.0],
                vec![0.0],
                vec![0.0],
                FeedInTariff::Flat(0.0),
                0.0
            )
            .is_err()
        );
        assert!(
            Forecast::new(
                vec![0.0],
                vec![0.0],
                vec![f64::NAN],
                FeedInTariff::Flat(0.0),
                0.0
            )
            .is_err()
        );
    }

    #[test]
    fn tariff_lookup() {
        assert_eq!(FeedInTariff::Flat(0.07).at(30), 0.07);
        let hourly = FeedInTariff::Hourly(vec![0.1, 0.2]);
        assert_eq!(hourly.at(1), 0.2);
    }
}
