//! Read-only inputs of one optimisation run.

use crate::devices::{Battery, HomeAppliance, Inverter};
use crate::error::{Error, Result};
use crate::forecast::Forecast;

/// Forecasts, device templates, and the first hour to simulate.
///
/// Devices are stored in their initial state. Every simulation clones the
/// ones it needs, so a context can be shared across threads.
#[derive(Debug, Clone)]
pub struct RunContext {
    forecast: Forecast,
    start_hour: usize,
    inverter: Option<Inverter>,
    ev: Option<Battery>,
    appliance: Option<HomeAppliance>,
}

impl RunContext {
    /// Creates a context without devices.
    ///
    /// # Errors
    ///
    /// Returns `Error::StartHour` if `start_hour` is not inside the horizon.
    pub fn new(forecast: Forecast, start_hour: usize) -> Result<Self> {
        let horizon = forecast.hours();
        if start_hour >= horizon {
            return Err(Error::StartHour {
                start_hour,
                horizon,
            });
        }
        Ok(Self {
            forecast,
            start_hour,
            inverter: None,
            ev: None,
            appliance: None,
        })
    }

    /// Attaches an inverter (and the battery behind it).
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceHorizon` if the battery was built for a different
    /// horizon.
    pub fn with_inverter(mut self, inverter: Inverter) -> Result<Self> {
        if let Some(battery) = inverter.battery() {
            battery.ensure_hours(self.hours())?;
        }
        self.inverter = Some(inverter);
        Ok(self)
    }

    /// Attaches an electric vehicle battery.
    ///
    /// # Errors
    ///
    /// * `Error::NotAVehicle` - the battery is a storage battery
    /// * `Error::DeviceHorizon` - the battery was built for a different horizon
    pub fn with_ev(mut self, ev: Battery) -> Result<Self> {
        if !ev.is_vehicle() {
            return Err(Error::NotAVehicle {
                device: ev.device_id().to_string(),
            });
        }
        ev.ensure_hours(self.hours())?;
        self.ev = Some(ev);
        Ok(self)
    }

    /// Attaches a schedulable appliance.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceHorizon` if the appliance was built for a
    /// different horizon.
    pub fn with_appliance(mut self, appliance: HomeAppliance) -> Result<Self> {
        appliance.ensure_hours(self.hours())?;
        self.appliance = Some(appliance);
        Ok(self)
    }

    pub fn forecast(&self) -> &Forecast {
        &self.forecast
    }

    /// Forecast horizon length; absolute hours run from 0 to `hours() - 1`.
    pub fn hours(&self) -> usize {
        self.forecast.hours()
    }

    pub fn start_hour(&self) -> usize {
        self.start_hour
    }

    /// Number of simulated hours, `hours() - start_hour()`.
    pub fn total_hours(&self) -> usize {
        self.hours() - self.start_hour
    }

    pub fn inverter(&self) -> Option<&Inverter> {
        self.inverter.as_ref()
    }

    /// Storage battery behind the inverter, if any.
    pub fn battery(&self) -> Option<&Battery> {
        self.inverter.as_ref().and_then(Inverter::battery)
    }

    pub fn ev(&self) -> Option<&Battery> {
        self.ev.as_ref()
    }

    pub fn appliance(&self) -> Option<&HomeAppliance> {
        self.appliance.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{BatteryParameters, HomeApplianceParameters, VehicleParameters};
    use crate::forecast::FeedInTariff;

    fn forecast(hours: usize) -> Forecast {
        Forecast::new(
            vec![0.0; hours],
            vec![500.0; hours],
            vec![0.0003; hours],
            FeedInTariff::Flat(0.00007),
            0.0,
        )
        .expect("valid forecast")
    }

    #[test]
    fn start_hour_must_be_inside_horizon() {
        assert!(RunContext::new(forecast(24), 23).is_ok());
        assert!(matches!(
            RunContext::new(forecast(24), 24),
            Err(Error::StartHour { .. })
        ));
    }

    #[test]
    fn ev_must_be_a_vehicle() {
        let ctx = RunContext::new(forecast(24), 0).expect("valid context");
        let storage = Battery::storage(BatteryParameters::new("battery1", 1000.0), 24)
            .expect("valid battery");
        assert!(matches!(
            ctx.with_ev(storage),
            Err(Error::NotAVehicle { .. })
        ));
    }

    #[test]
    fn device_horizon_must_match() {
        let ctx = RunContext::new(forecast(24), 0).expect("valid context");
        let ev = Battery::vehicle(
            VehicleParameters::new(BatteryParameters::new("ev1", 1000.0)),
            48,
        )
        .expect("valid ev");
        assert!(matches!(
            ctx.clone().with_ev(ev),
            Err(Error::DeviceHorizon { .. })
        ));

        let appliance = HomeAppliance::new(HomeApplianceParameters::new("dw", 1000.0, 1), 12)
            .expect("valid appliance");
        assert!(matches!(
            ctx.with_appliance(appliance),
            Err(Error::DeviceHorizon { .. })
        ));
    }

    #[test]
    fn total_hours_counts_from_start_hour() {
        let ctx = RunContext::new(forecast(48), 14).expect("valid context");
        assert_eq!(ctx.total_hours(), 34);
        assert!(ctx.battery().is_none());
    }
}
