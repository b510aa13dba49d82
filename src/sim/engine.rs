//! Hour-stepped replay of a schedule against forecasts and device models.

use crate::context::RunContext;
use crate::devices::{Battery, InverterFlow};
use crate::error::{Error, Result};

use super::clock::Clock;
use super::kpi::sum_present;
use super::schedule::Schedule;
use super::types::SimulationResult;

/// Simulation engine borrowing the read-only run context.
///
/// Each call to [`SimulationEngine::simulate`] clones fresh device state from
/// the context, so one engine can be shared by concurrent evaluations.
#[derive(Debug, Clone, Copy)]
pub struct SimulationEngine<'a> {
    ctx: &'a RunContext,
}

impl<'a> SimulationEngine<'a> {
    pub fn new(ctx: &'a RunContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &'a RunContext {
        self.ctx
    }

    /// Replays `schedule` over `[start_hour, horizon)`.
    ///
    /// Per hour: household and appliance load, EV charging, inverter routing
    /// with the scheduled DC charge gate, then grid (AC) charging of the
    /// storage battery on top.
    ///
    /// # Errors
    ///
    /// Returns `Error::ScheduleLength` if the schedule does not cover the
    /// forecast horizon.
    pub fn simulate(&self, schedule: &Schedule) -> Result<SimulationResult> {
        let ctx = self.ctx;
        let hours = ctx.hours();
        if !schedule.covers(hours) {
            return Err(Error::ScheduleLength {
                expected: hours,
                actual: schedule.hours(),
            });
        }

        let forecast = ctx.forecast();
        let start_hour = ctx.start_hour();
        let total_hours = ctx.total_hours();

        let mut inverter = ctx.inverter().cloned();
        let mut ev = ctx.ev().cloned();
        let mut appliance = ctx.appliance().cloned();

        if let Some(battery) = inverter.as_mut().and_then(|inv| inv.battery_mut()) {
            battery.reset();
            for hour in start_hour..hours {
                battery.set_discharge_allowed_for_hour(hour, schedule.discharge_allowed[hour]);
            }
        }
        if let Some(ev) = ev.as_mut() {
            ev.reset();
        }
        let appliance_start_hour = appliance.as_mut().map(|appliance| {
            appliance.reset();
            let candidate = schedule.appliance_start.unwrap_or(start_hour);
            appliance.set_starting_time(candidate, start_hour)
        });

        let mut out = HourlyBuffers::with_capacity(total_hours);
        let mut clock = Clock::new(start_hour, hours);
        while let Some(hour) = clock.tick() {
            let battery_before = stored_wh(inverter.as_ref().and_then(|inv| inv.battery()));
            let ev_before = stored_wh(ev.as_ref());
            out.battery_soc_percent.push(
                inverter
                    .as_ref()
                    .and_then(|inv| inv.battery())
                    .map(Battery::current_soc_percentage),
            );
            out.ev_soc_percent
                .push(ev.as_ref().map(Battery::current_soc_percentage));

            let pv = forecast.pv_forecast_wh()[hour];
            let household = forecast.load_wh()[hour];
            let appliance_wh = appliance
                .as_ref()
                .map_or(0.0, |a| a.get_load_for_hour(hour));
            let mut consumption = household + appliance_wh;
            let mut losses = 0.0;

            let mut ev_drawn = 0.0;
            let ev_factor = schedule.ev_charge[hour].clamp(0.0, 1.0);
            if let Some(ev) = ev.as_mut().filter(|_| ev_factor > 0.0) {
                let (charged, loss) = ev.charge_energy(None, hour, ev_factor);
                ev_drawn = charged + loss;
                consumption += ev_drawn;
                losses += loss;
            }

            let flow = match inverter.as_mut() {
                Some(inv) => {
                    let dc_allowed = schedule.dc_charge[hour] > 0.0;
                    if let Some(battery) = inv.battery_mut() {
                        battery.set_charge_allowed_for_hour(hour, dc_allowed);
                    }
                    inv.process_energy(pv, consumption, hour)
                }
                // Without an inverter PV cannot reach the AC side.
                None => InverterFlow {
                    grid_import_wh: consumption,
                    losses_wh: pv,
                    ..InverterFlow::default()
                },
            };
            losses += flow.losses_wh;
            let mut grid_import = flow.grid_import_wh;

            let mut ac_drawn = 0.0;
            let ac_factor = schedule.ac_charge[hour].clamp(0.0, 1.0);
            if let Some(inv) = inverter.as_mut().filter(|_| ac_factor > 0.0) {
                let max_ac = inv.max_ac_charge_power_w();
                let ac_to_dc = inv.parameters().ac_to_dc_efficiency;
                if let Some(battery) = inv.battery_mut() {
                    battery.set_charge_allowed_for_hour(hour, true);
                    let (charged, loss) =
                        battery.charge_energy(Some(ac_factor * max_ac * ac_to_dc), hour, 0.0);
                    let dc_in = charged + loss;
                    ac_drawn = dc_in / ac_to_dc;
                    losses += loss + (ac_drawn - dc_in);
                }
            }
            grid_import += ac_drawn;
            consumption += ac_drawn;

            let price = forecast.price_per_wh()[hour];
            out.pv_wh.push(pv);
            out.household_load_wh.push(household);
            out.appliance_wh.push(appliance_wh);
            out.ev_charge_wh.push(ev_drawn);
            out.ac_charge_wh.push(ac_drawn);
            out.load_wh.push(consumption);
            out.grid_export_wh.push(flow.grid_export_wh);
            out.grid_import_wh.push(grid_import);
            out.self_consumption_wh.push(flow.self_consumption_wh);
            out.losses_wh.push(losses);
            out.cost.push(grid_import * price);
            out.revenue
                .push(flow.grid_export_wh * forecast.feed_in_tariff().at(hour));
            out.electricity_price.push(price);
            out.battery_delta_wh.push(
                stored_wh(inverter.as_ref().and_then(|inv| inv.battery())) - battery_before,
            );
            out.ev_delta_wh.push(stored_wh(ev.as_ref()) - ev_before);
        }

        let battery = inverter.as_ref().and_then(|inv| inv.battery());
        Ok(out.finish(
            start_hour,
            battery,
            ev.as_ref(),
            appliance_start_hour,
        ))
    }
}

fn stored_wh(battery: Option<&Battery>) -> f64 {
    battery.map_or(0.0, Battery::soc_wh)
}

struct HourlyBuffers {
    pv_wh: Vec<f64>,
    household_load_wh: Vec<f64>,
    appliance_wh: Vec<f64>,
    ev_charge_wh: Vec<f64>,
    ac_charge_wh: Vec<f64>,
    load_wh: Vec<f64>,
    grid_export_wh: Vec<f64>,
    grid_import_wh: Vec<f64>,
    self_consumption_wh: Vec<f64>,
    losses_wh: Vec<f64>,
    cost: Vec<f64>,
    revenue: Vec<f64>,
    electricity_price: Vec<f64>,
    battery_soc_percent: Vec<Option<f64>>,
    ev_soc_percent: Vec<Option<f64>>,
    battery_delta_wh: Vec<f64>,
    ev_delta_wh: Vec<f64>,
}

impl HourlyBuffers {
    fn with_capacity(hours: usize) -> Self {
        let f = || Vec::with_capacity(hours);
        Self {
            pv_wh: f(),
            household_load_wh: f(),
            appliance_wh: f(),
            ev_charge_wh: f(),
            ac_charge_wh: f(),
            load_wh: f(),
            grid_export_wh: f(),
            grid_import_wh: f(),
            self_consumption_wh: f(),
            losses_wh: f(),
            cost: f(),
            revenue: f(),
            electricity_price: f(),
            battery_soc_percent: Vec::with_capacity(hours),
            ev_soc_percent: Vec::with_capacity(hours),
            battery_delta_wh: f(),
            ev_delta_wh: f(),
        }
    }

    fn finish(
        self,
        start_hour: usize,
        battery: Option<&Battery>,
        ev: Option<&Battery>,
        appliance_start_hour: Option<usize>,
    ) -> SimulationResult {
        let total_costs = sum_present(&self.cost);
        let total_revenue = sum_present(&self.revenue);
        let total_losses = sum_present(&self.losses_wh);
        SimulationResult {
            start_hour,
            pv_wh: self.pv_wh,
            household_load_wh: self.household_load_wh,
            appliance_wh: self.appliance_wh,
            ev_charge_wh: self.ev_charge_wh,
            ac_charge_wh: self.ac_charge_wh,
            load_wh: self.load_wh,
            grid_export_wh: self.grid_export_wh,
            grid_import_wh: self.grid_import_wh,
            self_consumption_wh: self.self_consumption_wh,
            losses_wh: self.losses_wh,
            cost: self.cost,
            revenue: self.revenue,
            electricity_price: self.electricity_price,
            battery_soc_percent: self.battery_soc_percent,
            ev_soc_percent: self.ev_soc_percent,
            battery_delta_wh: self.battery_delta_wh,
            ev_delta_wh: self.ev_delta_wh,
            total_costs,
            total_revenue,
            total_losses,
            total_balance: total_costs - total_revenue,
            final_battery_soc_percent: battery.map(Battery::current_soc_percentage),
            final_ev_soc_percent: ev.map(Battery::current_soc_percentage),
            final_battery_energy_content_wh: battery.map_or(0.0, Battery::current_energy_content),
            appliance_start_hour,
        }
    }
}
