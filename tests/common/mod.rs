//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use home_ems::context::RunContext;
use home_ems::devices::{
    Battery, BatteryParameters, HomeAppliance, HomeApplianceParameters, Inverter,
    InverterParameters, TimeWindow, VehicleParameters,
};
use home_ems::forecast::{FeedInTariff, Forecast};
use home_ems::optimizer::OptimizationParameters;
use home_ems::sim::Schedule;

pub const HOURS: usize = 48;

/// Household load of the reference two-day scenario (Wh).
pub const LOAD_WH: [f64; HOURS] = [
    676.71, 876.19, 527.13, 468.88, 531.38, 517.95, 483.15, 472.28, 1011.68, 995.00, 1053.07,
    1063.91, 1320.56, 1132.03, 1163.67, 1176.82, 1216.22, 1103.78, 1129.12, 1178.71, 1050.98,
    988.56, 912.38, 704.61, 516.37, 868.05, 694.34, 608.79, 556.31, 488.89, 506.91, 804.89,
    1141.98, 1056.97, 992.46, 1155.99, 827.01, 1257.98, 1232.67, 871.26, 860.88, 1158.03,
    1222.72, 1221.04, 949.99, 987.01, 733.99, 592.97,
];

/// PV spike of 5 kWh at hours 10 and 11, nothing otherwise.
pub fn pv_wh() -> Vec<f64> {
    let mut pv = vec![0.0; HOURS];
    pv[10] = 5000.0;
    pv[11] = 5000.0;
    pv
}

/// Expensive grid except for cheap hours 0-9, 11-14, and 20.
pub fn price_per_wh() -> Vec<f64> {
    let mut price = vec![0.001; HOURS];
    price[0..10].fill(0.00001);
    price[11..15].fill(0.00005);
    price[20] = 0.00001;
    price
}

pub fn reference_forecast() -> Forecast {
    Forecast::new(
        pv_wh(),
        LOAD_WH.to_vec(),
        price_per_wh(),
        FeedInTariff::Flat(0.00007),
        0.0,
    )
    .expect("reference forecast is valid")
}

/// 5 kWh battery at 80 % with a 10 % floor.
pub fn reference_battery() -> Battery {
    let mut params = BatteryParameters::new("battery1", 5000.0);
    params.initial_soc_percentage = 80.0;
    params.min_soc_percentage = 10.0;
    Battery::storage(params, HOURS).expect("battery is valid")
}

/// 10 kW inverter with the reference battery attached.
pub fn reference_inverter() -> Inverter {
    let params = InverterParameters::new("inverter1", 10_000.0).with_battery_id("battery1");
    Inverter::with_full_self_consumption(params, Some(reference_battery()))
        .expect("inverter is valid")
}

/// Fully charged 26.4 kWh EV that must stay full.
pub fn reference_ev() -> Battery {
    let mut params = BatteryParameters::new("ev1", 26_400.0);
    params.initial_soc_percentage = 100.0;
    params.min_soc_percentage = 100.0;
    Battery::vehicle(VehicleParameters::new(params), HOURS).expect("ev is valid")
}

/// 2 kWh dishwasher running for two hours.
pub fn reference_dishwasher() -> HomeAppliance {
    HomeAppliance::new(HomeApplianceParameters::new("dishwasher", 2000.0, 2), HOURS)
        .expect("dishwasher is valid")
}

/// Reference scenario with every device attached.
pub fn reference_context(start_hour: usize) -> RunContext {
    RunContext::new(reference_forecast(), start_hour)
        .and_then(|ctx| ctx.with_inverter(reference_inverter()))
        .and_then(|ctx| ctx.with_ev(reference_ev()))
        .and_then(|ctx| ctx.with_appliance(reference_dishwasher()))
        .expect("reference context is valid")
}

/// Idle schedule except DC charging at hour 11, AC charging at hour 20,
/// and the dishwasher starting at hour 2.
pub fn reference_schedule() -> Schedule {
    let mut schedule = Schedule::new(HOURS);
    schedule.dc_charge[11] = 1.0;
    schedule.ac_charge[20] = 1.0;
    schedule.appliance_start = Some(2);
    schedule
}

/// Reference scenario with an EV that starts half empty and a dishwasher
/// restricted to the afternoon, giving the optimizer something to decide.
pub fn optimizer_context() -> RunContext {
    let mut ev_params = BatteryParameters::new("ev1", 20_000.0);
    ev_params.initial_soc_percentage = 50.0;
    ev_params.min_soc_percentage = 80.0;
    ev_params.max_charge_power_w = Some(4000.0);
    let ev = Battery::vehicle(
        VehicleParameters::new(ev_params).with_charge_rates(vec![0.0, 0.5, 1.0]),
        HOURS,
    )
    .expect("ev is valid");
    let dishwasher = HomeAppliance::new(
        HomeApplianceParameters::new("dishwasher", 2000.0, 2)
            .with_time_window(TimeWindow::new(13, 4)),
        HOURS,
    )
    .expect("dishwasher is valid");
    RunContext::new(reference_forecast(), 0)
        .and_then(|ctx| ctx.with_inverter(reference_inverter()))
        .and_then(|ctx| ctx.with_ev(ev))
        .and_then(|ctx| ctx.with_appliance(dishwasher))
        .expect("optimizer context is valid")
}

/// Small, seeded optimizer settings for fast tests.
pub fn quick_params(seed: u64) -> OptimizationParameters {
    OptimizationParameters {
        individuals: 24,
        generations: 15,
        seed: Some(seed),
        workers: Some(1),
        ..OptimizationParameters::default()
    }
}
