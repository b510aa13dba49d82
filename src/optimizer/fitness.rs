//! Fitness of a genome: simulated balance plus penalties. Lower is better.

use crate::context::RunContext;
use crate::error::Result;
use crate::sim::{Schedule, SimulationEngine, SimulationResult};

use super::genome::{Genome, GenomeLayout};
use super::params::PenaltyWeights;

/// Components of one fitness value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FitnessBreakdown {
    /// `total_costs - total_revenue`.
    pub balance: f64,
    /// Value of the energy left in the storage battery.
    pub battery_value: f64,
    pub ev_soc_penalty: f64,
    pub ac_charge_penalty: f64,
    /// `balance - battery_value + penalties`.
    pub fitness: f64,
}

/// Fully evaluated genome.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub schedule: Schedule,
    pub result: SimulationResult,
    pub breakdown: FitnessBreakdown,
}

/// Decodes, simulates, and scores genomes. Shared read-only across workers.
#[derive(Debug, Clone)]
pub struct FitnessEvaluator<'a> {
    engine: SimulationEngine<'a>,
    layout: &'a GenomeLayout,
    weights: PenaltyWeights,
    break_even_price: Vec<f64>,
    max_ac_charge_wh: f64,
}

impl<'a> FitnessEvaluator<'a> {
    pub fn new(ctx: &'a RunContext, layout: &'a GenomeLayout, weights: PenaltyWeights) -> Self {
        let max_ac_charge_wh = ctx.inverter().map_or(0.0, |inv| inv.max_ac_charge_power_w());
        Self {
            engine: SimulationEngine::new(ctx),
            layout,
            weights,
            break_even_price: break_even_prices(ctx),
            max_ac_charge_wh,
        }
    }

    /// Fitness of `genome`.
    ///
    /// # Errors
    ///
    /// Propagates simulation errors.
    pub fn fitness(&self, genome: &Genome) -> Result<f64> {
        Ok(self.evaluate(genome)?.breakdown.fitness)
    }

    /// Decodes and simulates `genome` and scores the outcome.
    ///
    /// # Errors
    ///
    /// Propagates simulation errors.
    pub fn evaluate(&self, genome: &Genome) -> Result<Evaluation> {
        let schedule = self.layout.decode(genome);
        let result = self.engine.simulate(&schedule)?;
        let breakdown = self.score(&schedule, &result);
        Ok(Evaluation {
            schedule,
            result,
            breakdown,
        })
    }

    fn score(&self, schedule: &Schedule, result: &SimulationResult) -> FitnessBreakdown {
        let ctx = self.engine.context();
        let battery_value =
            result.final_battery_energy_content_wh * ctx.forecast().price_per_wh_battery();

        let ev_soc_penalty = match (ctx.ev(), result.final_ev_soc_percent) {
            (Some(ev), Some(final_soc)) => {
                self.weights.ev_soc_miss * (ev.min_soc_percentage() - final_soc).max(0.0)
            }
            _ => 0.0,
        };

        let prices = ctx.forecast().price_per_wh();
        let ac_charge_penalty: f64 = (ctx.start_hour()..ctx.hours())
            .filter(|&hour| schedule.ac_charge[hour] > 0.0)
            .map(|hour| {
                let excess = (prices[hour] - self.break_even_price[hour]).max(0.0);
                excess * schedule.ac_charge[hour] * self.max_ac_charge_wh
            })
            .sum::<f64>()
            * self.weights.ac_charge_break_even;

        let balance = result.total_balance;
        FitnessBreakdown {
            balance,
            battery_value,
            ev_soc_penalty,
            ac_charge_penalty,
            fitness: balance - battery_value + ev_soc_penalty + ac_charge_penalty,
        }
    }
}

/// Highest later import price times the battery round-trip efficiency, per hour.
fn break_even_prices(ctx: &RunContext) -> Vec<f64> {
    let prices = ctx.forecast().price_per_wh();
    let round_trip = match (ctx.inverter(), ctx.battery()) {
        (Some(inv), Some(battery)) => {
            let params = inv.parameters();
            params.ac_to_dc_efficiency
                * battery.charging_efficiency()
                * battery.discharging_efficiency()
                * params.dc_to_ac_efficiency
        }
        _ => 0.0,
    };
    let mut out = vec![0.0; prices.len()];
    let mut max_later = 0.0_f64;
    for hour in (0..prices.len()).rev() {
        out[hour] = max_later * round_trip;
        max_later = max_later.max(prices[hour]);
    }
    out
}
