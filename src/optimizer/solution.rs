//! Best-found schedule and its adapters for downstream consumers.

use std::fmt;

use crate::context::RunContext;
use crate::sim::{Schedule, SimulationResult};

use super::fitness::{Evaluation, FitnessBreakdown};
use super::genome::Genome;

/// Result of a genetic optimization run.
#[derive(Debug, Clone)]
pub struct GeneticSolution {
    pub genome: Genome,
    /// Decoded full-horizon schedule of `genome`.
    pub schedule: Schedule,
    pub result: SimulationResult,
    pub fitness: f64,
    pub breakdown: FitnessBreakdown,
    pub total_balance: f64,
    pub total_costs: f64,
    pub total_revenue: f64,
    pub total_losses: f64,
    /// Best fitness after each generation.
    pub fitness_history: Vec<f64>,
    pub generations_run: usize,
    /// Seed the run used, for reproducing it.
    pub seed: u64,
}

impl GeneticSolution {
    pub fn new(
        genome: Genome,
        evaluation: Evaluation,
        fitness_history: Vec<f64>,
        generations_run: usize,
        seed: u64,
    ) -> Self {
        let Evaluation {
            schedule,
            result,
            breakdown,
        } = evaluation;
        Self {
            genome,
            schedule,
            total_balance: result.total_balance,
            total_costs: result.total_costs,
            total_revenue: result.total_revenue,
            total_losses: result.total_losses,
            result,
            fitness: breakdown.fitness,
            breakdown,
            fitness_history,
            generations_run,
            seed,
        }
    }

    /// One row per simulated hour with controls, flows, money, and SOCs.
    pub fn frame(&self) -> Vec<SolutionRow> {
        let r = &self.result;
        (0..r.total_hours())
            .map(|i| {
                let hour = r.hour_at(i);
                SolutionRow {
                    hour,
                    ac_charge: self.schedule.ac_charge[hour],
                    dc_charge: self.schedule.dc_charge[hour],
                    discharge_allowed: self.schedule.discharge_allowed[hour],
                    ev_charge: self.schedule.ev_charge[hour],
                    pv_wh: r.pv_wh[i],
                    load_wh: r.load_wh[i],
                    appliance_wh: r.appliance_wh[i],
                    grid_import_wh: r.grid_import_wh[i],
                    grid_export_wh: r.grid_export_wh[i],
                    losses_wh: r.losses_wh[i],
                    electricity_price: r.electricity_price[i],
                    cost: r.cost[i],
                    revenue: r.revenue[i],
                    battery_soc_percent: r.battery_soc_percent[i],
                    ev_soc_percent: r.ev_soc_percent[i],
                }
            })
            .collect()
    }

    /// Device instructions, one per change of operation mode.
    ///
    /// Each device gets an instruction at the first simulated hour and then
    /// only when its mode or factor changes.
    pub fn dispatch_plan(&self, ids: &DispatchIds) -> Vec<DispatchInstruction> {
        let r = &self.result;
        let s = &self.schedule;
        let mut plan = Vec::new();
        let mut last: [Option<(OperationMode, f64)>; 3] = [None; 3];

        for i in 0..r.total_hours() {
            let hour = r.hour_at(i);
            let modes = [
                ids.battery.as_ref().map(|id| {
                    let mode = if s.ac_charge[hour] > 0.0 {
                        (OperationMode::ForcedCharge, s.ac_charge[hour])
                    } else if s.discharge_allowed[hour] {
                        (OperationMode::SelfConsumption, 1.0)
                    } else if s.dc_charge[hour] > 0.0 {
                        (OperationMode::PvChargeOnly, 1.0)
                    } else {
                        (OperationMode::Idle, 0.0)
                    };
                    (id, mode)
                }),
                ids.ev.as_ref().map(|id| {
                    let mode = if s.ev_charge[hour] > 0.0 {
                        (OperationMode::ForcedCharge, s.ev_charge[hour])
                    } else {
                        (OperationMode::Idle, 0.0)
                    };
                    (id, mode)
                }),
                ids.appliance.as_ref().map(|id| {
                    let mode = if r.appliance_wh[i] > 0.0 {
                        (OperationMode::Run, 1.0)
                    } else {
                        (OperationMode::Idle, 0.0)
                    };
                    (id, mode)
                }),
            ];

            for (slot, entry) in last.iter_mut().zip(modes) {
                let Some((id, (mode, factor))) = entry else {
                    continue;
                };
                if *slot != Some((mode, factor)) {
                    plan.push(DispatchInstruction {
                        hour,
                        device_id: id.clone(),
                        mode,
                        factor: factor.clamp(0.0, 1.0),
                    });
                    *slot = Some((mode, factor));
                }
            }
        }
        plan
    }
}

/// Device ids addressed by the dispatch plan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchIds {
    pub battery: Option<String>,
    pub ev: Option<String>,
    pub appliance: Option<String>,
}

impl DispatchIds {
    pub fn from_context(ctx: &RunContext) -> Self {
        Self {
            battery: ctx.battery().map(|b| b.device_id().to_string()),
            ev: ctx.ev().map(|ev| ev.device_id().to_string()),
            appliance: ctx.appliance().map(|a| a.device_id().to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMode {
    /// Charge from the grid at the given factor.
    ForcedCharge,
    /// Serve load from PV and battery, charge from PV surplus.
    SelfConsumption,
    /// Charge from PV only, never discharge.
    PvChargeOnly,
    Idle,
    Run,
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = match self {
            Self::ForcedCharge => "FORCED_CHARGE",
            Self::SelfConsumption => "SELF_CONSUMPTION",
            Self::PvChargeOnly => "PV_CHARGE_ONLY",
            Self::Idle => "IDLE",
            Self::Run => "RUN",
        };
        f.write_str(id)
    }
}

/// Switch `device_id` to `mode` at absolute `hour`.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchInstruction {
    pub hour: usize,
    pub device_id: String,
    pub mode: OperationMode,
    /// Operation-mode factor in `[0, 1]`.
    pub factor: f64,
}

impl fmt::Display for DispatchInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "h={:>3}  {:<12} {:<16} factor={:.2}",
            self.hour, self.device_id, self.mode, self.factor
        )
    }
}

/// One hour of the solution frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionRow {
    pub hour: usize,
    pub ac_charge: f64,
    pub dc_charge: f64,
    pub discharge_allowed: bool,
    pub ev_charge: f64,
    pub pv_wh: f64,
    pub load_wh: f64,
    pub appliance_wh: f64,
    pub grid_import_wh: f64,
    pub grid_export_wh: f64,
    pub losses_wh: f64,
    pub electricity_price: f64,
    pub cost: f64,
    pub revenue: f64,
    pub battery_soc_percent: Option<f64>,
    pub ev_soc_percent: Option<f64>,
}

impl fmt::Display for SolutionRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "h={:>3} | ac={:.2} dc={:.0} dis={} ev={:.2} | pv={:>7.1} load={:>7.1} \
             imp={:>7.1} exp={:>7.1} | cost={:.4} rev={:.4}",
            self.hour,
            self.ac_charge,
            self.dc_charge,
            u8::from(self.discharge_allowed),
            self.ev_charge,
            self.pv_wh,
            self.load_wh,
            self.grid_import_wh,
            self.grid_export_wh,
            self.cost,
            self.revenue,
        )?;
        if let Some(soc) = self.battery_soc_percent {
            write!(f, " | bat={soc:>5.1}%")?;
        }
        if let Some(soc) = self.ev_soc_percent {
            write!(f, " ev={soc:>5.1}%")?;
        }
        Ok(())
    }
}
