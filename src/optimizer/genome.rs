//! Genome encoding of a control schedule and its genetic operators.

use rand::{Rng, rngs::StdRng};

use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::sim::Schedule;

/// EV charging genes.
#[derive(Debug, Clone, PartialEq)]
pub enum EvGenes {
    /// No EV configured.
    Absent,
    /// Index into the EV's discrete charge-rate alphabet, per hour.
    RateIndex(Vec<usize>),
    /// Continuous charge factor in `[0, 1]`, per hour.
    Factor(Vec<f64>),
}

/// One candidate schedule. Per-hour genes cover the simulated window only;
/// index `i` controls absolute hour `start_hour + i`.
///
/// Battery genes are empty when no storage battery is configured.
#[derive(Debug, Clone, PartialEq)]
pub struct Genome {
    pub ac_charge: Vec<f64>,
    /// DC charge gate, `0.0` or `1.0`.
    pub dc_charge: Vec<f64>,
    pub discharge: Vec<bool>,
    pub ev: EvGenes,
    pub appliance_start: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
enum EvDomain {
    Absent,
    Rates(Vec<f64>),
    Continuous,
}

/// Gene domains derived from the devices present in a run.
#[derive(Debug, Clone)]
pub struct GenomeLayout {
    hours: usize,
    start_hour: usize,
    battery: bool,
    ev: EvDomain,
    appliance_hours: Option<Vec<usize>>,
}

impl GenomeLayout {
    pub fn from_context(ctx: &RunContext) -> Self {
        let ev = match ctx.ev() {
            None => EvDomain::Absent,
            Some(ev) => match ev.charge_rates() {
                Some(rates) => EvDomain::Rates(rates.to_vec()),
                None => EvDomain::Continuous,
            },
        };
        let appliance_hours = ctx.appliance().map(|appliance| {
            let hours = appliance.allowed_start_hours(ctx.start_hour());
            // Nothing left today: the engine moves the start to tomorrow.
            if hours.is_empty() {
                vec![ctx.start_hour()]
            } else {
                hours
            }
        });
        Self {
            hours: ctx.hours(),
            start_hour: ctx.start_hour(),
            battery: ctx.battery().is_some(),
            ev,
            appliance_hours,
        }
    }

    /// Number of per-hour genes per dimension.
    pub fn total_hours(&self) -> usize {
        self.hours - self.start_hour
    }

    pub fn has_battery(&self) -> bool {
        self.battery
    }

    pub fn has_ev(&self) -> bool {
        self.ev != EvDomain::Absent
    }

    pub fn has_appliance(&self) -> bool {
        self.appliance_hours.is_some()
    }

    /// True if the run has no controllable dimension at all.
    pub fn is_empty(&self) -> bool {
        !self.has_battery() && !self.has_ev() && !self.has_appliance()
    }

    /// Appliance start hours the optimizer may choose from.
    pub fn appliance_hours(&self) -> Option<&[usize]> {
        self.appliance_hours.as_deref()
    }

    fn battery_len(&self) -> usize {
        if self.battery { self.total_hours() } else { 0 }
    }

    /// Genome that does nothing: no charging, discharge allowed, appliance at
    /// its first allowed hour.
    pub fn idle(&self) -> Genome {
        let n = self.battery_len();
        let ev = match &self.ev {
            EvDomain::Absent => EvGenes::Absent,
            EvDomain::Rates(_) => EvGenes::RateIndex(vec![0; self.total_hours()]),
            EvDomain::Continuous => EvGenes::Factor(vec![0.0; self.total_hours()]),
        };
        Genome {
            ac_charge: vec![0.0; n],
            dc_charge: vec![0.0; n],
            discharge: vec![true; n],
            ev,
            appliance_start: self
                .appliance_hours
                .as_ref()
                .and_then(|hours| hours.first().copied()),
        }
    }

    /// Draws a random genome within the gene domains.
    pub fn random(&self, rng: &mut StdRng) -> Genome {
        let n = self.battery_len();
        let ac_charge = (0..n).map(|_| random_factor(rng)).collect();
        let dc_charge = (0..n).map(|_| random_gate(rng)).collect();
        let discharge = (0..n).map(|_| rng.random_bool(0.5)).collect();
        let ev = match &self.ev {
            EvDomain::Absent => EvGenes::Absent,
            EvDomain::Rates(rates) => EvGenes::RateIndex(
                (0..self.total_hours())
                    .map(|_| rng.random_range(0..rates.len()))
                    .collect(),
            ),
            EvDomain::Continuous => {
                EvGenes::Factor((0..self.total_hours()).map(|_| random_factor(rng)).collect())
            }
        };
        let appliance_start = self
            .appliance_hours
            .as_ref()
            .map(|hours| hours[rng.random_range(0..hours.len())]);
        Genome {
            ac_charge,
            dc_charge,
            discharge,
            ev,
            appliance_start,
        }
    }

    /// Checks that `genome` matches this layout's shape and domains.
    ///
    /// # Errors
    ///
    /// Returns `Error::GenomeLayout` describing the first mismatch.
    pub fn check(&self, genome: &Genome) -> Result<()> {
        let n = self.battery_len();
        for (name, len) in [
            ("ac_charge", genome.ac_charge.len()),
            ("dc_charge", genome.dc_charge.len()),
            ("discharge", genome.discharge.len()),
        ] {
            if len != n {
                return Err(Error::GenomeLayout(format!(
                    "{name} has {len} genes, expected {n}"
                )));
            }
        }
        let total = self.total_hours();
        match (&self.ev, &genome.ev) {
            (EvDomain::Absent, EvGenes::Absent) => {}
            (EvDomain::Rates(rates), EvGenes::RateIndex(indices)) => {
                if indices.len() != total {
                    return Err(Error::GenomeLayout(format!(
                        "ev has {} genes, expected {total}",
                        indices.len()
                    )));
                }
                if let Some(bad) = indices.iter().find(|&&i| i >= rates.len()) {
                    return Err(Error::GenomeLayout(format!(
                        "ev rate index {bad} outside {} rates",
                        rates.len()
                    )));
                }
            }
            (EvDomain::Continuous, EvGenes::Factor(factors)) => {
                if factors.len() != total {
                    return Err(Error::GenomeLayout(format!(
                        "ev has {} genes, expected {total}",
                        factors.len()
                    )));
                }
            }
            _ => return Err(Error::GenomeLayout("ev gene kind does not match".into())),
        }
        match (&self.appliance_hours, genome.appliance_start) {
            (None, None) => Ok(()),
            (Some(hours), Some(start)) if hours.contains(&start) => Ok(()),
            (Some(_), Some(start)) => Err(Error::GenomeLayout(format!(
                "appliance start {start} is not an allowed start hour"
            ))),
            (Some(_), None) => Err(Error::GenomeLayout("appliance start is missing".into())),
            (None, Some(_)) => Err(Error::GenomeLayout(
                "appliance start given without an appliance".into(),
            )),
        }
    }

    /// Expands `genome` into a full-horizon schedule; hours before the start
    /// hour stay idle.
    pub fn decode(&self, genome: &Genome) -> Schedule {
        let mut schedule = Schedule::new(self.hours);
        let start = self.start_hour;
        for (i, &factor) in genome.ac_charge.iter().enumerate() {
            schedule.ac_charge[start + i] = factor.clamp(0.0, 1.0);
        }
        for (i, &gate) in genome.dc_charge.iter().enumerate() {
            schedule.dc_charge[start + i] = gate.clamp(0.0, 1.0);
        }
        for (i, &allowed) in genome.discharge.iter().enumerate() {
            schedule.discharge_allowed[start + i] = allowed;
        }
        match (&self.ev, &genome.ev) {
            (EvDomain::Rates(rates), EvGenes::RateIndex(indices)) => {
                for (i, &index) in indices.iter().enumerate() {
                    schedule.ev_charge[start + i] = rates.get(index).copied().unwrap_or(0.0);
                }
            }
            (_, EvGenes::Factor(factors)) => {
                for (i, &factor) in factors.iter().enumerate() {
                    schedule.ev_charge[start + i] = factor.clamp(0.0, 1.0);
                }
            }
            _ => {}
        }
        schedule.appliance_start = genome.appliance_start;
        schedule
    }

    /// Recombines two parents into two children.
    ///
    /// Continuous genes blend arithmetically with a fresh weight per hour;
    /// discrete genes and the appliance start swap with probability 0.5.
    pub fn crossover(&self, a: &Genome, b: &Genome, rng: &mut StdRng) -> (Genome, Genome) {
        let mut c1 = a.clone();
        let mut c2 = b.clone();

        blend(&mut c1.ac_charge, &mut c2.ac_charge, rng);
        swap_uniform(&mut c1.dc_charge, &mut c2.dc_charge, rng);
        swap_uniform(&mut c1.discharge, &mut c2.discharge, rng);
        match (&mut c1.ev, &mut c2.ev) {
            (EvGenes::RateIndex(x), EvGenes::RateIndex(y)) => swap_uniform(x, y, rng),
            (EvGenes::Factor(x), EvGenes::Factor(y)) => blend(x, y, rng),
            _ => {}
        }
        if c1.appliance_start.is_some() && rng.random_bool(0.5) {
            std::mem::swap(&mut c1.appliance_start, &mut c2.appliance_start);
        }
        (c1, c2)
    }

    /// Redraws each gene with probability `rate`.
    ///
    /// The appliance start is only ever redrawn from allowed start hours.
    pub fn mutate(&self, genome: &mut Genome, rate: f64, rng: &mut StdRng) {
        for gene in &mut genome.ac_charge {
            if rng.random_bool(rate) {
                *gene = random_factor(rng);
            }
        }
        for gene in &mut genome.dc_charge {
            if rng.random_bool(rate) {
                *gene = random_gate(rng);
            }
        }
        for gene in &mut genome.discharge {
            if rng.random_bool(rate) {
                *gene = !*gene;
            }
        }
        match (&self.ev, &mut genome.ev) {
            (EvDomain::Rates(rates), EvGenes::RateIndex(indices)) => {
                for gene in indices {
                    if rng.random_bool(rate) {
                        *gene = rng.random_range(0..rates.len());
                    }
                }
            }
            (_, EvGenes::Factor(factors)) => {
                for gene in factors {
                    if rng.random_bool(rate) {
                        *gene = random_factor(rng);
                    }
                }
            }
            _ => {}
        }
        if let (Some(hours), Some(start)) = (&self.appliance_hours, &mut genome.appliance_start) {
            if rng.random_bool(rate) {
                *start = hours[rng.random_range(0..hours.len())];
            }
        }
    }
}

/// Half of the draws are zero so that idle hours are common from the start.
fn random_factor(rng: &mut StdRng) -> f64 {
    if rng.random_bool(0.5) {
        0.0
    } else {
        rng.random::<f64>()
    }
}

fn random_gate(rng: &mut StdRng) -> f64 {
    if rng.random_bool(0.5) { 1.0 } else { 0.0 }
}

fn blend(x: &mut [f64], y: &mut [f64], rng: &mut StdRng) {
    for (a, b) in x.iter_mut().zip(y.iter_mut()) {
        let w: f64 = rng.random();
        let (old_a, old_b) = (*a, *b);
        *a = w * old_a + (1.0 - w) * old_b;
        *b = w * old_b + (1.0 - w) * old_a;
    }
}

fn swap_uniform<T>(x: &mut [T], y: &mut [T], rng: &mut StdRng) {
    for (a, b) in x.iter_mut().zip(y.iter_mut()) {
        if rng.random_bool(0.5) {
            std::mem::swap(a, b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{
        Battery, BatteryParameters, HomeAppliance, HomeApplianceParameters, Inverter,
        InverterParameters, TimeWindow, VehicleParameters,
    };
    use crate::forecast::{FeedInTariff, Forecast};
    use rand::SeedableRng;

    fn context(start_hour: usize) -> RunContext {
        let hours = 24;
        let forecast = Forecast::new(
            vec![0.0; hours],
            vec![300.0; hours],
            vec![0.0003; hours],
            FeedInTariff::Flat(0.0),
            0.0,
        )
        .expect("valid forecast");
        let battery =
            Battery::storage(BatteryParameters::new("battery1", 5000.0), hours).expect("battery");
        let inverter = Inverter::with_full_self_consumption(
            InverterParameters::new("inverter1", 10_000.0).with_battery_id("battery1"),
            Some(battery),
        )
        .expect("inverter");
        let ev = Battery::vehicle(
            VehicleParameters::new(BatteryParameters::new("ev1", 20_000.0))
                .with_charge_rates(vec![0.0, 0.5, 1.0]),
            hours,
        )
        .expect("ev");
        let appliance = HomeAppliance::new(
            HomeApplianceParameters::new("dishwasher", 1000.0, 2)
                .with_time_window(TimeWindow::new(14, 4)),
            hours,
        )
        .expect("appliance");
        RunContext::new(forecast, start_hour)
            .and_then(|ctx| ctx.with_inverter(inverter))
            .and_then(|ctx| ctx.with_ev(ev))
            .and_then(|ctx| ctx.with_appliance(appliance))
            .expect("valid context")
    }

    #[test]
    fn random_genomes_fit_the_layout() {
        let layout = GenomeLayout::from_context(&context(6));
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let genome = layout.random(&mut rng);
            assert!(layout.check(&genome).is_ok());
            assert_eq!(genome.ac_charge.len(), 18);
            let start = genome.appliance_start.expect("appliance gene");
            assert!((14..18).contains(&start));
        }
    }

    #[test]
    fn decode_zero_fills_hours_before_start() {
        let layout = GenomeLayout::from_context(&context(6));
        let mut genome = layout.idle();
        genome.ac_charge[0] = 0.7;
        genome.dc_charge[1] = 1.0;
        if let EvGenes::RateIndex(indices) = &mut genome.ev {
            indices[2] = 1;
        }
        let schedule = layout.decode(&genome);
        assert!(schedule.covers(24));
        assert!(schedule.ac_charge[..6].iter().all(|&f| f == 0.0));
        assert_eq!(schedule.ac_charge[6], 0.7);
        assert_eq!(schedule.dc_charge[7], 1.0);
        assert_eq!(schedule.ev_charge[8], 0.5);
        assert_eq!(schedule.appliance_start, Some(14));
    }

    #[test]
    fn check_rejects_appliance_start_outside_windows() {
        let layout = GenomeLayout::from_context(&context(0));
        let mut genome = layout.idle();
        assert!(layout.check(&genome).is_ok());
        genome.appliance_start = Some(3);
        assert!(matches!(layout.check(&genome), Err(Error::GenomeLayout(_))));
        genome.appliance_start = None;
        assert!(layout.check(&genome).is_err());
    }

    #[test]
    fn mutation_keeps_appliance_inside_windows() {
        let layout = GenomeLayout::from_context(&context(0));
        let mut rng = StdRng::seed_from_u64(3);
        let mut genome = layout.random(&mut rng);
        for _ in 0..200 {
            layout.mutate(&mut genome, 1.0, &mut rng);
            let start = genome.appliance_start.expect("appliance gene");
            assert!(layout.appliance_hours().is_some_and(|h| h.contains(&start)));
            assert!(layout.check(&genome).is_ok());
        }
    }

    #[test]
    fn crossover_keeps_values_between_parents() {
        let layout = GenomeLayout::from_context(&context(0));
        let mut rng = StdRng::seed_from_u64(9);
        let a = layout.random(&mut rng);
        let b = layout.random(&mut rng);
        let (c1, c2) = layout.crossover(&a, &b, &mut rng);
        assert!(layout.check(&c1).is_ok());
        assert!(layout.check(&c2).is_ok());
        for i in 0..a.ac_charge.len() {
            let lo = a.ac_charge[i].min(b.ac_charge[i]) - 1e-12;
            let hi = a.ac_charge[i].max(b.ac_charge[i]) + 1e-12;
            assert!((lo..=hi).contains(&c1.ac_charge[i]));
            assert!((lo..=hi).contains(&c2.ac_charge[i]));
        }
    }

    #[test]
    fn check_rejects_wrong_shapes() {
        let layout = GenomeLayout::from_context(&context(0));
        let mut genome = layout.idle();
        genome.ac_charge.pop();
        assert!(matches!(layout.check(&genome), Err(Error::GenomeLayout(_))));

        let mut genome = layout.idle();
        genome.ev = EvGenes::Factor(vec![0.0; 24]);
        assert!(layout.check(&genome).is_err());

        let mut genome = layout.idle();
        genome.ev = EvGenes::RateIndex(vec![5; 24]);
        assert!(layout.check(&genome).is_err());
    }

    #[test]
    fn layout_without_devices_is_empty() {
        let forecast = Forecast::new(
            vec![0.0; 4],
            vec![0.0; 4],
            vec![0.0; 4],
            FeedInTariff::Flat(0.0),
            0.0,
        )
        .expect("valid forecast");
        let ctx = RunContext::new(forecast, 0).expect("valid context");
        let layout = GenomeLayout::from_context(&ctx);
        assert!(layout.is_empty());
        let genome = layout.idle();
        assert!(genome.ac_charge.is_empty());
        assert_eq!(genome.ev, EvGenes::Absent);
        assert!(layout.check(&genome).is_ok());
    }
}
