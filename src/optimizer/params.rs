use std::collections::BTreeMap;
use std::time::Duration;

use tracing::warn;

use crate::error::{ConfigError, ensure_in_range};

use super::genome::Genome;

/// Penalty key for missing the EV's target SOC at the end of the horizon.
pub const EV_SOC_MISS: &str = "ev_soc_miss";
/// Penalty key for grid charging above the break-even price.
pub const AC_CHARGE_BREAK_EVEN: &str = "ac_charge_break_even";

const DEFAULT_EV_SOC_MISS: f64 = 10.0;
const DEFAULT_AC_CHARGE_BREAK_EVEN: f64 = 1.0;

/// Genetic optimizer settings.
#[derive(Debug, Clone)]
pub struct OptimizationParameters {
    /// Population size (>= 10).
    pub individuals: usize,
    /// Number of generations (>= 10).
    pub generations: usize,
    /// RNG seed; drawn from the OS when absent.
    pub seed: Option<u64>,
    /// Penalty weights by name.
    pub penalties: BTreeMap<String, f64>,
    /// Known-good genome injected into the initial population.
    pub start_solution: Option<Genome>,
    pub crossover_probability: f64,
    /// Probability that an offspring is mutated at all.
    pub mutation_probability: f64,
    /// Per-gene mutation probability of a mutated offspring.
    pub gene_mutation_rate: f64,
    pub tournament_size: usize,
    /// Evaluation threads; defaults to the available parallelism.
    pub workers: Option<usize>,
    /// Wall-clock budget, checked between generations.
    pub deadline: Option<Duration>,
}

impl Default for OptimizationParameters {
    fn default() -> Self {
        Self {
            individuals: 300,
            generations: 400,
            seed: None,
            penalties: BTreeMap::new(),
            start_solution: None,
            crossover_probability: 0.6,
            mutation_probability: 0.4,
            gene_mutation_rate: 0.1,
            tournament_size: 3,
            workers: None,
            deadline: None,
        }
    }
}

impl OptimizationParameters {
    /// Validates population, generation, and operator settings.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.individuals < 10 {
            return Err(ConfigError::new(
                "optimization.individuals",
                format!("must be >= 10, got {}", self.individuals),
            ));
        }
        if self.generations < 10 {
            return Err(ConfigError::new(
                "optimization.generations",
                format!("must be >= 10, got {}", self.generations),
            ));
        }
        ensure_in_range(
            "optimization.crossover_probability",
            self.crossover_probability,
            0.0..=1.0,
        )?;
        ensure_in_range(
            "optimization.mutation_probability",
            self.mutation_probability,
            0.0..=1.0,
        )?;
        ensure_in_range(
            "optimization.gene_mutation_rate",
            self.gene_mutation_rate,
            0.0..=1.0,
        )?;
        if self.tournament_size < 2 {
            return Err(ConfigError::new(
                "optimization.tournament_size",
                format!("must be >= 2, got {}", self.tournament_size),
            ));
        }
        if self.workers == Some(0) {
            return Err(ConfigError::new("optimization.workers", "must be >= 1"));
        }
        for (name, weight) in &self.penalties {
            if !weight.is_finite() {
                return Err(ConfigError::new(
                    format!("optimization.penalties.{name}"),
                    "must be finite",
                ));
            }
        }
        Ok(())
    }

    /// Resolves named penalty weights, falling back to defaults.
    ///
    /// Unknown names are logged and ignored.
    pub fn penalty_weights(&self) -> PenaltyWeights {
        let mut weights = PenaltyWeights::default();
        for (name, &weight) in &self.penalties {
            match name.as_str() {
                EV_SOC_MISS => weights.ev_soc_miss = weight,
                AC_CHARGE_BREAK_EVEN => weights.ac_charge_break_even = weight,
                other => warn!(penalty = other, "ignoring unknown penalty"),
            }
        }
        weights
    }
}

/// Resolved penalty weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenaltyWeights {
    pub ev_soc_miss: f64,
    pub ac_charge_break_even: f64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            ev_soc_miss: DEFAULT_EV_SOC_MISS,
            ac_charge_break_even: DEFAULT_AC_CHARGE_BREAK_EVEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(OptimizationParameters::default().validate().is_ok());
    }

    #[test]
    fn small_population_is_rejected() {
        let params = OptimizationParameters {
            individuals: 9,
            ..OptimizationParameters::default()
        };
        let err = params.validate().expect_err("too small");
        assert_eq!(err.field, "optimization.individuals");

        let params = OptimizationParameters {
            generations: 3,
            ..OptimizationParameters::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn named_penalties_override_defaults() {
        let mut params = OptimizationParameters::default();
        params.penalties.insert(EV_SOC_MISS.into(), 25.0);
        params.penalties.insert("battery_wear".into(), 3.0);
        let weights = params.penalty_weights();
        assert_eq!(weights.ev_soc_miss, 25.0);
        assert_eq!(weights.ac_charge_break_even, 1.0);
    }
}
