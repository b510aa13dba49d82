//! Population-based search over schedule genomes.

use std::num::NonZeroUsize;
use std::thread;
use std::time::Instant;

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, info, warn};

use crate::context::RunContext;
use crate::error::{Error, Result};

use super::fitness::FitnessEvaluator;
use super::genome::{Genome, GenomeLayout};
use super::params::OptimizationParameters;
use super::solution::GeneticSolution;

#[derive(Debug, Clone)]
struct Individual {
    genome: Genome,
    fitness: f64,
}

/// Genetic optimizer over one run context.
///
/// Each generation breeds as many offspring as there are individuals, then
/// keeps the best of parents and offspring together. The best individual can
/// therefore never be lost, and the best fitness never gets worse.
#[derive(Debug)]
pub struct GeneticOptimizer<'a> {
    ctx: &'a RunContext,
    params: OptimizationParameters,
    layout: GenomeLayout,
}

impl<'a> GeneticOptimizer<'a> {
    /// # Errors
    ///
    /// * `Error::Config` - the parameters are invalid
    /// * `Error::GenomeLayout` - the start solution does not fit the devices
    pub fn new(ctx: &'a RunContext, params: OptimizationParameters) -> Result<Self> {
        params.validate()?;
        let layout = GenomeLayout::from_context(ctx);
        if let Some(start) = &params.start_solution {
            layout.check(start)?;
        }
        Ok(Self {
            ctx,
            params,
            layout,
        })
    }

    pub fn layout(&self) -> &GenomeLayout {
        &self.layout
    }

    /// Runs the search and returns the best genome found.
    ///
    /// Stops after `generations` generations, or earlier once the deadline has
    /// passed at a generation boundary.
    ///
    /// # Errors
    ///
    /// Propagates simulation errors from fitness evaluation.
    pub fn optimize(&self) -> Result<GeneticSolution> {
        let params = &self.params;
        let layout = &self.layout;
        if layout.is_empty() {
            warn!("no optimizable devices configured, schedule has no controllable dimensions");
        } else if !layout.has_battery() {
            info!("no storage battery behind the inverter, battery genes disabled");
        }

        let seed = params.seed.unwrap_or_else(|| rand::rng().random());
        let workers = params
            .workers
            .unwrap_or_else(|| thread::available_parallelism().map_or(1, NonZeroUsize::get));
        info!(
            seed,
            individuals = params.individuals,
            generations = params.generations,
            workers,
            hours = layout.total_hours(),
            "starting genetic optimization"
        );

        let mut rng = StdRng::seed_from_u64(seed);
        let evaluator = FitnessEvaluator::new(self.ctx, layout, params.penalty_weights());
        let started = Instant::now();

        let mut genomes = Vec::with_capacity(params.individuals);
        if let Some(start) = &params.start_solution {
            genomes.push(start.clone());
        }
        while genomes.len() < params.individuals {
            genomes.push(layout.random(&mut rng));
        }
        let mut population = evaluate_all(&evaluator, genomes, workers)?;
        sort_by_fitness(&mut population);

        let mut fitness_history = Vec::with_capacity(params.generations);
        let mut generations_run = 0;
        for generation in 0..params.generations {
            if params.deadline.is_some_and(|d| started.elapsed() >= d) {
                info!(generation, "deadline reached, stopping early");
                break;
            }

            let offspring = self.breed(&population, &mut rng);
            population.extend(evaluate_all(&evaluator, offspring, workers)?);
            sort_by_fitness(&mut population);
            population.truncate(params.individuals);

            let best = population.first().ok_or(Error::EmptyPopulation)?.fitness;
            fitness_history.push(best);
            generations_run += 1;
            debug!(generation, best_fitness = best, "generation complete");
        }

        let best = population
            .into_iter()
            .next()
            .ok_or(Error::EmptyPopulation)?;
        let evaluation = evaluator.evaluate(&best.genome)?;
        info!(
            fitness = best.fitness,
            balance = evaluation.result.total_balance,
            generations_run,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "genetic optimization finished"
        );
        Ok(GeneticSolution::new(
            best.genome,
            evaluation,
            fitness_history,
            generations_run,
            seed,
        ))
    }

    /// Produces one generation of offspring from a sorted population.
    fn breed(&self, population: &[Individual], rng: &mut StdRng) -> Vec<Genome> {
        let params = &self.params;
        let mut offspring = Vec::with_capacity(params.individuals);
        while offspring.len() < params.individuals {
            let a = &population[tournament(population.len(), params.tournament_size, rng)];
            let b = &population[tournament(population.len(), params.tournament_size, rng)];
            let (mut c1, mut c2) = if rng.random_bool(params.crossover_probability) {
                self.layout.crossover(&a.genome, &b.genome, rng)
            } else {
                (a.genome.clone(), b.genome.clone())
            };
            for child in [&mut c1, &mut c2] {
                if rng.random_bool(params.mutation_probability) {
                    self.layout.mutate(child, params.gene_mutation_rate, rng);
                }
            }
            offspring.push(c1);
            if offspring.len() < params.individuals {
                offspring.push(c2);
            }
        }
        offspring
    }
}

/// Tournament over a population sorted best-first: the lowest drawn index wins.
fn tournament(len: usize, size: usize, rng: &mut StdRng) -> usize {
    (0..size)
        .map(|_| rng.random_range(0..len))
        .min()
        .unwrap_or(0)
}

/// Stable, so equal fitness keeps the earlier (older) individual first.
fn sort_by_fitness(population: &mut [Individual]) {
    population.sort_by(|a, b| a.fitness.total_cmp(&b.fitness));
}

/// Scores genomes on up to `workers` threads, preserving input order.
fn evaluate_all(
    evaluator: &FitnessEvaluator<'_>,
    genomes: Vec<Genome>,
    workers: usize,
) -> Result<Vec<Individual>> {
    let fitness: Vec<f64> = if workers <= 1 || genomes.len() < 2 {
        genomes
            .iter()
            .map(|g| evaluator.fitness(g))
            .collect::<Result<_>>()?
    } else {
        let chunk = genomes.len().div_ceil(workers);
        thread::scope(|scope| {
            let handles: Vec<_> = genomes
                .chunks(chunk)
                .map(|part| {
                    scope.spawn(move || {
                        part.iter()
                            .map(|g| evaluator.fitness(g))
                            .collect::<Result<Vec<f64>>>()
                    })
                })
                .collect();
            let mut out = Vec::with_capacity(genomes.len());
            for handle in handles {
                let part = handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))?;
                out.extend(part);
            }
            Ok::<_, Error>(out)
        })?
    };

    Ok(genomes
        .into_iter()
        .zip(fitness)
        .map(|(genome, fitness)| Individual { genome, fitness })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::genome::EvGenes;

    #[test]
    fn tournament_prefers_low_indices() {
        let mut rng = StdRng::seed_from_u64(5);
        let picks: Vec<usize> = (0..1000).map(|_| tournament(10, 3, &mut rng)).collect();
        assert!(picks.iter().all(|&i| i < 10));
        let mean = picks.iter().sum::<usize>() as f64 / picks.len() as f64;
        assert!(mean < 4.5);
    }

    #[test]
    fn sort_is_stable_for_ties() {
        let genome = |x: f64| Genome {
            ac_charge: vec![x],
            dc_charge: vec![],
            discharge: vec![],
            ev: EvGenes::Absent,
            appliance_start: None,
        };
        let mut population = vec![
            Individual {
                genome: genome(1.0),
                fitness: 2.0,
            },
            Individual {
                genome: genome(2.0),
                fitness: 1.0,
            },
            Individual {
                genome: genome(3.0),
                fitness: 2.0,
            },
        ];
        sort_by_fitness(&mut population);
        let order: Vec<f64> = population.iter().map(|i| i.genome.ac_charge[0]).collect();
        assert_eq!(order, vec![2.0, 1.0, 3.0]);
    }
}
