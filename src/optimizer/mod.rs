//! Genetic scheduling optimizer.

pub mod fitness;
/// Schedule encoding and genetic operators.
pub mod genome;
pub mod genetic;
pub mod params;
/// Result packaging and dispatch-plan adapters.
pub mod solution;

pub use fitness::{Evaluation, FitnessBreakdown, FitnessEvaluator};
pub use genetic::GeneticOptimizer;
pub use genome::{EvGenes, Genome, GenomeLayout};
pub use params::{OptimizationParameters, PenaltyWeights};
pub use solution::{DispatchIds, DispatchInstruction, GeneticSolution, OperationMode, SolutionRow};
