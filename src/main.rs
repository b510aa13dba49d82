//! home-ems entry point: CLI wiring, scenario loading, and report printing.

use std::path::Path;
use std::process;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use home_ems::config::{Scenario, ScenarioConfig};
use home_ems::io::export::export_csv;
use home_ems::optimizer::{DispatchIds, GeneticOptimizer, GeneticSolution};
use home_ems::sim::kpi::EnergySummary;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    generations_override: Option<usize>,
    individuals_override: Option<usize>,
    telemetry_out: Option<String>,
}

fn print_help() {
    eprintln!("home-ems - genetic schedule optimizer for a PV home energy system");
    eprintln!();
    eprintln!("Usage: home-ems [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        ScenarioConfig::PRESETS.join(", ")
    );
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --generations <n>        Override number of generations");
    eprintln!("  --individuals <n>        Override population size");
    eprintln!("  --telemetry-out <path>   Export the hourly schedule to CSV");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the demo preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}

fn next_value<'a>(args: &'a [String], i: usize, flag: &str, what: &str) -> &'a str {
    match args.get(i) {
        Some(v) => v.as_str(),
        None => {
            eprintln!("error: {flag} requires {what}");
            process::exit(1);
        }
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, flag: &str, what: &str) -> T {
    value.parse().unwrap_or_else(|_| {
        eprintln!("error: {flag} value \"{value}\" is not a valid {what}");
        process::exit(1);
    })
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        generations_override: None,
        individuals_override: None,
        telemetry_out: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                i += 1;
                cli.scenario_path =
                    Some(next_value(&args, i, "--scenario", "a path argument").to_string());
            }
            "--preset" => {
                i += 1;
                cli.preset = Some(next_value(&args, i, "--preset", "a name argument").to_string());
            }
            "--seed" => {
                i += 1;
                let v = next_value(&args, i, "--seed", "a u64 argument");
                cli.seed_override = Some(parse_number(v, "--seed", "u64"));
            }
            "--generations" => {
                i += 1;
                let v = next_value(&args, i, "--generations", "a count argument");
                cli.generations_override = Some(parse_number(v, "--generations", "count"));
            }
            "--individuals" => {
                i += 1;
                let v = next_value(&args, i, "--individuals", "a count argument");
                cli.individuals_override = Some(parse_number(v, "--individuals", "count"));
            }
            "--telemetry-out" => {
                i += 1;
                cli.telemetry_out =
                    Some(next_value(&args, i, "--telemetry-out", "a path argument").to_string());
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_report(scenario: &Scenario, solution: &GeneticSolution) {
    for row in solution.frame() {
        println!("{row}");
    }

    println!("\n{}", EnergySummary::from_result(&solution.result));

    let b = &solution.breakdown;
    println!("\n--- Fitness ---");
    println!("Balance:         {:.4}", b.balance);
    println!("Battery value:   {:.4}", b.battery_value);
    println!("EV SOC penalty:  {:.4}", b.ev_soc_penalty);
    println!("AC penalty:      {:.4}", b.ac_charge_penalty);
    println!("Fitness:         {:.4}", b.fitness);
    println!(
        "Generations:     {} (seed {})",
        solution.generations_run, solution.seed
    );

    let plan = solution.dispatch_plan(&DispatchIds::from_context(&scenario.context));
    if !plan.is_empty() {
        println!("\n--- Dispatch Plan ---");
        for instruction in &plan {
            println!("{instruction}");
        }
    }
}

fn main() {
    init_tracing();
    let cli = parse_args();

    // Load config: --scenario takes priority, then --preset, then demo default
    let mut config = if let Some(ref path) = cli.scenario_path {
        match ScenarioConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else if let Some(ref name) = cli.preset {
        match ScenarioConfig::from_preset(name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        ScenarioConfig::demo()
    };

    if let Some(seed) = cli.seed_override {
        config.optimization.seed = Some(seed);
    }
    if let Some(generations) = cli.generations_override {
        config.optimization.generations = generations;
    }
    if let Some(individuals) = cli.individuals_override {
        config.optimization.individuals = individuals;
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let scenario = config.build().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    let solution = GeneticOptimizer::new(&scenario.context, scenario.params.clone())
        .and_then(|optimizer| optimizer.optimize())
        .unwrap_or_else(|e| {
            eprintln!("error: {e}");
            process::exit(1);
        });

    print_report(&scenario, &solution);

    if let Some(ref path) = cli.telemetry_out {
        if let Err(e) = export_csv(&solution.frame(), Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Schedule written to {path}");
    }
}
