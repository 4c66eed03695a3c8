//! PDPTW Solver - Command Line Interface
//!
//! Single-vehicle Pickup and Delivery Problem with Time Windows.

use clap::{Parser, Subcommand};
use pdptw_solver::benchmark::{compare_strategies, BatchRunner};
use pdptw_solver::config::Config;
use pdptw_solver::instance::PDPTWInstance;
use pdptw_solver::solver::{SearchStatus, Solver};

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pdptw-solver")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "A heuristic solver for the single-vehicle PDPTW")]
struct Cli {
    /// Log at debug level (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides applied on top of the configuration file
#[derive(clap::Args)]
struct SearchArgs {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Time limit in seconds
    #[arg(short, long)]
    time_limit: Option<f64>,

    /// Number of parallel workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Base random seed
    #[arg(short, long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a single instance
    Solve {
        #[arg(short, long)]
        instance: PathBuf,

        #[command(flatten)]
        search: SearchArgs,

        /// Directory receiving the route file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Solve every instance of a directory
    Batch {
        /// Directory containing instance files
        #[arg(short, long)]
        dir: PathBuf,

        #[command(flatten)]
        search: SearchArgs,

        /// Directory receiving one route file per instance
        #[arg(long, default_value = "solutions")]
        solutions: PathBuf,

        /// CSV file for per-instance results
        #[arg(long, default_value = "results.csv")]
        csv: PathBuf,
    },

    /// Print instance statistics
    Analyze {
        #[arg(short, long)]
        instance: PathBuf,
    },

    /// Compare raw construction strategies on one instance
    Compare {
        #[arg(short, long)]
        instance: PathBuf,

        /// Routes built per strategy
        #[arg(short, long, default_value = "100")]
        runs: usize,

        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Optional CSV output
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match cli.command {
        Commands::Solve { instance, search, output } => {
            run_solve(&instance, &search, output.as_deref());
        }
        Commands::Batch { dir, search, solutions, csv } => {
            run_batch(&dir, &search, &solutions, &csv);
        }
        Commands::Analyze { instance } => {
            run_analyze(&instance);
        }
        Commands::Compare { instance, runs, seed, output } => {
            run_compare(&instance, runs, seed, output.as_deref());
        }
    }
}

fn load_config(args: &SearchArgs) -> Config {
    let mut config = match &args.config {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading configuration {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    if let Some(seconds) = args.time_limit {
        config = config.with_time_limit(seconds);
    }
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    config
}

fn load_instance(path: &Path) -> PDPTWInstance {
    match PDPTWInstance::from_file(path) {
        Ok(instance) => instance,
        Err(e) => {
            eprintln!("Error loading instance {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn run_solve(instance_path: &Path, search: &SearchArgs, output: Option<&Path>) {
    let instance = load_instance(instance_path);
    let reference = instance.clone();
    let name = instance.name.clone();
    let solver = Solver::new(load_config(search));

    println!("Instance: {} ({} nodes, {} pairs)", name, instance.num_nodes, instance.num_tasks());

    let outcome = match solver.process(instance) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    if outcome.status == SearchStatus::PartialTimeout {
        println!("Warning: time limit reached, returning best partial solution");
    }

    println!("\n=== Solution ===");
    println!("Algorithm: {}", outcome.solution.algorithm);
    println!("Objective ({}): {}", solver.objective().name(), outcome.cost);
    println!("Makespan: {}", outcome.solution.make_span(&reference));
    println!("Total distance: {}", outcome.solution.total_distance(&reference));
    println!("Check: {}", outcome.solution.check(&reference));
    println!("Results received: {}", outcome.results_received);
    println!("Time: {:.3}s", outcome.elapsed.as_secs_f64());
    println!("Route: {}", outcome.solution);

    if let Some(dir) = output {
        match outcome.solution.write_to_file(dir, &name) {
            Ok(()) => println!("Solution saved to: {}", dir.join(&name).display()),
            Err(e) => eprintln!("Error saving solution: {}", e),
        }
    }
}

fn run_batch(dir: &Path, search: &SearchArgs, solutions: &Path, csv: &Path) {
    let solver = Solver::new(load_config(search));
    let mut runner = BatchRunner::new(solver)
        .with_solutions_dir(solutions)
        .with_progress(true);

    match runner.run_dir(dir) {
        Ok(count) => println!("Processed {} files from {}", count, dir.display()),
        Err(e) => {
            eprintln!("Error reading directory {}: {}", dir.display(), e);
            std::process::exit(1);
        }
    }

    println!(
        "\n{:<25} {:>10} {:>10} {:>10} {:>8} {:>16}",
        "Instance", "Makespan", "Distance", "Time(s)", "Check", "Status"
    );
    println!("{}", "-".repeat(84));
    for record in runner.records() {
        println!(
            "{:<25} {:>10} {:>10} {:>10.3} {:>8} {:>16}",
            record.instance, record.makespan, record.total_distance, record.time, record.check, record.status
        );
    }
    for (name, reason) in runner.failures() {
        println!("{:<25} {}", name, reason);
    }

    println!("\n{}", runner.summary());

    match runner.export_csv(csv) {
        Ok(()) => println!("Results exported to: {}", csv.display()),
        Err(e) => eprintln!("Error exporting results: {}", e),
    }
}

fn run_analyze(instance_path: &Path) {
    let mut instance = load_instance(instance_path);
    instance.preprocess();
    print!("{}", instance.statistics());
}

fn run_compare(instance_path: &Path, runs: usize, seed: u64, output: Option<&Path>) {
    let mut instance = load_instance(instance_path);
    instance.preprocess();
    let weights = Config::default().construction.penalty;

    println!("Comparing construction strategies on {} ({} runs each)", instance.name, runs);
    let rows = compare_strategies(&instance, weights, runs, seed);

    println!(
        "\n{:<20} {:>10} {:>12} {:>14} {:>12}",
        "Strategy", "Feasible", "Rate", "Mean penalty", "Std"
    );
    println!("{}", "-".repeat(72));
    for row in &rows {
        println!(
            "{:<20} {:>10} {:>11.1}% {:>14.2} {:>12.2}",
            row.strategy,
            row.feasible,
            row.feasibility_rate * 100.0,
            row.mean_penalty,
            row.std_penalty
        );
    }

    if let Some(path) = output {
        let written = csv::Writer::from_path(path).and_then(|mut writer| {
            for row in &rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
            Ok(())
        });
        match written {
            Ok(()) => println!("\nResults exported to: {}", path.display()),
            Err(e) => eprintln!("Error exporting results: {}", e),
        }
    }
}
