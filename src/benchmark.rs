//! Batch solving and experimentation for PDPTW.
//!
//! Provides tools for solving whole instance directories, collecting
//! per-instance results and comparing construction strategies.

use crate::evaluation::{is_feasible, PenaltyWeights};
use crate::heuristics::construction::ConstructionStrategy;
use crate::instance::PDPTWInstance;
use crate::solver::Solver;
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Result of solving a single instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Instance name
    pub instance: String,
    /// Number of nodes
    pub nodes: usize,
    /// Objective value of the returned route
    pub cost: i64,
    pub makespan: i64,
    pub total_distance: i64,
    /// Wall-clock time in seconds
    pub time: f64,
    /// Whether the route passed the full self-check
    pub check: bool,
    /// `complete` or `partial-timeout`
    pub status: String,
    /// Number of worker results consumed
    pub results: usize,
}

/// Aggregated statistics over a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub timestamp: String,
    pub num_instances: usize,
    pub num_solved: usize,
    pub num_checked: usize,
    pub mean_makespan: f64,
    pub std_makespan: f64,
    pub mean_time: f64,
    pub std_time: f64,
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "========================================")?;
        writeln!(f, "       PDPTW Batch Report ({})", self.timestamp)?;
        writeln!(f, "========================================")?;
        writeln!(f, "Instances: {}", self.num_instances)?;
        writeln!(f, "Solved:    {} ({} passed check)", self.num_solved, self.num_checked)?;
        writeln!(f, "Makespan:  {:.2} +/- {:.2}", self.mean_makespan, self.std_makespan)?;
        write!(f, "Time:      {:.3}s +/- {:.3}s", self.mean_time, self.std_time)
    }
}

/// Mean and sample standard deviation; 0 where undefined
fn mean_std(values: &[f64]) -> (f64, f64) {
    match values.len() {
        0 => (0.0, 0.0),
        1 => (values[0], 0.0),
        _ => (values.iter().mean(), values.iter().std_dev()),
    }
}

/// Solves instances one after the other with a shared [`Solver`].
pub struct BatchRunner {
    solver: Solver,
    solutions_dir: Option<PathBuf>,
    show_progress: bool,
    records: Vec<RunRecord>,
    failures: Vec<(String, String)>,
}

impl BatchRunner {
    pub fn new(solver: Solver) -> Self {
        BatchRunner {
            solver,
            solutions_dir: None,
            show_progress: false,
            records: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Write every returned route to `dir/<instance name>`
    pub fn with_solutions_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.solutions_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Solve every file of `dir` in name order. Files that fail to parse
    /// are recorded as failures and skipped.
    pub fn run_dir<P: AsRef<Path>>(&mut self, dir: P) -> std::io::Result<usize> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let progress = if self.show_progress {
            let bar = ProgressBar::new(paths.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        for path in &paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            progress.set_message(name.clone());
            log::info!("Solving: {}", name);

            match PDPTWInstance::from_file(path) {
                Ok(instance) => {
                    self.solve_instance(instance);
                }
                Err(e) => {
                    log::error!("Skipping {}: {}", name, e);
                    self.failures.push((name, e.to_string()));
                }
            }
            progress.inc(1);
        }

        progress.finish_and_clear();
        Ok(paths.len())
    }

    /// Solve one instance and record the outcome.
    pub fn solve_instance(&mut self, instance: PDPTWInstance) -> Option<&RunRecord> {
        let name = instance.name.clone();
        let reference = instance.clone();

        let outcome = match self.solver.process(instance) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("{}: {}", name, e);
                self.failures.push((name, e.to_string()));
                return None;
            }
        };

        if let Some(dir) = &self.solutions_dir {
            if let Err(e) = outcome.solution.write_to_file(dir, &name) {
                log::error!("Cannot write solution for {}: {}", name, e);
            }
        }

        self.records.push(RunRecord {
            instance: name,
            nodes: reference.num_nodes,
            cost: outcome.cost,
            makespan: outcome.solution.make_span(&reference),
            total_distance: outcome.solution.total_distance(&reference),
            time: outcome.elapsed.as_secs_f64(),
            check: outcome.solution.check(&reference),
            status: outcome.status.to_string(),
            results: outcome.results_received,
        });
        self.records.last()
    }

    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    /// `(instance, reason)` for every instance without a route
    pub fn failures(&self) -> &[(String, String)] {
        &self.failures
    }

    pub fn summary(&self) -> BatchSummary {
        let makespans: Vec<f64> = self.records.iter().map(|r| r.makespan as f64).collect();
        let times: Vec<f64> = self.records.iter().map(|r| r.time).collect();
        let (mean_makespan, std_makespan) = mean_std(&makespans);
        let (mean_time, std_time) = mean_std(&times);

        BatchSummary {
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            num_instances: self.records.len() + self.failures.len(),
            num_solved: self.records.len(),
            num_checked: self.records.iter().filter(|r| r.check).count(),
            mean_makespan,
            std_makespan,
            mean_time,
            std_time,
        }
    }

    /// Export results to CSV
    pub fn export_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), csv::Error> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for record in &self.records {
            writer.serialize(record)?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Raw quality of one construction strategy before any repair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub strategy: String,
    pub runs: usize,
    pub feasible: usize,
    pub feasibility_rate: f64,
    pub mean_penalty: f64,
    pub std_penalty: f64,
}

/// Build `runs` routes with every construction strategy in parallel and
/// measure how far they are from feasibility.
pub fn compare_strategies(
    instance: &PDPTWInstance,
    weights: PenaltyWeights,
    runs: usize,
    seed: u64,
) -> Vec<StrategyComparison> {
    ConstructionStrategy::all()
        .par_iter()
        .map(|&strategy| {
            let heuristic = strategy.build();
            let samples: Vec<(bool, f64)> = (0..runs)
                .into_par_iter()
                .map(|run| {
                    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(run as u64));
                    let solution = heuristic.construct(instance, &mut rng);
                    (
                        is_feasible(instance, &solution.route),
                        weights.penalty(instance, &solution.route) as f64,
                    )
                })
                .collect();

            let feasible = samples.iter().filter(|(ok, _)| *ok).count();
            let penalties: Vec<f64> = samples.iter().map(|&(_, p)| p).collect();
            let (mean_penalty, std_penalty) = mean_std(&penalties);

            StrategyComparison {
                strategy: heuristic.name().to_string(),
                runs,
                feasible,
                feasibility_rate: if runs == 0 { 0.0 } else { feasible as f64 / runs as f64 },
                mean_penalty,
                std_penalty,
            }
        })
        .collect()
}
