//! Concurrent multi-restart orchestrator.
//!
//! `iter_max` workers each construct a feasible route and then run the
//! configured metaheuristic `rounds` times, handing every intermediate
//! result to a single collector over a rendezvous channel. The collector
//! keeps the best result by objective value until every message has arrived
//! or the time budget runs out, then raises the shared cancellation flag.

use crate::config::Config;
use crate::error::SolveError;
use crate::heuristics::construction::{Construction, ConstructionStrategy};
use crate::heuristics::metaheuristics::{Metaheuristic, MetaheuristicKind};
use crate::heuristics::objective::Objective;
use crate::instance::PDPTWInstance;
use crate::solution::Solution;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How a search ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    /// Every worker delivered all of its results
    Complete,
    /// The time budget ran out; the solution is the best seen so far
    PartialTimeout,
}

impl std::fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchStatus::Complete => write!(f, "complete"),
            SearchStatus::PartialTimeout => write!(f, "partial-timeout"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub solution: Solution,
    pub cost: i64,
    pub status: SearchStatus,
    pub results_received: usize,
    pub elapsed: Duration,
}

/// Minimum-by-objective reduction over solutions. Ties keep the first
/// solution seen, so the best cost does not depend on arrival order.
#[derive(Debug, Clone)]
pub struct BestTracker {
    objective: Objective,
    best: Option<(i64, Solution)>,
}

impl BestTracker {
    pub fn new(objective: Objective) -> Self {
        BestTracker { objective, best: None }
    }

    /// Keep `solution` if it is strictly better; returns whether it was kept.
    pub fn offer(&mut self, instance: &PDPTWInstance, solution: Solution) -> bool {
        let cost = self.objective.cost(instance, &solution);
        match &self.best {
            Some((best_cost, _)) if *best_cost <= cost => false,
            _ => {
                self.best = Some((cost, solution));
                true
            }
        }
    }

    pub fn best_cost(&self) -> Option<i64> {
        self.best.as_ref().map(|(cost, _)| *cost)
    }

    pub fn best(&self) -> Option<&Solution> {
        self.best.as_ref().map(|(_, solution)| solution)
    }

    pub fn into_best(self) -> Option<(i64, Solution)> {
        self.best
    }
}

pub struct Solver {
    config: Config,
    objective: Objective,
    method: MetaheuristicKind,
    construction: Arc<Construction>,
    optimization: Arc<dyn Metaheuristic + Send + Sync>,
}

impl Solver {
    /// Resolve every configured name once.
    pub fn new(mut config: Config) -> Self {
        let max_time = config.common.max_time;
        if !max_time.is_finite() || max_time < 0.0 {
            log::warn!("Invalid time budget {}, using 0s", max_time);
            config.common.max_time = 0.0;
        }

        let objective = Objective::from_config(&config.optimization.objective, config.optimization.asymmetric);
        let method = MetaheuristicKind::from_name(&config.optimization.method);
        let construction = Construction::new(
            ConstructionStrategy::from_name(&config.construction.strategy),
            config.construction.level_max,
            config.construction.penalty,
        );
        let optimization: Arc<dyn Metaheuristic + Send + Sync> = Arc::from(method.build(objective, &config.optimization));

        Solver {
            config,
            objective,
            method,
            construction: Arc::new(construction),
            optimization,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Solve `instance` with all configured workers under the time budget.
    ///
    /// A timeout with at least one result is reported through
    /// [`SearchStatus::PartialTimeout`]; without any result it is
    /// [`SolveError::Timeout`].
    pub fn process(&self, mut instance: PDPTWInstance) -> Result<SolveOutcome, SolveError> {
        let start = Instant::now();
        instance.preprocess();

        let (objective, optimization) = if self.objective == Objective::TotalTime && !instance.is_symmetric() {
            log::warn!("Instance {} has an asymmetric matrix, using directional travel times", instance.name);
            let objective = Objective::TotalTimeAsymmetric;
            let optimization: Arc<dyn Metaheuristic + Send + Sync> =
                Arc::from(self.method.build(objective, &self.config.optimization));
            (objective, optimization)
        } else {
            (self.objective, Arc::clone(&self.optimization))
        };

        let common = &self.config.common;
        log::info!(
            "Solving {} ({} nodes) with {} workers, {:.2}s budget, {} {}",
            instance.name,
            instance.num_nodes,
            common.iter_max,
            common.max_time,
            optimization.name(),
            objective.name()
        );

        let instance = Arc::new(instance);
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::sync_channel::<Solution>(0);

        let mut workers = 0;
        for index in 0..common.iter_max {
            let worker = Worker {
                index,
                instance: Arc::clone(&instance),
                construction: Arc::clone(&self.construction),
                optimization: Arc::clone(&optimization),
                rounds: common.rounds,
                seed: common.seed,
                cancel: Arc::clone(&cancel),
                results: tx.clone(),
            };

            let builder = thread::Builder::new().name(format!("worker-{}", index));
            match builder.spawn(move || worker.run()) {
                Ok(_) => workers += 1,
                Err(e) => log::error!("Failed to spawn worker {}: {}", index, e),
            }
        }
        drop(tx);

        // `max_time` is finite and non-negative here; only a budget too large
        // for `Instant` leaves the collector without a deadline
        let deadline = Duration::try_from_secs_f64(common.max_time)
            .ok()
            .and_then(|budget| start.checked_add(budget));
        let expected = workers * (common.rounds + 1);
        let mut tracker = BestTracker::new(objective);
        let mut received = 0;
        let mut status = SearchStatus::Complete;

        while received < expected {
            let next = match deadline {
                Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match next {
                Ok(solution) => {
                    received += 1;
                    if tracker.offer(&instance, solution) {
                        log::debug!("New best {} after {} results", tracker.best_cost().unwrap_or_default(), received);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    status = SearchStatus::PartialTimeout;
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        // workers still blocked on the channel see it closed once `rx` drops
        cancel.store(true, Ordering::Relaxed);
        let elapsed = start.elapsed();

        match tracker.into_best() {
            Some((cost, mut solution)) => {
                if status == SearchStatus::PartialTimeout {
                    log::warn!("Timeout: only a partial solution was found ({} results)", received);
                }
                solution.computation_time = elapsed.as_secs_f64();
                Ok(SolveOutcome {
                    solution,
                    cost,
                    status,
                    results_received: received,
                    elapsed,
                })
            }
            None if status == SearchStatus::PartialTimeout => {
                log::warn!("Timeout: unable to find a solution for {}", instance.name);
                Err(SolveError::Timeout)
            }
            None => Err(SolveError::NoSolution),
        }
    }
}

/// One independent restart
struct Worker {
    index: usize,
    instance: Arc<PDPTWInstance>,
    construction: Arc<Construction>,
    optimization: Arc<dyn Metaheuristic + Send + Sync>,
    rounds: usize,
    seed: Option<u64>,
    cancel: Arc<AtomicBool>,
    results: SyncSender<Solution>,
}

impl Worker {
    fn run(self) {
        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_add(self.index as u64)),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut solution = match self.construction.process(&self.instance, &mut rng, &self.cancel) {
            Some(solution) => solution,
            None => return,
        };
        if self.results.send(solution.clone()).is_err() {
            return;
        }

        for _ in 0..self.rounds {
            if self.cancel.load(Ordering::Relaxed) {
                return;
            }
            solution = self.optimization.process(&self.instance, solution, &mut rng, &self.cancel);
            if self.results.send(solution.clone()).is_err() {
                return;
            }
        }
    }
}
