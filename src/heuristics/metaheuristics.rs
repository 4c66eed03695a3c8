//! Metaheuristic shells driving the local searches out of local optima.
//!
//! Every shell checks the shared cancellation flag once per outer
//! iteration and returns its best solution so far when it is raised.

use crate::config::OptimizationConfig;
use crate::heuristics::local_search::{LocalSearch, LocalSearchKind, Vnd};
use crate::heuristics::objective::Objective;
use crate::instance::PDPTWInstance;
use crate::solution::Solution;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

pub trait Metaheuristic {
    fn process(
        &self,
        instance: &PDPTWInstance,
        solution: Solution,
        rng: &mut ChaCha8Rng,
        cancel: &AtomicBool,
    ) -> Solution;
    fn name(&self) -> &str;
}

/// Shared VNS loop: shake the incumbent by `level` random k-exchanges,
/// descend, and either restart from level 1 on improvement or escalate
/// the level after `iter_max` failures at the current one.
#[allow(clippy::too_many_arguments)]
fn neighborhood_search(
    instance: &PDPTWInstance,
    mut incumbent: Solution,
    search: &dyn LocalSearch,
    objective: Objective,
    level_max: usize,
    iter_max: usize,
    rng: &mut ChaCha8Rng,
    cancel: &AtomicBool,
) -> Solution {
    search.improve(instance, &mut incumbent, rng);
    let mut best_cost = objective.cost(instance, &incumbent);
    let mut level = 1;
    let mut iter_level = 0;

    while level < level_max && !cancel.load(Ordering::Relaxed) {
        let mut x = incumbent.disturb(instance, level, rng);
        search.improve(instance, &mut x, rng);
        let cost = objective.cost(instance, &x);

        if cost < best_cost {
            incumbent = x;
            best_cost = cost;
            level = 1;
            iter_level = 0;
        } else {
            iter_level += 1;
            if iter_level > iter_max {
                level += 1;
                iter_level = 0;
            }
        }
    }

    incumbent
}

/// Variable Neighborhood Search with a configurable local search
pub struct Vns {
    pub objective: Objective,
    pub level_max: usize,
    pub iter_max: usize,
    search: Box<dyn LocalSearch + Send + Sync>,
}

impl Vns {
    pub fn new(objective: Objective, search: LocalSearchKind, level_max: usize, iter_max: usize) -> Self {
        Vns {
            objective,
            level_max,
            iter_max,
            search: search.build(objective),
        }
    }
}

impl Metaheuristic for Vns {
    fn process(
        &self,
        instance: &PDPTWInstance,
        solution: Solution,
        rng: &mut ChaCha8Rng,
        cancel: &AtomicBool,
    ) -> Solution {
        let start = Instant::now();
        let mut best = neighborhood_search(
            instance,
            solution,
            self.search.as_ref(),
            self.objective,
            self.level_max,
            self.iter_max,
            rng,
            cancel,
        );
        best.algorithm = format!("VNS-{}", self.search.name());
        best.computation_time += start.elapsed().as_secs_f64();
        best
    }

    fn name(&self) -> &str {
        "VNS"
    }
}

/// General VNS: the same search shape with VND as the descent step.
pub struct Gvns {
    pub objective: Objective,
    pub level_max: usize,
    pub iter_max: usize,
    search: Vnd,
}

impl Gvns {
    pub fn new(objective: Objective, level_max: usize, iter_max: usize) -> Self {
        Gvns {
            objective,
            level_max,
            iter_max,
            search: Vnd::new(objective),
        }
    }
}

impl Metaheuristic for Gvns {
    fn process(
        &self,
        instance: &PDPTWInstance,
        solution: Solution,
        rng: &mut ChaCha8Rng,
        cancel: &AtomicBool,
    ) -> Solution {
        let start = Instant::now();
        let mut best = neighborhood_search(
            instance,
            solution,
            &self.search,
            self.objective,
            self.level_max,
            self.iter_max,
            rng,
            cancel,
        );
        best.algorithm = "GVNS".to_string();
        best.computation_time += start.elapsed().as_secs_f64();
        best
    }

    fn name(&self) -> &str {
        "GVNS"
    }
}

/// Simulated Annealing
///
/// The temperature falls linearly with the iteration count while the
/// shaking strength grows with it. Returns the best state ever accepted.
pub struct SimulatedAnnealing {
    pub objective: Objective,
    pub iter_max: usize,
    search: Box<dyn LocalSearch + Send + Sync>,
}

impl SimulatedAnnealing {
    pub fn new(objective: Objective, search: LocalSearchKind, iter_max: usize) -> Self {
        SimulatedAnnealing {
            objective,
            iter_max,
            search: search.build(objective),
        }
    }

    pub(crate) fn temperature(fraction: f64) -> f64 {
        (1.0 - fraction).clamp(0.01, 1.0)
    }

    fn accept(cost: i64, new_cost: i64, temperature: f64, rng: &mut ChaCha8Rng) -> bool {
        if new_cost < cost {
            return true;
        }
        (-((new_cost - cost) as f64) / temperature).exp() > rng.gen::<f64>()
    }
}

impl Metaheuristic for SimulatedAnnealing {
    fn process(
        &self,
        instance: &PDPTWInstance,
        solution: Solution,
        rng: &mut ChaCha8Rng,
        cancel: &AtomicBool,
    ) -> Solution {
        let start = Instant::now();
        let mut cost = self.objective.cost(instance, &solution);
        let mut best = solution.clone();
        let mut best_cost = cost;
        let mut state = solution;

        for iter in 1..=self.iter_max {
            if cancel.load(Ordering::Relaxed) {
                break;
            }

            let fraction = iter as f64 / self.iter_max as f64;
            let temperature = Self::temperature(fraction);

            let mut next = state.disturb(instance, (fraction * 100.0) as usize, rng);
            self.search.improve(instance, &mut next, rng);
            let new_cost = self.objective.cost(instance, &next);

            if Self::accept(cost, new_cost, temperature, rng) {
                state = next;
                cost = new_cost;
                if cost < best_cost {
                    best = state.clone();
                    best_cost = cost;
                }
            }
        }

        best.algorithm = format!("SA-{}", self.search.name());
        best.computation_time += start.elapsed().as_secs_f64();
        best
    }

    fn name(&self) -> &str {
        "SA"
    }
}

/// Metaheuristic selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaheuristicKind {
    Vns,
    Gvns,
    SimulatedAnnealing,
}

impl MetaheuristicKind {
    /// `"vns"`, `"gvns"` or `"sa"`; anything else falls back to VNS.
    pub fn from_name(name: &str) -> Self {
        match name {
            "vns" => MetaheuristicKind::Vns,
            "gvns" => MetaheuristicKind::Gvns,
            "sa" => MetaheuristicKind::SimulatedAnnealing,
            other => {
                log::warn!("Unknown optimization method '{}', using vns", other);
                MetaheuristicKind::Vns
            }
        }
    }

    pub fn build(self, objective: Objective, config: &OptimizationConfig) -> Box<dyn Metaheuristic + Send + Sync> {
        match self {
            MetaheuristicKind::Vns => Box::new(Vns::new(
                objective,
                LocalSearchKind::from_name(&config.vns.local_search),
                config.vns.level_max,
                config.vns.iter_max,
            )),
            MetaheuristicKind::Gvns => Box::new(Gvns::new(objective, config.gvns.level_max, config.gvns.iter_max)),
            MetaheuristicKind::SimulatedAnnealing => Box::new(SimulatedAnnealing::new(
                objective,
                LocalSearchKind::from_name(&config.sa.local_search),
                config.sa.iter_max,
            )),
        }
    }
}
