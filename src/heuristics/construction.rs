//! Initial route construction and the penalty-driven repair loop.

use crate::evaluation::PenaltyWeights;
use crate::heuristics::shifting::PenaltyShifting;
use crate::instance::PDPTWInstance;
use crate::solution::{Move, Solution};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

pub trait ConstructionHeuristic {
    /// Build a complete (possibly infeasible) route starting at the start node.
    fn construct(&self, instance: &PDPTWInstance, rng: &mut ChaCha8Rng) -> Solution;
    fn name(&self) -> &str;
}

/// All nodes except the start node, in index order
fn other_nodes(instance: &PDPTWInstance) -> Vec<usize> {
    (0..instance.num_nodes)
        .filter(|&n| n != instance.start_node)
        .collect()
}

fn with_start(instance: &PDPTWInstance, rest: Vec<usize>, algorithm: &str) -> Solution {
    let mut route = Vec::with_capacity(instance.num_nodes);
    route.push(instance.start_node);
    route.extend(rest);
    Solution::from_route(instance, route, algorithm)
}

/// Uniformly random permutation of the non-start nodes
pub struct RandomConstruction;

impl ConstructionHeuristic for RandomConstruction {
    fn construct(&self, instance: &PDPTWInstance, rng: &mut ChaCha8Rng) -> Solution {
        let mut rest = other_nodes(instance);
        rest.shuffle(rng);
        with_start(instance, rest, self.name())
    }

    fn name(&self) -> &str {
        "Random"
    }
}

/// Nearest Neighbor Heuristic
///
/// Repeatedly appends the closest unvisited node; ties go to the lowest
/// node index. Ignores every constraint.
pub struct NearestNeighborConstruction;

impl ConstructionHeuristic for NearestNeighborConstruction {
    fn construct(&self, instance: &PDPTWInstance, _rng: &mut ChaCha8Rng) -> Solution {
        let mut solution = Solution::new(instance);
        solution.algorithm = self.name().to_string();

        while let Some(current) = solution.current() {
            let next = (0..instance.num_nodes)
                .filter(|&n| !solution.has_node(n))
                .min_by_key(|&n| (instance.travel(current, n), n));
            match next {
                Some(node) => solution.push_node(node),
                None => break,
            }
        }

        solution
    }

    fn name(&self) -> &str {
        "NearestNeighbor"
    }
}

/// Nodes ordered by due date; nodes without a due date go last.
pub struct DueDateConstruction;

impl ConstructionHeuristic for DueDateConstruction {
    fn construct(&self, instance: &PDPTWInstance, _rng: &mut ChaCha8Rng) -> Solution {
        let mut rest = other_nodes(instance);
        rest.sort_by_key(|&n| instance.due(n));
        with_start(instance, rest, self.name())
    }

    fn name(&self) -> &str {
        "SortByDueDate"
    }
}

/// Nodes ordered by the middle of their time window.
pub struct TimeWindowMedianConstruction;

impl TimeWindowMedianConstruction {
    fn median(instance: &PDPTWInstance, node: usize) -> i64 {
        let due = instance.due(node);
        due - due.saturating_sub(instance.ready(node)) / 2
    }
}

impl ConstructionHeuristic for TimeWindowMedianConstruction {
    fn construct(&self, instance: &PDPTWInstance, _rng: &mut ChaCha8Rng) -> Solution {
        let mut rest = other_nodes(instance);
        rest.sort_by_key(|&n| Self::median(instance, n));
        with_start(instance, rest, self.name())
    }

    fn name(&self) -> &str {
        "SortByTW"
    }
}

/// Shuffled pickups and single stops, followed by shuffled deliveries.
/// Precedence always holds.
pub struct PairedRandomConstruction;

impl ConstructionHeuristic for PairedRandomConstruction {
    fn construct(&self, instance: &PDPTWInstance, rng: &mut ChaCha8Rng) -> Solution {
        let (mut deliveries, mut first): (Vec<usize>, Vec<usize>) = other_nodes(instance)
            .into_iter()
            .partition(|&n| instance.pickup_of(n).is_some());
        first.shuffle(rng);
        deliveries.shuffle(rng);
        first.extend(deliveries);
        with_start(instance, first, self.name())
    }

    fn name(&self) -> &str {
        "RandomPD"
    }
}

/// Construction strategy selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionStrategy {
    Random,
    Greedy,
    DueDate,
    TwMedian,
    RandomPairs,
}

impl ConstructionStrategy {
    pub fn from_name(name: &str) -> Self {
        match name {
            "random" => ConstructionStrategy::Random,
            "greedy" => ConstructionStrategy::Greedy,
            "sortByDueDate" | "sortBydueDate" => ConstructionStrategy::DueDate,
            "sortByTW" => ConstructionStrategy::TwMedian,
            "randomPD" => ConstructionStrategy::RandomPairs,
            other => {
                log::warn!("Unknown construction strategy '{}', using random", other);
                ConstructionStrategy::Random
            }
        }
    }

    pub fn all() -> [ConstructionStrategy; 5] {
        [
            ConstructionStrategy::Random,
            ConstructionStrategy::Greedy,
            ConstructionStrategy::DueDate,
            ConstructionStrategy::TwMedian,
            ConstructionStrategy::RandomPairs,
        ]
    }

    pub fn build(self) -> Box<dyn ConstructionHeuristic + Send + Sync> {
        match self {
            ConstructionStrategy::Random => Box::new(RandomConstruction),
            ConstructionStrategy::Greedy => Box::new(NearestNeighborConstruction),
            ConstructionStrategy::DueDate => Box::new(DueDateConstruction),
            ConstructionStrategy::TwMedian => Box::new(TimeWindowMedianConstruction),
            ConstructionStrategy::RandomPairs => Box::new(PairedRandomConstruction),
        }
    }
}

/// Builds a feasible route: construct, then disturb and repair until every
/// constraint holds.
pub struct Construction {
    strategy: Box<dyn ConstructionHeuristic + Send + Sync>,
    level_max: usize,
    shifting: PenaltyShifting,
}

impl Construction {
    pub fn new(strategy: ConstructionStrategy, level_max: usize, weights: PenaltyWeights) -> Self {
        Construction {
            strategy: strategy.build(),
            level_max,
            shifting: PenaltyShifting::new(weights),
        }
    }

    pub fn penalty(&self, instance: &PDPTWInstance, solution: &Solution) -> i64 {
        self.shifting.weights.penalty(instance, &solution.route)
    }

    /// Copy of `solution` with `level` random node relocations applied.
    pub fn disturb(&self, solution: &Solution, level: usize, rng: &mut ChaCha8Rng) -> Solution {
        let mut x = solution.clone();
        let n = x.len();
        if n < 3 {
            return x;
        }

        for _ in 0..level {
            Move::Shift(rng.gen_range(1..n), rng.gen_range(1..n)).apply(&mut x);
        }
        x
    }

    /// Run the repair loop until a feasible route is found.
    ///
    /// The penalty of the current route only ever decreases until the
    /// disturbance level exceeds `level_max`, at which point the search
    /// restarts from a fresh construction. Returns `None` once `cancel` is
    /// raised without a feasible route.
    pub fn process(
        &self,
        instance: &PDPTWInstance,
        rng: &mut ChaCha8Rng,
        cancel: &AtomicBool,
    ) -> Option<Solution> {
        let start = Instant::now();
        let mut level = 1;
        let mut x = self.strategy.construct(instance, rng);
        let mut penalty = self.penalty(instance, &x);

        while !x.is_feasible(instance) {
            if cancel.load(Ordering::Relaxed) {
                return None;
            }

            let mut x2 = self.disturb(&x, level, rng);
            let p2 = self.shifting.repair(instance, &mut x2, rng);

            if x2.is_feasible(instance) {
                x = x2;
                break;
            }

            if p2 < penalty {
                x = x2;
                penalty = p2;
                level = 1;
            } else {
                level += 1;
                if level > self.level_max {
                    level = 1;
                    x = self.strategy.construct(instance, rng);
                    penalty = self.penalty(instance, &x);
                }
            }
        }

        x.algorithm = format!("Construction-{}", self.strategy.name());
        x.computation_time = start.elapsed().as_secs_f64();
        Some(x)
    }
}
