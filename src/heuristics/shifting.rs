//! Single node relocation ("1-shift").
//!
//! Two flavours share the move: [`ShiftingSearch`] improves a feasible
//! route under an [`Objective`] using the cached [`RouteState`], and
//! [`PenaltyShifting`] drives an infeasible route toward feasibility by
//! lowering its weighted penalty.

use crate::evaluation::{partition, PenaltyWeights, SetKind};
use crate::heuristics::local_search::LocalSearch;
use crate::heuristics::objective::Objective;
use crate::heuristics::route_state::{shifted_node, RouteState};
use crate::instance::PDPTWInstance;
use crate::solution::{Move, Solution};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Objective-driven relocation of single nodes on a feasible route.
pub struct ShiftingSearch {
    pub objective: Objective,
}

impl ShiftingSearch {
    pub fn new(objective: Objective) -> Self {
        ShiftingSearch { objective }
    }

    /// Whether moving the node at `pos` to `new_pos` keeps a feasible route
    /// feasible. Stops early once an arrival past the modified window is no
    /// later than the cached one.
    pub fn is_feasible_shift(
        &self,
        instance: &PDPTWInstance,
        route: &[usize],
        state: &RouteState,
        pos: usize,
        new_pos: usize,
    ) -> bool {
        if pos == new_pos {
            return true;
        }

        let (lo, hi) = if pos < new_pos { (pos, new_pos) } else { (new_pos, pos) };
        if let Some(q) = state.pair_index[pos] {
            let node = route[pos];
            let is_pickup = instance.pickup_of(node).is_none();
            // the partner sits in the window, so the pair order flips when
            // a pickup moves forward past it or a delivery moves back over it
            if q >= lo && q <= hi && (is_pickup == (new_pos > pos)) {
                return false;
            }
        }

        let mut prev = route[lo - 1];
        let mut arrival = state.traveled[lo - 1];
        let mut load = state.carrying[lo - 1];
        for k in lo..=hi {
            let node = shifted_node(route, pos, new_pos, k);
            arrival = arrival.max(instance.ready(prev)) + instance.travel(prev, node);
            if arrival > instance.due(node) {
                return false;
            }
            load += instance.demand[node];
            if load > instance.capacity {
                return false;
            }
            prev = node;
        }

        for k in hi + 1..route.len() {
            let node = route[k];
            arrival = arrival.max(instance.ready(prev)) + instance.travel(prev, node);
            if arrival <= state.traveled[k] {
                return true;
            }
            if arrival > instance.due(node) {
                return false;
            }
            prev = node;
        }
        true
    }

    /// First profitable and feasible target for the node at `pos`, scanning
    /// backward then forward.
    fn find_target(&self, instance: &PDPTWInstance, route: &[usize], state: &RouteState, pos: usize) -> Option<usize> {
        let node = route[pos];
        let (pickup_pos, delivery_pos) = match (instance.pickup_of(node), instance.partner(node)) {
            (Some(p), _) => (Some(state.position[p]), None),
            (None, Some(d)) => (None, Some(state.position[d])),
            (None, None) => (None, None),
        };

        for new_pos in (1..pos).rev() {
            if !instance.arc(node, route[new_pos]) || pickup_pos.map_or(false, |q| new_pos <= q) {
                break;
            }
            if self.objective.is_profitable_shift(instance, route, state, pos, new_pos)
                && self.is_feasible_shift(instance, route, state, pos, new_pos)
            {
                return Some(new_pos);
            }
        }

        for new_pos in pos + 1..route.len() {
            if !instance.arc(route[new_pos], node) || delivery_pos.map_or(false, |q| new_pos >= q) {
                break;
            }
            if self.objective.is_profitable_shift(instance, route, state, pos, new_pos)
                && self.is_feasible_shift(instance, route, state, pos, new_pos)
            {
                return Some(new_pos);
            }
        }

        None
    }
}

impl LocalSearch for ShiftingSearch {
    fn improve(&self, instance: &PDPTWInstance, solution: &mut Solution, rng: &mut ChaCha8Rng) -> bool {
        let n = solution.len();
        if n < 3 || !solution.is_feasible(instance) {
            return false;
        }

        let mut state = RouteState::compute(instance, &solution.route);
        let mut candidates: Vec<usize> = (1..n).collect();
        let mut size = candidates.len();
        let mut improved = false;

        while size > 0 {
            let idx = rng.gen_range(0..size);
            let pos = candidates[idx];

            match self.find_target(instance, &solution.route, &state, pos) {
                Some(new_pos) => {
                    solution.shift(pos, new_pos);
                    state.repair_after_shift(instance, &solution.route, pos, new_pos);
                    debug_assert_eq!(state, RouteState::compute(instance, &solution.route));
                    improved = true;
                    size = candidates.len();
                }
                None => {
                    candidates.swap(idx, size - 1);
                    size -= 1;
                }
            }
        }

        improved
    }

    fn name(&self) -> &str {
        "Shifting"
    }
}

/// Penalty-driven shift passes used by the construction repair loop.
///
/// Passes run in a fixed order (backward on the infeasible set, forward on
/// the feasible set, forward on the infeasible set, backward on the
/// feasible set) and repeat while any of them lowers the penalty.
pub struct PenaltyShifting {
    pub weights: PenaltyWeights,
}

const PASSES: [(Direction, SetKind); 4] = [
    (Direction::Backward, SetKind::Infeasible),
    (Direction::Forward, SetKind::Feasible),
    (Direction::Forward, SetKind::Infeasible),
    (Direction::Backward, SetKind::Feasible),
];

impl PenaltyShifting {
    pub fn new(weights: PenaltyWeights) -> Self {
        PenaltyShifting { weights }
    }

    /// Lower the penalty of `solution` in place and return the final value.
    pub fn repair(&self, instance: &PDPTWInstance, solution: &mut Solution, rng: &mut ChaCha8Rng) -> i64 {
        let mut penalty = self.weights.penalty(instance, &solution.route);

        while penalty > 0 {
            let mut improved = false;
            for (direction, kind) in PASSES {
                let (p, found) = self.pass(instance, solution, direction, kind, penalty, rng);
                penalty = p;
                improved |= found;
                if penalty == 0 {
                    break;
                }
            }
            if !improved {
                break;
            }
        }

        penalty
    }

    fn pass(
        &self,
        instance: &PDPTWInstance,
        solution: &mut Solution,
        direction: Direction,
        kind: SetKind,
        mut penalty: i64,
        rng: &mut ChaCha8Rng,
    ) -> (i64, bool) {
        let mut set = partition(instance, &solution.route, kind);
        let mut size = set.len();
        let mut improved = false;

        while size > 0 {
            let idx = rng.gen_range(0..size);
            match self.try_shift(instance, solution, set[idx], direction, penalty) {
                Some(p) => {
                    penalty = p;
                    improved = true;
                    if penalty == 0 {
                        break;
                    }
                    set = partition(instance, &solution.route, kind);
                    size = set.len();
                }
                None => {
                    size -= 1;
                    set.swap(idx, size);
                }
            }
        }

        (penalty, improved)
    }

    /// Apply the first shift of the node at `pos` that lowers the penalty.
    fn try_shift(
        &self,
        instance: &PDPTWInstance,
        solution: &mut Solution,
        pos: usize,
        direction: Direction,
        penalty: i64,
    ) -> Option<i64> {
        let node = solution.node_at(pos);
        let targets: Vec<usize> = match direction {
            Direction::Backward => (1..pos).rev().collect(),
            Direction::Forward => (pos + 1..solution.len().saturating_sub(1)).collect(),
        };

        for target in targets {
            let pruned = match direction {
                Direction::Backward => !instance.arc(node, solution.node_at(target)),
                Direction::Forward => !instance.arc(solution.node_at(target), node),
            };
            if pruned {
                break;
            }

            let mv = Move::Shift(pos, target);
            mv.apply(solution);
            let p = self.weights.penalty(instance, &solution.route);
            if p < penalty {
                return Some(p);
            }
            mv.inverse().apply(solution);
        }

        None
    }
}
