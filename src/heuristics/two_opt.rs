//! Constrained 2-opt for open PDPTW routes.
//!
//! A move `(i, j)` replaces the edges `(i, i+1)` and `(j, j+1)` by `(i, j)`
//! and `(i+1, j+1)`, reversing `route[i+1..=j]`. The last position has no
//! successor, so `j` may be the final index. Candidates for `i` are drawn at
//! random from a shrinking set and the set is refilled after every applied
//! move.

use crate::heuristics::local_search::LocalSearch;
use crate::heuristics::objective::Objective;
use crate::heuristics::route_state::RouteState;
use crate::instance::PDPTWInstance;
use crate::solution::Solution;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// 2-opt local search that only applies moves keeping the route feasible.
pub struct TwoOptSearch {
    pub objective: Objective,
}

impl TwoOptSearch {
    pub fn new(objective: Objective) -> Self {
        TwoOptSearch { objective }
    }

    /// Whether reversing `route[i+1..=j]` keeps a feasible route feasible.
    ///
    /// Past the reversed segment the check stops as soon as the new arrival
    /// is no later than the cached one, which is only sound when `state`
    /// describes a feasible route.
    pub fn is_feasible_move(
        &self,
        instance: &PDPTWInstance,
        route: &[usize],
        state: &RouteState,
        i: usize,
        j: usize,
    ) -> bool {
        // a pair entirely inside the segment would end up delivered first
        for k in i + 1..=j {
            if let Some(q) = state.pair_index[k] {
                if q > i && q <= j {
                    return false;
                }
            }
        }

        let mut load = state.carrying[i];
        let mut prev = route[i];
        let mut arrival = state.traveled[i];
        for k in (i + 1..=j).rev() {
            let node = route[k];
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

        for k in j + 1..route.len() {
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
}

impl LocalSearch for TwoOptSearch {
    fn improve(&self, instance: &PDPTWInstance, solution: &mut Solution, rng: &mut ChaCha8Rng) -> bool {
        let n = solution.len();
        if n < 3 || !solution.is_feasible(instance) {
            return false;
        }

        let mut state = RouteState::compute(instance, &solution.route);
        let mut candidates: Vec<usize> = (0..n - 2).collect();
        let mut size = candidates.len();
        let mut improved = false;

        while size > 0 {
            let idx = rng.gen_range(0..size);
            let i = candidates[idx];

            let applied = (i + 2..n).find(|&j| {
                self.objective.is_profitable_two_opt(instance, &solution.route, &state, i, j)
                    && self.is_feasible_move(instance, &solution.route, &state, i, j)
            });

            match applied {
                Some(j) => {
                    solution.reverse_segment(i, j);
                    state.repair_after_reversal(instance, &solution.route, i, j);
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
        "2-Opt"
    }
}
