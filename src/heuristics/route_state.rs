//! Cumulative route state cached by the local-search operators.
//!
//! The arrays belong to the operator run that computed them and are only
//! valid for the route they were computed from. Every operator that mutates
//! the route repairs them through [`RouteState::repair_after_reversal`] or
//! [`RouteState::repair_after_shift`] before the next candidate is evaluated.

use crate::instance::PDPTWInstance;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteState {
    /// Arrival time at each route position (before waiting)
    pub traveled: Vec<i64>,
    /// Load on board after servicing each route position
    pub carrying: Vec<i64>,
    /// Route position of the partner of the node at each position
    pub pair_index: Vec<Option<usize>>,
    /// Route position of each node
    pub position: Vec<usize>,
}

impl RouteState {
    pub fn compute(instance: &PDPTWInstance, route: &[usize]) -> Self {
        let n = route.len();
        let mut state = RouteState {
            traveled: vec![instance.start_time; n],
            carrying: vec![0; n],
            pair_index: vec![None; n],
            position: vec![usize::MAX; instance.num_nodes],
        };
        if n == 0 {
            return state;
        }

        state.carrying[0] = instance.start_load + instance.demand[route[0]];
        for k in 1..n {
            state.traveled[k] = state.departure(instance, route, k - 1) + instance.travel(route[k - 1], route[k]);
            state.carrying[k] = state.carrying[k - 1] + instance.demand[route[k]];
        }
        state.refresh_pairs(instance, route, 0, n - 1);
        state
    }

    /// Time the vehicle leaves position `k`
    #[inline]
    pub fn departure(&self, instance: &PDPTWInstance, route: &[usize], k: usize) -> i64 {
        self.traveled[k].max(instance.ready(route[k]))
    }

    /// Arrival at the last position
    pub fn span(&self) -> i64 {
        self.traveled.last().copied().unwrap_or(0)
    }

    /// Update the state after `route[i+1..=j]` was reversed.
    pub fn repair_after_reversal(&mut self, instance: &PDPTWInstance, route: &[usize], i: usize, j: usize) {
        self.refresh_pairs(instance, route, i + 1, j);
        self.propagate(instance, route, i + 1, j);
    }

    /// Update the state after the node at `pos` was moved to `new_pos`.
    pub fn repair_after_shift(&mut self, instance: &PDPTWInstance, route: &[usize], pos: usize, new_pos: usize) {
        let (lo, hi) = if pos < new_pos { (pos, new_pos) } else { (new_pos, pos) };
        self.refresh_pairs(instance, route, lo, hi);
        self.propagate(instance, route, lo.max(1), hi);
    }

    /// Recompute node positions for `lo..=hi` and every pair cross-reference
    /// touching that window.
    fn refresh_pairs(&mut self, instance: &PDPTWInstance, route: &[usize], lo: usize, hi: usize) {
        for k in lo..=hi {
            self.position[route[k]] = k;
        }
        for k in lo..=hi {
            let partner = instance.partner(route[k]).map(|p| self.position[p]);
            self.pair_index[k] = partner;
            if let Some(q) = partner {
                self.pair_index[q] = Some(k);
            }
        }
    }

    /// Recompute arrival times and loads from position `from` onwards.
    ///
    /// Past `changed_until` the route is unchanged, so once both values of a
    /// position equal the cached ones every later position is equal too and
    /// the pass stops.
    fn propagate(&mut self, instance: &PDPTWInstance, route: &[usize], from: usize, changed_until: usize) {
        for k in from.max(1)..route.len() {
            let arrival = self.departure(instance, route, k - 1) + instance.travel(route[k - 1], route[k]);
            let load = self.carrying[k - 1] + instance.demand[route[k]];
            if k > changed_until && arrival == self.traveled[k] && load == self.carrying[k] {
                break;
            }
            self.traveled[k] = arrival;
            self.carrying[k] = load;
        }
    }
}

/// Node found at position `k` once the node at `pos` has been moved to
/// `new_pos`. Only meaningful for `k` between the two positions.
#[inline]
pub fn shifted_node(route: &[usize], pos: usize, new_pos: usize, k: usize) -> usize {
    if k == new_pos {
        route[pos]
    } else if new_pos > pos {
        route[k + 1]
    } else {
        route[k - 1]
    }
}
