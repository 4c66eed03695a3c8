//! Feasibility and penalty evaluation.
//!
//! Every scan starts from the instance start state (`start_time`,
//! `start_load`) and uses wait-to-ready semantics: the vehicle leaves node
//! `a` at `max(arrival(a), ready(a))`, so
//! `arrival(b) = max(arrival(a), ready(a)) + travel(a, b)`.
//! A due date of 0 means "no due date".

use crate::instance::PDPTWInstance;
use serde::{Deserialize, Serialize};

/// Which positions [`partition`] returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetKind {
    Feasible,
    Infeasible,
}

/// Whether `route` visits all nodes while respecting capacity, time windows,
/// precedence and the empty-vehicle closing condition.
pub fn is_feasible(instance: &PDPTWInstance, route: &[usize]) -> bool {
    if route.len() != instance.num_nodes || route.is_empty() {
        return false;
    }

    let mut visited = vec![false; instance.num_nodes];
    let mut time = instance.start_time;
    let mut load = instance.start_load + instance.demand[route[0]];
    if load > instance.capacity {
        return false;
    }
    visited[route[0]] = true;

    for w in route.windows(2) {
        let (prev, node) = (w[0], w[1]);
        time = time.max(instance.ready(prev)) + instance.travel(prev, node);
        if time > instance.due(node) {
            return false;
        }

        load += instance.demand[node];
        if load > instance.capacity {
            return false;
        }

        if let Some(pickup) = instance.pickup_of(node) {
            if !visited[pickup] {
                return false;
            }
        }
        visited[node] = true;
    }

    load == 0
}

/// Raw violation magnitudes of a route
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Violations {
    /// Sum of `arrival - due` over late nodes
    pub time_window: i64,
    /// Sum of route distances between a delivery and its later pickup
    pub precedence: i64,
    /// Sum of `load - capacity` over overloaded positions, plus the load left
    /// on board at the end
    pub capacity: i64,
}

impl Violations {
    pub fn is_zero(&self) -> bool {
        self.time_window == 0 && self.precedence == 0 && self.capacity == 0
    }
}

/// Measure every violation of `route` without short-circuiting.
pub fn violations(instance: &PDPTWInstance, route: &[usize]) -> Violations {
    let mut v = Violations::default();
    if route.is_empty() {
        return v;
    }

    let positions = positions(instance, route);
    let mut time = instance.start_time;
    let mut load = instance.start_load + instance.demand[route[0]];
    v.capacity += (load - instance.capacity).max(0);

    for i in 1..route.len() {
        let (prev, node) = (route[i - 1], route[i]);
        time = time.max(instance.ready(prev)) + instance.travel(prev, node);
        v.time_window += (time - instance.due(node)).max(0);

        load += instance.demand[node];
        v.capacity += (load - instance.capacity).max(0);

        if let Some(pickup) = instance.pickup_of(node) {
            let p = positions[pickup];
            if p != usize::MAX && p > i {
                v.precedence += (p - i) as i64;
            }
        }
    }

    v.capacity += load.abs();
    v
}

/// Integer weights combining [`Violations`] into one scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PenaltyWeights {
    pub time_windows: i64,
    pub pickup_delivery: i64,
    pub capacity: i64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        PenaltyWeights {
            time_windows: 1,
            pickup_delivery: 1,
            capacity: 1,
        }
    }
}

impl PenaltyWeights {
    pub fn combine(&self, v: &Violations) -> i64 {
        self.time_windows * v.time_window + self.pickup_delivery * v.precedence + self.capacity * v.capacity
    }

    /// Weighted penalty of a route; 0 exactly when the route is feasible
    /// (for positive weights and a complete route).
    pub fn penalty(&self, instance: &PDPTWInstance, route: &[usize]) -> i64 {
        self.combine(&violations(instance, route))
    }
}

/// Positions `1..n` whose node is (or is not) locally feasible: reached
/// before its due date, within capacity, and after its pickup.
pub fn partition(instance: &PDPTWInstance, route: &[usize], kind: SetKind) -> Vec<usize> {
    let mut set = Vec::new();
    if route.is_empty() {
        return set;
    }

    let mut visited = vec![false; instance.num_nodes];
    visited[route[0]] = true;
    let mut time = instance.start_time;
    let mut load = instance.start_load + instance.demand[route[0]];

    for i in 1..route.len() {
        let (prev, node) = (route[i - 1], route[i]);
        time = time.max(instance.ready(prev)) + instance.travel(prev, node);
        load += instance.demand[node];

        let precedence_ok = instance.pickup_of(node).map_or(true, |p| visited[p]);
        let feasible = precedence_ok && time <= instance.due(node) && load <= instance.capacity;
        visited[node] = true;

        match kind {
            SetKind::Feasible if feasible => set.push(i),
            SetKind::Infeasible if !feasible => set.push(i),
            _ => {}
        }
    }

    set
}

/// Node -> route position, `usize::MAX` for nodes not on the route
pub fn positions(instance: &PDPTWInstance, route: &[usize]) -> Vec<usize> {
    let mut positions = vec![usize::MAX; instance.num_nodes];
    for (i, &node) in route.iter().enumerate() {
        positions[node] = i;
    }
    positions
}
