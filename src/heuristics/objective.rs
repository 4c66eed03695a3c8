//! Cost measures minimised by the local searches and metaheuristics.

use crate::heuristics::route_state::{shifted_node, RouteState};
use crate::instance::PDPTWInstance;
use crate::solution::Solution;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Arrival at the last node, ready-time waits included
    Span,
    /// Sum of travel times, symmetric matrix
    TotalTime,
    /// Sum of travel times, directional edge costs
    TotalTimeAsymmetric,
}

impl Objective {
    /// `"time"` selects a travel-time objective, anything else the span.
    pub fn from_config(name: &str, asymmetric: bool) -> Self {
        match (name, asymmetric) {
            ("time", true) => Objective::TotalTimeAsymmetric,
            ("time", false) => Objective::TotalTime,
            ("span", _) => Objective::Span,
            (other, _) => {
                log::warn!("Unknown objective '{}', using span", other);
                Objective::Span
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Objective::Span => "span",
            Objective::TotalTime => "time",
            Objective::TotalTimeAsymmetric => "time-asymmetric",
        }
    }

    pub fn cost(&self, instance: &PDPTWInstance, solution: &Solution) -> i64 {
        match self {
            Objective::Span => solution.make_span(instance),
            Objective::TotalTime | Objective::TotalTimeAsymmetric => solution.total_distance(instance),
        }
    }

    /// Whether reversing `route[i+1..=j]` lowers the cost.
    pub fn is_profitable_two_opt(
        &self,
        instance: &PDPTWInstance,
        route: &[usize],
        state: &RouteState,
        i: usize,
        j: usize,
    ) -> bool {
        let (a, b, c) = (route[i], route[i + 1], route[j]);
        let d = route.get(j + 1).copied();

        match self {
            Objective::Span => {
                let mut arrival = state.departure(instance, route, i) + instance.travel(a, c);
                for k in (i + 2..=j).rev() {
                    arrival = arrival.max(instance.ready(route[k])) + instance.travel(route[k], route[k - 1]);
                }
                beats_tail(instance, route, state, b, arrival, j + 1)
            }
            Objective::TotalTime => {
                let mut removed = instance.travel(a, b);
                let mut added = instance.travel(a, c);
                if let Some(d) = d {
                    removed += instance.travel(c, d);
                    added += instance.travel(b, d);
                }
                removed > added
            }
            Objective::TotalTimeAsymmetric => {
                let mut removed = instance.travel(a, b);
                let mut added = instance.travel(a, c);
                if let Some(d) = d {
                    removed += instance.travel(c, d);
                    added += instance.travel(b, d);
                }
                for k in i + 1..j {
                    removed += instance.travel(route[k], route[k + 1]);
                    added += instance.travel(route[k + 1], route[k]);
                }
                removed > added
            }
        }
    }

    /// Whether moving the node at `pos` to `new_pos` lowers the cost.
    pub fn is_profitable_shift(
        &self,
        instance: &PDPTWInstance,
        route: &[usize],
        state: &RouteState,
        pos: usize,
        new_pos: usize,
    ) -> bool {
        if pos == new_pos {
            return false;
        }

        match self {
            Objective::Span => {
                let (lo, hi) = if pos < new_pos { (pos, new_pos) } else { (new_pos, pos) };
                let mut prev = route[lo - 1];
                let mut arrival = state.traveled[lo - 1];
                for k in lo..=hi {
                    let node = shifted_node(route, pos, new_pos, k);
                    arrival = arrival.max(instance.ready(prev)) + instance.travel(prev, node);
                    prev = node;
                }
                beats_tail(instance, route, state, prev, arrival, hi + 1)
            }
            Objective::TotalTime | Objective::TotalTimeAsymmetric => shift_delta(instance, route, pos, new_pos) < 0,
        }
    }
}

/// Propagate a modified arrival through the unchanged tail starting at
/// `from`, where `prev` is the node now placed at `from - 1`. Arrivals are
/// monotone in their predecessor, so the span can only drop if every tail
/// arrival stays strictly below the cached one.
fn beats_tail(
    instance: &PDPTWInstance,
    route: &[usize],
    state: &RouteState,
    mut prev: usize,
    mut arrival: i64,
    from: usize,
) -> bool {
    for k in from..route.len() {
        arrival = arrival.max(instance.ready(prev)) + instance.travel(prev, route[k]);
        if arrival >= state.traveled[k] {
            return false;
        }
        prev = route[k];
    }
    arrival < state.span()
}

/// Change in total travel time caused by moving the node at `pos` to
/// `new_pos`. Uses directional edges, so it holds for asymmetric matrices.
fn shift_delta(instance: &PDPTWInstance, route: &[usize], pos: usize, new_pos: usize) -> i64 {
    let node = route[pos];
    let t = |x: usize, y: usize| instance.travel(x, y);

    let prev = route[pos - 1];
    let mut delta = -t(prev, node);
    if let Some(&next) = route.get(pos + 1) {
        delta += t(prev, next) - t(node, next);
    }

    let (x, y) = if new_pos > pos {
        (route[new_pos], route.get(new_pos + 1).copied())
    } else {
        (route[new_pos - 1], Some(route[new_pos]))
    };
    delta += t(x, node);
    if let Some(y) = y {
        delta += t(node, y) - t(x, y);
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::tests::SMALL;
    use crate::test_utils::{random_instance, random_route};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_from_config() {
        assert_eq!(Objective::from_config("time", false), Objective::TotalTime);
        assert_eq!(Objective::from_config("time", true), Objective::TotalTimeAsymmetric);
        assert_eq!(Objective::from_config("span", true), Objective::Span);
        assert_eq!(Objective::from_config("distance", false), Objective::Span);
    }

    #[test]
    fn test_cost() {
        let mut instance = PDPTWInstance::parse_str("small", SMALL).unwrap();
        instance.ready_time[1] = 10;
        let sol = Solution::from_route(&instance, vec![0, 1, 2, 3], "test");
        assert_eq!(Objective::Span.cost(&instance, &sol), 15);
        assert_eq!(Objective::TotalTime.cost(&instance, &sol), 8);
    }

    #[test]
    fn test_span_does_not_decrease_with_longer_travel() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for round in 0..30 {
            let (mut instance, reference) = random_instance(&mut rng, 2 + round % 5, false, 5);
            let sol = Solution::from_route(&instance, reference.clone(), "test");
            let before = Objective::Span.cost(&instance, &sol);

            let k = rng.gen_range(1..reference.len());
            instance.travel_time[reference[k - 1]][reference[k]] += rng.gen_range(1..20);
            let after = Objective::Span.cost(&instance, &sol);
            assert!(after >= before);
        }
    }

    /// Every profitability test must agree with the cost of the move
    /// actually applied.
    fn assert_profitability_matches(objective: Objective, asymmetric: bool, seed: u64) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        for round in 0..30 {
            let (instance, _) = random_instance(&mut rng, 2 + round % 6, asymmetric, 5);
            let sol = Solution::from_route(&instance, random_route(&instance, &mut rng), "test");
            let state = RouteState::compute(&instance, &sol.route);
            let cost = objective.cost(&instance, &sol);
            let n = sol.len();

            for i in 0..n - 2 {
                for j in i + 2..n {
                    let mut moved = sol.clone();
                    moved.reverse_segment(i, j);
                    let expected = objective.cost(&instance, &moved) < cost;
                    assert_eq!(
                        objective.is_profitable_two_opt(&instance, &sol.route, &state, i, j),
                        expected,
                        "2-opt {} {} on {:?}",
                        i,
                        j,
                        sol.route
                    );
                }
            }

            for pos in 1..n {
                for new_pos in 1..n {
                    let mut moved = sol.clone();
                    moved.shift(pos, new_pos);
                    let expected = objective.cost(&instance, &moved) < cost;
                    assert_eq!(
                        objective.is_profitable_shift(&instance, &sol.route, &state, pos, new_pos),
                        expected,
                        "shift {} {} on {:?}",
                        pos,
                        new_pos,
                        sol.route
                    );
                }
            }
        }
    }

    #[test]
    fn test_span_profitability() {
        assert_profitability_matches(Objective::Span, false, 41);
        assert_profitability_matches(Objective::Span, true, 42);
    }

    #[test]
    fn test_total_time_profitability() {
        assert_profitability_matches(Objective::TotalTime, false, 43);
    }

    #[test]
    fn test_asymmetric_profitability() {
        assert_profitability_matches(Objective::TotalTimeAsymmetric, true, 44);
    }

    #[test]
    fn test_symmetric_delta_misjudges_asymmetric_reversal() {
        // 0 -> 1 -> 2 -> 3 -> 4, reversing 2..=3 only changes the interior
        // edge direction: 2 -> 3 costs 10, 3 -> 2 costs 1.
        let mut matrix = vec![vec![5i64; 5]; 5];
        for (i, row) in matrix.iter_mut().enumerate() {
            row[i] = 0;
        }
        matrix[2][3] = 10;
        matrix[3][2] = 1;
        let instance = PDPTWInstance::new("asym", 10, 0, matrix);
        let sol = Solution::from_route(&instance, vec![0, 1, 2, 3, 4], "test");
        let state = RouteState::compute(&instance, &sol.route);

        assert!(!Objective::TotalTime.is_profitable_two_opt(&instance, &sol.route, &state, 1, 3));
        assert!(Objective::TotalTimeAsymmetric.is_profitable_two_opt(&instance, &sol.route, &state, 1, 3));
    }
}
