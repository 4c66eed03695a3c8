//! Random instance and route generators shared by unit tests.

use crate::instance::{PDPTWInstance, Task};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Random instance with `pairs` pickup/delivery pairs (pickup `2k-1`,
/// delivery `2k`) and a reference route that is feasible by construction:
/// time windows are centred on the reference arrival times (`slack` on both
/// sides) and the capacity equals the peak load of the reference route.
pub(crate) fn random_instance(
    rng: &mut ChaCha8Rng,
    pairs: usize,
    asymmetric: bool,
    slack: i64,
) -> (PDPTWInstance, Vec<usize>) {
    let n = 2 * pairs + 1;
    let coords: Vec<(i64, i64)> = (0..n)
        .map(|_| (rng.gen_range(0..40), rng.gen_range(0..40)))
        .collect();

    let mut matrix = vec![vec![0i64; n]; n];
    for i in 0..n {
        for j in 0..n {
            if i != j {
                let base = (coords[i].0 - coords[j].0).abs() + (coords[i].1 - coords[j].1).abs() + 1;
                matrix[i][j] = if asymmetric { base + rng.gen_range(0..6) } else { base };
            }
        }
    }

    let reference = random_precedence_route(pairs, rng);
    let demands: Vec<i64> = (0..pairs).map(|_| rng.gen_range(1..=4)).collect();

    let mut arrival = vec![0i64; n];
    let mut load = 0i64;
    let mut peak = 0i64;
    for k in 1..n {
        let (prev, node) = (reference[k - 1], reference[k]);
        arrival[node] = arrival[prev] + matrix[prev][node];
        load += if node % 2 == 1 { demands[node / 2] } else { -demands[node / 2 - 1] };
        peak = peak.max(load);
    }

    let mut instance = PDPTWInstance::new("random", peak, 0, matrix);
    for t in 0..pairs {
        let (p, d) = (2 * t + 1, 2 * t + 2);
        let window = |node: usize| ((arrival[node] - slack).max(0), arrival[node] + slack + 1);
        instance
            .add_task(Task::Pair {
                pickup: p,
                delivery: d,
                demand: demands[t],
                pickup_window: window(p),
                delivery_window: window(d),
            })
            .unwrap();
    }
    instance.preprocess();

    (instance, reference)
}

/// Random order of `1..=2*pairs` where every pickup precedes its delivery,
/// prefixed by the start node 0.
fn random_precedence_route(pairs: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let mut route = vec![0];
    let mut available: Vec<usize> = (0..pairs).map(|t| 2 * t + 1).collect();
    while !available.is_empty() {
        let idx = rng.gen_range(0..available.len());
        let node = available.swap_remove(idx);
        route.push(node);
        if node % 2 == 1 {
            available.push(node + 1);
        }
    }
    route
}

/// Uniformly random permutation starting at the start node.
pub(crate) fn random_route(instance: &PDPTWInstance, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let mut rest: Vec<usize> = (0..instance.num_nodes)
        .filter(|&n| n != instance.start_node)
        .collect();
    rest.shuffle(rng);
    let mut route = vec![instance.start_node];
    route.extend(rest);
    route
}

/// Random route that respects precedence but not necessarily time windows
/// or capacity.
pub(crate) fn random_ordered_route(instance: &PDPTWInstance, rng: &mut ChaCha8Rng) -> Vec<usize> {
    random_precedence_route((instance.num_nodes - 1) / 2, rng)
}
