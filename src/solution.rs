//! Solution representation and manipulation for PDPTW.
//!
//! A solution owns its route buffer: a permutation of all nodes that starts
//! at the instance start node. Operators either mutate it in place or work on
//! an explicit `clone()`.

use crate::evaluation;
use crate::instance::PDPTWInstance;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// Represents a solution to the PDPTW
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// Visiting order, starting at the start node
    pub route: Vec<usize>,
    /// Membership flags indexed by node
    nodes: Vec<bool>,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
}

impl Solution {
    /// Create a solution holding only the start node
    pub fn new(instance: &PDPTWInstance) -> Self {
        let mut solution = Solution {
            route: Vec::with_capacity(instance.num_nodes),
            nodes: vec![false; instance.num_nodes],
            algorithm: String::new(),
            computation_time: 0.0,
        };
        solution.push_node(instance.start_node);
        solution
    }

    /// Create a solution from a route
    pub fn from_route(instance: &PDPTWInstance, route: Vec<usize>, algorithm: &str) -> Self {
        let mut nodes = vec![false; instance.num_nodes];
        for &node in &route {
            if node < nodes.len() {
                nodes[node] = true;
            }
        }

        Solution {
            route,
            nodes,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
        }
    }

    pub fn route(&self) -> &[usize] {
        &self.route
    }

    pub fn len(&self) -> usize {
        self.route.len()
    }

    pub fn is_empty(&self) -> bool {
        self.route.is_empty()
    }

    #[inline]
    pub fn node_at(&self, pos: usize) -> usize {
        self.route[pos]
    }

    /// Last node of the route
    pub fn current(&self) -> Option<usize> {
        self.route.last().copied()
    }

    #[inline]
    pub fn has_node(&self, node: usize) -> bool {
        self.nodes.get(node).copied().unwrap_or(false)
    }

    pub fn push_node(&mut self, node: usize) {
        self.route.push(node);
        if node < self.nodes.len() {
            self.nodes[node] = true;
        }
    }

    pub fn pop_node(&mut self) -> Option<usize> {
        let node = self.route.pop()?;
        if node < self.nodes.len() {
            self.nodes[node] = false;
        }
        Some(node)
    }

    /// Whether every constraint of the instance holds
    pub fn is_feasible(&self, instance: &PDPTWInstance) -> bool {
        evaluation::is_feasible(instance, &self.route)
    }

    /// Total elapsed time, ready-time waits included
    pub fn make_span(&self, instance: &PDPTWInstance) -> i64 {
        let mut traveled = instance.start_time;
        for w in self.route.windows(2) {
            traveled = traveled.max(instance.ready(w[0])) + instance.travel(w[0], w[1]);
        }
        traveled
    }

    /// Sum of travel times along the route
    pub fn total_distance(&self, instance: &PDPTWInstance) -> i64 {
        self.route
            .windows(2)
            .map(|w| instance.travel(w[0], w[1]))
            .sum()
    }

    /// Move the node at `pos` to `new_pos`, shifting the nodes in between.
    pub fn shift(&mut self, pos: usize, new_pos: usize) {
        if new_pos > pos {
            self.route[pos..=new_pos].rotate_left(1);
        } else if new_pos < pos {
            self.route[new_pos..=pos].rotate_right(1);
        }
    }

    pub fn swap(&mut self, i: usize, j: usize) {
        self.route.swap(i, j);
    }

    /// 2-opt exchange: replace edges (i, i+1) and (j, j+1) by (i, j) and
    /// (i+1, j+1), i.e. reverse the segment `i+1..=j`.
    pub fn reverse_segment(&mut self, i: usize, j: usize) {
        if i < j {
            self.route[i + 1..=j].reverse();
        }
    }

    /// Reverse `i+1..=j` and keep the result only if it stays feasible.
    pub fn k_exchange(&mut self, instance: &PDPTWInstance, i: usize, j: usize) -> bool {
        if i >= j || j >= self.route.len() {
            return false;
        }

        self.reverse_segment(i, j);
        if self.is_feasible(instance) {
            true
        } else {
            self.reverse_segment(i, j);
            false
        }
    }

    /// Copy of this solution shaken by `level` random feasibility-preserving
    /// segment reversals. The input is never mutated.
    pub fn disturb(&self, instance: &PDPTWInstance, level: usize, rng: &mut ChaCha8Rng) -> Solution {
        let mut x = self.clone();
        let n = x.route.len();
        if n < 3 {
            return x;
        }

        for _ in 0..level {
            let i = rng.gen_range(0..n - 2);
            let j = rng.gen_range(i + 2..n);
            x.k_exchange(instance, i, j);
        }
        x
    }

    /// Full self-validation: start node, length, duplicates and feasibility.
    /// Meant for verification harnesses.
    pub fn check(&self, instance: &PDPTWInstance) -> bool {
        if self.route.first() != Some(&instance.start_node) {
            log::error!("Wrong start node: {:?}", self.route);
            return false;
        }

        if self.route.len() != instance.num_nodes {
            log::error!("Number of nodes differs from route length: {:?}", self.route);
            return false;
        }

        let mut seen = vec![false; instance.num_nodes];
        for &node in &self.route {
            if node >= seen.len() || seen[node] {
                log::error!("Some nodes are duplicated: {:?}", self.route);
                return false;
            }
            seen[node] = true;
        }

        if !self.is_feasible(instance) {
            log::error!("Solution is not feasible: {:?}", self.route);
            return false;
        }

        true
    }

    /// Write the route, space separated, to `dir/name`
    pub fn write_to_file<P: AsRef<Path>>(&self, dir: P, name: &str) -> io::Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let line = self
            .route
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        fs::write(dir.join(name), line)
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let route = self
            .route
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        write!(f, "{}", route)
    }
}

/// Represents a move on a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Swap(usize, usize),
    TwoOpt(usize, usize),
    Shift(usize, usize),
}

impl Move {
    pub fn apply(&self, solution: &mut Solution) {
        match *self {
            Move::Swap(i, j) => solution.swap(i, j),
            Move::TwoOpt(i, j) => solution.reverse_segment(i, j),
            Move::Shift(from, to) => solution.shift(from, to),
        }
    }

    /// The move that undoes this one
    pub fn inverse(&self) -> Move {
        match *self {
            Move::Shift(from, to) => Move::Shift(to, from),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::tests::SMALL;
    use rand::SeedableRng;

    fn small() -> PDPTWInstance {
        PDPTWInstance::parse_str("small", SMALL).unwrap()
    }

    #[test]
    fn test_solution_creation() {
        let instance = small();
        let sol = Solution::new(&instance);
        assert_eq!(sol.route, vec![0]);
        assert!(sol.has_node(0));
        assert!(!sol.has_node(1));
    }

    #[test]
    fn test_push_pop() {
        let instance = small();
        let mut sol = Solution::new(&instance);
        sol.push_node(3);
        assert!(sol.has_node(3));
        assert_eq!(sol.current(), Some(3));
        assert_eq!(sol.pop_node(), Some(3));
        assert!(!sol.has_node(3));
    }

    #[test]
    fn test_make_span_and_distance() {
        let instance = small();
        let sol = Solution::from_route(&instance, vec![0, 1, 2, 3], "test");
        assert_eq!(sol.total_distance(&instance), 3 + 2 + 3);
        assert_eq!(sol.make_span(&instance), 8);
    }

    #[test]
    fn test_make_span_waits_for_ready_time() {
        let mut instance = small();
        instance.ready_time[1] = 10;
        let sol = Solution::from_route(&instance, vec![0, 1, 2, 3], "test");
        // arrive at 1 at 3, wait until 10, then 2 + 3
        assert_eq!(sol.make_span(&instance), 15);
        assert_eq!(sol.total_distance(&instance), 8);
    }

    #[test]
    fn test_shift_forward_and_backward() {
        let instance = small();
        let mut sol = Solution::from_route(&instance, vec![0, 1, 2, 3], "test");
        sol.shift(1, 3);
        assert_eq!(sol.route, vec![0, 2, 3, 1]);
        sol.shift(3, 1);
        assert_eq!(sol.route, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_move_inverse_restores_route() {
        let instance = small();
        let original = vec![0, 3, 1, 2];
        for mv in [Move::Swap(1, 3), Move::TwoOpt(0, 3), Move::Shift(3, 1), Move::Shift(1, 2)] {
            let mut sol = Solution::from_route(&instance, original.clone(), "test");
            mv.apply(&mut sol);
            mv.inverse().apply(&mut sol);
            assert_eq!(sol.route, original, "{:?}", mv);
        }
    }

    #[test]
    fn test_k_exchange_rejects_infeasible() {
        let instance = small();
        let mut sol = Solution::from_route(&instance, vec![0, 1, 2, 3], "test");
        // reversing 1..=2 puts the delivery before its pickup
        assert!(!sol.k_exchange(&instance, 0, 2));
        assert_eq!(sol.route, vec![0, 1, 2, 3]);
        assert!(sol.k_exchange(&instance, 1, 3));
        assert_eq!(sol.route, vec![0, 1, 3, 2]);
    }

    #[test]
    fn test_disturb_keeps_input_and_feasibility() {
        let instance = small();
        let sol = Solution::from_route(&instance, vec![0, 1, 2, 3], "test");
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for level in 1..5 {
            let x = sol.disturb(&instance, level, &mut rng);
            assert_eq!(sol.route, vec![0, 1, 2, 3]);
            assert!(x.is_feasible(&instance));
            assert_eq!(x.route[0], 0);
        }
    }

    #[test]
    fn test_check() {
        let instance = small();
        assert!(Solution::from_route(&instance, vec![0, 1, 2, 3], "t").check(&instance));
        assert!(!Solution::from_route(&instance, vec![1, 0, 2, 3], "t").check(&instance));
        assert!(!Solution::from_route(&instance, vec![0, 1, 2], "t").check(&instance));
        assert!(!Solution::from_route(&instance, vec![0, 1, 1, 3], "t").check(&instance));
        assert!(!Solution::from_route(&instance, vec![0, 2, 1, 3], "t").check(&instance));
    }

    #[test]
    fn test_display_and_write() {
        let instance = small();
        let sol = Solution::from_route(&instance, vec![0, 1, 2, 3], "test");
        assert_eq!(sol.to_string(), "0 -> 1 -> 2 -> 3");

        let dir = std::env::temp_dir().join(format!("pdptw-solution-{}", std::process::id()));
        sol.write_to_file(&dir, "small.txt").unwrap();
        let written = std::fs::read_to_string(dir.join("small.txt")).unwrap();
        assert_eq!(written, "0 1 2 3");
        std::fs::remove_dir_all(&dir).ok();
    }
}
