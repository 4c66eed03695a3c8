//! Module for parsing and representing PDPTW instances.
//!
//! An instance describes a single vehicle of fixed capacity that leaves a
//! start node and must visit every other node exactly once. Nodes come in
//! pickup/delivery pairs (the pickup must be visited first) and every node
//! carries a time window `[ready_time, due_date]`.
//!
//! The text format is line based, `#` starts a comment line:
//!
//! ```text
//! # nodes capacity start [start_time start_load]
//! 4 10 0
//! 0 3 5 4
//! 3 0 2 6
//! 5 2 0 3
//! 4 6 3 0
//! # pickup delivery demand p_ready p_due d_ready d_due
//! 1 2 5 0 50 0 100
//! # node demand ready due
//! 3 0 0 100
//! ```

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A task line of an instance file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    /// A pickup/delivery pair; the delivery receives the negated demand.
    Pair {
        pickup: usize,
        delivery: usize,
        demand: i64,
        pickup_window: (i64, i64),
        delivery_window: (i64, i64),
    },
    /// A stop without a partner node.
    Single {
        node: usize,
        demand: i64,
        ready: i64,
        due: i64,
    },
}

/// Represents a complete PDPTW instance
///
/// The instance is read-only once [`PDPTWInstance::preprocess`] has been
/// called, and is shared by reference between concurrent searches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PDPTWInstance {
    /// Name of the instance (usually the file name)
    pub name: String,
    /// Number of nodes, start node included
    pub num_nodes: usize,
    /// Vehicle capacity
    pub capacity: i64,
    /// Node the route starts from
    pub start_node: usize,
    /// Time at which the vehicle leaves the start node
    pub start_time: i64,
    /// Load on board when the vehicle leaves the start node
    pub start_load: i64,
    /// Square travel-time matrix
    pub travel_time: Vec<Vec<i64>>,
    /// Earliest service time per node
    pub ready_time: Vec<i64>,
    /// Latest arrival time per node, 0 meaning unbounded
    pub due_date: Vec<i64>,
    /// Signed demand: positive at a pickup, negative at its delivery
    pub demand: Vec<i64>,
    /// Maps a delivery node to its pickup node
    pub precedence: Vec<Option<usize>>,
    /// Maps every paired node to its partner
    partner: Vec<Option<usize>>,
    /// Whether a task line already described the node
    tasked: Vec<bool>,
    /// `arcs[i][j]` is false when `i -> j` can never meet the due date of `j`
    #[serde(skip)]
    arcs: Vec<Vec<bool>>,
}

impl PDPTWInstance {
    /// Create an instance without tasks: every node has an open time window
    /// and zero demand.
    pub fn new(name: &str, capacity: i64, start_node: usize, travel_time: Vec<Vec<i64>>) -> Self {
        let n = travel_time.len();
        PDPTWInstance {
            name: name.to_string(),
            num_nodes: n,
            capacity,
            start_node,
            start_time: 0,
            start_load: 0,
            travel_time,
            ready_time: vec![0; n],
            due_date: vec![0; n],
            demand: vec![0; n],
            precedence: vec![None; n],
            partner: vec![None; n],
            tasked: vec![false; n],
            arcs: Vec::new(),
        }
    }

    /// Set the time and load the vehicle starts with.
    pub fn with_start_state(mut self, start_time: i64, start_load: i64) -> Self {
        self.start_time = start_time;
        self.start_load = start_load;
        self
    }

    /// Register a task. Invalidates the arc table.
    pub fn add_task(&mut self, task: Task) -> Result<(), ParseError> {
        self.add_task_at(task, 0)
    }

    fn add_task_at(&mut self, task: Task, line: usize) -> Result<(), ParseError> {
        let check = |node: usize, window: (i64, i64)| -> Result<(), ParseError> {
            if node >= self.num_nodes {
                return Err(ParseError::NodeOutOfRange {
                    line,
                    node: node as i64,
                    num_nodes: self.num_nodes,
                });
            }
            if self.tasked[node] {
                return Err(ParseError::DuplicateTask { line, node });
            }
            if window.0 < 0 || window.1 < 0 {
                return Err(ParseError::NegativeTimeWindow {
                    line,
                    node,
                    ready: window.0,
                    due: window.1,
                });
            }
            Ok(())
        };

        match task {
            Task::Pair {
                pickup,
                delivery,
                demand,
                pickup_window,
                delivery_window,
            } => {
                if pickup == delivery {
                    return Err(ParseError::SelfPair { line, node: pickup });
                }
                check(pickup, pickup_window)?;
                check(delivery, delivery_window)?;
                self.tasked[pickup] = true;
                self.tasked[delivery] = true;
                self.precedence[delivery] = Some(pickup);
                self.partner[delivery] = Some(pickup);
                self.partner[pickup] = Some(delivery);
                self.demand[pickup] = demand;
                self.demand[delivery] = -demand;
                self.ready_time[pickup] = pickup_window.0;
                self.due_date[pickup] = pickup_window.1;
                self.ready_time[delivery] = delivery_window.0;
                self.due_date[delivery] = delivery_window.1;
            }
            Task::Single {
                node,
                demand,
                ready,
                due,
            } => {
                check(node, (ready, due))?;
                self.tasked[node] = true;
                self.demand[node] = demand;
                self.ready_time[node] = ready;
                self.due_date[node] = due;
            }
        }

        self.arcs.clear();
        Ok(())
    }

    /// Builder-style variant of [`add_task`](Self::add_task).
    pub fn with_task(mut self, task: Task) -> Result<Self, ParseError> {
        self.add_task(task)?;
        Ok(self)
    }

    /// Parse a PDPTW instance from a file; the file name becomes the instance name.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "instance".to_string());
        Self::parse_str(&name, &content)
    }

    /// Parse a PDPTW instance from its text representation.
    pub fn parse_str(name: &str, content: &str) -> Result<Self, ParseError> {
        let mut instance: Option<PDPTWInstance> = None;
        let mut header: Vec<i64> = Vec::new();
        let mut rows: Vec<Vec<i64>> = Vec::new();
        let mut expected_rows = 0usize;

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let values = line
                .split_whitespace()
                .map(|token| {
                    token.parse::<i64>().map_err(|_| ParseError::InvalidInteger {
                        line: line_no,
                        token: token.to_string(),
                    })
                })
                .collect::<Result<Vec<i64>, _>>()?;

            if header.is_empty() {
                if values.len() < 3 || values[0] <= 0 || values[2] < 0 {
                    return Err(ParseError::InvalidHeader);
                }
                expected_rows = values[0] as usize;
                header = values;
                continue;
            }

            match instance.as_mut() {
                None => {
                    if values.len() != expected_rows {
                        return Err(ParseError::MatrixRow {
                            line: line_no,
                            found: values.len(),
                            expected: expected_rows,
                        });
                    }
                    rows.push(values);
                    if rows.len() == expected_rows {
                        instance = Some(Self::from_header(name, &header, std::mem::take(&mut rows))?);
                    }
                }
                Some(inst) => {
                    let task = Self::task_from_values(&values, line_no, inst.num_nodes)?;
                    inst.add_task_at(task, line_no)?;
                }
            }
        }

        if header.is_empty() {
            return Err(ParseError::Empty);
        }

        let instance = instance.ok_or(ParseError::MissingRows {
            expected: expected_rows,
            found: rows.len(),
        })?;
        instance.validate()?;
        Ok(instance)
    }

    fn from_header(name: &str, header: &[i64], matrix: Vec<Vec<i64>>) -> Result<Self, ParseError> {
        let start_node = header[2] as usize;
        if start_node >= matrix.len() {
            return Err(ParseError::NodeOutOfRange {
                line: 0,
                node: header[2],
                num_nodes: matrix.len(),
            });
        }

        let mut instance = PDPTWInstance::new(name, header[1], start_node, matrix);
        if header.len() >= 5 {
            instance.start_time = header[3];
            instance.start_load = header[4];
        }
        Ok(instance)
    }

    fn task_from_values(values: &[i64], line: usize, num_nodes: usize) -> Result<Task, ParseError> {
        let node = |v: i64| -> Result<usize, ParseError> {
            if v < 0 || v as usize >= num_nodes {
                return Err(ParseError::NodeOutOfRange { line, node: v, num_nodes });
            }
            Ok(v as usize)
        };

        match values.len() {
            7 => Ok(Task::Pair {
                pickup: node(values[0])?,
                delivery: node(values[1])?,
                demand: values[2],
                pickup_window: (values[3], values[4]),
                delivery_window: (values[5], values[6]),
            }),
            4 => Ok(Task::Single {
                node: node(values[0])?,
                demand: values[1],
                ready: values[2],
                due: values[3],
            }),
            found => Err(ParseError::TaskFormat { line, found }),
        }
    }

    /// Check the pair invariant `demand[pickup] == -demand[delivery]`.
    pub fn validate(&self) -> Result<(), ParseError> {
        for (delivery, pickup) in self.precedence.iter().enumerate() {
            if let Some(pickup) = *pickup {
                if self.demand[pickup] != -self.demand[delivery] {
                    return Err(ParseError::UnbalancedPair { pickup, delivery });
                }
            }
        }
        Ok(())
    }

    /// Build the arc pruning table. Idempotent.
    pub fn preprocess(&mut self) {
        let n = self.num_nodes;
        let mut arcs = vec![vec![true; n]; n];

        for (i, row) in arcs.iter_mut().enumerate() {
            for (j, arc) in row.iter_mut().enumerate() {
                if i != j {
                    *arc = self.ready_time[i] + self.travel_time[i][j] <= self.due(j);
                }
            }
        }

        self.arcs = arcs;
    }

    pub fn is_preprocessed(&self) -> bool {
        self.arcs.len() == self.num_nodes
    }

    /// Whether `i` may be visited directly before `j`. Always true before
    /// [`preprocess`](Self::preprocess).
    #[inline]
    pub fn arc(&self, i: usize, j: usize) -> bool {
        self.arcs.get(i).map_or(true, |row| row[j])
    }

    #[inline]
    pub fn travel(&self, i: usize, j: usize) -> i64 {
        self.travel_time[i][j]
    }

    /// Effective due date: a stored 0 means no deadline.
    #[inline]
    pub fn due(&self, node: usize) -> i64 {
        match self.due_date[node] {
            0 => i64::MAX,
            due => due,
        }
    }

    #[inline]
    pub fn ready(&self, node: usize) -> i64 {
        self.ready_time[node]
    }

    /// Pickup node that must precede `node`, if `node` is a delivery.
    #[inline]
    pub fn pickup_of(&self, node: usize) -> Option<usize> {
        self.precedence[node]
    }

    /// Other node of the pair `node` belongs to.
    #[inline]
    pub fn partner(&self, node: usize) -> Option<usize> {
        self.partner[node]
    }

    pub fn num_tasks(&self) -> usize {
        self.precedence.iter().filter(|p| p.is_some()).count()
    }

    pub fn pickup_nodes(&self) -> Vec<usize> {
        self.precedence.iter().flatten().copied().collect()
    }

    pub fn delivery_nodes(&self) -> Vec<usize> {
        (0..self.num_nodes)
            .filter(|&n| self.precedence[n].is_some())
            .collect()
    }

    /// Whether `travel(i, j) == travel(j, i)` for every pair of nodes
    pub fn is_symmetric(&self) -> bool {
        (0..self.num_nodes).all(|i| (0..i).all(|j| self.travel(i, j) == self.travel(j, i)))
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let n = self.num_nodes;
        let mut travel: Vec<i64> = Vec::with_capacity(n * n.saturating_sub(1));
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    travel.push(self.travel(i, j));
                }
            }
        }
        let avg_travel = if travel.is_empty() {
            0.0
        } else {
            travel.iter().sum::<i64>() as f64 / travel.len() as f64
        };
        let max_travel = travel.iter().copied().max().unwrap_or(0);

        let windows: Vec<i64> = (0..n)
            .filter(|&i| i != self.start_node && self.due_date[i] != 0)
            .map(|i| self.due_date[i] - self.ready_time[i])
            .collect();
        let avg_window = if windows.is_empty() {
            0.0
        } else {
            windows.iter().sum::<i64>() as f64 / windows.len() as f64
        };

        let pruned_arcs = if self.is_preprocessed() {
            (0..n)
                .flat_map(|i| (0..n).map(move |j| (i, j)))
                .filter(|&(i, j)| i != j && !self.arc(i, j))
                .count()
        } else {
            0
        };

        let asymmetric = !self.is_symmetric();

        InstanceStatistics {
            name: self.name.clone(),
            num_nodes: n,
            capacity: self.capacity,
            num_tasks: self.num_tasks(),
            max_demand: self.demand.iter().copied().max().unwrap_or(0),
            avg_travel,
            max_travel,
            avg_window,
            pruned_arcs,
            asymmetric,
        }
    }
}

/// Statistics about a PDPTW instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub num_nodes: usize,
    pub capacity: i64,
    pub num_tasks: usize,
    pub max_demand: i64,
    pub avg_travel: f64,
    pub max_travel: i64,
    pub avg_window: f64,
    pub pruned_arcs: usize,
    pub asymmetric: bool,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Nodes: {} ({} pickup/delivery pairs)", self.num_nodes, self.num_tasks)?;
        writeln!(f, "  Capacity: {}", self.capacity)?;
        writeln!(f, "  Max demand: {}", self.max_demand)?;
        writeln!(f, "  Avg travel time: {:.2}", self.avg_travel)?;
        writeln!(f, "  Max travel time: {}", self.max_travel)?;
        writeln!(f, "  Avg time window: {:.2}", self.avg_window)?;
        writeln!(f, "  Pruned arcs: {}", self.pruned_arcs)?;
        writeln!(f, "  Asymmetric: {}", self.asymmetric)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SMALL: &str = "\
# nodes capacity start
4 10 0
0 3 5 4
3 0 2 6
5 2 0 3
4 6 3 0
# pickup delivery demand p_ready p_due d_ready d_due
1 2 5 0 50 0 100
3 0 0 100
";

    #[test]
    fn test_parse_small_instance() {
        let instance = PDPTWInstance::parse_str("small", SMALL).unwrap();

        assert_eq!(instance.num_nodes, 4);
        assert_eq!(instance.capacity, 10);
        assert_eq!(instance.start_node, 0);
        assert_eq!(instance.travel(0, 2), 5);
        assert_eq!(instance.demand[1], 5);
        assert_eq!(instance.demand[2], -5);
        assert_eq!(instance.pickup_of(2), Some(1));
        assert_eq!(instance.partner(1), Some(2));
        assert_eq!(instance.pickup_of(1), None);
        assert_eq!(instance.due_date[3], 100);
        assert_eq!(instance.num_tasks(), 1);
    }

    #[test]
    fn test_parse_start_state() {
        let text = "2 5 0 7 1\n0 1\n1 0\n1 -1 0 0\n";
        let instance = PDPTWInstance::parse_str("state", text).unwrap();
        assert_eq!(instance.start_time, 7);
        assert_eq!(instance.start_load, 1);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            PDPTWInstance::parse_str("bad", "2 5\n"),
            Err(ParseError::InvalidHeader)
        ));
        assert!(matches!(
            PDPTWInstance::parse_str("bad", "2 5 0\n0 1 2\n1 0\n"),
            Err(ParseError::MatrixRow { .. })
        ));
        assert!(matches!(
            PDPTWInstance::parse_str("bad", "2 5 0\n0 x\n"),
            Err(ParseError::InvalidInteger { .. })
        ));
        assert!(matches!(
            PDPTWInstance::parse_str("bad", "2 5 0\n0 1\n1 0\n0 1 2\n"),
            Err(ParseError::TaskFormat { found: 3, .. })
        ));
        assert!(matches!(
            PDPTWInstance::parse_str("bad", "2 5 0\n0 1\n1 0\n0 9 1 0 0 0 0\n"),
            Err(ParseError::NodeOutOfRange { node: 9, .. })
        ));
        assert!(matches!(
            PDPTWInstance::parse_str("bad", "3 5 0\n0 1 1\n1 0 1\n"),
            Err(ParseError::MissingRows { .. })
        ));
        assert!(matches!(PDPTWInstance::parse_str("bad", "# nothing\n"), Err(ParseError::Empty)));
    }

    #[test]
    fn test_zero_due_date_is_unbounded() {
        let instance = PDPTWInstance::parse_str("small", SMALL).unwrap();
        assert_eq!(instance.due(0), i64::MAX);
        assert_eq!(instance.due(1), 50);
    }

    #[test]
    fn test_preprocess_prunes_arcs() {
        let matrix = vec![vec![0, 10, 1], vec![10, 0, 1], vec![1, 1, 0]];
        let mut instance = PDPTWInstance::new("arcs", 10, 0, matrix)
            .with_task(Task::Single { node: 1, demand: 0, ready: 0, due: 5 })
            .unwrap()
            .with_task(Task::Single { node: 2, demand: 0, ready: 20, due: 30 })
            .unwrap();

        assert!(instance.arc(0, 1));
        instance.preprocess();
        assert!(instance.is_preprocessed());

        // 0 + 10 > 5
        assert!(!instance.arc(0, 1));
        // 20 + 1 > 5
        assert!(!instance.arc(2, 1));
        assert!(instance.arc(1, 2));
        // node 0 has no due date
        assert!(instance.arc(2, 0));
    }

    #[test]
    fn test_unbalanced_pair_is_rejected() {
        let mut instance = PDPTWInstance::parse_str("small", SMALL).unwrap();
        instance.demand[2] = -4;
        assert!(matches!(instance.validate(), Err(ParseError::UnbalancedPair { .. })));
    }

    #[test]
    fn test_negative_time_window_is_rejected() {
        let text = "3 10 0\n0 1 1\n1 0 1\n1 1 0\n1 2 1 -5 0 0 100\n";
        assert!(matches!(
            PDPTWInstance::parse_str("bad", text),
            Err(ParseError::NegativeTimeWindow { line: 5, node: 1, ready: -5, due: 0 })
        ));

        let matrix = vec![vec![0, 1], vec![1, 0]];
        let err = PDPTWInstance::new("bad", 10, 0, matrix)
            .with_task(Task::Single { node: 1, demand: 0, ready: 0, due: -1 })
            .unwrap_err();
        assert!(matches!(err, ParseError::NegativeTimeWindow { node: 1, .. }));
    }

    #[test]
    fn test_self_pair_is_rejected() {
        let text = "3 10 0\n0 1 1\n1 0 1\n1 1 0\n1 1 0 0 100 0 100\n";
        assert!(matches!(
            PDPTWInstance::parse_str("bad", text),
            Err(ParseError::SelfPair { line: 5, node: 1 })
        ));
    }

    #[test]
    fn test_node_in_two_tasks_is_rejected() {
        let pair_then_single = format!("{}1 0 0 100\n", SMALL);
        assert!(matches!(
            PDPTWInstance::parse_str("bad", &pair_then_single),
            Err(ParseError::DuplicateTask { node: 1, .. })
        ));

        let overlapping_pairs = format!("{}3 2 1 0 100 0 100\n", SMALL);
        assert!(matches!(
            PDPTWInstance::parse_str("bad", &overlapping_pairs),
            Err(ParseError::DuplicateTask { node: 3, .. })
        ));

        let mut instance = PDPTWInstance::parse_str("small", SMALL).unwrap();
        let err = instance
            .add_task(Task::Pair {
                pickup: 3,
                delivery: 2,
                demand: 1,
                pickup_window: (0, 100),
                delivery_window: (0, 100),
            })
            .unwrap_err();
        assert!(matches!(err, ParseError::DuplicateTask { node: 3, .. }));
        // a rejected task leaves the links untouched
        assert_eq!(instance.partner(1), Some(2));
        assert_eq!(instance.partner(2), Some(1));
        assert_eq!(instance.partner(3), None);
    }

    #[test]
    fn test_statistics() {
        let mut instance = PDPTWInstance::parse_str("small", SMALL).unwrap();
        instance.preprocess();
        let stats = instance.statistics();
        assert_eq!(stats.num_nodes, 4);
        assert_eq!(stats.num_tasks, 1);
        assert_eq!(stats.max_travel, 6);
        assert!(!stats.asymmetric);
        assert!(stats.to_string().contains("Capacity: 10"));
    }
}
