//! Error types for parsing, configuration and solving.

use thiserror::Error;

/// Errors raised while reading a PDPTW instance file.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("cannot read instance: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: invalid integer `{token}`")]
    InvalidInteger { line: usize, token: String },
    #[error("instance header must contain at least 3 integers (nodes, capacity, start node)")]
    InvalidHeader,
    #[error("instance is empty")]
    Empty,
    #[error("line {line}: matrix row has {found} entries, expected {expected}")]
    MatrixRow {
        line: usize,
        found: usize,
        expected: usize,
    },
    #[error("expected {expected} matrix rows, found {found}")]
    MissingRows { expected: usize, found: usize },
    #[error("line {line}: wrong task format ({found} values, expected 4 or 7)")]
    TaskFormat { line: usize, found: usize },
    #[error("line {line}: node {node} is out of range (instance has {num_nodes} nodes)")]
    NodeOutOfRange {
        line: usize,
        node: i64,
        num_nodes: usize,
    },
    #[error("pickup {pickup} and delivery {delivery} demands do not cancel out")]
    UnbalancedPair { pickup: usize, delivery: usize },
    #[error("line {line}: node {node} is both pickup and delivery of its pair")]
    SelfPair { line: usize, node: usize },
    #[error("line {line}: node {node} already belongs to a task")]
    DuplicateTask { line: usize, node: usize },
    #[error("line {line}: node {node} has a negative time window [{ready}, {due}]")]
    NegativeTimeWindow {
        line: usize,
        node: usize,
        ready: i64,
        due: i64,
    },
}

/// Errors raised while loading a solver configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Failures of a complete search.
///
/// A timeout that still produced a route is not an error; it is reported as
/// [`SearchStatus::PartialTimeout`](crate::solver::SearchStatus) instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    #[error("timeout: unable to find a solution")]
    Timeout,
    #[error("search finished without producing a solution")]
    NoSolution,
}
