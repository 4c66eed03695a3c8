//! PDPTW Solver Library
//!
//! A heuristic solver for the single-vehicle Pickup and Delivery Problem
//! with Time Windows (PDPTW).
//!
//! # Features
//!
//! - Construction strategies (Random, Nearest Neighbor, due date and time
//!   window ordering, paired random) repaired by penalty-driven shifting
//! - Local search methods (constrained 2-opt, node shifting, VND)
//! - Metaheuristics (VNS, GVNS, Simulated Annealing)
//! - A concurrent solver with a global time budget
//! - Batch solving and strategy comparison tools
//!
//! # Example
//!
//! ```no_run
//! use pdptw_solver::{Config, PDPTWInstance, SearchStatus, Solver};
//!
//! let instance = PDPTWInstance::from_file("instances/lc101").unwrap();
//! let config = Config::from_file("config.json").unwrap().with_seed(42);
//!
//! let outcome = Solver::new(config).process(instance).unwrap();
//! if outcome.status == SearchStatus::PartialTimeout {
//!     println!("time limit reached");
//! }
//! println!("{} (cost {})", outcome.solution, outcome.cost);
//! ```

pub mod benchmark;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod heuristics;
pub mod instance;
pub mod solution;
pub mod solver;

#[cfg(test)]
mod test_utils;

pub use config::Config;
pub use error::{ConfigError, ParseError, SolveError};
pub use instance::PDPTWInstance;
pub use solution::Solution;
pub use solver::{SearchStatus, SolveOutcome, Solver};
