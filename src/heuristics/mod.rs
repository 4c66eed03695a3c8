//! Heuristics module for PDPTW.
//!
//! Construction with penalty-driven repair, constrained local searches and
//! the metaheuristic shells built on top of them.

pub mod construction;
pub mod local_search;
pub mod metaheuristics;
pub mod objective;
pub mod route_state;
pub mod shifting;
pub mod two_opt;

pub use construction::*;
pub use local_search::*;
pub use metaheuristics::*;
pub use objective::Objective;
pub use shifting::{PenaltyShifting, ShiftingSearch};
pub use two_opt::TwoOptSearch;
