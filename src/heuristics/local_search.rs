//! Local search improvement heuristics for PDPTW.
//!
//! This module defines the common trait and the composite searches:
//! - 2-opt segment reversal ([`TwoOptSearch`])
//! - single node shifting ([`ShiftingSearch`])
//! - Variable Neighborhood Descent over both ([`Vnd`])
//!
//! Every search only touches feasible routes and leaves infeasible input
//! unchanged.

use crate::heuristics::objective::Objective;
use crate::heuristics::shifting::ShiftingSearch;
use crate::heuristics::two_opt::TwoOptSearch;
use crate::instance::PDPTWInstance;
use crate::solution::Solution;
use rand_chacha::ChaCha8Rng;

/// Trait for local search improvement methods
pub trait LocalSearch {
    /// Improve `solution` in place; returns whether anything changed.
    fn improve(&self, instance: &PDPTWInstance, solution: &mut Solution, rng: &mut ChaCha8Rng) -> bool;
    fn name(&self) -> &str;
}

/// Variable Neighborhood Descent (VND)
///
/// Runs every operator to its local optimum in order and repeats the whole
/// sequence while the objective keeps dropping.
pub struct Vnd {
    objective: Objective,
    operators: Vec<Box<dyn LocalSearch + Send + Sync>>,
}

impl Vnd {
    /// Shifting followed by 2-opt
    pub fn new(objective: Objective) -> Self {
        let operators: Vec<Box<dyn LocalSearch + Send + Sync>> = vec![
            Box::new(ShiftingSearch::new(objective)),
            Box::new(TwoOptSearch::new(objective)),
        ];
        Vnd { objective, operators }
    }
}

impl LocalSearch for Vnd {
    fn improve(&self, instance: &PDPTWInstance, solution: &mut Solution, rng: &mut ChaCha8Rng) -> bool {
        let mut cost = self.objective.cost(instance, solution);
        let mut improved = false;

        loop {
            for op in &self.operators {
                op.improve(instance, solution, rng);
            }

            let new_cost = self.objective.cost(instance, solution);
            if new_cost < cost {
                cost = new_cost;
                improved = true;
            } else {
                break;
            }
        }

        improved
    }

    fn name(&self) -> &str {
        "VND"
    }
}

/// Local search selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalSearchKind {
    TwoOpt,
    Shifting,
    Vnd,
}

impl LocalSearchKind {
    /// `"2opt"`, `"shifting"` or `"vnd"`; anything else falls back to 2-opt.
    pub fn from_name(name: &str) -> Self {
        match name {
            "2opt" => LocalSearchKind::TwoOpt,
            "shifting" => LocalSearchKind::Shifting,
            "vnd" => LocalSearchKind::Vnd,
            other => {
                log::warn!("Unknown local search '{}', using 2opt", other);
                LocalSearchKind::TwoOpt
            }
        }
    }

    pub fn build(self, objective: Objective) -> Box<dyn LocalSearch + Send + Sync> {
        match self {
            LocalSearchKind::TwoOpt => Box::new(TwoOptSearch::new(objective)),
            LocalSearchKind::Shifting => Box::new(ShiftingSearch::new(objective)),
            LocalSearchKind::Vnd => Box::new(Vnd::new(objective)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::random_instance;
    use rand::SeedableRng;

    #[test]
    fn test_kind_from_name() {
        assert_eq!(LocalSearchKind::from_name("2opt"), LocalSearchKind::TwoOpt);
        assert_eq!(LocalSearchKind::from_name("shifting"), LocalSearchKind::Shifting);
        assert_eq!(LocalSearchKind::from_name("vnd"), LocalSearchKind::Vnd);
        assert_eq!(LocalSearchKind::from_name("3opt"), LocalSearchKind::TwoOpt);
    }

    #[test]
    fn test_build_names() {
        assert_eq!(LocalSearchKind::TwoOpt.build(Objective::Span).name(), "2-Opt");
        assert_eq!(LocalSearchKind::Shifting.build(Objective::Span).name(), "Shifting");
        assert_eq!(LocalSearchKind::Vnd.build(Objective::Span).name(), "VND");
    }

    #[test]
    fn test_vnd_is_no_worse_than_its_operators() {
        let mut rng = ChaCha8Rng::seed_from_u64(53);
        for round in 0..20 {
            let objective = if round % 2 == 0 { Objective::Span } else { Objective::TotalTime };
            let (instance, reference) = random_instance(&mut rng, 4 + round % 5, false, 40);
            let mut sol = Solution::from_route(&instance, reference, "test");
            let before = objective.cost(&instance, &sol);

            let improved = Vnd::new(objective).improve(&instance, &mut sol, &mut rng);
            let after = objective.cost(&instance, &sol);

            assert!(sol.check(&instance));
            assert_eq!(improved, after < before);

            // a VND optimum is a local optimum for both neighbourhoods
            let mut again = sol.clone();
            assert!(!ShiftingSearch::new(objective).improve(&instance, &mut again, &mut rng));
            assert!(!TwoOptSearch::new(objective).improve(&instance, &mut again, &mut rng));
        }
    }
}
