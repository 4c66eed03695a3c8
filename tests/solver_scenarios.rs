//! End-to-end scenarios through the public API.

use pdptw_solver::benchmark::BatchRunner;
use pdptw_solver::{Config, PDPTWInstance, SearchStatus, SolveError, Solver};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

const FOUR_NODES: &str = "\
4 10 0
0 3 5 4
3 0 2 6
5 2 0 3
4 6 3 0
1 2 5 0 50 0 100
3 0 0 100
";

/// Nodes on a line at x = 0, 2, 5, 9, 14; visiting them left to right is optimal.
const LINE: &str = "\
5 10 0
0 2 5 9 14
2 0 3 7 12
5 3 0 4 9
9 7 4 0 5
14 12 9 5 0
1 2 5 0 100 0 100
3 4 5 0 100 0 100
";

fn quick_config() -> Config {
    let mut config = Config::default().with_workers(2).with_time_limit(30.0).with_seed(17);
    config.common.rounds = 2;
    config.optimization.vns.level_max = 4;
    config.optimization.vns.local_search = "vnd".to_string();
    config
}

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pdptw-scenario-{}-{}", tag, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn four_node_instance_is_solved() {
    let instance = PDPTWInstance::parse_str("four", FOUR_NODES).unwrap();
    let outcome = Solver::new(quick_config()).process(instance.clone()).unwrap();

    assert_eq!(outcome.status, SearchStatus::Complete);
    let route = outcome.solution.route();
    assert_eq!(route[0], instance.start_node);
    let mut sorted = route.to_vec();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 1, 2, 3]);
    assert!(outcome.solution.check(&instance));
}

#[test]
fn line_instance_reaches_optimal_span() {
    let instance = PDPTWInstance::parse_str("line", LINE).unwrap();
    let outcome = Solver::new(quick_config()).process(instance.clone()).unwrap();

    assert!(outcome.solution.check(&instance));
    assert_eq!(outcome.cost, 14);
    assert_eq!(outcome.solution.route(), &[0, 1, 2, 3, 4]);
}

#[test]
fn every_method_returns_a_checked_route() {
    let instance = PDPTWInstance::parse_str("line", LINE).unwrap();
    for method in ["vns", "gvns", "sa"] {
        for strategy in ["random", "greedy", "sortByDueDate", "sortByTW", "randomPD"] {
            let mut config = quick_config();
            config.optimization.method = method.to_string();
            config.optimization.sa.iter_max = 20;
            config.construction.strategy = strategy.to_string();

            let outcome = Solver::new(config).process(instance.clone()).unwrap();
            assert!(outcome.solution.check(&instance), "{} / {}", method, strategy);
        }
    }
}

#[test]
fn zero_time_budget_returns_promptly() {
    let instance = PDPTWInstance::parse_str("four", FOUR_NODES).unwrap();
    let start = Instant::now();
    match Solver::new(quick_config().with_time_limit(0.0)).process(instance.clone()) {
        Ok(outcome) => assert!(outcome.solution.check(&instance)),
        Err(e) => assert_eq!(e, SolveError::Timeout),
    }
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn capacity_below_demand_times_out() {
    let mut instance = PDPTWInstance::parse_str("four", FOUR_NODES).unwrap();
    instance.capacity = 3;
    let result = Solver::new(quick_config().with_time_limit(0.3)).process(instance);
    assert_eq!(result.unwrap_err(), SolveError::Timeout);
}

#[test]
fn batch_runner_solves_directory() {
    let instances = scratch_dir("batch");
    let solutions = instances.join("solutions");
    fs::create_dir_all(instances.join("in")).unwrap();
    fs::write(instances.join("in").join("four"), FOUR_NODES).unwrap();
    fs::write(instances.join("in").join("line"), LINE).unwrap();

    let mut runner = BatchRunner::new(Solver::new(quick_config())).with_solutions_dir(&solutions);
    assert_eq!(runner.run_dir(instances.join("in")).unwrap(), 2);
    assert!(runner.failures().is_empty());
    assert!(runner.records().iter().all(|r| r.check));

    let line = fs::read_to_string(solutions.join("line")).unwrap();
    assert_eq!(line, "0 1 2 3 4");
    assert_eq!(runner.summary().num_solved, 2);

    fs::remove_dir_all(&instances).ok();
}

#[test]
fn config_file_round_trip() {
    let dir = scratch_dir("config");
    let path = dir.join("config.json");

    let mut config = quick_config();
    config.construction.strategy = "sortByTW".to_string();
    config.construction.penalty.capacity = 4;
    config.optimization.objective = "time".to_string();
    fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.common.iter_max, 2);
    assert_eq!(loaded.common.seed, Some(17));
    assert_eq!(loaded.construction.strategy, "sortByTW");
    assert_eq!(loaded.construction.penalty, config.construction.penalty);
    assert_eq!(loaded.optimization.objective, "time");
    assert_eq!(loaded.optimization.vns.local_search, "vnd");

    fs::remove_dir_all(&dir).ok();
}
