//! Solver configuration.
//!
//! Loaded from JSON; every field has a default so partial files work:
//!
//! ```json
//! {
//!   "common": { "iterMax": 8, "maxTime": 10.0, "rounds": 3 },
//!   "construction": { "strategy": "sortByTW", "levelMax": 10,
//!                     "penalty": { "timeWindows": 1, "pickupDelivery": 1, "capacity": 1 } },
//!   "optimization": { "objective": "span", "method": "vns",
//!                     "vns": { "iterMax": 10, "levelMax": 8, "localSearch": "vnd" } }
//! }
//! ```

use crate::error::ConfigError;
use crate::evaluation::PenaltyWeights;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub common: CommonConfig,
    pub construction: ConstructionConfig,
    pub optimization: OptimizationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommonConfig {
    /// Number of independent workers
    pub iter_max: usize,
    /// Global wall-clock budget in seconds
    pub max_time: f64,
    /// Optimisation passes per worker after construction
    pub rounds: usize,
    /// Base seed; workers use `seed + index`. Entropy when absent.
    pub seed: Option<u64>,
}

impl Default for CommonConfig {
    fn default() -> Self {
        CommonConfig {
            iter_max: 8,
            max_time: 10.0,
            rounds: 3,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConstructionConfig {
    pub strategy: String,
    pub level_max: usize,
    pub penalty: PenaltyWeights,
}

impl Default for ConstructionConfig {
    fn default() -> Self {
        ConstructionConfig {
            strategy: "random".to_string(),
            level_max: 10,
            penalty: PenaltyWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimizationConfig {
    /// `"span"` or `"time"`
    pub objective: String,
    #[serde(alias = "asymetric")]
    pub asymmetric: bool,
    /// `"vns"`, `"gvns"` or `"sa"`
    pub method: String,
    pub vns: VnsConfig,
    pub gvns: GvnsConfig,
    pub sa: SaConfig,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        OptimizationConfig {
            objective: "span".to_string(),
            asymmetric: false,
            method: "vns".to_string(),
            vns: VnsConfig::default(),
            gvns: GvnsConfig::default(),
            sa: SaConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VnsConfig {
    pub iter_max: usize,
    pub level_max: usize,
    /// `"2opt"`, `"shifting"` or `"vnd"`
    pub local_search: String,
}

impl Default for VnsConfig {
    fn default() -> Self {
        VnsConfig {
            iter_max: 10,
            level_max: 8,
            local_search: "2opt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GvnsConfig {
    pub iter_max: usize,
    pub level_max: usize,
}

impl Default for GvnsConfig {
    fn default() -> Self {
        GvnsConfig {
            iter_max: 10,
            level_max: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaConfig {
    pub iter_max: usize,
    pub local_search: String,
}

impl Default for SaConfig {
    fn default() -> Self {
        SaConfig {
            iter_max: 100,
            local_search: "2opt".to_string(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the search cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.common.max_time.is_finite() || self.common.max_time < 0.0 {
            return Err(invalid("common.maxTime", format!("{} is not a non-negative duration", self.common.max_time)));
        }
        if self.construction.level_max == 0 {
            return Err(invalid("construction.levelMax", "must be at least 1".to_string()));
        }

        let weights = &self.construction.penalty;
        for (field, weight) in [
            ("construction.penalty.timeWindows", weights.time_windows),
            ("construction.penalty.pickupDelivery", weights.pickup_delivery),
            ("construction.penalty.capacity", weights.capacity),
        ] {
            if weight <= 0 {
                return Err(invalid(field, format!("weight {} must be positive", weight)));
            }
        }

        if self.optimization.sa.iter_max == 0 {
            return Err(invalid("optimization.sa.iterMax", "must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.common.max_time = seconds;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.common.iter_max = workers;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.common.seed = Some(seed);
        self
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::InvalidValue { field, reason }
}
