use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SimConfig {
    pub arrival: ArrivalDistribution,
    pub service: ServiceDistribution,
    pub servers: usize,
    pub stop: StopCondition,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub assignment: ServerAssignment,
}

/// Interarrival-time families.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ArrivalDistribution {
    /// Poisson process; mean gap is `1 / rate`.
    Exponential { rate: f64 },
    /// Deterministic gap of `1 / rate`.
    ConstantRate { rate: f64 },
    /// Deterministic gap of `interval`.
    FixedInterval { interval: f64 },
}

/// Service-time families.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ServiceDistribution {
    Exponential { rate: f64 },
    Constant { time: f64 },
    /// Negative draws are clamped to zero.
    Normal { mean: f64, std_dev: f64 },
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum StopCondition {
    SimTime(f64),
    CustomerCount(u64),
}

/// Which free server is handed out when more than one is available.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ServerAssignment {
    /// Servers are reused in the order they were released.
    #[default]
    ReleaseOrder,
    LowestId,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Objective {
    MinimizeWait,
    MinimizeServers,
    MaximizeThroughput,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, Default, PartialEq)]
pub struct Constraints {
    #[serde(default)]
    pub max_avg_wait_time: Option<f64>,
    #[serde(default)]
    pub max_avg_utilization: Option<f64>,
    #[serde(default)]
    pub max_avg_queue_length: Option<f64>,
}

/// Sweep settings as they appear in the `[optimize]` table of a config file.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct OptimizeSettings {
    pub objective: Objective,
    pub min_servers: usize,
    pub max_servers: usize,
    #[serde(default = "default_replications")]
    pub replications: usize,
    #[serde(default)]
    pub constraints: Constraints,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OptimizationRequest {
    /// `servers` is ignored; every candidate count overrides it.
    pub base: SimConfig,
    pub objective: Objective,
    pub constraints: Constraints,
    pub min_servers: usize,
    pub max_servers: usize,
    pub replications: usize,
}

impl OptimizationRequest {
    pub fn new(base: SimConfig, settings: OptimizeSettings) -> Self {
        Self {
            base,
            objective: settings.objective,
            constraints: settings.constraints,
            min_servers: settings.min_servers,
            max_servers: settings.max_servers,
            replications: settings.replications,
        }
    }
}

fn default_replications() -> usize {
    5
}

impl fmt::Display for ArrivalDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrivalDistribution::Exponential { rate } => write!(f, "exponential(rate={})", rate),
            ArrivalDistribution::ConstantRate { rate } => {
                write!(f, "constant-rate(rate={})", rate)
            }
            ArrivalDistribution::FixedInterval { interval } => {
                write!(f, "fixed-interval(interval={})", interval)
            }
        }
    }
}

impl fmt::Display for ServiceDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceDistribution::Exponential { rate } => write!(f, "exponential(rate={})", rate),
            ServiceDistribution::Constant { time } => write!(f, "constant(time={})", time),
            ServiceDistribution::Normal { mean, std_dev } => {
                write!(f, "normal(mean={}, std_dev={})", mean, std_dev)
            }
        }
    }
}

impl fmt::Display for StopCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopCondition::SimTime(value) => write!(f, "sim-time({})", value),
            StopCondition::CustomerCount(value) => write!(f, "customer-count({})", value),
        }
    }
}

impl fmt::Display for ServerAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ServerAssignment::ReleaseOrder => "release-order",
            ServerAssignment::LowestId => "lowest-id",
        };
        f.write_str(label)
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Objective::MinimizeWait => "minimize-wait",
            Objective::MinimizeServers => "minimize-servers",
            Objective::MaximizeThroughput => "maximize-throughput",
        };
        f.write_str(label)
    }
}
