use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{
    ArrivalDistribution, Constraints, Objective, OptimizationRequest, OptimizeSettings,
    ServerAssignment, ServiceDistribution, SimConfig, StopCondition,
};

#[derive(Parser, Debug)]
#[command(
    name = "queue-sim",
    version,
    about = "Discrete-event simulator for multi-server queues"
)]
pub struct Args {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single simulation
    Run(RunArgs),
    /// Sweep server counts and recommend one
    Optimize(OptimizeArgs),
    /// Print the parsed configuration
    ShowConfig(ScenarioArgs),
    /// List supported arrival and service distributions
    ListDistributions,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ScenarioArgs {
    /// TOML or JSON scenario file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub arrival: Option<ArrivalArg>,
    #[arg(long, allow_negative_numbers = true)]
    pub arrival_rate: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub arrival_interval: Option<f64>,
    #[arg(long, value_enum)]
    pub service: Option<ServiceArg>,
    #[arg(long, allow_negative_numbers = true)]
    pub service_rate: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub service_time: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub service_mean: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub service_std_dev: Option<f64>,
    #[arg(long)]
    pub servers: Option<usize>,
    /// Stop once simulated time reaches this value
    #[arg(long, allow_negative_numbers = true, conflicts_with = "stop_customers")]
    pub stop_time: Option<f64>,
    /// Stop after this many customers have been served
    #[arg(long)]
    pub stop_customers: Option<u64>,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long, value_enum)]
    pub assignment: Option<AssignmentArg>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub scenario: ScenarioArgs,
    #[arg(long, value_enum, default_value_t = FormatArg::Human)]
    pub format: FormatArg,
}

#[derive(clap::Args, Debug, Clone)]
pub struct OptimizeArgs {
    #[command(flatten)]
    pub scenario: ScenarioArgs,
    #[arg(long)]
    pub min_servers: Option<usize>,
    #[arg(long)]
    pub max_servers: Option<usize>,
    #[arg(long)]
    pub replications: Option<usize>,
    #[arg(long, value_enum)]
    pub objective: Option<ObjectiveArg>,
    #[arg(long, allow_negative_numbers = true)]
    pub max_avg_wait: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub max_avg_utilization: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub max_avg_queue_length: Option<f64>,
    #[arg(long, value_enum, default_value_t = FormatArg::Human)]
    pub format: FormatArg,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ArrivalArg {
    Exponential,
    ConstantRate,
    FixedInterval,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ServiceArg {
    Exponential,
    Constant,
    Normal,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum AssignmentArg {
    ReleaseOrder,
    LowestId,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ObjectiveArg {
    MinimizeWait,
    MinimizeServers,
    MaximizeThroughput,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Human,
    Summary,
    Json,
}

impl From<AssignmentArg> for ServerAssignment {
    fn from(value: AssignmentArg) -> Self {
        match value {
            AssignmentArg::ReleaseOrder => ServerAssignment::ReleaseOrder,
            AssignmentArg::LowestId => ServerAssignment::LowestId,
        }
    }
}

impl From<ObjectiveArg> for Objective {
    fn from(value: ObjectiveArg) -> Self {
        match value {
            ObjectiveArg::MinimizeWait => Objective::MinimizeWait,
            ObjectiveArg::MinimizeServers => Objective::MinimizeServers,
            ObjectiveArg::MaximizeThroughput => Objective::MaximizeThroughput,
        }
    }
}

/// Help and version requests exit directly; every other parse failure is
/// returned as [`Error::Cli`].
pub fn parse_args() -> Result<Args> {
    Args::try_parse().map_err(|err| match err.kind() {
        clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => err.exit(),
        _ => Error::Cli(err.to_string()),
    })
}

pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path).map_err(|err| {
        Error::ConfigIo(format!(
            "failed to read config '{}': {}",
            path.display(),
            err
        ))
    })?;
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .unwrap_or("");

    match ext {
        "toml" => toml::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse TOML: {}", err))),
        "json" => serde_json::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse JSON: {}", err))),
        "" => Err(Error::UnsupportedConfigFormat("unknown".to_string())),
        _ => Err(Error::UnsupportedConfigFormat(ext.to_string())),
    }
}

/// Scenario fields that may be missing from a file used only for sweeps.
#[derive(Debug, Default, Deserialize)]
struct ScenarioFile {
    arrival: Option<ArrivalDistribution>,
    service: Option<ServiceDistribution>,
    servers: Option<usize>,
    stop: Option<StopCondition>,
    seed: Option<u64>,
    assignment: Option<ServerAssignment>,
    optimize: Option<OptimizeSettings>,
}

fn load_scenario_file(args: &ScenarioArgs) -> Result<ScenarioFile> {
    match &args.config {
        Some(path) => load_config(path),
        None => Ok(ScenarioFile::default()),
    }
}

pub fn build_sim_config(args: &ScenarioArgs) -> Result<SimConfig> {
    let file = load_scenario_file(args)?;
    sim_config_from(args, &file)
}

fn sim_config_from(args: &ScenarioArgs, file: &ScenarioFile) -> Result<SimConfig> {
    let arrival = match args.arrival {
        Some(kind) => arrival_from_args(kind, args)?,
        None => file.arrival.ok_or(Error::MissingParameter("--arrival"))?,
    };
    let service = match args.service {
        Some(kind) => service_from_args(kind, args)?,
        None => file.service.ok_or(Error::MissingParameter("--service"))?,
    };
    let stop = match (args.stop_time, args.stop_customers) {
        (Some(time), _) => StopCondition::SimTime(time),
        (None, Some(count)) => StopCondition::CustomerCount(count),
        (None, None) => file
            .stop
            .ok_or(Error::MissingParameter("--stop-time or --stop-customers"))?,
    };

    Ok(SimConfig {
        arrival,
        service,
        servers: args.servers.or(file.servers).unwrap_or(1),
        stop,
        seed: args.seed.or(file.seed),
        assignment: args
            .assignment
            .map(ServerAssignment::from)
            .or(file.assignment)
            .unwrap_or_default(),
    })
}

pub fn build_optimization(args: &OptimizeArgs) -> Result<OptimizationRequest> {
    let file = load_scenario_file(&args.scenario)?;
    let base = sim_config_from(&args.scenario, &file)?;
    let defaults = file.optimize.unwrap_or(OptimizeSettings {
        objective: Objective::MinimizeWait,
        min_servers: 1,
        max_servers: 5,
        replications: 5,
        constraints: Constraints::default(),
    });

    let settings = OptimizeSettings {
        objective: args.objective.map(Objective::from).unwrap_or(defaults.objective),
        min_servers: args.min_servers.unwrap_or(defaults.min_servers),
        max_servers: args.max_servers.unwrap_or(defaults.max_servers),
        replications: args.replications.unwrap_or(defaults.replications),
        constraints: Constraints {
            max_avg_wait_time: args
                .max_avg_wait
                .or(defaults.constraints.max_avg_wait_time),
            max_avg_utilization: args
                .max_avg_utilization
                .or(defaults.constraints.max_avg_utilization),
            max_avg_queue_length: args
                .max_avg_queue_length
                .or(defaults.constraints.max_avg_queue_length),
        },
    };
    Ok(OptimizationRequest::new(base, settings))
}

fn arrival_from_args(kind: ArrivalArg, args: &ScenarioArgs) -> Result<ArrivalDistribution> {
    let rate = || args.arrival_rate.ok_or(Error::MissingParameter("--arrival-rate"));
    Ok(match kind {
        ArrivalArg::Exponential => ArrivalDistribution::Exponential { rate: rate()? },
        ArrivalArg::ConstantRate => ArrivalDistribution::ConstantRate { rate: rate()? },
        ArrivalArg::FixedInterval => ArrivalDistribution::FixedInterval {
            interval: args
                .arrival_interval
                .ok_or(Error::MissingParameter("--arrival-interval"))?,
        },
    })
}

fn service_from_args(kind: ServiceArg, args: &ScenarioArgs) -> Result<ServiceDistribution> {
    Ok(match kind {
        ServiceArg::Exponential => ServiceDistribution::Exponential {
            rate: args
                .service_rate
                .ok_or(Error::MissingParameter("--service-rate"))?,
        },
        ServiceArg::Constant => ServiceDistribution::Constant {
            time: args
                .service_time
                .ok_or(Error::MissingParameter("--service-time"))?,
        },
        ServiceArg::Normal => ServiceDistribution::Normal {
            mean: args
                .service_mean
                .ok_or(Error::MissingParameter("--service-mean"))?,
            std_dev: args
                .service_std_dev
                .ok_or(Error::MissingParameter("--service-std-dev"))?,
        },
    })
}
