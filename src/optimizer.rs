//! Server-count sweep.
//!
//! Every (server count, replication) pair is an independent run with its own
//! engine, so the sweep fans out over rayon and collects results in job order.

use rayon::prelude::*;
use tracing::{info, warn};

use crate::engine::{run_simulation, validate_config};
use crate::error::{Error, Result};
use crate::models::{Constraints, Objective, OptimizationRequest};
use crate::state::{AggregateRow, OptimizationOutcome, ReplicationFailure, RunResult};

pub fn optimize(request: &OptimizationRequest) -> Result<OptimizationOutcome> {
    validate_request(request)?;
    info!(
        min_servers = request.min_servers,
        max_servers = request.max_servers,
        replications = request.replications,
        objective = %request.objective,
        "starting server-count optimization"
    );

    let replications = request.replications;
    let jobs: Vec<(usize, usize)> = (request.min_servers..=request.max_servers)
        .flat_map(|servers| (0..replications).map(move |replication| (servers, replication)))
        .collect();

    let runs: Vec<(usize, usize, Result<RunResult>)> = jobs
        .into_par_iter()
        .map(|(servers, replication)| {
            let mut config = request.base.clone();
            config.servers = servers;
            config.seed = replication_seed(request.base.seed, servers, replications, replication);
            (servers, replication, run_simulation(&config))
        })
        .collect();

    let mut failures = Vec::new();
    let mut comparison = Vec::new();
    let mut runs = runs.into_iter().peekable();
    for servers in request.min_servers..=request.max_servers {
        let mut succeeded = Vec::with_capacity(replications);
        while let Some((_, replication, outcome)) = runs.next_if(|(n, _, _)| *n == servers) {
            match outcome {
                Ok(result) => succeeded.push(result),
                Err(err) => {
                    warn!(servers, replication, error = %err, "replication failed");
                    failures.push(ReplicationFailure {
                        num_servers: servers,
                        replication,
                        error: err.to_string(),
                    });
                }
            }
        }
        let row = aggregate(servers, &succeeded);
        info!(
            num_servers = row.num_servers,
            avg_wait_time = row.avg_wait_time,
            avg_server_utilization = row.avg_server_utilization,
            "candidate evaluated"
        );
        comparison.push(row);
    }

    let valid: Vec<&AggregateRow> = comparison
        .iter()
        .filter(|row| satisfies(row, &request.constraints))
        .collect();
    let recommendation = select(request.objective, &valid).cloned();
    match &recommendation {
        Some(row) => info!(num_servers = row.num_servers, "recommended configuration"),
        None => warn!("no configuration satisfies constraints"),
    }

    Ok(OptimizationOutcome {
        recommendation,
        comparison,
        failures,
    })
}

fn validate_request(request: &OptimizationRequest) -> Result<()> {
    if request.min_servers == 0 || request.min_servers > request.max_servers {
        return Err(Error::InvalidServerRange {
            min: request.min_servers,
            max: request.max_servers,
        });
    }
    if request.replications == 0 {
        return Err(Error::ReplicationsZero);
    }
    let mut probe = request.base.clone();
    probe.servers = request.min_servers;
    validate_config(&probe)
}

/// Distinct, reproducible seed per replication; unseeded sweeps stay unseeded.
pub fn replication_seed(
    base: Option<u64>,
    servers: usize,
    replications: usize,
    replication: usize,
) -> Option<u64> {
    let offset = (servers as u64)
        .wrapping_mul(replications as u64)
        .wrapping_add(replication as u64);
    base.map(|seed| seed.wrapping_add(offset))
}

fn aggregate(num_servers: usize, results: &[RunResult]) -> AggregateRow {
    if results.is_empty() {
        return AggregateRow {
            num_servers,
            avg_wait_time: f64::INFINITY,
            avg_queue_length: f64::INFINITY,
            avg_server_utilization: f64::INFINITY,
            avg_total_served: 0.0,
            replications: 0,
        };
    }
    let n = results.len() as f64;
    let mean = |metric: fn(&RunResult) -> f64| results.iter().map(metric).sum::<f64>() / n;
    AggregateRow {
        num_servers,
        avg_wait_time: mean(|r| r.avg_wait_time),
        avg_queue_length: mean(|r| r.avg_queue_length),
        avg_server_utilization: mean(|r| r.avg_server_utilization),
        avg_total_served: mean(|r| r.total_served as f64),
        replications: results.len(),
    }
}

fn satisfies(row: &AggregateRow, constraints: &Constraints) -> bool {
    let within = |limit: Option<f64>, value: f64| limit.map_or(true, |max| value <= max);
    row.replications > 0
        && within(constraints.max_avg_wait_time, row.avg_wait_time)
        && within(constraints.max_avg_utilization, row.avg_server_utilization)
        && within(constraints.max_avg_queue_length, row.avg_queue_length)
}

/// Picks the best row; ties keep the earliest row, i.e. the fewest servers.
fn select<'a>(objective: Objective, valid: &[&'a AggregateRow]) -> Option<&'a AggregateRow> {
    let mut best: Option<&AggregateRow> = None;
    for &row in valid {
        let better = match best {
            None => true,
            Some(current) => match objective {
                Objective::MinimizeWait => row.avg_wait_time < current.avg_wait_time,
                Objective::MinimizeServers => {
                    row.num_servers < current.num_servers
                        || (row.num_servers == current.num_servers
                            && row.avg_wait_time < current.avg_wait_time)
                }
                Objective::MaximizeThroughput => row.avg_total_served > current.avg_total_served,
            },
        };
        if better {
            best = Some(row);
        }
    }
    best
}
