use std::fmt::{self, Write};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{OptimizationRequest, SimConfig};
use crate::state::{AggregateRow, Diagnostic, OptimizationOutcome, RunResult};

/// Renders run and sweep results for stdout.
pub trait Formatter {
    fn write_run(&self, config: &SimConfig, result: &RunResult) -> Result<String>;
    fn write_optimization(
        &self,
        request: &OptimizationRequest,
        outcome: &OptimizationOutcome,
    ) -> Result<String>;
}

/// Full report: configuration, histogram, diagnostics and summary.
pub struct HumanFormatter;
/// Configuration and headline numbers only.
pub struct SummaryFormatter;
pub struct JsonFormatter;

impl Formatter for HumanFormatter {
    fn write_run(&self, config: &SimConfig, result: &RunResult) -> Result<String> {
        render(|out| {
            push_metadata(out, config)?;
            writeln!(out, "Wait time histogram:")?;
            if result.wait_time_histogram.is_empty() {
                writeln!(out, "  (no customers served)")?;
            }
            for bucket in &result.wait_time_histogram {
                writeln!(out, "  {}: {}", bucket.label, bucket.count)?;
            }
            writeln!(
                out,
                "Queue length samples: {}",
                result.queue_length_series.len()
            )?;
            if !result.diagnostics.is_empty() {
                writeln!(out, "Diagnostics:")?;
                for diagnostic in &result.diagnostics {
                    writeln!(out, "  {}", describe(diagnostic))?;
                }
            }
            push_run_summary(out, result)
        })
    }

    fn write_optimization(
        &self,
        request: &OptimizationRequest,
        outcome: &OptimizationOutcome,
    ) -> Result<String> {
        render(|out| {
            writeln!(out, "Base configuration:")?;
            push_metadata(out, &request.base)?;
            push_optimization(out, request, outcome)?;
            for failure in &outcome.failures {
                writeln!(
                    out,
                    "failed: {} servers, replication {}: {}",
                    failure.num_servers, failure.replication, failure.error
                )?;
            }
            Ok(())
        })
    }
}

impl Formatter for SummaryFormatter {
    fn write_run(&self, config: &SimConfig, result: &RunResult) -> Result<String> {
        render(|out| {
            push_metadata(out, config)?;
            push_run_summary(out, result)
        })
    }

    fn write_optimization(
        &self,
        request: &OptimizationRequest,
        outcome: &OptimizationOutcome,
    ) -> Result<String> {
        render(|out| push_optimization(out, request, outcome))
    }
}

#[derive(Serialize)]
struct RunDocument<'a> {
    config: &'a SimConfig,
    result: &'a RunResult,
}

#[derive(Serialize)]
struct OptimizationDocument<'a> {
    base: &'a SimConfig,
    objective: String,
    min_servers: usize,
    max_servers: usize,
    replications: usize,
    outcome: &'a OptimizationOutcome,
}

impl Formatter for JsonFormatter {
    fn write_run(&self, config: &SimConfig, result: &RunResult) -> Result<String> {
        to_json(&RunDocument { config, result })
    }

    fn write_optimization(
        &self,
        request: &OptimizationRequest,
        outcome: &OptimizationOutcome,
    ) -> Result<String> {
        to_json(&OptimizationDocument {
            base: &request.base,
            objective: request.objective.to_string(),
            min_servers: request.min_servers,
            max_servers: request.max_servers,
            replications: request.replications,
            outcome,
        })
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    let mut out =
        serde_json::to_string_pretty(value).map_err(|err| Error::Render(err.to_string()))?;
    out.push('\n');
    Ok(out)
}

fn render(build: impl FnOnce(&mut String) -> fmt::Result) -> Result<String> {
    let mut out = String::new();
    build(&mut out).map_err(|err| Error::Render(err.to_string()))?;
    Ok(out)
}

pub fn show_config(config: &SimConfig) -> Result<String> {
    render(|out| push_metadata(out, config))
}

pub fn list_distributions() -> String {
    concat!(
        "Arrival distributions:\n",
        "  exponential (--arrival-rate)\n",
        "  constant-rate (--arrival-rate)\n",
        "  fixed-interval (--arrival-interval)\n",
        "Service distributions:\n",
        "  exponential (--service-rate)\n",
        "  constant (--service-time)\n",
        "  normal (--service-mean, --service-std-dev)\n",
    )
    .to_string()
}

fn push_metadata(out: &mut String, config: &SimConfig) -> fmt::Result {
    let seed = config
        .seed
        .map(|seed| seed.to_string())
        .unwrap_or_else(|| "none".to_string());
    writeln!(out, "Metadata:")?;
    writeln!(out, "arrival: {}", config.arrival)?;
    writeln!(out, "service: {}", config.service)?;
    writeln!(out, "servers: {}", config.servers)?;
    writeln!(out, "stop: {}", config.stop)?;
    writeln!(out, "assignment: {}", config.assignment)?;
    writeln!(out, "seed: {}", seed)
}

fn push_run_summary(out: &mut String, result: &RunResult) -> fmt::Result {
    writeln!(out, "Summary:")?;
    writeln!(out, "total served: {}", result.total_served)?;
    writeln!(out, "sim duration: {:.4}", result.sim_duration)?;
    writeln!(
        out,
        "avg wait: {:.4} (max {:.4}, stdev {:.4})",
        result.avg_wait_time, result.max_wait_time, result.std_dev_wait_time
    )?;
    writeln!(
        out,
        "avg system time: {:.4} (max {:.4})",
        result.avg_system_time, result.max_system_time
    )?;
    writeln!(
        out,
        "avg queue length: {:.4} (max {})",
        result.avg_queue_length, result.max_queue_length
    )?;
    writeln!(out, "avg utilization: {:.2}%", result.avg_server_utilization)?;
    for server in &result.servers {
        writeln!(
            out,
            "server {}: {} served, {:.2}% utilization",
            server.server_id, server.customers_served, server.utilization_pct
        )?;
    }
    Ok(())
}

fn push_optimization(
    out: &mut String,
    request: &OptimizationRequest,
    outcome: &OptimizationOutcome,
) -> fmt::Result {
    writeln!(out, "Metadata:")?;
    writeln!(out, "objective: {}", request.objective)?;
    writeln!(
        out,
        "servers: {}-{} ({} replications each)",
        request.min_servers, request.max_servers, request.replications
    )?;
    let constraints = &request.constraints;
    let limits: Vec<String> = [
        ("max_avg_wait_time", constraints.max_avg_wait_time),
        ("max_avg_utilization", constraints.max_avg_utilization),
        ("max_avg_queue_length", constraints.max_avg_queue_length),
    ]
    .into_iter()
    .filter_map(|(name, limit)| limit.map(|value| format!("{}={}", name, value)))
    .collect();
    let limits = if limits.is_empty() {
        "none".to_string()
    } else {
        limits.join(", ")
    };
    writeln!(out, "constraints: {}", limits)?;

    writeln!(out, "Comparison:")?;
    for row in &outcome.comparison {
        writeln!(out, "{}", describe_row(row))?;
    }
    match &outcome.recommendation {
        Some(row) => writeln!(out, "Recommendation: {} servers", row.num_servers),
        None => writeln!(
            out,
            "Recommendation: none (no configuration satisfies constraints)"
        ),
    }
}

fn describe_row(row: &AggregateRow) -> String {
    if row.replications == 0 {
        return format!("{} servers: no successful replications", row.num_servers);
    }
    format!(
        "{} servers: avg wait {:.4}, avg queue {:.4}, avg utilization {:.2}%, avg served {:.2}",
        row.num_servers,
        row.avg_wait_time,
        row.avg_queue_length,
        row.avg_server_utilization,
        row.avg_total_served
    )
}

fn describe(diagnostic: &Diagnostic) -> String {
    match diagnostic {
        Diagnostic::ServerAlreadyBusy { server_id, at } => {
            format!("server {} marked busy twice at {:.4}", server_id, at)
        }
        Diagnostic::ServerNotBusy { server_id, at } => {
            format!("server {} freed while idle at {:.4}", server_id, at)
        }
        Diagnostic::UnheldRelease { server_id, at } => {
            format!("server {} released while not held at {:.4}", server_id, at)
        }
    }
}
