use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CustomerPhase {
    Waiting,
    InService,
    Departed,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Customer {
    pub id: usize,
    pub arrival_time: f64,
    pub service_start: Option<f64>,
    pub server_id: Option<usize>,
    pub phase: CustomerPhase,
}

impl Customer {
    pub fn arrive(id: usize, arrival_time: f64) -> Self {
        Self {
            id,
            arrival_time,
            service_start: None,
            server_id: None,
            phase: CustomerPhase::Waiting,
        }
    }

    pub fn wait_time(&self) -> Option<f64> {
        self.service_start.map(|start| start - self.arrival_time)
    }
}

/// Bookkeeping anomalies noticed during a run. They never abort the run.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Diagnostic {
    ServerAlreadyBusy { server_id: usize, at: f64 },
    ServerNotBusy { server_id: usize, at: f64 },
    UnheldRelease { server_id: usize, at: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServerReport {
    pub server_id: usize,
    pub customers_served: u64,
    pub busy_time: f64,
    pub utilization_pct: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistogramBucket {
    pub label: String,
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunResult {
    pub avg_wait_time: f64,
    pub max_wait_time: f64,
    pub std_dev_wait_time: f64,
    pub avg_system_time: f64,
    pub max_system_time: f64,
    pub avg_queue_length: f64,
    pub max_queue_length: u64,
    pub avg_server_utilization: f64,
    pub servers: Vec<ServerReport>,
    pub total_served: u64,
    pub sim_duration: f64,
    pub queue_length_series: Vec<SeriesPoint>,
    pub wait_time_histogram: Vec<HistogramBucket>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregateRow {
    pub num_servers: usize,
    pub avg_wait_time: f64,
    pub avg_queue_length: f64,
    pub avg_server_utilization: f64,
    pub avg_total_served: f64,
    /// Replications that completed; failed ones are excluded from the averages.
    pub replications: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReplicationFailure {
    pub num_servers: usize,
    pub replication: usize,
    pub error: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OptimizationOutcome {
    pub recommendation: Option<AggregateRow>,
    pub comparison: Vec<AggregateRow>,
    pub failures: Vec<ReplicationFailure>,
}
