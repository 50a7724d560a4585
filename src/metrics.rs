//! Statistics accumulated while a run executes.
//!
//! Queue length is tracked as a step function: every change closes the
//! interval that has been open since the previous change, so the average is
//! weighted by time rather than by event count.

use tracing::warn;

use crate::state::{
    Customer, CustomerPhase, Diagnostic, HistogramBucket, RunResult, SeriesPoint, ServerReport,
};

/// Intervals shorter than this are not recorded.
pub const INTERVAL_TOLERANCE: f64 = 1e-9;

const MAX_HISTOGRAM_BUCKETS: usize = 1_000;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueueInterval {
    pub duration: f64,
    pub length: u64,
}

#[derive(Clone, Debug)]
pub struct MetricsCollector {
    num_servers: usize,
    wait_times: Vec<f64>,
    system_times: Vec<f64>,
    queue_intervals: Vec<QueueInterval>,
    queue_length: u64,
    last_event_time: f64,
    busy_time: Vec<f64>,
    busy_since: Vec<Option<f64>>,
    served_per_server: Vec<u64>,
    total_served: u64,
    diagnostics: Vec<Diagnostic>,
    finalized_at: Option<f64>,
}

impl MetricsCollector {
    pub fn new(num_servers: usize) -> Self {
        Self {
            num_servers,
            wait_times: Vec::new(),
            system_times: Vec::new(),
            queue_intervals: Vec::new(),
            queue_length: 0,
            last_event_time: 0.0,
            busy_time: vec![0.0; num_servers],
            busy_since: vec![None; num_servers],
            served_per_server: vec![0; num_servers],
            total_served: 0,
            diagnostics: Vec::new(),
            finalized_at: None,
        }
    }

    /// Closes the open interval at `timestamp` with the current queue length.
    ///
    /// Zero-length intervals are dropped, but the interval start still moves
    /// to `timestamp`.
    pub fn record_queue_change(&mut self, timestamp: f64) {
        let duration = timestamp - self.last_event_time;
        if duration > INTERVAL_TOLERANCE {
            self.queue_intervals.push(QueueInterval {
                duration,
                length: self.queue_length,
            });
        }
        self.last_event_time = self.last_event_time.max(timestamp);
    }

    pub fn customer_enqueued(&mut self, timestamp: f64) {
        self.record_queue_change(timestamp);
        self.queue_length += 1;
    }

    pub fn customer_dequeued(&mut self, timestamp: f64) {
        self.record_queue_change(timestamp);
        self.queue_length = self.queue_length.saturating_sub(1);
    }

    pub fn record_server_busy_start(&mut self, server_id: usize, timestamp: f64) {
        match self.busy_since.get_mut(server_id) {
            Some(slot) if slot.is_none() => *slot = Some(timestamp),
            _ => self.record_diagnostic(Diagnostic::ServerAlreadyBusy {
                server_id,
                at: timestamp,
            }),
        }
    }

    pub fn record_server_busy_end(&mut self, server_id: usize, timestamp: f64) {
        match self.busy_since.get_mut(server_id).and_then(Option::take) {
            Some(start) => {
                let duration = timestamp - start;
                if duration > 0.0 {
                    self.busy_time[server_id] += duration;
                }
            }
            None => self.record_diagnostic(Diagnostic::ServerNotBusy {
                server_id,
                at: timestamp,
            }),
        }
    }

    pub fn record_customer_served(&mut self, customer: &Customer, completion_time: f64) {
        debug_assert_eq!(customer.phase, CustomerPhase::Departed);
        self.wait_times.push(customer.wait_time().unwrap_or(0.0));
        self.system_times.push(completion_time - customer.arrival_time);
        self.total_served += 1;
        if let Some(count) = customer
            .server_id
            .and_then(|id| self.served_per_server.get_mut(id))
        {
            *count += 1;
        }
    }

    pub fn record_diagnostic(&mut self, diagnostic: Diagnostic) {
        warn!(?diagnostic, "inconsistent server bookkeeping");
        self.diagnostics.push(diagnostic);
    }

    /// Closes every open busy interval and the final queue interval at `now`.
    /// Calling it again is a no-op.
    pub fn finalize(&mut self, now: f64) {
        if self.finalized_at.is_some() {
            return;
        }
        for server_id in 0..self.num_servers {
            if let Some(start) = self.busy_since[server_id].take() {
                let duration = now - start;
                if duration > 0.0 {
                    self.busy_time[server_id] += duration;
                }
            }
        }
        self.record_queue_change(now);
        self.finalized_at = Some(now);
    }

    pub fn total_served(&self) -> u64 {
        self.total_served
    }

    pub fn queue_length(&self) -> u64 {
        self.queue_length
    }

    pub fn last_event_time(&self) -> f64 {
        self.last_event_time
    }

    pub fn wait_times(&self) -> &[f64] {
        &self.wait_times
    }

    pub fn queue_intervals(&self) -> &[QueueInterval] {
        &self.queue_intervals
    }

    pub fn busy_time(&self) -> &[f64] {
        &self.busy_time
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn summarize(&self, sim_duration: f64) -> RunResult {
        let total_x_length = self
            .queue_intervals
            .iter()
            .map(|interval| interval.duration * interval.length as f64)
            .sum::<f64>();
        let total_recorded_time = if (self.last_event_time - sim_duration).abs()
            < INTERVAL_TOLERANCE
            && self.last_event_time > 0.0
        {
            self.last_event_time
        } else {
            sim_duration
        };
        let avg_queue_length = if total_recorded_time > INTERVAL_TOLERANCE {
            total_x_length / total_recorded_time
        } else {
            0.0
        };
        let max_queue_length = self
            .queue_intervals
            .iter()
            .map(|interval| interval.length)
            .max()
            .unwrap_or(0);

        let capacity_time = sim_duration * self.num_servers as f64;
        let total_busy = self.busy_time.iter().sum::<f64>();
        let avg_server_utilization = if capacity_time > INTERVAL_TOLERANCE {
            total_busy / capacity_time * 100.0
        } else {
            0.0
        };
        let servers = (0..self.num_servers)
            .map(|server_id| {
                let busy_time = self.busy_time[server_id];
                let utilization_pct = if sim_duration > INTERVAL_TOLERANCE {
                    busy_time / sim_duration * 100.0
                } else {
                    0.0
                };
                ServerReport {
                    server_id,
                    customers_served: self.served_per_server[server_id],
                    busy_time,
                    utilization_pct,
                }
            })
            .collect();

        RunResult {
            avg_wait_time: mean(&self.wait_times),
            max_wait_time: max(&self.wait_times),
            std_dev_wait_time: sample_std_dev(&self.wait_times),
            avg_system_time: mean(&self.system_times),
            max_system_time: max(&self.system_times),
            avg_queue_length,
            max_queue_length,
            avg_server_utilization,
            servers,
            total_served: self.total_served,
            sim_duration,
            queue_length_series: queue_length_series(&self.queue_intervals, sim_duration),
            wait_time_histogram: wait_time_histogram(&self.wait_times),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, f64::max)
}

fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let sum_sq = values
        .iter()
        .map(|value| (value - avg) * (value - avg))
        .sum::<f64>();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Step series with two points per interval, padded out to `sim_duration`.
pub fn queue_length_series(intervals: &[QueueInterval], sim_duration: f64) -> Vec<SeriesPoint> {
    if intervals.is_empty() {
        return vec![
            SeriesPoint { x: 0.0, y: 0.0 },
            SeriesPoint {
                x: sim_duration,
                y: 0.0,
            },
        ];
    }

    let mut points = Vec::with_capacity(intervals.len() * 2 + 1);
    let mut time = 0.0;
    for interval in intervals {
        let y = interval.length as f64;
        points.push(SeriesPoint { x: time, y });
        time += interval.duration;
        points.push(SeriesPoint { x: time, y });
    }
    if time < sim_duration {
        let y = intervals[intervals.len() - 1].length as f64;
        points.push(SeriesPoint { x: sim_duration, y });
    }
    points
}

/// Buckets wait times with the "auto" rule: the narrower of the Sturges and
/// Freedman-Diaconis bin widths, falling back to Sturges when the IQR is zero.
pub fn wait_time_histogram(samples: &[f64]) -> Vec<HistogramBucket> {
    if samples.is_empty() {
        return vec![HistogramBucket {
            label: "N/A".to_string(),
            lower: 0.0,
            upper: 0.0,
            count: 0,
        }];
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];

    let (lower, upper, bins) = if max - min <= 0.0 {
        (min - 0.5, max + 0.5, 1)
    } else {
        let n = sorted.len() as f64;
        let range = max - min;
        let sturges = range / (n.log2() + 1.0);
        let iqr = percentile(&sorted, 75.0) - percentile(&sorted, 25.0);
        let fd = 2.0 * iqr * n.powf(-1.0 / 3.0);
        let width = if fd > 0.0 { fd.min(sturges) } else { sturges };
        let bins = ((range / width).ceil() as usize).clamp(1, MAX_HISTOGRAM_BUCKETS);
        (min, max, bins)
    };

    let span = upper - lower;
    let mut counts = vec![0u64; bins];
    for value in &sorted {
        let idx = (((value - lower) / span) * bins as f64) as usize;
        counts[idx.min(bins - 1)] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(idx, count)| {
            let lo = lower + span * idx as f64 / bins as f64;
            let hi = lower + span * (idx + 1) as f64 / bins as f64;
            HistogramBucket {
                label: format!("{:.2}-{:.2}", lo, hi),
                lower: lo,
                upper: hi,
                count,
            }
        })
        .collect()
}

fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let pos = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn served(id: usize, arrival: f64, start: f64, server_id: usize) -> Customer {
        let mut customer = Customer::arrive(id, arrival);
        customer.service_start = Some(start);
        customer.server_id = Some(server_id);
        customer.phase = CustomerPhase::Departed;
        customer
    }

    /// One server busy from 1 to 3 and from 3 to 4; the second customer waits
    /// from 2 to 3. The second server never works.
    fn two_customer_collector() -> MetricsCollector {
        let mut metrics = MetricsCollector::new(2);
        metrics.customer_enqueued(1.0);
        metrics.customer_dequeued(1.0);
        metrics.record_server_busy_start(0, 1.0);
        metrics.customer_enqueued(2.0);
        metrics.record_server_busy_end(0, 3.0);
        metrics.record_customer_served(&served(1, 1.0, 1.0, 0), 3.0);
        metrics.customer_dequeued(3.0);
        metrics.record_server_busy_start(0, 3.0);
        metrics.record_server_busy_end(0, 4.0);
        metrics.record_customer_served(&served(2, 2.0, 3.0, 0), 4.0);
        metrics.finalize(5.0);
        metrics
    }

    #[test]
    fn zero_length_intervals_are_skipped_but_time_advances() {
        let mut metrics = MetricsCollector::new(1);
        metrics.customer_enqueued(1.0);
        metrics.customer_dequeued(1.0);
        metrics.customer_enqueued(1.0);
        assert_eq!(
            metrics.queue_intervals(),
            &[QueueInterval {
                duration: 1.0,
                length: 0
            }]
        );
        assert_eq!(metrics.last_event_time(), 1.0);
        assert_eq!(metrics.queue_length(), 1);
    }

    #[test]
    fn intervals_cover_the_whole_run() {
        let metrics = two_customer_collector();
        let total: f64 = metrics.queue_intervals().iter().map(|i| i.duration).sum();
        assert!((total - 5.0).abs() < 1e-9);
        let lengths: Vec<u64> = metrics.queue_intervals().iter().map(|i| i.length).collect();
        assert_eq!(lengths, vec![0, 0, 1, 0]);
    }

    #[test]
    fn summary_reports_waits_queue_and_utilization() {
        let result = two_customer_collector().summarize(5.0);

        assert_eq!(result.total_served, 2);
        assert!((result.avg_wait_time - 0.5).abs() < 1e-12);
        assert_eq!(result.max_wait_time, 1.0);
        assert!((result.std_dev_wait_time - 0.5_f64.sqrt()).abs() < 1e-12);
        assert!((result.avg_system_time - 2.0).abs() < 1e-12);
        assert!((result.avg_queue_length - 0.2).abs() < 1e-12);
        assert_eq!(result.max_queue_length, 1);
        assert!((result.avg_server_utilization - 30.0).abs() < 1e-9);
        assert_eq!(result.servers.len(), 2);
        assert!((result.servers[0].utilization_pct - 60.0).abs() < 1e-9);
        assert_eq!(result.servers[0].customers_served, 2);
        assert_eq!(result.servers[1].utilization_pct, 0.0);
        assert_eq!(result.servers[1].customers_served, 0);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn finalize_closes_open_busy_interval_once() {
        let mut metrics = MetricsCollector::new(1);
        metrics.record_server_busy_start(0, 2.0);
        metrics.finalize(5.0);
        metrics.finalize(5.0);
        assert_eq!(metrics.busy_time(), &[3.0]);
        assert_eq!(metrics.queue_intervals().len(), 1);
        assert_eq!(metrics.summarize(5.0), metrics.summarize(5.0));
    }

    #[test]
    fn inconsistent_busy_markers_become_diagnostics() {
        let mut metrics = MetricsCollector::new(1);
        metrics.record_server_busy_end(0, 1.0);
        metrics.record_server_busy_start(0, 1.0);
        metrics.record_server_busy_start(0, 2.0);
        metrics.record_server_busy_end(0, 4.0);

        assert_eq!(metrics.busy_time(), &[3.0]);
        assert_eq!(
            metrics.diagnostics(),
            &[
                Diagnostic::ServerNotBusy {
                    server_id: 0,
                    at: 1.0
                },
                Diagnostic::ServerAlreadyBusy {
                    server_id: 0,
                    at: 2.0
                },
            ]
        );
    }

    #[test]
    fn empty_run_has_flat_series_and_placeholder_histogram() {
        let mut metrics = MetricsCollector::new(3);
        metrics.finalize(0.0);
        let result = metrics.summarize(0.0);
        assert_eq!(result.avg_queue_length, 0.0);
        assert_eq!(result.avg_server_utilization, 0.0);
        assert_eq!(result.servers.len(), 3);
        assert_eq!(result.queue_length_series.len(), 2);
        assert_eq!(result.wait_time_histogram[0].label, "N/A");
        assert_eq!(result.wait_time_histogram[0].count, 0);
    }

    #[test]
    fn series_is_padded_to_duration() {
        let intervals = [
            QueueInterval {
                duration: 1.0,
                length: 0,
            },
            QueueInterval {
                duration: 2.0,
                length: 2,
            },
        ];
        let series = queue_length_series(&intervals, 4.0);
        let xs: Vec<f64> = series.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = series.iter().map(|p| p.y).collect();
        assert_eq!(xs, vec![0.0, 1.0, 1.0, 3.0, 4.0]);
        assert_eq!(ys, vec![0.0, 0.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn identical_waits_fall_into_one_bucket() {
        let buckets = wait_time_histogram(&[0.0, 0.0, 0.0]);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].label, "-0.50-0.50");
        assert_eq!(buckets[0].count, 3);
    }

    #[test]
    fn histogram_counts_every_sample() {
        let samples: Vec<f64> = (0..100).map(|i| i as f64 / 10.0).collect();
        let buckets = wait_time_histogram(&samples);
        assert!(buckets.len() > 1);
        assert_eq!(buckets.iter().map(|b| b.count).sum::<u64>(), 100);
        assert_eq!(buckets[0].lower, 0.0);
        assert!((buckets[buckets.len() - 1].upper - 9.9).abs() < 1e-9);
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&sorted, 25.0), 1.75);
        assert_eq!(percentile(&sorted, 75.0), 3.25);
    }
}
