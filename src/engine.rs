use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::events::{Event, ScheduledEvent};
use crate::metrics::MetricsCollector;
use crate::models::{SimConfig, StopCondition};
use crate::pool::ServerPool;
use crate::state::{Customer, CustomerPhase, Diagnostic, RunResult};
use crate::variates::VariateSource;

/// Single-threaded discrete-event run of one queue configuration.
///
/// Customers that find every server busy are parked in a FIFO line. A
/// departure that frees a server hands it to the head of the line right away
/// and schedules that customer's service start at the same instant.
pub struct SimulationEngine {
    config: SimConfig,
    clock: f64,
    events: BinaryHeap<Reverse<ScheduledEvent>>,
    next_seq: u64,
    pool: ServerPool,
    metrics: MetricsCollector,
    variates: VariateSource,
    customers: HashMap<usize, Customer>,
    waiting: VecDeque<usize>,
    admitted: u64,
    target_reached: Option<(f64, usize)>,
    result: Option<RunResult>,
}

impl SimulationEngine {
    pub fn new(config: SimConfig) -> Result<Self> {
        validate_config(&config)?;
        let pool = ServerPool::new(config.servers, config.assignment);
        let metrics = MetricsCollector::new(config.servers);
        let variates = VariateSource::new(config.seed);

        Ok(Self {
            config,
            clock: 0.0,
            events: BinaryHeap::new(),
            next_seq: 0,
            pool,
            metrics,
            variates,
            customers: HashMap::new(),
            waiting: VecDeque::new(),
            admitted: 0,
            target_reached: None,
            result: None,
        })
    }

    /// Runs to the stop condition and summarizes. Later calls return the
    /// same result without advancing the clock.
    pub fn run(&mut self) -> Result<RunResult> {
        if let Some(result) = &self.result {
            return Ok(result.clone());
        }

        debug!(
            servers = self.config.servers,
            arrival = %self.config.arrival,
            service = %self.config.service,
            stop = %self.config.stop,
            seed = ?self.config.seed,
            "starting simulation run"
        );
        self.schedule_next_arrival(0.0)?;

        while let Some(Reverse(next)) = self.events.peek().copied() {
            if let StopCondition::SimTime(limit) = self.config.stop {
                if next.time >= limit {
                    break;
                }
            }
            self.events.pop();
            debug_assert!(
                next.time >= self.clock,
                "clock moved backwards: {} -> {}",
                self.clock,
                next.time
            );
            self.clock = next.time;
            trace!(time = next.time, event = ?next.event, "processing event");

            match next.event {
                Event::Arrival => self.handle_arrival()?,
                Event::ServiceStart {
                    customer_id,
                    server_id,
                } => self.begin_service(customer_id, server_id)?,
                Event::Departure {
                    customer_id,
                    server_id,
                } => self.handle_departure(customer_id, server_id),
            }
        }

        let terminal = match self.config.stop {
            StopCondition::SimTime(limit) => limit,
            StopCondition::CustomerCount(_) => self.clock,
        };
        self.clock = terminal;
        self.metrics.finalize(terminal);
        let result = self.metrics.summarize(terminal);
        debug!(
            total_served = result.total_served,
            sim_duration = result.sim_duration,
            avg_wait_time = result.avg_wait_time,
            "simulation run finished"
        );
        self.result = Some(result.clone());
        Ok(result)
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn pool(&self) -> &ServerPool {
        &self.pool
    }

    /// Customers admitted but not yet departed.
    pub fn in_system(&self) -> usize {
        self.customers.len()
    }

    pub fn admitted(&self) -> u64 {
        self.admitted
    }

    /// Instant the customer-count target was met and how many customers were
    /// still in the system then. `None` under a time limit.
    pub fn target_reached(&self) -> Option<(f64, usize)> {
        self.target_reached
    }

    fn schedule(&mut self, time: f64, event: Event) {
        self.events
            .push(Reverse(ScheduledEvent::new(time, self.next_seq, event)));
        self.next_seq += 1;
    }

    fn schedule_next_arrival(&mut self, from: f64) -> Result<()> {
        let gap = self.variates.next_interarrival(&self.config.arrival)?;
        self.schedule(from + gap, Event::Arrival);
        Ok(())
    }

    fn arrivals_open(&self) -> bool {
        match self.config.stop {
            StopCondition::SimTime(limit) => self.clock < limit,
            StopCondition::CustomerCount(count) => self.metrics.total_served() < count,
        }
    }

    /// The customer arriving now is always admitted; the source only stops
    /// generating further arrivals once the stop condition holds.
    fn handle_arrival(&mut self) -> Result<()> {
        let now = self.clock;
        self.admitted += 1;
        let customer_id = self.admitted as usize;
        if self.arrivals_open() {
            self.schedule_next_arrival(now)?;
        } else {
            debug!(time = now, admitted = self.admitted, "arrival source stopped");
        }

        self.customers
            .insert(customer_id, Customer::arrive(customer_id, now));
        self.metrics.customer_enqueued(now);

        match self.pool.try_acquire() {
            Some(server_id) => self.begin_service(customer_id, server_id),
            None => {
                trace!(customer_id, time = now, "all servers busy, customer waits");
                self.waiting.push_back(customer_id);
                Ok(())
            }
        }
    }

    fn begin_service(&mut self, customer_id: usize, server_id: usize) -> Result<()> {
        let now = self.clock;
        let service_time = self.variates.next_service(&self.config.service)?;
        self.metrics.customer_dequeued(now);
        self.metrics.record_server_busy_start(server_id, now);

        if let Some(customer) = self.customers.get_mut(&customer_id) {
            debug_assert_eq!(customer.phase, CustomerPhase::Waiting);
            customer.service_start = Some(now);
            customer.server_id = Some(server_id);
            customer.phase = CustomerPhase::InService;
        }
        self.schedule(
            now + service_time,
            Event::Departure {
                customer_id,
                server_id,
            },
        );
        Ok(())
    }

    fn handle_departure(&mut self, customer_id: usize, server_id: usize) {
        let now = self.clock;
        self.metrics.record_server_busy_end(server_id, now);

        if let Some(mut customer) = self.customers.remove(&customer_id) {
            debug_assert_eq!(customer.phase, CustomerPhase::InService);
            customer.phase = CustomerPhase::Departed;
            self.metrics.record_customer_served(&customer, now);
        }
        if let StopCondition::CustomerCount(count) = self.config.stop {
            if self.target_reached.is_none() && self.metrics.total_served() >= count {
                self.target_reached = Some((now, self.customers.len()));
                debug!(
                    time = now,
                    in_system = self.customers.len(),
                    "customer-count target reached"
                );
            }
        }

        if self.pool.release(server_id).is_err() {
            self.metrics
                .record_diagnostic(Diagnostic::UnheldRelease { server_id, at: now });
            return;
        }

        while self.pool.free_count() > 0 {
            let Some(next_customer) = self.waiting.pop_front() else {
                break;
            };
            if let Some(free_server) = self.pool.try_acquire() {
                trace!(
                    customer_id = next_customer,
                    server_id = free_server,
                    "handing off freed server"
                );
                self.schedule(
                    now,
                    Event::ServiceStart {
                        customer_id: next_customer,
                        server_id: free_server,
                    },
                );
            }
        }
    }
}

pub fn run_simulation(config: &SimConfig) -> Result<RunResult> {
    let mut engine = SimulationEngine::new(config.clone())?;
    engine.run()
}

pub fn validate_config(config: &SimConfig) -> Result<()> {
    if config.servers == 0 {
        return Err(Error::ServersZero);
    }
    match config.stop {
        StopCondition::SimTime(limit) if !(limit > 0.0 && limit.is_finite()) => {
            return Err(Error::InvalidStopCondition(format!(
                "sim-time must be positive (got {})",
                limit
            )));
        }
        StopCondition::CustomerCount(0) => {
            return Err(Error::InvalidStopCondition(
                "customer-count must be greater than 0".to_string(),
            ));
        }
        _ => {}
    }
    config.arrival.validate()?;
    config.service.validate()?;
    Ok(())
}
