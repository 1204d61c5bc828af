//! Simulation metrics.

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

const LATENCY_WINDOW: usize = 4096;

/// How a simulated operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The operation went through.
    Applied,
    /// Expected business failure (`Ok(false)`).
    Refused,
    /// Contract violation (`Err`).
    Failed,
}

/// Simulation metrics.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationMetrics {
    /// Operations attempted.
    pub total_operations: u64,
    /// Operations applied.
    pub applied_operations: u64,
    /// Operations refused as an expected failure.
    pub refused_operations: u64,
    /// Operations rejected with an error.
    pub failed_operations: u64,
    /// Events seen on the subscribed streams, by kind.
    pub events_by_kind: BTreeMap<String, u64>,
    /// Events the subscriber missed because it lagged behind.
    pub lagged_events: u64,
    #[serde(skip)]
    latency_samples: VecDeque<u64>,
    #[serde(skip)]
    window: usize,
}

impl SimulationMetrics {
    /// Create new metrics.
    pub fn new() -> Self {
        Self {
            total_operations: 0,
            applied_operations: 0,
            refused_operations: 0,
            failed_operations: 0,
            events_by_kind: BTreeMap::new(),
            lagged_events: 0,
            latency_samples: VecDeque::with_capacity(LATENCY_WINDOW),
            window: LATENCY_WINDOW,
        }
    }

    /// Record the outcome of an operation.
    pub fn record(&mut self, outcome: Outcome, latency_us: u64) {
        self.total_operations += 1;
        match outcome {
            Outcome::Applied => self.applied_operations += 1,
            Outcome::Refused => self.refused_operations += 1,
            Outcome::Failed => self.failed_operations += 1,
        }

        if self.latency_samples.len() == self.window {
            self.latency_samples.pop_front();
        }
        self.latency_samples.push_back(latency_us);
    }

    /// Count an event seen on a stream.
    pub fn record_event(&mut self, kind: &str) {
        *self.events_by_kind.entry(kind.to_string()).or_insert(0) += 1;
    }

    /// Count events lost by a lagging subscriber.
    pub fn record_lag(&mut self, missed: u64) {
        self.lagged_events += missed;
    }

    /// Total events seen.
    pub fn total_events(&self) -> u64 {
        self.events_by_kind.values().sum()
    }

    /// Mean latency over the retained window, in µs.
    pub fn average_latency_us(&self) -> u64 {
        match self.latency_samples.len() as u64 {
            0 => 0,
            n => self.latency_samples.iter().sum::<u64>() / n,
        }
    }

    /// 99th percentile latency over the retained window, in µs.
    pub fn p99_latency_us(&self) -> u64 {
        let mut window: Vec<u64> = self.latency_samples.iter().copied().collect();
        let Some(last) = window.len().checked_sub(1) else {
            return 0;
        };
        window.sort_unstable();
        window[(window.len() * 99 / 100).min(last)]
    }

    /// Share of operations applied.
    pub fn success_rate(&self) -> f64 {
        if self.total_operations == 0 {
            return 0.0;
        }

        self.applied_operations as f64 / self.total_operations as f64
    }
}

impl Default for SimulationMetrics {
    fn default() -> Self {
        Self::new()
    }
}
