use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use tracing::warn;

use crate::http::HttpMethod;

use super::histogram::LatencyHistogram;
use super::types::{EndpointSnapshot, FailureSnapshot, Outcome, StatsSnapshot, TaskSample};

/// Completed seconds averaged into the current request rate.
const RPS_WINDOW_SECS: u64 = 10;

type EndpointKey = (HttpMethod, &'static str);

/// Latencies are kept in microseconds and every reported field is cut to
/// whole milliseconds the same way.
const MICROS_PER_MILLI: u64 = 1_000;

fn micros_to_millis(micros: u64) -> u64 {
    micros.checked_div(MICROS_PER_MILLI).unwrap_or(0)
}

#[derive(Debug)]
struct EndpointStats {
    requests: u64,
    failures: u64,
    latency_sum_us: u128,
    min_us: Option<u64>,
    max_us: u64,
    histogram: Option<LatencyHistogram>,
}

impl EndpointStats {
    fn new() -> Self {
        let histogram = match LatencyHistogram::new() {
            Ok(histogram) => Some(histogram),
            Err(err) => {
                warn!("Percentiles disabled: {}", err);
                None
            }
        };
        Self {
            requests: 0,
            failures: 0,
            latency_sum_us: 0,
            min_us: None,
            max_us: 0,
            histogram,
        }
    }

    fn record(&mut self, latency_us: u64, success: bool) {
        self.requests = self.requests.saturating_add(1);
        if !success {
            self.failures = self.failures.saturating_add(1);
        }
        self.latency_sum_us = self.latency_sum_us.saturating_add(u128::from(latency_us));
        self.min_us = Some(self.min_us.map_or(latency_us, |min| min.min(latency_us)));
        self.max_us = self.max_us.max(latency_us);
        if let Some(histogram) = self.histogram.as_mut()
            && let Err(err) = histogram.record(latency_us)
        {
            warn!("{}", err);
        }
    }

    fn avg_ms(&self) -> u64 {
        let avg_us = self
            .latency_sum_us
            .checked_div(u128::from(self.requests))
            .unwrap_or(0);
        micros_to_millis(u64::try_from(avg_us).unwrap_or(u64::MAX))
    }

    fn min_ms(&self) -> u64 {
        micros_to_millis(self.min_us.unwrap_or(0))
    }

    fn max_ms(&self) -> u64 {
        micros_to_millis(self.max_us)
    }

    /// Histogram buckets round up, so each percentile is held inside the
    /// observed min..max before conversion.
    fn percentiles(&self) -> (u64, u64, u64) {
        let Some(min_us) = self.min_us else {
            return (0, 0, 0);
        };
        let (p50, p90, p99) = self
            .histogram
            .as_ref()
            .map_or((0, 0, 0), LatencyHistogram::percentiles);
        let bounded = |value: u64| micros_to_millis(value.clamp(min_us, self.max_us));
        (bounded(p50), bounded(p90), bounded(p99))
    }

    fn snapshot(&self, method: HttpMethod, name: &str) -> EndpointSnapshot {
        let (p50_ms, p90_ms, p99_ms) = self.percentiles();
        EndpointSnapshot {
            method,
            name: name.to_owned(),
            requests: self.requests,
            failures: self.failures,
            avg_response_ms: self.avg_ms(),
            min_response_ms: self.min_ms(),
            max_response_ms: self.max_ms(),
            p50_ms,
            p90_ms,
            p99_ms,
        }
    }
}

/// Requests per elapsed second, trimmed to the averaging window.
#[derive(Debug, Default)]
pub struct RpsWindow {
    buckets: VecDeque<(u64, u64)>,
}

impl RpsWindow {
    pub fn record(&mut self, second: u64) {
        let same_second = self.buckets.back().is_some_and(|(last, _)| *last == second);
        if same_second {
            if let Some((_, count)) = self.buckets.back_mut() {
                *count = count.saturating_add(1);
            }
        } else {
            self.buckets.push_back((second, 1));
        }
        let oldest = second.saturating_sub(RPS_WINDOW_SECS);
        while self
            .buckets
            .front()
            .is_some_and(|(bucket, _)| *bucket < oldest)
        {
            self.buckets.pop_front();
        }
    }

    /// Mean rate over the completed seconds before `now_second`, x100.
    ///
    /// In the first second of a run the partial second is used instead.
    #[must_use]
    pub fn current_rps_x100(&self, now_second: u64) -> u64 {
        let span = now_second.min(RPS_WINDOW_SECS);
        if span == 0 {
            return self
                .buckets
                .iter()
                .filter(|(bucket, _)| *bucket == 0)
                .map(|(_, count)| count.saturating_mul(100))
                .sum();
        }
        let start = now_second.saturating_sub(span);
        let total: u64 = self
            .buckets
            .iter()
            .filter(|(bucket, _)| *bucket >= start && *bucket < now_second)
            .map(|(_, count)| *count)
            .sum();
        total.saturating_mul(100).checked_div(span).unwrap_or(0)
    }
}

#[derive(Debug)]
pub struct RunStats {
    endpoints: BTreeMap<EndpointKey, EndpointStats>,
    total: EndpointStats,
    failures: BTreeMap<(HttpMethod, &'static str, String), u64>,
    rps: RpsWindow,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            endpoints: BTreeMap::new(),
            total: EndpointStats::new(),
            failures: BTreeMap::new(),
            rps: RpsWindow::default(),
        }
    }

    /// Fold one sample into the counters; `at` is run time when it arrived.
    pub fn record(&mut self, sample: TaskSample, at: Duration) {
        let latency_us = u64::try_from(sample.response_time.as_micros()).unwrap_or(u64::MAX);
        let success = sample.outcome.is_success();
        self.endpoints
            .entry((sample.method, sample.name))
            .or_insert_with(EndpointStats::new)
            .record(latency_us, success);
        self.total.record(latency_us, success);
        self.rps.record(at.as_secs());

        if let Outcome::Failure { reason } = sample.outcome {
            let count = self
                .failures
                .entry((sample.method, sample.name, reason))
                .or_insert(0);
            *count = count.saturating_add(1);
        }
    }

    #[must_use]
    pub fn snapshot(&self, elapsed: Duration) -> StatsSnapshot {
        let (p50_ms, p90_ms, p99_ms) = self.total.percentiles();
        StatsSnapshot {
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            total_requests: self.total.requests,
            total_failures: self.total.failures,
            avg_response_ms: self.total.avg_ms(),
            min_response_ms: self.total.min_ms(),
            max_response_ms: self.total.max_ms(),
            p50_ms,
            p90_ms,
            p99_ms,
            current_rps_x100: self.rps.current_rps_x100(elapsed.as_secs()),
            endpoints: self
                .endpoints
                .iter()
                .map(|((method, name), stats)| stats.snapshot(*method, name))
                .collect(),
            failures: self
                .failures
                .iter()
                .map(|((method, name, reason), occurrences)| FailureSnapshot {
                    method: *method,
                    name: (*name).to_owned(),
                    reason: reason.clone(),
                    occurrences: *occurrences,
                })
                .collect(),
        }
    }
}
