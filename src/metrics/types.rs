use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::http::HttpMethod;

/// Classification of one request; feeds the counters only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure { reason: String },
}

impl Outcome {
    #[must_use]
    pub fn failure(reason: impl Into<String>) -> Self {
        Outcome::Failure {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

#[derive(Debug, Clone)]
pub struct TaskSample {
    pub method: HttpMethod,
    pub name: &'static str,
    /// HTTP status, `0` when the transport failed before a response.
    pub status: u16,
    pub response_time: Duration,
    pub outcome: Outcome,
}

/// Cheap, cloneable handle virtual users record samples through.
#[derive(Debug, Clone)]
pub struct SampleRecorder {
    tx: mpsc::UnboundedSender<TaskSample>,
}

impl SampleRecorder {
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TaskSample>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn record(&self, sample: TaskSample) {
        if self.tx.send(sample).is_err() {
            // Collector already finished; late samples are dropped.
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EndpointSnapshot {
    pub method: HttpMethod,
    pub name: String,
    pub requests: u64,
    pub failures: u64,
    pub avg_response_ms: u64,
    pub min_response_ms: u64,
    pub max_response_ms: u64,
    pub p50_ms: u64,
    pub p90_ms: u64,
    pub p99_ms: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailureSnapshot {
    pub method: HttpMethod,
    pub name: String,
    pub reason: String,
    pub occurrences: u64,
}

/// Aggregate counters at one instant of the run.
///
/// Rates are fixed-point with two decimals (`current_rps_x100 = 1234` is
/// 12.34 requests per second).
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub elapsed_ms: u64,
    pub total_requests: u64,
    pub total_failures: u64,
    pub avg_response_ms: u64,
    pub min_response_ms: u64,
    pub max_response_ms: u64,
    pub p50_ms: u64,
    pub p90_ms: u64,
    pub p99_ms: u64,
    pub current_rps_x100: u64,
    pub endpoints: Vec<EndpointSnapshot>,
    pub failures: Vec<FailureSnapshot>,
}
