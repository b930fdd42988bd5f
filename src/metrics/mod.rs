//! Sample recording, aggregation and snapshots.
mod collector;
mod histogram;
mod stats;
mod types;


pub use collector::{SNAPSHOT_INTERVAL, spawn_collector};
pub use histogram::LatencyHistogram;
pub use stats::{RpsWindow, RunStats};
pub use types::{
    EndpointSnapshot, FailureSnapshot, Outcome, SampleRecorder, StatsSnapshot, TaskSample,
};
