use std::time::Duration;

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::debug;

use super::stats::RunStats;
use super::types::{StatsSnapshot, TaskSample};

/// How often the live snapshot is refreshed.
pub const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(1);

/// Aggregate samples until every recorder is dropped, then return the final
/// snapshot. Live snapshots are published on `snapshot_tx` meanwhile.
#[must_use]
pub fn spawn_collector(
    run_start: Instant,
    mut samples_rx: mpsc::UnboundedReceiver<TaskSample>,
    snapshot_tx: watch::Sender<StatsSnapshot>,
) -> JoinHandle<StatsSnapshot> {
    tokio::spawn(async move {
        let mut stats = RunStats::new();
        let mut publish_interval = tokio::time::interval(SNAPSHOT_INTERVAL);
        publish_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                maybe_sample = samples_rx.recv() => {
                    let Some(sample) = maybe_sample else {
                        break;
                    };
                    stats.record(sample, run_start.elapsed());
                },
                _ = publish_interval.tick() => {
                    snapshot_tx.send_replace(stats.snapshot(run_start.elapsed()));
                },
            }
        }

        let final_snapshot = stats.snapshot(run_start.elapsed());
        debug!(
            "Collector drained: {} requests, {} failures",
            final_snapshot.total_requests, final_snapshot.total_failures
        );
        snapshot_tx.send_replace(final_snapshot.clone());
        final_snapshot
    })
}
