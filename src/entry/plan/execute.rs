use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::AppResult;
use crate::http::ReqwestTransport;
use crate::metrics::{SampleRecorder, StatsSnapshot, spawn_collector};
use crate::report::{ConsoleHooks, RunHooks, RunInfo, export_json};
use crate::runner::{Engine, RunEnd};
use crate::shutdown::{shutdown_channel, spawn_signal_listener};
use crate::user::UserContext;
use crate::web::{bind, spawn_web, stage_views};

use super::types::RunPlan;

pub(crate) async fn execute_plan(plan: RunPlan) -> AppResult<()> {
    let transport = Arc::new(ReqwestTransport::new(&plan.host, plan.request_timeout)?);
    let hooks = ConsoleHooks::new(plan.no_color);
    let (shutdown_tx, _) = shutdown_channel();
    let (recorder, samples_rx) = SampleRecorder::channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(StatsSnapshot::default());

    // Bind before anything starts so a taken port fails the run up front.
    let web_handle = if plan.headless {
        None
    } else {
        let listener = bind(&plan.web_host, plan.web_port).await?;
        Some(spawn_web(
            listener,
            snapshot_rx,
            stage_views(&plan.shape),
            &shutdown_tx,
        ))
    };
    let signal_handle = spawn_signal_listener(&shutdown_tx);

    hooks.on_start(&RunInfo {
        host: plan.host.clone(),
        started_at: Utc::now(),
        shape: plan.shape.describe(),
    });

    let run_start = Instant::now();
    let collector = spawn_collector(run_start, samples_rx, snapshot_tx);
    let ctx = Arc::new(UserContext {
        transport,
        data: plan.data,
        recorder,
    });

    let end = Engine::new(plan.shape, plan.classes, ctx, plan.seed)
        .run(run_start, &shutdown_tx)
        .await;
    match end {
        RunEnd::Finished => debug!("Load shape finished"),
        RunEnd::Interrupted => info!("Run interrupted"),
    }

    // Every recorder went away with the engine, so the collector drains.
    let snapshot = collector.await?;

    if shutdown_tx.send(()).is_err() {
        // No subscribers left.
    }
    if let Some(handle) = web_handle {
        handle.await?;
    }
    signal_handle.await?;

    hooks.on_stop(&snapshot);

    if let Some(path) = plan.export_json.as_deref() {
        export_json(path, &snapshot).await?;
        info!("Stats exported to {}", path.display());
    }

    Ok(())
}
