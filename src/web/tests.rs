use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;

use super::{StageView, bind, display_addr, spawn_web, stage_views};
use crate::metrics::StatsSnapshot;
use crate::shape::{LoadShape, default_stages};
use crate::shutdown::shutdown_channel;

fn run_async_test<F>(future: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}

#[test]
fn unbounded_shape_lists_single_open_stage() -> Result<(), String> {
    let shape =
        LoadShape::constant(25, 5, None).map_err(|err| format!("shape failed: {}", err))?;
    let views = stage_views(&shape);
    let expected = vec![StageView {
        name: "Constant".to_owned(),
        duration_secs: None,
        users: 25,
        spawn_rate: 5,
    }];
    if views != expected {
        return Err(format!("Unexpected views {:?}", views));
    }
    Ok(())
}

#[test]
fn ipv6_hosts_are_bracketed_for_display() -> Result<(), String> {
    let cases = [
        ("::", 8089, "[::]:8089"),
        ("::1", 0, "[::1]:0"),
        ("0.0.0.0", 8089, "0.0.0.0:8089"),
        ("localhost", 9000, "localhost:9000"),
    ];
    for (host, port, expected) in cases {
        let shown = display_addr(host, port);
        if shown != expected {
            return Err(format!("{} {} shown as {}", host, port, shown));
        }
    }
    Ok(())
}

#[test]
fn ipv6_literal_host_binds_without_brackets() -> Result<(), String> {
    run_async_test(async {
        match bind("::1", 0).await {
            Ok(listener) => {
                let addr = listener
                    .local_addr()
                    .map_err(|err| format!("local_addr failed: {}", err))?;
                if !addr.is_ipv6() {
                    return Err(format!("Expected an IPv6 listener, got {}", addr));
                }
            }
            // Hosts without IPv6 still must not fail on address parsing.
            Err(err) => {
                let message = err.to_string();
                if !message.contains("[::1]:0") || message.contains("invalid socket address") {
                    return Err(format!("Unexpected bind error {}", message));
                }
            }
        }
        Ok(())
    })
}

#[test]
fn serves_stats_stages_and_stop() -> Result<(), String> {
    run_async_test(async {
        let listener = bind("127.0.0.1", 0)
            .await
            .map_err(|err| format!("bind failed: {}", err))?;
        let addr = listener
            .local_addr()
            .map_err(|err| format!("local_addr failed: {}", err))?;
        let shape = LoadShape::staged(default_stages())
            .map_err(|err| format!("shape failed: {}", err))?;
        let (snapshot_tx, snapshot_rx) = watch::channel(StatsSnapshot::default());
        snapshot_tx.send_replace(StatsSnapshot {
            total_requests: 7,
            ..StatsSnapshot::default()
        });
        let (shutdown_tx, mut shutdown_rx) = shutdown_channel();
        let server = spawn_web(listener, snapshot_rx, stage_views(&shape), &shutdown_tx);

        let client = reqwest::Client::new();
        let base = format!("http://{}", addr);

        let stats: Value = client
            .get(format!("{}/stats", base))
            .send()
            .await
            .map_err(|err| format!("stats request failed: {}", err))?
            .json()
            .await
            .map_err(|err| format!("stats body failed: {}", err))?;
        if stats.get("total_requests").and_then(Value::as_u64) != Some(7) {
            return Err(format!("Unexpected stats {}", stats));
        }

        let stages: Value = client
            .get(format!("{}/stages?pretty=1", base))
            .send()
            .await
            .map_err(|err| format!("stages request failed: {}", err))?
            .json()
            .await
            .map_err(|err| format!("stages body failed: {}", err))?;
        let names: Vec<&str> = stages
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("name").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();
        if names.len() != 6 || names.first() != Some(&"Warm-up") {
            return Err(format!("Unexpected stages {}", stages));
        }

        let missing = client
            .get(format!("{}/nope", base))
            .send()
            .await
            .map_err(|err| format!("404 request failed: {}", err))?;
        if missing.status().as_u16() != 404 {
            return Err(format!("Unexpected status {}", missing.status()));
        }

        let stop = client
            .post(format!("{}/stop", base))
            .send()
            .await
            .map_err(|err| format!("stop request failed: {}", err))?;
        if !stop.status().is_success() {
            return Err(format!("Unexpected stop status {}", stop.status()));
        }
        if shutdown_rx.try_recv().is_err() {
            return Err("Stop did not broadcast shutdown".to_owned());
        }

        tokio::time::timeout(Duration::from_secs(2), server)
            .await
            .map_err(|err| format!("web server did not exit: {}", err))?
            .map_err(|err| format!("web server join failed: {}", err))
    })
}
