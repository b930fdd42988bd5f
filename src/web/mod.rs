//! Read-only stats endpoint with a remote stop switch.
//!
//! `GET /stats` returns the latest published snapshot, `GET /stages` the
//! configured schedule and `POST /stop` broadcasts shutdown. Everything else
//! is a JSON 404.
mod http;

#[cfg(test)]
mod tests;

use std::net::Ipv6Addr;
use std::sync::Arc;

use serde::Serialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, HttpError};
use crate::metrics::StatsSnapshot;
use crate::shape::LoadShape;
use crate::shutdown::ShutdownSender;

use http::{read_request, write_error, write_json};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageView {
    pub name: String,
    /// `None` for a shape that runs until stopped.
    pub duration_secs: Option<u64>,
    pub users: u64,
    pub spawn_rate: u64,
}

#[must_use]
pub fn stage_views(shape: &LoadShape) -> Vec<StageView> {
    match shape {
        LoadShape::Staged(stages) => stages
            .iter()
            .map(|stage| StageView {
                name: stage.name.clone(),
                duration_secs: Some(stage.duration.as_secs()),
                users: stage.target_users,
                spawn_rate: stage.spawn_rate,
            })
            .collect(),
        LoadShape::Unbounded {
            name,
            target_users,
            spawn_rate,
        } => vec![StageView {
            name: name.clone(),
            duration_secs: None,
            users: *target_users,
            spawn_rate: *spawn_rate,
        }],
    }
}

#[derive(Serialize)]
struct StopAck {
    status: &'static str,
}

struct WebState {
    snapshot_rx: watch::Receiver<StatsSnapshot>,
    stages: Vec<StageView>,
    shutdown_tx: ShutdownSender,
}

/// `host:port` for display, with IPv6 literals bracketed.
#[must_use]
pub fn display_addr(host: &str, port: u16) -> String {
    if host.parse::<Ipv6Addr>().is_ok() {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Bind `host` and `port` separately so IPv6 literals such as `::` work.
///
/// # Errors
///
/// Returns an error when the address cannot be bound.
pub async fn bind(host: &str, port: u16) -> AppResult<TcpListener> {
    TcpListener::bind((host, port)).await.map_err(|err| {
        AppError::http(HttpError::BindWeb {
            addr: display_addr(host, port),
            source: err,
        })
    })
}

/// Serve until shutdown is broadcast.
pub fn spawn_web(
    listener: TcpListener,
    snapshot_rx: watch::Receiver<StatsSnapshot>,
    stages: Vec<StageView>,
    shutdown_tx: &ShutdownSender,
) -> JoinHandle<()> {
    let mut shutdown_rx = shutdown_tx.subscribe();
    let state = Arc::new(WebState {
        snapshot_rx,
        stages,
        shutdown_tx: shutdown_tx.clone(),
    });
    if let Ok(addr) = listener.local_addr() {
        info!("Web stats listening on http://{}", addr);
    }

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer)) => {
                        debug!("Web connection from {}", peer);
                        tokio::spawn(handle_connection(socket, Arc::clone(&state)));
                    }
                    Err(err) => debug!("Web accept failed: {}", err),
                },
            }
        }
    })
}

async fn handle_connection(mut socket: TcpStream, state: Arc<WebState>) {
    let request = match read_request(&mut socket).await {
        Ok(request) => request,
        Err(err) => {
            if let Err(write_err) = write_error(&mut socket, err.status, &err.message).await {
                debug!("Web error response not delivered: {}", write_err);
            }
            return;
        }
    };

    let written = match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/stats") => {
            let snapshot = state.snapshot_rx.borrow().clone();
            write_json(&mut socket, 200, &snapshot).await
        }
        ("GET", "/stages") => write_json(&mut socket, 200, &state.stages).await,
        ("POST", "/stop") => {
            info!("Stop requested over web endpoint");
            drop(state.shutdown_tx.send(()));
            write_json(&mut socket, 200, &StopAck { status: "stopping" }).await
        }
        _ => write_error(&mut socket, 404, "Not found").await,
    };
    if let Err(err) = written {
        debug!("Web response not delivered: {}", err);
    }
}
