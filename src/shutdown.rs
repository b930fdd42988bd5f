//! Run-wide stop broadcast and the OS signal listener feeding it.
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

pub type ShutdownSender = broadcast::Sender<()>;
pub type ShutdownReceiver = broadcast::Receiver<()>;

/// A single stop is ever sent; later sends are no-ops for late subscribers.
const SHUTDOWN_CHANNEL_CAPACITY: usize = 1;

#[must_use]
pub fn shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    broadcast::channel::<()>(SHUTDOWN_CHANNEL_CAPACITY)
}

/// Translate Ctrl+C (and SIGTERM on unix) into a shutdown broadcast.
///
/// The task also exits once anyone else broadcasts shutdown.
#[must_use]
pub fn spawn_signal_listener(shutdown_tx: &ShutdownSender) -> JoinHandle<()> {
    let shutdown_tx = shutdown_tx.clone();
    let mut shutdown_rx = shutdown_tx.subscribe();
    tokio::spawn(async move {
        #[cfg(unix)]
        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(stream) => Some(stream),
            Err(err) => {
                warn!("Failed to register SIGTERM handler: {}", err);
                None
            }
        };
        #[cfg(unix)]
        let terminated = async {
            match terminate.as_mut() {
                Some(stream) => {
                    stream.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        };
        #[cfg(not(unix))]
        let terminated = std::future::pending::<()>();

        tokio::select! {
            _ = shutdown_rx.recv() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, stopping load test");
                drop(shutdown_tx.send(()));
            }
            () = terminated => {
                info!("SIGTERM received, stopping load test");
                drop(shutdown_tx.send(()));
            }
        }
    })
}
