//! Virtual users: one independent actor per spawned user.
//!
//! A user owns its [`Session`] and RNG outright; the only things shared with
//! other users are the immutable [`UserContext`] and the sample channel
//! inside it.
mod tasks;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::catalog::checks::Check;
use crate::catalog::{CatalogData, UserClass, UserKind};
use crate::http::{ApiRequest, ApiResponse, Transport};
use crate::metrics::{Outcome, SampleRecorder, TaskSample};
use crate::session::Session;

pub use tasks::endpoints;

/// Read-only collaborators shared by every user of a run.
pub struct UserContext {
    pub transport: Arc<dyn Transport>,
    pub data: CatalogData,
    pub recorder: SampleRecorder,
}

pub struct VirtualUser {
    id: u64,
    class: Arc<UserClass>,
    ctx: Arc<UserContext>,
    session: Session,
    rng: StdRng,
}

impl VirtualUser {
    #[must_use]
    pub fn new(id: u64, class: Arc<UserClass>, ctx: Arc<UserContext>, mut rng: StdRng) -> Self {
        let session = Session::new(class.kind, &mut rng);
        Self {
            id,
            class,
            ctx,
            session,
            rng,
        }
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Authenticate, then loop think-time / pick / execute until stopped.
    ///
    /// Stop is honoured while thinking and between iterations; a request that
    /// is already in flight completes first. Dropping the sender also stops
    /// the user.
    pub async fn run(mut self, mut stop_rx: oneshot::Receiver<()>) -> Session {
        debug!(
            "User {} ({}) starting as {}",
            self.id, self.class.kind, self.session.user_id
        );
        self.on_start().await;

        loop {
            let think_time = self.class.think_time.sample(&mut self.rng);
            tokio::select! {
                biased;
                _ = &mut stop_rx => break,
                () = sleep(think_time) => {},
            }

            let Some(task) = self.class.tasks.choose(&mut self.rng).copied() else {
                warn!("User {} has no tasks to run", self.id);
                break;
            };
            self.execute(task).await;
        }

        debug!("User {} ({}) stopped", self.id, self.class.kind);
        self.session
    }

    async fn on_start(&mut self) {
        self.login().await;
        if self.class.kind == UserKind::Realtime {
            self.subscribe();
        }
    }

    /// Send one request, classify it, record the sample and hand back the
    /// check's context on success.
    async fn call<T>(
        &self,
        request: ApiRequest,
        check: fn(&ApiResponse) -> Check<T>,
    ) -> Option<T> {
        let method = request.method;
        let name = request.name;
        let start = Instant::now();
        let result = self.ctx.transport.send(request).await;
        let response_time = start.elapsed();

        let (status, verdict) = match result {
            Ok(response) => (response.status, check(&response)),
            Err(err) => (0, Err(err.to_string())),
        };
        let outcome = match &verdict {
            Ok(_) => Outcome::Success,
            Err(reason) => {
                debug!("{} {} failed for user {}: {}", method, name, self.id, reason);
                Outcome::failure(reason.as_str())
            }
        };
        self.ctx.recorder.record(TaskSample {
            method,
            name,
            status,
            response_time,
            outcome,
        });
        verdict.ok()
    }
}
