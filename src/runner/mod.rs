//! Host engine: polls the load shape and grows or shrinks the user
//! population to match it.
mod population;


use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::catalog::UserClass;
use crate::shape::{LoadShape, ShapeTick};
use crate::shutdown::ShutdownSender;
use crate::user::{UserContext, VirtualUser};

use population::{
    Population, RunningUser, SpawnBudget, apportion, pick_spawn_kind,
    pick_stop_kind,
};

/// How often the shape is polled.
pub const SHAPE_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// How long stopped users get to finish an in-flight request on shutdown.
pub const STOP_GRACE_PERIOD: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// The shape reported its terminal signal.
    Finished,
    /// Shutdown was requested (signal or web stop).
    Interrupted,
}

pub struct Engine {
    shape: LoadShape,
    classes: Vec<Arc<UserClass>>,
    ctx: Arc<UserContext>,
    seed: Option<u64>,
    grace: Duration,
}

impl Engine {
    #[must_use]
    pub fn new(
        shape: LoadShape,
        classes: Vec<UserClass>,
        ctx: Arc<UserContext>,
        seed: Option<u64>,
    ) -> Self {
        Self {
            shape,
            classes: classes.into_iter().map(Arc::new).collect(),
            ctx,
            seed,
            grace: STOP_GRACE_PERIOD,
        }
    }

    #[must_use]
    pub const fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Drive the population until the shape finishes or shutdown is
    /// broadcast, then stop every user.
    ///
    /// When the shape finishes the shutdown is broadcast too, so the other
    /// run tasks (web server, signal handler) wind down with the engine.
    pub async fn run(self, run_start: Instant, shutdown_tx: &ShutdownSender) -> RunEnd {
        let mut shutdown_rx = shutdown_tx.subscribe();
        let weights: Vec<u64> = self.classes.iter().map(|class| class.weight).collect();
        let mut population = Population::new(self.classes.len());
        let mut budget = SpawnBudget::default();
        let mut active_stage = None;
        let mut next_id: u64 = 0;
        let mut ticker = interval(SHAPE_POLL_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let end = loop {
            let interrupted = tokio::select! {
                _ = shutdown_rx.recv() => true,
                _ = ticker.tick() => false,
            };
            if interrupted {
                info!("Shutdown requested; stopping {} users", population.total());
                break RunEnd::Interrupted;
            }

            let target = match self.shape.tick(run_start.elapsed()) {
                ShapeTick::Finished => {
                    info!("Load shape finished; stopping {} users", population.total());
                    drop(shutdown_tx.send(()));
                    break RunEnd::Finished;
                }
                ShapeTick::Active(target) => target,
            };
            if active_stage != Some(target.index) {
                info!(
                    "Stage '{}' active: {} users at {} users/s",
                    target.name, target.target_users, target.spawn_rate
                );
                active_stage = Some(target.index);
            }

            population.reap();
            let desired = apportion(target.target_users, &weights);
            let allowance = budget.allowance(
                target.spawn_rate,
                population.total().abs_diff(target.target_users),
            );
            for _ in 0..allowance {
                let counts = population.counts();
                if population.total() < target.target_users {
                    let Some(kind) = pick_spawn_kind(&desired, &counts) else {
                        break;
                    };
                    next_id = next_id.saturating_add(1);
                    if let Some(user) = self.spawn_user(next_id, kind) {
                        population.push(kind, user);
                    }
                } else {
                    let Some(kind) = pick_stop_kind(&desired, &counts) else {
                        break;
                    };
                    if let Some(id) = population.stop_latest(kind) {
                        debug!("Stopping user {}", id);
                    }
                }
            }
        };

        let aborted = population.shutdown(self.grace).await;
        if aborted > 0 {
            warn!(
                "{} users did not stop within {}ms and were aborted",
                aborted,
                self.grace.as_millis()
            );
        }
        end
    }

    fn spawn_user(&self, id: u64, kind: usize) -> Option<RunningUser> {
        let class = self.classes.get(kind)?;
        let rng = self.seed.map_or_else(StdRng::from_entropy, |seed| {
            StdRng::seed_from_u64(seed.wrapping_add(id))
        });
        let user = VirtualUser::new(id, Arc::clone(class), Arc::clone(&self.ctx), rng);
        let (stop_tx, stop_rx) = oneshot::channel();
        debug!("Spawning user {} ({})", id, class.kind);
        Some(RunningUser {
            id,
            stop_tx,
            task: tokio::spawn(user.run(stop_rx)),
        })
    }
}
