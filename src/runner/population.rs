use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::session::Session;

/// Shape polls per second; spawn rates are spread evenly over them.
pub(crate) const TICKS_PER_SECOND: u64 = 10;

/// Split `total` users over class `weights` with the largest remainder
/// method. Ties go to the earlier class.
pub(crate) fn apportion(total: u64, weights: &[u64]) -> Vec<u64> {
    let weight_sum: u128 = weights.iter().copied().map(u128::from).sum();
    if weight_sum == 0 {
        return vec![0; weights.len()];
    }

    let total_wide = u128::from(total);
    let mut shares = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());
    let mut assigned: u128 = 0;
    for (index, weight) in weights.iter().copied().enumerate() {
        let scaled = total_wide.saturating_mul(u128::from(weight));
        let share = scaled.checked_div(weight_sum).unwrap_or(0);
        assigned = assigned.saturating_add(share);
        shares.push(share);
        remainders.push((scaled.checked_rem(weight_sum).unwrap_or(0), index));
    }

    remainders.sort_by(|left, right| right.0.cmp(&left.0).then(left.1.cmp(&right.1)));
    let leftover = usize::try_from(total_wide.saturating_sub(assigned)).unwrap_or(usize::MAX);
    for (_, index) in remainders.into_iter().take(leftover) {
        if let Some(share) = shares.get_mut(index) {
            *share = share.saturating_add(1);
        }
    }

    shares
        .into_iter()
        .map(|share| u64::try_from(share).unwrap_or(u64::MAX))
        .collect()
}

fn largest_gap(over: &[u64], under: &[u64]) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (index, (high, low)) in over.iter().zip(under).enumerate() {
        let gap = high.saturating_sub(*low);
        if gap > 0 && best.is_none_or(|(_, top)| gap > top) {
            best = Some((index, gap));
        }
    }
    best.map(|(index, _)| index)
}

/// Class with the largest shortfall against its desired count.
pub(crate) fn pick_spawn_kind(desired: &[u64], running: &[u64]) -> Option<usize> {
    largest_gap(desired, running)
}

/// Class with the largest excess over its desired count.
pub(crate) fn pick_stop_kind(desired: &[u64], running: &[u64]) -> Option<usize> {
    largest_gap(running, desired)
}

/// Carries fractional spawn credit between ticks, counted in tenths of a user.
#[derive(Debug, Default)]
pub(crate) struct SpawnBudget {
    tenths: u64,
}

impl SpawnBudget {
    /// Users that may be spawned or stopped on this tick.
    ///
    /// Credit beyond the current fraction is dropped once the population
    /// catches up, so a long idle stage does not bank a burst.
    pub(crate) fn allowance(&mut self, spawn_rate: u64, needed: u64) -> u64 {
        if needed == 0 {
            self.tenths = 0;
            return 0;
        }
        self.tenths = self.tenths.saturating_add(spawn_rate);
        let whole = self.tenths.checked_div(TICKS_PER_SECOND).unwrap_or(0);
        let granted = whole.min(needed);
        self.tenths = self
            .tenths
            .saturating_sub(granted.saturating_mul(TICKS_PER_SECOND));
        if granted == needed {
            self.tenths = self.tenths.checked_rem(TICKS_PER_SECOND).unwrap_or(0);
        }
        granted
    }
}

pub(crate) struct RunningUser {
    pub(crate) id: u64,
    pub(crate) stop_tx: oneshot::Sender<()>,
    pub(crate) task: JoinHandle<Session>,
}

/// Live users grouped by class index, newest last.
pub(crate) struct Population {
    running: Vec<Vec<RunningUser>>,
    stopping: Vec<JoinHandle<Session>>,
}

impl Population {
    pub(crate) fn new(kinds: usize) -> Self {
        Self {
            running: (0..kinds).map(|_| Vec::new()).collect(),
            stopping: Vec::new(),
        }
    }

    pub(crate) fn total(&self) -> u64 {
        u64::try_from(self.running.iter().map(Vec::len).sum::<usize>()).unwrap_or(u64::MAX)
    }

    pub(crate) fn counts(&self) -> Vec<u64> {
        self.running
            .iter()
            .map(|users| u64::try_from(users.len()).unwrap_or(u64::MAX))
            .collect()
    }

    pub(crate) fn push(&mut self, kind: usize, user: RunningUser) {
        if let Some(users) = self.running.get_mut(kind) {
            users.push(user);
        }
    }

    /// Signal the most recently spawned user of `kind`; returns its id.
    pub(crate) fn stop_latest(&mut self, kind: usize) -> Option<u64> {
        let user = self.running.get_mut(kind)?.pop()?;
        if user.stop_tx.send(()).is_err() {
            // The user already finished on its own.
        }
        self.stopping.push(user.task);
        Some(user.id)
    }

    /// Forget stopped users whose tasks have completed.
    pub(crate) fn reap(&mut self) {
        self.stopping.retain(|task| !task.is_finished());
    }

    /// Stop everyone and wait up to `grace`; stragglers are aborted.
    /// Returns how many tasks had to be aborted.
    pub(crate) async fn shutdown(self, grace: Duration) -> usize {
        let mut tasks = self.stopping;
        for user in self.running.into_iter().flatten() {
            if user.stop_tx.send(()).is_err() {
                // Already finished.
            }
            tasks.push(user.task);
        }
        if tasks.is_empty() {
            return 0;
        }

        if tokio::time::timeout(grace, join_all(tasks.iter_mut()))
            .await
            .is_ok()
        {
            return 0;
        }
        let mut aborted = 0usize;
        for task in &tasks {
            if !task.is_finished() {
                task.abort();
                aborted = aborted.saturating_add(1);
            }
        }
        aborted
    }
}
