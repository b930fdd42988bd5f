//! Load shape: maps elapsed run time to the active stage's population target.
//!
//! A shape is immutable once built. [`LoadShape::tick`] is a pure function of
//! the elapsed time, so the runner (or anything else) can poll it as often as
//! it likes and always gets the same answer for the same instant.
use std::time::Duration;

use crate::error::{AppError, AppResult, ConfigError};


/// Stage name reported by constant (`--users`) shapes.
pub const CONSTANT_STAGE_NAME: &str = "Constant";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub name: String,
    pub duration: Duration,
    pub target_users: u64,
    /// Users started (or stopped) per second while converging on the target.
    pub spawn_rate: u64,
}

impl Stage {
    #[must_use]
    pub fn new(name: &str, duration: Duration, target_users: u64, spawn_rate: u64) -> Self {
        Self {
            name: name.to_owned(),
            duration,
            target_users,
            spawn_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTarget<'shape> {
    pub index: usize,
    pub name: &'shape str,
    pub target_users: u64,
    pub spawn_rate: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeTick<'shape> {
    Active(StageTarget<'shape>),
    /// Every stage has been consumed; the run should stop.
    Finished,
}

#[derive(Debug, Clone)]
pub enum LoadShape {
    Staged(Vec<Stage>),
    Unbounded {
        name: String,
        target_users: u64,
        spawn_rate: u64,
    },
}

impl LoadShape {
    /// Build a staged shape from an ordered stage list.
    ///
    /// # Errors
    ///
    /// Returns an error when the list is empty or a stage has a zero duration
    /// or zero spawn rate.
    pub fn staged(stages: Vec<Stage>) -> AppResult<Self> {
        if stages.is_empty() {
            return Err(AppError::config(ConfigError::StagesEmpty));
        }
        for (idx, stage) in stages.iter().enumerate() {
            let index = idx.saturating_add(1);
            if stage.duration.is_zero() {
                return Err(AppError::config(ConfigError::StageDurationZero { index }));
            }
            if stage.spawn_rate == 0 {
                return Err(AppError::config(ConfigError::StageSpawnRateZero { index }));
            }
        }
        Ok(Self::Staged(stages))
    }

    /// Build the shape behind `--users/--spawn-rate/--run-time`.
    ///
    /// # Errors
    ///
    /// Returns an error when the spawn rate is zero or the run time is zero.
    pub fn constant(
        target_users: u64,
        spawn_rate: u64,
        run_time: Option<Duration>,
    ) -> AppResult<Self> {
        match run_time {
            Some(duration) => Self::staged(vec![Stage::new(
                CONSTANT_STAGE_NAME,
                duration,
                target_users,
                spawn_rate,
            )]),
            None => {
                if spawn_rate == 0 {
                    return Err(AppError::config(ConfigError::StageSpawnRateZero {
                        index: 1,
                    }));
                }
                Ok(Self::Unbounded {
                    name: CONSTANT_STAGE_NAME.to_owned(),
                    target_users,
                    spawn_rate,
                })
            }
        }
    }

    #[must_use]
    pub fn tick(&self, elapsed: Duration) -> ShapeTick<'_> {
        match self {
            LoadShape::Unbounded {
                name,
                target_users,
                spawn_rate,
            } => ShapeTick::Active(StageTarget {
                index: 0,
                name,
                target_users: *target_users,
                spawn_rate: *spawn_rate,
            }),
            LoadShape::Staged(stages) => {
                let mut remaining = elapsed;
                for (index, stage) in stages.iter().enumerate() {
                    // A fully consumed duration belongs to the next stage.
                    if remaining < stage.duration {
                        return ShapeTick::Active(StageTarget {
                            index,
                            name: &stage.name,
                            target_users: stage.target_users,
                            spawn_rate: stage.spawn_rate,
                        });
                    }
                    remaining = remaining.saturating_sub(stage.duration);
                }
                ShapeTick::Finished
            }
        }
    }

    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        match self {
            LoadShape::Staged(stages) => stages,
            LoadShape::Unbounded { .. } => &[],
        }
    }

    /// One-line summary for the start banner.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            LoadShape::Staged(stages) => format!(
                "{} stages over {}s",
                stages.len(),
                self.total_duration().unwrap_or_default().as_secs()
            ),
            LoadShape::Unbounded {
                target_users,
                spawn_rate,
                ..
            } => format!(
                "{} users at {} users/s until stopped",
                target_users, spawn_rate
            ),
        }
    }

    /// Sum of all stage durations, `None` for shapes that never finish.
    #[must_use]
    pub fn total_duration(&self) -> Option<Duration> {
        match self {
            LoadShape::Staged(stages) => Some(
                stages
                    .iter()
                    .fold(Duration::ZERO, |acc, stage| acc.saturating_add(stage.duration)),
            ),
            LoadShape::Unbounded { .. } => None,
        }
    }
}

/// Warm-up, ramp-up, sustained, spike, recovery and cool-down.
#[must_use]
pub fn default_stages() -> Vec<Stage> {
    vec![
        Stage::new("Warm-up", Duration::from_secs(120), 100, 1),
        Stage::new("Ramp-up", Duration::from_secs(300), 500, 5),
        Stage::new("Sustained", Duration::from_secs(600), 1000, 10),
        Stage::new("Spike", Duration::from_secs(60), 2000, 50),
        Stage::new("Recovery", Duration::from_secs(300), 500, 10),
        Stage::new("Cool-down", Duration::from_secs(120), 0, 5),
    ]
}
