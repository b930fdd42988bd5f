//! Task catalog: what each kind of virtual user does and how often.
pub mod checks;
mod weights;


use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, ValidationError};

pub use weights::WeightTable;

/// Stake amounts are whole TWIST; the API takes the smallest unit.
pub const STAKE_SCALE: u64 = 1_000_000_000;
pub const SEARCH_LIMIT: u32 = 20;
pub const TOP_EARNERS_LIMIT: u32 = 10;
pub const CONTENT_ID_MAX: u32 = 100;
pub const STAKING_USER_ID_MAX: u32 = 10_000;
pub const REALTIME_USER_ID_MAX: u32 = 1_000;
pub const DEFAULT_PASSWORD: &str = "Test123456!";

/// Chance (percent) that a successful search opens one of its results.
pub const SEARCH_FOLLOW_UP_PCT: u32 = 50;
/// Chance (percent) that a non-empty portfolio claims rewards on one stake.
pub const PORTFOLIO_CLAIM_PCT: u32 = 30;
/// Chance (percent) that a non-empty content page opens one item.
pub const CONTENT_FOLLOW_UP_PCT: u32 = 40;

/// Number of influencers a realtime user may subscribe to.
const SUBSCRIPTION_CANDIDATES: usize = 2;

const SORT_KEYS: [&str; 3] = ["totalStaked", "stakerCount", "apy"];
const TIME_RANGES: [&str; 3] = ["24h", "7d", "30d"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Search,
    ViewDetails,
    Stake,
    Portfolio,
    ClaimRewards,
    Analytics,
    BrowseContent,
    ViewContentDetails,
    Notifications,
    PollUpdates,
}

impl TaskKind {
    pub const STAKING: [TaskKind; 9] = [
        TaskKind::Search,
        TaskKind::ViewDetails,
        TaskKind::Stake,
        TaskKind::Portfolio,
        TaskKind::ClaimRewards,
        TaskKind::Analytics,
        TaskKind::BrowseContent,
        TaskKind::ViewContentDetails,
        TaskKind::Notifications,
    ];

    #[must_use]
    pub const fn default_weight(self) -> u64 {
        match self {
            TaskKind::Search => 30,
            TaskKind::ViewDetails => 20,
            TaskKind::Stake => 15,
            TaskKind::Portfolio | TaskKind::Analytics => 10,
            TaskKind::ClaimRewards | TaskKind::Notifications => 5,
            TaskKind::BrowseContent => 8,
            TaskKind::ViewContentDetails => 2,
            TaskKind::PollUpdates => 1,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TaskKind::Search => "search",
            TaskKind::ViewDetails => "view_details",
            TaskKind::Stake => "stake",
            TaskKind::Portfolio => "portfolio",
            TaskKind::ClaimRewards => "claim_rewards",
            TaskKind::Analytics => "analytics",
            TaskKind::BrowseContent => "browse_content",
            TaskKind::ViewContentDetails => "view_content_details",
            TaskKind::Notifications => "notifications",
            TaskKind::PollUpdates => "poll_updates",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserKind {
    Staking,
    Realtime,
}

impl UserKind {
    pub const ALL: [UserKind; 2] = [UserKind::Staking, UserKind::Realtime];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            UserKind::Staking => "staking",
            UserKind::Realtime => "realtime",
        }
    }

    #[must_use]
    pub const fn default_think_time(self) -> ThinkTime {
        match self {
            UserKind::Staking => ThinkTime {
                min: Duration::from_secs(1),
                max: Duration::from_secs(5),
            },
            UserKind::Realtime => ThinkTime {
                min: Duration::from_secs(30),
                max: Duration::from_secs(60),
            },
        }
    }
}

impl fmt::Display for UserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform think-time window between two task executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThinkTime {
    min: Duration,
    max: Duration,
}

impl ThinkTime {
    /// # Errors
    ///
    /// Returns an error when `min` is greater than `max`.
    pub fn new(min: Duration, max: Duration) -> AppResult<Self> {
        if min > max {
            return Err(AppError::validation(ValidationError::ThinkTimeInverted {
                min_ms: duration_ms(min),
                max_ms: duration_ms(max),
            }));
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub const fn min(&self) -> Duration {
        self.min
    }

    #[must_use]
    pub const fn max(&self) -> Duration {
        self.max
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min_ms = duration_ms(self.min);
        let max_ms = duration_ms(self.max);
        Duration::from_millis(rng.gen_range(min_ms..=max_ms))
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Everything the runner needs to spawn one kind of user.
#[derive(Debug, Clone)]
pub struct UserClass {
    pub kind: UserKind,
    pub weight: u64,
    pub think_time: ThinkTime,
    pub tasks: WeightTable<TaskKind>,
}

impl UserClass {
    /// Staking user with optional per-task weight overrides.
    ///
    /// # Errors
    ///
    /// Returns an error when an override sets a weight to zero.
    pub fn staking(
        weight: u64,
        think_time: ThinkTime,
        overrides: &BTreeMap<TaskKind, u64>,
    ) -> AppResult<Self> {
        let tasks = WeightTable::new(TaskKind::STAKING.into_iter().map(|task| {
            let task_weight = overrides
                .get(&task)
                .copied()
                .unwrap_or_else(|| task.default_weight());
            (task, task_weight)
        }))?;
        Ok(Self {
            kind: UserKind::Staking,
            weight,
            think_time,
            tasks,
        })
    }

    /// Realtime poller: a single task on a long think time.
    ///
    /// # Errors
    ///
    /// Returns an error if the poll task table cannot be built.
    pub fn realtime(weight: u64, think_time: ThinkTime) -> AppResult<Self> {
        let tasks = WeightTable::new([(
            TaskKind::PollUpdates,
            TaskKind::PollUpdates.default_weight(),
        )])?;
        Ok(Self {
            kind: UserKind::Realtime,
            weight,
            think_time,
            tasks,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Influencer {
    pub id: String,
    pub username: String,
}

impl Influencer {
    fn new(id: &str, username: &str) -> Self {
        Self {
            id: id.to_owned(),
            username: username.to_owned(),
        }
    }
}

/// Fixture data the tasks draw their parameters from.
#[derive(Debug, Clone)]
pub struct CatalogData {
    pub influencers: Vec<Influencer>,
    pub search_queries: Vec<String>,
    pub stake_amounts: Vec<u64>,
    pub password: String,
}

impl Default for CatalogData {
    fn default() -> Self {
        Self {
            influencers: vec![
                Influencer::new("inf-1", "crypto_master"),
                Influencer::new("inf-2", "defi_queen"),
                Influencer::new("inf-3", "nft_artist"),
                Influencer::new("inf-4", "web3_dev"),
                Influencer::new("inf-5", "blockchain_educator"),
            ],
            search_queries: ["crypto", "defi", "nft", "web3", "blockchain", "staking", "yield"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            stake_amounts: vec![1_000, 5_000, 10_000, 25_000, 50_000],
            password: DEFAULT_PASSWORD.to_owned(),
        }
    }
}

impl CatalogData {
    pub fn random_influencer<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Influencer> {
        pick_one(&self.influencers, rng)
    }

    pub fn random_query<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        pick_one(&self.search_queries, rng).map(String::as_str)
    }

    pub fn random_sort_key<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
        pick_one(&SORT_KEYS, rng).copied().unwrap_or("totalStaked")
    }

    pub fn random_time_range<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
        pick_one(&TIME_RANGES, rng).copied().unwrap_or("24h")
    }

    /// Random stake amount in the API's smallest unit.
    pub fn random_stake_amount<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<u64> {
        pick_one(&self.stake_amounts, rng).map(|amount| amount.saturating_mul(STAKE_SCALE))
    }

    /// Realtime users subscribe to one of the first influencers only.
    pub fn random_subscription<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Influencer> {
        let limit = self.influencers.len().min(SUBSCRIPTION_CANDIDATES);
        self.influencers
            .get(..limit)
            .and_then(|candidates| pick_one(candidates, rng))
    }
}

/// Uniform pick from a slice.
pub fn pick_one<'items, T, R: Rng + ?Sized>(items: &'items [T], rng: &mut R) -> Option<&'items T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.gen_range(0..items.len()))
}

/// `true` with the given percent chance.
pub fn roll_percent<R: Rng + ?Sized>(rng: &mut R, percent: u32) -> bool {
    rng.gen_range(0..100u32) < percent
}
