use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::args::parse_duration_text;
use crate::catalog::{Influencer, TaskKind};
use crate::error::ValidationError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub host: Option<String>,
    pub headless: Option<bool>,
    pub users: Option<u64>,
    pub spawn_rate: Option<u64>,
    pub run_time: Option<DurationValue>,
    pub timeout: Option<DurationValue>,
    pub seed: Option<u64>,
    pub web_host: Option<String>,
    pub web_port: Option<u16>,
    pub export_json: Option<String>,
    pub stages: Option<Vec<StageConfig>>,
    pub staking: Option<UserClassConfig>,
    pub realtime: Option<UserClassConfig>,
    /// Per-task weight overrides for the staking user.
    pub tasks: Option<BTreeMap<TaskKind, u64>>,
    pub data: Option<DataConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    pub name: Option<String>,
    pub duration: DurationValue,
    pub users: u64,
    pub spawn_rate: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserClassConfig {
    pub weight: Option<u64>,
    pub wait_min: Option<DurationValue>,
    pub wait_max: Option<DurationValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    pub password: Option<String>,
    pub influencers: Option<Vec<Influencer>>,
    pub search_queries: Option<Vec<String>>,
    /// Whole TWIST; scaled to base units when sent.
    pub stake_amounts: Option<Vec<u64>>,
}

/// Either whole seconds or text with a unit (`"250ms"`, `"2m"`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(0) => Err(ValidationError::DurationZero),
            DurationValue::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            DurationValue::Text(text) => parse_duration_text(text),
        }
    }

    /// Like [`DurationValue::to_duration`] but zero is allowed (think-time
    /// bounds).
    pub(crate) fn to_duration_allow_zero(&self) -> Result<Duration, ValidationError> {
        match self.to_duration() {
            Err(ValidationError::DurationZero) => Ok(Duration::ZERO),
            other => other,
        }
    }
}
