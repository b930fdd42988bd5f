use std::collections::BTreeMap;
use std::time::Duration;

use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::{LoadArgs, PositiveU64};
use crate::catalog::{CatalogData, TaskKind, ThinkTime, UserClass, UserKind};
use crate::error::{AppError, AppResult, ConfigError, ValidationError};
use crate::shape::Stage;

use super::types::{ConfigFile, DataConfig, DurationValue, StageConfig, UserClassConfig};

/// Class weight used when the config does not set one.
const DEFAULT_CLASS_WEIGHT: u64 = 1;

/// Flags given on the command line or through their env var beat the config.
fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(ValueSource::CommandLine | ValueSource::EnvVariable)
    )
}

fn ensure_positive(value: u64, field: &str) -> AppResult<PositiveU64> {
    PositiveU64::try_from(value).ok().ok_or_else(|| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
        })
    })
}

fn duration_field(value: &DurationValue, field: &str) -> AppResult<Duration> {
    value.to_duration().map_err(|err| {
        AppError::config(ConfigError::InvalidDuration {
            field: field.to_owned(),
            source: err,
        })
    })
}

/// Applies scalar configuration values to CLI arguments that were not set
/// explicitly.
///
/// # Errors
///
/// Returns an error when a config value is out of range.
pub fn apply_config(args: &mut LoadArgs, matches: &ArgMatches, config: &ConfigFile) -> AppResult<()> {
    if !is_cli(matches, "host")
        && let Some(host) = config.host.clone()
    {
        args.host = Some(host);
    }

    if !is_cli(matches, "headless")
        && let Some(headless) = config.headless
    {
        args.headless = headless;
    }

    if !is_cli(matches, "users")
        && let Some(users) = config.users
    {
        args.users = Some(ensure_positive(users, "users")?);
    }

    if !is_cli(matches, "spawn_rate")
        && let Some(spawn_rate) = config.spawn_rate
    {
        args.spawn_rate = ensure_positive(spawn_rate, "spawn_rate")?;
    }

    if !is_cli(matches, "run_time")
        && let Some(run_time) = config.run_time.as_ref()
    {
        args.run_time = Some(duration_field(run_time, "run_time")?);
    }

    if !is_cli(matches, "request_timeout")
        && let Some(timeout) = config.timeout.as_ref()
    {
        args.request_timeout = duration_field(timeout, "timeout")?;
    }

    if !is_cli(matches, "seed")
        && let Some(seed) = config.seed
    {
        args.seed = Some(seed);
    }

    if !is_cli(matches, "web_host")
        && let Some(web_host) = config.web_host.clone()
    {
        args.web_host = web_host;
    }

    if !is_cli(matches, "web_port")
        && let Some(web_port) = config.web_port
    {
        args.web_port = web_port;
    }

    if !is_cli(matches, "export_json")
        && let Some(path) = config.export_json.clone()
    {
        args.export_json = Some(path);
    }

    Ok(())
}

/// Converts `[[stages]]` entries; indexes in errors are 1-based.
///
/// # Errors
///
/// Returns an error for an empty list, zero durations or zero spawn rates.
pub fn stages_from_config(stages: &[StageConfig]) -> AppResult<Vec<Stage>> {
    if stages.is_empty() {
        return Err(AppError::config(ConfigError::StagesEmpty));
    }

    let mut converted = Vec::with_capacity(stages.len());
    for (offset, stage) in stages.iter().enumerate() {
        let index = offset.saturating_add(1);
        let duration = match stage.duration.to_duration() {
            Ok(duration) => duration,
            Err(ValidationError::DurationZero) => {
                return Err(AppError::config(ConfigError::StageDurationZero { index }));
            }
            Err(err) => {
                return Err(AppError::config(ConfigError::InvalidDuration {
                    field: format!("stages[{}].duration", index),
                    source: err,
                }));
            }
        };
        if stage.spawn_rate == 0 {
            return Err(AppError::config(ConfigError::StageSpawnRateZero { index }));
        }
        let name = stage
            .name
            .clone()
            .unwrap_or_else(|| format!("Stage {}", index));
        converted.push(Stage {
            name,
            duration,
            target_users: stage.users,
            spawn_rate: stage.spawn_rate,
        });
    }
    Ok(converted)
}

fn think_time(
    kind: UserKind,
    section: Option<&UserClassConfig>,
    name: &'static str,
) -> AppResult<ThinkTime> {
    let defaults = kind.default_think_time();
    let Some(section) = section else {
        return Ok(defaults);
    };

    let bound = |value: Option<&DurationValue>, field: &str, fallback: Duration| {
        value.map_or(Ok(fallback), |value| {
            value.to_duration_allow_zero().map_err(|err| {
                AppError::config(ConfigError::InvalidDuration {
                    field: format!("{}.{}", name, field),
                    source: err,
                })
            })
        })
    };
    let min = bound(section.wait_min.as_ref(), "wait_min", defaults.min())?;
    let max = bound(section.wait_max.as_ref(), "wait_max", defaults.max())?;
    if min > max {
        return Err(AppError::config(ConfigError::WaitRangeInverted {
            section: name,
        }));
    }
    ThinkTime::new(min, max)
}

fn class_weight(section: Option<&UserClassConfig>, field: &str) -> AppResult<u64> {
    section
        .and_then(|section| section.weight)
        .map_or(Ok(DEFAULT_CLASS_WEIGHT), |weight| {
            ensure_positive(weight, field).map(PositiveU64::get)
        })
}

/// Builds the staking and realtime user classes, in that order.
///
/// # Errors
///
/// Returns an error for zero weights or inverted think-time windows.
pub fn classes_from_config(config: Option<&ConfigFile>) -> AppResult<Vec<UserClass>> {
    let overrides: BTreeMap<TaskKind, u64> = config
        .and_then(|config| config.tasks.clone())
        .unwrap_or_default();
    if let Some((task, _)) = overrides.iter().find(|(_, weight)| **weight == 0) {
        return Err(AppError::config(ConfigError::TaskWeightZero {
            task: task.to_string(),
        }));
    }
    if let Some(task) = overrides.keys().find(|task| !TaskKind::STAKING.contains(task)) {
        return Err(AppError::config(ConfigError::TaskNotWeighted {
            task: task.to_string(),
        }));
    }

    let staking_section = config.and_then(|config| config.staking.as_ref());
    let realtime_section = config.and_then(|config| config.realtime.as_ref());
    let staking = UserClass::staking(
        class_weight(staking_section, "staking.weight")?,
        think_time(UserKind::Staking, staking_section, "staking")?,
        &overrides,
    )?;
    let realtime = UserClass::realtime(
        class_weight(realtime_section, "realtime.weight")?,
        think_time(UserKind::Realtime, realtime_section, "realtime")?,
    )?;
    Ok(vec![staking, realtime])
}

fn ensure_non_empty<T>(items: &[T], field: &'static str) -> AppResult<()> {
    if items.is_empty() {
        return Err(AppError::config(ConfigError::DataListEmpty { field }));
    }
    Ok(())
}

/// Fixture data with `[data]` overrides applied.
///
/// # Errors
///
/// Returns an error when an overriding list is empty.
pub fn data_from_config(data: Option<&DataConfig>) -> AppResult<CatalogData> {
    let mut catalog = CatalogData::default();
    let Some(data) = data else {
        return Ok(catalog);
    };

    if let Some(password) = data.password.as_ref() {
        catalog.password.clone_from(password);
    }
    if let Some(influencers) = data.influencers.as_ref() {
        ensure_non_empty(influencers, "influencers")?;
        catalog.influencers.clone_from(influencers);
    }
    if let Some(queries) = data.search_queries.as_ref() {
        ensure_non_empty(queries, "search_queries")?;
        catalog.search_queries.clone_from(queries);
    }
    if let Some(amounts) = data.stake_amounts.as_ref() {
        ensure_non_empty(amounts, "stake_amounts")?;
        catalog.stake_amounts.clone_from(amounts);
    }
    Ok(catalog)
}
