use std::path::PathBuf;

use clap::ArgMatches;
use tracing::info;

use crate::args::LoadArgs;
use crate::config::{
    apply_config, classes_from_config, data_from_config, load_config, stages_from_config,
};
use crate::error::{AppError, AppResult, ValidationError};
use crate::shape::{LoadShape, default_stages};

use super::types::RunPlan;

pub(crate) fn build_plan(mut args: LoadArgs, matches: &ArgMatches) -> AppResult<RunPlan> {
    let config = load_config(args.config.as_deref())?;
    if let Some(config) = config.as_ref() {
        apply_config(&mut args, matches, config)?;
    }

    let Some(host) = args.host.clone() else {
        tracing::error!("Missing host (set --host or provide it in config).");
        return Err(AppError::validation(ValidationError::MissingHost));
    };

    let shape = match args.users {
        Some(users) => LoadShape::constant(users.get(), args.spawn_rate.get(), args.run_time)?,
        None => {
            if args.run_time.is_some() {
                return Err(AppError::validation(ValidationError::RunTimeWithoutUsers));
            }
            let stages = config
                .as_ref()
                .and_then(|config| config.stages.as_deref())
                .map_or_else(|| Ok(default_stages()), stages_from_config)?;
            LoadShape::staged(stages)?
        }
    };
    info!("Load shape: {}", shape.describe());

    Ok(RunPlan {
        host,
        headless: args.headless,
        shape,
        classes: classes_from_config(config.as_ref())?,
        data: data_from_config(config.as_ref().and_then(|config| config.data.as_ref()))?,
        request_timeout: args.request_timeout,
        seed: args.seed,
        web_host: args.web_host,
        web_port: args.web_port,
        export_json: args.export_json.map(PathBuf::from),
        no_color: args.no_color,
    })
}
