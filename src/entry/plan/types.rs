use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::{CatalogData, UserClass};
use crate::shape::LoadShape;

/// Everything a run needs, with CLI and config already merged.
#[derive(Debug)]
pub(crate) struct RunPlan {
    pub(crate) host: String,
    pub(crate) headless: bool,
    pub(crate) shape: LoadShape,
    pub(crate) classes: Vec<UserClass>,
    pub(crate) data: CatalogData,
    pub(crate) request_timeout: Duration,
    pub(crate) seed: Option<u64>,
    pub(crate) web_host: String,
    pub(crate) web_port: u16,
    pub(crate) export_json: Option<PathBuf>,
    pub(crate) no_color: bool,
}
