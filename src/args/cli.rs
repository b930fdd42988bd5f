use std::time::Duration;

use clap::Parser;

use super::parsers::{parse_duration_arg, parse_positive_u64};
use super::types::PositiveU64;

/// Port the web stats endpoint listens on unless overridden.
pub const DEFAULT_WEB_PORT: u16 = 8089;

#[derive(Debug, Parser, Clone)]
#[clap(
    name = "twist-loadtest",
    version,
    about = "Staged load generator for the TWIST staking, analytics and content API."
)]
pub struct LoadArgs {
    /// Base URL of the API under test (e.g. https://staging.twist.example)
    #[arg(long = "host", short = 'H', env = "TWIST_LOADTEST_HOST", help_heading = "Common Options")]
    pub host: Option<String>,

    /// Run without the web stats endpoint
    #[arg(long = "headless", help_heading = "Common Options")]
    pub headless: bool,

    /// Concurrent users; selects a constant load shape instead of the stages
    #[arg(long = "users", short = 'u', value_parser = parse_positive_u64, help_heading = "Common Options")]
    pub users: Option<PositiveU64>,

    /// Users started per second with --users
    #[arg(
        long = "spawn-rate",
        short = 'r',
        default_value = "1",
        value_parser = parse_positive_u64,
        help_heading = "Common Options"
    )]
    pub spawn_rate: PositiveU64,

    /// Stop after this long with --users (supports ms/s/m/h)
    #[arg(long = "run-time", short = 't', value_parser = parse_duration_arg, help_heading = "Common Options")]
    pub run_time: Option<Duration>,

    /// Address the web stats endpoint binds to
    #[arg(long = "web-host", default_value = "0.0.0.0")]
    pub web_host: String,

    /// Port the web stats endpoint binds to
    #[arg(long = "web-port", default_value_t = DEFAULT_WEB_PORT)]
    pub web_port: u16,

    /// Path to a TOML or JSON config file
    #[arg(long = "config", short = 'c')]
    pub config: Option<String>,

    /// Request timeout (supports ms/s/m/h)
    #[arg(long = "timeout", default_value = "10s", value_parser = parse_duration_arg)]
    pub request_timeout: Duration,

    /// Seed for reproducible user identities and task choices
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Write the final statistics to this JSON file
    #[arg(long = "export-json")]
    pub export_json: Option<String>,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Debug logging
    #[arg(long = "verbose", short = 'v')]
    pub verbose: bool,
}
