//! Run start/stop hooks and the end-of-run summary.
mod export;
mod format;


use std::io::IsTerminal;

use chrono::{DateTime, Utc};
use crossterm::style::{Color, Stylize};
use tracing::info;

use crate::metrics::StatsSnapshot;

pub use export::export_json;
pub use format::{Line, Tone, fixed_x100, summary_lines};

pub const START_MARKER: &str = "Load test starting...";
pub const STOP_MARKER: &str = "Load test stopping...";

/// What the hooks learn about a run before it starts.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub host: String,
    pub started_at: DateTime<Utc>,
    pub shape: String,
}

pub trait RunHooks: Send + Sync {
    fn on_start(&self, info: &RunInfo);
    fn on_stop(&self, snapshot: &StatsSnapshot);
}

/// Prints the start marker and the final summary to stdout.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleHooks {
    color: bool,
}

impl ConsoleHooks {
    /// Color is used only when allowed and stdout is a terminal.
    #[must_use]
    pub fn new(no_color: bool) -> Self {
        Self {
            color: !no_color && std::io::stdout().is_terminal(),
        }
    }

    fn paint(self, line: &Line) -> String {
        if !self.color {
            return line.text.clone();
        }
        match line.tone {
            Tone::Plain => line.text.clone(),
            Tone::Header => line.text.as_str().bold().to_string(),
            Tone::Good => line.text.as_str().with(Color::Green).to_string(),
            Tone::Bad => line.text.as_str().with(Color::Red).to_string(),
        }
    }
}

impl RunHooks for ConsoleHooks {
    fn on_start(&self, info: &RunInfo) {
        println!("{}", START_MARKER);
        info!(
            "Target {} with {} (started {})",
            info.host,
            info.shape,
            info.started_at.to_rfc3339()
        );
    }

    fn on_stop(&self, snapshot: &StatsSnapshot) {
        for line in summary_lines(snapshot) {
            println!("{}", self.paint(&line));
        }
    }
}
