mod args;
mod catalog;
mod config;
mod entry;
mod error;
mod http;
mod metrics;
mod report;
mod runner;
mod session;
mod shape;
mod shutdown;
mod system;
mod user;
mod web;

use error::AppResult;

fn main() -> AppResult<()> {
    entry::run()
}
