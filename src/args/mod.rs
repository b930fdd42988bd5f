//! CLI argument types and parsing helpers.
mod cli;
mod parsers;
mod types;


pub use cli::LoadArgs;
pub use types::PositiveU64;

pub(crate) use parsers::parse_duration_text;
