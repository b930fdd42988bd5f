//! Configuration loading and application.
mod apply;
mod loader;
pub mod types;


pub use apply::{apply_config, classes_from_config, data_from_config, stages_from_config};
pub use loader::{DEFAULT_CONFIG_FILES, load_config};

#[cfg(test)]
pub(crate) use loader::load_config_file;
