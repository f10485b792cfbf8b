//! IO module - run configuration loading.

mod config;

pub use config::{read_run_config, RunConfig};
