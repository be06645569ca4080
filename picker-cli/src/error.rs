use picker_controller::{cell_config::ConfigError, node::NodeError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("invalid node options")]
    Node(#[from] NodeError),
    #[error("failed to load cell config from {path:?}")]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
    #[error("bundled cell config is broken")]
    IncludedConfig(#[source] ConfigError),
}
