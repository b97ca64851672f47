use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error("failed to encode payload")]
    Encode(#[from] serde_json::Error),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    #[error("invalid configuration for {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
    #[error("configuration error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read order data from {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid order data in {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("page operation failed: {0}")]
    Dom(String),
    #[error("notification handle {0} is not attached")]
    UnknownHandle(u64),
}
