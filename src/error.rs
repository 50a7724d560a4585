use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid parameter: {name} must be {requirement} (got {value})")]
    InvalidParameter {
        name: &'static str,
        requirement: &'static str,
        value: f64,
    },
    #[error("servers must be greater than 0")]
    ServersZero,
    #[error("invalid stop condition: {0}")]
    InvalidStopCondition(String),
    #[error("invalid server range: min {min} must be >= 1 and <= max {max}")]
    InvalidServerRange { min: usize, max: usize },
    #[error("replications must be greater than 0")]
    ReplicationsZero,
    #[error("inconsistent resource state: server {server_id} {reason}")]
    InconsistentResourceState {
        server_id: usize,
        reason: &'static str,
    },
    #[error("missing required parameter {0}")]
    MissingParameter(&'static str),
    #[error("{0}")]
    ConfigIo(String),
    #[error("{0}")]
    ConfigParse(String),
    #[error("unsupported config format '{0}'")]
    UnsupportedConfigFormat(String),
    #[error("{0}")]
    Cli(String),
    #[error("failed to render output: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, Error>;
