use std::time::Duration;

use thiserror::Error;

/// Errors produced by the workload bodies themselves. These are treated as a
/// black box by the engine: logged, counted, never retried.
pub type OpError = Box<dyn std::error::Error + Send + Sync>;

/// Fatal errors: invalid configuration, a workload that cannot start, or a
/// setup that cannot complete. Any of these terminates the process.
#[derive(Debug, Error)]
pub enum Error {
    #[error("the probability matrix must be a square array with dimensions equal to the number of workload functions ({expected})")]
    MatrixShape { expected: usize },

    #[error("probability matrix row {row} does not sum to 1 (sums to {sum})")]
    RowSum { row: usize, sum: f64 },

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("unknown workload type: {0}")]
    UnknownWorkload(String),

    #[error("ramp time cannot be greater than half of the total run time")]
    RampTooLong,

    #[error("sleep must be at least {min:?}, got {got:?}; to raise throughput, add users, not shrink sleep")]
    SleepTooShort { min: Duration, got: Duration },

    #[error("only-operation and markov-chain cannot both be set")]
    ConflictingChain,

    #[error("number of users must be at least 1")]
    NoUsers,

    #[error("run time must be greater than zero")]
    NoRunTime,

    #[error("failed to read config file: {0}")]
    ConfigRead(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("data load failed: {0}")]
    Load(#[from] StoreError),

    #[error("workload setup failed: {0}")]
    Setup(String),
}

/// Errors surfaced by a [`crate::store::DocumentStore`] implementation.
///
/// `Unavailable` is special cased during setup: an optional auxiliary service
/// (e.g. a search index when no search traffic will run) being down is a
/// warning, not a fatal error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected index state for {index}: {state}")]
    IndexState { index: String, state: String },

    #[error("{0}")]
    Backend(String),
}
