use thiserror::Error;

use super::{ProtocolError, ValidationError};

#[derive(Error, Debug)]
pub enum SwarmError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Why a single worker invocation produced no usable handoff.
///
/// Never propagated out of a wave; the dispatcher turns it into a failed handoff.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerFailure {
    #[error("worker error: {0}")]
    Execution(String),
    #[error("worker timed out after {0} ms")]
    Timeout(u64),
    #[error("worker panicked: {0}")]
    Panicked(String),
    #[error("{0}")]
    Protocol(#[from] ProtocolError),
}
