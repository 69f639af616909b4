use crate::Loss;
use std::path::PathBuf;

/// Failure taxonomy of the training core.
///
/// Initialization and teardown failures are fatal to the run: a group that
/// formed partially cannot be repaired, and a rank that bails out of a
/// collective leaves its peers blocked until something external stops them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport unusable or a group already active on this manager.
    #[error("process group initialization failed: {0}")]
    Initialization(String),
    /// An operation that needs an active group was issued without one.
    #[error("invalid process group state: {0}")]
    State(String),
    /// Rejected at configuration time.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("transport: {0}")]
    Transport(#[from] std::io::Error),
    /// A peer sent something the wire protocol does not allow here.
    #[error("protocol violation: {0}")]
    Protocol(String),
    #[error("non-finite loss {loss} in epoch {epoch} at batch {batch}")]
    Numerical { loss: Loss, epoch: usize, batch: usize },
    #[error("checkpoint {path}: {reason}")]
    Checkpoint { path: PathBuf, reason: String },
    #[error("dataset {path}: {reason}")]
    Dataset { path: PathBuf, reason: String },
    #[error("trace export: {0}")]
    Trace(String),
}

pub type Result<T> = std::result::Result<T, Error>;
