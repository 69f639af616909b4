use super::*;
use crate::Loss;
use crate::model::Checkpoint;

/// What one rank saw over a full run.
#[derive(Debug, Clone)]
pub struct Report {
    /// Batch-mean loss of every batch this rank processed, in order.
    pub losses: Vec<Loss>,
    /// Optimizer steps taken.
    pub steps: usize,
    /// One per epoch.
    pub evaluations: Vec<Evaluation>,
    /// Trace cycles handed to the profiler handler.
    pub traces: usize,
    /// Final parameters of this rank's replica.
    pub parameters: Checkpoint,
}
