//! Datasets and their partitioning across ranks.
mod batches;
mod dataset;
mod idx;
mod images;
mod shard;

pub use batches::*;
pub use dataset::*;
pub use idx::*;
pub use images::*;
pub use shard::*;
