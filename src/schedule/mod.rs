//! Per-batch and per-epoch schedules. Neither needs any distributed state.
mod accumulation;
mod decay;

pub use accumulation::*;
pub use decay::*;
