//! The per-rank training loop and its evaluation pass.
mod evaluation;
mod report;
mod trainer;

pub use evaluation::*;
pub use report::*;
pub use trainer::*;
