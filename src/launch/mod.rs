//! Process launch for the `trainer` binary.
mod mode;

pub use mode::*;
