//! Step-sampled profiling.
//!
//! A [`Window`] says which steps are idle, warming up, or recorded. The
//! [`Sampler`] times named spans, keeps them only while recording, and
//! hands each finished cycle to a [`Handler`] on the step that ends it.
mod emitter;
mod sampler;
mod trace;
mod window;

pub use emitter::*;
pub use sampler::*;
pub use trace::*;
pub use window::*;
