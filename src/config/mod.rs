//! Run configuration. The command line is parsed by [`Args`] and
//! validated into the typed [`Config`] the training loop consumes.
#[cfg(feature = "cli")]
mod args;
mod settings;

#[cfg(feature = "cli")]
pub use args::*;
pub use settings::*;
