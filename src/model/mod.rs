//! Model collaborators and the data-parallel replica wrapper.
mod adadelta;
mod checkpoint;
mod gradients;
mod linear;
mod model;
mod optimizer;
mod parameter;
mod replicated;

pub use adadelta::*;
pub use checkpoint::*;
pub use gradients::*;
pub use linear::*;
pub use model::*;
pub use optimizer::*;
pub use parameter::*;
pub use replicated::*;
