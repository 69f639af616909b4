//! Process group lifecycle and collectives.
//!
//! A [`Manager`] owns at most one [`Group`] at a time. The group is a TCP
//! star: rank 0 accepts one connection per peer and performs reductions in
//! rank order so every rank ends up with bit-identical results.
mod address;
mod collective;
mod group;
mod manager;
mod wire;

pub use address::*;
pub use collective::*;
pub use group::*;
pub use manager::*;
pub use wire::*;
