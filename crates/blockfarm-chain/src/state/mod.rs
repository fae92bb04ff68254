//! Domain state read from or submitted to the registry contract

pub mod lot;
pub mod roles;

pub use lot::*;
pub use roles::*;
