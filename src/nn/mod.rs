//! Neural network building blocks.
//! This module provides activations, parameter initializers and recurrent layers.

pub mod activations;
pub mod init;
pub mod layers;

pub use activations::*;
pub use init::*;
