//! Neural network layers.
//!
//! The GRU cell lives in [`gru`]; [`dropout`] holds the mask buffer it shares
//! between its forward and backward passes.

pub mod dropout;
pub mod gru;

pub use dropout::{DropoutMask, DROPOUT_EPSILON};
pub use gru::*;
