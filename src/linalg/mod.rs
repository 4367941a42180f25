//! Linear algebra operations for tensors.
//! Only the dense product the recurrent cells need is provided here.

mod matmul;

pub use matmul::*;
