//! Element-wise and reduction operations on tensor views.
//!
//! All operations write in place into a destination window and check shapes
//! up front, so a failed call leaves the destination untouched.

mod elementwise;
mod reduction;

pub use elementwise::*;
pub use reduction::*;
