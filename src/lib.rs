//! A gated recurrent unit (GRU) cell with backpropagation through time.
//!
//! The crate is organized bottom-up:
//!
//! * [`tensor`] and [`view`]: a dense row-major matrix and borrowed column
//!   windows into it, used to address the packed `[Z | R | G]` gate buffers.
//! * [`linalg`] and [`ops`]: matrix products and in-place element-wise and
//!   reduction kernels over those windows.
//! * [`nn`]: activations, initializers, the dropout mask and the GRU itself.
//!
//! All fallible operations return [`Result`] with a [`GruError`].

pub mod error;
pub mod linalg;
pub mod nn;
pub mod ops;
pub mod tensor;
pub mod view;

pub use error::{GruError, Result};
pub use nn::{
    activations::ActivationKind,
    init::Initializer,
    layers::gru::{
        BackwardSweep, BiasMode, CellDims, GruBias, GruCell, GruCellConfig, GruParameters, HiddenStateRing,
        ResetMode, TiedParameters, UnrolledGru,
    },
};
pub use tensor::Tensor;
pub use view::{TensorView, TensorViewMut};
