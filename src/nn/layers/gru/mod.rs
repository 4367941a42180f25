//! Gated recurrent unit.
//!
//! The cell advances a hidden state by one timestep and, on the way back,
//! propagates a hidden-state gradient one timestep backward. Sequence
//! unrolling is left to the caller; [`UnrolledGru`] is a simple driver.
//!
//! # Example
//!
//! ```
//! use grucell::nn::layers::gru::{GruCellConfig, UnrolledGru};
//! use grucell::Tensor;
//!
//! let config = GruCellConfig::new(4).with_max_timestep(3).with_seed(7);
//! let mut gru = UnrolledGru::<f32>::new(config, &[vec![2, 5]])?;
//! let xs = vec![Tensor::full(2, 5, 0.1); 3];
//! let hs = gru.forward_sequence(&xs, true)?;
//! let dxs = gru.backward_sequence(&xs, &hs)?;
//! assert_eq!(dxs[0].shape(), [2, 5]);
//! # Ok::<(), grucell::GruError>(())
//! ```

mod candidate;
pub mod cell;
pub mod config;
pub mod layout;
pub mod params;
pub mod state;
pub mod sweep;
pub mod unroll;

pub use cell::GruCell;
pub use config::{BiasMode, CellDims, GruCellConfig, ResetMode};
pub use layout::{Gate, GateLayout, NUM_GATE};
pub use params::{GruBias, GruParameters, TiedParameters};
pub use state::HiddenStateRing;
pub use sweep::BackwardSweep;
pub use unroll::UnrolledGru;
