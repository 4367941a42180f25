//! Packed gate layout.
//!
//! Weights, biases, the gate scratch buffer and its gradient all pack the
//! three gates side by side in the fixed column order `[Z | R | G]`, each
//! range exactly `unit` wide.

use crate::{
    error::{GruError, Result},
    view::{TensorView, TensorViewMut},
};
use num_traits::Float;

/// Number of gates packed into every GRU buffer.
pub const NUM_GATE: usize = 3;

/// One of the three logical gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    /// Update gate `Z`
    Update,
    /// Reset gate `R`
    Reset,
    /// Candidate (memory cell) gate `G`
    Memory,
}

impl Gate {
    /// Position of the gate in the packed order.
    pub fn index(self) -> usize {
        match self {
            Gate::Update => 0,
            Gate::Reset => 1,
            Gate::Memory => 2,
        }
    }
}

/// Column addressing for `[Z | R | G]` packed buffers of a given unit size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateLayout {
    unit: usize,
}

impl GateLayout {
    pub fn new(unit: usize) -> Self {
        Self { unit }
    }

    pub fn unit(&self) -> usize {
        self.unit
    }

    /// Width of a packed buffer, `3 * unit`.
    pub fn packed_width(&self) -> usize {
        NUM_GATE * self.unit
    }

    /// First column of `gate`.
    pub fn offset(&self, gate: Gate) -> usize {
        gate.index() * self.unit
    }

    fn check_width(&self, cols: usize) -> Result<()> {
        if cols != self.packed_width() {
            return Err(GruError::InvalidShape(format!(
                "packed gate buffer must be {} columns wide, got {cols}",
                self.packed_width()
            )));
        }
        Ok(())
    }

    /// The `unit`-wide window of `gate`.
    pub fn gate<'a, T: Float>(&self, packed: TensorView<'a, T>, gate: Gate) -> Result<TensorView<'a, T>> {
        self.check_width(packed.cols())?;
        packed.columns(self.offset(gate), self.unit)
    }

    pub fn gate_mut<'a, T: Float>(&self, packed: TensorViewMut<'a, T>, gate: Gate) -> Result<TensorViewMut<'a, T>> {
        self.check_width(packed.cols())?;
        packed.columns_mut(self.offset(gate), self.unit)
    }

    /// The `2 * unit`-wide `[Z | R]` window, which always shares one code path.
    pub fn update_reset<'a, T: Float>(&self, packed: TensorView<'a, T>) -> Result<TensorView<'a, T>> {
        self.check_width(packed.cols())?;
        packed.columns(0, 2 * self.unit)
    }

    pub fn update_reset_mut<'a, T: Float>(&self, packed: TensorViewMut<'a, T>) -> Result<TensorViewMut<'a, T>> {
        self.check_width(packed.cols())?;
        packed.columns_mut(0, 2 * self.unit)
    }
}
