//! Reverse-order gradient accumulation over one sequence.
//!
//! A sweep borrows the tied gradient buffers and the hidden-state ring for
//! the duration of one backward pass. The first timestep it enters (the
//! highest one) zeroes every accumulator; every later timestep must be exactly
//! one lower and only accumulates.

use super::{params::GruParameters, state::HiddenStateRing};
use crate::{
    error::{GruError, Result},
    view::TensorView,
};
use num_traits::Float;
use tracing::debug;

#[derive(Debug)]
pub struct BackwardSweep<'a, T> {
    grads: &'a mut GruParameters<T>,
    ring: &'a mut HiddenStateRing<T>,
    /// Last timestep entered, `None` before the first call.
    current: Option<usize>,
    visited: usize,
}

impl<'a, T: Float> BackwardSweep<'a, T> {
    pub fn new(grads: &'a mut GruParameters<T>, ring: &'a mut HiddenStateRing<T>) -> Self {
        Self {
            grads,
            ring,
            current: None,
            visited: 0,
        }
    }

    /// Moves the sweep to `timestep`.
    ///
    /// On the first call all parameter gradients and the whole hidden-state
    /// gradient ring are zeroed.
    ///
    /// # Errors
    ///
    /// * `TimestepOutOfRange` if `timestep` exceeds the ring capacity.
    /// * `SweepOrder` / `SweepExhausted` if `timestep` is not one below the
    ///   previously entered timestep.
    pub fn enter(&mut self, timestep: usize) -> Result<()> {
        if timestep >= self.ring.max_timestep() {
            return Err(GruError::TimestepOutOfRange {
                timestep,
                max_timestep: self.ring.max_timestep(),
            });
        }
        match self.current {
            None => {
                debug!(timestep, "starting backward sweep, zeroing accumulators");
                self.grads.set_zero();
                self.ring.zero_grad();
            }
            Some(0) => return Err(GruError::SweepExhausted(timestep)),
            Some(prev) if timestep != prev - 1 => {
                return Err(GruError::SweepOrder {
                    expected: prev - 1,
                    actual: timestep,
                })
            }
            Some(_) => {}
        }
        self.current = Some(timestep);
        self.visited += 1;
        Ok(())
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn grads(&self) -> &GruParameters<T> {
        &*self.grads
    }

    pub fn grads_mut(&mut self) -> &mut GruParameters<T> {
        &mut *self.grads
    }

    pub fn ring(&self) -> &HiddenStateRing<T> {
        &*self.ring
    }

    pub fn ring_mut(&mut self) -> &mut HiddenStateRing<T> {
        &mut *self.ring
    }

    /// Adds the gradient flowing out of `timestep` into slot `timestep - 1`.
    ///
    /// The contribution for timestep 0 targets the synthesized zero state and
    /// is dropped.
    pub fn accumulate_prev_hidden(&mut self, timestep: usize, contribution: &TensorView<'_, T>) -> Result<()> {
        match timestep.checked_sub(1) {
            Some(prev) => self.ring.accumulate_grad(prev, contribution),
            None => Ok(()),
        }
    }

    /// Ends the sweep, returning the number of timesteps visited.
    pub fn finish(self) -> usize {
        self.visited
    }
}
