//! Per-timestep hidden-state ring.
//!
//! Slot `t` holds the `[batch, unit]` hidden state produced at timestep `t`.
//! The state before timestep 0 is never stored; it is synthesized as zeros.

use crate::{
    error::{GruError, Result},
    ops::add_assign,
    tensor::Tensor,
    view::{TensorView, TensorViewMut},
};
use num_traits::Float;
use tracing::debug;

/// Hidden states `[max_timestep * batch, unit]` and their gradient mirror.
#[derive(Debug, Clone)]
pub struct HiddenStateRing<T> {
    hidden: Tensor<T>,
    grad: Tensor<T>,
    batch: usize,
    max_timestep: usize,
}

impl<T: Float> HiddenStateRing<T> {
    pub fn new(max_timestep: usize, batch: usize, unit: usize) -> Self {
        Self {
            hidden: Tensor::zeros(max_timestep * batch, unit),
            grad: Tensor::zeros(max_timestep * batch, unit),
            batch,
            max_timestep,
        }
    }

    pub fn batch(&self) -> usize {
        self.batch
    }

    pub fn unit(&self) -> usize {
        self.hidden.cols()
    }

    pub fn max_timestep(&self) -> usize {
        self.max_timestep
    }

    fn check(&self, timestep: usize) -> Result<()> {
        if timestep >= self.max_timestep {
            return Err(GruError::TimestepOutOfRange {
                timestep,
                max_timestep: self.max_timestep,
            });
        }
        Ok(())
    }

    /// Hidden state produced at `timestep`.
    pub fn hidden(&self, timestep: usize) -> Result<TensorView<'_, T>> {
        self.check(timestep)?;
        self.hidden.row_block(timestep * self.batch, self.batch)
    }

    /// Copy of the state feeding `timestep`: slot `timestep - 1`, or zeros at 0.
    pub fn prev_hidden(&self, timestep: usize) -> Result<Tensor<T>> {
        self.check(timestep)?;
        match timestep.checked_sub(1) {
            Some(prev) => Ok(self.hidden(prev)?.to_tensor()),
            None => Ok(Tensor::zeros(self.batch, self.unit())),
        }
    }

    /// Writes the hidden state produced at `timestep`.
    pub fn store(&mut self, timestep: usize, state: &TensorView<'_, T>) -> Result<()> {
        self.check(timestep)?;
        let batch = self.batch;
        self.hidden.row_block_mut(timestep * batch, batch)?.assign(state)
    }

    /// Working gradient slot of `timestep`.
    pub fn grad(&self, timestep: usize) -> Result<TensorView<'_, T>> {
        self.check(timestep)?;
        self.grad.row_block(timestep * self.batch, self.batch)
    }

    pub fn grad_mut(&mut self, timestep: usize) -> Result<TensorViewMut<'_, T>> {
        self.check(timestep)?;
        let batch = self.batch;
        self.grad.row_block_mut(timestep * batch, batch)
    }

    /// Adds `contribution` into the gradient slot of `timestep`.
    pub fn accumulate_grad(&mut self, timestep: usize, contribution: &TensorView<'_, T>) -> Result<()> {
        add_assign(&mut self.grad_mut(timestep)?, contribution)
    }

    pub fn zero_grad(&mut self) {
        self.grad.set_zero();
    }

    /// Reallocates both buffers for a new batch size; contents are not kept.
    pub fn set_batch(&mut self, batch: usize) {
        debug!(from = self.batch, to = batch, max_timestep = self.max_timestep, "resizing hidden-state ring");
        self.hidden.resize_rows(self.max_timestep * batch);
        self.grad.resize_rows(self.max_timestep * batch);
        self.batch = batch;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prev_hidden_is_zero_at_first_timestep() -> Result<()> {
        let mut ring = HiddenStateRing::<f32>::new(3, 2, 4);
        ring.store(0, &Tensor::full(2, 4, 1.0).view())?;
        let first = ring.prev_hidden(0)?;
        assert_eq!(first.shape(), [2, 4]);
        assert!(first.as_slice().iter().all(|&x| x == 0.0));
        assert!(ring.prev_hidden(1)?.as_slice().iter().all(|&x| x == 1.0));
        Ok(())
    }

    #[test]
    fn test_slots_are_disjoint() -> Result<()> {
        let mut ring = HiddenStateRing::<f64>::new(3, 2, 2);
        for t in 0..3 {
            ring.store(t, &Tensor::full(2, 2, t as f64).view())?;
        }
        for t in 0..3 {
            assert!(ring.hidden(t)?.row(1).iter().all(|&x| x == t as f64));
        }
        Ok(())
    }

    #[test]
    fn test_gradient_accumulates() -> Result<()> {
        let mut ring = HiddenStateRing::<f32>::new(2, 1, 3);
        let g = Tensor::full(1, 3, 0.5);
        ring.accumulate_grad(1, &g.view())?;
        ring.accumulate_grad(1, &g.view())?;
        assert_eq!(ring.grad(1)?.row(0), &[1.0, 1.0, 1.0]);
        assert_eq!(ring.grad(0)?.row(0), &[0.0, 0.0, 0.0]);
        ring.zero_grad();
        assert_eq!(ring.grad(1)?.row(0), &[0.0, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_out_of_range() {
        let ring = HiddenStateRing::<f32>::new(2, 1, 1);
        assert_eq!(
            ring.hidden(2).unwrap_err(),
            GruError::TimestepOutOfRange { timestep: 2, max_timestep: 2 }
        );
        assert!(ring.prev_hidden(5).is_err());
    }

    #[test]
    fn test_set_batch_keeps_capacity() -> Result<()> {
        let mut ring = HiddenStateRing::<f32>::new(4, 2, 3);
        ring.set_batch(5);
        assert_eq!(ring.batch(), 5);
        assert_eq!(ring.max_timestep(), 4);
        assert_eq!(ring.hidden(3)?.shape(), [5, 3]);
        assert_eq!(ring.grad(3)?.shape(), [5, 3]);
        Ok(())
    }
}
