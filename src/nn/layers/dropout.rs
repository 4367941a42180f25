//! Dropout mask used by recurrent cells.
//!
//! A recurrent cell samples a fresh mask on every training forward call and
//! must apply the *same* mask to the gradient on the way back, so the mask is
//! a buffer owned by the cell rather than a stateless layer.

use crate::{
    error::{GruError, Result},
    ops::mul_assign,
    tensor::Tensor,
    view::TensorViewMut,
};
use num_traits::Float;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Bernoulli, Distribution};

/// Rates at or below this threshold disable dropout entirely.
pub const DROPOUT_EPSILON: f32 = 1e-3;

/// Dropout mask.
///
/// Each element is zero with probability `rate`; the remaining elements are
/// scaled by `1/(1-rate)` so the expected activation is unchanged.
#[derive(Debug)]
pub struct DropoutMask<T> {
    /// The sampled mask `[batch, unit]`
    mask: Tensor<T>,

    /// Random number generator
    rng: StdRng,
}

impl<T: Float> DropoutMask<T> {
    /// Creates a new mask buffer.
    ///
    /// # Arguments
    /// * `batch` - Number of rows
    /// * `unit` - Number of columns
    /// * `seed` - Optional random seed for reproducibility
    pub fn new(batch: usize, unit: usize, seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(|| rand::random());
        Self {
            mask: Tensor::full(batch, unit, T::one()),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draws a fresh mask for the given drop probability.
    ///
    /// # Errors
    ///
    /// Returns an error if `rate` is not in `[0, 1)`.
    pub fn resample(&mut self, rate: f32) -> Result<()> {
        if !(0.0..1.0).contains(&rate) {
            return Err(GruError::InvalidConfig(format!(
                "dropout rate must be in range [0, 1), got {rate}"
            )));
        }
        let keep = Bernoulli::new(1.0 - f64::from(rate))
            .map_err(|e| GruError::InvalidConfig(format!("dropout rate {rate}: {e}")))?;
        let scale = T::from(1.0 / (1.0 - f64::from(rate))).unwrap_or_else(T::one);
        let rng = &mut self.rng;
        self.mask
            .as_mut_slice()
            .iter_mut()
            .for_each(|m| *m = if keep.sample(&mut *rng) { scale } else { T::zero() });
        Ok(())
    }

    /// Multiplies `target` in place by the current mask.
    pub fn apply(&self, target: &mut TensorViewMut<'_, T>) -> Result<()> {
        mul_assign(target, &self.mask.view())
    }

    /// Reallocates the mask for a new batch size.
    pub fn resize(&mut self, batch: usize) {
        self.mask.resize_rows(batch);
        self.mask.fill(T::one());
    }

    pub fn mask(&self) -> &Tensor<T> {
        &self.mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_values_are_zero_or_scaled() -> Result<()> {
        let mut mask = DropoutMask::<f32>::new(4, 8, Some(42));
        mask.resample(0.5)?;
        assert!(mask.mask().as_slice().iter().all(|&m| m == 0.0 || m == 2.0));
        assert!(mask.mask().as_slice().iter().any(|&m| m == 0.0));
        assert!(mask.mask().as_slice().iter().any(|&m| m == 2.0));
        Ok(())
    }

    #[test]
    fn test_same_seed_same_mask() -> Result<()> {
        let mut a = DropoutMask::<f64>::new(3, 5, Some(9));
        let mut b = DropoutMask::<f64>::new(3, 5, Some(9));
        a.resample(0.3)?;
        b.resample(0.3)?;
        assert_eq!(a.mask(), b.mask());
        Ok(())
    }

    #[test]
    fn test_apply_and_resize() -> Result<()> {
        let mut mask = DropoutMask::<f32>::new(2, 3, Some(1));
        mask.resample(0.25)?;
        let mut x = Tensor::full(2, 3, 3.0f32);
        mask.apply(&mut x.view_mut())?;
        for (m, v) in mask.mask().as_slice().iter().zip(x.as_slice()) {
            assert_eq!(*v, 3.0 * m);
        }

        mask.resize(5);
        assert_eq!(mask.mask().shape(), [5, 3]);
        assert!(mask.apply(&mut x.view_mut()).is_err());
        Ok(())
    }

    #[test]
    fn test_invalid_rate() {
        let mut mask = DropoutMask::<f32>::new(1, 1, Some(0));
        assert!(mask.resample(1.0).is_err());
        assert!(mask.resample(-0.1).is_err());
    }
}
