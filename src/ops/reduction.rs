//! Reduction operations for tensor views.

use crate::{
    error::{GruError, Result},
    view::{TensorView, TensorViewMut},
};
use num_traits::Float;

/// Sums `src` over its rows and adds the result into the `[1, cols]` window `dst`.
///
/// This is the batch reduction used for bias gradients: each call accumulates,
/// it never overwrites.
pub fn sum_rows_into<T: Float>(src: &TensorView<'_, T>, dst: &mut TensorViewMut<'_, T>) -> Result<()> {
    if dst.rows() != 1 || dst.cols() != src.cols() {
        return Err(GruError::shape_mismatch(vec![1, src.cols()], dst.shape()));
    }
    let out = dst.row_mut(0);
    for r in 0..src.rows() {
        out.iter_mut().zip(src.row(r)).for_each(|(o, &s)| *o = *o + s);
    }
    Ok(())
}

/// Sum of all elements of a view.
pub fn sum_all<T: Float>(src: &TensorView<'_, T>) -> T {
    (0..src.rows()).fold(T::zero(), |acc, r| {
        src.row(r).iter().fold(acc, |acc, &x| acc + x)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Tensor;

    #[test]
    fn test_sum_rows_accumulates() -> Result<()> {
        let src = Tensor::from_fn(3, 2, |r, c| (r + c) as f64);
        let mut bias_grad = Tensor::full(1, 6, 1.0);
        sum_rows_into(&src.view(), &mut bias_grad.columns_mut(2, 2)?)?;
        // column sums: [0+1+2, 1+2+3] = [3, 6]
        assert_eq!(bias_grad.to_vec(), vec![1.0, 1.0, 4.0, 7.0, 1.0, 1.0]);
        Ok(())
    }

    #[test]
    fn test_sum_all() {
        let src = Tensor::from_fn(2, 3, |r, c| (r * 3 + c) as f32);
        assert_eq!(sum_all(&src.view()), 15.0);
    }
}
