//! Element-wise operations for tensor views.

use crate::{
    error::{GruError, Result},
    view::{TensorView, TensorViewMut},
};
use num_traits::Float;

fn check_same_shape<T: Float>(dst: &TensorViewMut<'_, T>, src: &TensorView<'_, T>) -> Result<()> {
    if dst.shape() != src.shape() {
        return Err(GruError::shape_mismatch(dst.shape(), src.shape()));
    }
    Ok(())
}

/// Apply a function element-wise in place.
pub fn map_inplace<T, F>(dst: &mut TensorViewMut<'_, T>, f: F)
where
    T: Float,
    F: Fn(T) -> T,
{
    for r in 0..dst.rows() {
        dst.row_mut(r).iter_mut().for_each(|x| *x = f(*x));
    }
}

/// `dst = f(dst, src)` element-wise.
pub fn zip_with_inplace<T, F>(dst: &mut TensorViewMut<'_, T>, src: &TensorView<'_, T>, f: F) -> Result<()>
where
    T: Float,
    F: Fn(T, T) -> T,
{
    check_same_shape(dst, src)?;
    for r in 0..dst.rows() {
        let src_row = src.row(r);
        dst.row_mut(r)
            .iter_mut()
            .zip(src_row)
            .for_each(|(d, &s)| *d = f(*d, s));
    }
    Ok(())
}

/// `dst += src`
pub fn add_assign<T: Float>(dst: &mut TensorViewMut<'_, T>, src: &TensorView<'_, T>) -> Result<()> {
    zip_with_inplace(dst, src, |d, s| d + s)
}

/// `dst *= src`
pub fn mul_assign<T: Float>(dst: &mut TensorViewMut<'_, T>, src: &TensorView<'_, T>) -> Result<()> {
    zip_with_inplace(dst, src, |d, s| d * s)
}

/// Adds a `[1, cols]` row vector to every row of `dst`.
pub fn add_row_broadcast<T: Float>(dst: &mut TensorViewMut<'_, T>, bias: &TensorView<'_, T>) -> Result<()> {
    if bias.rows() != 1 || bias.cols() != dst.cols() {
        return Err(GruError::shape_mismatch(vec![1, dst.cols()], bias.shape()));
    }
    let bias_row = bias.row(0);
    for r in 0..dst.rows() {
        dst.row_mut(r)
            .iter_mut()
            .zip(bias_row)
            .for_each(|(d, &b)| *d = *d + b);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Tensor;

    #[test]
    fn test_add_and_mul_on_windows() -> Result<()> {
        let mut packed = Tensor::from_fn(2, 4, |r, c| (r * 4 + c) as f32);
        let ones = Tensor::full(2, 2, 1.0f32);
        let twos = Tensor::full(2, 2, 2.0f32);

        add_assign(&mut packed.columns_mut(0, 2)?, &ones.view())?;
        mul_assign(&mut packed.columns_mut(2, 2)?, &twos.view())?;
        assert_eq!(packed.to_vec(), vec![1.0, 2.0, 4.0, 6.0, 5.0, 6.0, 12.0, 14.0]);
        Ok(())
    }

    #[test]
    fn test_row_broadcast() -> Result<()> {
        let mut dst = Tensor::zeros(3, 2);
        let bias = Tensor::from_vec(vec![0.5f32, -0.5], 1, 2)?;
        add_row_broadcast(&mut dst.view_mut(), &bias.view())?;
        assert_eq!(dst.to_vec(), vec![0.5, -0.5, 0.5, -0.5, 0.5, -0.5]);

        let wrong = Tensor::zeros(1, 3);
        assert!(add_row_broadcast(&mut dst.view_mut(), &wrong.view()).is_err());
        Ok(())
    }

    #[test]
    fn test_shape_mismatch_leaves_destination_untouched() {
        let mut dst = Tensor::full(2, 2, 7.0f32);
        let src = Tensor::zeros(2, 3);
        assert!(add_assign(&mut dst.view_mut(), &src.view()).is_err());
        assert!(dst.as_slice().iter().all(|&x| x == 7.0));
    }
}
