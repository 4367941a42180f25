//! Matrix multiplication over tensor views.

use crate::{
    error::{GruError, Result},
    view::{TensorView, TensorViewMut},
};
use num_traits::Float;

/// General matrix product `C = alpha * op(A) * op(B) + beta * C`.
///
/// `op(X)` is `X` or its transpose depending on `trans_a` / `trans_b`.
/// With `beta == 0` the previous content of `C` is ignored (even if it holds
/// NaN), with `beta == 1` the product is accumulated into `C`.
///
/// # Arguments
/// * `alpha` - Scale applied to the product
/// * `a` - Left operand, `[m, k]` (or `[k, m]` when `trans_a`)
/// * `b` - Right operand, `[k, n]` (or `[n, k]` when `trans_b`)
/// * `beta` - Scale applied to the previous content of `c`
/// * `c` - Output window `[m, n]`
pub fn gemm<T: Float>(
    alpha: T,
    a: &TensorView<'_, T>,
    trans_a: bool,
    b: &TensorView<'_, T>,
    trans_b: bool,
    beta: T,
    c: &mut TensorViewMut<'_, T>,
) -> Result<()> {
    let (m, k) = if trans_a { (a.cols(), a.rows()) } else { (a.rows(), a.cols()) };
    let (kb, n) = if trans_b { (b.cols(), b.rows()) } else { (b.rows(), b.cols()) };

    // Check matrix dimensions are compatible for multiplication
    if k != kb {
        return Err(GruError::shape_mismatch(vec![m, k], vec![kb, n]));
    }
    if c.shape() != [m, n] {
        return Err(GruError::shape_mismatch(vec![m, n], c.shape()));
    }

    let at = |i: usize, l: usize| if trans_a { a.get(l, i) } else { a.get(i, l) };
    let bt = |l: usize, j: usize| if trans_b { b.get(j, l) } else { b.get(l, j) };

    // Naive triple loop; the cell dimensions are small.
    for i in 0..m {
        for j in 0..n {
            let mut sum = T::zero();
            for l in 0..k {
                sum = sum + at(i, l) * bt(l, j);
            }
            let value = if beta == T::zero() {
                alpha * sum
            } else {
                alpha * sum + beta * c.get(i, j)
            };
            c.set(i, j, value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Tensor;
    use approx::assert_relative_eq;

    fn mat(data: &[f64], rows: usize, cols: usize) -> Tensor<f64> {
        Tensor::from_vec(data.to_vec(), rows, cols).unwrap()
    }

    #[test]
    fn test_gemm_plain_product() -> Result<()> {
        let a = mat(&[1.0, 2.0, 3.0, 4.0], 2, 2);
        let b = mat(&[5.0, 6.0, 7.0, 8.0], 2, 2);
        let mut c = Tensor::full(2, 2, f64::NAN);
        gemm(1.0, &a.view(), false, &b.view(), false, 0.0, &mut c.view_mut())?;

        assert_relative_eq!(c[[0, 0]], 19.0);
        assert_relative_eq!(c[[0, 1]], 22.0);
        assert_relative_eq!(c[[1, 0]], 43.0);
        assert_relative_eq!(c[[1, 1]], 50.0);
        Ok(())
    }

    #[test]
    fn test_gemm_transposes_and_accumulates() -> Result<()> {
        // a: [3, 2], b: [3, 2] -> a^T b: [2, 2]
        let a = mat(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, 2);
        let b = mat(&[1.0, 0.0, 0.0, 1.0, 1.0, 1.0], 3, 2);
        let mut c = Tensor::full(2, 2, 1.0);
        gemm(1.0, &a.view(), true, &b.view(), false, 1.0, &mut c.view_mut())?;
        // a^T b = [[1+5, 3+5], [2+6, 4+6]] = [[6, 8], [8, 10]]
        assert_eq!(c.to_vec(), vec![7.0, 9.0, 9.0, 11.0]);

        let mut d = Tensor::zeros(3, 3);
        gemm(2.0, &a.view(), false, &b.view(), true, 0.0, &mut d.view_mut())?;
        // a b^T row 0: [1*1+2*0, 1*0+2*1, 1+2] * 2
        assert_eq!(&d.to_vec()[..3], &[2.0, 4.0, 6.0]);
        Ok(())
    }

    #[test]
    fn test_gemm_into_column_window() -> Result<()> {
        let x = mat(&[1.0, 2.0], 1, 2);
        let w = mat(&[1.0, 0.0, 0.0, 1.0], 2, 2);
        let mut packed = Tensor::full(1, 6, f64::NAN);
        gemm(1.0, &x.view(), false, &w.view(), false, 0.0, &mut packed.columns_mut(2, 2)?)?;
        assert_eq!(packed[[0, 2]], 1.0);
        assert_eq!(packed[[0, 3]], 2.0);
        assert!(packed[[0, 0]].is_nan());
        assert!(packed[[0, 5]].is_nan());
        Ok(())
    }

    #[test]
    fn test_gemm_shape_mismatch() {
        let a = mat(&[1.0; 6], 2, 3);
        let b = mat(&[1.0; 4], 2, 2);
        let mut c = Tensor::zeros(2, 2);
        assert!(gemm(1.0, &a.view(), false, &b.view(), false, 0.0, &mut c.view_mut()).is_err());
    }
}
