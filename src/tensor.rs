//! Dense row-major matrix type used by the recurrent cells.
//!
//! Every buffer the GRU cell touches (weights, biases, gate scratch, the
//! hidden-state ring) is a 2-D `Tensor`. Sub-regions are accessed through the
//! borrowed views in [`crate::view`], never by copying unless a computation
//! genuinely needs an owned temporary.

use crate::{
    error::{GruError, Result},
    view::{TensorView, TensorViewMut},
};
use num_traits::Float;
use std::ops::{Index, IndexMut};

/// An owned, contiguous, row-major 2-D tensor.
///
/// # Type Parameters
///
/// * `T`: The floating point element type.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: Float> Tensor<T> {
    /// Creates a tensor of the given shape filled with zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![T::zero(); rows * cols],
            rows,
            cols,
        }
    }

    /// Creates a tensor of the given shape filled with `value`.
    pub fn full(rows: usize, cols: usize, value: T) -> Self {
        Self {
            data: vec![value; rows * cols],
            rows,
            cols,
        }
    }

    /// Creates a new tensor from row-major data.
    ///
    /// # Errors
    ///
    /// Returns an error if the data length does not match `rows * cols`.
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(GruError::shape_mismatch(vec![rows * cols], vec![data.len()]));
        }
        Ok(Self { data, rows, cols })
    }

    /// Creates a tensor by evaluating `f(row, col)` for every element.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(f(r, c));
            }
        }
        Self { data, rows, cols }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns `[rows, cols]`.
    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.data.clone()
    }

    /// Returns the element at `(row, col)`, or `None` when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    pub fn set_zero(&mut self) {
        self.fill(T::zero());
    }

    pub fn fill(&mut self, value: T) {
        self.data.iter_mut().for_each(|x| *x = value);
    }

    /// Reallocates the tensor to `rows` rows, discarding the previous content.
    pub fn resize_rows(&mut self, rows: usize) {
        self.data = vec![T::zero(); rows * self.cols];
        self.rows = rows;
    }

    /// Borrows the whole tensor as a view.
    pub fn view(&self) -> TensorView<'_, T> {
        TensorView::new(&self.data, self.rows, self.cols, 0, self.cols)
    }

    /// Mutably borrows the whole tensor as a view.
    pub fn view_mut(&mut self) -> TensorViewMut<'_, T> {
        let (rows, cols) = (self.rows, self.cols);
        TensorViewMut::new(&mut self.data, rows, cols, 0, cols)
    }

    /// Borrows the column window `[offset, offset + width)` of every row.
    pub fn columns(&self, offset: usize, width: usize) -> Result<TensorView<'_, T>> {
        self.view().columns(offset, width)
    }

    /// Mutably borrows the column window `[offset, offset + width)` of every row.
    pub fn columns_mut(&mut self, offset: usize, width: usize) -> Result<TensorViewMut<'_, T>> {
        self.view_mut().columns_mut(offset, width)
    }

    /// Borrows the contiguous rows `[start, start + count)`.
    pub fn row_block(&self, start: usize, count: usize) -> Result<TensorView<'_, T>> {
        let end = start + count;
        if end > self.rows {
            return Err(GruError::RowsOutOfBounds {
                start,
                end,
                rows: self.rows,
            });
        }
        Ok(TensorView::new(
            &self.data[start * self.cols..end * self.cols],
            count,
            self.cols,
            0,
            self.cols,
        ))
    }

    /// Mutably borrows the contiguous rows `[start, start + count)`.
    pub fn row_block_mut(&mut self, start: usize, count: usize) -> Result<TensorViewMut<'_, T>> {
        let end = start + count;
        if end > self.rows {
            return Err(GruError::RowsOutOfBounds {
                start,
                end,
                rows: self.rows,
            });
        }
        let cols = self.cols;
        Ok(TensorViewMut::new(
            &mut self.data[start * cols..end * cols],
            count,
            cols,
            0,
            cols,
        ))
    }
}

impl<T> Index<[usize; 2]> for Tensor<T> {
    type Output = T;

    fn index(&self, index: [usize; 2]) -> &Self::Output {
        assert!(index[0] < self.rows && index[1] < self.cols, "index {index:?} out of bounds");
        &self.data[index[0] * self.cols + index[1]]
    }
}

impl<T> IndexMut<[usize; 2]> for Tensor<T> {
    fn index_mut(&mut self, index: [usize; 2]) -> &mut Self::Output {
        assert!(index[0] < self.rows && index[1] < self.cols, "index {index:?} out of bounds");
        &mut self.data[index[0] * self.cols + index[1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        let err = Tensor::from_vec(vec![1.0f32, 2.0, 3.0], 2, 2).unwrap_err();
        assert_eq!(err, GruError::shape_mismatch(vec![4_usize], vec![3_usize]));
    }

    #[test]
    fn test_row_block_and_columns() -> Result<()> {
        let t = Tensor::from_fn(4, 3, |r, c| (r * 3 + c) as f32);
        let block = t.row_block(1, 2)?;
        assert_eq!(block.shape(), [2, 3]);
        assert_eq!(block.get(0, 0), 3.0);
        assert_eq!(block.get(1, 2), 8.0);

        let cols = t.columns(1, 2)?;
        assert_eq!(cols.shape(), [4, 2]);
        assert_eq!(cols.get(3, 1), 11.0);

        assert!(t.row_block(3, 2).is_err());
        assert!(t.columns(2, 2).is_err());
        Ok(())
    }

    #[test]
    fn test_resize_rows_discards_content() {
        let mut t = Tensor::full(2, 3, 1.5f64);
        t.resize_rows(5);
        assert_eq!(t.shape(), [5, 3]);
        assert!(t.as_slice().iter().all(|&x| x == 0.0));
    }
}
