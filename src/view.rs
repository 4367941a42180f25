//! Borrowed windows over row-major tensor storage.
//!
//! A view describes a `rows x cols` window starting at column `offset` of a
//! parent buffer whose rows are `stride` elements apart. Packed multi-gate
//! buffers are addressed by narrowing a view to a column range, so no gate
//! slice ever owns memory of its own.

use crate::{
    error::{GruError, Result},
    tensor::Tensor,
};
use num_traits::Float;

/// A read-only window into a tensor's storage.
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a, T> {
    /// Storage starting at the first row of the window.
    data: &'a [T],
    rows: usize,
    cols: usize,
    /// Column offset into each parent row.
    offset: usize,
    /// Distance between consecutive rows in `data`.
    stride: usize,
}

impl<'a, T: Float> TensorView<'a, T> {
    pub(crate) fn new(data: &'a [T], rows: usize, cols: usize, offset: usize, stride: usize) -> Self {
        debug_assert!(offset + cols <= stride || rows == 0);
        debug_assert!(rows == 0 || data.len() >= (rows - 1) * stride + offset + cols);
        Self {
            data,
            rows,
            cols,
            offset,
            stride,
        }
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

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the element at `(row, col)` of the window.
    ///
    /// # Panics
    ///
    /// Panics if the position lies outside the window.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        assert!(row < self.rows && col < self.cols, "({row}, {col}) outside {:?}", self.shape());
        self.data[row * self.stride + self.offset + col]
    }

    /// Returns one row of the window as a contiguous slice.
    #[inline]
    pub fn row(&self, row: usize) -> &'a [T] {
        let start = row * self.stride + self.offset;
        &self.data[start..start + self.cols]
    }

    /// Narrows the window to the columns `[offset, offset + width)`.
    pub fn columns(self, offset: usize, width: usize) -> Result<TensorView<'a, T>> {
        let end = offset + width;
        if end > self.cols {
            return Err(GruError::ColumnsOutOfBounds {
                offset,
                end,
                width: self.cols,
            });
        }
        Ok(TensorView::new(self.data, self.rows, width, self.offset + offset, self.stride))
    }

    /// Copies the window into a new contiguous tensor.
    pub fn to_tensor(&self) -> Tensor<T> {
        Tensor::from_fn(self.rows, self.cols, |r, c| self.get(r, c))
    }
}

/// A mutable window into a tensor's storage.
#[derive(Debug)]
pub struct TensorViewMut<'a, T> {
    data: &'a mut [T],
    rows: usize,
    cols: usize,
    offset: usize,
    stride: usize,
}

impl<'a, T: Float> TensorViewMut<'a, T> {
    pub(crate) fn new(data: &'a mut [T], rows: usize, cols: usize, offset: usize, stride: usize) -> Self {
        debug_assert!(offset + cols <= stride || rows == 0);
        debug_assert!(rows == 0 || data.len() >= (rows - 1) * stride + offset + cols);
        Self {
            data,
            rows,
            cols,
            offset,
            stride,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        assert!(row < self.rows && col < self.cols, "({row}, {col}) outside {:?}", self.shape());
        self.data[row * self.stride + self.offset + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        assert!(row < self.rows && col < self.cols, "({row}, {col}) outside {:?}", self.shape());
        self.data[row * self.stride + self.offset + col] = value;
    }

    #[inline]
    pub fn row(&self, row: usize) -> &[T] {
        let start = row * self.stride + self.offset;
        &self.data[start..start + self.cols]
    }

    #[inline]
    pub fn row_mut(&mut self, row: usize) -> &mut [T] {
        let start = row * self.stride + self.offset;
        &mut self.data[start..start + self.cols]
    }

    /// Narrows the window to the columns `[offset, offset + width)`.
    pub fn columns_mut(self, offset: usize, width: usize) -> Result<TensorViewMut<'a, T>> {
        let end = offset + width;
        if end > self.cols {
            return Err(GruError::ColumnsOutOfBounds {
                offset,
                end,
                width: self.cols,
            });
        }
        Ok(TensorViewMut::new(self.data, self.rows, width, self.offset + offset, self.stride))
    }

    pub fn fill(&mut self, value: T) {
        for r in 0..self.rows {
            self.row_mut(r).iter_mut().for_each(|x| *x = value);
        }
    }

    /// Overwrites the window with the content of `src`.
    pub fn assign(&mut self, src: &TensorView<'_, T>) -> Result<()> {
        if src.shape() != self.shape() {
            return Err(GruError::shape_mismatch(self.shape(), src.shape()));
        }
        for r in 0..self.rows {
            self.row_mut(r).copy_from_slice(src.row(r));
        }
        Ok(())
    }
}
