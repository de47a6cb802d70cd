//! Hilbert-indexed dense matrix.

use super::hilbert::{allocated_dim_for, hilbert_to_rc, rc_to_hilbert};
use crate::error::{OptimizationError, Result};
use std::ops::{Index, IndexMut};

const CLASS: &str = "IndexedMatrix";

/// A dense `rows x cols` matrix stored along a Hilbert curve.
///
/// The backing buffer always holds exactly `allocated_dim²` elements, where
/// `allocated_dim` is the smallest power of two not below `max(rows, cols)`.
/// Cells outside the logical `rows x cols` block hold `T::default()`.
///
/// # Examples
///
/// ```
/// use u_cfnopt::matrix::IndexedMatrix;
///
/// let mut m = IndexedMatrix::<f64>::new(5, 3).unwrap();
/// assert_eq!(m.allocated_array_size(), 64);
/// m[(4, 2)] = 1.5;
/// assert_eq!(m.get(4, 2), Some(&1.5));
/// assert_eq!(m.get(5, 0), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedMatrix<T> {
    rows: usize,
    cols: usize,
    dim: usize,
    data: Vec<T>,
}

impl<T> Default for IndexedMatrix<T> {
    fn default() -> Self {
        Self {
            rows: 0,
            cols: 0,
            dim: 0,
            data: Vec::new(),
        }
    }
}

fn allocate<T: Copy + Default>(dim: usize, operation: &'static str) -> Result<Vec<T>> {
    let elements = dim
        .checked_mul(dim)
        .ok_or(OptimizationError::AllocationFailed {
            class: CLASS,
            operation,
            elements: usize::MAX,
        })?;
    let mut data = Vec::new();
    data.try_reserve_exact(elements)
        .map_err(|_| OptimizationError::AllocationFailed {
            class: CLASS,
            operation,
            elements,
        })?;
    data.resize(elements, T::default());
    Ok(data)
}

impl<T: Copy + Default> IndexedMatrix<T> {
    /// Creates a matrix filled with `T::default()`.
    ///
    /// A zero row or column count yields an empty matrix with no allocation.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        let dim = allocated_dim_for(rows, cols);
        let data = allocate(dim, "new")?;
        Ok(Self {
            rows: if dim == 0 { 0 } else { rows },
            cols: if dim == 0 { 0 } else { cols },
            dim,
            data,
        })
    }

    /// Creates a matrix with every logical cell set to `value`.
    pub fn filled(rows: usize, cols: usize, value: T) -> Result<Self> {
        let mut matrix = Self::new(rows, cols)?;
        matrix.fill(value);
        Ok(matrix)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Side length of the allocated power-of-two square.
    pub fn allocated_dim(&self) -> usize {
        self.dim
    }

    /// Number of elements in the backing buffer (`allocated_dim²`).
    pub fn allocated_array_size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw buffer in Hilbert order.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutable raw buffer in Hilbert order.
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Position of `(row, col)` in the backing buffer, if in bounds.
    #[inline]
    pub fn linear_index(&self, row: usize, col: usize) -> Option<usize> {
        if row < self.rows && col < self.cols {
            Some(rc_to_hilbert(self.dim, row, col))
        } else {
            None
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        self.linear_index(row, col).map(|i| &self.data[i])
    }

    #[inline]
    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut T> {
        self.linear_index(row, col).map(move |i| &mut self.data[i])
    }

    /// Writes `value` at `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        let index = self
            .linear_index(row, col)
            .ok_or_else(|| self.out_of_range("set", row, col))?;
        self.data[index] = value;
        Ok(())
    }

    /// Iterates over the logical cells of one row, in column order.
    pub fn row_iter(&self, row: usize) -> impl Iterator<Item = &T> + '_ {
        let cols = if row < self.rows { self.cols } else { 0 };
        (0..cols).map(move |col| &self.data[rc_to_hilbert(self.dim, row, col)])
    }

    /// Iterates over the logical cells of one column, in row order.
    pub fn col_iter(&self, col: usize) -> impl Iterator<Item = &T> + '_ {
        let rows = if col < self.cols { self.rows } else { 0 };
        (0..rows).map(move |row| &self.data[rc_to_hilbert(self.dim, row, col)])
    }

    /// Iterates over `((row, col), &value)` for every logical cell, in memory order.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &T)> + '_ {
        self.data
            .iter()
            .enumerate()
            .map(move |(i, value)| (hilbert_to_rc(self.dim, i), value))
            .filter(move |((row, col), _)| *row < self.rows && *col < self.cols)
    }

    /// Sets every logical cell to `value`; padding cells stay at the default.
    pub fn fill(&mut self, value: T) {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let i = rc_to_hilbert(self.dim, row, col);
                self.data[i] = value;
            }
        }
    }

    /// Changes the logical size, keeping the overlapping block of values.
    ///
    /// Growing within the current `allocated_dim` moves nothing. Crossing a
    /// power-of-two boundary allocates a new buffer and copies every kept cell
    /// to its index under the new curve. Cells that leave the logical block are
    /// reset to `T::default()`, so growing again exposes defaults.
    pub fn resize(&mut self, rows: usize, cols: usize) -> Result<()> {
        let new_dim = allocated_dim_for(rows, cols);
        let (keep_rows, keep_cols) = (rows.min(self.rows), cols.min(self.cols));

        if new_dim == self.dim {
            for row in 0..self.rows {
                for col in 0..self.cols {
                    if row >= keep_rows || col >= keep_cols {
                        let i = rc_to_hilbert(self.dim, row, col);
                        self.data[i] = T::default();
                    }
                }
            }
        } else {
            let mut data = allocate(new_dim, "resize")?;
            for row in 0..keep_rows {
                for col in 0..keep_cols {
                    data[rc_to_hilbert(new_dim, row, col)] =
                        self.data[rc_to_hilbert(self.dim, row, col)];
                }
            }
            self.data = data;
            self.dim = new_dim;
        }

        if new_dim == 0 {
            self.rows = 0;
            self.cols = 0;
        } else {
            self.rows = rows;
            self.cols = cols;
        }
        Ok(())
    }

    fn out_of_range(&self, operation: &'static str, row: usize, col: usize) -> OptimizationError {
        let (index, len) = if row >= self.rows {
            (row, self.rows)
        } else {
            (col, self.cols)
        };
        OptimizationError::IndexOutOfRange {
            class: CLASS,
            operation,
            index,
            len,
        }
    }
}

impl<T: Copy + Default> Index<(usize, usize)> for IndexedMatrix<T> {
    type Output = T;

    fn index(&self, (row, col): (usize, usize)) -> &T {
        match self.get(row, col) {
            Some(v) => v,
            None => panic!(
                "IndexedMatrix index ({row}, {col}) out of bounds for {}x{}",
                self.rows, self.cols
            ),
        }
    }
}

impl<T: Copy + Default> IndexMut<(usize, usize)> for IndexedMatrix<T> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        let (rows, cols) = (self.rows, self.cols);
        match self.get_mut(row, col) {
            Some(v) => v,
            None => panic!("IndexedMatrix index ({row}, {col}) out of bounds for {rows}x{cols}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_rounding() {
        let m = IndexedMatrix::<f64>::new(5, 3).unwrap();
        assert_eq!(m.allocated_dim(), 8);
        assert_eq!(m.allocated_array_size(), 64);
        assert_eq!(m.rows(), 5);
        assert_eq!(m.cols(), 3);
    }

    #[test]
    fn test_empty_matrix() {
        let mut m = IndexedMatrix::<f64>::new(0, 4).unwrap();
        assert!(m.is_empty());
        assert_eq!(m.allocated_array_size(), 0);
        assert_eq!(m.rows(), 0);
        assert_eq!(m.cols(), 0);
        assert_eq!(m.get(0, 0), None);
        assert!(m.set(0, 0, 1.0).is_err());
        assert_eq!(m.row_iter(0).count(), 0);
        m.fill(3.0);
        assert!(m.data().is_empty());
    }

    #[test]
    fn test_storage_order_16x16() {
        let mut m = IndexedMatrix::<usize>::new(16, 16).unwrap();
        assert_eq!(m.allocated_array_size(), 256);
        let mut counter = 0;
        for col in 0..16 {
            for row in 0..16 {
                m[(row, col)] = counter;
                counter += 1;
            }
        }
        assert_eq!(&m.data()[..16], &[0, 16, 17, 1, 2, 3, 19, 18, 34, 35, 51, 50, 49, 33, 32, 48]);
        assert_eq!(m[(15, 15)], 255);
        assert_eq!(m[(0, 0)], 0);
        assert_eq!(m[(15, 0)], 15);
        assert_eq!(m[(0, 1)], 16);
        assert_eq!(m[(0, 15)], 240);
    }

    #[test]
    fn test_row_and_col_iter() {
        let mut m = IndexedMatrix::<i32>::new(3, 5).unwrap();
        for row in 0..3 {
            for col in 0..5 {
                m.set(row, col, (row * 10 + col) as i32).unwrap();
            }
        }
        let row: Vec<i32> = m.row_iter(1).copied().collect();
        assert_eq!(row, vec![10, 11, 12, 13, 14]);
        let col: Vec<i32> = m.col_iter(4).copied().collect();
        assert_eq!(col, vec![4, 14, 24]);
        assert_eq!(m.iter().count(), 15);
        assert!(m.iter().all(|((r, c), &v)| v == (r * 10 + c) as i32));
    }

    #[test]
    fn test_fill_leaves_padding_default() {
        let m = IndexedMatrix::filled(3, 2, 7u32).unwrap();
        assert_eq!(m.allocated_array_size(), 16);
        assert_eq!(m.data().iter().filter(|&&v| v == 7).count(), 6);
        assert_eq!(m.data().iter().filter(|&&v| v == 0).count(), 10);
    }

    #[test]
    fn test_resize_within_allocation() {
        let mut m = IndexedMatrix::<usize>::new(15, 15).unwrap();
        let mut counter = 0;
        for row in 0..15 {
            for col in 0..15 {
                m[(row, col)] = counter;
                counter += 1;
            }
        }

        m.resize(15, 16).unwrap();
        assert_eq!(m.allocated_dim(), 16);
        m.resize(16, 16).unwrap();

        let mut counter = 0;
        for row in 0..16 {
            for col in 0..16 {
                if row < 15 && col < 15 {
                    assert_eq!(m[(row, col)], counter);
                    counter += 1;
                } else {
                    assert_eq!(m[(row, col)], 0);
                }
            }
        }
    }

    #[test]
    fn test_resize_reindexes_across_power_of_two() {
        let mut m = IndexedMatrix::<usize>::new(3, 3).unwrap();
        for row in 0..3 {
            for col in 0..3 {
                m[(row, col)] = 100 + row * 3 + col;
            }
        }

        m.resize(6, 5).unwrap();
        assert_eq!(m.allocated_array_size(), 64);
        for row in 0..6 {
            for col in 0..5 {
                let expected = if row < 3 && col < 3 { 100 + row * 3 + col } else { 0 };
                assert_eq!(m[(row, col)], expected, "({row}, {col})");
            }
        }

        m.resize(2, 2).unwrap();
        assert_eq!(m.allocated_array_size(), 4);
        assert_eq!(m[(1, 1)], 104);
        assert_eq!(m.data().iter().filter(|&&v| v != 0).count(), 4);
    }

    #[test]
    fn test_shrink_then_grow_exposes_defaults() {
        let mut m = IndexedMatrix::filled(4, 4, 1.0f64).unwrap();
        m.resize(4, 3).unwrap();
        m.resize(4, 4).unwrap();
        assert_eq!(m[(0, 3)], 0.0);
        assert_eq!(m[(0, 2)], 1.0);
    }

    #[test]
    fn test_resize_to_zero_releases_buffer() {
        let mut m = IndexedMatrix::filled(4, 4, 1u8).unwrap();
        m.resize(0, 4).unwrap();
        assert!(m.is_empty());
        assert_eq!(m.rows(), 0);
        m.resize(2, 2).unwrap();
        assert_eq!(m.allocated_array_size(), 4);
        assert_eq!(m[(1, 1)], 0);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_index_out_of_bounds_panics() {
        let m = IndexedMatrix::<f64>::new(5, 3).unwrap();
        let _ = m[(0, 3)];
    }
}
