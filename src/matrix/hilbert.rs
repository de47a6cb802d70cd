//! Hilbert space-filling curve index arithmetic.
//!
//! Maps between a logical `(row, col)` coordinate in a `dim x dim` square
//! (with `dim` a power of two) and the position along the Hilbert curve
//! that visits every cell of that square exactly once. Cells that are close
//! on the curve are close in 2D, which keeps row and column scans of an
//! [`IndexedMatrix`](super::IndexedMatrix) within a few cache lines.
//!
//! The column is the curve's `x` coordinate and the row its `y` coordinate,
//! so the curve starts at `(0, 0)` and leaves the first 2x2 block at `(1, 0)`:
//!
//! ```text
//!  0  1 14 15
//!  3  2 13 12
//!  4  7  8 11
//!  5  6  9 10
//! ```
//!
//! # References
//!
//! Hilbert (1891), "Ueber die stetige Abbildung einer Linie auf ein Flächenstück"

/// Returns the smallest power of two that is `>= max(rows, cols)`,
/// or `0` when either dimension is zero.
pub fn allocated_dim_for(rows: usize, cols: usize) -> usize {
    if rows == 0 || cols == 0 {
        0
    } else {
        rows.max(cols).next_power_of_two()
    }
}

/// Rotates and flips a quadrant so the sub-curve has the right orientation.
#[inline]
fn rotate_and_flip(n: usize, x: &mut usize, y: &mut usize, rx: usize, ry: usize) {
    if ry == 0 {
        if rx == 1 {
            *x = n - 1 - *x;
            *y = n - 1 - *y;
        }
        std::mem::swap(x, y);
    }
}

/// Converts a `(row, col)` coordinate into its Hilbert index in `[0, dim²)`.
///
/// Processes the bits of the coordinate from the coarsest quadrant to the
/// finest. `dim` must be a power of two and both coordinates below `dim`.
#[inline]
pub fn rc_to_hilbert(dim: usize, row: usize, col: usize) -> usize {
    debug_assert!(dim.is_power_of_two());
    debug_assert!(row < dim && col < dim);

    let (mut x, mut y) = (col, row);
    let mut index = 0;
    let mut s = dim / 2;
    while s > 0 {
        let rx = usize::from(x & s != 0);
        let ry = usize::from(y & s != 0);
        index += s * s * ((3 * rx) ^ ry);
        rotate_and_flip(dim, &mut x, &mut y, rx, ry);
        s /= 2;
    }
    index
}

/// Converts a Hilbert index back into its `(row, col)` coordinate.
///
/// Inverse of [`rc_to_hilbert`]: builds the coordinate from the finest
/// quadrant outwards.
#[inline]
pub fn hilbert_to_rc(dim: usize, index: usize) -> (usize, usize) {
    debug_assert!(dim.is_power_of_two());
    debug_assert!(index < dim * dim);

    let (mut x, mut y) = (0usize, 0usize);
    let mut t = index;
    let mut s = 1;
    while s < dim {
        let rx = 1 & (t / 2);
        let ry = 1 & (t ^ rx);
        rotate_and_flip(s, &mut x, &mut y, rx, ry);
        x += s * rx;
        y += s * ry;
        t /= 4;
        s *= 2;
    }
    (y, x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_allocated_dim() {
        assert_eq!(allocated_dim_for(5, 3), 8);
        assert_eq!(allocated_dim_for(3, 5), 8);
        assert_eq!(allocated_dim_for(8, 8), 8);
        assert_eq!(allocated_dim_for(9, 1), 16);
        assert_eq!(allocated_dim_for(1, 1), 1);
        assert_eq!(allocated_dim_for(0, 7), 0);
        assert_eq!(allocated_dim_for(7, 0), 0);
    }

    #[test]
    fn test_layout_4x4() {
        let expected = [[0, 1, 14, 15], [3, 2, 13, 12], [4, 7, 8, 11], [5, 6, 9, 10]];
        for (row, line) in expected.iter().enumerate() {
            for (col, &index) in line.iter().enumerate() {
                assert_eq!(rc_to_hilbert(4, row, col), index, "({row}, {col})");
            }
        }
    }

    #[test]
    fn test_layout_16x16_edges() {
        let first_row = [
            0, 1, 14, 15, 16, 19, 20, 21, 234, 235, 236, 239, 240, 241, 254, 255,
        ];
        for (col, &index) in first_row.iter().enumerate() {
            assert_eq!(rc_to_hilbert(16, 0, col), index);
        }
        let first_col = [0, 3, 4, 5, 58, 59, 60, 63, 64, 65, 78, 79, 80, 83, 84, 85];
        for (row, &index) in first_col.iter().enumerate() {
            assert_eq!(rc_to_hilbert(16, row, 0), index);
        }
        assert_eq!(rc_to_hilbert(16, 15, 15), 170);
    }

    #[test]
    fn test_round_trip_is_a_bijection() {
        for dim in [1usize, 2, 4, 8, 16, 32, 64] {
            let mut seen = vec![false; dim * dim];
            for row in 0..dim {
                for col in 0..dim {
                    let index = rc_to_hilbert(dim, row, col);
                    assert!(index < dim * dim);
                    assert!(!seen[index], "index {index} produced twice for dim {dim}");
                    seen[index] = true;
                    assert_eq!(hilbert_to_rc(dim, index), (row, col));
                }
            }
            assert!(seen.iter().all(|&s| s));
        }
    }

    #[test]
    fn test_consecutive_indices_are_adjacent() {
        let dim = 32;
        for index in 1..dim * dim {
            let (r0, c0) = hilbert_to_rc(dim, index - 1);
            let (r1, c1) = hilbert_to_rc(dim, index);
            assert_eq!(r0.abs_diff(r1) + c0.abs_diff(c1), 1);
        }
    }

    proptest! {
        #[test]
        fn prop_round_trip(shift in 0u32..12, row_seed in any::<usize>(), col_seed in any::<usize>()) {
            let dim = 1usize << shift;
            let (row, col) = (row_seed % dim, col_seed % dim);
            let index = rc_to_hilbert(dim, row, col);
            prop_assert!(index < dim * dim);
            prop_assert_eq!(hilbert_to_rc(dim, index), (row, col));
        }
    }
}
