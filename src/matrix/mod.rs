//! Cache-friendly 2D storage for pairwise data.
//!
//! Pairwise penalty tables are scanned along a row (all choices of one node
//! against a fixed choice of another) far more often than they are read at
//! random. [`IndexedMatrix`] lays the matrix out along a Hilbert curve so
//! that such scans touch neighbouring memory in both directions.
//!
//! - [`hilbert`]: the `(row, col)` to curve-index mapping and its inverse
//! - [`IndexedMatrix`]: owned, bounds-checked matrix built on that mapping

pub mod hilbert;
mod indexed;

pub use indexed::IndexedMatrix;
