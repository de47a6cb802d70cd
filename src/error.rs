//! Error types shared by every component.

use thiserror::Error;

/// Errors raised by problems, cost functions, schedules, optimizers and containers.
///
/// Every variant carries the name of the offending class and the operation that
/// failed, so the message alone is enough to locate the misuse.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OptimizationError {
    /// `finalize()` was called on an object that is already finalized.
    #[error("{class}::{operation}: this object has already been finalized")]
    AlreadyFinalized {
        class: &'static str,
        operation: &'static str,
    },

    /// An operation that needs finalized data was called before `finalize()`.
    #[error("{class}::{operation}: this object must be finalized first")]
    NotFinalized {
        class: &'static str,
        operation: &'static str,
    },

    /// A mutating operation was called after `finalize()`.
    #[error("{class}::{operation}: cannot modify a finalized object")]
    Finalized {
        class: &'static str,
        operation: &'static str,
    },

    /// An object of an incompatible concrete kind was supplied.
    #[error("{class}::{operation}: expected {expected}, got {found}")]
    TypeMismatch {
        class: &'static str,
        operation: &'static str,
        expected: String,
        found: String,
    },

    /// An input vector has the wrong number of entries.
    #[error("{class}::{operation}: expected {expected} entries, got {found}")]
    SizeMismatch {
        class: &'static str,
        operation: &'static str,
        expected: usize,
        found: usize,
    },

    /// An index was outside the valid range of a container.
    #[error("{class}::{operation}: index {index} is out of range (size {len})")]
    IndexOutOfRange {
        class: &'static str,
        operation: &'static str,
        index: usize,
        len: usize,
    },

    /// Storage for an indexed matrix could not be allocated.
    #[error("{class}::{operation}: unable to allocate {elements} elements")]
    AllocationFailed {
        class: &'static str,
        operation: &'static str,
        elements: usize,
    },

    /// The operation has no implementation for this type.
    #[error("{class}::{operation}: not implemented for this type")]
    NotImplemented {
        class: &'static str,
        operation: &'static str,
    },

    /// An argument violated a documented precondition.
    #[error("{class}::{operation}: {message}")]
    InvalidInput {
        class: &'static str,
        operation: &'static str,
        message: String,
    },

    /// A configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OptimizationError>;
