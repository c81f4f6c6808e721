//! Error types for xisort operations.
//!
//! Every error is fatal to the sort that raised it: the driver unlinks any
//! scratch files and partial output it created, then propagates the error
//! unchanged. Nothing in this crate retries or recovers locally.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for xisort operations
pub type Result<T> = std::result::Result<T, XiSortError>;

/// Error type for xisort operations
#[derive(Error, Debug)]
pub enum XiSortError {
    /// Invalid configuration value provided
    #[error("Invalid configuration '{parameter}': {reason}")]
    InvalidConfig {
        /// The configuration field name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// Input data that cannot be sorted
    #[error("Invalid input '{path}': {reason}")]
    InvalidInput {
        /// Path to the offending file
        path: PathBuf,
        /// Explanation of the problem
        reason: String,
    },

    /// An I/O operation failed
    #[error("I/O error while {context}: {source}")]
    Io {
        /// What the sorter was doing when the operation failed
        context: String,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// An allocation request could not be satisfied
    #[error("Out of memory allocating {what} ({bytes} bytes)")]
    ResourceExhausted {
        /// What was being allocated (records, aux buffer, run buffer)
        what: String,
        /// Requested size in bytes
        bytes: u64,
    },

    /// An internal invariant was violated; indicates a bug
    #[error("Internal error: {detail}")]
    Internal {
        /// Description of the violated invariant
        detail: String,
    },
}

impl XiSortError {
    /// Builds an `InvalidConfig` error for a rejected configuration field.
    pub fn invalid_config(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig { parameter: parameter.into(), reason: reason.into() }
    }

    /// Wraps an I/O error with a description of the failed operation.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }

    /// Builds a `ResourceExhausted` error for a failed buffer allocation.
    pub fn alloc(what: impl Into<String>, bytes: u64) -> Self {
        Self::ResourceExhausted { what: what.into(), bytes }
    }
}
