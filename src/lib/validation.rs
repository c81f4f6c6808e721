//! Input validation utilities
//!
//! File-path validation with consistent, structured error messages.
//! Configuration values are validated by the driver itself, which knows
//! which combinations admit a sort.

use crate::errors::{Result, XiSortError};
use std::path::Path;

/// Validate that a file exists
///
/// # Arguments
/// * `path` - Path to validate
/// * `description` - Human-readable description of the file (e.g., "Input file")
///
/// # Errors
/// Returns an error if the file does not exist
///
/// # Example
/// ```
/// use xisort_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/input.bin", "Input file");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        return Err(XiSortError::InvalidInput {
            path: path_ref.to_path_buf(),
            reason: format!("{description} does not exist"),
        });
    }
    Ok(())
}
