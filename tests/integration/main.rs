//! Integration tests for the xisort library.
//!
//! These tests exercise end-to-end sorting through the public driver API:
//! in-memory and external paths, mode equivalence, error handling, and the
//! Φ trace diagnostic.

mod helpers;
mod test_error_paths;
mod test_external_sort;
