//! Hybrid sort engine for IEEE-754 doubles under the total order.
//!
//! # Architecture
//!
//! 1. **Key phase**: every value maps to a `u64` total-order key
//!    ([`keys`]); unsigned comparison on keys equals the IEEE-754-2019
//!    total order on values.
//! 2. **In-memory path**: values joined with `(key, tie, seq)` records and
//!    sorted by a stable fork-join merge sort ([`merge`]).
//! 3. **External path**: the input is split into memory-bounded sorted runs
//!    on disk ([`runs`]), then K-way merged through a min-heap
//!    ([`external`]), with multi-pass rounds when the run count exceeds the
//!    memory-bounded fan-in cap.
//! 4. **Driver**: [`driver::XiSorter`] selects the path, owns scratch-file
//!    cleanup, and reports [`driver::SortStats`].
//!
//! Output is a pure deterministic function of input bytes and
//! configuration: record tie-breakers make every in-memory comparison
//! total, and the merge heap breaks key ties by run index.

pub mod driver;
pub mod external;
pub mod keys;
pub mod merge;
pub mod runs;
pub mod trace;

pub use driver::{xi_sort, SortStats, XiSorter, DEFAULT_BUFFER_ELEMS};
pub use keys::{decode_key, encode_key, is_sorted_by_key, SortItem};
pub use merge::{merge_sort, PAR_THRESHOLD};
pub use trace::TraceAccumulator;
