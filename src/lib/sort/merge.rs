//! Stable keyed merge sort for the in-memory path.
//!
//! Classical top-down merge sort over [`SortItem`] records, ordered by
//! `(key, tie, seq)`. The caller provides an auxiliary buffer of equal
//! length; its contents on return are unspecified. Ties on all three
//! components take from the left half, which preserves input order.
//!
//! # Parallel decomposition
//!
//! With `parallel` enabled, segments of at least [`PAR_THRESHOLD`] elements
//! fork their two half-sorts as independent rayon tasks and join before
//! merging. The merge itself stays sequential: it is memory-bandwidth bound
//! at this granularity, and the win comes from sorting the halves
//! concurrently. Below the threshold recursion proceeds sequentially, so a
//! `parallel = false` call is a plain sequential sort usable without any
//! task runtime.

use crate::sort::keys::SortItem;
use crate::sort::trace::{SegmentTracker, TraceAccumulator};

/// Minimum segment length for which half-sorts are forked as tasks.
pub const PAR_THRESHOLD: usize = 1 << 15;

/// Sorts `items` stably by `(key, tie, seq)` using `aux` as scratch.
///
/// # Panics
///
/// Panics if `aux` is shorter than `items`; the driver allocates both
/// together so the lengths always match.
pub fn merge_sort(
    items: &mut [SortItem],
    aux: &mut [SortItem],
    parallel: bool,
    trace: Option<&TraceAccumulator>,
) {
    assert!(aux.len() >= items.len(), "aux buffer shorter than input");
    sort_segment(items, &mut aux[..items.len()], parallel, trace);
}

fn sort_segment(
    items: &mut [SortItem],
    aux: &mut [SortItem],
    parallel: bool,
    trace: Option<&TraceAccumulator>,
) {
    let len = items.len();
    if len <= 1 {
        return;
    }
    let mid = len / 2;
    let (items_left, items_right) = items.split_at_mut(mid);
    let (aux_left, aux_right) = aux.split_at_mut(mid);

    if parallel && len >= PAR_THRESHOLD {
        rayon::join(
            || sort_segment(items_left, aux_left, parallel, trace),
            || sort_segment(items_right, aux_right, parallel, trace),
        );
    } else {
        sort_segment(items_left, aux_left, parallel, trace);
        sort_segment(items_right, aux_right, parallel, trace);
    }

    merge_halves(items, mid, aux, trace);
}

/// Merges the two sorted halves `items[..mid]` and `items[mid..]` in place.
///
/// Copies the whole segment into `aux`, then walks two cursors choosing the
/// left element whenever `(key, tie, seq)` compares less than or equal.
fn merge_halves(
    items: &mut [SortItem],
    mid: usize,
    aux: &mut [SortItem],
    trace: Option<&TraceAccumulator>,
) {
    let len = items.len();
    aux[..len].copy_from_slice(items);
    let (left, right) = aux[..len].split_at(mid);

    let mut tracker = SegmentTracker::new(trace);
    let mut i = 0;
    let mut j = 0;
    let mut k = 0;

    while i < left.len() && j < right.len() {
        if left[i] <= right[j] {
            items[k] = left[i];
            i += 1;
            tracker.record(0);
        } else {
            items[k] = right[j];
            j += 1;
            tracker.record(1);
        }
        k += 1;
    }

    if i < left.len() {
        items[k..].copy_from_slice(&left[i..]);
        tracker.record_many(0, (left.len() - i) as u64);
    } else if j < right.len() {
        items[k..].copy_from_slice(&right[j..]);
        tracker.record_many(1, (right.len() - j) as u64);
    }

    tracker.finish();
}
