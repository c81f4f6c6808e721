//! Merge-segment diagnostic accumulation.
//!
//! When tracing is enabled, every merge (the in-memory two-way merge and the
//! K-way run merge) reports its *monotone segments*: maximal contiguous
//! stretches of output taken from the same source. For each segment of
//! length `L` the accumulator adds `1/L` to the running Φ sum and bumps the
//! segment count. Φ is purely diagnostic; it never influences ordering.
//!
//! The accumulator is shared across fork-join tasks during a parallel sort,
//! so both counters are atomics. The f64 sum uses a compare-exchange loop
//! over the raw bits; the segment count is a plain atomic add. Merges
//! accumulate into a local [`SegmentTracker`] and flush once on completion
//! to keep contention off the hot path.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-visible Φ trace state: `{phi_sum, segment_count}`.
///
/// Reset at each top-level sort invocation when tracing is enabled.
#[derive(Debug, Default)]
pub struct TraceAccumulator {
    /// Bit pattern of the running f64 Φ sum.
    phi_bits: AtomicU64,
    /// Number of monotone segments observed.
    segments: AtomicU64,
}

impl TraceAccumulator {
    /// Creates a zeroed accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self { phi_bits: AtomicU64::new(0.0_f64.to_bits()), segments: AtomicU64::new(0) }
    }

    /// Resets both counters to zero.
    pub fn reset(&self) {
        self.phi_bits.store(0.0_f64.to_bits(), Ordering::Relaxed);
        self.segments.store(0, Ordering::Relaxed);
    }

    /// Atomically adds a merge's local contribution.
    pub fn add(&self, phi: f64, segments: u64) {
        if segments == 0 {
            return;
        }
        let mut current = self.phi_bits.load(Ordering::Relaxed);
        loop {
            let updated = (f64::from_bits(current) + phi).to_bits();
            match self.phi_bits.compare_exchange_weak(
                current,
                updated,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        self.segments.fetch_add(segments, Ordering::Relaxed);
    }

    /// Current Φ sum.
    #[must_use]
    pub fn phi(&self) -> f64 {
        f64::from_bits(self.phi_bits.load(Ordering::Relaxed))
    }

    /// Current segment count.
    #[must_use]
    pub fn segments(&self) -> u64 {
        self.segments.load(Ordering::Relaxed)
    }
}

/// Per-merge segment bookkeeping.
///
/// Tracks the current source and segment length while a merge emits output,
/// closing a segment whenever the source changes. [`SegmentTracker::finish`]
/// flushes the local totals to the shared accumulator in one atomic update.
/// With no accumulator attached every call is a cheap no-op.
pub struct SegmentTracker<'a> {
    acc: Option<&'a TraceAccumulator>,
    last_source: Option<usize>,
    seg_len: u64,
    phi_local: f64,
    count_local: u64,
}

impl<'a> SegmentTracker<'a> {
    /// Creates a tracker that flushes into `acc` (or does nothing for `None`).
    #[must_use]
    pub fn new(acc: Option<&'a TraceAccumulator>) -> Self {
        Self { acc, last_source: None, seg_len: 0, phi_local: 0.0, count_local: 0 }
    }

    /// Records one output element taken from `source`.
    #[inline]
    pub fn record(&mut self, source: usize) {
        self.record_many(source, 1);
    }

    /// Records `n` consecutive output elements taken from `source`.
    #[inline]
    pub fn record_many(&mut self, source: usize, n: u64) {
        if self.acc.is_none() || n == 0 {
            return;
        }
        if self.last_source != Some(source) {
            self.close_segment();
            self.last_source = Some(source);
        }
        self.seg_len += n;
    }

    /// Closes the open segment and flushes local totals to the accumulator.
    pub fn finish(mut self) {
        self.close_segment();
        if let Some(acc) = self.acc {
            acc.add(self.phi_local, self.count_local);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn close_segment(&mut self) {
        if self.seg_len > 0 {
            self.phi_local += 1.0 / self.seg_len as f64;
            self.count_local += 1;
            self.seg_len = 0;
        }
    }
}
