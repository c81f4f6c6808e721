//! Sort driver: mode selection, orchestration, and cleanup.
//!
//! [`XiSorter`] is the configuration and entry point for every sort. It
//! selects the in-memory path (records + aux buffer + keyed merge sort)
//! when the input fits the memory budget and the external path (run
//! generation followed by K-way merging) otherwise, applies the multi-pass
//! merge policy when the run count exceeds the memory-bounded fan-in cap,
//! and guarantees that scratch files and partial output are unlinked on
//! both success and failure.

use log::info;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::errors::{Result, XiSortError};
use crate::logging::format_count;
use crate::sort::external::merge_runs;
use crate::sort::keys::SortItem;
use crate::sort::merge::merge_sort;
use crate::sort::runs::{
    read_values, try_alloc, write_values, RunBuilder, ScratchSpace, BYTES_PER_VALUE,
};
use crate::sort::trace::TraceAccumulator;
use crate::validation::validate_file_exists;

/// Default per-run and output buffer size in doubles (256 KiB).
pub const DEFAULT_BUFFER_ELEMS: usize = 1 << 15;

/// Hybrid in-memory / external sorter for IEEE-754 doubles.
///
/// Builder-style configuration; a configured sorter is reusable and cheap
/// to clone.
///
/// # Examples
///
/// ```
/// use xisort_lib::sort::XiSorter;
///
/// let mut data = vec![3.0, -1.0, 2.0];
/// let stats = XiSorter::new().sort_slice(&mut data).unwrap();
/// assert_eq!(data, vec![-1.0, 2.0, 3.0]);
/// assert_eq!(stats.elements, 3);
/// ```
#[derive(Debug, Clone)]
pub struct XiSorter {
    /// Force the external path even for inputs that fit in memory.
    external: bool,
    /// Permit fork-join parallelism for in-memory sorts.
    parallel: bool,
    /// Accumulate the Φ merge-segment diagnostic.
    trace: bool,
    /// Maximum bytes kept resident; bounds run size and the fan-in cap.
    memory_limit: u64,
    /// Per-run and output buffer size in doubles for external mode.
    buffer_elems: usize,
    /// Directory for scratch run files; current directory when unset.
    scratch_dir: Option<PathBuf>,
}

impl Default for XiSorter {
    fn default() -> Self {
        Self {
            external: false,
            parallel: false,
            trace: false,
            memory_limit: u64::MAX,
            buffer_elems: DEFAULT_BUFFER_ELEMS,
            scratch_dir: None,
        }
    }
}

/// Statistics from one sort invocation.
#[derive(Debug, Default)]
pub struct SortStats {
    /// Values processed.
    pub elements: u64,
    /// Initial sorted runs written by the external path.
    pub runs_written: usize,
    /// Merge rounds performed (0 for the in-memory path).
    pub merge_passes: usize,
    /// Final Φ sum when tracing was enabled.
    pub phi: Option<f64>,
    /// Monotone merge segments observed when tracing was enabled.
    pub segments: u64,
}

impl XiSorter {
    /// Creates a sorter with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the external (disk-backed) path.
    #[must_use]
    pub fn external(mut self, enabled: bool) -> Self {
        self.external = enabled;
        self
    }

    /// Permit task-parallel in-memory sorting.
    #[must_use]
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Enable the Φ merge-segment diagnostic.
    #[must_use]
    pub fn trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    /// Set the memory budget in bytes.
    #[must_use]
    pub fn memory_limit(mut self, bytes: u64) -> Self {
        self.memory_limit = bytes;
        self
    }

    /// Set the per-run and output buffer size in doubles.
    #[must_use]
    pub fn buffer_elems(mut self, elems: usize) -> Self {
        self.buffer_elems = elems;
        self
    }

    /// Set the directory for scratch run files.
    #[must_use]
    pub fn scratch_dir(mut self, dir: PathBuf) -> Self {
        self.scratch_dir = Some(dir);
        self
    }

    /// Sorts `data` in place under the total order.
    ///
    /// Uses the in-memory path when `external` is off and the data fits the
    /// memory budget; otherwise spills runs to scratch files, merges them,
    /// and copies the merged result back into `data`.
    pub fn sort_slice(&self, data: &mut [f64]) -> Result<SortStats> {
        self.validate_config()?;

        let trace_acc = if self.trace { Some(TraceAccumulator::new()) } else { None };
        let mut stats = SortStats { elements: data.len() as u64, ..SortStats::default() };

        if !data.is_empty() {
            let resident_bytes = (data.len() as u64).saturating_mul(BYTES_PER_VALUE as u64);
            if !self.external && resident_bytes <= self.memory_limit {
                self.sort_in_memory(data, trace_acc.as_ref())?;
            } else {
                self.sort_slice_external(data, trace_acc.as_ref(), &mut stats)?;
            }
        }

        if let Some(acc) = &trace_acc {
            stats.phi = Some(acc.phi());
            stats.segments = acc.segments();
        }
        Ok(stats)
    }

    /// Sorts the raw binary64 file `input` into `output`.
    ///
    /// The input length must be a multiple of 8 bytes; an empty input
    /// produces an empty output. No output file survives a failure.
    pub fn sort_file(&self, input: &Path, output: &Path) -> Result<SortStats> {
        self.validate_config()?;
        validate_file_exists(input, "Input file")?;

        let bytes = fs::metadata(input)
            .map_err(|e| XiSortError::io(format!("reading metadata of {}", input.display()), e))?
            .len();
        if bytes % BYTES_PER_VALUE as u64 != 0 {
            return Err(XiSortError::InvalidInput {
                path: input.to_path_buf(),
                reason: format!("invalid input length: {bytes} bytes is not a multiple of 8"),
            });
        }
        let elements = bytes / BYTES_PER_VALUE as u64;

        let trace_acc = if self.trace { Some(TraceAccumulator::new()) } else { None };
        let mut stats = SortStats { elements, ..SortStats::default() };

        info!("Sorting {} values from {}", format_count(elements), input.display());

        if elements == 0 {
            File::create(output)
                .map_err(|e| XiSortError::io(format!("creating output {}", output.display()), e))?;
            return Ok(stats);
        }

        let result = if !self.external && bytes <= self.memory_limit {
            self.sort_file_in_memory(input, output, elements, trace_acc.as_ref())
        } else {
            self.sort_file_external(input, output, elements, trace_acc.as_ref(), &mut stats)
        };
        if result.is_err() {
            let _ = fs::remove_file(output);
        }
        result?;

        if let Some(acc) = &trace_acc {
            stats.phi = Some(acc.phi());
            stats.segments = acc.segments();
        }
        Ok(stats)
    }

    /// In-memory path: materialize records, sort, write values back.
    fn sort_in_memory(&self, data: &mut [f64], trace: Option<&TraceAccumulator>) -> Result<()> {
        info!("Sorting {} values in memory (parallel: {})", format_count(data.len() as u64), self.parallel);

        let mut items: Vec<SortItem> = Vec::new();
        items.try_reserve_exact(data.len()).map_err(|_| {
            XiSortError::alloc("sort records", (data.len() * std::mem::size_of::<SortItem>()) as u64)
        })?;
        for (i, &value) in data.iter().enumerate() {
            items.push(SortItem::new(value, i as u64));
        }
        let mut aux: Vec<SortItem> = try_alloc(items.len(), "aux buffer")?;

        merge_sort(&mut items, &mut aux, self.parallel, trace);

        for (slot, item) in data.iter_mut().zip(&items) {
            *slot = item.value;
        }
        Ok(())
    }

    /// Whole-file in-memory shortcut: read, sort, write.
    fn sort_file_in_memory(
        &self,
        input: &Path,
        output: &Path,
        elements: u64,
        trace: Option<&TraceAccumulator>,
    ) -> Result<()> {
        let mut data: Vec<f64> = try_alloc(elements as usize, "input buffer")?;
        self.read_file_into(input, &mut data)?;
        self.sort_in_memory(&mut data, trace)?;

        let file = File::create(output)
            .map_err(|e| XiSortError::io(format!("creating output {}", output.display()), e))?;
        let mut writer = BufWriter::with_capacity(self.buffer_elems * BYTES_PER_VALUE, file);
        write_values(&mut writer, &data, "writing output")?;
        std::io::Write::flush(&mut writer)
            .map_err(|e| XiSortError::io(format!("flushing output {}", output.display()), e))
    }

    /// External path over a file source.
    fn sort_file_external(
        &self,
        input: &Path,
        output: &Path,
        elements: u64,
        trace: Option<&TraceAccumulator>,
        stats: &mut SortStats,
    ) -> Result<()> {
        let mut scratch = ScratchSpace::new(self.scratch_root());

        info!("Phase 1: splitting input into sorted runs");
        let max_elems = self.max_run_elems(elements);
        let runs =
            RunBuilder::new(&mut scratch, max_elems, trace)?.runs_from_file(input, elements)?;
        stats.runs_written = runs.len();
        info!("Phase 1 produced {} runs", runs.len());

        info!("Phase 2: merging {} runs", runs.len());
        self.merge_all(runs, &mut scratch, output, trace, stats)
    }

    /// External path over an in-memory slice, with copy-back.
    fn sort_slice_external(
        &self,
        data: &mut [f64],
        trace: Option<&TraceAccumulator>,
        stats: &mut SortStats,
    ) -> Result<()> {
        let mut scratch = ScratchSpace::new(self.scratch_root());

        info!("Phase 1: splitting buffer into sorted runs");
        let max_elems = self.max_run_elems(data.len() as u64);
        let runs = RunBuilder::new(&mut scratch, max_elems, trace)?.runs_from_slice(data)?;
        stats.runs_written = runs.len();
        info!("Phase 1 produced {} runs", runs.len());

        info!("Phase 2: merging {} runs", runs.len());
        let merged = scratch.next_run_path();
        self.merge_all(runs, &mut scratch, &merged, trace, stats)?;

        self.read_file_into(&merged, data)?;
        scratch.remove(&merged)
    }

    /// Reduces `runs` below the fan-in cap, then merges them into `output`.
    fn merge_all(
        &self,
        runs: Vec<PathBuf>,
        scratch: &mut ScratchSpace,
        output: &Path,
        trace: Option<&TraceAccumulator>,
        stats: &mut SortStats,
    ) -> Result<()> {
        let runs = self.merge_rounds(runs, scratch, trace, stats)?;
        merge_runs(&runs, output, self.buffer_elems, trace)?;
        stats.merge_passes += 1;
        for path in &runs {
            scratch.remove(path)?;
        }
        Ok(())
    }

    /// Performs merge rounds until at most `fan_in_cap` runs remain.
    ///
    /// Groups are taken in run-index order, so the round schedule and the
    /// resulting output are deterministic.
    fn merge_rounds(
        &self,
        mut runs: Vec<PathBuf>,
        scratch: &mut ScratchSpace,
        trace: Option<&TraceAccumulator>,
        stats: &mut SortStats,
    ) -> Result<Vec<PathBuf>> {
        let cap = self.fan_in_cap();
        while runs.len() > cap {
            info!("Merge round: {} runs exceed fan-in cap {}", runs.len(), cap);
            let mut next = Vec::with_capacity(runs.len().div_ceil(cap));
            for group in runs.chunks(cap) {
                let dst = scratch.next_run_path();
                merge_runs(group, &dst, self.buffer_elems, trace)?;
                for path in group {
                    scratch.remove(path)?;
                }
                next.push(dst);
            }
            runs = next;
            stats.merge_passes += 1;
        }
        Ok(runs)
    }

    /// Largest K such that `K * buffer_elems * 8 <= memory_limit / 2`,
    /// floored at 2 so merging always makes progress.
    fn fan_in_cap(&self) -> usize {
        let per_run_bytes = (self.buffer_elems * BYTES_PER_VALUE) as u64;
        let cap = (self.memory_limit / 2) / per_run_bytes;
        usize::try_from(cap).unwrap_or(usize::MAX).max(2)
    }

    /// Run size in elements, bounded by the source length.
    fn max_run_elems(&self, total_elems: u64) -> usize {
        let by_budget = self.memory_limit / BYTES_PER_VALUE as u64;
        let capped = by_budget.min(total_elems).max(1);
        usize::try_from(capped).unwrap_or(usize::MAX)
    }

    /// Rejects configurations no sort can run under. Runs before dispatch
    /// and before any input inspection, so empty inputs are validated too.
    fn validate_config(&self) -> Result<()> {
        if self.buffer_elems == 0 {
            return Err(XiSortError::invalid_config("buffer_elems", "must be > 0"));
        }
        if self.memory_limit == 0 {
            return Err(XiSortError::invalid_config("mem_limit", "must be > 0 in external mode"));
        }
        Ok(())
    }

    fn scratch_root(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Fills `data` from the packed binary64 file at `path`.
    fn read_file_into(&self, path: &Path, data: &mut [f64]) -> Result<()> {
        let mut file = File::open(path)
            .map_err(|e| XiSortError::io(format!("opening {}", path.display()), e))?;
        let chunk = self.buffer_elems.min(data.len()).max(1);
        let mut bytes: Vec<u8> = try_alloc(chunk * BYTES_PER_VALUE, "read-back buffer")?;

        let mut filled = 0;
        while filled < data.len() {
            let want = chunk.min(data.len() - filled);
            let count = read_values(
                &mut file,
                &mut bytes[..want * BYTES_PER_VALUE],
                &mut data[filled..filled + want],
                "reading sorted data",
            )?;
            if count == 0 {
                return Err(XiSortError::Internal {
                    detail: "sorted data shorter than its source".to_string(),
                });
            }
            filled += count;
        }
        Ok(())
    }
}

/// Sorts `data` in place with the given configuration.
///
/// Thin wrapper over [`XiSorter::sort_slice`] for callers holding a
/// configuration value rather than building one inline.
pub fn xi_sort(data: &mut [f64], config: &XiSorter) -> Result<SortStats> {
    config.sort_slice(data)
}
