//! K-way merge of sorted run files.
//!
//! # Algorithm
//!
//! 1. Open every run file and fill its read buffer (up to `buffer_elems`
//!    doubles). A run that yields nothing is drained immediately.
//! 2. Seed a min-heap with each live run's head, ordered by
//!    `(encode_key(value), run_id)`.
//! 3. Pop the minimum, append its value to the buffered output, advance the
//!    source run (refilling from disk when its buffer empties), and push the
//!    run's new head.
//! 4. When the heap empties, flush the output.
//!
//! Key ties break by run index, so the merged output is a deterministic
//! function of the run contents: equal-keyed values are emitted in
//! run-index order. A run is *drained* once its file has hit EOF and its
//! buffer is exhausted; memory stays bounded by `K · buffer_elems` doubles
//! for the readers plus one output buffer and the O(K) heap.

use byteorder::{LittleEndian, WriteBytesExt};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::errors::{Result, XiSortError};
use crate::sort::keys::encode_key;
use crate::sort::runs::{read_values, try_alloc, BYTES_PER_VALUE};
use crate::sort::trace::{SegmentTracker, TraceAccumulator};

/// Buffered reader over one sorted run file.
///
/// Lifecycle: fresh (before the first fill) → active (non-empty buffer with
/// a cursor) → drained (file at EOF and buffer exhausted).
struct RunReader {
    file: File,
    path: PathBuf,
    buffer: Vec<f64>,
    bytes: Vec<u8>,
    len: usize,
    pos: usize,
    eof: bool,
}

impl RunReader {
    /// Opens a run file and performs the initial buffer fill.
    fn open(path: &Path, buffer_elems: usize) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| XiSortError::io(format!("opening run file {}", path.display()), e))?;
        let mut reader = Self {
            file,
            path: path.to_path_buf(),
            buffer: try_alloc(buffer_elems, "run merge buffer")?,
            bytes: try_alloc(buffer_elems * BYTES_PER_VALUE, "run merge byte buffer")?,
            len: 0,
            pos: 0,
            eof: false,
        };
        reader.refill()?;
        Ok(reader)
    }

    /// Current head value, or `None` when drained.
    fn head(&self) -> Option<f64> {
        if self.pos < self.len { Some(self.buffer[self.pos]) } else { None }
    }

    /// Advances past the head, refilling from disk when the buffer empties.
    fn advance(&mut self) -> Result<()> {
        self.pos += 1;
        if self.pos >= self.len && !self.eof {
            self.refill()?;
        }
        Ok(())
    }

    fn refill(&mut self) -> Result<()> {
        let context = format!("reading run file {}", self.path.display());
        self.len = read_values(&mut self.file, &mut self.bytes, &mut self.buffer, &context)?;
        self.pos = 0;
        // read_values only returns short when the file hit EOF.
        if self.len < self.buffer.len() {
            self.eof = true;
        }
        Ok(())
    }
}

/// Entry in the merge heap: one run's current head.
struct HeapEntry {
    key: u64,
    value: f64,
    run_id: usize,
}

impl HeapEntry {
    fn new(value: f64, run_id: usize) -> Self {
        Self { key: encode_key(value), value, run_id }
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        (self.key, self.run_id) == (other.key, other.run_id)
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.key, self.run_id).cmp(&(other.key, other.run_id))
    }
}

/// Merges `run_paths` (each sorted) into a single sorted file at `output`.
///
/// Returns the number of values written. The caller owns cleanup of both
/// the run files and, on error, the partially written output.
pub fn merge_runs(
    run_paths: &[PathBuf],
    output: &Path,
    buffer_elems: usize,
    trace: Option<&TraceAccumulator>,
) -> Result<u64> {
    if run_paths.is_empty() {
        return Err(XiSortError::Internal {
            detail: "k-way merge invoked with zero runs".to_string(),
        });
    }

    let mut readers: Vec<RunReader> = Vec::with_capacity(run_paths.len());
    for path in run_paths {
        readers.push(RunReader::open(path, buffer_elems)?);
    }

    let mut heap: BinaryHeap<Reverse<HeapEntry>> = BinaryHeap::with_capacity(readers.len());
    for (run_id, reader) in readers.iter().enumerate() {
        if let Some(value) = reader.head() {
            heap.push(Reverse(HeapEntry::new(value, run_id)));
        }
    }

    let out_file = File::create(output)
        .map_err(|e| XiSortError::io(format!("creating output {}", output.display()), e))?;
    let mut writer = BufWriter::with_capacity(buffer_elems * BYTES_PER_VALUE, out_file);

    let mut tracker = SegmentTracker::new(trace);
    let mut written = 0u64;

    while let Some(Reverse(entry)) = heap.pop() {
        writer
            .write_f64::<LittleEndian>(entry.value)
            .map_err(|e| XiSortError::io(format!("writing output {}", output.display()), e))?;
        tracker.record(entry.run_id);
        written += 1;

        let reader = &mut readers[entry.run_id];
        reader.advance()?;
        if let Some(value) = reader.head() {
            heap.push(Reverse(HeapEntry::new(value, entry.run_id)));
        }
    }

    writer
        .flush()
        .map_err(|e| XiSortError::io(format!("flushing output {}", output.display()), e))?;
    tracker.finish();
    Ok(written)
}
