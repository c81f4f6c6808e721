//! Sorted-run generation for the external path.
//!
//! Splits a value source (an in-memory slice or a raw binary file) into
//! chunks of at most `max_elems` doubles, sorts each chunk, and writes it to
//! a scratch file as tightly packed little-endian binary64 values with no
//! header or terminator; file length is always a multiple of 8 bytes.
//!
//! Run files are named `xisort_run_<k>.bin` with `<k>` counting up from 0
//! within one sort invocation. [`ScratchSpace`] tracks every file it handed
//! out and unlinks whatever is left when dropped, so scratch is reclaimed on
//! success and on error paths alike. Concurrent sorts must use distinct
//! scratch directories.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::errors::{Result, XiSortError};
use crate::sort::keys::SortItem;
use crate::sort::merge::merge_sort;
use crate::sort::trace::TraceAccumulator;

/// Size of one encoded value on disk.
pub(crate) const BYTES_PER_VALUE: usize = 8;

/// Write-side buffer capacity for run files.
const RUN_WRITE_BUFFER: usize = 256 * 1024;

/// Reads up to `values.len()` doubles from `reader`.
///
/// `bytes` is the caller's scratch byte buffer and must hold exactly
/// `values.len() * 8` bytes. Returns the number of doubles read; fewer than
/// requested means EOF was reached. A stream that ends in the middle of a
/// value is an error: short reads are only legal at value boundaries.
pub(crate) fn read_values(
    reader: &mut impl Read,
    bytes: &mut [u8],
    values: &mut [f64],
    context: &str,
) -> Result<usize> {
    debug_assert_eq!(bytes.len(), values.len() * BYTES_PER_VALUE);
    let mut filled = 0;
    while filled < bytes.len() {
        match reader.read(&mut bytes[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(XiSortError::io(context, e)),
        }
    }
    if filled % BYTES_PER_VALUE != 0 {
        return Err(XiSortError::io(
            context,
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "stream ended mid-value"),
        ));
    }
    let count = filled / BYTES_PER_VALUE;
    LittleEndian::read_f64_into(&bytes[..filled], &mut values[..count]);
    Ok(count)
}

/// Writes `values` as packed little-endian doubles.
pub(crate) fn write_values(
    writer: &mut impl Write,
    values: &[f64],
    context: &str,
) -> Result<()> {
    for &value in values {
        writer.write_f64::<LittleEndian>(value).map_err(|e| XiSortError::io(context, e))?;
    }
    Ok(())
}

/// Allocates a `Vec<T>` of `len` default elements, surfacing allocation
/// failure instead of aborting.
pub(crate) fn try_alloc<T: Clone + Default>(len: usize, what: &str) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| XiSortError::alloc(what, (len * std::mem::size_of::<T>()) as u64))?;
    buf.resize(len, T::default());
    Ok(buf)
}

/// Owner of the scratch run files for one sort invocation.
///
/// Hands out monotonically numbered `xisort_run_<k>.bin` paths and removes
/// every still-live file on drop. Dropping is best-effort: removal errors
/// during cleanup are ignored, and abnormal process termination can leave
/// run files behind for manual cleanup.
#[derive(Debug)]
pub struct ScratchSpace {
    dir: PathBuf,
    next_run: usize,
    live: Vec<PathBuf>,
}

impl ScratchSpace {
    /// Creates a scratch space rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), next_run: 0, live: Vec::new() }
    }

    /// Scratch directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserves the next run path and registers it for cleanup.
    pub fn next_run_path(&mut self) -> PathBuf {
        let path = self.dir.join(format!("xisort_run_{}.bin", self.next_run));
        self.next_run += 1;
        self.live.push(path.clone());
        path
    }

    /// Unlinks a run file that has been fully consumed.
    pub fn remove(&mut self, path: &Path) -> Result<()> {
        fs::remove_file(path)
            .map_err(|e| XiSortError::io(format!("removing scratch file {}", path.display()), e))?;
        self.live.retain(|p| p != path);
        Ok(())
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        for path in &self.live {
            let _ = fs::remove_file(path);
        }
    }
}

/// Splits a value source into sorted runs on disk.
pub struct RunBuilder<'a> {
    scratch: &'a mut ScratchSpace,
    max_elems: usize,
    trace: Option<&'a TraceAccumulator>,
}

impl<'a> RunBuilder<'a> {
    /// Creates a builder producing runs of at most `max_elems` doubles.
    pub fn new(
        scratch: &'a mut ScratchSpace,
        max_elems: usize,
        trace: Option<&'a TraceAccumulator>,
    ) -> Result<Self> {
        if max_elems == 0 {
            return Err(XiSortError::Internal {
                detail: "run size limit must be at least one element".to_string(),
            });
        }
        Ok(Self { scratch, max_elems, trace })
    }

    /// Splits `data` into sorted runs; `tie` indices are global positions.
    pub fn runs_from_slice(&mut self, data: &[f64]) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        let mut offset = 0u64;
        for chunk in data.chunks(self.max_elems) {
            paths.push(self.write_sorted_run(chunk, offset)?);
            offset += chunk.len() as u64;
        }
        Ok(paths)
    }

    /// Reads `input` chunk by chunk and writes one sorted run per chunk.
    ///
    /// `expected_elems` is the element count derived from the file length;
    /// a mismatch means the file changed underneath the sort.
    pub fn runs_from_file(&mut self, input: &Path, expected_elems: u64) -> Result<Vec<PathBuf>> {
        let file = File::open(input)
            .map_err(|e| XiSortError::io(format!("opening input {}", input.display()), e))?;
        let mut reader = std::io::BufReader::with_capacity(RUN_WRITE_BUFFER, file);

        let mut values: Vec<f64> = try_alloc(self.max_elems, "run read buffer")?;
        let mut bytes: Vec<u8> = try_alloc(self.max_elems * BYTES_PER_VALUE, "run byte buffer")?;

        let mut paths = Vec::new();
        let mut offset = 0u64;
        loop {
            let count = read_values(&mut reader, &mut bytes, &mut values, "reading input")?;
            if count == 0 {
                break;
            }
            paths.push(self.write_sorted_run(&values[..count], offset)?);
            offset += count as u64;
        }

        if offset != expected_elems {
            return Err(XiSortError::InvalidInput {
                path: input.to_path_buf(),
                reason: format!("file changed while reading: expected {expected_elems} values, read {offset}"),
            });
        }
        Ok(paths)
    }

    /// Sorts one chunk and writes it to a fresh run file.
    ///
    /// Run-sized sorts stay sequential: task overhead dominates at run
    /// granularity, and keeping runs sequential lets run generation pipeline
    /// with run writing.
    fn write_sorted_run(&mut self, chunk: &[f64], offset: u64) -> Result<PathBuf> {
        let mut items: Vec<SortItem> = Vec::new();
        items.try_reserve_exact(chunk.len()).map_err(|_| {
            XiSortError::alloc("sort records", (chunk.len() * std::mem::size_of::<SortItem>()) as u64)
        })?;
        for (i, &value) in chunk.iter().enumerate() {
            items.push(SortItem::new(value, offset + i as u64));
        }
        let mut aux: Vec<SortItem> = try_alloc(items.len(), "aux buffer")?;
        merge_sort(&mut items, &mut aux, false, self.trace);

        let path = self.scratch.next_run_path();
        let file = File::create(&path)
            .map_err(|e| XiSortError::io(format!("creating run file {}", path.display()), e))?;
        let mut writer = BufWriter::with_capacity(RUN_WRITE_BUFFER, file);
        for item in &items {
            writer
                .write_f64::<LittleEndian>(item.value)
                .map_err(|e| XiSortError::io(format!("writing run file {}", path.display()), e))?;
        }
        writer
            .flush()
            .map_err(|e| XiSortError::io(format!("flushing run file {}", path.display()), e))?;
        Ok(path)
    }
}
