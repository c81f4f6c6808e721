//! End-to-end tests for the external (disk-backed) sort path.

use crate::helpers::{
    assert_bit_permutation, assert_sorted_total, duplicate_heavy, read_doubles, specials_vector,
    uniform_values, write_doubles,
};
use std::fs;
use tempfile::TempDir;
use xisort_lib::sort::XiSorter;

/// Counts `xisort_run_*.bin` leftovers in a directory.
fn leftover_runs(dir: &std::path::Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("xisort_run_"))
        .count()
}

#[test]
fn test_mode_equivalence_on_random_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.bin");
    let out_mem = dir.path().join("sorted_mem.bin");
    let out_ext = dir.path().join("sorted_ext.bin");

    let mut values = uniform_values(42, 100_000);
    values.extend(specials_vector());
    write_doubles(&input, &values);

    XiSorter::new().scratch_dir(dir.path().to_path_buf()).sort_file(&input, &out_mem).unwrap();

    let stats = XiSorter::new()
        .external(true)
        .memory_limit(64 * 1024)
        .buffer_elems(512)
        .scratch_dir(dir.path().to_path_buf())
        .sort_file(&input, &out_ext)
        .unwrap();

    assert!(stats.runs_written > 1, "expected the input to spill into multiple runs");
    assert_eq!(fs::read(&out_mem).unwrap(), fs::read(&out_ext).unwrap());
    assert_sorted_total(&read_doubles(&out_ext));
}

#[test]
fn test_external_output_is_permutation() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.bin");
    let output = dir.path().join("sorted.bin");

    let values = duplicate_heavy(9, 50_000);
    write_doubles(&input, &values);

    XiSorter::new()
        .external(true)
        .memory_limit(32 * 1024)
        .buffer_elems(256)
        .scratch_dir(dir.path().to_path_buf())
        .sort_file(&input, &output)
        .unwrap();

    let sorted = read_doubles(&output);
    assert_sorted_total(&sorted);
    assert_bit_permutation(&values, &sorted);
}

#[test]
fn test_multi_pass_merge_matches_single_pass() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.bin");
    let out_single = dir.path().join("single.bin");
    let out_multi = dir.path().join("multi.bin");

    let values = uniform_values(31, 10_000);
    write_doubles(&input, &values);

    // Generous budget: one merge pass.
    XiSorter::new()
        .external(true)
        .memory_limit(1 << 20)
        .buffer_elems(128)
        .scratch_dir(dir.path().to_path_buf())
        .sort_file(&input, &out_single)
        .unwrap();

    // Tiny budget: 128-element runs and a fan-in cap of
    // (1024 / 2) / (8 * 8) = 8, forcing extra rounds.
    let stats = XiSorter::new()
        .external(true)
        .memory_limit(1024)
        .buffer_elems(8)
        .scratch_dir(dir.path().to_path_buf())
        .sort_file(&input, &out_multi)
        .unwrap();

    assert!(stats.merge_passes > 1, "expected multi-pass merging, got {}", stats.merge_passes);
    assert_eq!(fs::read(&out_single).unwrap(), fs::read(&out_multi).unwrap());
}

#[test]
fn test_external_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.bin");
    let values = duplicate_heavy(2, 20_000);
    write_doubles(&input, &values);

    let sorter = XiSorter::new()
        .external(true)
        .memory_limit(16 * 1024)
        .buffer_elems(64)
        .scratch_dir(dir.path().to_path_buf());

    let out1 = dir.path().join("out1.bin");
    let out2 = dir.path().join("out2.bin");
    sorter.sort_file(&input, &out1).unwrap();
    sorter.sort_file(&input, &out2).unwrap();
    assert_eq!(fs::read(&out1).unwrap(), fs::read(&out2).unwrap());
}

#[test]
fn test_empty_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("empty.bin");
    let output = dir.path().join("sorted.bin");
    fs::write(&input, b"").unwrap();

    let stats = XiSorter::new()
        .external(true)
        .scratch_dir(dir.path().to_path_buf())
        .sort_file(&input, &output)
        .unwrap();

    assert_eq!(stats.elements, 0);
    assert!(output.exists());
    assert_eq!(fs::metadata(&output).unwrap().len(), 0);
}

#[test]
fn test_scratch_files_removed_on_success() {
    let dir = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let input = dir.path().join("input.bin");
    let output = dir.path().join("sorted.bin");
    write_doubles(&input, &uniform_values(8, 4_000));

    XiSorter::new()
        .external(true)
        .memory_limit(4 * 1024)
        .buffer_elems(64)
        .scratch_dir(scratch.path().to_path_buf())
        .sort_file(&input, &output)
        .unwrap();

    assert_eq!(leftover_runs(scratch.path()), 0);
    assert_sorted_total(&read_doubles(&output));
}

#[test]
fn test_in_memory_shortcut_for_small_files() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.bin");
    let output = dir.path().join("sorted.bin");
    write_doubles(&input, &[3.0, -1.0, 2.0]);

    let stats = XiSorter::new()
        .scratch_dir(dir.path().to_path_buf())
        .sort_file(&input, &output)
        .unwrap();

    assert_eq!(stats.runs_written, 0);
    assert_eq!(read_doubles(&output), vec![-1.0, 2.0, 3.0]);
}

#[test]
fn test_external_slice_round_trip() {
    let dir = TempDir::new().unwrap();
    let original = uniform_values(64, 5_000);

    let mut expected = original.clone();
    XiSorter::new().sort_slice(&mut expected).unwrap();

    let mut data = original;
    XiSorter::new()
        .external(true)
        .memory_limit(8 * 1024)
        .buffer_elems(128)
        .scratch_dir(dir.path().to_path_buf())
        .sort_slice(&mut data)
        .unwrap();

    crate::helpers::assert_same_bits(&expected, &data);
    assert_eq!(leftover_runs(dir.path()), 0);
}
