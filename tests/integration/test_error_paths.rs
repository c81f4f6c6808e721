//! Error-path coverage: malformed inputs, missing files, bad configuration.

use crate::helpers::{uniform_values, write_doubles};
use std::fs;
use tempfile::TempDir;
use xisort_lib::sort::XiSorter;
use xisort_lib::XiSortError;

#[test]
fn test_malformed_length_rejected() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("truncated.bin");
    let output = dir.path().join("sorted.bin");
    fs::write(&input, vec![0u8; 13]).unwrap();

    let result = XiSorter::new()
        .scratch_dir(dir.path().to_path_buf())
        .sort_file(&input, &output);

    match result {
        Err(XiSortError::InvalidInput { reason, .. }) => {
            assert!(reason.contains("invalid input length"), "unexpected reason: {reason}");
        }
        other => panic!("expected InvalidInput, got {other:?}"),
    }
    // No output file may be created for a rejected input.
    assert!(!output.exists());
}

#[test]
fn test_malformed_length_rejected_in_external_mode() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("truncated.bin");
    let output = dir.path().join("sorted.bin");
    fs::write(&input, vec![0u8; 20001]).unwrap();

    let result = XiSorter::new()
        .external(true)
        .memory_limit(1024)
        .scratch_dir(dir.path().to_path_buf())
        .sort_file(&input, &output);

    assert!(matches!(result, Err(XiSortError::InvalidInput { .. })));
    assert!(!output.exists());
}

#[test]
fn test_missing_input_rejected() {
    let dir = TempDir::new().unwrap();
    let result = XiSorter::new()
        .scratch_dir(dir.path().to_path_buf())
        .sort_file(&dir.path().join("nope.bin"), &dir.path().join("out.bin"));
    assert!(matches!(result, Err(XiSortError::InvalidInput { .. })));
}

#[test]
fn test_zero_mem_limit_rejected_in_external_mode() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.bin");
    let output = dir.path().join("sorted.bin");
    write_doubles(&input, &[1.0, 2.0]);

    let result = XiSorter::new()
        .external(true)
        .memory_limit(0)
        .scratch_dir(dir.path().to_path_buf())
        .sort_file(&input, &output);

    match result {
        Err(XiSortError::InvalidConfig { parameter, .. }) => assert_eq!(parameter, "mem_limit"),
        other => panic!("expected InvalidConfig, got {other:?}"),
    }
    assert!(!output.exists());
}

#[test]
fn test_zero_mem_limit_rejected_for_empty_file() {
    // An empty input is valid, but an invalid configuration is still
    // rejected before any output is produced.
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("empty.bin");
    let output = dir.path().join("sorted.bin");
    fs::write(&input, b"").unwrap();

    let result = XiSorter::new()
        .external(true)
        .memory_limit(0)
        .scratch_dir(dir.path().to_path_buf())
        .sort_file(&input, &output);

    match result {
        Err(XiSortError::InvalidConfig { parameter, .. }) => assert_eq!(parameter, "mem_limit"),
        other => panic!("expected InvalidConfig, got {other:?}"),
    }
    assert!(!output.exists());
}

#[test]
fn test_zero_buffer_elems_rejected() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.bin");
    write_doubles(&input, &[1.0]);

    let result = XiSorter::new()
        .buffer_elems(0)
        .scratch_dir(dir.path().to_path_buf())
        .sort_file(&input, &dir.path().join("out.bin"));

    assert!(matches!(result, Err(XiSortError::InvalidConfig { .. })));
}

#[test]
fn test_failure_leaves_no_scratch_behind() {
    let dir = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let input = dir.path().join("input.bin");
    write_doubles(&input, &uniform_values(1, 1_000));

    // The output directory does not exist, so the merge phase fails after
    // runs have already been written to scratch.
    let output = dir.path().join("no_such_dir").join("out.bin");
    let result = XiSorter::new()
        .external(true)
        .memory_limit(1024)
        .buffer_elems(16)
        .scratch_dir(scratch.path().to_path_buf())
        .sort_file(&input, &output);

    assert!(matches!(result, Err(XiSortError::Io { .. })));
    assert!(!output.exists());
    let leftovers = fs::read_dir(scratch.path()).unwrap().count();
    assert_eq!(leftovers, 0, "scratch files left behind after failure");
}
