//! Seeded test-data generators and raw binary64 file helpers.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::Path;

/// A quiet NaN with the given extra payload bits, positive sign.
pub fn qnan(payload: u64) -> f64 {
    f64::from_bits(0x7FF8_0000_0000_0000 | payload)
}

/// A quiet NaN with the sign bit set.
pub fn neg_qnan(payload: u64) -> f64 {
    f64::from_bits(0xFFF8_0000_0000_0000 | payload)
}

/// The canonical special-values vector: finite values, both zeros, both
/// infinities, and a payload-carrying NaN.
pub fn specials_vector() -> Vec<f64> {
    vec![5.0, -0.0, 0.0, qnan(0x1), -5.0, f64::INFINITY, f64::NEG_INFINITY]
}

/// `n` uniform doubles in [-1, 1), reproducible from `seed`.
pub fn uniform_values(seed: u64, n: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.random::<f64>() * 2.0 - 1.0).collect()
}

/// Duplicate-heavy distribution: ten buckets, one of them fractional.
pub fn duplicate_heavy(seed: u64, n: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let bucket = rng.random_range(0..10);
            if bucket == 0 { 0.123_456_789 } else { f64::from(bucket) }
        })
        .collect()
}

/// `n` zeros followed by `n` negative zeros.
pub fn signed_zero_blocks(n: usize) -> Vec<f64> {
    let mut values = vec![0.0; n];
    values.extend(vec![-0.0; n]);
    values
}

/// Writes `values` to `path` as tightly packed little-endian doubles.
pub fn write_doubles(path: &Path, values: &[f64]) {
    let mut encoded = Vec::with_capacity(values.len() * 8);
    for &value in values {
        encoded.write_f64::<LittleEndian>(value).unwrap();
    }
    fs::write(path, encoded).unwrap();
}

/// Reads a packed little-endian binary64 file.
pub fn read_doubles(path: &Path) -> Vec<f64> {
    let data = fs::read(path).unwrap();
    assert_eq!(data.len() % 8, 0, "file length not a multiple of 8");
    let mut values = vec![0.0; data.len() / 8];
    LittleEndian::read_f64_into(&data, &mut values);
    values
}
