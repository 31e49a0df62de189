#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use filedag::fs::FileSystem;
use filedag::fs::mock::MockFileSystem;

pub use filedag_test_utils::{init_tracing, with_timeout};

/// Mock filesystem plus the same storage as a trait object.
pub fn mock_fs() -> (MockFileSystem, Arc<dyn FileSystem>) {
    let fs = MockFileSystem::new();
    let shared: Arc<dyn FileSystem> = Arc::new(fs.clone());
    (fs, shared)
}

/// Write `dna_segment_1` and `dna_segment_2` under `dir`.
pub fn write_segments(dir: &Path, seg1: &[String], seg2: &[String]) {
    fs::write(dir.join("dna_segment_1"), seg1.join("\n") + "\n").unwrap();
    fs::write(dir.join("dna_segment_2"), seg2.join("\n") + "\n").unwrap();
}

/// Deterministic pseudo-DNA: `lines` lines of `width` bases.
pub fn synthetic_segment(seed: u64, lines: usize, width: usize) -> Vec<String> {
    const BASES: [char; 4] = ['A', 'C', 'G', 'T'];
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..lines)
        .map(|_| {
            (0..width)
                .map(|_| {
                    state = state
                        .wrapping_mul(6364136223846793005)
                        .wrapping_add(1442695040888963407);
                    BASES[((state >> 33) % 4) as usize]
                })
                .collect()
        })
        .collect()
}

/// Count `chars` over 1-based inclusive line range `first..=last`.
pub fn count_chars(lines: &[String], first: usize, last: usize, chars: &[char]) -> usize {
    lines
        .iter()
        .enumerate()
        .filter(|(i, _)| (first..=last).contains(&(i + 1)))
        .flat_map(|(_, l)| l.chars())
        .filter(|c| chars.contains(c))
        .count()
}

pub fn read_trimmed(path: &Path) -> String {
    fs::read_to_string(path).unwrap().trim().to_string()
}
