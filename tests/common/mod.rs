#![allow(dead_code)]

pub mod config_test_utils;
pub mod share_http;

use std::path::PathBuf;
use tempfile::TempDir;

pub const SECRET: &str = "brave-otter";

pub fn setup_temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

pub fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("Failed to write test file");
    path
}

/// Deterministic non-trivial payload.
pub fn sample_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
