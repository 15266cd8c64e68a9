//! Test helpers for bfs testing
//!
//! Provides utilities for creating formatted test filesystems, either on a
//! disk image in a temporary directory or on an in-memory device.

#![allow(dead_code)]

use bfs::config::{BfsConfig, BfsConfigBuilder, GeometryConfig, LogConfig};
use bfs::fs_impl::{DiskBfs, MemBfs};
use std::path::Path;
use tempfile::TempDir;

/// Test configuration with logging disabled and the disk image under `dir`
pub fn create_test_config(dir: &Path) -> BfsConfig {
    BfsConfigBuilder::new()
        .disk_path(dir.join("BFSDISK").to_string_lossy().to_string())
        .logging(LogConfig::disabled())
        .build()
        .unwrap()
}

/// Same as `create_test_config` with a custom geometry
pub fn create_config_with_geometry(dir: &Path, geometry: GeometryConfig) -> BfsConfig {
    BfsConfigBuilder::new()
        .disk_path(dir.join("BFSDISK").to_string_lossy().to_string())
        .geometry(geometry)
        .logging(LogConfig::disabled())
        .build()
        .unwrap()
}

/// Formatted filesystem on a disk image; the image lives as long as the `TempDir`.
pub fn create_test_fs() -> (TempDir, DiskBfs) {
    let temp_dir = TempDir::new().unwrap();
    let config = create_test_config(temp_dir.path());
    let fs = DiskBfs::format(&config).unwrap();
    (temp_dir, fs)
}

/// Formatted in-memory filesystem with the default geometry
pub fn create_mem_fs() -> MemBfs {
    let config = BfsConfigBuilder::new()
        .logging(LogConfig::disabled())
        .build()
        .unwrap();
    MemBfs::format_in_memory(&config).unwrap()
}

/// Formatted in-memory filesystem with a custom geometry
pub fn create_mem_fs_with(geometry: GeometryConfig) -> MemBfs {
    let config = BfsConfigBuilder::new()
        .geometry(geometry)
        .logging(LogConfig::disabled())
        .build()
        .unwrap();
    MemBfs::format_in_memory(&config).unwrap()
}

/// Deterministic, non-repeating-per-block test data
pub fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}
