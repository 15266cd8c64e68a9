//! IO error path tests
//!
//! Host-side failures (unwritable paths, images that are directories) must come
//! back as fatal `Io` errors from the operation that hit them.

use crate::config::{BfsConfig, BfsConfigBuilder, GeometryConfig, LogConfig};
use crate::errors::BfsError;
use crate::fs_impl::DiskBfs;
use std::io;

fn config_for(disk_path: &std::path::Path) -> BfsConfig {
    BfsConfigBuilder::new()
        .disk_path(disk_path.to_string_lossy().to_string())
        .geometry(GeometryConfig {
            block_size: 512,
            total_blocks: 64,
            inode_count: 8,
            max_open_files: 4,
        })
        .logging(LogConfig::disabled())
        .build()
        .unwrap()
}

#[test]
fn test_io_error_conversion() {
    let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
    let bfs_err: BfsError = io_err.into();

    assert!(matches!(bfs_err, BfsError::Io(_)));
    assert!(bfs_err.is_fatal());
    assert_eq!(format!("{bfs_err}"), "I/O error: access denied");
}

#[test]
fn test_format_onto_directory_path() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let config = config_for(temp_dir.path());

    match DiskBfs::format(&config) {
        Err(err @ BfsError::Io(_)) => assert!(err.is_fatal()),
        Err(other) => panic!("expected Io error, got {other}"),
        Ok(_) => panic!("formatted a directory"),
    }
}

#[test]
fn test_mount_directory_path() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let config = config_for(temp_dir.path());

    let err = DiskBfs::mount(&config).err().unwrap();
    assert!(matches!(err, BfsError::Io(_)));
}

#[test]
fn test_format_creates_parent_directories() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let disk = temp_dir.path().join("nested/images/BFSDISK");
    let config = config_for(&disk);

    DiskBfs::format(&config).unwrap().unmount().unwrap();
    assert_eq!(std::fs::metadata(&disk).unwrap().len(), 512 * 64);
}

#[test]
fn test_unwritable_access_log() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let mut config = config_for(&temp_dir.path().join("BFSDISK"));
    // The log path names an existing directory
    config.logging = LogConfig {
        enabled: true,
        file_path: temp_dir.path().to_string_lossy().to_string(),
        ..LogConfig::default()
    };

    let err = DiskBfs::format(&config).err().unwrap();
    assert!(matches!(err, BfsError::Io(_)));
}

#[test]
fn test_error_display() {
    let errors = vec![
        BfsError::NotFound("a".to_string()),
        BfsError::InvalidName("bad name".to_string()),
        BfsError::NoSpace("no free inode".to_string()),
        BfsError::TooManyOpenFiles(32),
        BfsError::BadHandle(7),
        BfsError::BadCursor(-1),
        BfsError::BadWhence(9),
        BfsError::Alloc("disk full".to_string()),
        BfsError::NoDisk("BFSDISK".to_string()),
        BfsError::Corrupt("bad magic".to_string()),
        BfsError::Config("invalid configuration".to_string()),
        BfsError::Log("logging failed".to_string()),
        BfsError::Serialization("parse error".to_string()),
    ];

    for err in errors {
        let display = format!("{err}");
        assert!(!display.is_empty());
        assert!(display.contains(':'));
    }
}
