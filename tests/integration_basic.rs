//! End-to-end stream I/O tests
//!
//! These tests drive the public API the way a host program would: format or
//! mount a disk image, then create, open, read, write, seek and close files.

use bfs::config::GeometryConfig;
use bfs::errors::BfsError;
use bfs::fs_impl::{DiskBfs, Whence};

mod test_helpers;
use test_helpers::{
    create_config_with_geometry, create_mem_fs, create_mem_fs_with, create_test_fs, patterned,
};

#[test]
fn test_overwrite_scenario() {
    let (_temp_dir, mut fs) = create_test_fs();
    assert_eq!(fs.block_size(), 512);

    let fd = fs.create("a").unwrap();
    fs.write(fd, &[0xAB; 600]).unwrap();
    assert_eq!(fs.size(fd).unwrap(), 600);

    assert_eq!(fs.seek(fd, 100, Whence::Set).unwrap(), 100);
    fs.write(fd, &[0xCD; 50]).unwrap();
    assert_eq!(fs.size(fd).unwrap(), 600);

    fs.seek(fd, 0, Whence::Set).unwrap();
    let mut buf = [0u8; 600];
    assert_eq!(fs.read(fd, &mut buf).unwrap(), 600);
    assert!(buf[0..100].iter().all(|&b| b == 0xAB));
    assert!(buf[100..150].iter().all(|&b| b == 0xCD));
    assert!(buf[150..600].iter().all(|&b| b == 0xAB));
}

#[test]
fn test_open_missing_file() {
    let (_temp_dir, mut fs) = create_test_fs();
    let err = fs.open("missing").unwrap_err();
    assert_eq!(err, BfsError::NotFound("missing".to_string()));
    assert!(!err.is_fatal());
}

#[test]
fn test_new_file_reads_empty() {
    let (_temp_dir, mut fs) = create_test_fs();
    let fd = fs.create("empty").unwrap();
    let mut buf = [0u8; 10];
    assert_eq!(fs.read(fd, &mut buf).unwrap(), 0);
}

#[test]
fn test_partial_write_keeps_block_neighbours() {
    let mut fs = create_mem_fs();
    let fd = fs.create("f").unwrap();
    fs.write(fd, &[0x11; 512]).unwrap();

    fs.seek(fd, 1, Whence::Set).unwrap();
    fs.write(fd, &[0x22, 0x33, 0x44]).unwrap();

    fs.seek(fd, 0, Whence::Set).unwrap();
    let block = fs.read_to_vec(fd, 512).unwrap();
    assert_eq!(block[0], 0x11);
    assert_eq!(&block[1..4], &[0x22, 0x33, 0x44]);
    assert!(block[4..].iter().all(|&b| b == 0x11));
}

#[test]
fn test_sequential_writes_append() {
    let mut fs = create_mem_fs();
    let data = patterned(3000);
    let fd = fs.create("log").unwrap();

    // Uneven chunk sizes so chunk edges fall everywhere inside blocks
    for chunk in data.chunks(333) {
        fs.write(fd, chunk).unwrap();
    }
    assert_eq!(fs.size(fd).unwrap(), 3000);
    assert_eq!(fs.tell(fd).unwrap(), 3000);

    fs.seek(fd, 0, Whence::Set).unwrap();
    let mut read_back = Vec::new();
    let mut buf = [0u8; 700];
    loop {
        let n = fs.read(fd, &mut buf).unwrap();
        if n == 0 {
            break;
        }
        read_back.extend_from_slice(&buf[..n]);
    }
    assert_eq!(read_back, data);
}

#[test]
fn test_large_file_uses_indirect_block() {
    let mut fs = create_mem_fs();
    // 20 blocks: 12 direct, the rest through the indirect block
    let data = patterned(20 * 512 + 17);
    let fd = fs.create("big").unwrap();
    fs.write(fd, &data).unwrap();

    fs.seek(fd, -(data.len() as i64), Whence::End).unwrap();
    assert_eq!(fs.read_to_vec(fd, data.len()).unwrap(), data);
}

#[test]
fn test_persistence_across_mounts() {
    let temp_dir = tempfile::tempdir().unwrap();
    let geometry = GeometryConfig {
        block_size: 1024,
        total_blocks: 512,
        inode_count: 32,
        max_open_files: 8,
    };
    let config = create_config_with_geometry(temp_dir.path(), geometry);
    let alpha = patterned(5000);

    {
        let mut fs = DiskBfs::format(&config).unwrap();
        let fd = fs.create("alpha").unwrap();
        fs.write(fd, &alpha).unwrap();
        fs.close(fd).unwrap();

        let fd = fs.create("beta").unwrap();
        fs.write(fd, b"second file").unwrap();
        fs.close(fd).unwrap();
        fs.unmount().unwrap();
    }

    let mut fs = DiskBfs::mount(&config).unwrap();
    assert_eq!(fs.block_size(), 1024);

    let fd = fs.open("alpha").unwrap();
    assert_eq!(fs.size(fd).unwrap(), 5000);
    fs.seek(fd, 1000, Whence::Set).unwrap();
    fs.write(fd, b"patched").unwrap();
    fs.close(fd).unwrap();
    fs.unmount().unwrap();

    let mut fs = DiskBfs::mount(&config).unwrap();
    let fd = fs.open("alpha").unwrap();
    let mut expected = alpha.clone();
    expected[1000..1007].copy_from_slice(b"patched");
    assert_eq!(fs.read_to_vec(fd, usize::MAX).unwrap(), expected);

    let fd = fs.open("beta").unwrap();
    assert_eq!(fs.read_to_vec(fd, 64).unwrap(), b"second file");

    let mut names: Vec<_> = fs
        .store()
        .entries()
        .into_iter()
        .map(|(name, _, size)| (name, size))
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![("alpha".to_string(), 5000), ("beta".to_string(), 11)]
    );
}

#[test]
fn test_recreate_frees_blocks() {
    let mut fs = create_mem_fs();
    let free_initially = fs.store().stats().free_blocks;

    let fd = fs.create("tmp").unwrap();
    fs.write(fd, &patterned(4096)).unwrap();
    assert_eq!(fs.store().stats().free_blocks, free_initially - 8);

    let fd = fs.create("tmp").unwrap();
    assert_eq!(fs.size(fd).unwrap(), 0);
    assert_eq!(fs.store().stats().free_blocks, free_initially);
}

#[test]
fn test_many_files_in_small_geometry() {
    let mut fs = create_mem_fs_with(GeometryConfig {
        block_size: 128,
        total_blocks: 256,
        inode_count: 16,
        max_open_files: 16,
    });

    let mut fds = Vec::new();
    for i in 0..16 {
        let fd = fs.create(&format!("f{i:02}")).unwrap();
        fs.write(fd, format!("contents of file {i}").as_bytes())
            .unwrap();
        fds.push(fd);
    }

    for (i, fd) in fds.into_iter().enumerate() {
        fs.seek(fd, 0, Whence::Set).unwrap();
        let expected = format!("contents of file {i}");
        assert_eq!(fs.read_to_vec(fd, 100).unwrap(), expected.as_bytes());
        fs.close(fd).unwrap();
    }
    assert_eq!(fs.open_file_count(), 0);
}

#[test]
fn test_seek_end_then_extend() {
    let mut fs = create_mem_fs();
    let fd = fs.create("f").unwrap();
    fs.write(fd, b"0123456789").unwrap();

    fs.seek(fd, 5, Whence::End).unwrap();
    fs.write(fd, b"xyz").unwrap();
    assert_eq!(fs.size(fd).unwrap(), 18);

    fs.seek(fd, 0, Whence::Set).unwrap();
    assert_eq!(
        fs.read_to_vec(fd, 100).unwrap(),
        b"0123456789\0\0\0\0\0xyz"
    );
}

#[test]
fn test_access_log_records_operations() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = test_helpers::create_test_config(temp_dir.path());
    config.logging = bfs::config::LogConfig {
        enabled: true,
        file_path: temp_dir
            .path()
            .join("logs/access.log")
            .to_string_lossy()
            .to_string(),
        level: "debug".to_string(),
        max_size: 1024 * 1024,
        rotation_count: 2,
    };

    let mut fs = DiskBfs::format(&config).unwrap();
    let fd = fs.create("logged").unwrap();
    fs.write(fd, b"abc").unwrap();
    let _ = fs.open("nope");
    fs.close(fd).unwrap();
    fs.unmount().unwrap();

    let log = std::fs::read_to_string(&config.logging.file_path).unwrap();
    let entries: Vec<bfs::AccessLogEntry> = log
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let operations: Vec<&str> = entries.iter().map(|e| e.operation.as_str()).collect();
    assert_eq!(
        operations,
        ["format", "create", "write", "open", "close", "unmount"]
    );
    assert_eq!(entries[3].result, "error");
    assert_eq!(entries[2].bytes, Some(3));
}
