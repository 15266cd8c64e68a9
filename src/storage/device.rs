//! Raw block devices.
//!
//! A device knows nothing about files: it reads and writes whole blocks by
//! device block number.

use crate::errors::{BfsError, BfsResult};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

pub trait BlockDevice {
    fn block_size(&self) -> usize;

    fn block_count(&self) -> u32;

    /// Read block `dbn` into `buf`, which must be exactly one block long.
    fn read_block(&self, dbn: u32, buf: &mut [u8]) -> BfsResult<()>;

    /// Write one full block at `dbn`.
    fn write_block(&mut self, dbn: u32, buf: &[u8]) -> BfsResult<()>;

    /// Flush pending writes to stable storage.
    fn sync(&mut self) -> BfsResult<()>;
}

fn check_access(dev: &impl BlockDevice, dbn: u32, len: usize) -> BfsResult<()> {
    if dbn >= dev.block_count() {
        return Err(BfsError::Alloc(format!(
            "device block {dbn} out of range (device has {} blocks)",
            dev.block_count()
        )));
    }
    if len != dev.block_size() {
        return Err(BfsError::Alloc(format!(
            "buffer of {len} bytes is not one {}-byte block",
            dev.block_size()
        )));
    }
    Ok(())
}

/// Disk image backed by a regular file, using positioned reads and writes.
#[derive(Debug)]
pub struct FileDisk {
    file: File,
    path: PathBuf,
    block_size: usize,
    block_count: u32,
}

impl FileDisk {
    /// Create (or overwrite) a zero-filled image of `block_count` blocks.
    pub fn create(path: impl AsRef<Path>, block_size: usize, block_count: u32) -> BfsResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(block_size as u64 * u64::from(block_count))?;

        log::debug!("Created disk image {path:?}: {block_count} blocks of {block_size} bytes");
        Ok(Self {
            file,
            path: path.to_path_buf(),
            block_size,
            block_count,
        })
    }

    /// Open an existing image. The image length must be a whole number of blocks.
    pub fn open(path: impl AsRef<Path>, block_size: usize) -> BfsResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(BfsError::NoDisk(path.to_string_lossy().to_string()));
        }

        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        if block_size == 0 || len % block_size as u64 != 0 {
            return Err(BfsError::Corrupt(format!(
                "image length {len} is not a multiple of the {block_size}-byte block size"
            )));
        }
        let block_count = u32::try_from(len / block_size as u64)
            .map_err(|_| BfsError::Corrupt(format!("image of {len} bytes is too large")))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            block_size,
            block_count,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlockDevice for FileDisk {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn block_count(&self) -> u32 {
        self.block_count
    }

    fn read_block(&self, dbn: u32, buf: &mut [u8]) -> BfsResult<()> {
        check_access(self, dbn, buf.len())?;
        self.file
            .read_exact_at(buf, u64::from(dbn) * self.block_size as u64)?;
        Ok(())
    }

    fn write_block(&mut self, dbn: u32, buf: &[u8]) -> BfsResult<()> {
        check_access(&*self, dbn, buf.len())?;
        self.file
            .write_all_at(buf, u64::from(dbn) * self.block_size as u64)?;
        Ok(())
    }

    fn sync(&mut self) -> BfsResult<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

/// In-memory device, used by tests and benches.
#[derive(Debug, Clone)]
pub struct MemDisk {
    bytes: Vec<u8>,
    block_size: usize,
    block_count: u32,
}

impl MemDisk {
    pub fn new(block_size: usize, block_count: u32) -> Self {
        Self {
            bytes: vec![0u8; block_size * block_count as usize],
            block_size,
            block_count,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl BlockDevice for MemDisk {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn block_count(&self) -> u32 {
        self.block_count
    }

    fn read_block(&self, dbn: u32, buf: &mut [u8]) -> BfsResult<()> {
        check_access(self, dbn, buf.len())?;
        let start = dbn as usize * self.block_size;
        buf.copy_from_slice(&self.bytes[start..start + self.block_size]);
        Ok(())
    }

    fn write_block(&mut self, dbn: u32, buf: &[u8]) -> BfsResult<()> {
        check_access(&*self, dbn, buf.len())?;
        let start = dbn as usize * self.block_size;
        self.bytes[start..start + self.block_size].copy_from_slice(buf);
        Ok(())
    }

    fn sync(&mut self) -> BfsResult<()> {
        Ok(())
    }
}
