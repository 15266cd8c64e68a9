//! Byte-stream file access over a block store.
//!
//! `Bfs` owns the store, the open-file table and the access log. The
//! operations live in one module per family and are exposed as methods here.

use crate::config::BfsConfig;
use crate::core::logging::LogHandler;
use crate::errors::{BfsError, BfsResult};
use crate::storage::{BlockStore, DiskStore, FileDisk, MemDisk};

pub mod block_ops;
pub mod cursor_ops;
pub mod file_read;
pub mod file_write;
pub mod handle_ops;
pub mod open_files;
pub mod position;

pub use cursor_ops::Whence;
pub use open_files::{Fd, OpenFileTable};

/// Filesystem backed by a disk image file.
pub type DiskBfs = Bfs<DiskStore<FileDisk>>;

/// Filesystem on an in-memory device.
pub type MemBfs = Bfs<DiskStore<MemDisk>>;

pub struct Bfs<S: BlockStore> {
    config: BfsConfig,
    store: S,
    open_files: OpenFileTable,
    logger: LogHandler,
}

impl<S: BlockStore> Bfs<S> {
    /// Wrap an already formatted (or about to be formatted) store.
    pub fn with_store(config: &BfsConfig, store: S) -> BfsResult<Self> {
        LogHandler::validate_config(&config.logging)?;
        let logger = LogHandler::new(&config.logging)?;

        Ok(Self {
            config: config.clone(),
            store,
            open_files: OpenFileTable::new(config.geometry.max_open_files),
            logger,
        })
    }

    pub fn config(&self) -> &BfsConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn block_size(&self) -> usize {
        self.store.block_size()
    }

    pub fn open_file_count(&self) -> usize {
        self.open_files.len()
    }

    pub fn format_store(&mut self) -> BfsResult<()> {
        handle_ops::format_store(self)
    }

    pub fn create(&mut self, name: &str) -> BfsResult<Fd> {
        handle_ops::create(self, name)
    }

    pub fn open(&mut self, name: &str) -> BfsResult<Fd> {
        handle_ops::open(self, name)
    }

    pub fn close(&mut self, fd: Fd) -> BfsResult<()> {
        handle_ops::close(self, fd)
    }

    /// Read up to `buf.len()` bytes at the cursor; returns 0 at end of file.
    pub fn read(&mut self, fd: Fd, buf: &mut [u8]) -> BfsResult<usize> {
        file_read::read(self, fd, buf)
    }

    pub fn read_to_vec(&mut self, fd: Fd, len: usize) -> BfsResult<Vec<u8>> {
        file_read::read_to_vec(self, fd, len)
    }

    /// Write all of `data` at the cursor, growing the file as needed.
    pub fn write(&mut self, fd: Fd, data: &[u8]) -> BfsResult<()> {
        file_write::write(self, fd, data)
    }

    pub fn seek(&mut self, fd: Fd, delta: i64, whence: Whence) -> BfsResult<u64> {
        cursor_ops::seek(self, fd, delta, whence)
    }

    pub fn tell(&self, fd: Fd) -> BfsResult<u64> {
        cursor_ops::tell(self, fd)
    }

    pub fn size(&self, fd: Fd) -> BfsResult<u64> {
        cursor_ops::size(self, fd)
    }

    /// Flush the store and the access log.
    pub fn sync(&mut self) -> BfsResult<()> {
        self.store.sync()?;
        self.logger.flush_all()
    }

    /// Sync and give up the store. Handles still open are dropped.
    pub fn unmount(mut self) -> BfsResult<S> {
        if !self.open_files.is_empty() {
            log::warn!(
                "Unmounting with {} file(s) still open",
                self.open_files.len()
            );
        }
        self.sync()?;
        self.log_access("unmount", &self.config.disk_path.clone(), "success", None);
        Ok(self.store)
    }

    pub(crate) fn log_access(
        &self,
        operation: &str,
        target: &str,
        result: &str,
        details: Option<String>,
    ) {
        if let Err(e) = self.logger.log_access(operation, target, result, details) {
            log::error!("Failed to log access: {e}");
        }
    }

    pub(crate) fn log_failure(&self, operation: &str, target: &str, err: &BfsError) {
        if err.is_fatal() {
            log::error!("{operation} {target} failed: {err}");
        } else {
            log::debug!("{operation} {target} failed: {err}");
        }
        if let Err(e) = self.logger.log_error(operation, target, err) {
            log::error!("Failed to log access: {e}");
        }
    }

    pub(crate) fn log_transfer(&self, operation: &str, fd: Fd, bytes: usize, elapsed_us: u64) {
        if let Err(e) = self
            .logger
            .log_transfer(operation, &fd.to_string(), bytes as u64, elapsed_us)
        {
            log::error!("Failed to log access: {e}");
        }
    }
}
