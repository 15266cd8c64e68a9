//! Format, mount, create, open and close.

use crate::config::BfsConfig;
use crate::errors::{BfsError, BfsResult};
use crate::fs_impl::{Bfs, DiskBfs, Fd, MemBfs};
use crate::storage::{BlockStore, DiskStore, FileDisk, MemDisk};

impl DiskBfs {
    /// Create the disk image named by the configuration and lay down an empty
    /// filesystem on it.
    pub fn format(config: &BfsConfig) -> BfsResult<Self> {
        config.validate()?;
        let geometry = &config.geometry;

        let disk = FileDisk::create(
            &config.disk_path,
            geometry.block_size as usize,
            geometry.total_blocks,
        )?;
        let store = DiskStore::new(disk, geometry)?;

        let mut fs = Bfs::with_store(config, store)?;
        fs.format_store()?;
        Ok(fs)
    }

    /// Attach to an existing, formatted disk image.
    pub fn mount(config: &BfsConfig) -> BfsResult<Self> {
        config.validate()?;

        let result = FileDisk::open(&config.disk_path, config.geometry.block_size as usize)
            .and_then(DiskStore::load);
        let store = match result {
            Ok(store) => store,
            Err(e) => {
                log::error!("Cannot mount {}: {e}", config.disk_path);
                return Err(e);
            }
        };

        let stats = store.stats();
        let fs = Bfs::with_store(config, store)?;
        log::info!(
            "Mounted {}: {} files, {} of {} data blocks free",
            config.disk_path,
            stats.files,
            stats.free_blocks,
            stats.data_blocks
        );
        fs.log_access("mount", &config.disk_path, "success", None);
        Ok(fs)
    }
}

impl MemBfs {
    /// Formatted filesystem on an in-memory device.
    pub fn format_in_memory(config: &BfsConfig) -> BfsResult<Self> {
        config.geometry.validate()?;
        let geometry = &config.geometry;

        let disk = MemDisk::new(geometry.block_size as usize, geometry.total_blocks);
        let store = DiskStore::new(disk, geometry)?;

        let mut fs = Bfs::with_store(config, store)?;
        fs.format_store()?;
        Ok(fs)
    }
}

/// Initialise every on-disk structure, in dependency order, then sync.
pub fn format_store<S: BlockStore>(fs: &mut Bfs<S>) -> BfsResult<()> {
    let result = init_structures(&mut fs.store);
    let target = fs.config.disk_path.clone();
    match result {
        Ok(()) => {
            log::info!("Formatted {target}");
            fs.log_access("format", &target, "success", None);
            Ok(())
        }
        Err(e) => {
            fs.log_failure("format", &target, &e);
            Err(e)
        }
    }
}

fn init_structures<S: BlockStore>(store: &mut S) -> BfsResult<()> {
    store.init_superblock()?;
    store.init_inode_table()?;
    store.init_directory()?;
    store.init_free_list()?;
    store.sync()
}

/// Create `name`, truncating it if it exists, and open it with the cursor at 0.
pub fn create<S: BlockStore>(fs: &mut Bfs<S>, name: &str) -> BfsResult<Fd> {
    let result = fs.store.create_by_name(name).and_then(|inum| {
        let fd = fs.open_files.acquire(inum)?;
        fs.open_files.set_cursor(fd, 0)?;
        Ok(fd)
    });

    match result {
        Ok(fd) => {
            log::debug!("Created {name:?} on {fd}");
            fs.log_access("create", name, "success", Some(fd.to_string()));
            Ok(fd)
        }
        Err(e) => {
            fs.log_failure("create", name, &e);
            Err(e)
        }
    }
}

pub fn open<S: BlockStore>(fs: &mut Bfs<S>, name: &str) -> BfsResult<Fd> {
    let result = match fs.store.lookup_by_name(name) {
        Ok(Some(inum)) => fs.open_files.acquire(inum),
        Ok(None) => Err(BfsError::NotFound(name.to_string())),
        Err(e) => Err(e),
    };

    match result {
        Ok(fd) => {
            log::debug!("Opened {name:?} on {fd}");
            fs.log_access("open", name, "success", Some(fd.to_string()));
            Ok(fd)
        }
        Err(e) => {
            fs.log_failure("open", name, &e);
            Err(e)
        }
    }
}

pub fn close<S: BlockStore>(fs: &mut Bfs<S>, fd: Fd) -> BfsResult<()> {
    match fs.open_files.release(fd) {
        Ok(removed) => {
            let details = (!removed).then(|| "still referenced".to_string());
            fs.log_access("close", &fd.to_string(), "success", details);
            Ok(())
        }
        Err(e) => {
            fs.log_failure("close", &fd.to_string(), &e);
            Err(e)
        }
    }
}
