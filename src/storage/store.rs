//! The block-store boundary consumed by the stream layer, and the
//! `DiskStore` implementation of it.

use crate::config::GeometryConfig;
use crate::errors::{BfsError, BfsResult};
use crate::storage::device::BlockDevice;
use crate::storage::layout::{
    DIRECT_BLOCKS, DIRENT_SIZE, DirEntry, INODE_SIZE, Inode, Inum, Layout, Superblock, get_u32,
    put_u32,
};
use crate::utils::Utils;

/// Services the stream layer needs from the storage engine.
///
/// File blocks are addressed by file-relative block number (FBN); writes go to
/// a device block number (DBN) obtained from `resolve_device_block`.
pub trait BlockStore {
    fn block_size(&self) -> usize;

    fn init_superblock(&mut self) -> BfsResult<()>;
    fn init_inode_table(&mut self) -> BfsResult<()>;
    fn init_directory(&mut self) -> BfsResult<()>;
    fn init_free_list(&mut self) -> BfsResult<()>;

    /// Check the on-disk structures of a mounted store.
    fn verify(&self) -> BfsResult<()>;

    /// Create `name`, or truncate it to zero length if it already exists.
    fn create_by_name(&mut self, name: &str) -> BfsResult<Inum>;
    fn lookup_by_name(&self, name: &str) -> BfsResult<Option<Inum>>;

    /// Read the `fbn`-th block of the file into `buf`.
    fn read_block(&self, inum: Inum, fbn: u32, buf: &mut [u8]) -> BfsResult<()>;
    /// Write one full block at device block `dbn`.
    fn write_block(&mut self, dbn: u32, buf: &[u8]) -> BfsResult<()>;
    fn resolve_device_block(&self, inum: Inum, fbn: u32) -> BfsResult<u32>;

    /// Number of blocks currently allocated to the file.
    fn allocated_blocks(&self, inum: Inum) -> BfsResult<u32>;
    /// Grow the allocation to cover FBNs `0..=last_fbn`.
    fn extend_allocation(&mut self, inum: Inum, last_fbn: u32) -> BfsResult<()>;

    fn get_size(&self, inum: Inum) -> BfsResult<u64>;
    fn set_size(&mut self, inum: Inum, size: u64) -> BfsResult<()>;

    fn sync(&mut self) -> BfsResult<()>;
}

/// Usage summary of a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub block_size: u32,
    pub total_blocks: u32,
    pub data_blocks: u32,
    pub free_blocks: u32,
    pub inode_count: u32,
    pub files: u32,
}

/// BFS store on a block device. Superblock, inode table and directory are kept
/// in memory and written through on every change; data blocks are never cached.
pub struct DiskStore<D: BlockDevice> {
    device: D,
    sb: Superblock,
    inodes: Vec<Inode>,
    dir: Vec<DirEntry>,
}

impl<D: BlockDevice> DiskStore<D> {
    /// Wrap a device that is about to be formatted with `geometry`.
    pub fn new(device: D, geometry: &GeometryConfig) -> BfsResult<Self> {
        geometry.validate()?;
        if device.block_size() != geometry.block_size as usize {
            return Err(BfsError::Config(format!(
                "device block size {} does not match configured {}",
                device.block_size(),
                geometry.block_size
            )));
        }
        if device.block_count() < geometry.total_blocks {
            return Err(BfsError::Config(format!(
                "device has {} blocks, geometry needs {}",
                device.block_count(),
                geometry.total_blocks
            )));
        }

        let layout = Layout::compute(geometry);
        Ok(Self {
            device,
            sb: Superblock::new(layout),
            inodes: vec![Inode::default(); layout.inode_count as usize],
            dir: vec![DirEntry::default(); layout.inode_count as usize],
        })
    }

    /// Load a formatted store from its device.
    pub fn load(device: D) -> BfsResult<Self> {
        let block_size = device.block_size();
        let mut block = vec![0u8; block_size];
        device.read_block(0, &mut block)?;
        let sb = Superblock::decode(&block)?;
        let layout = sb.layout;

        if layout.block_size as usize != block_size {
            return Err(BfsError::Corrupt(format!(
                "superblock block size {} does not match device block size {block_size}",
                layout.block_size
            )));
        }

        let mut store = Self {
            device,
            sb,
            inodes: Vec::new(),
            dir: Vec::new(),
        };
        // The inode count is only trusted once the layout fits the device
        store.verify()?;
        store.inodes.reserve(layout.inode_count as usize);
        store.dir.reserve(layout.inode_count as usize);

        for b in 0..layout.inode_blocks {
            store.device.read_block(layout.inode_start + b, &mut block)?;
            for raw in block.chunks_exact(INODE_SIZE) {
                if store.inodes.len() < layout.inode_count as usize {
                    store.inodes.push(Inode::decode(raw));
                }
            }
        }
        for b in 0..layout.dir_blocks {
            store.device.read_block(layout.dir_start + b, &mut block)?;
            for raw in block.chunks_exact(DIRENT_SIZE) {
                if store.dir.len() < layout.inode_count as usize {
                    store.dir.push(DirEntry::decode(raw)?);
                }
            }
        }

        log::debug!(
            "Loaded store: {} files, {} free blocks",
            store.stats().files,
            store.sb.free_count
        );
        Ok(store)
    }

    pub fn layout(&self) -> &Layout {
        &self.sb.layout
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    pub fn stats(&self) -> StoreStats {
        let layout = &self.sb.layout;
        StoreStats {
            block_size: layout.block_size,
            total_blocks: layout.total_blocks,
            data_blocks: layout.data_blocks(),
            free_blocks: self.sb.free_count,
            inode_count: layout.inode_count,
            files: self.inodes.iter().filter(|i| i.in_use).count() as u32,
        }
    }

    /// Directory listing: name, inode and logical size.
    pub fn entries(&self) -> Vec<(String, Inum, u64)> {
        self.dir
            .iter()
            .filter(|e| !e.is_free())
            .map(|e| {
                let size = self
                    .inodes
                    .get(e.inum as usize)
                    .map(|i| i.size)
                    .unwrap_or(0);
                (e.name.clone(), Inum(e.inum), size)
            })
            .collect()
    }

    fn inode(&self, inum: Inum) -> BfsResult<&Inode> {
        match self.inodes.get(inum.0 as usize) {
            Some(inode) if inode.in_use => Ok(inode),
            _ => Err(BfsError::Corrupt(format!("{inum} is not in use"))),
        }
    }

    fn write_superblock(&mut self) -> BfsResult<()> {
        let mut block = vec![0u8; self.block_size()];
        self.sb.encode(&mut block);
        self.device.write_block(0, &block)
    }

    fn write_inode(&mut self, inum: Inum) -> BfsResult<()> {
        let per_block = self.sb.layout.inodes_per_block();
        let dbn = self.sb.layout.inode_start + (inum.0 as usize / per_block) as u32;
        let at = (inum.0 as usize % per_block) * INODE_SIZE;

        let mut block = vec![0u8; self.block_size()];
        self.device.read_block(dbn, &mut block)?;
        self.inodes[inum.0 as usize].encode(&mut block[at..at + INODE_SIZE]);
        self.device.write_block(dbn, &block)
    }

    fn write_dir_entry(&mut self, slot: usize) -> BfsResult<()> {
        let per_block = self.sb.layout.entries_per_block();
        let dbn = self.sb.layout.dir_start + (slot / per_block) as u32;
        let at = (slot % per_block) * DIRENT_SIZE;

        let mut block = vec![0u8; self.block_size()];
        self.device.read_block(dbn, &mut block)?;
        self.dir[slot].encode(&mut block[at..at + DIRENT_SIZE]);
        self.device.write_block(dbn, &block)
    }

    fn zero_metadata_blocks(&mut self, start: u32, count: u32) -> BfsResult<()> {
        let zero = vec![0u8; self.block_size()];
        for dbn in start..start + count {
            self.device.write_block(dbn, &zero)?;
        }
        Ok(())
    }

    /// Pop the head of the free list, zero-filled.
    fn alloc_block(&mut self) -> BfsResult<u32> {
        let dbn = self.sb.first_free;
        if dbn == 0 || self.sb.free_count == 0 {
            return Err(BfsError::Alloc("disk full".to_string()));
        }
        let data_area = self.sb.layout.data_start..self.sb.layout.total_blocks;
        if !data_area.contains(&dbn) {
            return Err(BfsError::Corrupt(format!(
                "free list head {dbn} outside the data area"
            )));
        }

        let mut block = vec![0u8; self.block_size()];
        self.device.read_block(dbn, &mut block)?;
        let next = get_u32(&block, 0);
        if next != 0 && !data_area.contains(&next) {
            return Err(BfsError::Corrupt(format!(
                "free block {dbn} links to block {next} outside the data area"
            )));
        }

        block.fill(0);
        self.device.write_block(dbn, &block)?;

        self.sb.first_free = next;
        self.sb.free_count -= 1;
        self.write_superblock()?;
        log::trace!("Allocated block {dbn}, {} free", self.sb.free_count);
        Ok(dbn)
    }

    fn release_block(&mut self, dbn: u32) -> BfsResult<()> {
        let mut block = vec![0u8; self.block_size()];
        put_u32(&mut block, 0, self.sb.first_free);
        self.device.write_block(dbn, &block)?;

        self.sb.first_free = dbn;
        self.sb.free_count += 1;
        self.write_superblock()
    }

    fn read_pointer_block(&self, dbn: u32) -> BfsResult<Vec<u8>> {
        let mut block = vec![0u8; self.block_size()];
        self.device.read_block(dbn, &mut block)?;
        Ok(block)
    }

    /// Block pointer for `fbn`, 0 when unallocated.
    fn block_pointer(&self, inode: &Inode, fbn: u32) -> BfsResult<u32> {
        let fbn = fbn as usize;
        if fbn < DIRECT_BLOCKS {
            return Ok(inode.direct[fbn]);
        }
        let index = fbn - DIRECT_BLOCKS;
        if index >= self.sb.layout.pointers_per_block() || inode.indirect == 0 {
            return Ok(0);
        }
        let block = self.read_pointer_block(inode.indirect)?;
        Ok(get_u32(&block, index * 4))
    }

    /// Return every block of the file to the free list and reset its size.
    fn truncate(&mut self, inum: Inum) -> BfsResult<()> {
        let inode = self.inode(inum)?.clone();
        let mut released = 0;

        for dbn in inode.direct.iter().copied().filter(|&d| d != 0) {
            self.release_block(dbn)?;
            released += 1;
        }
        if inode.indirect != 0 {
            let block = self.read_pointer_block(inode.indirect)?;
            for index in 0..self.sb.layout.pointers_per_block() {
                let dbn = get_u32(&block, index * 4);
                if dbn != 0 {
                    self.release_block(dbn)?;
                    released += 1;
                }
            }
            self.release_block(inode.indirect)?;
        }

        let slot = &mut self.inodes[inum.0 as usize];
        slot.size = 0;
        slot.direct = [0; DIRECT_BLOCKS];
        slot.indirect = 0;
        self.write_inode(inum)?;
        log::debug!("Truncated {inum}, released {released} data blocks");
        Ok(())
    }
}

impl<D: BlockDevice> BlockStore for DiskStore<D> {
    fn block_size(&self) -> usize {
        self.sb.layout.block_size as usize
    }

    fn init_superblock(&mut self) -> BfsResult<()> {
        self.sb.free_count = 0;
        self.sb.first_free = 0;
        self.write_superblock()
    }

    fn init_inode_table(&mut self) -> BfsResult<()> {
        self.inodes.fill(Inode::default());
        let layout = self.sb.layout;
        self.zero_metadata_blocks(layout.inode_start, layout.inode_blocks)
    }

    fn init_directory(&mut self) -> BfsResult<()> {
        self.dir.fill(DirEntry::default());
        let layout = self.sb.layout;
        self.zero_metadata_blocks(layout.dir_start, layout.dir_blocks)
    }

    fn init_free_list(&mut self) -> BfsResult<()> {
        let layout = self.sb.layout;
        let mut block = vec![0u8; self.block_size()];
        for dbn in layout.data_start..layout.total_blocks {
            let next = if dbn + 1 < layout.total_blocks {
                dbn + 1
            } else {
                0
            };
            put_u32(&mut block, 0, next);
            self.device.write_block(dbn, &block)?;
        }

        self.sb.first_free = layout.data_start;
        self.sb.free_count = layout.data_blocks();
        self.write_superblock()
    }

    fn verify(&self) -> BfsResult<()> {
        let layout = &self.sb.layout;
        if layout.data_start >= layout.total_blocks {
            return Err(BfsError::Corrupt(format!(
                "metadata for {} inodes needs {} blocks, image has {}",
                layout.inode_count, layout.data_start, layout.total_blocks
            )));
        }
        if layout.total_blocks > self.device.block_count() {
            return Err(BfsError::Corrupt(format!(
                "superblock claims {} blocks, device has {}",
                layout.total_blocks,
                self.device.block_count()
            )));
        }
        let expected = Layout::compute(&GeometryConfig {
            block_size: layout.block_size,
            total_blocks: layout.total_blocks,
            inode_count: layout.inode_count,
            max_open_files: 1,
        });
        if expected != *layout {
            return Err(BfsError::Corrupt(format!(
                "superblock layout {layout:?} is inconsistent with its geometry"
            )));
        }
        if self.sb.free_count > layout.data_blocks() {
            return Err(BfsError::Corrupt(format!(
                "free count {} exceeds {} data blocks",
                self.sb.free_count,
                layout.data_blocks()
            )));
        }
        let head = self.sb.first_free;
        if head != 0 && (head < layout.data_start || head >= layout.total_blocks) {
            return Err(BfsError::Corrupt(format!(
                "free list head {head} outside the data area"
            )));
        }
        Ok(())
    }

    fn create_by_name(&mut self, name: &str) -> BfsResult<Inum> {
        Utils::validate_name(name)?;

        if let Some(inum) = self.lookup_by_name(name)? {
            self.truncate(inum)?;
            return Ok(inum);
        }

        let index = self
            .inodes
            .iter()
            .position(|i| !i.in_use)
            .ok_or_else(|| BfsError::NoSpace("no free inode".to_string()))?;
        let slot = self
            .dir
            .iter()
            .position(DirEntry::is_free)
            .ok_or_else(|| BfsError::NoSpace("directory full".to_string()))?;

        let inum = Inum(index as u32);
        self.inodes[index] = Inode {
            in_use: true,
            ..Default::default()
        };
        self.write_inode(inum)?;

        self.dir[slot] = DirEntry {
            name: name.to_string(),
            inum: inum.0,
        };
        self.write_dir_entry(slot)?;

        log::debug!("Created {name:?} as {inum}");
        Ok(inum)
    }

    fn lookup_by_name(&self, name: &str) -> BfsResult<Option<Inum>> {
        Ok(self
            .dir
            .iter()
            .find(|e| !e.is_free() && e.name == name)
            .map(|e| Inum(e.inum)))
    }

    fn read_block(&self, inum: Inum, fbn: u32, buf: &mut [u8]) -> BfsResult<()> {
        let dbn = self.resolve_device_block(inum, fbn)?;
        self.device.read_block(dbn, buf)
    }

    fn write_block(&mut self, dbn: u32, buf: &[u8]) -> BfsResult<()> {
        let layout = &self.sb.layout;
        if dbn < layout.data_start || dbn >= layout.total_blocks {
            return Err(BfsError::Alloc(format!(
                "block {dbn} is outside the data area"
            )));
        }
        self.device.write_block(dbn, buf)
    }

    fn resolve_device_block(&self, inum: Inum, fbn: u32) -> BfsResult<u32> {
        let inode = self.inode(inum)?;
        match self.block_pointer(inode, fbn)? {
            0 => Err(BfsError::Alloc(format!("{inum} has no block {fbn}"))),
            dbn => Ok(dbn),
        }
    }

    fn allocated_blocks(&self, inum: Inum) -> BfsResult<u32> {
        let inode = self.inode(inum)?;
        let direct = inode.direct.iter().take_while(|&&d| d != 0).count() as u32;
        if (direct as usize) < DIRECT_BLOCKS || inode.indirect == 0 {
            return Ok(direct);
        }
        let block = self.read_pointer_block(inode.indirect)?;
        let indirect = (0..self.sb.layout.pointers_per_block())
            .take_while(|&index| get_u32(&block, index * 4) != 0)
            .count() as u32;
        Ok(direct + indirect)
    }

    fn extend_allocation(&mut self, inum: Inum, last_fbn: u32) -> BfsResult<()> {
        let max = self.sb.layout.max_file_blocks();
        if last_fbn >= max {
            return Err(BfsError::Alloc(format!(
                "{inum} cannot grow to block {last_fbn}, files hold at most {max} blocks"
            )));
        }

        let have = self.allocated_blocks(inum)?;
        if last_fbn < have {
            return Ok(());
        }

        let direct = DIRECT_BLOCKS as u32;
        let needs_indirect = last_fbn >= direct && self.inode(inum)?.indirect == 0;
        let needed = last_fbn + 1 - have + u32::from(needs_indirect);
        if needed > self.sb.free_count {
            return Err(BfsError::Alloc(format!(
                "disk full: {inum} needs {needed} blocks, {} free",
                self.sb.free_count
            )));
        }

        if needs_indirect {
            let indirect = self.alloc_block()?;
            self.inodes[inum.0 as usize].indirect = indirect;
        }

        let mut pointers = match self.inodes[inum.0 as usize].indirect {
            0 => None,
            dbn => Some((dbn, self.read_pointer_block(dbn)?)),
        };
        for fbn in have..=last_fbn {
            let dbn = self.alloc_block()?;
            if fbn < direct {
                self.inodes[inum.0 as usize].direct[fbn as usize] = dbn;
            } else if let Some((_, block)) = pointers.as_mut() {
                put_u32(block, (fbn - direct) as usize * 4, dbn);
            }
        }
        if let Some((dbn, block)) = pointers {
            self.device.write_block(dbn, &block)?;
        }
        self.write_inode(inum)?;

        log::trace!("Extended {inum} from {have} to {} blocks", last_fbn + 1);
        Ok(())
    }

    fn get_size(&self, inum: Inum) -> BfsResult<u64> {
        Ok(self.inode(inum)?.size)
    }

    fn set_size(&mut self, inum: Inum, size: u64) -> BfsResult<()> {
        self.inode(inum)?;
        self.inodes[inum.0 as usize].size = size;
        self.write_inode(inum)
    }

    fn sync(&mut self) -> BfsResult<()> {
        self.device.sync()
    }
}
