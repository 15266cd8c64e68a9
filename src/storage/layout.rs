//! On-disk layout of a BFS image.
//!
//! ```text
//! block 0                      superblock
//! [inode_start, dir_start)     inode table, 64-byte records
//! [dir_start, data_start)      root directory, 32-byte entries
//! [data_start, total_blocks)   data blocks and the free list
//! ```
//!
//! All integers are little-endian. Block number 0 is the superblock and never
//! holds file data, so a zero block pointer means "unallocated".

use crate::config::GeometryConfig;
use crate::errors::{BfsError, BfsResult};

pub const MAGIC: u32 = 0x4246_5331; // "BFS1"

pub const SUPERBLOCK_LEN: usize = 48;
pub const INODE_SIZE: usize = 64;
pub const DIRECT_BLOCKS: usize = 12;
pub const DIRENT_SIZE: usize = 32;
pub const MAX_NAME_LEN: usize = 28;

const INODE_IN_USE: u32 = 1;

/// Internal file identifier (inode number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Inum(pub u32);

impl std::fmt::Display for Inum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "inode {}", self.0)
    }
}

/// Block placement derived from the geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub block_size: u32,
    pub total_blocks: u32,
    pub inode_count: u32,
    pub inode_start: u32,
    pub inode_blocks: u32,
    pub dir_start: u32,
    pub dir_blocks: u32,
    pub data_start: u32,
}

impl Layout {
    pub fn compute(geometry: &GeometryConfig) -> Self {
        let block_size = geometry.block_size.max(1);
        let inodes_per_block = (block_size as usize / INODE_SIZE).max(1) as u32;
        let entries_per_block = (block_size as usize / DIRENT_SIZE).max(1) as u32;

        let inode_blocks = geometry.inode_count.div_ceil(inodes_per_block);
        let dir_blocks = geometry.inode_count.div_ceil(entries_per_block);
        let inode_start: u32 = 1;
        // Saturates for absurd inode counts; verification rejects those layouts
        let dir_start = inode_start.saturating_add(inode_blocks);

        Self {
            block_size,
            total_blocks: geometry.total_blocks,
            inode_count: geometry.inode_count,
            inode_start,
            inode_blocks,
            dir_start,
            dir_blocks,
            data_start: dir_start.saturating_add(dir_blocks),
        }
    }

    pub fn inodes_per_block(&self) -> usize {
        self.block_size as usize / INODE_SIZE
    }

    pub fn entries_per_block(&self) -> usize {
        self.block_size as usize / DIRENT_SIZE
    }

    /// Block pointers held by one indirect block.
    pub fn pointers_per_block(&self) -> usize {
        self.block_size as usize / 4
    }

    /// Largest file, in blocks, addressable through direct and indirect pointers.
    pub fn max_file_blocks(&self) -> u32 {
        (DIRECT_BLOCKS + self.pointers_per_block()) as u32
    }

    pub fn data_blocks(&self) -> u32 {
        self.total_blocks.saturating_sub(self.data_start)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {
    pub layout: Layout,
    pub free_count: u32,
    /// Head of the free list, 0 when empty
    pub first_free: u32,
}

impl Superblock {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            free_count: 0,
            first_free: 0,
        }
    }

    pub fn encode(&self, block: &mut [u8]) {
        block.fill(0);
        let l = &self.layout;
        let fields = [
            MAGIC,
            l.block_size,
            l.total_blocks,
            l.inode_count,
            l.inode_start,
            l.inode_blocks,
            l.dir_start,
            l.dir_blocks,
            l.data_start,
            self.free_count,
            self.first_free,
        ];
        for (i, value) in fields.iter().enumerate() {
            put_u32(block, i * 4, *value);
        }
        let checksum = crc32c::crc32c(&block[..SUPERBLOCK_LEN - 4]);
        put_u32(block, SUPERBLOCK_LEN - 4, checksum);
    }

    pub fn decode(block: &[u8]) -> BfsResult<Self> {
        if block.len() < SUPERBLOCK_LEN {
            return Err(BfsError::Corrupt(format!(
                "superblock needs {SUPERBLOCK_LEN} bytes, block has {}",
                block.len()
            )));
        }

        let magic = get_u32(block, 0);
        if magic != MAGIC {
            return Err(BfsError::Corrupt(format!(
                "bad superblock magic {magic:#010x}"
            )));
        }

        let stored = get_u32(block, SUPERBLOCK_LEN - 4);
        let computed = crc32c::crc32c(&block[..SUPERBLOCK_LEN - 4]);
        if stored != computed {
            return Err(BfsError::Corrupt(format!(
                "superblock checksum mismatch: stored {stored:#010x}, computed {computed:#010x}"
            )));
        }

        let layout = Layout {
            block_size: get_u32(block, 4),
            total_blocks: get_u32(block, 8),
            inode_count: get_u32(block, 12),
            inode_start: get_u32(block, 16),
            inode_blocks: get_u32(block, 20),
            dir_start: get_u32(block, 24),
            dir_blocks: get_u32(block, 28),
            data_start: get_u32(block, 32),
        };

        Ok(Self {
            layout,
            free_count: get_u32(block, 36),
            first_free: get_u32(block, 40),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inode {
    pub in_use: bool,
    /// Logical file size in bytes
    pub size: u64,
    pub direct: [u32; DIRECT_BLOCKS],
    pub indirect: u32,
}

impl Inode {
    pub fn encode(&self, out: &mut [u8]) {
        out[..INODE_SIZE].fill(0);
        put_u32(out, 0, if self.in_use { INODE_IN_USE } else { 0 });
        out[4..12].copy_from_slice(&self.size.to_le_bytes());
        put_u32(out, 12, self.indirect);
        for (i, dbn) in self.direct.iter().enumerate() {
            put_u32(out, 16 + i * 4, *dbn);
        }
    }

    pub fn decode(raw: &[u8]) -> Self {
        let mut direct = [0u32; DIRECT_BLOCKS];
        for (i, dbn) in direct.iter_mut().enumerate() {
            *dbn = get_u32(raw, 16 + i * 4);
        }
        let mut size = [0u8; 8];
        size.copy_from_slice(&raw[4..12]);
        Self {
            in_use: get_u32(raw, 0) & INODE_IN_USE != 0,
            size: u64::from_le_bytes(size),
            direct,
            indirect: get_u32(raw, 12),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirEntry {
    /// Empty name marks a free slot
    pub name: String,
    pub inum: u32,
}

impl DirEntry {
    pub fn is_free(&self) -> bool {
        self.name.is_empty()
    }

    pub fn encode(&self, out: &mut [u8]) {
        out[..DIRENT_SIZE].fill(0);
        let bytes = self.name.as_bytes();
        let len = bytes.len().min(MAX_NAME_LEN);
        out[..len].copy_from_slice(&bytes[..len]);
        put_u32(out, MAX_NAME_LEN, self.inum);
    }

    pub fn decode(raw: &[u8]) -> BfsResult<Self> {
        let name_bytes = &raw[..MAX_NAME_LEN];
        let len = name_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MAX_NAME_LEN);
        let name = String::from_utf8(name_bytes[..len].to_vec())?;
        Ok(Self {
            name,
            inum: get_u32(raw, MAX_NAME_LEN),
        })
    }
}

pub fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn get_u32(buf: &[u8], at: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_for_default_geometry() {
        let layout = Layout::compute(&GeometryConfig::default());
        // 64 inodes at 8 per block, 64 entries at 16 per block
        assert_eq!(layout.inode_start, 1);
        assert_eq!(layout.inode_blocks, 8);
        assert_eq!(layout.dir_start, 9);
        assert_eq!(layout.dir_blocks, 4);
        assert_eq!(layout.data_start, 13);
        assert_eq!(layout.max_file_blocks(), 12 + 128);
    }

    #[test]
    fn test_superblock_checksum_detects_corruption() {
        let layout = Layout::compute(&GeometryConfig::default());
        let mut sb = Superblock::new(layout);
        sb.free_count = 10;
        sb.first_free = 13;

        let mut block = vec![0u8; 512];
        sb.encode(&mut block);
        assert_eq!(Superblock::decode(&block).unwrap(), sb);

        block[36] ^= 0x01;
        match Superblock::decode(&block) {
            Err(BfsError::Corrupt(msg)) => assert!(msg.contains("checksum")),
            other => panic!("expected checksum failure, got {other:?}"),
        }
    }

    #[test]
    fn test_superblock_rejects_bad_magic() {
        let block = vec![0u8; 512];
        match Superblock::decode(&block) {
            Err(BfsError::Corrupt(msg)) => assert!(msg.contains("magic")),
            other => panic!("expected magic failure, got {other:?}"),
        }
    }

    #[test]
    fn test_inode_record_layout() {
        let mut inode = Inode {
            in_use: true,
            size: 600,
            indirect: 77,
            ..Default::default()
        };
        inode.direct[0] = 13;
        inode.direct[1] = 14;

        let mut raw = [0xFFu8; INODE_SIZE];
        inode.encode(&mut raw);
        assert_eq!(get_u32(&raw, 0), 1);
        assert_eq!(&raw[4..12], &600u64.to_le_bytes());
        assert_eq!(get_u32(&raw, 16), 13);
        assert_eq!(Inode::decode(&raw), inode);
    }

    #[test]
    fn test_dir_entry_name_padding() {
        let entry = DirEntry {
            name: "a".to_string(),
            inum: 3,
        };
        let mut raw = [0xAAu8; DIRENT_SIZE];
        entry.encode(&mut raw);
        assert_eq!(raw[0], b'a');
        assert!(raw[1..MAX_NAME_LEN].iter().all(|&b| b == 0));

        let decoded = DirEntry::decode(&raw).unwrap();
        assert_eq!(decoded, entry);
        assert!(DirEntry::decode(&[0u8; DIRENT_SIZE]).unwrap().is_free());
    }
}
