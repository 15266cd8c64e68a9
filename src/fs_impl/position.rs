//! Mapping between byte cursor positions and block coordinates.

use crate::errors::{BfsError, BfsResult};

/// A byte position split into file block number and offset within that block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPos {
    pub fbn: u64,
    pub offset: usize,
}

pub fn locate(pos: u64, block_size: usize) -> BlockPos {
    let bs = block_size as u64;
    BlockPos {
        fbn: pos / bs,
        offset: (pos % bs) as usize,
    }
}

/// FBN holding the last byte of the range `[pos, pos + len)`. `len` must be non-zero.
pub fn last_fbn(pos: u64, len: usize, block_size: usize) -> u64 {
    debug_assert!(len > 0);
    (pos + len as u64 - 1) / block_size as u64
}

pub fn is_aligned(pos: u64, block_size: usize) -> bool {
    pos % block_size as u64 == 0
}

/// Narrow an FBN to the width the block store addresses.
pub fn to_fbn(fbn: u64) -> BfsResult<u32> {
    u32::try_from(fbn).map_err(|_| BfsError::Alloc(format!("block {fbn} is beyond any file")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate() {
        assert_eq!(locate(0, 512), BlockPos { fbn: 0, offset: 0 });
        assert_eq!(locate(100, 512), BlockPos { fbn: 0, offset: 100 });
        assert_eq!(locate(512, 512), BlockPos { fbn: 1, offset: 0 });
        assert_eq!(locate(1100, 512), BlockPos { fbn: 2, offset: 76 });
    }

    #[test]
    fn test_last_fbn() {
        assert_eq!(last_fbn(0, 1, 512), 0);
        assert_eq!(last_fbn(0, 512, 512), 0);
        assert_eq!(last_fbn(0, 513, 512), 1);
        assert_eq!(last_fbn(100, 50, 512), 0);
        assert_eq!(last_fbn(500, 24, 512), 1);
    }

    #[test]
    fn test_alignment() {
        assert!(is_aligned(0, 512));
        assert!(is_aligned(1024, 512));
        assert!(!is_aligned(600, 512));
    }

    #[test]
    fn test_fbn_overflow() {
        assert_eq!(to_fbn(7).unwrap(), 7);
        assert!(matches!(to_fbn(u64::from(u32::MAX) + 1), Err(BfsError::Alloc(_))));
    }
}
