//! Seek, tell and size.

use crate::errors::{BfsError, BfsResult};
use crate::fs_impl::{Bfs, Fd};
use crate::storage::BlockStore;

/// Reference point for a seek, numbered like `SEEK_SET`/`SEEK_CUR`/`SEEK_END`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Set,
    Cur,
    End,
}

impl TryFrom<i32> for Whence {
    type Error = BfsError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Whence::Set),
            1 => Ok(Whence::Cur),
            2 => Ok(Whence::End),
            other => Err(BfsError::BadWhence(other)),
        }
    }
}

/// Move the cursor and return its new position.
///
/// The target must not be negative; a rejected seek leaves the cursor alone.
pub fn seek<S: BlockStore>(fs: &mut Bfs<S>, fd: Fd, delta: i64, whence: Whence) -> BfsResult<u64> {
    match seek_target(fs, fd, delta, whence) {
        Ok(target) => {
            fs.open_files.set_cursor(fd, target)?;
            log::trace!("Seek {fd} {whence:?} {delta} -> {target}");
            Ok(target)
        }
        Err(e) => {
            fs.log_failure("seek", &fd.to_string(), &e);
            Err(e)
        }
    }
}

fn seek_target<S: BlockStore>(fs: &Bfs<S>, fd: Fd, delta: i64, whence: Whence) -> BfsResult<u64> {
    let base = match whence {
        Whence::Set => 0,
        Whence::Cur => fs.open_files.cursor(fd)?,
        Whence::End => size(fs, fd)?,
    };

    let target = i128::from(base) + i128::from(delta);
    if target < 0 {
        return Err(BfsError::BadCursor(target as i64));
    }
    u64::try_from(target).map_err(|_| BfsError::BadCursor(i64::MAX))
}

pub fn tell<S: BlockStore>(fs: &Bfs<S>, fd: Fd) -> BfsResult<u64> {
    fs.open_files.cursor(fd)
}

/// Logical size of the open file.
pub fn size<S: BlockStore>(fs: &Bfs<S>, fd: Fd) -> BfsResult<u64> {
    let inum = fs.open_files.inum(fd)?;
    fs.store.get_size(inum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BfsConfigBuilder, GeometryConfig, LogConfig};
    use crate::fs_impl::MemBfs;

    fn create_test_fs() -> MemBfs {
        let config = BfsConfigBuilder::new()
            .geometry(GeometryConfig {
                block_size: 128,
                total_blocks: 64,
                inode_count: 8,
                max_open_files: 4,
            })
            .logging(LogConfig::disabled())
            .build()
            .unwrap();
        MemBfs::format_in_memory(&config).unwrap()
    }

    #[test]
    fn test_whence_from_posix_constants() {
        assert_eq!(Whence::try_from(0).unwrap(), Whence::Set);
        assert_eq!(Whence::try_from(1).unwrap(), Whence::Cur);
        assert_eq!(Whence::try_from(2).unwrap(), Whence::End);

        let err = Whence::try_from(7).unwrap_err();
        assert_eq!(err, BfsError::BadWhence(7));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_seek_arithmetic() {
        let mut fs = create_test_fs();
        let fd = fs.create("f").unwrap();
        fs.write(fd, &[1u8; 300]).unwrap();

        assert_eq!(fs.seek(fd, 10, Whence::Set).unwrap(), 10);
        assert_eq!(fs.tell(fd).unwrap(), 10);
        assert_eq!(fs.seek(fd, 5, Whence::Cur).unwrap(), 15);
        assert_eq!(fs.seek(fd, -5, Whence::Cur).unwrap(), 10);
        assert_eq!(fs.seek(fd, 0, Whence::End).unwrap(), 300);
        assert_eq!(fs.seek(fd, -100, Whence::End).unwrap(), 200);
        assert_eq!(fs.seek(fd, 50, Whence::End).unwrap(), 350);
    }

    #[test]
    fn test_seek_past_end_does_not_change_size() {
        let mut fs = create_test_fs();
        let fd = fs.create("f").unwrap();
        fs.seek(fd, 1000, Whence::Set).unwrap();
        assert_eq!(fs.size(fd).unwrap(), 0);
    }

    #[test]
    fn test_negative_target_is_rejected_without_moving() {
        let mut fs = create_test_fs();
        let fd = fs.create("f").unwrap();
        fs.seek(fd, 20, Whence::Set).unwrap();

        assert_eq!(fs.seek(fd, -1, Whence::Set), Err(BfsError::BadCursor(-1)));
        assert_eq!(fs.seek(fd, -21, Whence::Cur), Err(BfsError::BadCursor(-1)));
        assert_eq!(fs.seek(fd, -1, Whence::End), Err(BfsError::BadCursor(-1)));
        assert_eq!(fs.tell(fd).unwrap(), 20);
    }

    #[test]
    fn test_cursor_ops_on_closed_handle() {
        let mut fs = create_test_fs();
        let fd = fs.create("f").unwrap();
        fs.close(fd).unwrap();

        assert_eq!(fs.tell(fd), Err(BfsError::BadHandle(fd.0)));
        assert_eq!(fs.size(fd), Err(BfsError::BadHandle(fd.0)));
        assert_eq!(fs.seek(fd, 0, Whence::Set), Err(BfsError::BadHandle(fd.0)));
    }
}
