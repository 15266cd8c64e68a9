//! Stream reads.
//!
//! A read is split into at most three phases: the tail of a partially covered
//! first block, a run of whole blocks copied straight into the caller's
//! buffer, and the head of a partially covered last block. The cursor moves
//! after each phase.

use crate::errors::BfsResult;
use crate::fs_impl::position::{self, to_fbn};
use crate::fs_impl::{Bfs, Fd, block_ops};
use crate::storage::BlockStore;
use std::time::Instant;

/// Read up to `buf.len()` bytes from the cursor, clipped at end of file.
pub fn read<S: BlockStore>(fs: &mut Bfs<S>, fd: Fd, buf: &mut [u8]) -> BfsResult<usize> {
    let started = Instant::now();
    match read_blocks(fs, fd, buf) {
        Ok(count) => {
            fs.log_transfer("read", fd, count, started.elapsed().as_micros() as u64);
            Ok(count)
        }
        Err(e) => {
            fs.log_failure("read", &fd.to_string(), &e);
            Err(e)
        }
    }
}

/// Read into a fresh buffer sized to what is actually available.
pub fn read_to_vec<S: BlockStore>(fs: &mut Bfs<S>, fd: Fd, len: usize) -> BfsResult<Vec<u8>> {
    let remaining = fs.size(fd)?.saturating_sub(fs.tell(fd)?);
    let len = len.min(usize::try_from(remaining).unwrap_or(usize::MAX));

    let mut buf = vec![0u8; len];
    let count = read(fs, fd, &mut buf)?;
    buf.truncate(count);
    Ok(buf)
}

fn read_blocks<S: BlockStore>(fs: &mut Bfs<S>, fd: Fd, buf: &mut [u8]) -> BfsResult<usize> {
    let inum = fs.open_files.inum(fd)?;
    let block_size = fs.store.block_size();
    let cursor = fs.open_files.cursor(fd)?;
    let size = fs.store.get_size(inum)?;

    if cursor >= size || buf.is_empty() {
        return Ok(0);
    }
    let available = (size - cursor).min(buf.len() as u64) as usize;
    let mut done = 0;

    let start = position::locate(cursor, block_size);
    if start.offset > 0 {
        let count = (block_size - start.offset).min(available);
        block_ops::read_partial(
            &fs.store,
            inum,
            to_fbn(start.fbn)?,
            start.offset,
            &mut buf[..count],
        )?;
        done += count;
        fs.open_files.advance(fd, count)?;
    }

    while available - done >= block_size {
        let fbn = to_fbn(position::locate(fs.open_files.cursor(fd)?, block_size).fbn)?;
        fs.store
            .read_block(inum, fbn, &mut buf[done..done + block_size])?;
        done += block_size;
        fs.open_files.advance(fd, block_size)?;
    }

    let remainder = available - done;
    if remainder > 0 {
        let fbn = to_fbn(position::locate(fs.open_files.cursor(fd)?, block_size).fbn)?;
        block_ops::read_partial(&fs.store, inum, fbn, 0, &mut buf[done..available])?;
        done += remainder;
        fs.open_files.advance(fd, remainder)?;
    }

    log::trace!("Read {done} bytes from {fd} at {cursor}");
    Ok(done)
}
