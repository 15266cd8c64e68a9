//! Stream writes.
//!
//! Mirrors the read path: partial first block merged into what is already
//! on disk, whole blocks written directly, partial last block merged. The
//! allocation is grown up front so every target block exists before the
//! first transfer.

use crate::errors::{BfsError, BfsResult};
use crate::fs_impl::position::{self, to_fbn};
use crate::fs_impl::{Bfs, Fd, block_ops};
use crate::storage::BlockStore;
use std::time::Instant;

/// Write all of `data` at the cursor. There are no short writes.
pub fn write<S: BlockStore>(fs: &mut Bfs<S>, fd: Fd, data: &[u8]) -> BfsResult<()> {
    let started = Instant::now();
    match write_blocks(fs, fd, data) {
        Ok(()) => {
            fs.log_transfer("write", fd, data.len(), started.elapsed().as_micros() as u64);
            Ok(())
        }
        Err(e) => {
            fs.log_failure("write", &fd.to_string(), &e);
            Err(e)
        }
    }
}

fn write_blocks<S: BlockStore>(fs: &mut Bfs<S>, fd: Fd, data: &[u8]) -> BfsResult<()> {
    let inum = fs.open_files.inum(fd)?;
    if data.is_empty() {
        return Ok(());
    }

    let block_size = fs.store.block_size();
    let cursor = fs.open_files.cursor(fd)?;
    cursor.checked_add(data.len() as u64).ok_or_else(|| {
        BfsError::Alloc(format!(
            "write of {} bytes at {cursor} overflows the file offset",
            data.len()
        ))
    })?;

    let last_fbn = to_fbn(position::last_fbn(cursor, data.len(), block_size))?;
    if fs.store.allocated_blocks(inum)? <= last_fbn {
        fs.store.extend_allocation(inum, last_fbn)?;
    }

    let mut done = 0;

    let start = position::locate(cursor, block_size);
    if start.offset > 0 {
        let count = (block_size - start.offset).min(data.len());
        block_ops::merge_block(
            &mut fs.store,
            inum,
            to_fbn(start.fbn)?,
            start.offset,
            &data[..count],
        )?;
        done += count;
        fs.open_files.advance(fd, count)?;
    }

    while data.len() - done >= block_size {
        let fbn = to_fbn(position::locate(fs.open_files.cursor(fd)?, block_size).fbn)?;
        block_ops::write_full_block(&mut fs.store, inum, fbn, &data[done..done + block_size])?;
        done += block_size;
        fs.open_files.advance(fd, block_size)?;
    }

    let remainder = data.len() - done;
    if remainder > 0 {
        let fbn = to_fbn(position::locate(fs.open_files.cursor(fd)?, block_size).fbn)?;
        block_ops::merge_block(&mut fs.store, inum, fbn, 0, &data[done..])?;
        fs.open_files.advance(fd, remainder)?;
    }

    let end = fs.open_files.cursor(fd)?;
    if end > fs.store.get_size(inum)? {
        fs.store.set_size(inum, end)?;
    }

    log::trace!("Wrote {} bytes to {fd} at {cursor}", data.len());
    Ok(())
}
