//! Block transfers for the stream engines, including the read-modify-write
//! merge used when a transfer starts or ends inside a block.
//!
//! Scratch buffers are allocated per call and never kept.

use crate::errors::BfsResult;
use crate::storage::{BlockStore, Inum};

/// Copy `out.len()` bytes starting at `offset` within block `fbn` of the file.
pub fn read_partial<S: BlockStore>(
    store: &S,
    inum: Inum,
    fbn: u32,
    offset: usize,
    out: &mut [u8],
) -> BfsResult<()> {
    let mut scratch = vec![0u8; store.block_size()];
    store.read_block(inum, fbn, &mut scratch)?;
    out.copy_from_slice(&scratch[offset..offset + out.len()]);
    Ok(())
}

/// Overlay `data` at `offset` within block `fbn`, keeping every other byte.
pub fn merge_block<S: BlockStore>(
    store: &mut S,
    inum: Inum,
    fbn: u32,
    offset: usize,
    data: &[u8],
) -> BfsResult<()> {
    let mut scratch = vec![0u8; store.block_size()];
    store.read_block(inum, fbn, &mut scratch)?;
    scratch[offset..offset + data.len()].copy_from_slice(data);

    let dbn = store.resolve_device_block(inum, fbn)?;
    log::trace!("Merged {} bytes at offset {offset} into {inum} block {fbn}", data.len());
    store.write_block(dbn, &scratch)
}

/// Write one whole block straight from the caller's data.
pub fn write_full_block<S: BlockStore>(
    store: &mut S,
    inum: Inum,
    fbn: u32,
    data: &[u8],
) -> BfsResult<()> {
    let dbn = store.resolve_device_block(inum, fbn)?;
    store.write_block(dbn, data)
}
