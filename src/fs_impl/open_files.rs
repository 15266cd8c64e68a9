//! Open-file table: one entry per open file, holding its cursor.
//!
//! Opening a file that already has an entry shares that entry (and its
//! cursor) and bumps a reference count; the entry goes away when the count
//! drops to zero.

use crate::errors::{BfsError, BfsResult};
use crate::storage::layout::Inum;

/// Handle returned by open and create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fd(pub u32);

impl std::fmt::Display for Fd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fd {}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OpenFile {
    inum: Inum,
    cursor: u64,
    refs: u32,
}

#[derive(Debug)]
pub struct OpenFileTable {
    slots: Vec<Option<OpenFile>>,
}

impl OpenFileTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, inum: Inum) -> Option<Fd> {
        self.slots
            .iter()
            .position(|s| matches!(s, Some(entry) if entry.inum == inum))
            .map(|i| Fd(i as u32))
    }

    /// Entry for `inum`, shared if one already exists.
    pub fn acquire(&mut self, inum: Inum) -> BfsResult<Fd> {
        if let Some(fd) = self.find(inum) {
            let capacity = self.slots.len();
            let entry = self.entry_mut(fd)?;
            entry.refs = entry
                .refs
                .checked_add(1)
                .ok_or(BfsError::TooManyOpenFiles(capacity))?;
            return Ok(fd);
        }

        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(BfsError::TooManyOpenFiles(self.slots.len()))?;
        self.slots[index] = Some(OpenFile {
            inum,
            cursor: 0,
            refs: 1,
        });
        Ok(Fd(index as u32))
    }

    /// Drop one reference; returns true when the entry was removed.
    pub fn release(&mut self, fd: Fd) -> BfsResult<bool> {
        let slot = self
            .slots
            .get_mut(fd.0 as usize)
            .ok_or(BfsError::BadHandle(fd.0))?;
        let entry = slot.as_mut().ok_or(BfsError::BadHandle(fd.0))?;

        entry.refs -= 1;
        if entry.refs == 0 {
            *slot = None;
            return Ok(true);
        }
        Ok(false)
    }

    fn entry(&self, fd: Fd) -> BfsResult<&OpenFile> {
        self.slots
            .get(fd.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(BfsError::BadHandle(fd.0))
    }

    fn entry_mut(&mut self, fd: Fd) -> BfsResult<&mut OpenFile> {
        self.slots
            .get_mut(fd.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(BfsError::BadHandle(fd.0))
    }

    pub fn inum(&self, fd: Fd) -> BfsResult<Inum> {
        Ok(self.entry(fd)?.inum)
    }

    pub fn cursor(&self, fd: Fd) -> BfsResult<u64> {
        Ok(self.entry(fd)?.cursor)
    }

    pub fn set_cursor(&mut self, fd: Fd, cursor: u64) -> BfsResult<()> {
        self.entry_mut(fd)?.cursor = cursor;
        Ok(())
    }

    pub fn advance(&mut self, fd: Fd, by: usize) -> BfsResult<u64> {
        let entry = self.entry_mut(fd)?;
        entry.cursor += by as u64;
        Ok(entry.cursor)
    }

    pub fn refs(&self, fd: Fd) -> BfsResult<u32> {
        Ok(self.entry(fd)?.refs)
    }
}
