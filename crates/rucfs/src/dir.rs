//! Directory enumeration.
//!
//! [`Context::enumerate_path`] returns every direct child in one call.
//! [`Context::count_entries`] and [`Context::fill_entries`] are the
//! count-then-fill pair for callers that must size their own storage;
//! both read the same immutable context, so the count always matches
//! what the fill produces.

use std::iter::FusedIterator;

use crate::context::Context;
use crate::error::{RucfsError, RucfsResult};
use crate::inode::{DirectoryInode, Inode, InodeKind, InodeTable};
use crate::path::lossy;

/// One direct child of an enumerated directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathEntry<'a> {
    pub kind: InodeKind,
    /// Entry name (not full path), borrowed from the string table.
    pub name: &'a [u8],
    /// Offset of the child record from the inode table base.
    pub offset: u32,
}

impl PathEntry<'_> {
    /// The name as UTF-8, replacing invalid sequences.
    pub fn name_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(self.name)
    }
}

/// Lazy iterator over a directory's children, in table order.
///
/// Clone it to restart from the current position.
#[derive(Debug, Clone)]
pub struct Children<'a> {
    ctx: &'a Context,
    dir: DirectoryInode,
    index: u32,
}

impl<'a> Children<'a> {
    fn entry(&self, index: u32) -> RucfsResult<(Inode, PathEntry<'a>)> {
        let inode = self
            .ctx
            .inode_at(InodeTable::child_offset(&self.dir, index)?)?;
        let name = self.ctx.string_table().get(inode.name_offset())?;
        Ok((
            inode,
            PathEntry {
                kind: inode.kind(),
                name,
                offset: inode.offset(),
            },
        ))
    }

    /// Like `next`, but also yields the decoded child inode.
    pub fn next_inode(&mut self) -> Option<RucfsResult<(Inode, PathEntry<'a>)>> {
        if self.index >= self.dir.item_count {
            return None;
        }
        let item = self.entry(self.index);
        self.index += 1;
        Some(item)
    }
}

impl<'a> Iterator for Children<'a> {
    type Item = RucfsResult<PathEntry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_inode().map(|r| r.map(|(_, entry)| entry))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.dir.item_count - self.index) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Children<'_> {}

impl FusedIterator for Children<'_> {}

impl Context {
    /// Iterate the children of `dir`.
    ///
    /// The child range is bounds-checked up front; each child record and
    /// name is checked as it is produced.
    pub fn children(&self, dir: &DirectoryInode) -> RucfsResult<Children<'_>> {
        self.inode_table().check_children(dir)?;
        Ok(Children {
            ctx: self,
            dir: *dir,
            index: 0,
        })
    }

    /// List the direct children of the directory at `path`.
    ///
    /// Entries come back in storage order, not sorted. A path naming a
    /// file or a symlink is a `WrongType` error.
    pub fn enumerate_path(&self, path: impl AsRef<[u8]>) -> RucfsResult<Vec<PathEntry<'_>>> {
        let dir = self.resolve_dir(path.as_ref())?;
        let children = self.children(&dir)?;
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(children.len())
            .map_err(|_| RucfsError::OutOfMemory)?;
        for entry in children {
            entries.push(entry?);
        }
        Ok(entries)
    }

    /// Number of entries [`Context::enumerate_path`] would return.
    pub fn count_entries(&self, path: impl AsRef<[u8]>) -> RucfsResult<usize> {
        let dir = self.resolve_dir(path.as_ref())?;
        self.inode_table().check_children(&dir)?;
        Ok(dir.item_count as usize)
    }

    /// Write up to `dst.len()` entries of the directory at `path` into
    /// `dst`, returning how many were written.
    pub fn fill_entries<'a>(
        &'a self,
        path: impl AsRef<[u8]>,
        dst: &mut [Option<PathEntry<'a>>],
    ) -> RucfsResult<usize> {
        let dir = self.resolve_dir(path.as_ref())?;
        let mut written = 0;
        for (slot, entry) in dst.iter_mut().zip(self.children(&dir)?) {
            *slot = Some(entry?);
            written += 1;
        }
        Ok(written)
    }

    fn resolve_dir(&self, path: &[u8]) -> RucfsResult<DirectoryInode> {
        match self.path_to(path)? {
            Inode::Directory(dir) => Ok(dir),
            other => Err(RucfsError::wrong_type(
                lossy(path),
                InodeKind::Directory,
                other.kind(),
            )),
        }
    }
}
