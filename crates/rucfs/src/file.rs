//! File access.
//!
//! File handles are views into the image buffer; opening a file never
//! copies its content.

use std::io::Cursor;
use std::ops::Range;
use std::sync::Arc;

use crate::context::Context;
use crate::error::{RucfsError, RucfsResult};
use crate::inode::{FileInode, Inode, InodeKind};
use crate::path::lossy;

/// An open file, borrowing the [`Context`] it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHandle<'a> {
    name: &'a [u8],
    data: &'a [u8],
    inode: FileInode,
}

impl<'a> FileHandle<'a> {
    /// The final path segment, as stored in the string table.
    pub fn name(&self) -> &'a [u8] {
        self.name
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn inode(&self) -> &FileInode {
        &self.inode
    }

    /// A seekable reader over the content.
    pub fn reader(&self) -> Cursor<&'a [u8]> {
        Cursor::new(self.data)
    }

    /// Release the handle. Dropping it does the same.
    pub fn close(self) -> RucfsResult<()> {
        tracing::trace!(name = %lossy(self.name), "close");
        Ok(())
    }
}

impl AsRef<[u8]> for FileHandle<'_> {
    fn as_ref(&self) -> &[u8] {
        self.data
    }
}

/// A file view that keeps the image buffer alive on its own.
#[derive(Clone)]
pub struct OwnedFile {
    buf: Arc<[u8]>,
    range: Range<usize>,
    name: Vec<u8>,
}

impl OwnedFile {
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.buf[self.range.clone()]
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Absolute byte range of the content within the image.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.data())
    }
}

impl AsRef<[u8]> for OwnedFile {
    fn as_ref(&self) -> &[u8] {
        self.data()
    }
}

impl std::fmt::Debug for OwnedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedFile")
            .field("name", &lossy(&self.name))
            .field("range", &self.range)
            .finish()
    }
}

impl Context {
    /// Open the regular file at `path`.
    ///
    /// Symlinks in the final segment are not followed; opening one is a
    /// `WrongType` error, as is opening a directory.
    pub fn fopen(&self, path: impl AsRef<[u8]>) -> RucfsResult<FileHandle<'_>> {
        let path = path.as_ref();
        let file = self.resolve_file(path)?;
        let range = self.data_range(&file)?;
        let name = self.string_table().get(file.header.name_offset)?;
        tracing::debug!(path = %lossy(path), len = range.len(), "fopen");
        Ok(FileHandle {
            name,
            data: &self.as_bytes()[range],
            inode: file,
        })
    }

    /// Close a handle returned by [`Context::fopen`].
    pub fn fclose(&self, handle: FileHandle<'_>) -> RucfsResult<()> {
        handle.close()
    }

    /// Like [`Context::fopen`], but the result holds its own reference to
    /// the image and may outlive this context.
    pub fn fopen_owned(&self, path: impl AsRef<[u8]>) -> RucfsResult<OwnedFile> {
        let path = path.as_ref();
        let file = self.resolve_file(path)?;
        let range = self.data_range(&file)?;
        let name = self.string_table().get(file.header.name_offset)?.to_vec();
        Ok(OwnedFile {
            buf: self.buffer(),
            range,
            name,
        })
    }

    /// Whether `path` names anything. Only `NotFound` maps to `false`;
    /// every other failure is returned.
    pub fn exist(&self, path: impl AsRef<[u8]>) -> RucfsResult<bool> {
        match self.path_to(path) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Absolute range of a file's content, checked against the buffer.
    pub fn data_range(&self, file: &FileInode) -> RucfsResult<Range<usize>> {
        let start = self.data_extent().start.checked_add(file.data_offset as usize);
        let end = start.and_then(|s| s.checked_add(file.data_length as usize));
        match (start, end) {
            (Some(start), Some(end)) if end <= self.len() => Ok(start..end),
            _ => {
                tracing::warn!(
                    inode = file.header.offset,
                    data_offset = file.data_offset,
                    data_length = file.data_length,
                    "file content out of bounds"
                );
                Err(RucfsError::data_broken(format!(
                    "file at inode {} overruns the image ({} + {} bytes)",
                    file.header.offset, file.data_offset, file.data_length
                )))
            }
        }
    }

    fn resolve_file(&self, path: &[u8]) -> RucfsResult<FileInode> {
        match self.path_to(path)? {
            Inode::File(file) => Ok(file),
            other => Err(RucfsError::wrong_type(
                lossy(path),
                InodeKind::File,
                other.kind(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::builder::ImageBuilder;
    use crate::error::ErrorCode;

    fn image() -> Vec<u8> {
        let mut b = ImageBuilder::new();
        b.add_file(".gitignore", b"target\n").unwrap();
        b.add_file("src/rucfs.c", b"int rucfs_load(void);").unwrap();
        b.add_file("empty", b"").unwrap();
        b.add_symlink("c", "src/rucfs.c").unwrap();
        b.add_symlink("ping", "pong").unwrap();
        b.add_symlink("pong", "ping").unwrap();
        b.build().unwrap()
    }

    #[test]
    fn test_fopen_reads_content() {
        let ctx = Context::load(image()).unwrap();
        let handle = ctx.fopen("/src/rucfs.c").unwrap();
        assert_eq!(handle.name(), b"rucfs.c");
        assert_eq!(handle.data(), b"int rucfs_load(void);");
        assert_eq!(handle.len(), 21);
        ctx.fclose(handle).unwrap();
    }

    #[test]
    fn test_fopen_is_zero_copy() {
        let ctx = Context::load(image()).unwrap();
        let handle = ctx.fopen("/.gitignore").unwrap();
        let buf = ctx.as_bytes().as_ptr_range();
        assert!(buf.contains(&handle.data().as_ptr()));
    }

    #[test]
    fn test_reader() {
        let ctx = Context::load(image()).unwrap();
        let mut text = String::new();
        ctx.fopen("/.gitignore")
            .unwrap()
            .reader()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "target\n");
    }

    #[test]
    fn test_empty_file() {
        let ctx = Context::load(image()).unwrap();
        let handle = ctx.fopen("empty").unwrap();
        assert!(handle.is_empty());
    }

    #[test]
    fn test_fopen_wrong_type() {
        let ctx = Context::load(image()).unwrap();
        let err = ctx.fopen("/src").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Arguments);
        assert!(!err.is_not_found());
        let err = ctx.fopen("/c").unwrap_err();
        assert!(matches!(err, RucfsError::WrongType { found: InodeKind::Symlink, .. }));
    }

    #[test]
    fn test_fopen_missing() {
        let ctx = Context::load(image()).unwrap();
        assert_eq!(ctx.fopen("/nope").unwrap_err().code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_data_overrun() {
        let mut img = image();
        let itab = u32::from_le_bytes(img[16..20].try_into().unwrap()) as usize;
        let ctx = Context::load(img.clone()).unwrap();
        let slot = ctx.path_to("/.gitignore").unwrap().offset() as usize;
        // data_length lives in the last word of the record
        let at = itab + slot + 12;
        img[at..at + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        let ctx = Context::load(img).unwrap();
        assert!(ctx.fopen("/.gitignore").unwrap_err().is_data_broken());
    }

    #[test]
    fn test_exist() {
        let ctx = Context::load(image()).unwrap();
        assert!(ctx.exist("/src/rucfs.c").unwrap());
        assert!(ctx.exist("/src").unwrap());
        assert!(ctx.exist("/ping").unwrap());
        assert!(!ctx.exist("/src/missing").unwrap());
        assert!(ctx.exist("").is_err());
    }

    #[test]
    fn test_cyclic_symlink_is_data_broken() {
        let ctx = Context::load(image()).unwrap();
        assert!(ctx.path_to("/ping/x").unwrap_err().is_data_broken());
        assert!(ctx.exist("/ping/x").unwrap_err().is_data_broken());
    }

    #[test]
    fn test_owned_file_outlives_context() {
        let owned = {
            let ctx = Context::load(image()).unwrap();
            ctx.fopen_owned("/src/rucfs.c").unwrap()
        };
        assert_eq!(owned.name(), b"rucfs.c");
        assert_eq!(owned.data(), b"int rucfs_load(void);");
    }
}
