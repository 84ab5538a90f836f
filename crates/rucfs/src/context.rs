//! Image loading and the session context.
//!
//! A [`Context`] is created once per image by [`Context::load`] and shared
//! by every other operation. It keeps a strong reference to the image
//! buffer, so nothing handed out by the context can outlive the bytes it
//! points into.

use std::sync::Arc;

use crate::config::ReaderConfig;
use crate::error::{RucfsError, RucfsResult};
use crate::inode::{DirectoryInode, Inode, InodeTable, SymlinkInode};
use crate::layout::{
    Endian, KNOWN_FLAGS, MAGIC, SUPERBLOCK_SIZE, Superblock, TableExtent, VERSION_MAJOR,
};
use crate::strtab::StringTable;

/// Offset of the root directory record in the inode table.
pub const ROOT_INODE_OFFSET: u32 = 0;

/// A loaded, validated rucfs image.
///
/// Cheap to clone: clones share the underlying buffer.
#[derive(Clone)]
pub struct Context {
    buf: Arc<[u8]>,
    superblock: Superblock,
    endian: Endian,
    inodes: TableExtent,
    data: TableExtent,
    strings: TableExtent,
    root: DirectoryInode,
    config: ReaderConfig,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("len", &self.buf.len())
            .field("endian", &self.endian)
            .field("inodes", &self.inodes)
            .field("data", &self.data)
            .field("strings", &self.strings)
            .field("root", &self.root)
            .finish()
    }
}

impl Context {
    /// Load an image with the default [`ReaderConfig`].
    pub fn load(buffer: impl Into<Arc<[u8]>>) -> RucfsResult<Self> {
        Self::load_with(buffer, ReaderConfig::default())
    }

    /// Load an image.
    ///
    /// Validates the superblock and the root directory record. The buffer
    /// is never copied or modified.
    pub fn load_with(buffer: impl Into<Arc<[u8]>>, config: ReaderConfig) -> RucfsResult<Self> {
        let buf: Arc<[u8]> = buffer.into();
        if buf.is_empty() {
            return Err(RucfsError::arguments("empty image buffer"));
        }
        if buf.len() < SUPERBLOCK_SIZE {
            return Err(RucfsError::arguments(format!(
                "image of {} bytes is smaller than the {SUPERBLOCK_SIZE}-byte superblock",
                buf.len()
            )));
        }
        if buf[..MAGIC.len()] != MAGIC {
            tracing::warn!(magic = ?&buf[..MAGIC.len()], "bad magic");
            return Err(RucfsError::data_broken("bad magic"));
        }

        let (superblock, endian) = Superblock::parse(&buf)?;
        if superblock.version_major != VERSION_MAJOR {
            tracing::warn!(version = superblock.version_major, "unsupported major version");
            return Err(RucfsError::unsupported(format!(
                "major version {} (reader implements {VERSION_MAJOR})",
                superblock.version_major
            )));
        }
        let unknown = superblock.flags & !KNOWN_FLAGS;
        if unknown != 0 {
            tracing::warn!(flags = superblock.flags, "unknown superblock flags");
            return Err(RucfsError::unsupported(format!("unknown flags {unknown:#010x}")));
        }
        if config.strict_reserved && superblock.reserved != 0 {
            return Err(RucfsError::data_broken(format!(
                "reserved field is {:#010x}",
                superblock.reserved
            )));
        }

        let len = buf.len();
        let table = |name: &str, offset: u32| -> RucfsResult<usize> {
            let offset = offset as usize;
            if offset < SUPERBLOCK_SIZE || offset > len {
                tracing::warn!(table = name, offset, len, "table offset out of bounds");
                return Err(RucfsError::data_broken(format!(
                    "{name} table offset {offset} outside [{SUPERBLOCK_SIZE}, {len}]"
                )));
            }
            Ok(offset)
        };
        let itab = table("inode", superblock.inode_table)?;
        let dtab = table("data", superblock.data_table)?;
        let stab = table("string", superblock.string_table)?;

        let inodes = TableExtent::between(itab, [dtab, stab], len);
        let data = TableExtent::between(dtab, [itab, stab], len);
        let strings = TableExtent::between(stab, [itab, dtab], len);

        let root = match InodeTable::new(&buf, inodes, endian).get(ROOT_INODE_OFFSET)? {
            Inode::Directory(root) => root,
            other => {
                tracing::warn!(kind = %other.kind(), "root record is not a directory");
                return Err(RucfsError::data_broken(format!(
                    "root record is a {}, not a directory",
                    other.kind()
                )));
            }
        };
        InodeTable::new(&buf, inodes, endian).check_children(&root)?;

        tracing::debug!(
            version = %format!("{}.{}", superblock.version_major, superblock.version_minor),
            endian = %endian,
            inode_table = itab,
            data_table = dtab,
            string_table = stab,
            root_items = root.item_count,
            "loaded rucfs image"
        );

        Ok(Self {
            buf,
            superblock,
            endian,
            inodes,
            data,
            strings,
            root,
            config,
        })
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// The root directory record.
    pub fn root(&self) -> &DirectoryInode {
        &self.root
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// The whole image.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// A new strong reference to the image buffer.
    pub fn buffer(&self) -> Arc<[u8]> {
        Arc::clone(&self.buf)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn inode_extent(&self) -> TableExtent {
        self.inodes
    }

    pub fn data_extent(&self) -> TableExtent {
        self.data
    }

    pub fn string_extent(&self) -> TableExtent {
        self.strings
    }

    pub(crate) fn inode_table(&self) -> InodeTable<'_> {
        InodeTable::new(&self.buf, self.inodes, self.endian)
    }

    pub(crate) fn string_table(&self) -> StringTable<'_> {
        StringTable::new(&self.buf, self.strings)
    }

    /// Decode the inode record at `offset` from the inode table base.
    pub fn inode_at(&self, offset: u32) -> RucfsResult<Inode> {
        self.inode_table().get(offset)
    }

    /// The name of `inode`, without its terminator.
    pub fn inode_name(&self, inode: &Inode) -> RucfsResult<&[u8]> {
        self.string_table().get(inode.name_offset())
    }

    /// The first child record of `dir`.
    ///
    /// Fails with `NotFound` for an empty directory.
    pub fn open_directory(&self, dir: &DirectoryInode) -> RucfsResult<Inode> {
        if dir.item_count == 0 {
            return Err(RucfsError::not_found(format!(
                "directory at {} is empty",
                dir.header.offset
            )));
        }
        let table = self.inode_table();
        table.check_children(dir)?;
        table.get(dir.ref_inode_offset)
    }

    /// The record a symlink points at, one hop only.
    pub fn open_symlink(&self, link: &SymlinkInode) -> RucfsResult<Inode> {
        tracing::trace!(from = link.header.offset, to = link.ref_inode_offset, "symlink hop");
        self.inode_table().get(link.ref_inode_offset)
    }

    /// Follow a symlink chain to its first non-symlink record.
    ///
    /// Non-symlinks are returned unchanged. Chains longer than
    /// `max_symlink_hops` are treated as cycles.
    pub fn follow(&self, inode: Inode) -> RucfsResult<Inode> {
        let mut current = inode;
        let mut hops = 0u32;
        while let Inode::Symlink(link) = current {
            if hops >= self.config.max_symlink_hops {
                tracing::warn!(
                    start = inode.offset(),
                    hops,
                    "symlink chain exceeds hop limit"
                );
                return Err(RucfsError::data_broken(format!(
                    "symlink chain from inode {} exceeds {} hops (cycle?)",
                    inode.offset(),
                    self.config.max_symlink_hops
                )));
            }
            current = self.open_symlink(&link)?;
            hops += 1;
        }
        Ok(current)
    }
}
