//! Inode table records.
//!
//! Every record is a fixed 16-byte slot sharing a common header (type tag
//! and name offset). The remaining two words depend on the type:
//!
//! | type      | field_a            | field_b            |
//! |-----------|--------------------|--------------------|
//! | Directory | `item_count`       | `ref_inode_offset` |
//! | File      | `data_offset`      | `data_length`      |
//! | Symlink   | `ref_inode_offset` | unused             |
//!
//! Records reference each other by offset from the inode table base.
//! Nothing here holds a pointer into the buffer; an [`Inode`] is a plain
//! decoded value and is re-validated whenever it is dereferenced.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;
use zerocopy::FromBytes;

use crate::error::{RucfsError, RucfsResult};
use crate::layout::{
    Endian, INODE_RECORD_SIZE, RawInode, TAG_DIRECTORY, TAG_FILE, TAG_SYMLINK, TableExtent,
};

/// Inode type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum InodeKind {
    #[strum(serialize = "directory", serialize = "dir")]
    Directory,
    File,
    #[strum(serialize = "symlink", serialize = "link")]
    Symlink,
}

impl InodeKind {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Map an on-disk type tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            TAG_DIRECTORY => Some(Self::Directory),
            TAG_FILE => Some(Self::File),
            TAG_SYMLINK => Some(Self::Symlink),
            _ => None,
        }
    }

    /// The on-disk type tag.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Directory => TAG_DIRECTORY,
            Self::File => TAG_FILE,
            Self::Symlink => TAG_SYMLINK,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::File => "file",
            Self::Symlink => "symlink",
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::File)
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self, Self::Symlink)
    }
}

impl std::fmt::Display for InodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fields shared by every inode variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InodeHeader {
    /// Offset of this record from the inode table base.
    pub offset: u32,
    pub kind: InodeKind,
    /// Offset of the name in the string table.
    pub name_offset: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DirectoryInode {
    pub header: InodeHeader,
    /// Number of direct children.
    pub item_count: u32,
    /// Offset of the first child record.
    pub ref_inode_offset: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FileInode {
    pub header: InodeHeader,
    /// Offset of the content from the data table base.
    pub data_offset: u32,
    pub data_length: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SymlinkInode {
    pub header: InodeHeader,
    /// Offset of the target record.
    pub ref_inode_offset: u32,
}

/// A decoded inode record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Inode {
    Directory(DirectoryInode),
    File(FileInode),
    Symlink(SymlinkInode),
}

impl Inode {
    pub fn header(&self) -> &InodeHeader {
        match self {
            Inode::Directory(d) => &d.header,
            Inode::File(f) => &f.header,
            Inode::Symlink(s) => &s.header,
        }
    }

    pub fn kind(&self) -> InodeKind {
        self.header().kind
    }

    /// Offset of this record from the inode table base.
    pub fn offset(&self) -> u32 {
        self.header().offset
    }

    pub fn name_offset(&self) -> u32 {
        self.header().name_offset
    }

    pub fn as_directory(&self) -> Option<&DirectoryInode> {
        match self {
            Inode::Directory(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileInode> {
        match self {
            Inode::File(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_symlink(&self) -> Option<&SymlinkInode> {
        match self {
            Inode::Symlink(s) => Some(s),
            _ => None,
        }
    }
}

impl From<DirectoryInode> for Inode {
    fn from(d: DirectoryInode) -> Self {
        Inode::Directory(d)
    }
}

impl From<FileInode> for Inode {
    fn from(f: FileInode) -> Self {
        Inode::File(f)
    }
}

impl From<SymlinkInode> for Inode {
    fn from(s: SymlinkInode) -> Self {
        Inode::Symlink(s)
    }
}

/// Borrowed view of the inode table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct InodeTable<'a> {
    buf: &'a [u8],
    extent: TableExtent,
    endian: Endian,
}

impl<'a> InodeTable<'a> {
    pub(crate) fn new(buf: &'a [u8], extent: TableExtent, endian: Endian) -> Self {
        Self {
            buf,
            extent,
            endian,
        }
    }

    /// Decode the record at `offset`.
    pub(crate) fn get(&self, offset: u32) -> RucfsResult<Inode> {
        let range = self.extent.slot(offset, INODE_RECORD_SIZE).ok_or_else(|| {
            tracing::warn!(offset, table_len = self.extent.len(), "inode offset out of bounds");
            RucfsError::data_broken(format!(
                "inode offset {offset} outside inode table of {} bytes",
                self.extent.len()
            ))
        })?;
        let raw = RawInode::ref_from_bytes(&self.buf[range])
            .map_err(|_| RucfsError::data_broken(format!("inode record at {offset} unreadable")))?;

        let kind = InodeKind::from_tag(raw.tag).ok_or_else(|| {
            tracing::warn!(offset, tag = raw.tag, "unknown inode type tag");
            RucfsError::data_broken(format!("inode at {offset} has unknown type tag {}", raw.tag))
        })?;
        let header = InodeHeader {
            offset,
            kind,
            name_offset: self.endian.read_u32(raw.name_offset),
        };
        let a = self.endian.read_u32(raw.field_a);
        let b = self.endian.read_u32(raw.field_b);

        Ok(match kind {
            InodeKind::Directory => Inode::Directory(DirectoryInode {
                header,
                item_count: a,
                ref_inode_offset: b,
            }),
            InodeKind::File => Inode::File(FileInode {
                header,
                data_offset: a,
                data_length: b,
            }),
            InodeKind::Symlink => Inode::Symlink(SymlinkInode {
                header,
                ref_inode_offset: a,
            }),
        })
    }

    /// Check that all `dir.item_count` child slots lie inside the table.
    pub(crate) fn check_children(&self, dir: &DirectoryInode) -> RucfsResult<()> {
        let span = (dir.item_count as usize).checked_mul(INODE_RECORD_SIZE);
        if span
            .and_then(|span| self.extent.slot(dir.ref_inode_offset, span))
            .is_none()
        {
            tracing::warn!(
                dir = dir.header.offset,
                first = dir.ref_inode_offset,
                count = dir.item_count,
                "directory children overrun inode table"
            );
            return Err(RucfsError::data_broken(format!(
                "directory at {} lists {} children from offset {}, past the inode table end",
                dir.header.offset, dir.item_count, dir.ref_inode_offset
            )));
        }
        Ok(())
    }

    /// Offset of the `index`-th child of `dir`.
    pub(crate) fn child_offset(dir: &DirectoryInode, index: u32) -> RucfsResult<u32> {
        index
            .checked_mul(INODE_RECORD_SIZE as u32)
            .and_then(|rel| dir.ref_inode_offset.checked_add(rel))
            .ok_or_else(|| {
                RucfsError::data_broken(format!(
                    "child {index} of directory at {} overflows the inode offset space",
                    dir.header.offset
                ))
            })
    }
}
