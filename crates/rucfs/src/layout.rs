//! On-disk layout of a rucfs image.
//!
//! ```text
//! offset 0    superblock (32 bytes)
//!             inode table   16-byte records, record 0 is the root directory
//!             data table    raw file contents
//!             string table  NUL-terminated names
//! ```
//!
//! The tables may appear in any order after the superblock. Each table
//! extends up to the next table start (or the end of the buffer).
//!
//! Multi-byte fields use the byte order selected by bit 0 of `flags`.
//! The flag is detected by reading the `flags` word big-endian first: a
//! big-endian writer stores `1` as `00 00 00 01`, a little-endian writer
//! never sets the bit.

use serde::{Deserialize, Serialize};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::{RucfsError, RucfsResult};

/// Format identifier stored in the first six bytes.
pub const MAGIC: [u8; 6] = *b"rucfs\0";

/// The only breaking version this reader implements.
pub const VERSION_MAJOR: u8 = 1;

/// Minor version written by [`crate::ImageBuilder`].
pub const VERSION_MINOR: u8 = 0;

/// Size of the superblock in bytes.
pub const SUPERBLOCK_SIZE: usize = 32;

/// Size of one inode table record in bytes.
pub const INODE_RECORD_SIZE: usize = 16;

/// `flags` bit 0: multi-byte fields are big-endian.
pub const FLAG_ENDIAN_BE: u32 = 0x0000_0001;

/// Every flag bit this reader understands.
pub const KNOWN_FLAGS: u32 = FLAG_ENDIAN_BE;

/// Inode type tags.
pub const TAG_DIRECTORY: u8 = 1;
pub const TAG_FILE: u8 = 2;
pub const TAG_SYMLINK: u8 = 3;

/// Byte order of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Endian {
    #[default]
    Little,
    Big,
}

impl Endian {
    /// Decode a 32-bit field.
    pub fn read_u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            Endian::Little => u32::from_le_bytes(bytes),
            Endian::Big => u32::from_be_bytes(bytes),
        }
    }

    /// Encode a 32-bit field.
    pub fn write_u32(self, value: u32) -> [u8; 4] {
        match self {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Endian::Little => "little-endian",
            Endian::Big => "big-endian",
        }
    }
}

impl std::fmt::Display for Endian {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw superblock bytes, overlaid on the start of the buffer.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Clone, Copy)]
#[repr(C)]
pub(crate) struct RawSuperblock {
    magic: [u8; 6],
    version_major: u8,
    version_minor: u8,
    modded_time: [u8; 4],
    flags: [u8; 4],
    inode_table: [u8; 4],
    data_table: [u8; 4],
    string_table: [u8; 4],
    reserved: [u8; 4],
}

/// Raw inode record, overlaid on a 16-byte inode table slot.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Clone, Copy)]
#[repr(C)]
pub(crate) struct RawInode {
    pub(crate) tag: u8,
    pad: [u8; 3],
    pub(crate) name_offset: [u8; 4],
    pub(crate) field_a: [u8; 4],
    pub(crate) field_b: [u8; 4],
}

const _: () = assert!(std::mem::size_of::<RawSuperblock>() == SUPERBLOCK_SIZE);
const _: () = assert!(std::mem::size_of::<RawInode>() == INODE_RECORD_SIZE);

impl RawInode {
    pub(crate) fn new(tag: u8, name_offset: u32, field_a: u32, field_b: u32, endian: Endian) -> Self {
        Self {
            tag,
            pad: [0; 3],
            name_offset: endian.write_u32(name_offset),
            field_a: endian.write_u32(field_a),
            field_b: endian.write_u32(field_b),
        }
    }
}

/// Decoded superblock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Superblock {
    pub magic: [u8; 6],
    pub version_major: u8,
    pub version_minor: u8,
    /// Image build timestamp (seconds since the Unix epoch).
    pub modded_time: u32,
    pub flags: u32,
    pub inode_table: u32,
    pub data_table: u32,
    pub string_table: u32,
    pub reserved: u32,
}

impl Superblock {
    /// Decode the superblock at the start of `buf`.
    ///
    /// Only the byte order is interpreted here; magic, version and table
    /// bounds are validated by the loader.
    pub fn parse(buf: &[u8]) -> RucfsResult<(Self, Endian)> {
        let (raw, _) = RawSuperblock::ref_from_prefix(buf).map_err(|_| {
            RucfsError::arguments(format!(
                "buffer of {} bytes is smaller than the {SUPERBLOCK_SIZE}-byte superblock",
                buf.len()
            ))
        })?;

        let endian = if u32::from_be_bytes(raw.flags) & FLAG_ENDIAN_BE != 0 {
            Endian::Big
        } else if u32::from_le_bytes(raw.flags) & FLAG_ENDIAN_BE != 0 {
            return Err(RucfsError::unsupported(
                "big-endian flag stored in little-endian order",
            ));
        } else {
            Endian::Little
        };

        let sb = Self {
            magic: raw.magic,
            version_major: raw.version_major,
            version_minor: raw.version_minor,
            modded_time: endian.read_u32(raw.modded_time),
            flags: endian.read_u32(raw.flags),
            inode_table: endian.read_u32(raw.inode_table),
            data_table: endian.read_u32(raw.data_table),
            string_table: endian.read_u32(raw.string_table),
            reserved: endian.read_u32(raw.reserved),
        };
        Ok((sb, endian))
    }

    /// Encode into the on-disk representation.
    pub fn to_bytes(&self, endian: Endian) -> [u8; SUPERBLOCK_SIZE] {
        let raw = RawSuperblock {
            magic: self.magic,
            version_major: self.version_major,
            version_minor: self.version_minor,
            modded_time: endian.write_u32(self.modded_time),
            flags: endian.write_u32(self.flags),
            inode_table: endian.write_u32(self.inode_table),
            data_table: endian.write_u32(self.data_table),
            string_table: endian.write_u32(self.string_table),
            reserved: endian.write_u32(self.reserved),
        };
        let mut out = [0u8; SUPERBLOCK_SIZE];
        out.copy_from_slice(raw.as_bytes());
        out
    }

    /// Returns true if the big-endian flag is set.
    pub fn is_big_endian(&self) -> bool {
        self.flags & FLAG_ENDIAN_BE != 0
    }
}

/// Half-open byte range `[start, end)` of one table within the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableExtent {
    pub start: usize,
    pub end: usize,
}

impl TableExtent {
    /// Extent of the table starting at `start`: up to the nearest other
    /// table start above it, or the end of the buffer.
    pub(crate) fn between(start: usize, others: [usize; 2], buf_len: usize) -> Self {
        let end = others
            .into_iter()
            .filter(|&o| o > start)
            .fold(buf_len, usize::min);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Absolute range of `len` bytes at table-relative `offset`, if it
    /// lies wholly inside this table.
    pub(crate) fn slot(&self, offset: u32, len: usize) -> Option<std::ops::Range<usize>> {
        let start = self.start.checked_add(offset as usize)?;
        let end = start.checked_add(len)?;
        (end <= self.end).then_some(start..end)
    }
}
