//! String table lookups.
//!
//! Names are NUL-terminated byte strings addressed by their offset from
//! the string table base. A name must terminate inside the table.

use crate::error::{RucfsError, RucfsResult};
use crate::layout::TableExtent;

/// Borrowed view of the string table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StringTable<'a> {
    bytes: &'a [u8],
}

impl<'a> StringTable<'a> {
    pub(crate) fn new(buf: &'a [u8], extent: TableExtent) -> Self {
        Self {
            bytes: &buf[extent.start..extent.end],
        }
    }

    /// The name at `offset`, without its terminator.
    pub(crate) fn get(&self, offset: u32) -> RucfsResult<&'a [u8]> {
        let start = offset as usize;
        let tail = self.bytes.get(start..).ok_or_else(|| {
            tracing::warn!(offset, len = self.bytes.len(), "name offset past string table");
            RucfsError::data_broken(format!(
                "name offset {offset} outside string table of {} bytes",
                self.bytes.len()
            ))
        })?;
        let nul = tail.iter().position(|&b| b == 0).ok_or_else(|| {
            tracing::warn!(offset, "unterminated name");
            RucfsError::data_broken(format!("name at offset {offset} is not NUL-terminated"))
        })?;
        Ok(&tail[..nul])
    }

    /// Compare the name at `offset` to `name` without materializing it.
    pub(crate) fn matches(&self, offset: u32, name: &[u8]) -> RucfsResult<bool> {
        Ok(self.get(offset)? == name)
    }
}
