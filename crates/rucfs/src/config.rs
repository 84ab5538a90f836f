//! Reader limits and policy.
//!
//! Loaded from TOML, every field optional:
//!
//! ```toml
//! max_symlink_hops = 16
//! max_path_len = 4096
//! strict_reserved = false
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{RucfsError, RucfsResult};

/// Default bound on symlink chain length.
pub const DEFAULT_MAX_SYMLINK_HOPS: u32 = 16;

/// Default bound on path length in bytes.
pub const DEFAULT_MAX_PATH_LEN: usize = 4096;

/// Configuration applied to every operation on a [`crate::Context`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderConfig {
    /// Symlinks followed before a chain is treated as cyclic.
    pub max_symlink_hops: u32,
    /// Longest path accepted, in bytes.
    pub max_path_len: usize,
    /// Reject images whose reserved superblock field is nonzero.
    pub strict_reserved: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_symlink_hops: DEFAULT_MAX_SYMLINK_HOPS,
            max_path_len: DEFAULT_MAX_PATH_LEN,
            strict_reserved: false,
        }
    }
}

impl ReaderConfig {
    /// Parse from a TOML document.
    pub fn from_toml(text: &str) -> RucfsResult<Self> {
        toml::from_str(text).map_err(|e| RucfsError::arguments(format!("reader config: {e}")))
    }

    /// Set the symlink hop limit.
    pub fn with_max_symlink_hops(mut self, hops: u32) -> Self {
        self.max_symlink_hops = hops;
        self
    }

    /// Set the path length limit.
    pub fn with_max_path_len(mut self, len: usize) -> Self {
        self.max_path_len = len;
        self
    }

    /// Require the reserved superblock field to be zero.
    pub fn with_strict_reserved(mut self, strict: bool) -> Self {
        self.strict_reserved = strict;
        self
    }
}
