//! rucfs error types.

use std::io;
use thiserror::Error;

use crate::inode::InodeKind;

/// Stable numeric error codes.
///
/// These values are part of the format's external contract and must not
/// change between releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    Ok = 0,
    Arguments = -1,
    DataBroken = -2,
    Unsupported = -3,
    NotFound = -4,
    OutOfMemory = -5,
}

impl ErrorCode {
    /// The raw code.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Map a raw code back to its variant.
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            -1 => Some(Self::Arguments),
            -2 => Some(Self::DataBroken),
            -3 => Some(Self::Unsupported),
            -4 => Some(Self::NotFound),
            -5 => Some(Self::OutOfMemory),
            _ => None,
        }
    }

    /// Lowercase name, e.g. `data_broken`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Arguments => "arguments",
            Self::DataBroken => "data_broken",
            Self::Unsupported => "unsupported",
            Self::NotFound => "not_found",
            Self::OutOfMemory => "out_of_memory",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// rucfs error type.
#[derive(Debug, Error)]
pub enum RucfsError {
    /// Malformed call input (empty buffer, empty path, short destination).
    #[error("invalid arguments: {0}")]
    Arguments(String),

    /// The image is structurally corrupt.
    #[error("image data broken: {0}")]
    DataBroken(String),

    /// The image uses a version or feature this reader does not implement.
    #[error("unsupported image: {0}")]
    Unsupported(String),

    /// Well-formed path absent from the image.
    #[error("not found: {0}")]
    NotFound(String),

    /// Allocation failed while materializing results.
    #[error("out of memory")]
    OutOfMemory,

    /// The path resolved, but to the wrong kind of inode.
    #[error("{path}: expected {expected}, found {found}")]
    WrongType {
        path: String,
        expected: InodeKind,
        found: InodeKind,
    },
}

impl RucfsError {
    /// Create an Arguments error.
    pub fn arguments(msg: impl Into<String>) -> Self {
        Self::Arguments(msg.into())
    }

    /// Create a DataBroken error.
    pub fn data_broken(msg: impl Into<String>) -> Self {
        Self::DataBroken(msg.into())
    }

    /// Create an Unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a WrongType error.
    pub fn wrong_type(path: impl Into<String>, expected: InodeKind, found: InodeKind) -> Self {
        Self::WrongType {
            path: path.into(),
            expected,
            found,
        }
    }

    /// The stable code for this error.
    ///
    /// `WrongType` reports as `Arguments`: the caller handed in a path of
    /// the wrong kind.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Arguments(_) | Self::WrongType { .. } => ErrorCode::Arguments,
            Self::DataBroken(_) => ErrorCode::DataBroken,
            Self::Unsupported(_) => ErrorCode::Unsupported,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::OutOfMemory => ErrorCode::OutOfMemory,
        }
    }

    /// Returns true for a missing path.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true when the image itself cannot be trusted.
    pub fn is_data_broken(&self) -> bool {
        matches!(self, Self::DataBroken(_))
    }
}

/// Convert RucfsError to std::io::Error for compatibility.
impl From<RucfsError> for io::Error {
    fn from(e: RucfsError) -> Self {
        match e {
            RucfsError::Arguments(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            RucfsError::DataBroken(msg) => io::Error::new(io::ErrorKind::InvalidData, msg),
            RucfsError::Unsupported(msg) => io::Error::new(io::ErrorKind::Unsupported, msg),
            RucfsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            RucfsError::OutOfMemory => io::Error::new(io::ErrorKind::OutOfMemory, "out of memory"),
            RucfsError::WrongType {
                path,
                expected,
                found,
            } => {
                let kind = match expected {
                    InodeKind::Directory => io::ErrorKind::NotADirectory,
                    InodeKind::File if found == InodeKind::Directory => {
                        io::ErrorKind::IsADirectory
                    }
                    _ => io::ErrorKind::InvalidInput,
                };
                io::Error::new(kind, format!("{path}: expected {expected}, found {found}"))
            }
        }
    }
}

/// rucfs result type.
pub type RucfsResult<T> = Result<T, RucfsError>;
