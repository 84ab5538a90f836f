//! Reader for rucfs, a read-only archive-style filesystem image.
//!
//! An image is one contiguous byte buffer: a fixed superblock followed by
//! an inode table, a data table, and a string table. The reader validates
//! the superblock once, then answers path lookups, file opens and
//! directory listings straight out of the buffer without copying.
//!
//! ```text
//! Context::load(bytes)
//!     └── path_to(path)          walk from the root, one segment at a time
//!           ├── fopen(path)      FileHandle borrowing the content bytes
//!           ├── exist(path)      NotFound → false
//!           └── enumerate_path   direct children of a directory
//! ```
//!
//! # Key Types
//!
//! |--------------------|--------------------------------------------------|
//! | Type               | Purpose                                          |
//! |--------------------|--------------------------------------------------|
//! | [`Context`]        | Loaded image, shared by every operation          |
//! | [`Inode`]          | Decoded record: directory, file or symlink       |
//! | [`FileHandle`]     | Zero-copy view of a file's content               |
//! | [`OwnedFile`]      | File view that keeps the image alive by itself   |
//! | [`PathEntry`]      | One child produced by directory enumeration      |
//! | [`ImageBuilder`]   | Produces images from an in-memory tree           |
//! | [`RucfsError`]     | Failure, with a stable numeric [`ErrorCode`]     |
//! |--------------------|--------------------------------------------------|
//!
//! # Example
//!
//! ```
//! use rucfs::{Context, ImageBuilder};
//!
//! let mut builder = ImageBuilder::new();
//! builder.add_file("docs/hello.txt", "hi there").unwrap();
//! let ctx = Context::load(builder.build().unwrap()).unwrap();
//!
//! let file = ctx.fopen("/docs/hello.txt").unwrap();
//! assert_eq!(file.data(), b"hi there");
//! assert!(!ctx.exist("/docs/missing").unwrap());
//! ```

pub mod builder;
pub mod config;
mod context;
mod dir;
mod error;
mod file;
mod inode;
pub mod layout;
pub mod path;
mod resolve;
mod strtab;

pub use builder::{BuilderConfig, ImageBuilder};
pub use config::ReaderConfig;
pub use context::{Context, ROOT_INODE_OFFSET};
pub use dir::{Children, PathEntry};
pub use error::{ErrorCode, RucfsError, RucfsResult};
pub use file::{FileHandle, OwnedFile};
pub use inode::{DirectoryInode, FileInode, Inode, InodeHeader, InodeKind, SymlinkInode};
pub use layout::{Endian, Superblock, TableExtent};
pub use path::{normalize_path, normalized};
