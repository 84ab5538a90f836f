//! Image producer.
//!
//! [`ImageBuilder`] collects a tree in memory and serializes it into a
//! fresh image. It never touches an existing image.
//!
//! Layout written: superblock, inode table, data table, string table.
//! Inode records are assigned breadth-first, so the children of every
//! directory occupy one contiguous run of slots in insertion order.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use zerocopy::IntoBytes;

use crate::error::{RucfsError, RucfsResult};
use crate::layout::{
    Endian, FLAG_ENDIAN_BE, INODE_RECORD_SIZE, MAGIC, RawInode, SUPERBLOCK_SIZE, Superblock,
    TAG_DIRECTORY, TAG_FILE, TAG_SYMLINK, VERSION_MAJOR, VERSION_MINOR,
};
use crate::path::{SEPARATOR, lossy, segments};

/// Output options for [`ImageBuilder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    pub endian: Endian,
    /// Stored in the superblock `modded_time` field.
    pub modded_time: u32,
    pub version_minor: u8,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            endian: Endian::Little,
            modded_time: 0,
            version_minor: VERSION_MINOR,
        }
    }
}

impl BuilderConfig {
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub fn with_modded_time(mut self, secs: u32) -> Self {
        self.modded_time = secs;
        self
    }
}

#[derive(Debug, Clone)]
enum Node {
    Dir(Vec<usize>),
    File(Vec<u8>),
    Symlink(Vec<u8>),
}

#[derive(Debug, Clone)]
struct Entry {
    name: Vec<u8>,
    node: Node,
}

const ROOT: usize = 0;

/// Builds a rucfs image from an in-memory tree.
///
/// Paths are relative to the image root; leading and repeated slashes
/// are ignored. Missing parent directories are created on demand.
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    config: BuilderConfig,
    entries: Vec<Entry>,
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self::with_config(BuilderConfig::default())
    }

    pub fn with_config(config: BuilderConfig) -> Self {
        Self {
            config,
            entries: vec![Entry {
                name: Vec::new(),
                node: Node::Dir(Vec::new()),
            }],
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Add a directory. Adding an existing directory is a no-op.
    pub fn add_dir(&mut self, path: impl AsRef<[u8]>) -> RucfsResult<()> {
        let path = path.as_ref();
        let (parent, name) = self.parent_of(path)?;
        match self.child(parent, name) {
            Some(idx) if matches!(self.entries[idx].node, Node::Dir(_)) => Ok(()),
            Some(_) => Err(RucfsError::arguments(format!(
                "{} already exists",
                lossy(path)
            ))),
            None => {
                self.insert(parent, name, Node::Dir(Vec::new()));
                Ok(())
            }
        }
    }

    /// Add a regular file.
    pub fn add_file(&mut self, path: impl AsRef<[u8]>, data: impl Into<Vec<u8>>) -> RucfsResult<()> {
        let path = path.as_ref();
        let (parent, name) = self.parent_of(path)?;
        self.ensure_absent(parent, name, path)?;
        self.insert(parent, name, Node::File(data.into()));
        Ok(())
    }

    /// Add a symlink to `target`, an image path resolved from the root
    /// when the image is built. The target may itself be a symlink.
    pub fn add_symlink(
        &mut self,
        path: impl AsRef<[u8]>,
        target: impl AsRef<[u8]>,
    ) -> RucfsResult<()> {
        let path = path.as_ref();
        let (parent, name) = self.parent_of(path)?;
        self.ensure_absent(parent, name, path)?;
        self.insert(parent, name, Node::Symlink(target.as_ref().to_vec()));
        Ok(())
    }

    /// Number of entries, root included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() == 1
    }

    /// Serialize the tree.
    pub fn build(&self) -> RucfsResult<Vec<u8>> {
        let endian = self.config.endian;

        // Breadth-first slot assignment.
        let mut slot = vec![0u32; self.entries.len()];
        let mut first_child = vec![0u32; self.entries.len()];
        let mut next = INODE_RECORD_SIZE;
        let mut queue = VecDeque::from([ROOT]);
        while let Some(dir) = queue.pop_front() {
            let Node::Dir(children) = &self.entries[dir].node else {
                continue;
            };
            first_child[dir] = to_u32(next)?;
            for &child in children {
                slot[child] = to_u32(next)?;
                next += INODE_RECORD_SIZE;
                queue.push_back(child);
            }
        }
        let inode_bytes = next;

        let mut inodes = vec![0u8; inode_bytes];
        let mut data = Vec::new();
        let mut strings = Vec::new();
        for (idx, entry) in self.entries.iter().enumerate() {
            let name_offset = to_u32(strings.len())?;
            strings.extend_from_slice(&entry.name);
            strings.push(0);

            let record = match &entry.node {
                Node::Dir(children) => RawInode::new(
                    TAG_DIRECTORY,
                    name_offset,
                    to_u32(children.len())?,
                    first_child[idx],
                    endian,
                ),
                Node::File(content) => {
                    let offset = to_u32(data.len())?;
                    data.extend_from_slice(content);
                    RawInode::new(TAG_FILE, name_offset, offset, to_u32(content.len())?, endian)
                }
                Node::Symlink(target) => {
                    let target_idx = self.find(target).ok_or_else(|| {
                        RucfsError::arguments(format!(
                            "symlink {} points at missing {}",
                            lossy(&entry.name),
                            lossy(target)
                        ))
                    })?;
                    RawInode::new(TAG_SYMLINK, name_offset, slot[target_idx], 0, endian)
                }
            };
            let at = slot[idx] as usize;
            inodes[at..at + INODE_RECORD_SIZE].copy_from_slice(record.as_bytes());
        }

        let inode_table = SUPERBLOCK_SIZE;
        let data_table = inode_table + inodes.len();
        let string_table = data_table + data.len();
        let total = string_table + strings.len();
        to_u32(total)?;

        let superblock = Superblock {
            magic: MAGIC,
            version_major: VERSION_MAJOR,
            version_minor: self.config.version_minor,
            modded_time: self.config.modded_time,
            flags: match endian {
                Endian::Little => 0,
                Endian::Big => FLAG_ENDIAN_BE,
            },
            inode_table: to_u32(inode_table)?,
            data_table: to_u32(data_table)?,
            string_table: to_u32(string_table)?,
            reserved: 0,
        };

        let mut image = Vec::with_capacity(total);
        image.extend_from_slice(&superblock.to_bytes(endian));
        image.extend_from_slice(&inodes);
        image.extend_from_slice(&data);
        image.extend_from_slice(&strings);

        tracing::debug!(
            entries = self.entries.len(),
            bytes = image.len(),
            endian = %endian,
            "built rucfs image"
        );
        Ok(image)
    }

    /// Split `path` into its parent directory (created as needed) and
    /// final name.
    fn parent_of<'p>(&mut self, path: &'p [u8]) -> RucfsResult<(usize, &'p [u8])> {
        let segs: Vec<&[u8]> = segments(path).collect();
        let Some((name, dirs)) = segs.split_last() else {
            return Err(RucfsError::arguments("path names the root"));
        };
        for seg in segs.iter() {
            validate_name(seg)?;
        }

        let mut current = ROOT;
        for seg in dirs {
            current = match self.child(current, seg) {
                Some(idx) if matches!(self.entries[idx].node, Node::Dir(_)) => idx,
                Some(_) => {
                    return Err(RucfsError::arguments(format!(
                        "{} is not a directory",
                        lossy(seg)
                    )));
                }
                None => self.insert(current, seg, Node::Dir(Vec::new())),
            };
        }
        Ok((current, *name))
    }

    fn ensure_absent(&self, parent: usize, name: &[u8], path: &[u8]) -> RucfsResult<()> {
        if self.child(parent, name).is_some() {
            return Err(RucfsError::arguments(format!(
                "{} already exists",
                lossy(path)
            )));
        }
        Ok(())
    }

    fn child(&self, dir: usize, name: &[u8]) -> Option<usize> {
        let Node::Dir(children) = &self.entries[dir].node else {
            return None;
        };
        children
            .iter()
            .copied()
            .find(|&c| self.entries[c].name == name)
    }

    fn insert(&mut self, parent: usize, name: &[u8], node: Node) -> usize {
        let idx = self.entries.len();
        self.entries.push(Entry {
            name: name.to_vec(),
            node,
        });
        if let Node::Dir(children) = &mut self.entries[parent].node {
            children.push(idx);
        }
        idx
    }

    /// Locate an entry by image path without following symlinks.
    fn find(&self, path: &[u8]) -> Option<usize> {
        segments(path).try_fold(ROOT, |dir, seg| self.child(dir, seg))
    }
}

fn validate_name(name: &[u8]) -> RucfsResult<()> {
    if name.contains(&0) || name.contains(&SEPARATOR) {
        return Err(RucfsError::arguments(format!(
            "invalid entry name {:?}",
            lossy(name)
        )));
    }
    Ok(())
}

fn to_u32(n: usize) -> RucfsResult<u32> {
    u32::try_from(n).map_err(|_| RucfsError::arguments("image exceeds 4 GiB offset space"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::inode::InodeKind;

    #[test]
    fn test_empty_image() {
        let image = ImageBuilder::new().build().unwrap();
        // superblock + root record + root name
        assert_eq!(image.len(), SUPERBLOCK_SIZE + INODE_RECORD_SIZE + 1);
        let ctx = Context::load(image).unwrap();
        assert_eq!(ctx.root().item_count, 0);
    }

    #[test]
    fn test_parents_created() {
        let mut b = ImageBuilder::new();
        b.add_file("a/b/c.txt", b"c").unwrap();
        assert_eq!(b.len(), 4);
        let ctx = Context::load(b.build().unwrap()).unwrap();
        assert_eq!(ctx.path_to("/a/b").unwrap().kind(), InodeKind::Directory);
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut b = ImageBuilder::new();
        b.add_file("x", b"1").unwrap();
        assert!(b.add_file("x", b"2").is_err());
        assert!(b.add_dir("x").is_err());
        assert!(b.add_file("x/y", b"3").is_err());
        b.add_dir("d").unwrap();
        b.add_dir("d").unwrap();
    }

    #[test]
    fn test_invalid_names() {
        let mut b = ImageBuilder::new();
        assert!(b.add_file("/", b"").is_err());
        assert!(b.add_file("a\0b", b"").is_err());
    }

    #[test]
    fn test_dangling_symlink() {
        let mut b = ImageBuilder::new();
        b.add_symlink("l", "missing").unwrap();
        assert!(matches!(b.build(), Err(RucfsError::Arguments(_))));
    }

    #[test]
    fn test_children_contiguous_in_insertion_order() {
        let mut b = ImageBuilder::new();
        b.add_file("zeta", b"").unwrap();
        b.add_dir("alpha").unwrap();
        b.add_file("alpha/inner", b"").unwrap();
        b.add_file("mid", b"").unwrap();
        let ctx = Context::load(b.build().unwrap()).unwrap();
        let names: Vec<_> = ctx
            .enumerate_path("/")
            .unwrap()
            .into_iter()
            .map(|e| e.name.to_vec())
            .collect();
        assert_eq!(names, vec![b"zeta".to_vec(), b"alpha".to_vec(), b"mid".to_vec()]);
    }
}
