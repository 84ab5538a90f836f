//! Path resolution.
//!
//! Walks from the root directory one segment at a time, scanning each
//! directory's children linearly and comparing names byte-for-byte.
//! Symlinks met on intermediate segments are followed; the final segment
//! is returned as stored.

use crate::context::Context;
use crate::error::{RucfsError, RucfsResult};
use crate::inode::{DirectoryInode, Inode, InodeTable};
use crate::path::{lossy, segments};

impl Context {
    /// Resolve `path` to an inode.
    ///
    /// The result is whatever the last segment names, symlinks included.
    /// A path made only of separators resolves to the root directory.
    pub fn path_to(&self, path: impl AsRef<[u8]>) -> RucfsResult<Inode> {
        let path = path.as_ref();
        self.check_path(path)?;

        let mut dir = *self.root();
        let mut segs = segments(path).peekable();
        while let Some(seg) = segs.next() {
            tracing::trace!(dir = dir.header.offset, segment = %lossy(seg), "lookup");
            let child = self
                .lookup(&dir, seg)?
                .ok_or_else(|| RucfsError::not_found(lossy(path)))?;

            if segs.peek().is_none() {
                tracing::debug!(
                    path = %lossy(path),
                    offset = child.offset(),
                    kind = %child.kind(),
                    "resolved"
                );
                return Ok(child);
            }

            dir = match self.follow(child)? {
                Inode::Directory(next) => next,
                other => {
                    tracing::trace!(segment = %lossy(seg), kind = %other.kind(), "not a directory");
                    return Err(RucfsError::not_found(lossy(path)));
                }
            };
        }
        Ok(Inode::Directory(dir))
    }

    /// Alias of [`Context::path_to`].
    pub fn resolve(&self, path: impl AsRef<[u8]>) -> RucfsResult<Inode> {
        self.path_to(path)
    }

    /// Find the direct child of `dir` called `name`.
    pub fn lookup(&self, dir: &DirectoryInode, name: &[u8]) -> RucfsResult<Option<Inode>> {
        let table = self.inode_table();
        let strings = self.string_table();
        table.check_children(dir)?;
        for index in 0..dir.item_count {
            let child = table.get(InodeTable::child_offset(dir, index)?)?;
            if strings.matches(child.name_offset(), name)? {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    pub(crate) fn check_path(&self, path: &[u8]) -> RucfsResult<()> {
        if path.is_empty() {
            return Err(RucfsError::arguments("empty path"));
        }
        if path.len() > self.config().max_path_len {
            return Err(RucfsError::arguments(format!(
                "path of {} bytes exceeds limit of {}",
                path.len(),
                self.config().max_path_len
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::ImageBuilder;
    use crate::config::ReaderConfig;
    use crate::context::Context;
    use crate::error::RucfsError;
    use crate::inode::InodeKind;

    fn ctx() -> Context {
        let mut b = ImageBuilder::new();
        b.add_file(".gitignore", b"target\n").unwrap();
        b.add_file("src/rucfs.c", b"/* c */").unwrap();
        b.add_file("src/include/rucfs.h", b"#pragma once").unwrap();
        b.add_symlink("inc", "src/include").unwrap();
        b.add_symlink("hop1", "inc").unwrap();
        b.add_symlink("header", "src/include/rucfs.h").unwrap();
        Context::load(b.build().unwrap()).unwrap()
    }

    #[test]
    fn test_resolve_file() {
        let ctx = ctx();
        let inode = ctx.path_to("/src/rucfs.c").unwrap();
        assert_eq!(inode.kind(), InodeKind::File);
        assert_eq!(ctx.inode_name(&inode).unwrap(), b"rucfs.c");
    }

    #[test]
    fn test_root_forms() {
        let ctx = ctx();
        for path in ["/", "//", "///"] {
            let inode = ctx.path_to(path).unwrap();
            assert_eq!(inode.offset(), 0, "{path}");
            assert_eq!(inode.kind(), InodeKind::Directory);
        }
    }

    #[test]
    fn test_redundant_separators() {
        let ctx = ctx();
        let a = ctx.path_to("src/include/rucfs.h").unwrap();
        let b = ctx.path_to("//src///include//rucfs.h/").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_deterministic() {
        let ctx = ctx();
        let a = ctx.path_to("/src/rucfs.c").unwrap();
        let b = ctx.path_to("/src/rucfs.c").unwrap();
        assert_eq!(a.offset(), b.offset());
    }

    #[test]
    fn test_not_found() {
        let ctx = ctx();
        assert!(ctx.path_to("/src/none").unwrap_err().is_not_found());
        assert!(ctx.path_to("/nope/rucfs.c").unwrap_err().is_not_found());
        assert!(ctx.path_to("/SRC").unwrap_err().is_not_found());
    }

    #[test]
    fn test_file_as_intermediate() {
        let ctx = ctx();
        let err = ctx.path_to("/.gitignore/x").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_empty_path() {
        let ctx = ctx();
        assert!(matches!(ctx.path_to(""), Err(RucfsError::Arguments(_))));
    }

    #[test]
    fn test_path_length_limit() {
        let mut b = ImageBuilder::new();
        b.add_file("a", b"").unwrap();
        let config = ReaderConfig::default().with_max_path_len(8);
        let ctx = Context::load_with(b.build().unwrap(), config).unwrap();
        assert!(ctx.path_to("/a").is_ok());
        assert!(matches!(ctx.path_to("/aaaaaaaaaa"), Err(RucfsError::Arguments(_))));
    }

    #[test]
    fn test_final_symlink_not_followed() {
        let ctx = ctx();
        let inode = ctx.path_to("/inc").unwrap();
        assert_eq!(inode.kind(), InodeKind::Symlink);
    }

    #[test]
    fn test_intermediate_symlinks_followed() {
        let ctx = ctx();
        let direct = ctx.path_to("/src/include/rucfs.h").unwrap();
        assert_eq!(ctx.path_to("/inc/rucfs.h").unwrap(), direct);
        assert_eq!(ctx.path_to("/hop1/rucfs.h").unwrap(), direct);
    }

    #[test]
    fn test_symlink_to_file_as_intermediate() {
        let ctx = ctx();
        assert!(ctx.path_to("/header/x").unwrap_err().is_not_found());
    }

    #[test]
    fn test_follow_chain_matches_manual_hops() {
        let ctx = ctx();
        let hop1 = ctx.path_to("/hop1").unwrap();
        let inc = ctx.open_symlink(hop1.as_symlink().unwrap()).unwrap();
        let manual = ctx.open_symlink(inc.as_symlink().unwrap()).unwrap();
        assert_eq!(ctx.follow(hop1).unwrap(), manual);
        assert_eq!(manual, ctx.path_to("/src/include").unwrap());
    }

    #[test]
    fn test_resolve_with_trace_logging() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let ctx = ctx();
            assert!(ctx.path_to("/inc/rucfs.h").is_ok());
            assert!(ctx.path_to("/.gitignore/x").unwrap_err().is_not_found());
            let handle = ctx.fopen("/src/rucfs.c").unwrap();
            ctx.fclose(handle).unwrap();
        });
    }

    #[test]
    fn test_lookup() {
        let ctx = ctx();
        let found = ctx.lookup(ctx.root(), b"src").unwrap().unwrap();
        assert_eq!(found.kind(), InodeKind::Directory);
        assert!(ctx.lookup(ctx.root(), b"rucfs.c").unwrap().is_none());
    }
}
