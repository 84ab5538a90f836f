//! Inspection subcommands. Each writes its report to `out`.

use std::io::Write;

use anyhow::{Result, bail};
use rucfs::{Context, DirectoryInode, Inode, InodeKind, RucfsError};
use serde::Serialize;

/// Directory nesting deeper than this is reported as corruption.
const MAX_TREE_DEPTH: usize = 256;

/// Exit statuses of `exists`.
pub const EXISTS_PRESENT: u8 = 0;
pub const EXISTS_ABSENT: u8 = 1;
pub const EXISTS_FAILED: u8 = 2;

#[derive(Debug, Serialize)]
struct ListEntry {
    name: String,
    kind: InodeKind,
    offset: u32,
}

pub fn info(ctx: &Context, out: &mut impl Write) -> Result<()> {
    let sb = ctx.superblock();
    writeln!(out, "version:      {}.{}", sb.version_major, sb.version_minor)?;
    writeln!(out, "byte order:   {}", ctx.endian())?;
    writeln!(out, "modded time:  {}", sb.modded_time)?;
    writeln!(out, "flags:        {:#010x}", sb.flags)?;
    writeln!(out, "inode table:  {} ({} bytes)", sb.inode_table, ctx.inode_extent().len())?;
    writeln!(out, "data table:   {} ({} bytes)", sb.data_table, ctx.data_extent().len())?;
    writeln!(out, "string table: {} ({} bytes)", sb.string_table, ctx.string_extent().len())?;
    writeln!(out, "image size:   {}", ctx.len())?;
    writeln!(out, "root items:   {}", ctx.root().item_count)?;
    Ok(())
}

pub fn ls(ctx: &Context, path: &str, json: bool, out: &mut impl Write) -> Result<()> {
    let entries = ctx.enumerate_path(path)?;
    if json {
        let entries: Vec<_> = entries
            .iter()
            .map(|e| ListEntry {
                name: e.name_lossy().into_owned(),
                kind: e.kind,
                offset: e.offset,
            })
            .collect();
        serde_json::to_writer_pretty(&mut *out, &entries)?;
        writeln!(out)?;
        return Ok(());
    }
    for entry in entries {
        writeln!(out, "{:<9} {}", entry.kind.as_str(), entry.name_lossy())?;
    }
    Ok(())
}

pub fn tree(ctx: &Context, path: &str, out: &mut impl Write) -> Result<()> {
    let dir = match ctx.path_to(path)? {
        Inode::Directory(dir) => dir,
        other => {
            return Err(RucfsError::wrong_type(path, InodeKind::Directory, other.kind()).into());
        }
    };
    writeln!(out, "{path}")?;
    walk(ctx, &dir, 1, out)
}

/// Recurses on child records directly, so names are never re-resolved.
fn walk(ctx: &Context, dir: &DirectoryInode, depth: usize, out: &mut impl Write) -> Result<()> {
    if depth > MAX_TREE_DEPTH {
        bail!(
            "directory at inode {}: nested deeper than {MAX_TREE_DEPTH}",
            dir.header.offset
        );
    }
    let indent = "  ".repeat(depth);
    let mut children = ctx.children(dir)?;
    while let Some(item) = children.next_inode() {
        let (inode, entry) = item?;
        let name = entry.name_lossy();
        match inode {
            Inode::Directory(child) => {
                writeln!(out, "{indent}{name}/")?;
                walk(ctx, &child, depth + 1, out)?;
            }
            Inode::File(_) => writeln!(out, "{indent}{name}")?,
            Inode::Symlink(_) => {
                let target = ctx
                    .follow(inode)
                    .and_then(|target| ctx.inode_name(&target).map(<[u8]>::to_vec));
                match target {
                    Ok(target) => {
                        writeln!(out, "{indent}{name} -> {}", String::from_utf8_lossy(&target))?
                    }
                    Err(e) => writeln!(out, "{indent}{name} -> ({e})")?,
                }
            }
        }
    }
    Ok(())
}

pub fn cat(ctx: &Context, path: &str, follow: bool, out: &mut impl Write) -> Result<()> {
    if !follow {
        let handle = ctx.fopen(path)?;
        out.write_all(handle.data())?;
        return Ok(ctx.fclose(handle)?);
    }
    match ctx.follow(ctx.path_to(path)?)? {
        Inode::File(file) => {
            let range = ctx.data_range(&file)?;
            out.write_all(&ctx.as_bytes()[range])?;
            Ok(())
        }
        other => Err(RucfsError::wrong_type(path, InodeKind::File, other.kind()).into()),
    }
}

pub fn stat(ctx: &Context, path: &str, out: &mut impl Write) -> Result<()> {
    let inode = ctx.path_to(path)?;
    let name = ctx.inode_name(&inode)?;
    writeln!(out, "name:   {}", String::from_utf8_lossy(name))?;
    writeln!(out, "kind:   {}", inode.kind())?;
    writeln!(out, "inode:  {}", inode.offset())?;
    match inode {
        Inode::Directory(dir) => {
            writeln!(out, "items:  {}", dir.item_count)?;
            writeln!(out, "first:  {}", dir.ref_inode_offset)?;
        }
        Inode::File(file) => {
            writeln!(out, "size:   {}", file.data_length)?;
            writeln!(out, "data:   {}", file.data_offset)?;
        }
        Inode::Symlink(link) => {
            writeln!(out, "target: {}", link.ref_inode_offset)?;
        }
    }
    Ok(())
}

/// Exit status for `exists`. Only a missing path is `EXISTS_ABSENT`; a
/// broken image or bad path is reported on stderr as `EXISTS_FAILED`.
pub fn exists(ctx: &Context, path: &str) -> u8 {
    match ctx.exist(path) {
        Ok(true) => EXISTS_PRESENT,
        Ok(false) => EXISTS_ABSENT,
        Err(e) => {
            eprintln!("Error: {path}: {e}");
            EXISTS_FAILED
        }
    }
}

pub fn normalize(path: &str, endslash: bool, out: &mut impl Write) -> Result<()> {
    let normalized = rucfs::normalized(path.as_bytes(), endslash);
    out.write_all(&normalized)?;
    writeln!(out)?;
    Ok(())
}
