//! Packing a host directory into an image.
//!
//! Regular files and directories are copied. A host symlink becomes an
//! image symlink when it resolves to a file or directory inside the packed
//! tree; anything else (dangling links, links leaving the tree, sockets,
//! fifos, devices) is skipped with a warning.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use rucfs::{BuilderConfig, ImageBuilder};

/// Seconds since the epoch, saturating at `u32::MAX`.
pub fn now_secs() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

/// Build an image from the tree rooted at `dir`.
pub fn pack_dir(dir: &Path, config: BuilderConfig) -> Result<Vec<u8>> {
    let root = dir
        .canonicalize()
        .with_context(|| format!("resolving {}", dir.display()))?;
    if !root.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let mut builder = ImageBuilder::with_config(config);
    let mut links = Vec::new();
    add_tree(&root, &root, &mut builder, &mut links)?;

    // Targets are all in the builder by now.
    for (link, target) in links {
        builder
            .add_symlink(&link, &target)
            .with_context(|| format!("adding symlink {}", String::from_utf8_lossy(&link)))?;
    }

    let image = builder.build()?;
    tracing::debug!(root = %root.display(), entries = builder.len(), bytes = image.len(), "packed tree");
    Ok(image)
}

fn add_tree(
    root: &Path,
    dir: &Path,
    builder: &mut ImageBuilder,
    links: &mut Vec<(Vec<u8>, Vec<u8>)>,
) -> Result<()> {
    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let image_path = image_path(root, &path)?;
        let file_type = entry
            .file_type()
            .with_context(|| format!("inspecting {}", path.display()))?;

        if file_type.is_dir() {
            builder.add_dir(&image_path)?;
            add_tree(root, &path, builder, links)?;
        } else if file_type.is_file() {
            let data =
                std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            builder.add_file(&image_path, data)?;
        } else if file_type.is_symlink() {
            match link_target(root, &path) {
                Some(target) => links.push((image_path, target)),
                None => tracing::warn!(
                    path = %path.display(),
                    "skipping symlink that does not resolve inside the tree"
                ),
            }
        } else {
            tracing::warn!(path = %path.display(), "skipping special file");
        }
    }
    Ok(())
}

/// The image path of a symlink's final target, if it is a file or
/// directory inside `root`.
fn link_target(root: &Path, link: &Path) -> Option<Vec<u8>> {
    let target = link.canonicalize().ok()?;
    if !(target.is_file() || target.is_dir()) {
        return None;
    }
    image_path(root, &target).ok()
}

/// `path` relative to `root`, as a `/`-separated byte string.
fn image_path(root: &Path, path: &Path) -> Result<Vec<u8>> {
    let rel = path
        .strip_prefix(root)
        .with_context(|| format!("{} is outside {}", path.display(), root.display()))?;
    let mut out = Vec::new();
    for component in rel.components() {
        if !out.is_empty() {
            out.push(b'/');
        }
        out.extend_from_slice(component.as_os_str().as_encoded_bytes());
    }
    Ok(out)
}
