//! Integration tests for the public reader surface.
//!
//! Images are produced with `ImageBuilder`, then read back through
//! `Context`. The corruption tests mutate a valid image and only require
//! that every operation returns instead of panicking.

use std::sync::Arc;

use rucfs::{
    BuilderConfig, Context, Endian, ErrorCode, ImageBuilder, InodeKind, ReaderConfig, RucfsError,
    normalize_path, normalized,
};

// ============================================================================
// Shared test setup
// ============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("rucfs=trace")
        .with_test_writer()
        .try_init();
}

/// The tree used throughout: a small source checkout.
fn checkout(endian: Endian) -> Vec<u8> {
    let config = BuilderConfig::default()
        .with_endian(endian)
        .with_modded_time(1_700_000_000);
    let mut b = ImageBuilder::with_config(config);
    b.add_file(".gitignore", "target\n").unwrap();
    b.add_file("README.md", "# rucfs\n").unwrap();
    b.add_file("src/rucfs.c", "#include \"rucfs.h\"\n").unwrap();
    b.add_file("src/include/rucfs.h", "#pragma once\n").unwrap();
    b.add_dir("img").unwrap();
    b.add_symlink("include", "src/include").unwrap();
    b.add_symlink("current", "include").unwrap();
    b.build().unwrap()
}

/// Visit every reachable entry, bounded in depth so that corrupted
/// directory cycles terminate.
fn walk(ctx: &Context, path: &str, depth: usize, out: &mut Vec<(String, InodeKind)>) {
    if depth == 0 {
        return;
    }
    let Ok(entries) = ctx.enumerate_path(path) else {
        return;
    };
    for entry in entries {
        let child = format!("{}/{}", path.trim_end_matches('/'), entry.name_lossy());
        out.push((child.clone(), entry.kind));
        match entry.kind {
            InodeKind::Directory => walk(ctx, &child, depth - 1, out),
            InodeKind::File => {
                let _ = ctx.fopen(&child);
            }
            InodeKind::Symlink => {
                let _ = ctx.path_to(&child).and_then(|l| ctx.follow(l));
            }
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_superblock_fields() {
    init_tracing();
    let ctx = Context::load(checkout(Endian::Little)).unwrap();
    let sb = ctx.superblock();
    assert_eq!(sb.version_major, 1);
    assert_eq!(sb.modded_time, 1_700_000_000);
    assert_eq!(sb.inode_table, 32);
    assert!(sb.inode_table <= sb.data_table);
    assert!(sb.data_table <= sb.string_table);

    let json = serde_json::to_value(sb).unwrap();
    assert_eq!(json["modded_time"], 1_700_000_000);
}

#[test]
fn test_loading_twice_is_independent() {
    let image: Arc<[u8]> = checkout(Endian::Little).into();
    let a = Context::load(Arc::clone(&image)).unwrap();
    let b = Context::load(Arc::clone(&image)).unwrap();
    assert_eq!(a.path_to("/src/rucfs.c").unwrap(), b.path_to("/src/rucfs.c").unwrap());
    drop(a);
    assert!(b.exist("/README.md").unwrap());
}

#[test]
fn test_reader_config_from_toml() {
    let config = ReaderConfig::from_toml("max_symlink_hops = 1").unwrap();
    let ctx = Context::load_with(checkout(Endian::Little), config).unwrap();
    // include -> src/include is one hop, current -> include -> src/include is two
    assert!(ctx.path_to("/include/rucfs.h").is_ok());
    assert!(ctx.path_to("/current/rucfs.h").unwrap_err().is_data_broken());
}

// ============================================================================
// Byte order
// ============================================================================

#[test]
fn test_both_byte_orders_read_the_same() {
    let little = Context::load(checkout(Endian::Little)).unwrap();
    let big = Context::load(checkout(Endian::Big)).unwrap();
    assert_eq!(big.endian(), Endian::Big);

    let mut a = Vec::new();
    let mut b = Vec::new();
    walk(&little, "/", 8, &mut a);
    walk(&big, "/", 8, &mut b);
    assert_eq!(a, b);
    assert_eq!(
        little.fopen("/current/rucfs.h").unwrap().data(),
        big.fopen("/include/rucfs.h").unwrap().data()
    );
}

// ============================================================================
// Resolution, files, enumeration
// ============================================================================

#[test]
fn test_open_file_through_symlinks() {
    let ctx = Context::load(checkout(Endian::Little)).unwrap();
    let handle = ctx.fopen("current/rucfs.h").unwrap();
    assert_eq!(handle.name(), b"rucfs.h");
    assert_eq!(handle.data(), b"#pragma once\n");
    ctx.fclose(handle).unwrap();
}

#[test]
fn test_error_codes() {
    let ctx = Context::load(checkout(Endian::Little)).unwrap();
    let code = |r: Result<(), RucfsError>| r.unwrap_err().code().as_i32();
    assert_eq!(code(ctx.fopen("/missing").map(drop)), -4);
    assert_eq!(code(ctx.fopen("/src").map(drop)), -1);
    assert_eq!(code(ctx.path_to("").map(drop)), -1);
    assert_eq!(code(Context::load(vec![0u8; 8]).map(drop)), -1);
    assert_eq!(ErrorCode::from_i32(-2), Some(ErrorCode::DataBroken));
}

#[test]
fn test_exist_matches_path_to() {
    let ctx = Context::load(checkout(Endian::Little)).unwrap();
    for path in ["/", "/img", "/include", "/src/rucfs.c", "/src/x", "/y/z", "/README.md/x"] {
        let exists = ctx.exist(path).unwrap();
        assert_eq!(exists, ctx.path_to(path).is_ok(), "{path}");
    }
}

#[test]
fn test_listing() {
    let ctx = Context::load(checkout(Endian::Little)).unwrap();
    let mut seen = Vec::new();
    walk(&ctx, "/", 8, &mut seen);
    let paths: Vec<_> = seen.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "/.gitignore",
            "/README.md",
            "/src",
            "/src/rucfs.c",
            "/src/include",
            "/src/include/rucfs.h",
            "/img",
            "/include",
            "/current",
        ]
    );
    assert_eq!(ctx.count_entries("/").unwrap(), 6);
}

#[test]
fn test_owned_file_after_context_dropped() {
    let ctx = Context::load(checkout(Endian::Big)).unwrap();
    let owned = ctx.fopen_owned("/README.md").unwrap();
    drop(ctx);
    assert_eq!(owned.data(), b"# rucfs\n");
}

#[test]
fn test_context_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Context>();

    let ctx = Arc::new(Context::load(checkout(Endian::Little)).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            std::thread::spawn(move || ctx.fopen("/src/rucfs.c").unwrap().len())
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), 19);
    }
}

// ============================================================================
// Path normalization
// ============================================================================

#[test]
fn test_normalize_reference_vectors() {
    let src = b"//fff//dd////d39.bb/";
    let mut dst = [0u8; 21];
    let n = normalize_path(&mut dst, src, false).unwrap();
    assert_eq!(n, 14);
    assert_eq!(&dst[..n], b"/fff/dd/d39.bb");
    let n = normalize_path(&mut dst, src, true).unwrap();
    assert_eq!(n, 16);
    assert_eq!(&dst[..n], b"/fff/dd/d39.bb//");
}

#[test]
fn test_normalized_paths_resolve_identically() {
    let ctx = Context::load(checkout(Endian::Little)).unwrap();
    let raw = "//src///include//rucfs.h";
    let clean = normalized(raw.as_bytes(), false);
    assert_eq!(ctx.path_to(raw).unwrap(), ctx.path_to(&clean).unwrap());
}

// ============================================================================
// Corruption
// ============================================================================

#[test]
fn test_truncated_images_never_panic() {
    let image = checkout(Endian::Little);
    for len in 0..image.len() {
        let Ok(ctx) = Context::load(image[..len].to_vec()) else {
            continue;
        };
        let mut seen = Vec::new();
        walk(&ctx, "/", 8, &mut seen);
    }
}

#[test]
fn test_flipped_bytes_never_panic() {
    let image = checkout(Endian::Big);
    for at in 0..image.len() {
        for value in [0x00, 0x01, 0x7f, 0xff] {
            let mut img = image.clone();
            img[at] = value;
            let Ok(ctx) = Context::load(img) else {
                continue;
            };
            let mut seen = Vec::new();
            walk(&ctx, "/", 8, &mut seen);
            let _ = ctx.exist("/current/rucfs.h");
        }
    }
}

#[test]
fn test_unterminated_string_table() {
    let mut image = checkout(Endian::Little);
    let last = image.len() - 1;
    assert_eq!(image[last], 0);
    image[last] = b'x';
    let ctx = Context::load(image).unwrap();
    let mut failed = false;
    for entry in ctx.children(ctx.root()).unwrap() {
        failed |= matches!(entry, Err(RucfsError::DataBroken(_)));
    }
    assert!(failed);
}
