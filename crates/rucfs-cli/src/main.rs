//! rucfs command line tool.
//!
//! Usage:
//!   rucfs info image.rucfs
//!   rucfs ls image.rucfs /src --json
//!   rucfs cat image.rucfs /src/main.c
//!   rucfs pack ./tree -o image.rucfs --big-endian
//!
//! Logging goes to stderr. `RUST_LOG` overrides the default filter.

mod commands;
mod config;
mod pack;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use rucfs::{BuilderConfig, Context, Endian, ReaderConfig};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(name = "rucfs")]
#[command(about = "Inspect and pack rucfs filesystem images")]
struct Args {
    /// Reader config (TOML). Defaults to $XDG_CONFIG_HOME/rucfs/config.toml
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show superblock fields
    Info { image: PathBuf },

    /// List the direct children of a directory
    Ls {
        image: PathBuf,
        #[arg(default_value = "/")]
        path: String,
        /// Print a JSON array instead of text
        #[arg(long)]
        json: bool,
    },

    /// List a directory recursively (symlinks are not followed)
    Tree {
        image: PathBuf,
        #[arg(default_value = "/")]
        path: String,
    },

    /// Write a file's content to stdout
    Cat {
        image: PathBuf,
        path: String,
        /// Follow a symlink in the final segment
        #[arg(short = 'L', long)]
        follow: bool,
    },

    /// Show the inode a path resolves to
    Stat { image: PathBuf, path: String },

    /// Test whether a path exists
    ///
    /// Exit status: 0 if it exists, 1 if it does not, 2 if the image could
    /// not be read or the lookup failed.
    Exists { image: PathBuf, path: String },

    /// Collapse redundant separators in a path
    Normalize {
        path: String,
        /// Keep a trailing separator run
        #[arg(long)]
        endslash: bool,
    },

    /// Pack a host directory into a new image
    Pack {
        dir: PathBuf,
        #[arg(short, long, value_name = "IMAGE")]
        output: PathBuf,
        #[arg(long)]
        big_endian: bool,
        /// Superblock modification time, seconds since the epoch
        #[arg(long, value_name = "SECS")]
        mtime: Option<u32>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open(image: &Path, config: ReaderConfig) -> Result<Context> {
    let bytes =
        std::fs::read(image).with_context(|| format!("reading {}", image.display()))?;
    Context::load_with(bytes, config).with_context(|| format!("loading {}", image.display()))
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Info { image } => {
            let ctx = open(&image, config::load(args.config.as_deref())?)?;
            commands::info(&ctx, &mut out)?;
        }
        Command::Ls { image, path, json } => {
            let ctx = open(&image, config::load(args.config.as_deref())?)?;
            commands::ls(&ctx, &path, json, &mut out)?;
        }
        Command::Tree { image, path } => {
            let ctx = open(&image, config::load(args.config.as_deref())?)?;
            commands::tree(&ctx, &path, &mut out)?;
        }
        Command::Cat {
            image,
            path,
            follow,
        } => {
            let ctx = open(&image, config::load(args.config.as_deref())?)?;
            commands::cat(&ctx, &path, follow, &mut out)?;
        }
        Command::Stat { image, path } => {
            let ctx = open(&image, config::load(args.config.as_deref())?)?;
            commands::stat(&ctx, &path, &mut out)?;
        }
        Command::Exists { image, path } => {
            let loaded = config::load(args.config.as_deref()).and_then(|c| open(&image, c));
            let status = match loaded {
                Ok(ctx) => commands::exists(&ctx, &path),
                Err(e) => {
                    eprintln!("Error: {e:?}");
                    commands::EXISTS_FAILED
                }
            };
            return Ok(ExitCode::from(status));
        }
        Command::Normalize { path, endslash } => {
            commands::normalize(&path, endslash, &mut out)?;
        }
        Command::Pack {
            dir,
            output,
            big_endian,
            mtime,
        } => {
            let endian = if big_endian { Endian::Big } else { Endian::Little };
            let config = BuilderConfig::default()
                .with_endian(endian)
                .with_modded_time(mtime.unwrap_or_else(pack::now_secs));
            let image = pack::pack_dir(&dir, config)?;
            std::fs::write(&output, &image)
                .with_context(|| format!("writing {}", output.display()))?;
            tracing::info!(output = %output.display(), bytes = image.len(), "packed");
        }
    }

    out.flush()?;
    Ok(ExitCode::SUCCESS)
}
