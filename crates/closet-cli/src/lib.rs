//! # closet-cli — Command-Line Front-End for the Closet Engine
//!
//! Provides the `closet` binary over a directory-backed session.
//!
//! ## Subcommands
//!
//! - `closet cart|wishlist|wardrobe` — add, remove, adjust, list, and clear
//!   collection entries.
//! - `closet search` — recent search history.
//! - `closet listing` — page through the catalog listing with an optional
//!   shop filter.
//!
//! ```bash
//! closet cart add '{"_id":"p1","name":"Linen Shirt","price":799}' --size L
//! closet cart qty p1 -1 --size L
//! closet listing --pages 3 --shop under-999
//! ```
//!
//! The wishlist is local-only here: the CLI has no sign-in flow, so no
//! remote is wired into its session.

pub mod collection;
pub mod listing;
pub mod search;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use closet_store::{FileStorage, LogToaster, Session};

/// Data directory used when neither `--data-dir` nor `CLOSET_DATA_DIR` is set.
pub const DEFAULT_DATA_DIR: &str = ".closet";

/// Resolve the data directory: explicit flag, then `CLOSET_DATA_DIR`, then
/// [`DEFAULT_DATA_DIR`] under the current directory.
pub fn resolve_data_dir(flag: Option<&Path>) -> PathBuf {
    if let Some(dir) = flag {
        return dir.to_path_buf();
    }
    std::env::var_os("CLOSET_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Open a file-backed session rooted at `data_dir`.
pub fn open_session(data_dir: &Path, toast_reset: Duration) -> Result<Session> {
    let storage = FileStorage::open(data_dir)
        .with_context(|| format!("cannot open data directory {}", data_dir.display()))?;
    tracing::debug!(data_dir = %data_dir.display(), "opening session");
    Ok(Session::new(
        Arc::new(storage),
        Arc::new(LogToaster::default()),
        None,
        toast_reset,
    ))
}
