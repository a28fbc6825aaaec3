//! # Error Types — Structured Error Hierarchy
//!
//! All errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Propagation
//!
//! - `MissingIdentity` aborts a mutation before any state change. The
//!   collection stores log it and drop it; the typed `try_*` entry points
//!   return it.
//! - `Storage` failures are logged and the store continues on its in-memory
//!   state.
//! - `RemoteSync` failures are logged only. Local optimistic state stands.
//! - `Fetch` failures become the listing controller's error state.
//! - `Cancelled` marks a superseded fetch and is discarded without a trace
//!   above `debug`.

use thiserror::Error;

/// Top-level error type for the Closet stack.
#[derive(Error, Debug)]
pub enum ClosetError {
    /// The item payload carries no resolvable identity.
    #[error("item has no resolvable identity")]
    MissingIdentity,

    /// Durable storage read or write failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A best-effort remote collection call failed.
    #[error("remote sync failed: {0}")]
    RemoteSync(String),

    /// A listing page request failed.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The request was superseded by a newer fetch sequence.
    #[error("fetch cancelled")]
    Cancelled,
}

impl ClosetError {
    /// Whether this error marks a superseded request rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Error from the durable key-value storage.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing the backing medium failed.
    #[error("io error on key {key:?}: {source}")]
    Io {
        key: String,
        source: std::io::Error,
    },

    /// The stored value could not be (de)serialized.
    #[error("serialization error on key {key:?}: {source}")]
    Serialization {
        key: String,
        source: serde_json::Error,
    },

    /// The write would exceed the storage quota.
    #[error("quota exceeded writing {key:?}: {needed} bytes, {available} available")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },
}
