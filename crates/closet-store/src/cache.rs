//! # Snapshot Cache
//!
//! Versioned, TTL-bounded JSON snapshots of pages, sections, and products,
//! stored under `snapshot:<key>` so a view can render the last known data
//! before its fetch resolves.
//!
//! A snapshot written by a different cache version, or older than the TTL,
//! is removed on read and reported as a miss. Snapshots that fail to decode
//! are treated the same way.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use closet_core::StorageError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::storage::{read_json, write_json, KeyValueStore};

/// Bumped whenever the shape of cached payloads changes.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Default snapshot lifetime.
pub const SNAPSHOT_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    version: u32,
    saved_at: DateTime<Utc>,
    data: T,
}

/// Snapshot store over a [`KeyValueStore`].
pub struct SnapshotCache {
    storage: Arc<dyn KeyValueStore>,
    ttl: Duration,
    version: u32,
}

impl std::fmt::Debug for SnapshotCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCache")
            .field("ttl", &self.ttl)
            .field("version", &self.version)
            .finish()
    }
}

impl SnapshotCache {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            ttl: Duration::hours(SNAPSHOT_TTL_HOURS),
            version: SNAPSHOT_VERSION,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    fn storage_key(key: &str) -> String {
        format!("snapshot:{key}")
    }

    pub fn put<T: Serialize>(&self, key: &str, data: &T) -> Result<(), StorageError> {
        self.put_at(key, data, Utc::now())
    }

    pub fn put_at<T: Serialize>(
        &self,
        key: &str,
        data: &T,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let envelope = Envelope {
            version: self.version,
            saved_at: now,
            data,
        };
        write_json(self.storage.as_ref(), &Self::storage_key(key), &envelope)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_at(key, Utc::now())
    }

    /// Read a snapshot as of `now`, dropping it if stale or foreign.
    pub fn get_at<T: DeserializeOwned>(&self, key: &str, now: DateTime<Utc>) -> Option<T> {
        let storage_key = Self::storage_key(key);
        let envelope = match read_json::<Envelope<T>>(self.storage.as_ref(), &storage_key) {
            Ok(envelope) => envelope?,
            Err(e) => {
                tracing::debug!(key, error = %e, "dropping unreadable snapshot");
                self.invalidate(key);
                return None;
            }
        };
        if envelope.version != self.version {
            tracing::debug!(key, found = envelope.version, expected = self.version, "dropping snapshot from another version");
            self.invalidate(key);
            return None;
        }
        if now.signed_duration_since(envelope.saved_at) > self.ttl {
            tracing::debug!(key, saved_at = %envelope.saved_at, "dropping expired snapshot");
            self.invalidate(key);
            return None;
        }
        Some(envelope.data)
    }

    pub fn invalidate(&self, key: &str) {
        if let Err(e) = self.storage.remove(&Self::storage_key(key)) {
            tracing::warn!(key, error = %e, "failed to remove snapshot");
        }
    }
}
