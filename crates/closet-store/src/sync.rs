//! # Remote Reconciliation
//!
//! Wraps a [`CollectionStore`] whose authoritative copy lives on a remote
//! (the wishlist) and reconciles the two around sign-in and sign-out.
//!
//! ## Rules
//!
//! - **Sign-in**: fetch the remote collection and replace local state with
//!   it. Entries added while signed out are discarded. A fetch that resolves
//!   after the signed-in identity has changed again is dropped.
//! - **Signed-in mutation**: apply locally and commit first, then issue one
//!   best-effort remote call. A failed call is logged; the local state is
//!   neither rolled back nor retried.
//! - **Signed-out mutation**: local persistence only.
//! - **Sign-out**: the local collection is cleared and committed.
//!
//! ## Staleness
//!
//! Every identity transition bumps an auth epoch. Asynchronous resolutions
//! compare the epoch they started under with the current one and discard
//! themselves on mismatch. No lock is held across the remote call.
//!
//! Mutations issued while the sign-in fetch is in flight have already been
//! sent to the remote, so the fetched list may predate them. Their ids are
//! recorded, and on resolution the local entries for those ids are kept in
//! place of whatever the fetch returned for them.

use std::sync::Arc;

use async_trait::async_trait;
use closet_core::{resolve_identity, ClosetError, EntryKey, ItemId, ItemRef, UserId, Variant};
use parking_lot::Mutex;

use crate::collection::{AddOptions, CollectionEntry, CollectionStore, Mutation};

/// The remote half of a synchronized collection. Membership is by item id;
/// variants and quantities are local concerns.
#[async_trait]
pub trait RemoteCollection: Send + Sync {
    async fn fetch(&self) -> Result<Vec<ItemRef>, ClosetError>;
    async fn add(&self, id: &ItemId) -> Result<(), ClosetError>;
    async fn remove(&self, id: &ItemId) -> Result<(), ClosetError>;
}

#[async_trait]
impl RemoteCollection for closet_client::WishlistClient {
    async fn fetch(&self) -> Result<Vec<ItemRef>, ClosetError> {
        Ok(closet_client::WishlistClient::fetch(self).await?)
    }

    async fn add(&self, id: &ItemId) -> Result<(), ClosetError> {
        Ok(closet_client::WishlistClient::add(self, id).await?)
    }

    async fn remove(&self, id: &ItemId) -> Result<(), ClosetError> {
        Ok(closet_client::WishlistClient::remove(self, id).await?)
    }
}

/// Per-mutation remote outcome. Logged, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteSyncState {
    /// Local only: signed out, no remote wired, or no remote call needed.
    AppliedLocally,
    RemoteConfirmed,
    RemoteFailed,
}

/// Result of a mutation on a [`SyncedCollection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub key: EntryKey,
    pub mutation: Mutation,
    pub remote: RemoteSyncState,
}

/// What an auth transition did to the local collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Identity unchanged; nothing to do.
    Unchanged,
    /// Signed in and the local collection now mirrors the remote.
    Replaced { entries: usize },
    /// Signed in but no remote is wired; local state kept.
    LocalOnly,
    /// Signed out; local collection cleared.
    Cleared,
    /// The remote fetch failed; local state kept.
    FetchFailed,
    /// The auth identity changed while the fetch was in flight.
    Superseded,
}

#[derive(Debug, Default)]
struct AuthEpoch {
    user: Option<UserId>,
    epoch: u64,
    /// Ids mutated while the sign-in fetch of this epoch is in flight.
    touched: Option<Vec<ItemId>>,
}

/// A collection store reconciled against an authenticated remote.
pub struct SyncedCollection {
    store: Arc<CollectionStore>,
    remote: Option<Arc<dyn RemoteCollection>>,
    auth: Mutex<AuthEpoch>,
}

impl std::fmt::Debug for SyncedCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncedCollection")
            .field("store", &self.store)
            .field("remote", &self.remote.is_some())
            .field("auth", &*self.auth.lock())
            .finish()
    }
}

impl SyncedCollection {
    /// Wrap `store`. With `remote: None` the collection behaves as local-only.
    pub fn new(store: Arc<CollectionStore>, remote: Option<Arc<dyn RemoteCollection>>) -> Self {
        Self {
            store,
            remote,
            auth: Mutex::new(AuthEpoch::default()),
        }
    }

    /// The underlying local store. Mutating it directly bypasses the remote.
    pub fn store(&self) -> &Arc<CollectionStore> {
        &self.store
    }

    pub fn is_signed_in(&self) -> bool {
        self.auth.lock().user.is_some()
    }

    /// React to the auth collaborator's current user.
    pub async fn on_auth_change(&self, user: Option<UserId>) -> Reconciliation {
        let epoch = {
            let mut auth = self.auth.lock();
            if auth.user == user {
                return Reconciliation::Unchanged;
            }
            auth.user = user.clone();
            auth.epoch += 1;
            auth.touched = (user.is_some() && self.remote.is_some()).then(Vec::new);
            auth.epoch
        };

        let Some(user) = user else {
            self.store.clear();
            tracing::info!(kind = %self.store.kind(), "signed out; local collection cleared");
            return Reconciliation::Cleared;
        };
        let Some(remote) = &self.remote else {
            return Reconciliation::LocalOnly;
        };

        let fetched = remote.fetch().await;
        let touched = {
            let mut auth = self.auth.lock();
            if auth.epoch != epoch {
                tracing::debug!(kind = %self.store.kind(), %user, "discarding remote fetch from a superseded sign-in");
                return Reconciliation::Superseded;
            }
            auth.touched.take().unwrap_or_default()
        };
        match fetched {
            Ok(items) => {
                let mut entries = entries_from_remote(&items);
                if !touched.is_empty() {
                    entries.retain(|entry| !touched.contains(&entry.identity));
                    entries.extend(
                        self.store
                            .entries()
                            .into_iter()
                            .filter(|entry| touched.contains(&entry.identity)),
                    );
                    tracing::debug!(kind = %self.store.kind(), touched = touched.len(), "kept entries mutated during fetch");
                }
                let count = entries.len();
                self.store.replace_all(entries);
                tracing::info!(kind = %self.store.kind(), %user, count, "local collection replaced by remote");
                Reconciliation::Replaced { entries: count }
            }
            Err(e) => {
                tracing::warn!(kind = %self.store.kind(), %user, error = %e, "remote fetch failed; keeping local state");
                Reconciliation::FetchFailed
            }
        }
    }

    /// Optimistic add. Returns `None` when the item has no identity.
    pub async fn add(&self, item: &ItemRef, options: &AddOptions) -> Option<SyncOutcome> {
        let (key, mutation) = match self.store.try_add(item, options) {
            Ok(added) => added,
            Err(e) => {
                tracing::warn!(kind = %self.store.kind(), error = %e, "add aborted");
                return None;
            }
        };
        self.note_touched(&key.0);
        let remote = match self.signed_in_remote() {
            Some(remote) => {
                let result = remote.add(&key.0).await;
                self.settle("add", &key.0, result)
            }
            None => RemoteSyncState::AppliedLocally,
        };
        Some(SyncOutcome {
            key,
            mutation,
            remote,
        })
    }

    /// Optimistic remove. Returns `None` when the entry was absent.
    ///
    /// The remote tracks membership by id only, so the remote removal is
    /// skipped while another variant of the same id remains locally.
    pub async fn remove(&self, identity: &ItemId, variant: &Variant) -> Option<SyncOutcome> {
        let mutation = self.store.remove(identity, variant);
        if mutation == Mutation::Unchanged {
            return None;
        }
        self.note_touched(identity);
        let remote = self.sync_removal(identity).await;
        Some(SyncOutcome {
            key: (identity.clone(), variant.clone()),
            mutation,
            remote,
        })
    }

    /// Adjust a quantity. Dropping to zero counts as a removal.
    pub async fn update_quantity(
        &self,
        identity: &ItemId,
        variant: &Variant,
        delta: i64,
    ) -> Option<SyncOutcome> {
        let mutation = self.store.update_quantity(identity, variant, delta);
        if mutation != Mutation::Unchanged {
            self.note_touched(identity);
        }
        let remote = match mutation {
            Mutation::Unchanged => return None,
            Mutation::Removed => self.sync_removal(identity).await,
            _ => RemoteSyncState::AppliedLocally,
        };
        Some(SyncOutcome {
            key: (identity.clone(), variant.clone()),
            mutation,
            remote,
        })
    }

    /// Empty the local collection only.
    pub fn clear(&self) -> Mutation {
        self.store.clear()
    }

    /// Empty the local collection, then issue one remote removal per
    /// distinct id it held. Best-effort: every call is attempted.
    pub async fn clear_remote(&self) -> RemoteSyncState {
        let mut ids: Vec<ItemId> = Vec::new();
        for entry in self.store.entries() {
            if !ids.contains(&entry.identity) {
                ids.push(entry.identity);
            }
        }
        self.store.clear();
        for id in &ids {
            self.note_touched(id);
        }

        let Some(remote) = self.signed_in_remote() else {
            return RemoteSyncState::AppliedLocally;
        };
        let mut state = RemoteSyncState::RemoteConfirmed;
        for id in &ids {
            if self.settle("remove", id, remote.remove(id).await) == RemoteSyncState::RemoteFailed {
                state = RemoteSyncState::RemoteFailed;
            }
        }
        tracing::info!(kind = %self.store.kind(), count = ids.len(), ?state, "remote collection cleared");
        state
    }

    async fn sync_removal(&self, identity: &ItemId) -> RemoteSyncState {
        if self.store.contains(identity) {
            return RemoteSyncState::AppliedLocally;
        }
        match self.signed_in_remote() {
            Some(remote) => {
                let result = remote.remove(identity).await;
                self.settle("remove", identity, result)
            }
            None => RemoteSyncState::AppliedLocally,
        }
    }

    fn note_touched(&self, id: &ItemId) {
        if let Some(touched) = self.auth.lock().touched.as_mut() {
            if !touched.contains(id) {
                touched.push(id.clone());
            }
        }
    }

    fn signed_in_remote(&self) -> Option<Arc<dyn RemoteCollection>> {
        if self.is_signed_in() {
            self.remote.clone()
        } else {
            None
        }
    }

    /// Log the remote result and run the post-resolution notification pass.
    fn settle(&self, op: &str, id: &ItemId, result: Result<(), ClosetError>) -> RemoteSyncState {
        let state = match result {
            Ok(()) => {
                tracing::debug!(kind = %self.store.kind(), op, identity = %id, "remote confirmed");
                RemoteSyncState::RemoteConfirmed
            }
            Err(e) => {
                tracing::warn!(kind = %self.store.kind(), op, identity = %id, error = %e, "remote sync failed");
                RemoteSyncState::RemoteFailed
            }
        };
        self.store.observe_notifications();
        state
    }
}

/// One entry per remote item, default variant, quantity 1. Items without an
/// identity are skipped.
fn entries_from_remote(items: &[ItemRef]) -> Vec<CollectionEntry> {
    items
        .iter()
        .filter_map(|item| {
            let Some(identity) = resolve_identity(item) else {
                tracing::warn!(?item, "remote item has no identity; skipped");
                return None;
            };
            let payload = item.to_record();
            Some(CollectionEntry {
                identity,
                variant: Variant::for_item(&payload, None, None),
                quantity: 1,
                payload_snapshot: payload,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::CollectionKind;
    use crate::storage::MemoryStorage;
    use closet_core::CatalogItem;
    use tokio::sync::oneshot;

    #[derive(Default)]
    struct FakeRemote {
        items: Vec<ItemRef>,
        fail: bool,
        calls: Mutex<Vec<String>>,
        fetch_gate: Mutex<Option<oneshot::Receiver<()>>>,
    }

    impl FakeRemote {
        fn gate_fetch(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            *self.fetch_gate.lock() = Some(rx);
            tx
        }
    }

    #[async_trait]
    impl RemoteCollection for FakeRemote {
        async fn fetch(&self) -> Result<Vec<ItemRef>, ClosetError> {
            self.calls.lock().push("fetch".into());
            let gate = self.fetch_gate.lock().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            if self.fail {
                return Err(ClosetError::RemoteSync("down".into()));
            }
            Ok(self.items.clone())
        }

        async fn add(&self, id: &ItemId) -> Result<(), ClosetError> {
            self.calls.lock().push(format!("add {id}"));
            if self.fail {
                return Err(ClosetError::RemoteSync("down".into()));
            }
            Ok(())
        }

        async fn remove(&self, id: &ItemId) -> Result<(), ClosetError> {
            self.calls.lock().push(format!("remove {id}"));
            if self.fail {
                return Err(ClosetError::RemoteSync("down".into()));
            }
            Ok(())
        }
    }

    fn synced(remote: Arc<FakeRemote>) -> SyncedCollection {
        let store = CollectionStore::new(CollectionKind::Wishlist, Arc::new(MemoryStorage::new()));
        store.load();
        SyncedCollection::new(Arc::new(store), Some(remote))
    }

    fn user() -> Option<UserId> {
        Some(UserId("u1".into()))
    }

    fn id(raw: &str) -> ItemId {
        ItemId::new(raw).unwrap()
    }

    #[tokio::test]
    async fn signed_out_mutations_stay_local() {
        let remote = Arc::new(FakeRemote::default());
        let synced = synced(remote.clone());
        let outcome = synced
            .add(&ItemRef::Id("p1".into()), &AddOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.remote, RemoteSyncState::AppliedLocally);
        assert!(remote.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn sign_in_replaces_local_with_remote() {
        let remote = Arc::new(FakeRemote {
            items: vec![
                ItemRef::Id("r1".into()),
                ItemRef::from(CatalogItem {
                    name: Some("Named".into()),
                    ..CatalogItem::default()
                }),
            ],
            ..FakeRemote::default()
        });
        let synced = synced(remote);
        synced.add(&ItemRef::Id("local".into()), &AddOptions::default()).await;

        assert_eq!(synced.on_auth_change(user()).await, Reconciliation::Replaced { entries: 1 });
        let ids: Vec<_> = synced.store().entries().into_iter().map(|e| e.identity).collect();
        assert_eq!(ids, vec![id("r1")]);
        assert_eq!(synced.on_auth_change(user()).await, Reconciliation::Unchanged);
    }

    #[tokio::test]
    async fn remote_failure_keeps_optimistic_state() {
        let remote = Arc::new(FakeRemote {
            fail: true,
            ..FakeRemote::default()
        });
        let synced = synced(remote.clone());
        assert_eq!(synced.on_auth_change(user()).await, Reconciliation::FetchFailed);

        let outcome = synced
            .add(&ItemRef::Id("p1".into()), &AddOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.remote, RemoteSyncState::RemoteFailed);
        assert!(synced.store().contains(&id("p1")));
        assert_eq!(*remote.calls.lock(), vec!["fetch", "add p1"]);
    }

    #[tokio::test]
    async fn remote_remove_waits_for_last_variant() {
        let remote = Arc::new(FakeRemote::default());
        let synced = synced(remote.clone());
        synced.on_auth_change(user()).await;
        synced.add(&ItemRef::Id("p1".into()), &AddOptions::variant("S", "Red")).await;
        synced.add(&ItemRef::Id("p1".into()), &AddOptions::variant("L", "Red")).await;

        let first = synced.remove(&id("p1"), &Variant::new("S", "Red")).await.unwrap();
        assert_eq!(first.remote, RemoteSyncState::AppliedLocally);
        let last = synced.update_quantity(&id("p1"), &Variant::new("L", "Red"), -1).await.unwrap();
        assert_eq!(last.mutation, Mutation::Removed);
        assert_eq!(last.remote, RemoteSyncState::RemoteConfirmed);
        assert_eq!(
            *remote.calls.lock(),
            vec!["fetch", "add p1", "add p1", "remove p1"]
        );
        assert!(synced.remove(&id("p1"), &Variant::new("L", "Red")).await.is_none());
    }

    #[tokio::test]
    async fn sign_out_clears_local() {
        let remote = Arc::new(FakeRemote::default());
        let synced = synced(remote.clone());
        synced.on_auth_change(user()).await;
        synced.add(&ItemRef::Id("p1".into()), &AddOptions::default()).await;
        assert_eq!(synced.on_auth_change(None).await, Reconciliation::Cleared);
        assert!(synced.store().is_empty());
        assert!(!synced.is_signed_in());
    }

    #[tokio::test]
    async fn clear_remote_removes_each_distinct_id() {
        let remote = Arc::new(FakeRemote::default());
        let synced = synced(remote.clone());
        synced.on_auth_change(user()).await;
        for (raw, size) in [("a", "S"), ("a", "M"), ("b", "M")] {
            synced.add(&ItemRef::Id(raw.into()), &AddOptions::variant(size, "Black")).await;
        }
        assert_eq!(synced.clear_remote().await, RemoteSyncState::RemoteConfirmed);
        assert!(synced.store().is_empty());
        let calls = remote.calls.lock().clone();
        assert_eq!(&calls[calls.len() - 2..], &["remove a", "remove b"]);
    }

    #[tokio::test]
    async fn mutations_during_sign_in_fetch_survive_replacement() {
        let remote = Arc::new(FakeRemote {
            items: vec![ItemRef::Id("r1".into()), ItemRef::Id("r2".into())],
            ..FakeRemote::default()
        });
        let synced = synced(remote.clone());
        synced.add(&ItemRef::Id("r2".into()), &AddOptions::default()).await;
        let release = remote.gate_fetch();

        let (reconciled, ()) = tokio::join!(synced.on_auth_change(user()), async {
            synced.add(&ItemRef::Id("p9".into()), &AddOptions::default()).await;
            synced.remove(&id("r2"), &Variant::default()).await;
            release.send(()).unwrap();
        });

        assert_eq!(reconciled, Reconciliation::Replaced { entries: 2 });
        let ids: Vec<_> = synced.store().entries().into_iter().map(|e| e.identity).collect();
        assert_eq!(ids, vec![id("r1"), id("p9")]);
        assert_eq!(*remote.calls.lock(), vec!["fetch", "add p9", "remove r2"]);

        // The record is per fetch; a later replacement is remote-authoritative.
        synced.on_auth_change(None).await;
        assert_eq!(synced.on_auth_change(user()).await, Reconciliation::Replaced { entries: 2 });
        let ids: Vec<_> = synced.store().entries().into_iter().map(|e| e.identity).collect();
        assert_eq!(ids, vec![id("r1"), id("r2")]);
    }
}
