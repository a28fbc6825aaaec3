//! # Session
//!
//! The dependency-injection root of the client engine. Builds every store
//! once over a single [`KeyValueStore`], loads them, and hands them out by
//! `Arc` handle.
//!
//! | Handle | Storage key | Remote |
//! |--------|-------------|--------|
//! | `cart` | `cart` | none |
//! | `wishlist` | `wishlist` | [`RemoteCollection`] when wired |
//! | `wardrobe` | `wardrobe` | none |
//! | `searches` | `recentSearches` | none |
//! | `read_state` | `notificationReadState` | none |
//! | `snapshots` | `snapshot:<key>` | none |
//!
//! Each collection has its own notification latch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::auth::AuthState;
use crate::cache::SnapshotCache;
use crate::collection::{CollectionKind, CollectionStore};
use crate::history::{ReadState, RecentSearches};
use crate::notify::{NotificationDispatcher, Toaster};
use crate::storage::KeyValueStore;
use crate::sync::{Reconciliation, RemoteCollection, SyncedCollection};

/// Every client-side store of one user session.
#[derive(Debug)]
pub struct Session {
    pub cart: Arc<CollectionStore>,
    pub wishlist: Arc<SyncedCollection>,
    pub wardrobe: Arc<CollectionStore>,
    pub searches: Arc<RecentSearches>,
    pub read_state: Arc<ReadState>,
    pub snapshots: Arc<SnapshotCache>,
}

impl Session {
    /// Build and load every store.
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        toaster: Arc<dyn Toaster>,
        remote: Option<Arc<dyn RemoteCollection>>,
        toast_reset: Duration,
    ) -> Self {
        let collection = |kind: CollectionKind| {
            let notifier = Arc::new(NotificationDispatcher::new(toaster.clone(), toast_reset));
            let store = CollectionStore::new(kind, storage.clone()).with_notifier(notifier);
            store.load();
            Arc::new(store)
        };
        let cart = collection(CollectionKind::Cart);
        let wishlist = Arc::new(SyncedCollection::new(collection(CollectionKind::Wishlist), remote));
        let wardrobe = collection(CollectionKind::Wardrobe);

        tracing::info!(
            cart = cart.len(),
            wishlist = wishlist.store().len(),
            wardrobe = wardrobe.len(),
            "session loaded"
        );
        Self {
            cart,
            wishlist,
            wardrobe,
            searches: Arc::new(RecentSearches::load(storage.clone())),
            read_state: Arc::new(ReadState::load(storage.clone())),
            snapshots: Arc::new(SnapshotCache::new(storage)),
        }
    }

    /// The local store of a collection kind.
    pub fn collection(&self, kind: CollectionKind) -> &Arc<CollectionStore> {
        match kind {
            CollectionKind::Cart => &self.cart,
            CollectionKind::Wishlist => self.wishlist.store(),
            CollectionKind::Wardrobe => &self.wardrobe,
        }
    }

    /// Apply one auth state. Ignored while the auth flow is still loading.
    pub async fn sync_auth(&self, state: AuthState) -> Reconciliation {
        if state.loading {
            return Reconciliation::Unchanged;
        }
        self.wishlist.on_auth_change(state.user).await
    }

    /// Follow the auth signal until its publisher is dropped.
    pub fn watch_auth(self: &Arc<Self>, mut rx: watch::Receiver<AuthState>) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let state = rx.borrow_and_update().clone();
                let outcome = session.sync_auth(state).await;
                tracing::debug!(?outcome, "auth state applied");
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
