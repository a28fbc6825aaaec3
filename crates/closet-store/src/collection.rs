//! # Persistent Collection Store
//!
//! One store type, instantiated per [`CollectionKind`] (cart, wishlist,
//! wardrobe). A store owns an insertion-ordered list of
//! [`CollectionEntry`] values, each keyed by `(identity, variant)`.
//!
//! ## Invariants
//!
//! - Entry keys are unique within a store.
//! - `quantity > 0` for every stored entry. A mutation that would leave an
//!   entry at zero or below removes it.
//! - No commit is issued before the initial [`CollectionStore::load`] (or
//!   [`CollectionStore::mark_loaded`]); an empty pre-load state must never
//!   clobber durable data.
//! - After load, every completed mutating operation issues exactly one
//!   commit, which overwrites the whole serialized collection under the
//!   kind's storage key. Last write wins.
//!
//! ## Failure Handling
//!
//! An item without a resolvable identity aborts the mutation before any
//! state change (`MissingIdentity`, logged). Storage failures are logged and
//! the store carries on from its in-memory state.

use std::sync::Arc;

use closet_core::{
    resolve_identity, CatalogItem, ClosetError, EntryKey, ItemId, ItemRef, StorageError, Variant,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::notify::{ActionKind, NotificationDispatcher, PendingAction};
use crate::storage::{read_json, write_json, KeyValueStore};

/// The three collection instantiations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Cart,
    Wishlist,
    Wardrobe,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 3] = [Self::Cart, Self::Wishlist, Self::Wardrobe];

    /// Durable storage key of this collection.
    pub fn storage_key(&self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Wishlist => "wishlist",
            Self::Wardrobe => "wardrobe",
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.storage_key())
    }
}

impl std::str::FromStr for CollectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.storage_key().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown collection {s:?}; expected cart, wishlist, or wardrobe"))
    }
}

/// One line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEntry {
    pub identity: ItemId,
    pub variant: Variant,
    pub quantity: u32,
    /// The item payload as it was when first added.
    #[serde(rename = "payload")]
    pub payload_snapshot: CatalogItem,
}

impl CollectionEntry {
    pub fn key(&self) -> EntryKey {
        (self.identity.clone(), self.variant.clone())
    }

    fn matches(&self, identity: &ItemId, variant: &Variant) -> bool {
        &self.identity == identity && &self.variant == variant
    }

    /// Price × quantity; an unpriced snapshot counts as zero.
    pub fn line_value(&self) -> f64 {
        self.payload_snapshot.effective_price().unwrap_or(0.0) * f64::from(self.quantity)
    }
}

/// Caller choices for [`CollectionStore::add`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOptions {
    pub size: Option<String>,
    pub color: Option<String>,
    /// Defaults to 1. Zero is treated as 1.
    pub quantity: Option<u32>,
}

impl AddOptions {
    pub fn variant(size: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            size: Some(size.into()),
            color: Some(color.into()),
            quantity: None,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }
}

/// What a mutating operation did to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// A new entry was appended.
    Added,
    /// An existing entry's quantity grew.
    Incremented,
    /// An existing entry's quantity changed and stayed positive.
    QuantityChanged,
    /// An entry was removed.
    Removed,
    /// Every entry was removed.
    Cleared,
    /// The whole collection was replaced.
    Replaced,
    /// Nothing matched; state is unchanged.
    Unchanged,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<CollectionEntry>,
    loaded: bool,
}

/// A persisted, ordered collection of entries.
pub struct CollectionStore {
    kind: CollectionKind,
    storage: Arc<dyn KeyValueStore>,
    notifier: Option<Arc<NotificationDispatcher>>,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for CollectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CollectionStore")
            .field("kind", &self.kind)
            .field("loaded", &inner.loaded)
            .field("entries", &inner.entries.len())
            .finish()
    }
}

impl CollectionStore {
    /// Create an unloaded, empty store.
    pub fn new(kind: CollectionKind, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kind,
            storage,
            notifier: None,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Attach the notification dispatcher that announces adds and removes.
    pub fn with_notifier(mut self, notifier: Arc<NotificationDispatcher>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.lock().loaded
    }

    /// Read the collection from durable storage and enable commits.
    ///
    /// Replaces whatever is in memory. An unreadable value is logged and the
    /// store starts empty; the next commit overwrites it. Stored entries that
    /// violate the invariants (zero quantity, duplicate keys) are normalized.
    /// Returns the number of entries loaded.
    pub fn load(&self) -> usize {
        let key = self.kind.storage_key();
        let stored = match read_json::<Vec<CollectionEntry>>(self.storage.as_ref(), key) {
            Ok(stored) => stored.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(kind = %self.kind, error = %e, "failed to read collection; starting empty");
                Vec::new()
            }
        };
        let entries = normalize(stored);
        let count = entries.len();

        let mut inner = self.inner.lock();
        inner.entries = entries;
        inner.loaded = true;
        tracing::debug!(kind = %self.kind, count, "collection loaded");
        count
    }

    /// Enable commits without reading storage.
    pub fn mark_loaded(&self) {
        self.inner.lock().loaded = true;
    }

    /// Add an item, merging into an existing `(identity, variant)` entry.
    ///
    /// Returns the entry key, or `None` when the item has no identity (the
    /// mutation is aborted and logged).
    pub fn add(&self, item: &ItemRef, options: &AddOptions) -> Option<EntryKey> {
        match self.try_add(item, options) {
            Ok((key, _)) => Some(key),
            Err(e) => {
                tracing::warn!(kind = %self.kind, error = %e, "add aborted");
                None
            }
        }
    }

    /// Typed form of [`add`](Self::add).
    pub fn try_add(
        &self,
        item: &ItemRef,
        options: &AddOptions,
    ) -> Result<(EntryKey, Mutation), ClosetError> {
        let identity = resolve_identity(item).ok_or(ClosetError::MissingIdentity)?;
        let payload = item.to_record();
        let variant = Variant::for_item(&payload, options.size.as_deref(), options.color.as_deref());
        let quantity = options.quantity.unwrap_or(1).max(1);

        self.announce(ActionKind::Add, &payload);
        let mutation = {
            let mut inner = self.inner.lock();
            let mutation = match inner.entries.iter_mut().find(|e| e.matches(&identity, &variant)) {
                Some(entry) => {
                    entry.quantity = entry.quantity.saturating_add(quantity);
                    Mutation::Incremented
                }
                None => {
                    inner.entries.push(CollectionEntry {
                        identity: identity.clone(),
                        variant: variant.clone(),
                        quantity,
                        payload_snapshot: payload,
                    });
                    Mutation::Added
                }
            };
            self.commit(&inner);
            mutation
        };
        tracing::debug!(kind = %self.kind, %identity, %variant, ?mutation, "item added");
        self.observe_notifications();
        Ok(((identity, variant), mutation))
    }

    /// Remove the exact `(identity, variant)` entry. No-op if absent.
    pub fn remove(&self, identity: &ItemId, variant: &Variant) -> Mutation {
        let removed = {
            let mut inner = self.inner.lock();
            let position = inner.entries.iter().position(|e| e.matches(identity, variant));
            let removed = position.map(|i| inner.entries.remove(i));
            if removed.is_some() {
                self.commit(&inner);
            }
            removed
        };
        match removed {
            Some(entry) => {
                tracing::debug!(kind = %self.kind, %identity, %variant, "item removed");
                self.announce(ActionKind::Remove, &entry.payload_snapshot);
                self.observe_notifications();
                Mutation::Removed
            }
            None => Mutation::Unchanged,
        }
    }

    /// Change an entry's quantity by `delta`. A result ≤ 0 removes the entry
    /// and announces the removal like [`remove`](Self::remove).
    pub fn update_quantity(&self, identity: &ItemId, variant: &Variant, delta: i64) -> Mutation {
        let (mutation, removed) = {
            let mut inner = self.inner.lock();
            let Some(position) = inner.entries.iter().position(|e| e.matches(identity, variant)) else {
                return Mutation::Unchanged;
            };
            let next = i64::from(inner.entries[position].quantity).saturating_add(delta);
            let outcome = if next <= 0 {
                (Mutation::Removed, Some(inner.entries.remove(position)))
            } else {
                inner.entries[position].quantity = u32::try_from(next).unwrap_or(u32::MAX);
                (Mutation::QuantityChanged, None)
            };
            self.commit(&inner);
            outcome
        };
        tracing::debug!(kind = %self.kind, %identity, %variant, delta, ?mutation, "quantity updated");
        if let Some(entry) = removed {
            self.announce(ActionKind::Remove, &entry.payload_snapshot);
            self.observe_notifications();
        }
        mutation
    }

    /// Empty the collection. Never touches a remote.
    pub fn clear(&self) -> Mutation {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        self.commit(&inner);
        tracing::debug!(kind = %self.kind, "collection cleared");
        Mutation::Cleared
    }

    /// Replace every entry (remote-authoritative reconciliation).
    pub fn replace_all(&self, entries: Vec<CollectionEntry>) -> Mutation {
        let entries = normalize(entries);
        let mut inner = self.inner.lock();
        inner.entries = entries;
        self.commit(&inner);
        tracing::debug!(kind = %self.kind, count = inner.entries.len(), "collection replaced");
        Mutation::Replaced
    }

    /// Sum of quantities.
    pub fn total_count(&self) -> u64 {
        self.inner.lock().entries.iter().map(|e| u64::from(e.quantity)).sum()
    }

    /// Sum of price × quantity.
    pub fn total_value(&self) -> f64 {
        self.inner.lock().entries.iter().map(CollectionEntry::line_value).sum()
    }

    /// Snapshot of the entries, in insertion order.
    pub fn entries(&self) -> Vec<CollectionEntry> {
        self.inner.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn get(&self, identity: &ItemId, variant: &Variant) -> Option<CollectionEntry> {
        self.inner
            .lock()
            .entries
            .iter()
            .find(|e| e.matches(identity, variant))
            .cloned()
    }

    /// Whether any variant of `identity` is present.
    pub fn contains(&self, identity: &ItemId) -> bool {
        self.inner.lock().entries.iter().any(|e| &e.identity == identity)
    }

    /// Variants of `identity` present, in insertion order.
    pub fn variants_of(&self, identity: &ItemId) -> Vec<Variant> {
        self.inner
            .lock()
            .entries
            .iter()
            .filter(|e| &e.identity == identity)
            .map(|e| e.variant.clone())
            .collect()
    }

    /// Run one notification observation pass.
    pub fn observe_notifications(&self) {
        if let Some(notifier) = &self.notifier {
            notifier.observe();
        }
    }

    fn announce(&self, kind: ActionKind, item: &CatalogItem) {
        if let Some(notifier) = &self.notifier {
            notifier.arm(PendingAction {
                kind,
                item_name: item.display_name(),
                collection: self.kind,
            });
        }
    }

    /// Overwrite the durable copy with the current entries.
    fn commit(&self, inner: &Inner) {
        if !inner.loaded {
            tracing::debug!(kind = %self.kind, "commit skipped before initial load");
            return;
        }
        if let Err(e) = write_json(self.storage.as_ref(), self.kind.storage_key(), &inner.entries) {
            log_storage_failure(self.kind, &e);
        }
    }
}

fn log_storage_failure(kind: CollectionKind, error: &StorageError) {
    tracing::warn!(%kind, %error, "failed to persist collection; continuing in memory");
}

/// Drop zero-quantity entries and merge duplicate keys, keeping the first
/// occurrence's position and snapshot.
fn normalize(entries: Vec<CollectionEntry>) -> Vec<CollectionEntry> {
    let mut out: Vec<CollectionEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.quantity == 0 {
            continue;
        }
        match out.iter_mut().find(|e| e.matches(&entry.identity, &entry.variant)) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(entry.quantity),
            None => out.push(entry),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn store() -> (Arc<MemoryStorage>, CollectionStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = CollectionStore::new(CollectionKind::Cart, storage.clone());
        store.load();
        (storage, store)
    }

    fn item(id: &str, price: f64) -> ItemRef {
        ItemRef::from(CatalogItem {
            name: Some(format!("Item {id}")),
            price: Some(price),
            ..CatalogItem::from_id(id)
        })
    }

    fn id(raw: &str) -> ItemId {
        ItemId::new(raw).unwrap()
    }

    #[test]
    fn add_twice_merges_into_one_entry() {
        let (_, store) = store();
        let opts = AddOptions::default().with_quantity(1);
        store.add(&item("p1", 100.0), &opts).unwrap();
        store.add(&item("p1", 100.0), &opts).unwrap();
        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].quantity, 2);
    }

    #[test]
    fn distinct_variants_are_distinct_entries_in_insertion_order() {
        let (_, store) = store();
        store.add(&item("p2", 1.0), &AddOptions::default());
        store.add(&item("p1", 1.0), &AddOptions::variant("L", "Red"));
        store.add(&item("p1", 1.0), &AddOptions::default());
        let keys: Vec<_> = store.entries().iter().map(|e| e.key()).collect();
        assert_eq!(
            keys,
            vec![
                (id("p2"), Variant::default()),
                (id("p1"), Variant::new("L", "Red")),
                (id("p1"), Variant::default()),
            ]
        );
    }

    #[test]
    fn missing_identity_leaves_state_untouched() {
        let (storage, store) = store();
        let ghost = ItemRef::from(CatalogItem {
            name: Some("Ghost".into()),
            ..CatalogItem::default()
        });
        assert!(store.add(&ghost, &AddOptions::default()).is_none());
        assert!(matches!(
            store.try_add(&ghost, &AddOptions::default()),
            Err(ClosetError::MissingIdentity)
        ));
        assert!(store.is_empty());
        assert!(storage.get("cart").unwrap().is_none());
    }

    #[test]
    fn update_quantity_to_zero_removes() {
        let (_, store) = store();
        store.add(&item("p1", 10.0), &AddOptions::default().with_quantity(2));
        assert_eq!(store.update_quantity(&id("p1"), &Variant::default(), -1), Mutation::QuantityChanged);
        assert_eq!(store.total_count(), 1);
        assert_eq!(store.update_quantity(&id("p1"), &Variant::default(), -5), Mutation::Removed);
        assert!(store.is_empty());
        assert_eq!(store.update_quantity(&id("p1"), &Variant::default(), 1), Mutation::Unchanged);
    }

    #[test]
    fn remove_then_add_yields_fresh_entry() {
        let (_, store) = store();
        store.add(&item("p1", 10.0), &AddOptions::default().with_quantity(3));
        store.remove(&id("p1"), &Variant::default());
        store.add(&item("p1", 12.0), &AddOptions::default());
        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].quantity, 1);
        assert_eq!(entries[0].payload_snapshot.price, Some(12.0));
    }

    #[test]
    fn totals_follow_entries() {
        let (_, store) = store();
        store.add(&item("p1", 100.0), &AddOptions::default().with_quantity(2));
        store.add(&item("p2", 50.5), &AddOptions::default());
        store.add(&ItemRef::Id("p3".into()), &AddOptions::default());
        assert_eq!(store.total_count(), 4);
        assert_eq!(store.total_value(), 250.5);
    }

    #[test]
    fn no_commit_before_load() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set("cart", "[]").unwrap();
        let store = CollectionStore::new(CollectionKind::Cart, storage.clone());
        store.add(&item("p1", 1.0), &AddOptions::default());
        store.clear();
        assert_eq!(storage.get("cart").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn commit_overwrites_whole_collection() {
        let (storage, store) = store();
        store.add(&item("p1", 1.0), &AddOptions::default());
        store.add(&item("p2", 1.0), &AddOptions::default());
        let stored: Vec<CollectionEntry> = read_json(storage.as_ref(), "cart").unwrap().unwrap();
        assert_eq!(stored, store.entries());
        store.clear();
        assert_eq!(storage.get("cart").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn load_normalizes_stored_entries() {
        let storage = Arc::new(MemoryStorage::new());
        let raw = serde_json::json!([
            { "identity": "p1", "variant": { "size": "M", "color": "White" }, "quantity": 1, "payload": { "_id": "p1" } },
            { "identity": "p2", "variant": { "size": "M", "color": "White" }, "quantity": 0, "payload": { "_id": "p2" } },
            { "identity": "p1", "variant": { "size": "M", "color": "White" }, "quantity": 2, "payload": { "_id": "p1" } }
        ]);
        storage.set("wardrobe", &raw.to_string()).unwrap();
        let store = CollectionStore::new(CollectionKind::Wardrobe, storage);
        assert_eq!(store.load(), 1);
        assert_eq!(store.total_count(), 3);
    }

    #[test]
    fn corrupt_storage_loads_empty_and_is_overwritten() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set("cart", "{broken").unwrap();
        let store = CollectionStore::new(CollectionKind::Cart, storage.clone());
        assert_eq!(store.load(), 0);
        assert!(store.is_loaded());
        store.add(&item("p1", 1.0), &AddOptions::default());
        let stored: Vec<CollectionEntry> = read_json(storage.as_ref(), "cart").unwrap().unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn storage_failure_keeps_in_memory_state() {
        let storage = Arc::new(MemoryStorage::with_quota(8));
        let store = CollectionStore::new(CollectionKind::Cart, storage.clone());
        store.load();
        assert!(store.add(&item("p1", 1.0), &AddOptions::default()).is_some());
        assert_eq!(store.len(), 1);
        assert!(storage.get("cart").unwrap().is_none());
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Wishlist".parse::<CollectionKind>().unwrap(), CollectionKind::Wishlist);
        assert!("basket".parse::<CollectionKind>().is_err());
    }
}
