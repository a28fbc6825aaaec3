//! # closet-store — Client-Side Collection Engine
//!
//! Persistent collections (cart, wishlist, wardrobe) with optimistic remote
//! reconciliation and deduplicated notifications, plus the small persisted
//! side stores a client session carries (search history, notification
//! read-state, snapshot cache).
//!
//! ## Layers
//!
//! - [`storage`]: the durable key-value seam every store writes through.
//! - [`collection`]: one store type per collection kind, enforcing entry-key
//!   uniqueness, positive quantities, and one commit per mutation.
//! - [`notify`]: the single-slot latch that turns repeated observations of a
//!   mutation into exactly one toast.
//! - [`sync`]: remote reconciliation for the wishlist around sign-in/out.
//! - [`session`]: builds and loads everything once; follows [`auth`].
//!
//! ## Concurrency
//!
//! State lives behind `parking_lot` locks that are never held across an
//! `.await`. The only suspension points are remote calls, and every
//! resolution re-checks the auth epoch before touching state.

pub mod auth;
pub mod cache;
pub mod collection;
pub mod history;
pub mod notify;
pub mod session;
pub mod storage;
pub mod sync;

pub use auth::{AuthSignal, AuthState};
pub use cache::SnapshotCache;
pub use collection::{AddOptions, CollectionEntry, CollectionKind, CollectionStore, Mutation};
pub use history::{ReadState, RecentSearches};
pub use notify::{
    LogToaster, MemoryToaster, NotificationDispatcher, PendingAction, ToastId, ToastStyle, Toaster,
};
pub use session::Session;
pub use storage::{FileStorage, KeyValueStore, MemoryStorage};
pub use sync::{Reconciliation, RemoteCollection, RemoteSyncState, SyncOutcome, SyncedCollection};
