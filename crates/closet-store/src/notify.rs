//! # Notification Dispatcher
//!
//! Emits at most one user-facing toast per logical collection mutation, even
//! when the mutation is observed several times (after the local commit, again
//! after the remote call resolves, again on the next view refresh).
//!
//! ## Latch Protocol
//!
//! 1. [`NotificationDispatcher::arm`] records the action and its subject item
//!    in a single-slot latch at call time, replacing anything pending and
//!    resetting the `shown` flag.
//! 2. [`NotificationDispatcher::observe`] fires the toast for a pending,
//!    unshown action exactly once and sets `shown`.
//! 3. Once the reset delay has elapsed after firing, the next `observe`
//!    clears both the latch and the flag.
//!
//! Three rapid adds arm the latch three times; each arm is followed by its own
//! observation, so each produces exactly one toast naming its own item.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::collection::CollectionKind;

/// Visual style of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToastStyle {
    Success,
    Info,
    Error,
}

/// Handle of a shown toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId(pub u64);

/// Process-wide toast emitter.
pub trait Toaster: Send + Sync {
    fn show(&self, message: &str, style: ToastStyle) -> ToastId;
    fn dismiss(&self, id: ToastId);
}

/// Toaster that writes every toast to the `tracing` log. Used by headless
/// front-ends such as the CLI.
#[derive(Debug, Default)]
pub struct LogToaster {
    next: Mutex<u64>,
}

impl Toaster for LogToaster {
    fn show(&self, message: &str, style: ToastStyle) -> ToastId {
        let mut next = self.next.lock();
        *next += 1;
        tracing::info!(toast = *next, ?style, "{message}");
        ToastId(*next)
    }

    fn dismiss(&self, id: ToastId) {
        tracing::debug!(toast = id.0, "toast dismissed");
    }
}

/// A toast recorded by [`MemoryToaster`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedToast {
    pub id: ToastId,
    pub message: String,
    pub style: ToastStyle,
    pub dismissed: bool,
}

/// Toaster that records every toast in memory.
#[derive(Debug, Default)]
pub struct MemoryToaster {
    toasts: Mutex<Vec<RecordedToast>>,
}

impl MemoryToaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every toast shown so far, in order.
    pub fn toasts(&self) -> Vec<RecordedToast> {
        self.toasts.lock().clone()
    }

    /// Messages of every toast shown so far, in order.
    pub fn messages(&self) -> Vec<String> {
        self.toasts.lock().iter().map(|t| t.message.clone()).collect()
    }
}

impl Toaster for MemoryToaster {
    fn show(&self, message: &str, style: ToastStyle) -> ToastId {
        let mut toasts = self.toasts.lock();
        let id = ToastId(toasts.len() as u64 + 1);
        toasts.push(RecordedToast {
            id,
            message: message.to_string(),
            style,
            dismissed: false,
        });
        id
    }

    fn dismiss(&self, id: ToastId) {
        if let Some(toast) = self.toasts.lock().iter_mut().find(|t| t.id == id) {
            toast.dismissed = true;
        }
    }
}

/// Kind of a notifiable mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Add,
    Remove,
}

/// The latched action: what happened, to which item, in which collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub kind: ActionKind,
    pub item_name: String,
    pub collection: CollectionKind,
}

impl PendingAction {
    fn message(&self) -> String {
        match self.kind {
            ActionKind::Add => format!("{} added to {}", self.item_name, self.collection),
            ActionKind::Remove => format!("{} removed from {}", self.item_name, self.collection),
        }
    }

    fn style(&self) -> ToastStyle {
        match self.kind {
            ActionKind::Add => ToastStyle::Success,
            ActionKind::Remove => ToastStyle::Info,
        }
    }
}

#[derive(Debug, Default)]
struct Latch {
    pending: Option<PendingAction>,
    shown: bool,
    shown_at: Option<Instant>,
}

/// Single-slot notification latch for one collection store.
pub struct NotificationDispatcher {
    toaster: Arc<dyn Toaster>,
    reset_after: Duration,
    latch: Mutex<Latch>,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("reset_after", &self.reset_after)
            .field("latch", &*self.latch.lock())
            .finish()
    }
}

impl NotificationDispatcher {
    pub fn new(toaster: Arc<dyn Toaster>, reset_after: Duration) -> Self {
        Self {
            toaster,
            reset_after,
            latch: Mutex::new(Latch::default()),
        }
    }

    /// Record an action synchronously at call time.
    pub fn arm(&self, action: PendingAction) {
        let mut latch = self.latch.lock();
        latch.pending = Some(action);
        latch.shown = false;
        latch.shown_at = None;
    }

    /// One observation pass. Fires the pending action if it has not been
    /// shown yet; returns the toast id when it fired.
    pub fn observe(&self) -> Option<ToastId> {
        let mut latch = self.latch.lock();
        if latch.shown {
            let expired = latch
                .shown_at
                .map_or(true, |at| at.elapsed() >= self.reset_after);
            if expired {
                *latch = Latch::default();
            }
            return None;
        }
        let action = latch.pending.as_ref()?;
        let id = self.toaster.show(&action.message(), action.style());
        latch.shown = true;
        latch.shown_at = Some(Instant::now());
        Some(id)
    }

    /// The currently latched action, if any.
    pub fn pending(&self) -> Option<PendingAction> {
        self.latch.lock().pending.clone()
    }
}
