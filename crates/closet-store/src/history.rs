//! Small persisted lists: recent searches and notification read-state.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::storage::{read_json, write_json, KeyValueStore};

/// Storage key of the recent search list.
pub const RECENT_SEARCHES_KEY: &str = "recentSearches";

/// Storage key of the notification read-state.
pub const READ_STATE_KEY: &str = "notificationReadState";

/// Maximum number of remembered searches.
pub const RECENT_SEARCH_LIMIT: usize = 10;

/// Most-recent-first search history, deduplicated case-insensitively.
pub struct RecentSearches {
    storage: Arc<dyn KeyValueStore>,
    terms: Mutex<Vec<String>>,
}

impl std::fmt::Debug for RecentSearches {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecentSearches").field("terms", &*self.terms.lock()).finish()
    }
}

impl RecentSearches {
    /// Load the history from storage. An unreadable value starts empty.
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let mut terms = match read_json::<Vec<String>>(storage.as_ref(), RECENT_SEARCHES_KEY) {
            Ok(terms) => terms.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read recent searches");
                Vec::new()
            }
        };
        terms.truncate(RECENT_SEARCH_LIMIT);
        Self {
            storage,
            terms: Mutex::new(terms),
        }
    }

    /// Put `term` at the front. Blank terms are ignored.
    pub fn record(&self, term: &str) {
        let term = term.trim();
        if term.is_empty() {
            return;
        }
        let mut terms = self.terms.lock();
        terms.retain(|t| !t.eq_ignore_ascii_case(term));
        terms.insert(0, term.to_string());
        terms.truncate(RECENT_SEARCH_LIMIT);
        self.persist(&terms);
    }

    pub fn list(&self) -> Vec<String> {
        self.terms.lock().clone()
    }

    /// Forget one term, matched case-insensitively.
    pub fn remove(&self, term: &str) -> bool {
        let term = term.trim();
        let mut terms = self.terms.lock();
        let before = terms.len();
        terms.retain(|t| !t.eq_ignore_ascii_case(term));
        let removed = terms.len() != before;
        if removed {
            self.persist(&terms);
        }
        removed
    }

    pub fn clear(&self) {
        let mut terms = self.terms.lock();
        terms.clear();
        self.persist(&terms);
    }

    fn persist(&self, terms: &[String]) {
        if let Err(e) = write_json(self.storage.as_ref(), RECENT_SEARCHES_KEY, terms) {
            tracing::warn!(error = %e, "failed to persist recent searches");
        }
    }
}

/// Set of notification ids the user has read.
pub struct ReadState {
    storage: Arc<dyn KeyValueStore>,
    read: Mutex<BTreeSet<String>>,
}

impl std::fmt::Debug for ReadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadState").field("read", &self.read.lock().len()).finish()
    }
}

impl ReadState {
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let read = match read_json::<BTreeSet<String>>(storage.as_ref(), READ_STATE_KEY) {
            Ok(read) => read.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read notification read-state");
                BTreeSet::new()
            }
        };
        Self {
            storage,
            read: Mutex::new(read),
        }
    }

    /// Returns `true` if the id was not already marked.
    pub fn mark_read(&self, id: &str) -> bool {
        let mut read = self.read.lock();
        let inserted = read.insert(id.to_string());
        if inserted {
            self.persist(&read);
        }
        inserted
    }

    pub fn mark_all_read<'a>(&self, ids: impl IntoIterator<Item = &'a str>) {
        let mut read = self.read.lock();
        let before = read.len();
        read.extend(ids.into_iter().map(str::to_string));
        if read.len() != before {
            self.persist(&read);
        }
    }

    pub fn is_read(&self, id: &str) -> bool {
        self.read.lock().contains(id)
    }

    /// How many of `ids` are still unread.
    pub fn unread_count<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> usize {
        let read = self.read.lock();
        ids.into_iter().filter(|id| !read.contains(*id)).count()
    }

    fn persist(&self, read: &BTreeSet<String>) {
        if let Err(e) = write_json(self.storage.as_ref(), READ_STATE_KEY, read) {
            tracing::warn!(error = %e, "failed to persist notification read-state");
        }
    }
}
