//! # Progressive Fetch Controller
//!
//! Drives one listing view: loads page 1, appends later pages on demand, and
//! keeps the skeleton-placeholder count the view renders while items are on
//! their way.
//!
//! ## States
//!
//! ```text
//! Idle ──refetch──▶ Loading ──▶ PartialLoaded ⇄ LoadingMore
//!                      │              │
//!                      ▼              ▼
//!                   Errored        Complete
//! ```
//!
//! ## Sequences and Cancellation
//!
//! [`refetch`](ProgressiveFetchController::refetch) and
//! [`fetch_progressive`](ProgressiveFetchController::fetch_progressive) each
//! start a new sequence: the previous sequence's `CancellationToken` is
//! cancelled, a fresh one is issued, and the generation counter advances.
//! Every await point races the token, and every resolution re-checks the
//! generation under the lock before touching state. A superseded result is
//! dropped without an error.
//!
//! ## Skeletons
//!
//! A sequence starts with `batch_size` placeholders; `load_more` re-arms them
//! to `batch_size`. Each batch decrements the count by the number of real
//! items received, saturating at zero. Once the listing is exhausted (or
//! errored) the count is zero.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use closet_client::{ClosetConfig, ListingPage};
use closet_core::{belongs_to_shop, CatalogItem, ClosetError};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::source::ListingSource;

/// Page size used when none is configured.
pub const DEFAULT_BATCH_SIZE: u32 = 6;

/// Delay between progressively revealed items when none is configured.
pub const DEFAULT_REVEAL_DELAY: Duration = Duration::from_millis(60);

/// Controller tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Items requested per page, and the initial skeleton count.
    pub batch_size: u32,
    /// Inter-item delay of [`ProgressiveFetchController::fetch_progressive`].
    pub reveal_delay: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            reveal_delay: DEFAULT_REVEAL_DELAY,
        }
    }
}

impl From<&ClosetConfig> for ControllerConfig {
    fn from(config: &ClosetConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            reveal_delay: config.reveal_delay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Loading,
    PartialLoaded,
    LoadingMore,
    Complete,
    Errored,
}

impl FetchStatus {
    pub fn is_loading(self) -> bool {
        matches!(self, Self::Loading | Self::LoadingMore)
    }
}

/// A batch the controller applied.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPage {
    pub page_number: u32,
    pub items: Vec<CatalogItem>,
    pub has_more: bool,
}

/// Result of one controller call.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Applied(FetchPage),
    /// A newer sequence started; this result was discarded.
    Superseded,
    /// The fetch failed; the controller is now `Errored`.
    Failed(String),
    /// The call's preconditions did not hold; nothing happened.
    Skipped,
}

/// Read-only view of the controller state.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingSnapshot {
    pub status: FetchStatus,
    pub products: Vec<CatalogItem>,
    /// Last page applied; 0 before the first.
    pub page: u32,
    pub has_more: bool,
    pub skeletons: u32,
    pub error: Option<String>,
}

impl ListingSnapshot {
    pub fn is_loading(&self) -> bool {
        self.status.is_loading()
    }
}

#[derive(Debug)]
struct State {
    status: FetchStatus,
    products: Vec<CatalogItem>,
    page: u32,
    has_more: bool,
    skeletons: u32,
    error: Option<String>,
    generation: u64,
    token: CancellationToken,
}

impl State {
    fn fresh(batch_size: u32, generation: u64) -> Self {
        Self {
            status: FetchStatus::Idle,
            products: Vec::new(),
            page: 0,
            has_more: true,
            skeletons: batch_size,
            error: None,
            generation,
            token: CancellationToken::new(),
        }
    }

    fn fail(&mut self, error: &ClosetError) -> FetchOutcome {
        let message = error.to_string();
        self.status = FetchStatus::Errored;
        self.error = Some(message.clone());
        self.has_more = false;
        self.skeletons = 0;
        FetchOutcome::Failed(message)
    }

    /// Leave a loading status after the running sequence was abandoned.
    /// Nothing is in flight any more, so no placeholders remain.
    fn abandon(&mut self) {
        if !self.status.is_loading() {
            return;
        }
        if self.products.is_empty() {
            self.status = FetchStatus::Idle;
        } else {
            self.status = FetchStatus::PartialLoaded;
            self.skeletons = 0;
        }
    }

    fn settle(&mut self, has_more: bool) {
        self.has_more = has_more;
        if has_more {
            self.status = FetchStatus::PartialLoaded;
        } else {
            self.status = FetchStatus::Complete;
            self.skeletons = 0;
        }
    }
}

/// Paginated, cancellable listing loader.
pub struct ProgressiveFetchController {
    source: Arc<dyn ListingSource>,
    config: ControllerConfig,
    state: Mutex<State>,
}

impl std::fmt::Debug for ProgressiveFetchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressiveFetchController")
            .field("config", &self.config)
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl ProgressiveFetchController {
    pub fn new(source: Arc<dyn ListingSource>, config: ControllerConfig) -> Self {
        let config = ControllerConfig {
            batch_size: config.batch_size.max(1),
            ..config
        };
        Self {
            source,
            state: Mutex::new(State::fresh(config.batch_size, 0)),
            config,
        }
    }

    pub fn config(&self) -> ControllerConfig {
        self.config
    }

    /// Discard all state and load page 1.
    pub async fn refetch(&self) -> FetchOutcome {
        let (generation, token) = self.begin_sequence();
        tracing::debug!(generation, "listing refetch");
        self.fetch_into(1, generation, token).await
    }

    /// Same as [`refetch`](Self::refetch).
    pub async fn reset(&self) -> FetchOutcome {
        self.refetch().await
    }

    /// Load the next page. A no-op while loading, once exhausted, or while
    /// placeholders from the previous batch are still undisplayed.
    pub async fn load_more(&self) -> FetchOutcome {
        let (page, generation, token) = {
            let mut state = self.state.lock();
            if state.status.is_loading() || !state.has_more || state.skeletons > 0 {
                tracing::debug!(
                    status = ?state.status,
                    has_more = state.has_more,
                    skeletons = state.skeletons,
                    "load_more skipped"
                );
                return FetchOutcome::Skipped;
            }
            state.status = FetchStatus::LoadingMore;
            state.skeletons = self.config.batch_size;
            (state.page + 1, state.generation, state.token.clone())
        };
        self.fetch_into(page, generation, token).await
    }

    /// Start a new sequence that reveals items one at a time, pausing
    /// `reveal_delay` before each, until twice the batch size is shown or the
    /// listing is exhausted.
    pub async fn fetch_progressive(&self) -> FetchOutcome {
        let (generation, token) = self.begin_sequence();
        let cap = self.config.batch_size.saturating_mul(2) as usize;
        let mut revealed: Vec<CatalogItem> = Vec::new();
        let mut page = 1;
        tracing::debug!(generation, cap, "progressive fetch");

        loop {
            let Some(result) = self.fetch_guarded(page, &token).await else {
                return self.superseded(generation);
            };
            let listing = match result {
                Ok(listing) => listing,
                Err(e) => return self.resolve_error(generation, &e),
            };
            let has_more = has_more_after(&listing, page, self.config.batch_size);

            for item in listing.items {
                if revealed.len() >= cap {
                    break;
                }
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return self.superseded(generation),
                    _ = tokio::time::sleep(self.config.reveal_delay) => {}
                }
                // The status stays loading until the sequence settles.
                let mut state = self.state.lock();
                if state.generation != generation {
                    return FetchOutcome::Superseded;
                }
                state.products.push(item.clone());
                state.page = page;
                state.skeletons = state.skeletons.saturating_sub(1);
                revealed.push(item);
            }

            let done = !has_more || revealed.len() >= cap;
            {
                let mut state = self.state.lock();
                if state.generation != generation {
                    return FetchOutcome::Superseded;
                }
                state.page = page;
                if done {
                    state.settle(has_more);
                } else {
                    state.status = FetchStatus::LoadingMore;
                }
            }
            if done {
                return FetchOutcome::Applied(FetchPage {
                    page_number: page,
                    items: revealed,
                    has_more,
                });
            }
            page += 1;
        }
    }

    /// Cancel the in-flight sequence without touching loaded items. A
    /// fresh token is issued, so a later `load_more` continues from the last
    /// applied page.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.token.cancel();
        state.token = CancellationToken::new();
        state.generation = state.generation.wrapping_add(1);
        state.abandon();
        tracing::debug!(generation = state.generation, status = ?state.status, "listing sequence cancelled");
    }

    pub fn snapshot(&self) -> ListingSnapshot {
        let state = self.state.lock();
        ListingSnapshot {
            status: state.status,
            products: state.products.clone(),
            page: state.page,
            has_more: state.has_more,
            skeletons: state.skeletons,
            error: state.error.clone(),
        }
    }

    pub fn status(&self) -> FetchStatus {
        self.state.lock().status
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().status.is_loading()
    }

    /// Loaded items admitted by `shop` at `now`.
    pub fn visible(&self, shop: &str, now: DateTime<Utc>) -> Vec<CatalogItem> {
        self.state
            .lock()
            .products
            .iter()
            .filter(|item| belongs_to_shop(item, shop, now))
            .cloned()
            .collect()
    }

    fn begin_sequence(&self) -> (u64, CancellationToken) {
        let mut state = self.state.lock();
        state.token.cancel();
        let generation = state.generation.wrapping_add(1);
        *state = State::fresh(self.config.batch_size, generation);
        state.status = FetchStatus::Loading;
        (generation, state.token.clone())
    }

    async fn fetch_guarded(
        &self,
        page: u32,
        token: &CancellationToken,
    ) -> Option<Result<ListingPage, ClosetError>> {
        tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = self.source.fetch_page(page, self.config.batch_size) => Some(result),
        }
    }

    async fn fetch_into(&self, page: u32, generation: u64, token: CancellationToken) -> FetchOutcome {
        let Some(result) = self.fetch_guarded(page, &token).await else {
            return self.superseded(generation);
        };
        let listing = match result {
            Ok(listing) => listing,
            Err(e) => return self.resolve_error(generation, &e),
        };

        let has_more = has_more_after(&listing, page, self.config.batch_size);
        let mut state = self.state.lock();
        if state.generation != generation {
            return FetchOutcome::Superseded;
        }
        let received = u32::try_from(listing.items.len()).unwrap_or(u32::MAX);
        state.products.extend(listing.items.iter().cloned());
        state.page = page;
        state.skeletons = state.skeletons.saturating_sub(received);
        state.error = None;
        state.settle(has_more);
        tracing::debug!(page, received, has_more, total = state.products.len(), "listing page applied");
        FetchOutcome::Applied(FetchPage {
            page_number: page,
            items: listing.items,
            has_more,
        })
    }

    fn superseded(&self, generation: u64) -> FetchOutcome {
        tracing::debug!(generation, "listing fetch superseded");
        FetchOutcome::Superseded
    }

    fn resolve_error(&self, generation: u64, error: &ClosetError) -> FetchOutcome {
        let mut state = self.state.lock();
        if state.generation != generation {
            return FetchOutcome::Superseded;
        }
        if error.is_cancelled() {
            state.abandon();
            return FetchOutcome::Superseded;
        }
        tracing::warn!(page = state.page + 1, error = %error, "listing fetch failed");
        state.fail(error)
    }
}

/// Pagination metadata decides when present; otherwise a full batch implies
/// another page.
fn has_more_after(listing: &ListingPage, page: u32, batch_size: u32) -> bool {
    match listing.pagination.as_ref().filter(|p| p.is_informative()) {
        Some(pagination) => {
            pagination.has_more.unwrap_or(true) && pagination.pages.map_or(true, |pages| pages > page)
        }
        None => listing.items.len() >= batch_size as usize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use closet_client::Pagination;

    fn page(len: usize, has_more: Option<bool>, pages: Option<u32>) -> ListingPage {
        ListingPage {
            items: (0..len).map(|i| CatalogItem::from_id(format!("p{i}"))).collect(),
            pagination: Some(Pagination {
                has_more,
                pages,
                ..Pagination::default()
            }),
        }
    }

    #[test]
    fn explicit_metadata_wins_over_batch_heuristic() {
        assert!(!has_more_after(&page(6, Some(false), None), 1, 6));
        assert!(has_more_after(&page(2, Some(true), None), 1, 6));
        assert!(!has_more_after(&page(6, Some(true), Some(2)), 2, 6));
        assert!(has_more_after(&page(6, None, Some(3)), 2, 6));
    }

    #[test]
    fn batch_heuristic_without_metadata() {
        let mut listing = page(6, None, None);
        assert!(has_more_after(&listing, 1, 6));
        listing.pagination = None;
        listing.items.pop();
        assert!(!has_more_after(&listing, 1, 6));
    }

    #[test]
    fn config_from_client_config() {
        let mut config = ClosetConfig::local_mock("http://127.0.0.1:1").unwrap();
        config.batch_size = 12;
        let derived = ControllerConfig::from(&config);
        assert_eq!(derived.batch_size, 12);
        assert_eq!(derived.reveal_delay, Duration::ZERO);
    }
}
