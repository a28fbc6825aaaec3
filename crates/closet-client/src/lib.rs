//! # closet-client -- Typed Rust client for the Closet remote APIs
//!
//! Provides typed access to the two remote surfaces the client-side engine
//! consumes:
//! - **Wishlist** — the signed-in user's authoritative wishlist
//!   (`GET /wishlist`, `POST /wishlist/add`, `POST /wishlist/remove`).
//! - **Listing** — the paginated catalog listing (`GET /{listing_path}?page=&limit=`).
//!
//! ## Architecture
//!
//! This crate is the only path by which the collection stores and the
//! listing controller talk HTTP. It knows nothing about collection semantics:
//! no optimistic state, no retries, no reconciliation. Those live in
//! `closet-store` and `closet-listing`.
//!
//! ## Path Convention
//!
//! Every path is joined onto the configured base URL, which always ends with
//! `/`. For example, with `CLOSET_API_URL=https://shop.example/api` the
//! wishlist lives at `https://shop.example/api/wishlist`.

pub mod config;
pub mod error;
pub mod listing;
pub mod wishlist;

pub use config::{ClosetConfig, ConfigError};
pub use error::ApiError;
pub use listing::{ListingClient, ListingPage, Pagination};
pub use wishlist::WishlistClient;

use std::time::Duration;

/// Top-level Closet API client. Holds the sub-clients for each surface.
#[derive(Debug, Clone)]
pub struct ClosetClient {
    wishlist: WishlistClient,
    listing: ListingClient,
}

impl ClosetClient {
    /// Create a new client from configuration.
    pub fn new(config: &ClosetConfig) -> Result<Self, ApiError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.api_token {
            let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                .map_err(|_| ApiError::Config(ConfigError::InvalidToken))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            wishlist: WishlistClient::new(http.clone(), config.api_url.clone()),
            listing: ListingClient::new(http, config.api_url.clone(), config.listing_path.clone()),
        })
    }

    /// Access the wishlist client.
    pub fn wishlist(&self) -> &WishlistClient {
        &self.wishlist
    }

    /// Access the listing client.
    pub fn listing(&self) -> &ListingClient {
        &self.listing
    }
}

/// Turn a non-2xx response into [`ApiError::Status`], passing 2xx through.
pub(crate) async fn check_status(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::Status {
        endpoint: endpoint.into(),
        status,
        body,
    })
}
