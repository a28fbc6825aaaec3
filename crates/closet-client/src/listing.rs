//! Typed client for the paginated catalog listing.
//!
//! `GET {base_url}/{listing_path}?page={n}&limit={m}` returns either an
//! envelope or a bare array:
//!
//! ```json
//! { "items": [ ... ], "pagination": { "hasMore": true, "pages": 4, "page": 1 } }
//! [ ... ]
//! ```
//!
//! `products` is accepted as an alias of `items`. Pages are 1-based.

use closet_core::CatalogItem;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Pagination metadata returned alongside a listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub has_more: Option<bool>,
    /// Total number of pages.
    #[serde(default)]
    pub pages: Option<u32>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl Pagination {
    /// Whether the metadata carries anything the caller can decide on.
    pub fn is_informative(&self) -> bool {
        self.has_more.is_some() || self.pages.is_some()
    }
}

/// One page of listing results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    pub items: Vec<CatalogItem>,
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListingBody {
    Envelope {
        #[serde(alias = "products")]
        items: Vec<CatalogItem>,
        #[serde(default)]
        pagination: Option<Pagination>,
    },
    Bare(Vec<CatalogItem>),
}

impl From<ListingBody> for ListingPage {
    fn from(body: ListingBody) -> Self {
        match body {
            ListingBody::Envelope { items, pagination } => Self { items, pagination },
            ListingBody::Bare(items) => Self {
                items,
                pagination: None,
            },
        }
    }
}

/// Client for the catalog listing endpoint.
#[derive(Debug, Clone)]
pub struct ListingClient {
    http: reqwest::Client,
    base_url: url::Url,
    path: String,
    filters: Vec<(String, String)>,
}

impl ListingClient {
    pub(crate) fn new(http: reqwest::Client, base_url: url::Url, path: String) -> Self {
        Self {
            http,
            base_url,
            path,
            filters: Vec::new(),
        }
    }

    /// A copy of this client that sends an extra query parameter with every
    /// page request (category, search term, sort order).
    pub fn with_filter(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.filters.push((key.into(), value.into()));
        next
    }

    /// Fetch one page.
    ///
    /// Calls `GET {base_url}/{path}?page={page}&limit={limit}`.
    pub async fn fetch_page(&self, page: u32, limit: u32) -> Result<ListingPage, ApiError> {
        let endpoint = format!("GET /{}", self.path);
        let mut url = self.base_url.join(&self.path).map_err(|e| ApiError::Url {
            endpoint: endpoint.clone(),
            source: e,
        })?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in &self.filters {
                query.append_pair(key, value);
            }
            query.append_pair("page", &page.to_string());
            query.append_pair("limit", &limit.to_string());
        }

        let resp = self.http.get(url).send().await.map_err(|e| ApiError::Http {
            endpoint: endpoint.clone(),
            source: e,
        })?;
        let resp = crate::check_status(&endpoint, resp).await?;

        let body: ListingBody = resp.json().await.map_err(|e| ApiError::Deserialization {
            endpoint: endpoint.clone(),
            source: e,
        })?;
        let page_data = ListingPage::from(body);
        tracing::debug!(page, limit, count = page_data.items.len(), "fetched listing page");
        Ok(page_data)
    }
}
