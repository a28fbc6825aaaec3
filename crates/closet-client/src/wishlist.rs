//! Typed client for the wishlist API.
//!
//! ## Paths (relative to the API base)
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `wishlist` | Current user's wishlist |
//! | POST   | `wishlist/add` | Add `{id}` |
//! | POST   | `wishlist/remove` | Remove `{id}` |
//!
//! All three require the bearer token of the signed-in user. The GET body is
//! accepted as `{"items": [...]}`, `{"wishlist": [...]}`, or a bare array;
//! each element is a populated product record or a bare product id.

use closet_core::{ItemId, ItemRef};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WishlistBody {
    Items { items: Vec<ItemRef> },
    Wishlist { wishlist: Vec<ItemRef> },
    Bare(Vec<ItemRef>),
}

impl WishlistBody {
    fn into_items(self) -> Vec<ItemRef> {
        match self {
            Self::Items { items } => items,
            Self::Wishlist { wishlist } => wishlist,
            Self::Bare(items) => items,
        }
    }
}

#[derive(Debug, Serialize)]
struct WishlistMutation<'a> {
    id: &'a str,
}

/// Client for the wishlist API.
#[derive(Debug, Clone)]
pub struct WishlistClient {
    http: reqwest::Client,
    base_url: url::Url,
}

impl WishlistClient {
    pub(crate) fn new(http: reqwest::Client, base_url: url::Url) -> Self {
        Self { http, base_url }
    }

    fn url(&self, endpoint: &str, path: &str) -> Result<url::Url, ApiError> {
        self.base_url.join(path).map_err(|e| ApiError::Url {
            endpoint: endpoint.into(),
            source: e,
        })
    }

    /// Fetch the signed-in user's wishlist.
    ///
    /// Calls `GET {base_url}/wishlist`.
    pub async fn fetch(&self) -> Result<Vec<ItemRef>, ApiError> {
        let endpoint = "GET /wishlist";
        let url = self.url(endpoint, "wishlist")?;

        let resp = self.http.get(url).send().await.map_err(|e| ApiError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;
        let resp = crate::check_status(endpoint, resp).await?;

        let body: WishlistBody = resp.json().await.map_err(|e| ApiError::Deserialization {
            endpoint: endpoint.into(),
            source: e,
        })?;
        let items = body.into_items();
        tracing::debug!(count = items.len(), "fetched remote wishlist");
        Ok(items)
    }

    /// Add an item to the signed-in user's wishlist.
    ///
    /// Calls `POST {base_url}/wishlist/add` with `{"id": ...}`.
    pub async fn add(&self, id: &ItemId) -> Result<(), ApiError> {
        self.mutate("POST /wishlist/add", "wishlist/add", id).await
    }

    /// Remove an item from the signed-in user's wishlist.
    ///
    /// Calls `POST {base_url}/wishlist/remove` with `{"id": ...}`.
    pub async fn remove(&self, id: &ItemId) -> Result<(), ApiError> {
        self.mutate("POST /wishlist/remove", "wishlist/remove", id).await
    }

    async fn mutate(&self, endpoint: &str, path: &str, id: &ItemId) -> Result<(), ApiError> {
        let url = self.url(endpoint, path)?;
        let resp = self
            .http
            .post(url)
            .json(&WishlistMutation { id: id.as_str() })
            .send()
            .await
            .map_err(|e| ApiError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;
        crate::check_status(endpoint, resp).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_accepts_all_three_shapes() {
        let items: WishlistBody =
            serde_json::from_value(serde_json::json!({ "items": [{ "_id": "a" }, "b"] })).unwrap();
        assert_eq!(items.into_items().len(), 2);

        let wishlist: WishlistBody =
            serde_json::from_value(serde_json::json!({ "wishlist": ["c"] })).unwrap();
        assert_eq!(wishlist.into_items(), vec![ItemRef::Id("c".into())]);

        let bare: WishlistBody = serde_json::from_value(serde_json::json!([])).unwrap();
        assert!(bare.into_items().is_empty());
    }
}
