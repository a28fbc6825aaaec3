//! Where listing pages come from.

use async_trait::async_trait;
use closet_client::{ListingClient, ListingPage};
use closet_core::ClosetError;

/// A paginated source of catalog items. Pages are 1-based.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<ListingPage, ClosetError>;
}

#[async_trait]
impl ListingSource for ListingClient {
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<ListingPage, ClosetError> {
        ListingClient::fetch_page(self, page, limit)
            .await
            .map_err(|e| ClosetError::Fetch(e.to_string()))
    }
}
