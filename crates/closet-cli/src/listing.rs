//! # `closet listing`
//!
//! Pages through the catalog listing endpoint with the progressive fetch
//! controller and prints the items admitted by an optional shop filter.
//!
//! A successful fetch is cached as a snapshot; when the endpoint fails, the
//! last snapshot (if still fresh) is printed instead.

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use closet_client::{ClosetClient, ClosetConfig};
use closet_core::{belongs_to_shop, CatalogItem};
use closet_listing::{ControllerConfig, FetchOutcome, ListingSource, ProgressiveFetchController};
use closet_store::SnapshotCache;

#[derive(Args, Debug, Clone)]
pub struct ListingArgs {
    /// Number of pages to load.
    #[arg(long, default_value_t = 1)]
    pub pages: u32,
    /// Shop id to filter by (e.g. `under-999`, `deals`, `new-arrivals`).
    #[arg(long)]
    pub shop: Option<String>,
    /// Category filter forwarded to the listing endpoint.
    #[arg(long)]
    pub category: Option<String>,
    /// Reveal items one at a time (up to two batches).
    #[arg(long)]
    pub progressive: bool,
    /// Print items as JSON.
    #[arg(long)]
    pub json: bool,
}

impl ListingArgs {
    fn snapshot_key(&self) -> String {
        match &self.category {
            Some(category) => format!("listing:{category}"),
            None => "listing".to_string(),
        }
    }
}

/// Fetch over HTTP as configured.
pub async fn run_listing(
    args: &ListingArgs,
    config: &ClosetConfig,
    snapshots: &SnapshotCache,
) -> Result<u8> {
    let client = ClosetClient::new(config)?;
    let mut listing = client.listing().clone();
    if let Some(category) = &args.category {
        listing = listing.with_filter("category", category);
    }
    run_listing_with(args, Arc::new(listing), ControllerConfig::from(config), snapshots).await
}

/// Fetch from any listing source.
pub async fn run_listing_with(
    args: &ListingArgs,
    source: Arc<dyn ListingSource>,
    config: ControllerConfig,
    snapshots: &SnapshotCache,
) -> Result<u8> {
    let controller = ProgressiveFetchController::new(source, config);
    let first = if args.progressive {
        controller.fetch_progressive().await
    } else {
        controller.refetch().await
    };

    if let FetchOutcome::Failed(message) = first {
        let key = args.snapshot_key();
        return match snapshots.get::<Vec<CatalogItem>>(&key) {
            Some(cached) => {
                tracing::warn!(error = %message, "listing unavailable; showing cached snapshot");
                print_items(args, &cached)?;
                Ok(2)
            }
            None => bail!("listing fetch failed: {message}"),
        };
    }

    for _ in 1..args.pages {
        match controller.load_more().await {
            FetchOutcome::Applied(_) => {}
            FetchOutcome::Failed(message) => bail!("listing fetch failed: {message}"),
            FetchOutcome::Skipped | FetchOutcome::Superseded => break,
        }
    }

    let snapshot = controller.snapshot();
    if let Err(e) = snapshots.put(&args.snapshot_key(), &snapshot.products) {
        tracing::warn!(error = %e, "failed to cache listing snapshot");
    }
    print_items(args, &snapshot.products)?;
    if snapshot.has_more {
        tracing::info!(page = snapshot.page, "more pages available");
    }
    Ok(0)
}

fn print_items(args: &ListingArgs, items: &[CatalogItem]) -> Result<()> {
    let now = chrono::Utc::now();
    let visible: Vec<&CatalogItem> = match &args.shop {
        Some(shop) => items.iter().filter(|item| belongs_to_shop(item, shop, now)).collect(),
        None => items.iter().collect(),
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&visible)?);
        return Ok(());
    }
    println!("Items ({} of {} loaded):", visible.len(), items.len());
    for item in visible {
        let id = item
            .primary_id
            .as_deref()
            .or(item.id.as_deref())
            .unwrap_or("-");
        let price = item
            .effective_price()
            .map_or_else(|| "-".to_string(), |p| format!("{p:.2}"));
        println!("  {id:<16} {:<32} {price:>10}", item.display_name());
    }
    Ok(())
}
