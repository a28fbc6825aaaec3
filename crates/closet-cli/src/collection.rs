//! # Collection Subcommands
//!
//! `closet cart|wishlist|wardrobe <add|remove|qty|list|clear>`.
//!
//! Operates on the local durable copy only. Items are given as a bare id or
//! as a JSON catalog record (`'{"_id":"p1","name":"Tee","price":499}'`).

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use closet_core::{CatalogItem, ItemId, ItemRef, Variant};
use closet_store::{AddOptions, CollectionStore, Mutation};

/// Arguments for a collection subcommand.
#[derive(Args, Debug)]
pub struct CollectionArgs {
    #[command(subcommand)]
    pub command: CollectionCommand,
}

/// Size/color selection shared by the mutating commands.
#[derive(Args, Debug, Clone, Default)]
pub struct VariantArgs {
    /// Size of the entry (default: the only stored size of the item, else
    /// the item's first size, else M).
    #[arg(long)]
    pub size: Option<String>,
    /// Color of the entry (default: the only stored color of the item, else
    /// the item's first color, else White).
    #[arg(long)]
    pub color: Option<String>,
}

impl VariantArgs {
    /// The stored variant of `id` matching the given flags when exactly one
    /// does; otherwise the flags over the default variant.
    fn resolve(&self, store: &CollectionStore, id: &ItemId) -> Variant {
        let mut matching = store.variants_of(id).into_iter().filter(|v| {
            self.size.as_ref().map_or(true, |size| &v.size == size)
                && self.color.as_ref().map_or(true, |color| &v.color == color)
        });
        match (matching.next(), matching.next()) {
            (Some(only), None) => only,
            _ => Variant::for_item(&CatalogItem::default(), self.size.as_deref(), self.color.as_deref()),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum CollectionCommand {
    /// Add an item, merging with an existing entry of the same variant.
    Add {
        /// Item id or JSON catalog record.
        item: String,
        #[command(flatten)]
        variant: VariantArgs,
        /// Quantity to add.
        #[arg(long, default_value_t = 1)]
        qty: u32,
    },
    /// Remove one entry.
    Remove {
        id: String,
        #[command(flatten)]
        variant: VariantArgs,
    },
    /// Change an entry's quantity by a signed delta. Reaching zero removes it.
    Qty {
        id: String,
        #[arg(allow_hyphen_values = true)]
        delta: i64,
        #[command(flatten)]
        variant: VariantArgs,
    },
    /// Print every entry and the totals.
    List {
        /// Print the stored JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Remove every entry.
    Clear,
}

/// Execute a collection subcommand against `store`.
pub fn run_collection(args: &CollectionArgs, store: &CollectionStore) -> Result<u8> {
    let kind = store.kind();
    match &args.command {
        CollectionCommand::Add { item, variant, qty } => {
            let item = parse_item(item)?;
            let options = AddOptions {
                size: variant.size.clone(),
                color: variant.color.clone(),
                quantity: Some(*qty),
            };
            let ((id, variant), mutation) = store
                .try_add(&item, &options)
                .with_context(|| format!("cannot add item to {kind}"))?;
            let verb = if mutation == Mutation::Added { "added" } else { "incremented" };
            println!("OK: {verb} {id} ({variant}) in {kind}");
        }
        CollectionCommand::Remove { id, variant } => {
            let id = parse_id(id)?;
            let variant = variant.resolve(store, &id);
            match store.remove(&id, &variant) {
                Mutation::Unchanged => {
                    println!("No entry {id} ({variant}) in {kind}");
                    return Ok(1);
                }
                _ => println!("OK: removed {id} ({variant}) from {kind}"),
            }
        }
        CollectionCommand::Qty { id, delta, variant } => {
            let id = parse_id(id)?;
            let variant = variant.resolve(store, &id);
            match store.update_quantity(&id, &variant, *delta) {
                Mutation::Unchanged => {
                    println!("No entry {id} ({variant}) in {kind}");
                    return Ok(1);
                }
                Mutation::Removed => println!("OK: removed {id} ({variant}) from {kind}"),
                _ => {
                    let quantity = store.get(&id, &variant).map_or(0, |e| e.quantity);
                    println!("OK: {id} ({variant}) quantity is now {quantity}");
                }
            }
        }
        CollectionCommand::List { json } => {
            let entries = store.entries();
            if *json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("{kind} is empty.");
            } else {
                println!("{} ({} entries):", capitalize(kind.storage_key()), entries.len());
                for entry in &entries {
                    println!(
                        "  {} {:<24} {:<12} x{:<3} {:>10.2}",
                        entry.identity,
                        entry.payload_snapshot.display_name(),
                        entry.variant.to_string(),
                        entry.quantity,
                        entry.line_value(),
                    );
                }
                println!("  Items: {}", store.total_count());
                println!("  Total: {:.2}", store.total_value());
            }
        }
        CollectionCommand::Clear => {
            store.clear();
            println!("OK: cleared {kind}");
        }
    }
    Ok(0)
}

/// Parse an item argument: JSON record when it starts with `{`, else a bare id.
pub fn parse_item(raw: &str) -> Result<ItemRef> {
    let raw = raw.trim();
    if raw.starts_with('{') {
        let record: CatalogItem =
            serde_json::from_str(raw).context("item argument is not a valid JSON catalog record")?;
        Ok(ItemRef::from(record))
    } else {
        Ok(ItemRef::Id(raw.to_string()))
    }
}

fn parse_id(raw: &str) -> Result<ItemId> {
    ItemId::new(raw).context("item id must not be empty")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
