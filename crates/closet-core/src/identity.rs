//! # Item Identity
//!
//! Catalog payloads reach the collection stores in several shapes: a raw
//! catalog record, a record whose `product` field holds a populated
//! reference, or a bare reference id. [`resolve_identity`] collapses every
//! shape to one [`ItemId`].
//!
//! ## Precedence
//!
//! 1. The record's primary key (`_id`).
//! 2. The record's alias key (`id`).
//! 3. The nested `product` reference's primary key, or the reference itself
//!    when it is a bare id.
//!
//! Empty and whitespace-only strings count as absent. A payload with none of
//! the above has no identity; callers must abort the mutation.

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogItem;

/// Size used when neither the caller nor the item declares one.
pub const DEFAULT_SIZE: &str = "M";

/// Color used when neither the caller nor the item declares one.
pub const DEFAULT_COLOR: &str = "White";

/// Canonical identifier of a catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Build an identifier, rejecting empty and whitespace-only input.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == raw.len() {
            Some(Self(raw))
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of the signed-in user, as surfaced by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

/// A reference to a catalog item: a bare id or a (possibly partial) record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemRef {
    Id(String),
    Record(Box<CatalogItem>),
}

impl ItemRef {
    /// The payload to snapshot into a collection entry. A bare id becomes a
    /// record carrying only its primary key.
    pub fn to_record(&self) -> CatalogItem {
        match self {
            Self::Id(raw) => CatalogItem::from_id(raw.clone()),
            Self::Record(record) => (**record).clone(),
        }
    }
}

impl From<CatalogItem> for ItemRef {
    fn from(item: CatalogItem) -> Self {
        Self::Record(Box::new(item))
    }
}

/// Resolve the canonical identity of any item shape.
pub fn resolve_identity(item: &ItemRef) -> Option<ItemId> {
    match item {
        ItemRef::Id(raw) => ItemId::new(raw.as_str()),
        ItemRef::Record(record) => record_identity(record),
    }
}

fn record_identity(record: &CatalogItem) -> Option<ItemId> {
    if let Some(id) = record.primary_id.as_deref().and_then(ItemId::new) {
        return Some(id);
    }
    if let Some(id) = record.id.as_deref().and_then(ItemId::new) {
        return Some(id);
    }
    match record.product.as_ref()? {
        ItemRef::Id(raw) => ItemId::new(raw.as_str()),
        ItemRef::Record(nested) => nested.primary_id.as_deref().and_then(ItemId::new),
    }
}

/// Size and color of a collection entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Variant {
    pub size: String,
    pub color: String,
}

impl Variant {
    pub fn new(size: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            size: size.into(),
            color: color.into(),
        }
    }

    /// Effective variant for an item: explicit choice, else the item's first
    /// declared size and color, else [`DEFAULT_SIZE`] / [`DEFAULT_COLOR`].
    pub fn for_item(item: &CatalogItem, size: Option<&str>, color: Option<&str>) -> Self {
        let size = size
            .filter(|s| !s.trim().is_empty())
            .or_else(|| item.sizes.first().map(String::as_str))
            .unwrap_or(DEFAULT_SIZE);
        let color = color
            .filter(|c| !c.trim().is_empty())
            .or_else(|| item.colors.first().map(String::as_str))
            .unwrap_or(DEFAULT_COLOR);
        Self::new(size, color)
    }
}

impl Default for Variant {
    fn default() -> Self {
        Self::new(DEFAULT_SIZE, DEFAULT_COLOR)
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.size, self.color)
    }
}

/// Uniqueness key of a collection entry.
pub type EntryKey = (ItemId, Variant);


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn key() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            Just(Some(String::new())),
            Just(Some("   ".to_string())),
            "[a-z0-9-]{1,12}".prop_map(Some),
        ]
    }

    proptest! {
        /// Resolution follows primary, alias, nested precedence and never
        /// yields a blank identity.
        #[test]
        fn resolution_follows_precedence(primary in key(), alias in key(), nested in key()) {
            let record = CatalogItem {
                primary_id: primary.clone(),
                id: alias.clone(),
                product: nested.clone().map(ItemRef::Id),
                ..CatalogItem::default()
            };
            let expected = [primary, alias, nested]
                .into_iter()
                .flatten()
                .find(|k| !k.trim().is_empty());
            let resolved = resolve_identity(&ItemRef::from(record));
            prop_assert_eq!(resolved.as_ref().map(ItemId::as_str), expected.as_deref());
        }
    }
}
