//! # Catalog Records
//!
//! The catalog record as returned by the product APIs and as snapshotted into
//! collection entries.
//!
//! Fields use `#[serde(default)]` for resilience against schema evolution in
//! the catalog service. Unknown fields are captured in `extra` so that a
//! snapshot written back to storage carries everything it was read with.

use serde::{Deserialize, Serialize};

use crate::identity::ItemRef;

/// A product as the catalog service describes it.
///
/// Every field is optional: listing endpoints, wishlist endpoints, and stored
/// snapshots all disagree on which fields they populate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// Primary key (`_id`).
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub primary_id: Option<String>,
    /// Alias key (`id`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Nested product reference, populated or bare.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ItemRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Current selling price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// List price before discount.
    #[serde(default, alias = "mrp", skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    /// Declared discount percentage.
    #[serde(default, alias = "discountPercentage", skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, alias = "numReviews", skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sizes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
    /// When the product was added to the catalog (RFC 3339 or `YYYY-MM-DD`).
    #[serde(default, alias = "addedAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Fields this client does not model.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CatalogItem {
    /// A record carrying only a primary key.
    pub fn from_id(id: impl Into<String>) -> Self {
        Self {
            primary_id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Display name, falling back to the nested reference's name and then to
    /// a generic label.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        if let Some(ItemRef::Record(nested)) = &self.product {
            if let Some(name) = nested.name.as_deref().filter(|n| !n.trim().is_empty()) {
                return name.to_string();
            }
        }
        "Item".to_string()
    }

    /// Current price, falling back to the nested reference's price.
    pub fn effective_price(&self) -> Option<f64> {
        self.price.or_else(|| match &self.product {
            Some(ItemRef::Record(nested)) => nested.price,
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_aliases_and_keeps_unknown_fields() {
        let item: CatalogItem = serde_json::from_value(serde_json::json!({
            "_id": "p1",
            "name": "Linen Shirt",
            "price": 799,
            "mrp": 1299,
            "numReviews": 42,
            "brand": "Kora"
        }))
        .unwrap();
        assert_eq!(item.primary_id.as_deref(), Some("p1"));
        assert_eq!(item.original_price, Some(1299.0));
        assert_eq!(item.review_count, Some(42));
        assert_eq!(item.extra.get("brand"), Some(&serde_json::json!("Kora")));
    }

    #[test]
    fn display_name_falls_back_to_nested_reference() {
        let item: CatalogItem = serde_json::from_value(serde_json::json!({
            "product": { "_id": "p9", "name": "Wool Coat", "price": 4999 }
        }))
        .unwrap();
        assert_eq!(item.display_name(), "Wool Coat");
        assert_eq!(item.effective_price(), Some(4999.0));
        assert_eq!(CatalogItem::from_id("x").display_name(), "Item");
    }
}
