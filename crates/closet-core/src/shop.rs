//! # Shop Predicates
//!
//! Classifies catalog items into named shop listings ("under-999", "deals",
//! "new-arrivals", ...). Every shop is one row of [`SHOP_RULES`]; a row is a
//! conjunction of numeric thresholds over price, rating, review count,
//! discount, and catalog age.
//!
//! ## Discount
//!
//! The effective discount is the larger of the declared percentage and the
//! percentage implied by `originalPrice` / `price` (rounded to the nearest
//! integer). An item "has any discount" when the declared percentage is
//! positive or the original price exceeds the current one.
//!
//! ## Age
//!
//! "Recently added" means the parsed `createdAt` lies no more than
//! [`RECENT_WINDOW_DAYS`] before the evaluation instant. A timestamp that
//! fails to parse is treated as infinitely old.
//!
//! Unknown shop ids admit every item.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::catalog::CatalogItem;

/// Window for "recently added" rules.
pub const RECENT_WINDOW_DAYS: i64 = 30;

/// Upper price bound of a shop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceBound {
    /// `price < limit`.
    Below(f64),
    /// `price <= limit`.
    AtMost(f64),
}

impl PriceBound {
    fn admits(self, price: f64) -> bool {
        match self {
            Self::Below(limit) => price < limit,
            Self::AtMost(limit) => price <= limit,
        }
    }
}

/// Thresholds defining one shop. `None` / `false` fields do not constrain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShopRule {
    pub id: &'static str,
    pub max_price: Option<PriceBound>,
    pub min_rating: Option<f64>,
    pub min_reviews: Option<u64>,
    pub min_discount: Option<f64>,
    pub requires_discount: bool,
    pub recent_only: bool,
}

impl ShopRule {
    const OPEN: Self = Self {
        id: "",
        max_price: None,
        min_rating: None,
        min_reviews: None,
        min_discount: None,
        requires_discount: false,
        recent_only: false,
    };

    /// Evaluate the rule against an item at `now`.
    pub fn admits(&self, item: &CatalogItem, now: DateTime<Utc>) -> bool {
        if let Some(bound) = self.max_price {
            match item.effective_price() {
                Some(price) if bound.admits(price) => {}
                _ => return false,
            }
        }
        if let Some(min) = self.min_rating {
            if item.rating.unwrap_or(0.0) < min {
                return false;
            }
        }
        if let Some(min) = self.min_reviews {
            if item.review_count.unwrap_or(0) < min {
                return false;
            }
        }
        if let Some(min) = self.min_discount {
            if effective_discount(item) < min {
                return false;
            }
        }
        if self.requires_discount && !has_any_discount(item) {
            return false;
        }
        if self.recent_only && !is_recently_added(item, now) {
            return false;
        }
        true
    }
}

/// The fixed shop table.
pub const SHOP_RULES: &[ShopRule] = &[
    ShopRule {
        id: "under-499",
        max_price: Some(PriceBound::Below(499.0)),
        ..ShopRule::OPEN
    },
    ShopRule {
        id: "under-999",
        max_price: Some(PriceBound::Below(999.0)),
        ..ShopRule::OPEN
    },
    ShopRule {
        id: "deals",
        max_price: Some(PriceBound::AtMost(1000.0)),
        requires_discount: true,
        ..ShopRule::OPEN
    },
    ShopRule {
        id: "big-discounts",
        min_discount: Some(40.0),
        ..ShopRule::OPEN
    },
    ShopRule {
        id: "top-rated",
        min_rating: Some(4.5),
        min_reviews: Some(10),
        ..ShopRule::OPEN
    },
    ShopRule {
        id: "bestsellers",
        min_reviews: Some(100),
        ..ShopRule::OPEN
    },
    ShopRule {
        id: "new-arrivals",
        recent_only: true,
        ..ShopRule::OPEN
    },
    ShopRule {
        id: "fresh-deals",
        requires_discount: true,
        recent_only: true,
        ..ShopRule::OPEN
    },
];

/// Look up the rule for a shop id.
pub fn rule_for(shop_id: &str) -> Option<&'static ShopRule> {
    SHOP_RULES.iter().find(|rule| rule.id == shop_id)
}

/// Whether `item` belongs to the shop `shop_id` at instant `now`.
pub fn belongs_to_shop(item: &CatalogItem, shop_id: &str, now: DateTime<Utc>) -> bool {
    match rule_for(shop_id) {
        Some(rule) => rule.admits(item, now),
        None => true,
    }
}

/// Declared discount, or the price-implied one when larger.
pub fn effective_discount(item: &CatalogItem) -> f64 {
    let declared = item.discount.unwrap_or(0.0);
    match (item.original_price, item.effective_price()) {
        (Some(original), Some(current)) if original > 0.0 => {
            let implied = ((original - current) / original * 100.0).round();
            declared.max(implied)
        }
        _ => declared,
    }
}

pub fn has_any_discount(item: &CatalogItem) -> bool {
    if item.discount.unwrap_or(0.0) > 0.0 {
        return true;
    }
    matches!(
        (item.original_price, item.effective_price()),
        (Some(original), Some(current)) if original > current
    )
}

/// Whether the item was added within [`RECENT_WINDOW_DAYS`] of `now`.
pub fn is_recently_added(item: &CatalogItem, now: DateTime<Utc>) -> bool {
    match item.created_at.as_deref().and_then(parse_added_at) {
        Some(added) => now.signed_duration_since(added) <= Duration::days(RECENT_WINDOW_DAYS),
        None => false,
    }
}

fn parse_added_at(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
