//! # closet-core — Foundational Types for the Closet Stack
//!
//! Leaf crate of the workspace. Defines the catalog record shape, the
//! canonical item identity, the shop classification rules, and the error
//! taxonomy shared by the collection stores and the listing controller.
//!
//! ## Key Design Principles
//!
//! 1. **One identity per item.** Catalog payloads arrive as raw records,
//!    populated references, or bare ids. [`resolve_identity`] collapses them
//!    into an [`ItemId`]; an unresolvable payload never reaches a collection.
//!
//! 2. **Newtypes for identifiers.** `ItemId` and `UserId` are distinct types.
//!    No bare strings for identifiers past the deserialization boundary.
//!
//! 3. **Pure shop predicates.** [`belongs_to_shop`] is a function of the item,
//!    the shop id, and the evaluation instant. No I/O, no clocks.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `closet-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod catalog;
pub mod error;
pub mod identity;
pub mod shop;

pub use catalog::CatalogItem;
pub use error::{ClosetError, StorageError};
pub use identity::{resolve_identity, EntryKey, ItemId, ItemRef, UserId, Variant};
pub use shop::{belongs_to_shop, effective_discount, has_any_discount, ShopRule, SHOP_RULES};
