//! # closet-listing — Progressive Listing Loader
//!
//! Loads paginated catalog listings for listing views: cancellable
//! sequences, on-demand next pages, an incremental reveal mode, and the
//! skeleton count views render as placeholders. Loaded items are classified
//! through the shop rules of `closet-core` before display.
//!
//! The controller talks to a [`ListingSource`]; the HTTP implementation is
//! `closet_client::ListingClient`.

pub mod controller;
pub mod source;

pub use controller::{
    ControllerConfig, FetchOutcome, FetchPage, FetchStatus, ListingSnapshot,
    ProgressiveFetchController,
};
pub use source::ListingSource;
