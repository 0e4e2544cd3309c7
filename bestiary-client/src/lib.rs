//! Bestiary Client - Catalog Access and Browsing
//!
//! REST access to the creature catalog with a read-through expiring cache,
//! an offline fallback set, bulk loading through the parallel mapper, and
//! the view-model operations the `bestiary` binary renders.

pub mod api_client;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fallback;
pub mod source;
pub mod telemetry;
pub mod view;

pub use api_client::RestClient;
pub use catalog::{Catalog, Dataset, CATALOG_NAMESPACE};
pub use error::{ClientError, ClientResult};
pub use source::CatalogSource;
