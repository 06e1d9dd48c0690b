//! Infrastructure layer: catalog stores, transactional orchestration and
//! configuration.
//!
//! ```text
//! CatalogService ──┬─ CatalogCommitter  (commit_catalog, add_option, add_option_value)
//!                  ├─ CatalogArchiver   (archive_catalog, archive_option, archive_option_value)
//!                  ├─ CatalogEditor     (update_product, rename_option, update_option_value)
//!                  └─ CatalogReader     (root_graph, product_by_sku, sku_exists)
//!                          │
//!                          ▼
//!                    CatalogStore  (in-memory | Postgres)
//! ```

pub mod archive;
pub mod commit;
pub mod config;
pub mod edit;
pub mod error;
pub mod read;
pub mod service;
pub mod store;

mod transaction;

#[cfg(test)]
mod integration_tests;

pub use archive::{ArchiveTarget, CatalogArchiver};
pub use commit::CatalogCommitter;
pub use config::{CatalogConfig, ConfigError};
pub use edit::CatalogEditor;
pub use error::{CatalogError, CatalogResult};
pub use read::CatalogReader;
pub use service::CatalogService;
pub use store::{
    CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, StoreError, Transactional,
};
