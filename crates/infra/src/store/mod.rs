//! Catalog Store boundary.
//!
//! The store is a capability set: one trait per entity plus [`Transactional`]
//! for unit-of-work control. Every operation takes an explicit transaction
//! handle and none of them opens, commits or rolls back on its own; that is the
//! orchestrators' job.
//!
//! ## Liveness
//!
//! - `*_exists(id)` and the name/value lookups only see live rows
//!   (`archived_on IS NULL`).
//! - SKU and SKU-prefix lookups see every row: those keys are unique across
//!   archived rows too, so a retired SKU is never reissued.
//! - `get_*` returns the row whatever its state; callers check
//!   [`forgecart_core::Entity::is_live`].
//! - `archive_*(id)` only stamps live rows and returns
//!   [`StoreError::RowNotFound`] otherwise, so archival is monotonic.
//!
//! ## Constraint errors
//!
//! Unique-key collisions surface as [`StoreError::UniqueViolation`] at insert
//! time or at commit time, whichever the backend detects first.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use forgecart_catalog::{
    NewProduct, NewProductOption, NewProductOptionValue, NewProductRoot, Product, ProductOption,
    ProductOptionValue, ProductRoot, ProductVariantBridge,
};
use forgecart_core::{
    ProductId, ProductOptionId, ProductOptionValueId, ProductRootId, VariantBridgeId,
};

pub mod in_memory;
pub mod postgres;

pub use in_memory::{
    EntityKind, FailPoint, InMemoryCatalogStore, InMemoryTx, StoreStats, WriteAction, WriteOp,
};
pub use postgres::PostgresCatalogStore;

/// Store operation error.
///
/// These are infrastructure errors; the orchestration layer maps them onto
/// catalog outcomes (see `CatalogError`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// A referenced row does not exist.
    #[error("foreign key violated: {0}")]
    ForeignKeyViolation(String),

    /// The target row is missing or no longer live.
    #[error("row not found: {0}")]
    RowNotFound(String),

    /// Anything else: connectivity, pool, serialization, injected faults.
    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn unique(constraint: impl Into<String>) -> Self {
        Self::UniqueViolation {
            constraint: constraint.into(),
        }
    }
}

/// Unit-of-work control.
#[async_trait]
pub trait Transactional: Send + Sync {
    /// Active transaction handle. Dropping it without `commit` discards its
    /// writes.
    type Tx: Send;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError>;

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ProductRootStore: Transactional {
    async fn product_root_exists(
        &self,
        tx: &mut Self::Tx,
        id: ProductRootId,
    ) -> Result<bool, StoreError>;

    async fn product_root_with_sku_prefix_exists(
        &self,
        tx: &mut Self::Tx,
        sku_prefix: &str,
    ) -> Result<bool, StoreError>;

    async fn get_product_root(
        &self,
        tx: &mut Self::Tx,
        id: ProductRootId,
    ) -> Result<Option<ProductRoot>, StoreError>;

    async fn get_product_root_by_sku_prefix(
        &self,
        tx: &mut Self::Tx,
        sku_prefix: &str,
    ) -> Result<Option<ProductRoot>, StoreError>;

    async fn create_product_root(
        &self,
        tx: &mut Self::Tx,
        new: &NewProductRoot,
    ) -> Result<ProductRoot, StoreError>;

    /// Persist the mutable fields of a live `root` (everything but id, SKU
    /// prefix and lifecycle).
    async fn update_product_root(
        &self,
        tx: &mut Self::Tx,
        root: &ProductRoot,
    ) -> Result<DateTime<Utc>, StoreError>;

    async fn archive_product_root(
        &self,
        tx: &mut Self::Tx,
        id: ProductRootId,
    ) -> Result<DateTime<Utc>, StoreError>;
}

/// Options rows. Returned options never carry `values`; load them through
/// [`ProductOptionValueStore`].
#[async_trait]
pub trait ProductOptionStore: Transactional {
    async fn product_option_exists(
        &self,
        tx: &mut Self::Tx,
        id: ProductOptionId,
    ) -> Result<bool, StoreError>;

    async fn product_option_with_name_exists(
        &self,
        tx: &mut Self::Tx,
        root_id: ProductRootId,
        name: &str,
    ) -> Result<bool, StoreError>;

    async fn get_product_option(
        &self,
        tx: &mut Self::Tx,
        id: ProductOptionId,
    ) -> Result<Option<ProductOption>, StoreError>;

    async fn get_product_option_by_name(
        &self,
        tx: &mut Self::Tx,
        root_id: ProductRootId,
        name: &str,
    ) -> Result<Option<ProductOption>, StoreError>;

    /// Live options of a root, in creation order.
    async fn list_product_options(
        &self,
        tx: &mut Self::Tx,
        root_id: ProductRootId,
    ) -> Result<Vec<ProductOption>, StoreError>;

    async fn create_product_option(
        &self,
        tx: &mut Self::Tx,
        new: &NewProductOption,
    ) -> Result<ProductOption, StoreError>;

    async fn update_product_option(
        &self,
        tx: &mut Self::Tx,
        id: ProductOptionId,
        name: &str,
    ) -> Result<DateTime<Utc>, StoreError>;

    async fn archive_product_option(
        &self,
        tx: &mut Self::Tx,
        id: ProductOptionId,
    ) -> Result<DateTime<Utc>, StoreError>;
}

#[async_trait]
pub trait ProductOptionValueStore: Transactional {
    async fn product_option_value_exists(
        &self,
        tx: &mut Self::Tx,
        id: ProductOptionValueId,
    ) -> Result<bool, StoreError>;

    async fn product_option_value_for_option_exists(
        &self,
        tx: &mut Self::Tx,
        option_id: ProductOptionId,
        value: &str,
    ) -> Result<bool, StoreError>;

    async fn get_product_option_value(
        &self,
        tx: &mut Self::Tx,
        id: ProductOptionValueId,
    ) -> Result<Option<ProductOptionValue>, StoreError>;

    async fn get_product_option_value_for_option(
        &self,
        tx: &mut Self::Tx,
        option_id: ProductOptionId,
        value: &str,
    ) -> Result<Option<ProductOptionValue>, StoreError>;

    /// Live values of an option, in creation order.
    async fn list_product_option_values(
        &self,
        tx: &mut Self::Tx,
        option_id: ProductOptionId,
    ) -> Result<Vec<ProductOptionValue>, StoreError>;

    async fn create_product_option_value(
        &self,
        tx: &mut Self::Tx,
        new: &NewProductOptionValue,
    ) -> Result<ProductOptionValue, StoreError>;

    async fn update_product_option_value(
        &self,
        tx: &mut Self::Tx,
        id: ProductOptionValueId,
        value: &str,
    ) -> Result<DateTime<Utc>, StoreError>;

    async fn archive_product_option_value(
        &self,
        tx: &mut Self::Tx,
        id: ProductOptionValueId,
    ) -> Result<DateTime<Utc>, StoreError>;

    /// Archive every live value of an option; returns the number stamped.
    async fn archive_product_option_values_for_option(
        &self,
        tx: &mut Self::Tx,
        option_id: ProductOptionId,
    ) -> Result<u64, StoreError>;
}

/// Variant rows. Returned products carry `applicable_option_values` resolved
/// from their live bridges, in bridge order.
#[async_trait]
pub trait ProductStore: Transactional {
    async fn product_exists(&self, tx: &mut Self::Tx, id: ProductId) -> Result<bool, StoreError>;

    async fn product_with_sku_exists(
        &self,
        tx: &mut Self::Tx,
        sku: &str,
    ) -> Result<bool, StoreError>;

    async fn get_product(
        &self,
        tx: &mut Self::Tx,
        id: ProductId,
    ) -> Result<Option<Product>, StoreError>;

    async fn get_product_by_sku(
        &self,
        tx: &mut Self::Tx,
        sku: &str,
    ) -> Result<Option<Product>, StoreError>;

    /// Live variants of a root, in creation order.
    async fn list_products(
        &self,
        tx: &mut Self::Tx,
        root_id: ProductRootId,
    ) -> Result<Vec<Product>, StoreError>;

    async fn create_product(
        &self,
        tx: &mut Self::Tx,
        new: &NewProduct,
    ) -> Result<Product, StoreError>;

    /// Persist the mutable fields of `product` (everything but ids, SKU,
    /// option summary and lifecycle).
    async fn update_product(
        &self,
        tx: &mut Self::Tx,
        product: &Product,
    ) -> Result<DateTime<Utc>, StoreError>;

    async fn archive_product(
        &self,
        tx: &mut Self::Tx,
        id: ProductId,
    ) -> Result<DateTime<Utc>, StoreError>;
}

#[async_trait]
pub trait VariantBridgeStore: Transactional {
    async fn variant_bridge_exists(
        &self,
        tx: &mut Self::Tx,
        id: VariantBridgeId,
    ) -> Result<bool, StoreError>;

    async fn get_variant_bridge(
        &self,
        tx: &mut Self::Tx,
        id: VariantBridgeId,
    ) -> Result<Option<ProductVariantBridge>, StoreError>;

    /// Link one variant to many option values in a single batch. Bridges are
    /// returned in the order of `value_ids`.
    async fn create_variant_bridges(
        &self,
        tx: &mut Self::Tx,
        product_id: ProductId,
        value_ids: &[ProductOptionValueId],
    ) -> Result<Vec<ProductVariantBridge>, StoreError>;

    /// Repoint a live bridge at another variant or option value.
    async fn update_variant_bridge(
        &self,
        tx: &mut Self::Tx,
        bridge: &ProductVariantBridge,
    ) -> Result<DateTime<Utc>, StoreError>;

    async fn archive_variant_bridges_for_product(
        &self,
        tx: &mut Self::Tx,
        product_id: ProductId,
    ) -> Result<u64, StoreError>;

    async fn archive_variant_bridges_for_option_value(
        &self,
        tx: &mut Self::Tx,
        value_id: ProductOptionValueId,
    ) -> Result<u64, StoreError>;
}

/// The full capability set the orchestrators need.
pub trait CatalogStore:
    ProductRootStore
    + ProductOptionStore
    + ProductOptionValueStore
    + ProductStore
    + VariantBridgeStore
    + Clone
    + 'static
{
}

impl<S> CatalogStore for S where
    S: ProductRootStore
        + ProductOptionStore
        + ProductOptionValueStore
        + ProductStore
        + VariantBridgeStore
        + Clone
        + 'static
{
}
