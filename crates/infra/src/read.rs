//! Read paths over committed catalog state.
//!
//! Each read runs in its own transaction that is rolled back afterwards, so a
//! read never observes another caller's uncommitted work.

use tracing::{instrument, warn};

use forgecart_catalog::{Product, RootGraph};
use forgecart_core::{Entity, ProductRootId};

use crate::error::{CatalogError, CatalogResult};
use crate::store::CatalogStore;

#[derive(Debug, Clone)]
pub struct CatalogReader<S> {
    store: S,
}

impl<S> CatalogReader<S>
where
    S: CatalogStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// A live root with its live options (values loaded) and live variants.
    #[instrument(skip(self), fields(product_root_id = %id), err)]
    pub async fn root_graph(&self, id: ProductRootId) -> CatalogResult<RootGraph> {
        let mut tx = self.store.begin().await?;
        let result = self.load_graph(&mut tx, id).await;
        self.release(tx).await;
        result
    }

    /// A live variant by SKU.
    #[instrument(skip(self), err)]
    pub async fn product_by_sku(&self, sku: &str) -> CatalogResult<Product> {
        let mut tx = self.store.begin().await?;
        let result = self.store.get_product_by_sku(&mut tx, sku).await;
        self.release(tx).await;

        result?
            .filter(Entity::is_live)
            .ok_or_else(|| CatalogError::not_found(format!("product with sku '{sku}'")))
    }

    /// Whether any variant, live or archived, holds `sku`.
    #[instrument(skip(self), err)]
    pub async fn sku_exists(&self, sku: &str) -> CatalogResult<bool> {
        let mut tx = self.store.begin().await?;
        let result = self.store.product_with_sku_exists(&mut tx, sku).await;
        self.release(tx).await;
        Ok(result?)
    }

    async fn load_graph(&self, tx: &mut S::Tx, id: ProductRootId) -> CatalogResult<RootGraph> {
        let root = self
            .store
            .get_product_root(tx, id)
            .await?
            .filter(Entity::is_live)
            .ok_or_else(|| CatalogError::not_found(format!("product root {id}")))?;

        let mut options = self.store.list_product_options(tx, id).await?;
        for option in &mut options {
            option.values = self.store.list_product_option_values(tx, option.id).await?;
        }
        let products = self.store.list_products(tx, id).await?;

        Ok(RootGraph {
            root,
            options,
            products,
        })
    }

    async fn release(&self, tx: S::Tx) {
        if let Err(err) = self.store.rollback(tx).await {
            warn!(error = %err, "closing read transaction failed");
        }
    }
}
