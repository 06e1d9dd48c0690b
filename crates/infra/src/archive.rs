//! Archive Orchestrator.
//!
//! Soft-deletes a root graph (or part of it) inside one transaction. Children
//! are stamped before their parents:
//!
//! ```text
//! root:    bridges of live variants → variants → option values → options → root
//! variant: its bridges → variant
//! option:  bridges of its live values → values → option
//! value:   its bridges → value
//! ```
//!
//! The target must be live. Archiving something already archived is a
//! not-found and writes nothing.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use forgecart_core::{ProductId, ProductOptionId, ProductOptionValueId, ProductRootId};

use crate::error::{CatalogError, CatalogResult};
use crate::store::CatalogStore;
use crate::transaction::abort;

/// What to archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveTarget {
    Root(ProductRootId),
    Variant(ProductId),
}

impl From<ProductRootId> for ArchiveTarget {
    fn from(id: ProductRootId) -> Self {
        ArchiveTarget::Root(id)
    }
}

impl From<ProductId> for ArchiveTarget {
    fn from(id: ProductId) -> Self {
        ArchiveTarget::Variant(id)
    }
}

#[derive(Debug, Clone)]
pub struct CatalogArchiver<S> {
    store: S,
}

impl<S> CatalogArchiver<S>
where
    S: CatalogStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Archive a root with everything under it, or a single variant.
    ///
    /// Returns the archive timestamp of the target row.
    #[instrument(skip(self), err)]
    pub async fn archive_catalog(&self, target: ArchiveTarget) -> CatalogResult<DateTime<Utc>> {
        let mut tx = self.store.begin().await?;
        let result = match target {
            ArchiveTarget::Root(id) => self.archive_root_in(&mut tx, id).await,
            ArchiveTarget::Variant(id) => self.archive_variant_in(&mut tx, id).await,
        };
        let archived_on = match result {
            Ok(at) => at,
            Err(err) => {
                abort(&self.store, tx, "archive_catalog", &err).await;
                return Err(err);
            }
        };
        self.store.commit(tx).await?;

        info!(?target, %archived_on, "catalog archived");
        Ok(archived_on)
    }

    /// Archive one option, its values and the bridges pointing at them.
    /// Variants are left live.
    #[instrument(skip(self), fields(product_option_id = %id), err)]
    pub async fn archive_option(&self, id: ProductOptionId) -> CatalogResult<DateTime<Utc>> {
        let mut tx = self.store.begin().await?;
        let archived_on = match self.archive_option_in(&mut tx, id).await {
            Ok(at) => at,
            Err(err) => {
                abort(&self.store, tx, "archive_option", &err).await;
                return Err(err);
            }
        };
        self.store.commit(tx).await?;
        Ok(archived_on)
    }

    /// Archive one option value and the bridges pointing at it.
    #[instrument(skip(self), fields(product_option_value_id = %id), err)]
    pub async fn archive_option_value(
        &self,
        id: ProductOptionValueId,
    ) -> CatalogResult<DateTime<Utc>> {
        let mut tx = self.store.begin().await?;
        let archived_on = match self.archive_value_in(&mut tx, id).await {
            Ok(at) => at,
            Err(err) => {
                abort(&self.store, tx, "archive_option_value", &err).await;
                return Err(err);
            }
        };
        self.store.commit(tx).await?;
        Ok(archived_on)
    }

    async fn archive_root_in(
        &self,
        tx: &mut S::Tx,
        id: ProductRootId,
    ) -> CatalogResult<DateTime<Utc>> {
        if !self.store.product_root_exists(tx, id).await? {
            return Err(CatalogError::not_found(format!("product root {id}")));
        }

        let products = self.store.list_products(tx, id).await?;
        let mut bridges = 0;
        for product in &products {
            bridges += self
                .store
                .archive_variant_bridges_for_product(tx, product.id)
                .await?;
        }
        for product in &products {
            self.store.archive_product(tx, product.id).await?;
        }

        let options = self.store.list_product_options(tx, id).await?;
        let mut values = 0;
        for option in &options {
            values += self
                .store
                .archive_product_option_values_for_option(tx, option.id)
                .await?;
        }
        for option in &options {
            self.store.archive_product_option(tx, option.id).await?;
        }

        debug!(
            bridges,
            products = products.len(),
            values,
            options = options.len(),
            "root cascade staged"
        );
        Ok(self.store.archive_product_root(tx, id).await?)
    }

    async fn archive_variant_in(
        &self,
        tx: &mut S::Tx,
        id: ProductId,
    ) -> CatalogResult<DateTime<Utc>> {
        if !self.store.product_exists(tx, id).await? {
            return Err(CatalogError::not_found(format!("product {id}")));
        }
        self.store.archive_variant_bridges_for_product(tx, id).await?;
        Ok(self.store.archive_product(tx, id).await?)
    }

    async fn archive_option_in(
        &self,
        tx: &mut S::Tx,
        id: ProductOptionId,
    ) -> CatalogResult<DateTime<Utc>> {
        if !self.store.product_option_exists(tx, id).await? {
            return Err(CatalogError::not_found(format!("product option {id}")));
        }

        let values = self.store.list_product_option_values(tx, id).await?;
        for value in &values {
            self.store
                .archive_variant_bridges_for_option_value(tx, value.id)
                .await?;
        }
        self.store
            .archive_product_option_values_for_option(tx, id)
            .await?;
        Ok(self.store.archive_product_option(tx, id).await?)
    }

    async fn archive_value_in(
        &self,
        tx: &mut S::Tx,
        id: ProductOptionValueId,
    ) -> CatalogResult<DateTime<Utc>> {
        if !self.store.product_option_value_exists(tx, id).await? {
            return Err(CatalogError::not_found(format!("product option value {id}")));
        }
        self.store
            .archive_variant_bridges_for_option_value(tx, id)
            .await?;
        Ok(self.store.archive_product_option_value(tx, id).await?)
    }
}
