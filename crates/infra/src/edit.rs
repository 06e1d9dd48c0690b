//! In-place edits of live catalog rows.
//!
//! A variant's SKU and option summary never change after creation; option and
//! value renames re-check uniqueness among the live siblings.

use tracing::instrument;

use forgecart_catalog::{Product, ProductOption, ProductOptionValue, ProductPatch};
use forgecart_core::{DomainError, Entity, ProductId, ProductOptionId, ProductOptionValueId};

use crate::error::{CatalogError, CatalogResult};
use crate::store::CatalogStore;
use crate::transaction::abort;

#[derive(Debug, Clone)]
pub struct CatalogEditor<S> {
    store: S,
}

impl<S> CatalogEditor<S>
where
    S: CatalogStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Apply a partial update to a live variant and return it as stored.
    #[instrument(skip(self, patch), fields(product_id = %id), err)]
    pub async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> CatalogResult<Product> {
        patch.validate()?;

        let mut tx = self.store.begin().await?;
        let updated = match self.update_product_in(&mut tx, id, patch).await {
            Ok(product) => product,
            Err(err) => {
                abort(&self.store, tx, "update_product", &err).await;
                return Err(err);
            }
        };
        self.store.commit(tx).await?;
        Ok(updated)
    }

    #[instrument(skip(self), fields(product_option_id = %id), err)]
    pub async fn rename_option(
        &self,
        id: ProductOptionId,
        name: &str,
    ) -> CatalogResult<ProductOption> {
        if name.trim().is_empty() {
            return Err(DomainError::validation("option name cannot be empty").into());
        }

        let mut tx = self.store.begin().await?;
        let renamed = match self.rename_option_in(&mut tx, id, name).await {
            Ok(option) => option,
            Err(err) => {
                abort(&self.store, tx, "rename_option", &err).await;
                return Err(err);
            }
        };
        self.store.commit(tx).await?;
        Ok(renamed)
    }

    #[instrument(skip(self), fields(product_option_value_id = %id), err)]
    pub async fn update_option_value(
        &self,
        id: ProductOptionValueId,
        value: &str,
    ) -> CatalogResult<ProductOptionValue> {
        if value.trim().is_empty() {
            return Err(DomainError::validation("option value cannot be empty").into());
        }

        let mut tx = self.store.begin().await?;
        let updated = match self.update_value_in(&mut tx, id, value).await {
            Ok(value) => value,
            Err(err) => {
                abort(&self.store, tx, "update_option_value", &err).await;
                return Err(err);
            }
        };
        self.store.commit(tx).await?;
        Ok(updated)
    }

    async fn update_product_in(
        &self,
        tx: &mut S::Tx,
        id: ProductId,
        patch: &ProductPatch,
    ) -> CatalogResult<Product> {
        let current = self
            .store
            .get_product(tx, id)
            .await?
            .filter(Entity::is_live)
            .ok_or_else(|| CatalogError::not_found(format!("product {id}")))?;

        let mut updated = patch.apply(&current);
        updated.lifecycle.updated_on = Some(self.store.update_product(tx, &updated).await?);
        Ok(updated)
    }

    async fn rename_option_in(
        &self,
        tx: &mut S::Tx,
        id: ProductOptionId,
        name: &str,
    ) -> CatalogResult<ProductOption> {
        let mut option = self
            .store
            .get_product_option(tx, id)
            .await?
            .filter(Entity::is_live)
            .ok_or_else(|| CatalogError::not_found(format!("product option {id}")))?;

        if option.name != name {
            if let Some(existing) = self
                .store
                .get_product_option_by_name(tx, option.product_root_id, name)
                .await?
            {
                if existing.id != id {
                    return Err(CatalogError::conflict(format!(
                        "product option '{name}' already exists on root {}",
                        option.product_root_id
                    )));
                }
            }
        }

        option.lifecycle.updated_on = Some(self.store.update_product_option(tx, id, name).await?);
        option.name = name.to_string();
        option.values = self.store.list_product_option_values(tx, id).await?;
        Ok(option)
    }

    async fn update_value_in(
        &self,
        tx: &mut S::Tx,
        id: ProductOptionValueId,
        value: &str,
    ) -> CatalogResult<ProductOptionValue> {
        let mut current = self
            .store
            .get_product_option_value(tx, id)
            .await?
            .filter(Entity::is_live)
            .ok_or_else(|| CatalogError::not_found(format!("product option value {id}")))?;

        if current.value != value
            && self
                .store
                .product_option_value_for_option_exists(tx, current.product_option_id, value)
                .await?
        {
            return Err(CatalogError::conflict(format!(
                "product option value '{value}' already exists on option {}",
                current.product_option_id
            )));
        }

        current.lifecycle.updated_on = Some(
            self.store
                .update_product_option_value(tx, id, value)
                .await?,
        );
        current.value = value.to_string();
        Ok(current)
    }
}
