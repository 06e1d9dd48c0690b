//! Catalog Commit Orchestrator.
//!
//! Turns a [`CatalogCreation`] into a persisted root graph as one unit of work:
//!
//! ```text
//! payload
//!   ↓
//! 1. validate (syntax, non-empty options, variant bound)     no transaction yet
//!   ↓
//! 2. begin
//!   ↓
//! 3. SKU prefix free?                                        conflict otherwise
//!   ↓
//! 4. root → options (each followed by its values)
//!   ↓
//! 5. variants in enumeration order, each followed by its bridges
//!   ↓
//! 6. commit                                                  rollback on any error
//! ```
//!
//! The uniqueness pre-checks only give a better error message; the store's
//! constraints decide. A unique violation raised at insert or commit time is
//! reported as a conflict exactly like a failed pre-check.

use tracing::{Span, info, instrument};

use forgecart_catalog::{
    CatalogCreation, NewProduct, NewProductOption, NewProductOptionValue, NewProductRoot,
    OptionCreation, ProductOption, ProductOptionValue, RootGraph, enumerate,
};
use forgecart_core::{DomainError, ProductOptionId, ProductRootId};

use crate::config::{CatalogConfig, DEFAULT_MAX_VARIANTS};
use crate::error::{CatalogError, CatalogResult};
use crate::store::CatalogStore;
use crate::transaction::abort;

#[derive(Debug, Clone)]
pub struct CatalogCommitter<S> {
    store: S,
    max_variants: Option<usize>,
}

impl<S> CatalogCommitter<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_variants: Some(DEFAULT_MAX_VARIANTS),
        }
    }

    pub fn from_config(store: S, config: &CatalogConfig) -> Self {
        Self::new(store).with_max_variants(config.max_variants)
    }

    /// Upper bound on variants per commit; `None` disables it.
    pub fn with_max_variants(mut self, max_variants: Option<usize>) -> Self {
        self.max_variants = max_variants;
        self
    }

    pub fn max_variants(&self) -> Option<usize> {
        self.max_variants
    }
}

impl<S> CatalogCommitter<S>
where
    S: CatalogStore,
{
    /// Create a root, its options and values, and every variant with its
    /// bridges, all or nothing.
    #[instrument(
        skip(self, payload),
        fields(
            sku_prefix = %payload.product.sku,
            option_count = payload.options.len(),
            product_root_id,
            variant_count
        ),
        err
    )]
    pub async fn commit_catalog(&self, payload: &CatalogCreation) -> CatalogResult<RootGraph> {
        payload.validate(self.max_variants)?;

        let mut tx = self.store.begin().await?;
        let graph = match self.create_graph(&mut tx, payload).await {
            Ok(graph) => graph,
            Err(err) => {
                abort(&self.store, tx, "commit_catalog", &err).await;
                return Err(err);
            }
        };
        self.store.commit(tx).await?;

        let span = Span::current();
        span.record("product_root_id", graph.root.id.get());
        span.record("variant_count", graph.products.len());
        info!(
            product_root_id = %graph.root.id,
            variants = graph.products.len(),
            "catalog committed"
        );
        Ok(graph)
    }

    /// Add an option (with its values) to a live root. Existing variants are
    /// left as they are.
    #[instrument(skip(self, option), fields(product_root_id = %root_id, name = %option.name), err)]
    pub async fn add_option(
        &self,
        root_id: ProductRootId,
        option: &OptionCreation,
    ) -> CatalogResult<ProductOption> {
        option.validate()?;

        let mut tx = self.store.begin().await?;
        let created = match self.add_option_in(&mut tx, root_id, option).await {
            Ok(created) => created,
            Err(err) => {
                abort(&self.store, tx, "add_option", &err).await;
                return Err(err);
            }
        };
        self.store.commit(tx).await?;
        Ok(created)
    }

    /// Add one value to a live option.
    #[instrument(skip(self), fields(product_option_id = %option_id), err)]
    pub async fn add_option_value(
        &self,
        option_id: ProductOptionId,
        value: &str,
    ) -> CatalogResult<ProductOptionValue> {
        if value.trim().is_empty() {
            return Err(DomainError::validation("option value cannot be empty").into());
        }

        let mut tx = self.store.begin().await?;
        let created = match self.add_value_in(&mut tx, option_id, value).await {
            Ok(created) => created,
            Err(err) => {
                abort(&self.store, tx, "add_option_value", &err).await;
                return Err(err);
            }
        };
        self.store.commit(tx).await?;
        Ok(created)
    }

    async fn create_graph(
        &self,
        tx: &mut S::Tx,
        payload: &CatalogCreation,
    ) -> CatalogResult<RootGraph> {
        let draft = &payload.product;

        if self
            .store
            .product_root_with_sku_prefix_exists(tx, &draft.sku)
            .await?
        {
            return Err(CatalogError::conflict(format!(
                "product with sku '{}' already exists",
                draft.sku
            )));
        }

        let root = self
            .store
            .create_product_root(tx, &NewProductRoot::from_draft(draft))
            .await?;

        let mut options = Vec::with_capacity(payload.options.len());
        for spec in &payload.options {
            options.push(self.create_option(tx, root.id, spec).await?);
        }

        let mut products = Vec::new();
        if options.is_empty() {
            let product = self
                .store
                .create_product(tx, &NewProduct::base(&root, draft))
                .await?;
            products.push(product);
        } else {
            for combination in enumerate(&options)? {
                let mut product = self
                    .store
                    .create_product(tx, &NewProduct::for_combination(&root, draft, &combination))
                    .await?;
                self.store
                    .create_variant_bridges(tx, product.id, &combination.value_ids())
                    .await?;
                product.applicable_option_values = combination.values().cloned().collect();
                products.push(product);
            }
        }

        Ok(RootGraph {
            root,
            options,
            products,
        })
    }

    async fn add_option_in(
        &self,
        tx: &mut S::Tx,
        root_id: ProductRootId,
        option: &OptionCreation,
    ) -> CatalogResult<ProductOption> {
        if !self.store.product_root_exists(tx, root_id).await? {
            return Err(CatalogError::not_found(format!("product root {root_id}")));
        }
        self.create_option(tx, root_id, option).await
    }

    async fn add_value_in(
        &self,
        tx: &mut S::Tx,
        option_id: ProductOptionId,
        value: &str,
    ) -> CatalogResult<ProductOptionValue> {
        if !self.store.product_option_exists(tx, option_id).await? {
            return Err(CatalogError::not_found(format!("product option {option_id}")));
        }
        self.create_value(tx, option_id, value).await
    }

    async fn create_option(
        &self,
        tx: &mut S::Tx,
        root_id: ProductRootId,
        spec: &OptionCreation,
    ) -> CatalogResult<ProductOption> {
        if self
            .store
            .product_option_with_name_exists(tx, root_id, &spec.name)
            .await?
        {
            return Err(CatalogError::conflict(format!(
                "product option '{}' already exists on root {root_id}",
                spec.name
            )));
        }

        let mut option = self
            .store
            .create_product_option(
                tx,
                &NewProductOption {
                    product_root_id: root_id,
                    name: spec.name.clone(),
                },
            )
            .await?;

        for value in &spec.values {
            let created = self.create_value(tx, option.id, value).await?;
            option.values.push(created);
        }
        Ok(option)
    }

    async fn create_value(
        &self,
        tx: &mut S::Tx,
        option_id: ProductOptionId,
        value: &str,
    ) -> CatalogResult<ProductOptionValue> {
        if self
            .store
            .product_option_value_for_option_exists(tx, option_id, value)
            .await?
        {
            return Err(CatalogError::conflict(format!(
                "product option value '{value}' already exists on option {option_id}"
            )));
        }

        Ok(self
            .store
            .create_product_option_value(
                tx,
                &NewProductOptionValue {
                    product_option_id: option_id,
                    value: value.to_string(),
                },
            )
            .await?)
    }
}
