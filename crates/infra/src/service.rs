//! Catalog service facade.
//!
//! Bundles the orchestrators over one store and publishes a [`CatalogEvent`]
//! after each successful commit:
//!
//! ```text
//! request → orchestrator → commit ─┬→ result to caller
//!                                  └→ bus.publish on a blocking thread   not awaited
//! ```
//!
//! Publication runs detached from the caller: on the current tokio runtime's
//! blocking pool when there is one, on a plain thread otherwise. A failed
//! publish is logged and never turns a committed change into an error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use forgecart_catalog::{
    CatalogCreation, CatalogEvent, OptionCreation, Product, ProductArchived, ProductOption,
    ProductOptionArchived, ProductOptionValue, ProductPatch, ProductRootArchived, ProductUpdated,
    RootGraph,
};
use forgecart_core::{ProductId, ProductOptionId, ProductOptionValueId, ProductRootId};
use forgecart_events::{Event, EventBus, EventEnvelope};

use crate::archive::{ArchiveTarget, CatalogArchiver};
use crate::commit::CatalogCommitter;
use crate::config::CatalogConfig;
use crate::edit::CatalogEditor;
use crate::error::CatalogResult;
use crate::read::CatalogReader;
use crate::store::CatalogStore;

pub struct CatalogService<S, B> {
    committer: CatalogCommitter<S>,
    archiver: CatalogArchiver<S>,
    editor: CatalogEditor<S>,
    reader: CatalogReader<S>,
    bus: Arc<B>,
}

impl<S, B> CatalogService<S, B>
where
    S: CatalogStore,
    B: EventBus<EventEnvelope<CatalogEvent>> + 'static,
{
    pub fn new(store: S, bus: Arc<B>) -> Self {
        Self {
            committer: CatalogCommitter::new(store.clone()),
            archiver: CatalogArchiver::new(store.clone()),
            editor: CatalogEditor::new(store.clone()),
            reader: CatalogReader::new(store),
            bus,
        }
    }

    /// Build a service whose limits come from `config`.
    pub fn from_config(store: S, bus: Arc<B>, config: &CatalogConfig) -> Self {
        Self::new(store, bus).with_max_variants(config.max_variants)
    }

    pub fn with_max_variants(mut self, max_variants: Option<usize>) -> Self {
        self.committer = self.committer.with_max_variants(max_variants);
        self
    }

    pub async fn commit_catalog(&self, payload: &CatalogCreation) -> CatalogResult<RootGraph> {
        let graph = self.committer.commit_catalog(payload).await?;
        self.notify(CatalogEvent::root_created(&graph));
        Ok(graph)
    }

    pub async fn archive_catalog(
        &self,
        target: impl Into<ArchiveTarget>,
    ) -> CatalogResult<DateTime<Utc>> {
        let target = target.into();
        let occurred_at = self.archiver.archive_catalog(target).await?;
        self.notify(match target {
            ArchiveTarget::Root(product_root_id) => {
                CatalogEvent::ProductRootArchived(ProductRootArchived {
                    product_root_id,
                    occurred_at,
                })
            }
            ArchiveTarget::Variant(product_id) => CatalogEvent::ProductArchived(ProductArchived {
                product_id,
                occurred_at,
            }),
        });
        Ok(occurred_at)
    }

    pub async fn archive_option(&self, id: ProductOptionId) -> CatalogResult<DateTime<Utc>> {
        let occurred_at = self.archiver.archive_option(id).await?;
        self.notify(CatalogEvent::ProductOptionArchived(ProductOptionArchived {
            product_option_id: id,
            occurred_at,
        }));
        Ok(occurred_at)
    }

    pub async fn archive_option_value(
        &self,
        id: ProductOptionValueId,
    ) -> CatalogResult<DateTime<Utc>> {
        self.archiver.archive_option_value(id).await
    }

    pub async fn add_option(
        &self,
        root_id: ProductRootId,
        option: &OptionCreation,
    ) -> CatalogResult<ProductOption> {
        self.committer.add_option(root_id, option).await
    }

    pub async fn add_option_value(
        &self,
        option_id: ProductOptionId,
        value: &str,
    ) -> CatalogResult<ProductOptionValue> {
        self.committer.add_option_value(option_id, value).await
    }

    pub async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> CatalogResult<Product> {
        let product = self.editor.update_product(id, patch).await?;
        if let Some(occurred_at) = product.lifecycle.updated_on {
            self.notify(CatalogEvent::ProductUpdated(ProductUpdated {
                product_id: product.id,
                sku: product.sku.clone(),
                occurred_at,
            }));
        }
        Ok(product)
    }

    pub async fn rename_option(
        &self,
        id: ProductOptionId,
        name: &str,
    ) -> CatalogResult<ProductOption> {
        self.editor.rename_option(id, name).await
    }

    pub async fn update_option_value(
        &self,
        id: ProductOptionValueId,
        value: &str,
    ) -> CatalogResult<ProductOptionValue> {
        self.editor.update_option_value(id, value).await
    }

    pub async fn root_graph(&self, id: ProductRootId) -> CatalogResult<RootGraph> {
        self.reader.root_graph(id).await
    }

    pub async fn product_by_sku(&self, sku: &str) -> CatalogResult<Product> {
        self.reader.product_by_sku(sku).await
    }

    pub async fn sku_exists(&self, sku: &str) -> CatalogResult<bool> {
        self.reader.sku_exists(sku).await
    }

    fn notify(&self, event: CatalogEvent) {
        let bus = Arc::clone(&self.bus);
        let event_type = event.event_type();
        debug!(event_type, "dispatching catalog event");

        let publish = move || match bus.publish(EventEnvelope::wrap(event)) {
            Ok(delivered) => debug!(event_type, delivered, "catalog event published"),
            Err(err) => warn!(event_type, error = %err, "catalog event publish failed"),
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(publish);
            }
            Err(_) => {
                let spawned = std::thread::Builder::new()
                    .name("catalog-notify".into())
                    .spawn(publish);
                if let Err(err) = spawned {
                    warn!(event_type, error = %err, "could not start catalog event publisher");
                }
            }
        }
    }
}
