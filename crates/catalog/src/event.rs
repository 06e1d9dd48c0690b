//! Notifications emitted after a catalog change has committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgecart_core::{ProductId, ProductOptionId, ProductRootId};
use forgecart_events::Event;

use crate::model::RootGraph;

/// Event: ProductRootCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRootCreated {
    pub product_root_id: ProductRootId,
    pub sku_prefix: String,
    /// Variant SKUs in creation order.
    pub skus: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductRootArchived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRootArchived {
    pub product_root_id: ProductRootId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductArchived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductArchived {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdated {
    pub product_id: ProductId,
    pub sku: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductOptionArchived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOptionArchived {
    pub product_option_id: ProductOptionId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogEvent {
    ProductRootCreated(ProductRootCreated),
    ProductRootArchived(ProductRootArchived),
    ProductArchived(ProductArchived),
    ProductUpdated(ProductUpdated),
    ProductOptionArchived(ProductOptionArchived),
}

impl CatalogEvent {
    pub fn root_created(graph: &RootGraph) -> Self {
        CatalogEvent::ProductRootCreated(ProductRootCreated {
            product_root_id: graph.root.id,
            sku_prefix: graph.root.sku_prefix.clone(),
            skus: graph.products.iter().map(|p| p.sku.clone()).collect(),
            occurred_at: graph.root.lifecycle.created_on,
        })
    }
}

impl Event for CatalogEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CatalogEvent::ProductRootCreated(_) => "catalog.product_root.created",
            CatalogEvent::ProductRootArchived(_) => "catalog.product_root.archived",
            CatalogEvent::ProductArchived(_) => "catalog.product.archived",
            CatalogEvent::ProductUpdated(_) => "catalog.product.updated",
            CatalogEvent::ProductOptionArchived(_) => "catalog.product_option.archived",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CatalogEvent::ProductRootCreated(e) => e.occurred_at,
            CatalogEvent::ProductRootArchived(e) => e.occurred_at,
            CatalogEvent::ProductArchived(e) => e.occurred_at,
            CatalogEvent::ProductUpdated(e) => e.occurred_at,
            CatalogEvent::ProductOptionArchived(e) => e.occurred_at,
        }
    }
}
