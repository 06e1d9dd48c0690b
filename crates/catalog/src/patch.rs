//! Partial variant updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgecart_core::{DomainError, DomainResult};

use crate::model::{Dimensions, Product};

/// Fields a variant update may change. Absent fields keep their value.
///
/// There is no `sku` or `option_summary` field; payloads naming them are
/// rejected as unknown fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub upc: Option<String>,
    pub manufacturer: Option<String>,
    pub brand: Option<String>,
    pub quantity: Option<i32>,
    pub quantity_per_package: Option<i32>,
    pub taxable: Option<bool>,
    pub price: Option<i64>,
    pub on_sale: Option<bool>,
    pub sale_price: Option<i64>,
    pub cost: Option<i64>,
    pub product_dimensions: Option<Dimensions>,
    pub package_dimensions: Option<Dimensions>,
    pub available_on: Option<DateTime<Utc>>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.is_empty() {
            return Err(DomainError::validation("update contains no fields"));
        }
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if matches!(self.quantity_per_package, Some(q) if q < 1) {
            return Err(DomainError::validation(
                "quantity_per_package must be at least 1",
            ));
        }
        Ok(())
    }

    /// The product with this patch merged in.
    pub fn apply(&self, product: &Product) -> Product {
        let mut next = product.clone();

        if let Some(v) = &self.name {
            next.name = v.clone();
        }
        if let Some(v) = &self.subtitle {
            next.subtitle = Some(v.clone());
        }
        if let Some(v) = &self.description {
            next.description = v.clone();
        }
        if let Some(v) = &self.upc {
            next.upc = Some(v.clone());
        }
        if let Some(v) = &self.manufacturer {
            next.manufacturer = Some(v.clone());
        }
        if let Some(v) = &self.brand {
            next.brand = Some(v.clone());
        }
        if let Some(v) = self.quantity {
            next.quantity = v;
        }
        if let Some(v) = self.quantity_per_package {
            next.quantity_per_package = v;
        }
        if let Some(v) = self.taxable {
            next.taxable = v;
        }
        if let Some(v) = self.price {
            next.price = v;
        }
        if let Some(v) = self.on_sale {
            next.on_sale = v;
        }
        if let Some(v) = self.sale_price {
            next.sale_price = Some(v);
        }
        if let Some(v) = self.cost {
            next.cost = v;
        }
        if let Some(v) = self.product_dimensions {
            next.product_dimensions = v;
        }
        if let Some(v) = self.package_dimensions {
            next.package_dimensions = v;
        }
        if let Some(v) = self.available_on {
            next.available_on = v;
        }

        next
    }
}
