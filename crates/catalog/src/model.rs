//! Persisted catalog rows and the committed root graph.
//!
//! Money fields are integers in the smallest currency unit (e.g. cents).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgecart_core::{
    Entity, Lifecycle, ProductId, ProductOptionId, ProductOptionValueId, ProductRootId,
    VariantBridgeId,
};

/// Physical measurements of a product or of its package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub weight: f64,
    pub height: f64,
    pub width: f64,
    pub length: f64,
}

/// The sellable concept shared by every variant (e.g. "T-Shirt").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRoot {
    pub id: ProductRootId,
    pub name: String,
    pub subtitle: Option<String>,
    pub description: String,
    pub sku_prefix: String,
    pub manufacturer: Option<String>,
    pub brand: Option<String>,
    pub available_on: DateTime<Utc>,
    pub taxable: bool,
    pub cost: i64,
    pub product_dimensions: Dimensions,
    pub package_dimensions: Dimensions,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

/// A dimension of variation on a root (e.g. "Size").
///
/// `values` is populated by reads that load the option graph; bare row reads
/// leave it empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    pub id: ProductOptionId,
    pub product_root_id: ProductRootId,
    pub name: String,
    #[serde(default)]
    pub values: Vec<ProductOptionValue>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

/// A concrete value of an option (e.g. "Small").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOptionValue {
    pub id: ProductOptionValueId,
    pub product_option_id: ProductOptionId,
    pub value: String,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

/// One purchasable variant.
///
/// `applicable_option_values` is derived from live bridge rows, never stored
/// on the product row itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub product_root_id: ProductRootId,
    pub name: String,
    pub subtitle: Option<String>,
    pub description: String,
    pub option_summary: String,
    pub sku: String,
    pub upc: Option<String>,
    pub manufacturer: Option<String>,
    pub brand: Option<String>,
    pub quantity: i32,
    pub quantity_per_package: i32,
    pub taxable: bool,
    pub price: i64,
    pub on_sale: bool,
    pub sale_price: Option<i64>,
    pub cost: i64,
    pub product_dimensions: Dimensions,
    pub package_dimensions: Dimensions,
    #[serde(default)]
    pub applicable_option_values: Vec<ProductOptionValue>,
    pub available_on: DateTime<Utc>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

/// Link row: this variant was produced by this option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariantBridge {
    pub id: VariantBridgeId,
    pub product_id: ProductId,
    pub product_option_value_id: ProductOptionValueId,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

/// Insert payload for an option row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProductOption {
    pub product_root_id: ProductRootId,
    pub name: String,
}

/// Insert payload for an option value row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProductOptionValue {
    pub product_option_id: ProductOptionId,
    pub value: String,
}

/// A root together with its live options (values loaded) and live variants.
///
/// This is what a successful catalog commit returns and what post-commit
/// consumers read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootGraph {
    #[serde(flatten)]
    pub root: ProductRoot,
    pub options: Vec<ProductOption>,
    pub products: Vec<Product>,
}

impl RootGraph {
    /// All option values across options, in option then value order.
    pub fn option_values(&self) -> impl Iterator<Item = &ProductOptionValue> {
        self.options.iter().flat_map(|o| o.values.iter())
    }

    pub fn product_by_sku(&self, sku: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.sku == sku)
    }
}

macro_rules! impl_entity {
    ($t:ty, $id:ty) => {
        impl Entity for $t {
            type Id = $id;

            fn id(&self) -> Self::Id {
                self.id
            }

            fn lifecycle(&self) -> &Lifecycle {
                &self.lifecycle
            }
        }
    };
}

impl_entity!(ProductRoot, ProductRootId);
impl_entity!(ProductOption, ProductOptionId);
impl_entity!(ProductOptionValue, ProductOptionValueId);
impl_entity!(Product, ProductId);
impl_entity!(ProductVariantBridge, VariantBridgeId);

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> ProductRoot {
        ProductRoot {
            id: ProductRootId::new(1),
            name: "Mug".to_string(),
            subtitle: None,
            description: String::new(),
            sku_prefix: "mug".to_string(),
            manufacturer: None,
            brand: None,
            available_on: Utc::now(),
            taxable: true,
            cost: 150,
            product_dimensions: Dimensions::default(),
            package_dimensions: Dimensions::default(),
            lifecycle: Lifecycle::created(Utc::now()),
        }
    }

    #[test]
    fn empty_option_list_serializes_as_array() {
        let graph = RootGraph {
            root: root(),
            options: Vec::new(),
            products: Vec::new(),
        };

        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["options"], serde_json::json!([]));
        assert_eq!(json["sku_prefix"], "mug");
        assert!(json.get("archived_on").is_none());
    }

    #[test]
    fn archived_rows_are_not_live() {
        let mut r = root();
        assert!(r.is_live());
        r.lifecycle.archive(Utc::now());
        assert!(!r.is_live());
    }
}
