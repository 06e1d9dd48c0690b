//! Variant construction.
//!
//! Each variant is built fresh from (root, base fields, combination); nothing
//! is copied from a previously built variant.

use chrono::{DateTime, Utc};

use forgecart_core::ProductRootId;

use crate::combination::Combination;
use crate::model::{Dimensions, ProductRoot};
use crate::payload::ProductDraft;

/// Insert payload for a variant row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
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
    pub available_on: Option<DateTime<Utc>>,
}

impl NewProduct {
    /// The single variant of a root without options: SKU is the prefix itself
    /// and there is no option summary.
    pub fn base(root: &ProductRoot, draft: &ProductDraft) -> Self {
        Self::build(root, draft, root.sku_prefix.clone(), String::new())
    }

    /// The variant for one option-value combination.
    pub fn for_combination(
        root: &ProductRoot,
        draft: &ProductDraft,
        combination: &Combination<'_>,
    ) -> Self {
        let naming = combination.naming();
        Self::build(
            root,
            draft,
            naming.sku_for(&root.sku_prefix),
            naming.summary,
        )
    }

    fn build(
        root: &ProductRoot,
        draft: &ProductDraft,
        sku: String,
        option_summary: String,
    ) -> Self {
        Self {
            product_root_id: root.id,
            name: draft.name.clone(),
            subtitle: draft.subtitle.clone(),
            description: draft.description.clone(),
            option_summary,
            sku,
            upc: draft.upc.clone(),
            manufacturer: draft.manufacturer.clone(),
            brand: draft.brand.clone(),
            quantity: draft.quantity,
            quantity_per_package: draft.normalized_quantity_per_package(),
            taxable: draft.taxable,
            price: draft.price,
            on_sale: draft.on_sale,
            sale_price: draft.sale_price,
            cost: draft.cost,
            product_dimensions: draft.product_dimensions,
            package_dimensions: draft.package_dimensions,
            available_on: Some(root.available_on),
        }
    }
}
