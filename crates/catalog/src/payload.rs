//! Catalog creation payload and its validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgecart_core::{DomainError, DomainResult};

use crate::combination::combination_count;
use crate::model::Dimensions;
use crate::sku::validate_sku;

/// Base product fields shared by the root and every generated variant.
///
/// `sku` doubles as the root's SKU prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub description: String,
    pub sku: String,
    #[serde(default)]
    pub upc: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub quantity_per_package: i32,
    #[serde(default)]
    pub taxable: bool,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub on_sale: bool,
    #[serde(default)]
    pub sale_price: Option<i64>,
    #[serde(default)]
    pub cost: i64,
    #[serde(default)]
    pub product_dimensions: Dimensions,
    #[serde(default)]
    pub package_dimensions: Dimensions,
    /// Defaults to the commit time when absent.
    #[serde(default)]
    pub available_on: Option<DateTime<Utc>>,
}

impl ProductDraft {
    /// Packages hold at least one unit.
    pub fn normalized_quantity_per_package(&self) -> i32 {
        self.quantity_per_package.max(1)
    }
}

/// One option to create, with its values in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionCreation {
    pub name: String,
    pub values: Vec<String>,
}

impl OptionCreation {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("option name cannot be empty"));
        }
        if self.values.is_empty() {
            return Err(DomainError::validation(format!(
                "option '{}' has no values",
                self.name
            )));
        }
        if self.values.iter().any(|v| v.trim().is_empty()) {
            return Err(DomainError::validation(format!(
                "option '{}' has an empty value",
                self.name
            )));
        }
        Ok(())
    }
}

/// Everything needed to commit a root, its options and all expanded variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogCreation {
    #[serde(flatten)]
    pub product: ProductDraft,
    #[serde(default)]
    pub options: Vec<OptionCreation>,
}

impl CatalogCreation {
    pub fn new(product: ProductDraft) -> Self {
        Self {
            product,
            options: Vec::new(),
        }
    }

    pub fn with_option<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.push(OptionCreation {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Number of variants a commit would create; `None` on overflow.
    pub fn variant_count(&self) -> Option<usize> {
        combination_count(self.options.iter().map(|o| o.values.len())).map(|n| n.max(1))
    }

    /// Reject malformed payloads before any storage work.
    ///
    /// `max_variants` of `None` disables the size bound.
    pub fn validate(&self, max_variants: Option<usize>) -> DomainResult<()> {
        if self.product.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        validate_sku(&self.product.sku)?;

        for option in &self.options {
            option.validate()?;
        }

        if let Some(limit) = max_variants {
            match self.variant_count() {
                Some(n) if n <= limit => {}
                Some(n) => {
                    return Err(DomainError::validation(format!(
                        "{n} variants requested, at most {limit} allowed"
                    )));
                }
                None => {
                    return Err(DomainError::validation(format!(
                        "variant count overflows, at most {limit} allowed"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Insert payload for a root row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProductRoot {
    pub name: String,
    pub subtitle: Option<String>,
    pub description: String,
    pub sku_prefix: String,
    pub manufacturer: Option<String>,
    pub brand: Option<String>,
    pub available_on: Option<DateTime<Utc>>,
    pub taxable: bool,
    pub cost: i64,
    pub product_dimensions: Dimensions,
    pub package_dimensions: Dimensions,
}

impl NewProductRoot {
    pub fn from_draft(draft: &ProductDraft) -> Self {
        Self {
            name: draft.name.clone(),
            subtitle: draft.subtitle.clone(),
            description: draft.description.clone(),
            sku_prefix: draft.sku.clone(),
            manufacturer: draft.manufacturer.clone(),
            brand: draft.brand.clone(),
            available_on: draft.available_on,
            taxable: draft.taxable,
            cost: draft.cost,
            product_dimensions: draft.product_dimensions,
            package_dimensions: draft.package_dimensions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(sku: &str) -> ProductDraft {
        serde_json::from_value(serde_json::json!({
            "name": "T-Shirt",
            "sku": sku,
            "price": 1999,
        }))
        .unwrap()
    }

    #[test]
    fn deserializes_flattened_payload_with_defaults() {
        let payload: CatalogCreation = serde_json::from_value(serde_json::json!({
            "name": "T-Shirt",
            "sku": "shirt",
            "quantity_per_package": 0,
            "options": [{ "name": "Size", "values": ["Small", "Large"] }],
        }))
        .unwrap();

        assert_eq!(payload.product.sku, "shirt");
        assert_eq!(payload.product.normalized_quantity_per_package(), 1);
        assert_eq!(payload.options.len(), 1);
        assert_eq!(payload.variant_count(), Some(2));
    }

    #[test]
    fn no_options_means_one_variant() {
        let payload = CatalogCreation::new(draft("mug"));
        assert_eq!(payload.variant_count(), Some(1));
        assert!(payload.validate(Some(1)).is_ok());
    }

    #[test]
    fn rejects_invalid_sku() {
        let payload = CatalogCreation::new(draft("thí% $kü ïs not åny gõôd"));
        assert!(matches!(payload.validate(None), Err(DomainError::Validation(_))));
    }

    #[test]
    fn rejects_blank_name() {
        let mut d = draft("shirt");
        d.name = "   ".to_string();
        assert!(matches!(
            CatalogCreation::new(d).validate(None),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn rejects_option_without_values() {
        let payload = CatalogCreation::new(draft("shirt"))
            .with_option("Size", ["Small"])
            .with_option("Color", Vec::<String>::new());

        let err = payload.validate(None).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("Color")));
    }

    #[test]
    fn enforces_variant_bound() {
        let payload = CatalogCreation::new(draft("shirt"))
            .with_option("Size", ["S", "M", "L"])
            .with_option("Color", ["Red", "Blue"]);

        assert!(payload.validate(Some(6)).is_ok());
        assert!(matches!(payload.validate(Some(5)), Err(DomainError::Validation(_))));
        assert!(payload.validate(None).is_ok());
    }

    #[test]
    fn root_takes_prefix_from_sku() {
        let root = NewProductRoot::from_draft(&draft("shirt"));
        assert_eq!(root.sku_prefix, "shirt");
        assert_eq!(root.name, "T-Shirt");
        assert!(root.available_on.is_none());
    }
}
