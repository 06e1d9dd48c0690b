//! Variant naming: SKU suffix and human-readable option summary.

/// Names derived from one option-value combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantNaming {
    /// Lowercased values joined with `_`, in option order (`small_red`).
    pub sku_suffix: String,
    /// `"Option: Value"` pairs joined with `", "` (`Size: Small, Color: Red`).
    pub summary: String,
}

impl VariantNaming {
    /// Derive names from ordered `(option name, value)` pairs.
    pub fn derive<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut sku_suffix = String::new();
        let mut summary = String::new();

        for (idx, (option, value)) in pairs.into_iter().enumerate() {
            if idx > 0 {
                sku_suffix.push('_');
                summary.push_str(", ");
            }
            sku_suffix.push_str(&value.to_lowercase());
            summary.push_str(option);
            summary.push_str(": ");
            summary.push_str(value);
        }

        Self {
            sku_suffix,
            summary,
        }
    }

    /// Full variant SKU under a root prefix.
    pub fn sku_for(&self, sku_prefix: &str) -> String {
        format!("{}_{}", sku_prefix, self.sku_suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_suffix_and_summary_in_option_order() {
        let naming = VariantNaming::derive([("Size", "Small"), ("Color", "Red")]);

        assert_eq!(naming.sku_suffix, "small_red");
        assert_eq!(naming.summary, "Size: Small, Color: Red");
        assert_eq!(naming.sku_for("shirt"), "shirt_small_red");
    }

    #[test]
    fn single_pair_has_no_separators() {
        let naming = VariantNaming::derive([("Material", "Ceramic")]);

        assert_eq!(naming.sku_suffix, "ceramic");
        assert_eq!(naming.summary, "Material: Ceramic");
    }

    #[test]
    fn summary_keeps_original_case() {
        let naming = VariantNaming::derive([("Fit", "XL"), ("Color", "Navy Blue")]);

        assert_eq!(naming.sku_suffix, "xl_navy blue");
        assert_eq!(naming.summary, "Fit: XL, Color: Navy Blue");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: the suffix is exactly the lowercased values joined by `_`.
            #[test]
            fn suffix_matches_joined_values(
                pairs in prop::collection::vec(("[A-Z][a-z]{0,8}", "[A-Za-z0-9]{1,8}"), 1..5)
            ) {
                let naming = VariantNaming::derive(
                    pairs.iter().map(|(o, v)| (o.as_str(), v.as_str())),
                );

                let expected_suffix = pairs
                    .iter()
                    .map(|(_, v)| v.to_lowercase())
                    .collect::<Vec<_>>()
                    .join("_");
                let expected_summary = pairs
                    .iter()
                    .map(|(o, v)| format!("{o}: {v}"))
                    .collect::<Vec<_>>()
                    .join(", ");

                prop_assert_eq!(naming.sku_suffix, expected_suffix);
                prop_assert_eq!(naming.summary, expected_summary);
            }
        }
    }
}
