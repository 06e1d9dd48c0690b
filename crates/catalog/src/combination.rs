//! Combination Enumerator.
//!
//! Walks the cartesian product of option values in odometer order: the last
//! option cycles fastest. The iterator is lazy, so callers can stream
//! combinations into the store without materialising the full product.

use forgecart_core::{DomainError, DomainResult, ProductOptionValueId};

use crate::model::{ProductOption, ProductOptionValue};
use crate::naming::VariantNaming;

/// One chosen value for one option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection<'a> {
    pub option: &'a ProductOption,
    pub value: &'a ProductOptionValue,
}

/// One value per option, in option order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combination<'a> {
    selections: Vec<Selection<'a>>,
}

impl<'a> Combination<'a> {
    pub fn selections(&self) -> &[Selection<'a>] {
        &self.selections
    }

    /// Selected value ids, in option order.
    pub fn value_ids(&self) -> Vec<ProductOptionValueId> {
        self.selections.iter().map(|s| s.value.id).collect()
    }

    pub fn values(&self) -> impl Iterator<Item = &'a ProductOptionValue> + '_ {
        self.selections.iter().map(|s| s.value)
    }

    pub fn naming(&self) -> VariantNaming {
        VariantNaming::derive(
            self.selections
                .iter()
                .map(|s| (s.option.name.as_str(), s.value.value.as_str())),
        )
    }
}

/// Lazy odometer over option values. Created by [`enumerate`].
#[derive(Debug, Clone)]
pub struct Combinations<'a> {
    options: &'a [ProductOption],
    // `None` once exhausted (or from the start, for an empty option list).
    cursor: Option<Vec<usize>>,
    remaining: Option<usize>,
}

impl<'a> Iterator for Combinations<'a> {
    type Item = Combination<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;

        let selections = self
            .options
            .iter()
            .zip(cursor.iter())
            .map(|(option, &idx)| Selection {
                option,
                value: &option.values[idx],
            })
            .collect();

        // Advance: bump the last digit, carrying leftwards.
        let mut exhausted = true;
        for pos in (0..cursor.len()).rev() {
            cursor[pos] += 1;
            if cursor[pos] < self.options[pos].values.len() {
                exhausted = false;
                break;
            }
            cursor[pos] = 0;
        }
        if exhausted {
            self.cursor = None;
        }
        if let Some(r) = self.remaining.as_mut() {
            *r = r.saturating_sub(1);
        }

        Some(Combination { selections })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.remaining {
            Some(r) => (r, Some(r)),
            None => (usize::MAX, None),
        }
    }
}

/// Enumerate every combination of `options`' values.
///
/// An empty option list yields nothing; an option without values is rejected.
/// There is no size cap here: callers bound the product up front with
/// [`combination_count`].
pub fn enumerate(options: &[ProductOption]) -> DomainResult<Combinations<'_>> {
    if let Some(empty) = options.iter().find(|o| o.values.is_empty()) {
        return Err(DomainError::validation(format!(
            "option '{}' has no values",
            empty.name
        )));
    }

    let cursor = (!options.is_empty()).then(|| vec![0; options.len()]);
    let remaining = combination_count(options.iter().map(|o| o.values.len()));

    Ok(Combinations {
        options,
        cursor,
        remaining,
    })
}

/// Number of combinations for the given per-option value counts.
///
/// Returns `Some(0)` for no options (matching [`enumerate`]) and `None` when the
/// product overflows `usize`.
pub fn combination_count<I>(value_counts: I) -> Option<usize>
where
    I: IntoIterator<Item = usize>,
{
    let mut counts = value_counts.into_iter().peekable();
    if counts.peek().is_none() {
        return Some(0);
    }
    counts.try_fold(1usize, |acc, n| acc.checked_mul(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use forgecart_core::{Lifecycle, ProductOptionId, ProductRootId};

    fn options(spec: &[(&str, &[&str])]) -> Vec<ProductOption> {
        let mut next_value = 1;
        spec.iter()
            .enumerate()
            .map(|(i, (name, values))| {
                let option_id = ProductOptionId::new(i as i64 + 1);
                ProductOption {
                    id: option_id,
                    product_root_id: ProductRootId::new(1),
                    name: name.to_string(),
                    values: values
                        .iter()
                        .map(|v| {
                            let value = ProductOptionValue {
                                id: ProductOptionValueId::new(next_value),
                                product_option_id: option_id,
                                value: v.to_string(),
                                lifecycle: Lifecycle::created(Utc::now()),
                            };
                            next_value += 1;
                            value
                        })
                        .collect(),
                    lifecycle: Lifecycle::created(Utc::now()),
                }
            })
            .collect()
    }

    #[test]
    fn size_by_color_in_odometer_order() {
        let opts = options(&[
            ("Size", &["Small", "Medium", "Large"]),
            ("Color", &["Red", "Blue"]),
        ]);

        let suffixes: Vec<String> = enumerate(&opts)
            .unwrap()
            .map(|c| c.naming().sku_suffix)
            .collect();

        assert_eq!(
            suffixes,
            vec![
                "small_red",
                "small_blue",
                "medium_red",
                "medium_blue",
                "large_red",
                "large_blue",
            ]
        );
    }

    #[test]
    fn combination_carries_value_ids_in_option_order() {
        let opts = options(&[("Size", &["S", "M"]), ("Color", &["Red", "Blue"])]);

        let first = enumerate(&opts).unwrap().next().unwrap();
        let ids: Vec<i64> = first.value_ids().iter().map(|id| id.get()).collect();

        assert_eq!(ids, vec![1, 3]);
        assert_eq!(first.naming().summary, "Size: S, Color: Red");
        assert_eq!(first.values().count(), 2);
    }

    #[test]
    fn empty_options_yield_nothing() {
        let mut it = enumerate(&[]).unwrap();
        assert_eq!(it.size_hint(), (0, Some(0)));
        assert!(it.next().is_none());
    }

    #[test]
    fn option_without_values_is_rejected() {
        let opts = options(&[("Size", &["S"]), ("Color", &[])]);
        let err = enumerate(&opts).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("Color")));
    }

    #[test]
    fn count_overflow_is_none() {
        assert_eq!(combination_count([usize::MAX, 2]), None);
        assert_eq!(combination_count([3, 2]), Some(6));
        assert_eq!(combination_count(std::iter::empty()), Some(0));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn value_counts() -> impl Strategy<Value = Vec<usize>> {
            prop::collection::vec(1usize..5, 1..5)
        }

        fn build(counts: &[usize]) -> Vec<ProductOption> {
            let names: Vec<String> = (0..counts.len()).map(|i| format!("O{i}")).collect();
            let values: Vec<Vec<String>> = counts
                .iter()
                .map(|&n| (0..n).map(|j| format!("v{j}")).collect())
                .collect();
            let value_refs: Vec<Vec<&str>> = values
                .iter()
                .map(|vs| vs.iter().map(String::as_str).collect())
                .collect();
            let spec: Vec<(&str, &[&str])> = names
                .iter()
                .zip(value_refs.iter())
                .map(|(n, vs)| (n.as_str(), vs.as_slice()))
                .collect();
            options(&spec)
        }

        proptest! {
            #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

            /// Property: the enumerator yields exactly the product of value counts.
            #[test]
            fn yields_product_of_value_counts(counts in value_counts()) {
                let opts = build(&counts);
                let expected: usize = counts.iter().product();

                let it = enumerate(&opts).unwrap();
                prop_assert_eq!(it.size_hint(), (expected, Some(expected)));
                prop_assert_eq!(it.count(), expected);
            }

            /// Property: index tuples come out in strictly increasing
            /// lexicographic order, so every combination is distinct and the
            /// last option cycles fastest.
            #[test]
            fn odometer_order_is_lexicographic(counts in value_counts()) {
                let opts = build(&counts);

                let positions: Vec<Vec<usize>> = enumerate(&opts)
                    .unwrap()
                    .map(|c| {
                        c.selections()
                            .iter()
                            .zip(opts.iter())
                            .map(|(s, o)| o.values.iter().position(|v| v.id == s.value.id).unwrap())
                            .collect()
                    })
                    .collect();

                for pair in positions.windows(2) {
                    prop_assert!(pair[0] < pair[1]);
                }
                prop_assert_eq!(positions.first().cloned(), Some(vec![0; counts.len()]));
                prop_assert_eq!(
                    positions.last().cloned(),
                    Some(counts.iter().map(|n| n - 1).collect::<Vec<_>>())
                );
            }
        }
    }
}
