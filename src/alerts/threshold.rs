use std::collections::HashMap;

use super::{CategoryFact, ProductFact};

/// Resolves the reorder threshold for one product.
///
/// Precedence is strict: the product's own override, then its category default, then the
/// configured global fallback. The result is always defined.
pub fn resolve_threshold(
    product_override: Option<i32>,
    category_default: Option<i32>,
    fallback: i32,
) -> i32 {
    product_override.or(category_default).unwrap_or(fallback)
}

/// Resolves thresholds for every product in the snapshot, keyed by product id.
///
/// A product pointing at a category missing from `categories` is treated as uncategorized.
pub fn resolve_all(
    products: &[ProductFact],
    categories: &[CategoryFact],
    fallback: i32,
) -> HashMap<i32, i32> {
    let defaults: HashMap<i32, Option<i32>> = categories
        .iter()
        .map(|c| (c.id, c.low_stock_threshold_default))
        .collect();

    products
        .iter()
        .map(|product| {
            let category_default = product
                .category_id
                .and_then(|id| defaults.get(&id).copied().flatten());
            (
                product.id,
                resolve_threshold(product.low_stock_threshold, category_default, fallback),
            )
        })
        .collect()
}
