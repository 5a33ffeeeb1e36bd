use std::cmp::Ordering;
use std::collections::HashMap;

use super::{SupplierLink, SupplierRef};

/// Picks the supplier to reorder from among one product's links.
///
/// Only active suppliers qualify. Ordering: preferred links first, then lowest unit cost,
/// then lowest supplier id so equal-cost preferred links always resolve the same way.
pub fn select_supplier<'a, I>(links: I) -> Option<&'a SupplierLink>
where
    I: IntoIterator<Item = &'a SupplierLink>,
{
    links
        .into_iter()
        .filter(|link| link.supplier_active)
        .min_by(|a, b| reorder_priority(a, b))
}

fn reorder_priority(a: &SupplierLink, b: &SupplierLink) -> Ordering {
    b.is_preferred
        .cmp(&a.is_preferred)
        .then_with(|| a.unit_cost.cmp(&b.unit_cost))
        .then_with(|| a.supplier_id.cmp(&b.supplier_id))
}

/// Selects at most one supplier per product, keyed by product id.
pub fn preferred_suppliers(links: &[SupplierLink]) -> HashMap<i32, SupplierRef> {
    let mut by_product: HashMap<i32, Vec<&SupplierLink>> = HashMap::new();
    for link in links {
        by_product.entry(link.product_id).or_default().push(link);
    }

    by_product
        .into_iter()
        .filter_map(|(product_id, links)| {
            select_supplier(links).map(|link| (product_id, SupplierRef::from(link)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn link(supplier_id: i32, is_preferred: bool, unit_cost: Decimal) -> SupplierLink {
        SupplierLink {
            product_id: 1,
            supplier_id,
            supplier_name: format!("Supplier {}", supplier_id),
            contact_email: Some(format!("orders@supplier{}.example", supplier_id)),
            is_preferred,
            unit_cost,
            supplier_active: true,
        }
    }

    #[test]
    fn preferred_beats_cheaper() {
        let links = vec![link(1, false, dec!(5)), link(2, true, dec!(8))];
        let chosen = select_supplier(&links).unwrap();
        assert_eq!(chosen.supplier_id, 2);
        assert_eq!(chosen.unit_cost, dec!(8));
    }

    #[test]
    fn cheapest_wins_among_equally_preferred() {
        let links = vec![
            link(1, false, dec!(7.25)),
            link(2, false, dec!(6.10)),
            link(3, false, dec!(9)),
        ];
        assert_eq!(select_supplier(&links).unwrap().supplier_id, 2);
    }

    #[test]
    fn full_tie_breaks_on_supplier_id_regardless_of_input_order() {
        let forward = vec![link(4, true, dec!(3)), link(9, true, dec!(3))];
        let backward = vec![link(9, true, dec!(3)), link(4, true, dec!(3))];
        assert_eq!(select_supplier(&forward).unwrap().supplier_id, 4);
        assert_eq!(select_supplier(&backward).unwrap().supplier_id, 4);
    }

    #[test]
    fn inactive_suppliers_are_skipped() {
        let mut preferred = link(1, true, dec!(1));
        preferred.supplier_active = false;
        let links = vec![preferred, link(2, false, dec!(10))];
        assert_eq!(select_supplier(&links).unwrap().supplier_id, 2);
    }

    #[test]
    fn no_links_no_supplier() {
        let links: Vec<SupplierLink> = Vec::new();
        assert!(select_supplier(&links).is_none());
        assert!(preferred_suppliers(&links).is_empty());
    }

    #[test]
    fn one_supplier_per_product() {
        let mut other = link(5, false, dec!(2));
        other.product_id = 2;
        let links = vec![link(1, false, dec!(5)), link(2, true, dec!(8)), other];

        let chosen = preferred_suppliers(&links);

        assert_eq!(chosen.len(), 2);
        assert_eq!(chosen[&1].id, 2);
        assert_eq!(chosen[&2].id, 5);
    }
}
