//! Low-stock alert engine.
//!
//! A pure pipeline over one [`FactSnapshot`]:
//!
//! - [`threshold`] resolves one reorder threshold per product
//! - [`velocity`] turns windowed sales totals into per-(product, warehouse) velocities
//! - [`forecast`] converts stock and velocity into days until stockout
//! - [`supplier`] picks at most one reorder supplier per product
//! - [`ranker`] filters to genuinely low stock and orders by urgency
//!
//! [`compute_alerts`] joins the stages. It performs no I/O, holds no state between calls and
//! returns the same list for the same snapshot.

pub mod forecast;
pub mod ranker;
pub mod supplier;
pub mod threshold;
pub mod velocity;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::{ServiceError, ValidationErrors};
use ranker::AlertCandidate;

pub use velocity::{SalesEntry, SalesVelocity, SalesWindow};

/// Active product of the company being evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFact {
    pub id: i32,
    pub name: String,
    pub sku: String,
    pub category_id: Option<i32>,
    pub low_stock_threshold: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFact {
    pub id: i32,
    pub low_stock_threshold_default: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseFact {
    pub id: i32,
    pub name: String,
}

/// Current on-hand quantity for one (product, warehouse) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLevel {
    pub product_id: i32,
    pub warehouse_id: i32,
    pub quantity: i32,
}

/// Units sold for one (product, warehouse) pair inside the sales window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesTotal {
    pub product_id: i32,
    pub warehouse_id: i32,
    pub units_sold: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierLink {
    pub product_id: i32,
    pub supplier_id: i32,
    pub supplier_name: String,
    pub contact_email: Option<String>,
    pub is_preferred: bool,
    pub unit_cost: Decimal,
    pub supplier_active: bool,
}

/// Every fact the engine reads, captured at one point in time.
#[derive(Debug, Clone, Default)]
pub struct FactSnapshot {
    pub products: Vec<ProductFact>,
    pub categories: Vec<CategoryFact>,
    pub warehouses: Vec<WarehouseFact>,
    pub stock_levels: Vec<StockLevel>,
    pub sales_totals: Vec<SalesTotal>,
    pub supplier_links: Vec<SupplierLink>,
}

/// Tunables for one computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertParams {
    pub window_days: u32,
    pub default_threshold: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierRef {
    pub id: i32,
    pub name: String,
    pub contact_email: Option<String>,
}

impl From<&SupplierLink> for SupplierRef {
    fn from(link: &SupplierLink) -> Self {
        Self {
            id: link.supplier_id,
            name: link.supplier_name.clone(),
            contact_email: link.contact_email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub product_id: i32,
    pub product_name: String,
    pub sku: String,
    pub warehouse_id: i32,
    pub warehouse_name: String,
    pub current_stock: i32,
    pub threshold: i32,
    pub days_until_stockout: Option<i64>,
    pub supplier: Option<SupplierRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertReport {
    pub company_id: i32,
    pub window_days: u32,
    pub alerts: Vec<Alert>,
    pub total_alerts: usize,
}

impl AlertReport {
    pub fn new(company_id: i32, window_days: u32, alerts: Vec<Alert>) -> Self {
        Self {
            company_id,
            window_days,
            total_alerts: alerts.len(),
            alerts,
        }
    }
}

/// Rejects negative quantities and thresholds before any stage runs.
fn validate_snapshot(snapshot: &FactSnapshot, params: &AlertParams) -> Result<(), ServiceError> {
    let mut errors = ValidationErrors::new();

    if params.window_days == 0 {
        errors.add("window_days", "range", "must be at least 1");
    }
    if params.default_threshold < 0 {
        errors.add("default_threshold", "range", "must not be negative");
    }
    for product in &snapshot.products {
        if product.low_stock_threshold.is_some_and(|t| t < 0) {
            errors.add(
                "low_stock_threshold",
                "range",
                format!("product {} has a negative threshold", product.id),
            );
        }
    }
    for category in &snapshot.categories {
        if category.low_stock_threshold_default.is_some_and(|t| t < 0) {
            errors.add(
                "low_stock_threshold_default",
                "range",
                format!("category {} has a negative default threshold", category.id),
            );
        }
    }
    for level in &snapshot.stock_levels {
        if level.quantity < 0 {
            errors.add(
                "quantity",
                "range",
                format!(
                    "product {} in warehouse {} has negative stock",
                    level.product_id, level.warehouse_id
                ),
            );
        }
    }
    for total in &snapshot.sales_totals {
        if total.units_sold < 0 {
            errors.add(
                "quantity_sold",
                "range",
                format!(
                    "product {} in warehouse {} has negative sales",
                    total.product_id, total.warehouse_id
                ),
            );
        }
    }

    errors.into_result()
}

/// Computes the ranked low-stock alert list for one snapshot.
///
/// Stock levels referencing a product or warehouse absent from the snapshot are ignored.
pub fn compute_alerts(
    snapshot: &FactSnapshot,
    params: &AlertParams,
) -> Result<Vec<Alert>, ServiceError> {
    validate_snapshot(snapshot, params)?;

    let thresholds = threshold::resolve_all(
        &snapshot.products,
        &snapshot.categories,
        params.default_threshold,
    );
    let velocities = velocity::velocity_facts(&snapshot.sales_totals, params.window_days);
    let suppliers = supplier::preferred_suppliers(&snapshot.supplier_links);

    let products: HashMap<i32, &ProductFact> =
        snapshot.products.iter().map(|p| (p.id, p)).collect();
    let warehouses: HashMap<i32, &WarehouseFact> =
        snapshot.warehouses.iter().map(|w| (w.id, w)).collect();

    let candidates = snapshot
        .stock_levels
        .iter()
        .filter_map(|level| {
            let product = products.get(&level.product_id)?;
            let warehouse = warehouses.get(&level.warehouse_id)?;
            let threshold = *thresholds.get(&product.id)?;
            let velocity = velocities
                .get(&(level.product_id, level.warehouse_id))
                .copied();

            Some(AlertCandidate {
                alert: Alert {
                    product_id: product.id,
                    product_name: product.name.clone(),
                    sku: product.sku.clone(),
                    warehouse_id: warehouse.id,
                    warehouse_name: warehouse.name.clone(),
                    current_stock: level.quantity,
                    threshold,
                    days_until_stockout: forecast::days_until_stockout(
                        level.quantity,
                        velocity.as_ref(),
                    ),
                    supplier: suppliers.get(&product.id).cloned(),
                },
                velocity,
            })
        })
        .collect();

    Ok(ranker::rank(candidates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    const PARAMS: AlertParams = AlertParams {
        window_days: 30,
        default_threshold: 10,
    };

    fn product(id: i32, category_id: Option<i32>, threshold: Option<i32>) -> ProductFact {
        ProductFact {
            id,
            name: format!("Widget {}", id),
            sku: format!("WID-{:03}", id),
            category_id,
            low_stock_threshold: threshold,
        }
    }

    fn warehouse(id: i32) -> WarehouseFact {
        WarehouseFact {
            id,
            name: format!("Warehouse {}", id),
        }
    }

    fn stock(product_id: i32, warehouse_id: i32, quantity: i32) -> StockLevel {
        StockLevel {
            product_id,
            warehouse_id,
            quantity,
        }
    }

    fn sold(product_id: i32, warehouse_id: i32, units_sold: i64) -> SalesTotal {
        SalesTotal {
            product_id,
            warehouse_id,
            units_sold,
        }
    }

    fn supplier_link(product_id: i32, supplier_id: i32, preferred: bool, cost: Decimal) -> SupplierLink {
        SupplierLink {
            product_id,
            supplier_id,
            supplier_name: format!("Supplier {}", supplier_id),
            contact_email: Some(format!("orders@supplier{}.example", supplier_id)),
            is_preferred: preferred,
            unit_cost: cost,
            supplier_active: true,
        }
    }

    #[test]
    fn empty_snapshot_yields_no_alerts() {
        let alerts = compute_alerts(&FactSnapshot::default(), &PARAMS).unwrap();
        assert!(alerts.is_empty());
        assert_eq!(AlertReport::new(1, 30, alerts).total_alerts, 0);
    }

    #[test]
    fn forty_units_selling_two_a_day_last_twenty_days() {
        let snapshot = FactSnapshot {
            products: vec![product(1, None, Some(50))],
            warehouses: vec![warehouse(1)],
            stock_levels: vec![stock(1, 1, 40)],
            sales_totals: vec![sold(1, 1, 60)],
            supplier_links: vec![
                supplier_link(1, 7, false, dec!(5)),
                supplier_link(1, 8, true, dec!(8)),
            ],
            ..Default::default()
        };

        let alerts = compute_alerts(&snapshot, &PARAMS).unwrap();

        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.current_stock, 40);
        assert_eq!(alert.threshold, 50);
        assert_eq!(alert.days_until_stockout, Some(20));
        assert_eq!(alert.sku, "WID-001");
        assert_eq!(alert.warehouse_name, "Warehouse 1");
        assert_eq!(alert.supplier.as_ref().map(|s| s.id), Some(8));
    }

    #[test]
    fn low_stock_without_recent_sales_is_not_an_alert() {
        let snapshot = FactSnapshot {
            products: vec![product(1, None, None)],
            warehouses: vec![warehouse(1)],
            stock_levels: vec![stock(1, 1, 5)],
            sales_totals: vec![sold(1, 1, 0)],
            ..Default::default()
        };
        assert!(compute_alerts(&snapshot, &PARAMS).unwrap().is_empty());
    }

    #[test]
    fn recent_activity_is_gated_per_warehouse() {
        let snapshot = FactSnapshot {
            products: vec![product(1, None, None)],
            warehouses: vec![warehouse(1), warehouse(2)],
            stock_levels: vec![stock(1, 1, 3), stock(1, 2, 3)],
            sales_totals: vec![sold(1, 2, 15)],
            ..Default::default()
        };

        let alerts = compute_alerts(&snapshot, &PARAMS).unwrap();

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].warehouse_id, 2);
        assert_eq!(alerts[0].days_until_stockout, Some(6));
    }

    #[test]
    fn category_default_applies_without_override() {
        let snapshot = FactSnapshot {
            products: vec![product(1, Some(3), None), product(2, Some(3), Some(5))],
            categories: vec![CategoryFact {
                id: 3,
                low_stock_threshold_default: Some(15),
            }],
            warehouses: vec![warehouse(1)],
            stock_levels: vec![stock(1, 1, 12), stock(2, 1, 12)],
            sales_totals: vec![sold(1, 1, 30), sold(2, 1, 30)],
            ..Default::default()
        };

        let alerts = compute_alerts(&snapshot, &PARAMS).unwrap();

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].product_id, 1);
        assert_eq!(alerts[0].threshold, 15);
    }

    #[test]
    fn ranked_by_days_until_stockout() {
        let snapshot = FactSnapshot {
            products: vec![product(1, None, None), product(2, None, None), product(3, None, None)],
            warehouses: vec![warehouse(1)],
            stock_levels: vec![stock(1, 1, 9), stock(2, 1, 2), stock(3, 1, 6)],
            sales_totals: vec![sold(1, 1, 30), sold(2, 1, 30), sold(3, 1, 30)],
            ..Default::default()
        };

        let alerts = compute_alerts(&snapshot, &PARAMS).unwrap();

        let order: Vec<_> = alerts.iter().map(|a| (a.product_id, a.days_until_stockout)).collect();
        assert_eq!(order, vec![(2, Some(2)), (3, Some(6)), (1, Some(9))]);
    }

    #[test]
    fn rows_outside_the_snapshot_are_ignored() {
        let snapshot = FactSnapshot {
            products: vec![product(1, None, None)],
            warehouses: vec![warehouse(1)],
            stock_levels: vec![stock(1, 99, 1), stock(42, 1, 1)],
            sales_totals: vec![sold(1, 99, 10), sold(42, 1, 10)],
            ..Default::default()
        };
        assert!(compute_alerts(&snapshot, &PARAMS).unwrap().is_empty());
    }

    #[test]
    fn negative_stock_is_rejected() {
        let snapshot = FactSnapshot {
            products: vec![product(1, None, None)],
            warehouses: vec![warehouse(1)],
            stock_levels: vec![stock(1, 1, -4)],
            ..Default::default()
        };
        assert_matches!(
            compute_alerts(&snapshot, &PARAMS),
            Err(ServiceError::ValidationError(errors)) if errors.has_field("quantity")
        );
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let snapshot = FactSnapshot {
            products: vec![product(1, None, Some(-1))],
            ..Default::default()
        };
        assert_matches!(
            compute_alerts(&snapshot, &PARAMS),
            Err(ServiceError::ValidationError(errors)) if errors.has_field("low_stock_threshold")
        );
    }

    #[test]
    fn repeated_calls_are_identical() {
        let snapshot = FactSnapshot {
            products: vec![product(1, None, None), product(2, None, None)],
            warehouses: vec![warehouse(1)],
            stock_levels: vec![stock(1, 1, 4), stock(2, 1, 4)],
            sales_totals: vec![sold(1, 1, 20), sold(2, 1, 20)],
            supplier_links: vec![
                supplier_link(1, 1, true, dec!(2)),
                supplier_link(1, 2, true, dec!(2)),
            ],
            ..Default::default()
        };
        let first = compute_alerts(&snapshot, &PARAMS).unwrap();
        let second = compute_alerts(&snapshot, &PARAMS).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.iter().map(|a| a.product_id).collect::<Vec<_>>(), vec![1, 2]);
    }
}
