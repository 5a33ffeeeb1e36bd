use async_trait::async_trait;
use sea_orm::{
    sea_query::{Expr, Query, SelectStatement},
    AccessMode, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend,
    DbErr, EntityTrait, FromQueryResult, IsolationLevel, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error};

use crate::alerts::{
    velocity::sum_sales_in_window, CategoryFact, FactSnapshot, ProductFact, SalesEntry,
    SalesTotal, SalesWindow, StockLevel, SupplierLink, WarehouseFact,
};
use crate::entities::{
    company, daily_sales_summary, inventory, product, product_category, product_supplier,
    supplier, warehouse,
};
use crate::errors::ServiceError;

/// Read-only access to everything the alert engine needs for one company.
///
/// Implementations must return all fact sets from one consistent point in time and must
/// fail as a whole: a snapshot is either complete or an error.
#[async_trait]
pub trait AlertFactSource: Send + Sync {
    /// Loads the snapshot for `company_id`, with sales restricted to `window`.
    ///
    /// Unknown and inactive companies yield `ServiceError::NotFound`.
    async fn load_snapshot(
        &self,
        company_id: i32,
        window: &SalesWindow,
    ) -> Result<FactSnapshot, ServiceError>;
}

impl From<product::Model> for ProductFact {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            sku: model.sku,
            category_id: model.category_id,
            low_stock_threshold: model.low_stock_threshold,
        }
    }
}

impl From<product_category::Model> for CategoryFact {
    fn from(model: product_category::Model) -> Self {
        Self {
            id: model.id,
            low_stock_threshold_default: model.low_stock_threshold_default,
        }
    }
}

impl From<warehouse::Model> for WarehouseFact {
    fn from(model: warehouse::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

impl From<inventory::Model> for StockLevel {
    fn from(model: inventory::Model) -> Self {
        Self {
            product_id: model.product_id,
            warehouse_id: model.warehouse_id,
            quantity: model.quantity,
        }
    }
}

impl From<&daily_sales_summary::Model> for SalesEntry {
    fn from(model: &daily_sales_summary::Model) -> Self {
        Self {
            product_id: model.product_id,
            warehouse_id: model.warehouse_id,
            sale_date: model.sale_date,
            quantity_sold: model.quantity_sold,
        }
    }
}

fn supplier_link(link: product_supplier::Model, supplier: supplier::Model) -> SupplierLink {
    SupplierLink {
        product_id: link.product_id,
        supplier_id: supplier.id,
        supplier_name: supplier.name,
        contact_email: supplier.contact_email,
        is_preferred: link.is_preferred,
        unit_cost: link.unit_cost,
        supplier_active: supplier.is_active,
    }
}

#[derive(Debug, FromQueryResult)]
struct SalesTotalRow {
    product_id: i32,
    warehouse_id: i32,
    units_sold: i64,
}

/// Fact source backed by the relational store through SeaORM.
#[derive(Clone)]
pub struct SeaOrmAlertFacts {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmAlertFacts {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Opens the transaction every fact set is read through.
    ///
    /// Postgres gets a read-only repeatable-read snapshot. SQLite serializes writers, so a
    /// plain deferred transaction already sees one consistent state.
    async fn begin_snapshot(&self) -> Result<DatabaseTransaction, DbErr> {
        match self.db.get_database_backend() {
            DbBackend::Postgres => {
                self.db
                    .begin_with_config(
                        Some(IsolationLevel::RepeatableRead),
                        Some(AccessMode::ReadOnly),
                    )
                    .await
            }
            _ => self.db.begin().await,
        }
    }
}

fn company_product_ids(company_id: i32) -> SelectStatement {
    Query::select()
        .column(product::Column::Id)
        .from(product::Entity)
        .and_where(product::Column::CompanyId.eq(company_id))
        .and_where(product::Column::IsActive.eq(true))
        .to_owned()
}

fn company_warehouse_ids(company_id: i32) -> SelectStatement {
    Query::select()
        .column(warehouse::Column::Id)
        .from(warehouse::Entity)
        .and_where(warehouse::Column::CompanyId.eq(company_id))
        .to_owned()
}

async fn active_company<C: ConnectionTrait>(conn: &C, company_id: i32) -> Result<bool, DbErr> {
    let company = company::Entity::find_by_id(company_id).one(conn).await?;
    Ok(company.is_some_and(|c| c.is_active))
}

async fn active_products<C: ConnectionTrait>(
    conn: &C,
    company_id: i32,
) -> Result<Vec<ProductFact>, DbErr> {
    let products = product::Entity::find()
        .filter(product::Column::CompanyId.eq(company_id))
        .filter(product::Column::IsActive.eq(true))
        .order_by_asc(product::Column::Id)
        .all(conn)
        .await?;
    Ok(products.into_iter().map(ProductFact::from).collect())
}

async fn categories_of<C: ConnectionTrait>(
    conn: &C,
    products: &[ProductFact],
) -> Result<Vec<CategoryFact>, DbErr> {
    let ids: Vec<i32> = products
        .iter()
        .filter_map(|p| p.category_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let categories = product_category::Entity::find()
        .filter(product_category::Column::Id.is_in(ids))
        .all(conn)
        .await?;
    Ok(categories.into_iter().map(CategoryFact::from).collect())
}

async fn company_warehouses<C: ConnectionTrait>(
    conn: &C,
    company_id: i32,
) -> Result<Vec<WarehouseFact>, DbErr> {
    let warehouses = warehouse::Entity::find()
        .filter(warehouse::Column::CompanyId.eq(company_id))
        .order_by_asc(warehouse::Column::Id)
        .all(conn)
        .await?;
    Ok(warehouses.into_iter().map(WarehouseFact::from).collect())
}

async fn stock_levels<C: ConnectionTrait>(
    conn: &C,
    company_id: i32,
) -> Result<Vec<StockLevel>, DbErr> {
    let rows = inventory::Entity::find()
        .filter(inventory::Column::ProductId.in_subquery(company_product_ids(company_id)))
        .filter(inventory::Column::WarehouseId.in_subquery(company_warehouse_ids(company_id)))
        .order_by_asc(inventory::Column::ProductId)
        .order_by_asc(inventory::Column::WarehouseId)
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(StockLevel::from).collect())
}

/// One grouped scan of the daily rollup; pairs without sales in the window never leave the
/// database.
async fn sales_totals<C: ConnectionTrait>(
    conn: &C,
    company_id: i32,
    window: &SalesWindow,
) -> Result<Vec<SalesTotal>, DbErr> {
    use daily_sales_summary::Column;

    let rows = daily_sales_summary::Entity::find()
        .select_only()
        .column(Column::ProductId)
        .column(Column::WarehouseId)
        .column_as(Column::QuantitySold.sum(), "units_sold")
        .filter(Column::SaleDate.gte(window.start()))
        .filter(Column::SaleDate.lt(window.end()))
        .filter(Column::ProductId.in_subquery(company_product_ids(company_id)))
        .filter(Column::WarehouseId.in_subquery(company_warehouse_ids(company_id)))
        .group_by(Column::ProductId)
        .group_by(Column::WarehouseId)
        .having(Expr::expr(Column::QuantitySold.sum()).gt(0))
        .order_by_asc(Column::ProductId)
        .order_by_asc(Column::WarehouseId)
        .into_model::<SalesTotalRow>()
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| SalesTotal {
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            units_sold: row.units_sold,
        })
        .collect())
}

async fn supplier_links<C: ConnectionTrait>(
    conn: &C,
    company_id: i32,
) -> Result<Vec<SupplierLink>, DbErr> {
    let rows = product_supplier::Entity::find()
        .find_also_related(supplier::Entity)
        .filter(product_supplier::Column::ProductId.in_subquery(company_product_ids(company_id)))
        .filter(supplier::Column::IsActive.eq(true))
        .order_by_asc(product_supplier::Column::ProductId)
        .order_by_asc(product_supplier::Column::SupplierId)
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(link, supplier)| supplier.map(|s| supplier_link(link, s)))
        .collect())
}

#[async_trait]
impl AlertFactSource for SeaOrmAlertFacts {
    async fn load_snapshot(
        &self,
        company_id: i32,
        window: &SalesWindow,
    ) -> Result<FactSnapshot, ServiceError> {
        let txn = self.begin_snapshot().await?;

        if !active_company(&txn, company_id).await? {
            txn.rollback().await?;
            return Err(ServiceError::NotFound(format!(
                "Company {} not found",
                company_id
            )));
        }

        let loaded = async {
            let products = active_products(&txn, company_id).await?;
            let categories = categories_of(&txn, &products).await?;
            Ok::<_, DbErr>(FactSnapshot {
                categories,
                warehouses: company_warehouses(&txn, company_id).await?,
                stock_levels: stock_levels(&txn, company_id).await?,
                sales_totals: sales_totals(&txn, company_id, window).await?,
                supplier_links: supplier_links(&txn, company_id).await?,
                products,
            })
        }
        .await;

        let snapshot = match loaded {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(company_id, error = %e, "Failed to load alert facts");
                return Err(ServiceError::DatabaseError(e));
            }
        };
        txn.commit().await?;

        debug!(
            company_id,
            products = snapshot.products.len(),
            stock_levels = snapshot.stock_levels.len(),
            sales_totals = snapshot.sales_totals.len(),
            "Loaded alert fact snapshot"
        );
        Ok(snapshot)
    }
}

/// Fact source over rows held in memory, shaped like the database tables.
///
/// Sales are kept as raw daily rows and folded into windowed totals on load.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAlertFacts {
    pub companies: Vec<company::Model>,
    pub categories: Vec<product_category::Model>,
    pub products: Vec<product::Model>,
    pub warehouses: Vec<warehouse::Model>,
    pub inventory: Vec<inventory::Model>,
    pub daily_sales: Vec<daily_sales_summary::Model>,
    pub suppliers: Vec<supplier::Model>,
    pub product_suppliers: Vec<product_supplier::Model>,
}

#[async_trait]
impl AlertFactSource for InMemoryAlertFacts {
    async fn load_snapshot(
        &self,
        company_id: i32,
        window: &SalesWindow,
    ) -> Result<FactSnapshot, ServiceError> {
        let active = self
            .companies
            .iter()
            .any(|c| c.id == company_id && c.is_active);
        if !active {
            return Err(ServiceError::NotFound(format!(
                "Company {} not found",
                company_id
            )));
        }

        let mut products: Vec<ProductFact> = self
            .products
            .iter()
            .filter(|p| p.company_id == company_id && p.is_active)
            .cloned()
            .map(ProductFact::from)
            .collect();
        products.sort_by_key(|p| p.id);
        let product_ids: HashSet<i32> = products.iter().map(|p| p.id).collect();
        let category_ids: HashSet<i32> = products.iter().filter_map(|p| p.category_id).collect();

        let mut warehouses: Vec<WarehouseFact> = self
            .warehouses
            .iter()
            .filter(|w| w.company_id == company_id)
            .cloned()
            .map(WarehouseFact::from)
            .collect();
        warehouses.sort_by_key(|w| w.id);
        let warehouse_ids: HashSet<i32> = warehouses.iter().map(|w| w.id).collect();
        let in_company =
            |p: i32, w: i32| product_ids.contains(&p) && warehouse_ids.contains(&w);

        let mut stock_levels: Vec<StockLevel> = self
            .inventory
            .iter()
            .filter(|row| in_company(row.product_id, row.warehouse_id))
            .cloned()
            .map(StockLevel::from)
            .collect();
        stock_levels.sort_by_key(|s| (s.product_id, s.warehouse_id));

        let entries: Vec<SalesEntry> = self
            .daily_sales
            .iter()
            .filter(|row| in_company(row.product_id, row.warehouse_id))
            .map(SalesEntry::from)
            .collect();

        let mut supplier_links: Vec<SupplierLink> = self
            .product_suppliers
            .iter()
            .filter(|link| product_ids.contains(&link.product_id))
            .filter_map(|link| {
                self.suppliers
                    .iter()
                    .find(|s| s.id == link.supplier_id && s.is_active)
                    .map(|s| supplier_link(link.clone(), s.clone()))
            })
            .collect();
        supplier_links.sort_by_key(|l| (l.product_id, l.supplier_id));

        Ok(FactSnapshot {
            categories: self
                .categories
                .iter()
                .filter(|c| category_ids.contains(&c.id))
                .cloned()
                .map(CategoryFact::from)
                .collect(),
            sales_totals: sum_sales_in_window(&entries, window),
            products,
            warehouses,
            stock_levels,
            supplier_links,
        })
    }
}
