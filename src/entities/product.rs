use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product entity
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owning company
    pub company_id: i32,

    /// SKU, unique within the owning company
    pub sku: String,

    /// Product name
    pub name: String,

    /// Product description
    pub description: Option<String>,

    /// Product base price
    pub price: Option<Decimal>,

    /// Product category ID
    pub category_id: Option<i32>,

    /// Product-level reorder threshold; overrides the category default when set
    pub low_stock_threshold: Option<i32>,

    /// Is the product active
    pub is_active: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Product entity relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::company::Entity",
        from = "Column::CompanyId",
        to = "super::company::Column::Id"
    )]
    Company,
    #[sea_orm(
        belongs_to = "super::product_category::Entity",
        from = "Column::CategoryId",
        to = "super::product_category::Column::Id"
    )]
    Category,
    #[sea_orm(has_many = "super::inventory::Entity")]
    Inventory,
    #[sea_orm(has_many = "super::product_supplier::Entity")]
    SupplierLinks,
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl Related<super::product_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::inventory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inventory.def()
    }
}

impl Related<super::product_supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SupplierLinks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
