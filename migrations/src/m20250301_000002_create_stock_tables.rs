use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_catalog_tables::{Products, Warehouses};

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250301_000002_create_stock_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Inventory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Inventory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Inventory::ProductId).integer().not_null())
                    .col(ColumnDef::new(Inventory::WarehouseId).integer().not_null())
                    .col(
                        ColumnDef::new(Inventory::Quantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_product")
                            .from(Inventory::Table, Inventory::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_warehouse")
                            .from(Inventory::Table, Inventory::WarehouseId)
                            .to(Warehouses::Table, Warehouses::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_product_warehouse")
                    .table(Inventory::Table)
                    .col(Inventory::ProductId)
                    .col(Inventory::WarehouseId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DailySalesSummary::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DailySalesSummary::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DailySalesSummary::ProductId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DailySalesSummary::WarehouseId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DailySalesSummary::SaleDate).date().not_null())
                    .col(
                        ColumnDef::new(DailySalesSummary::QuantitySold)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // Covers the trailing-window scan: date range first, then the grouping keys.
        manager
            .create_index(
                Index::create()
                    .name("idx_daily_sales_date_product_warehouse")
                    .table(DailySalesSummary::Table)
                    .col(DailySalesSummary::SaleDate)
                    .col(DailySalesSummary::ProductId)
                    .col(DailySalesSummary::WarehouseId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DailySalesSummary::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Inventory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Inventory {
    Table,
    Id,
    ProductId,
    WarehouseId,
    Quantity,
}

#[derive(DeriveIden)]
pub enum DailySalesSummary {
    Table,
    Id,
    ProductId,
    WarehouseId,
    SaleDate,
    QuantitySold,
}
