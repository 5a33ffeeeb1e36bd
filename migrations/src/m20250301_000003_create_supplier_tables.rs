use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_catalog_tables::Products;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250301_000003_create_supplier_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Suppliers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Suppliers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Suppliers::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Suppliers::ContactEmail).string_len(255).null())
                    .col(
                        ColumnDef::new(Suppliers::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductSuppliers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductSuppliers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProductSuppliers::ProductId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductSuppliers::SupplierId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductSuppliers::IsPreferred)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ProductSuppliers::UnitCost)
                            .decimal_len(19, 4)
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_suppliers_product")
                            .from(ProductSuppliers::Table, ProductSuppliers::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_suppliers_supplier")
                            .from(ProductSuppliers::Table, ProductSuppliers::SupplierId)
                            .to(Suppliers::Table, Suppliers::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_suppliers_product")
                    .table(ProductSuppliers::Table)
                    .col(ProductSuppliers::ProductId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProductSuppliers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Suppliers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Suppliers {
    Table,
    Id,
    Name,
    ContactEmail,
    IsActive,
}

#[derive(DeriveIden)]
pub enum ProductSuppliers {
    Table,
    Id,
    ProductId,
    SupplierId,
    IsPreferred,
    UnitCost,
}
