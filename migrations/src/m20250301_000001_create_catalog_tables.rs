use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250301_000001_create_catalog_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Companies::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Companies::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Companies::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Companies::IsActive)
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
                    .table(ProductCategories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductCategories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProductCategories::Name)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductCategories::LowStockThresholdDefault)
                            .integer()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::CompanyId).integer().not_null())
                    .col(ColumnDef::new(Products::Sku).string_len(50).not_null())
                    .col(ColumnDef::new(Products::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Products::Description).text().null())
                    .col(ColumnDef::new(Products::Price).decimal_len(19, 4).null())
                    .col(ColumnDef::new(Products::CategoryId).integer().null())
                    .col(ColumnDef::new(Products::LowStockThreshold).integer().null())
                    .col(
                        ColumnDef::new(Products::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Products::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_company")
                            .from(Products::Table, Products::CompanyId)
                            .to(Companies::Table, Companies::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_category")
                            .from(Products::Table, Products::CategoryId)
                            .to(ProductCategories::Table, ProductCategories::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_products_company_sku")
                    .table(Products::Table)
                    .col(Products::CompanyId)
                    .col(Products::Sku)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Warehouses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Warehouses::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Warehouses::CompanyId).integer().not_null())
                    .col(ColumnDef::new(Warehouses::Name).string_len(255).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_warehouses_company")
                            .from(Warehouses::Table, Warehouses::CompanyId)
                            .to(Companies::Table, Companies::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Warehouses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductCategories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Companies::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Companies {
    Table,
    Id,
    Name,
    IsActive,
}

#[derive(DeriveIden)]
pub enum ProductCategories {
    Table,
    Id,
    Name,
    LowStockThresholdDefault,
}

#[derive(DeriveIden)]
pub enum Products {
    Table,
    Id,
    CompanyId,
    Sku,
    Name,
    Description,
    Price,
    CategoryId,
    LowStockThreshold,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum Warehouses {
    Table,
    Id,
    CompanyId,
    Name,
}
