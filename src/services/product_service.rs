use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use validator::Validate;

use crate::{
    db::{with_transaction, DbPool},
    entities::{
        company,
        inventory,
        product::{self, Column as ProductColumn, Entity as Product},
        product_category, warehouse,
    },
    errors::{ServiceError, ValidationErrors},
    metrics::PRODUCTS_CREATED,
};

const MAX_SKU_LEN: usize = 50;

/// Body of a product creation request. Every field is optional at the wire level so
/// missing values surface as field errors rather than deserialization failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub name: Option<String>,
    pub sku: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub low_stock_threshold: Option<i32>,
    pub warehouse_id: Option<i32>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub initial_quantity: Option<i32>,
}

/// A creation request that passed field validation, normalized for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub low_stock_threshold: Option<i32>,
    /// Warehouse and quantity of the opening inventory row, if one is requested
    pub opening_stock: Option<(i32, i32)>,
}

impl CreateProductRequest {
    /// Checks every field at once and reports all failures together.
    pub fn into_new_product(self) -> Result<NewProduct, ServiceError> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = self.validate() {
            errors.merge(e);
        }

        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        if name.is_none() {
            errors.add("name", "required", "name is required");
        }

        let sku = self
            .sku
            .as_deref()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty());
        match &sku {
            None => errors.add("sku", "required", "sku is required"),
            Some(s) if s.chars().count() > MAX_SKU_LEN => errors.add(
                "sku",
                "length",
                format!("must be 1-{} characters", MAX_SKU_LEN),
            ),
            Some(_) => {}
        }

        if self.price.is_some_and(|p| p < Decimal::ZERO) {
            errors.add("price", "range", "must not be negative");
        }

        errors.into_result()?;

        let (Some(name), Some(sku)) = (name, sku) else {
            return Err(ServiceError::InternalError(
                "validated product is missing name or sku".to_string(),
            ));
        };

        Ok(NewProduct {
            name,
            sku,
            price: self.price,
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            category_id: self.category_id,
            low_stock_threshold: self.low_stock_threshold,
            opening_stock: self
                .warehouse_id
                .map(|w| (w, self.initial_quantity.unwrap_or(0))),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: i32,
    pub name: String,
    pub sku: String,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningStock {
    pub warehouse_id: i32,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedProduct {
    pub message: String,
    pub product: ProductSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<OpeningStock>,
}

/// Service for managing products
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
}

impl ProductService {
    /// Creates a new product service instance
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Creates a product and, when a warehouse is given, its opening inventory row.
    ///
    /// Both rows are written in one transaction. A duplicate SKU within the company is
    /// reported as `AlreadyExists`, whether caught by the pre-check or by the unique index.
    #[instrument(skip(self, request))]
    pub async fn create_product(
        &self,
        company_id: i32,
        request: CreateProductRequest,
    ) -> Result<CreatedProduct, ServiceError> {
        let new_product = request.into_new_product()?;
        let db = &*self.db_pool;

        let company = company::Entity::find_by_id(company_id).one(db).await?;
        if !company.is_some_and(|c| c.is_active) {
            return Err(ServiceError::NotFound(format!(
                "Company {} not found",
                company_id
            )));
        }

        // Check if a product with the same SKU already exists
        let existing = Product::find()
            .filter(ProductColumn::CompanyId.eq(company_id))
            .filter(ProductColumn::Sku.eq(new_product.sku.as_str()))
            .count(db)
            .await
            .map_err(|e| {
                error!(company_id, error = %e, "Failed to check for existing product");
                ServiceError::DatabaseError(e)
            })?;
        if existing > 0 {
            warn!(company_id, sku = %new_product.sku, "Rejected duplicate SKU");
            return Err(duplicate_sku(&new_product.sku));
        }

        if let Some(category_id) = new_product.category_id {
            if product_category::Entity::find_by_id(category_id)
                .one(db)
                .await?
                .is_none()
            {
                return Err(ServiceError::NotFound(format!(
                    "Category {} not found",
                    category_id
                )));
            }
        }

        if let Some((warehouse_id, _)) = new_product.opening_stock {
            let found = warehouse::Entity::find_by_id(warehouse_id)
                .filter(warehouse::Column::CompanyId.eq(company_id))
                .one(db)
                .await?;
            if found.is_none() {
                return Err(ServiceError::NotFound(format!(
                    "Warehouse {} not found",
                    warehouse_id
                )));
            }
        }

        let sku = new_product.sku.clone();
        let result = with_transaction(db, move |txn| {
            Box::pin(async move {
                let product = product::ActiveModel {
                    company_id: Set(company_id),
                    sku: Set(new_product.sku),
                    name: Set(new_product.name),
                    description: Set(new_product.description),
                    price: Set(new_product.price),
                    category_id: Set(new_product.category_id),
                    low_stock_threshold: Set(new_product.low_stock_threshold),
                    is_active: Set(true),
                    created_at: Set(Utc::now()),
                    ..Default::default()
                }
                .insert(txn)
                .await?;

                let opening = match new_product.opening_stock {
                    Some((warehouse_id, quantity)) => {
                        inventory::ActiveModel {
                            product_id: Set(product.id),
                            warehouse_id: Set(warehouse_id),
                            quantity: Set(quantity),
                            ..Default::default()
                        }
                        .insert(txn)
                        .await?;
                        Some(OpeningStock {
                            warehouse_id,
                            quantity,
                        })
                    }
                    None => None,
                };

                Ok::<_, DbErr>((product, opening))
            })
        })
        .await;

        let (product, opening) = match result {
            Ok(created) => created,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                warn!(company_id, sku = %sku, "SKU claimed concurrently; insert rolled back");
                return Err(duplicate_sku(&sku));
            }
            Err(e) => {
                error!(company_id, sku = %sku, error = %e, "Failed to create product");
                return Err(ServiceError::DatabaseError(e));
            }
        };

        PRODUCTS_CREATED.inc();
        info!(
            product_id = product.id,
            company_id,
            sku = %product.sku,
            with_inventory = opening.is_some(),
            "Product created successfully"
        );

        Ok(CreatedProduct {
            message: "Product created successfully".to_string(),
            product: ProductSummary {
                id: product.id,
                name: product.name,
                sku: product.sku,
                price: product.price,
            },
            inventory: opening,
        })
    }
}

fn duplicate_sku(sku: &str) -> ServiceError {
    ServiceError::AlreadyExists(format!("SKU '{}' already exists", sku))
}
