#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::Value;
use stockflow::{
    config::AppConfig,
    db,
    entities::{
        company, daily_sales_summary, inventory, product, product_category, product_supplier,
        supplier, warehouse,
    },
    AppState,
};
use tower::ServiceExt;

/// Helper harness for spinning up an application state backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub db: Arc<DatabaseConnection>,
}

impl TestApp {
    /// Construct a new test application with a fresh, migrated database.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // One connection keeps every query on the same in-memory database
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        let state = AppState::new(db.clone(), cfg);
        let router = stockflow::build_router(state.clone());

        Self { router, state, db }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("router response");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn company(&self, id: i32, active: bool) {
        company::ActiveModel {
            id: Set(id),
            name: Set(format!("Company {}", id)),
            is_active: Set(active),
        }
        .insert(&*self.db)
        .await
        .expect("insert company");
    }

    pub async fn category(&self, id: i32, default_threshold: Option<i32>) {
        product_category::ActiveModel {
            id: Set(id),
            name: Set(format!("Category {}", id)),
            low_stock_threshold_default: Set(default_threshold),
        }
        .insert(&*self.db)
        .await
        .expect("insert category");
    }

    pub async fn product(
        &self,
        id: i32,
        company_id: i32,
        category_id: Option<i32>,
        threshold: Option<i32>,
    ) {
        self.product_with_status(id, company_id, category_id, threshold, true)
            .await;
    }

    pub async fn product_with_status(
        &self,
        id: i32,
        company_id: i32,
        category_id: Option<i32>,
        threshold: Option<i32>,
        active: bool,
    ) {
        product::ActiveModel {
            id: Set(id),
            company_id: Set(company_id),
            sku: Set(format!("SKU-{}", id)),
            name: Set(format!("Product {}", id)),
            description: Set(None),
            price: Set(None),
            category_id: Set(category_id),
            low_stock_threshold: Set(threshold),
            is_active: Set(active),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("insert product");
    }

    pub async fn warehouse(&self, id: i32, company_id: i32) {
        warehouse::ActiveModel {
            id: Set(id),
            company_id: Set(company_id),
            name: Set(format!("Warehouse {}", id)),
        }
        .insert(&*self.db)
        .await
        .expect("insert warehouse");
    }

    pub async fn stock(&self, product_id: i32, warehouse_id: i32, quantity: i32) {
        inventory::ActiveModel {
            product_id: Set(product_id),
            warehouse_id: Set(warehouse_id),
            quantity: Set(quantity),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .expect("insert inventory");
    }

    pub async fn sale(&self, product_id: i32, warehouse_id: i32, sale_date: NaiveDate, quantity: i32) {
        daily_sales_summary::ActiveModel {
            product_id: Set(product_id),
            warehouse_id: Set(warehouse_id),
            sale_date: Set(sale_date),
            quantity_sold: Set(quantity),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .expect("insert daily sales");
    }

    pub async fn supplier(&self, id: i32, active: bool) {
        supplier::ActiveModel {
            id: Set(id),
            name: Set(format!("Supplier {}", id)),
            contact_email: Set(Some(format!("orders@supplier{}.example", id))),
            is_active: Set(active),
        }
        .insert(&*self.db)
        .await
        .expect("insert supplier");
    }

    pub async fn link(&self, product_id: i32, supplier_id: i32, preferred: bool, unit_cost: Decimal) {
        product_supplier::ActiveModel {
            product_id: Set(product_id),
            supplier_id: Set(supplier_id),
            is_preferred: Set(preferred),
            unit_cost: Set(unit_cost),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .expect("insert product supplier");
    }
}

/// A fixed reporting date for tests that call the service directly.
pub fn report_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 30).expect("valid date")
}

pub fn days_before(date: NaiveDate, days: i64) -> NaiveDate {
    date - Duration::days(days)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
