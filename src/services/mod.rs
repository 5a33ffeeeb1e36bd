// Low-stock alerting
pub mod low_stock_alerts;

// Catalog maintenance
pub mod product_service;

pub use low_stock_alerts::{AlertSettings, LowStockAlertQuery, LowStockAlertService};
pub use product_service::{CreateProductRequest, CreatedProduct, ProductService};
