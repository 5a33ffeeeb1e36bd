pub mod company;
pub mod daily_sales_summary;
pub mod inventory;
pub mod product;
pub mod product_category;
pub mod product_supplier;
pub mod supplier;
pub mod warehouse;
