use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};
use validator::Validate;

use crate::{
    alerts::{compute_alerts, AlertParams, AlertReport, SalesWindow},
    config::AppConfig,
    errors::ServiceError,
    metrics::{self, ALERTS_EMITTED, ALERT_FAILURES, ALERT_REQUESTS},
    repositories::AlertFactSource,
};

/// Engine settings fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertSettings {
    pub window_days: u32,
    pub default_threshold: i32,
    /// Upper bound on loading one fact snapshot
    pub time_budget: Duration,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            window_days: 30,
            default_threshold: 10,
            time_budget: Duration::from_secs(10),
        }
    }
}

impl From<&AppConfig> for AlertSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            window_days: cfg.alert_window_days,
            default_threshold: cfg.default_low_stock_threshold,
            time_budget: Duration::from_secs(cfg.alert_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LowStockAlertQuery {
    pub company_id: i32,
    #[validate(range(min = 1, max = 365, message = "must be between 1 and 365"))]
    pub window_days: Option<i64>,
    /// Reporting date; defaults to today (UTC)
    pub as_of: Option<NaiveDate>,
}

impl LowStockAlertQuery {
    pub fn new(company_id: i32) -> Self {
        Self {
            company_id,
            window_days: None,
            as_of: None,
        }
    }

    pub fn with_window_days(mut self, window_days: i64) -> Self {
        self.window_days = Some(window_days);
        self
    }

    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    /// Builds a query from the raw `window_days` text of a request.
    ///
    /// Blank text means "use the configured default"; anything else must parse as an integer.
    pub fn parse(company_id: i32, window_days: Option<&str>) -> Result<Self, ServiceError> {
        let mut query = Self::new(company_id);
        if let Some(raw) = window_days.map(str::trim).filter(|s| !s.is_empty()) {
            let days = raw.parse::<i64>().map_err(|_| {
                ServiceError::invalid_field(
                    "window_days",
                    "invalid_number",
                    format!("'{}' is not a whole number of days", raw),
                )
            })?;
            query.window_days = Some(days);
        }
        Ok(query)
    }
}

/// Produces ranked low-stock alerts for one company at a time.
#[derive(Clone)]
pub struct LowStockAlertService {
    facts: Arc<dyn AlertFactSource>,
    settings: AlertSettings,
}

impl LowStockAlertService {
    pub fn new(facts: Arc<dyn AlertFactSource>, settings: AlertSettings) -> Self {
        Self { facts, settings }
    }

    pub fn settings(&self) -> &AlertSettings {
        &self.settings
    }

    /// Validates the query, loads one fact snapshot under the time budget and runs the
    /// alert engine over it.
    ///
    /// Any failure while loading facts aborts the whole computation; no partial list is
    /// ever returned.
    #[instrument(skip(self), fields(company_id = query.company_id))]
    pub async fn low_stock_alerts(
        &self,
        query: LowStockAlertQuery,
    ) -> Result<AlertReport, ServiceError> {
        ALERT_REQUESTS.inc();
        let result = self.compute(query).await;
        match &result {
            Ok(report) => ALERTS_EMITTED.inc_by(report.total_alerts as u64),
            Err(e) => ALERT_FAILURES
                .with_label_values(&[metrics::error_type(e)])
                .inc(),
        }
        result
    }

    async fn compute(&self, query: LowStockAlertQuery) -> Result<AlertReport, ServiceError> {
        query.validate()?;

        let company_id = query.company_id;
        let window_days = match query.window_days {
            Some(days) => u32::try_from(days).map_err(|_| {
                ServiceError::invalid_field("window_days", "range", "must be between 1 and 365")
            })?,
            None => self.settings.window_days,
        };
        let as_of = query.as_of.unwrap_or_else(|| Utc::now().date_naive());
        let window = SalesWindow::ending_on(as_of, window_days);

        let snapshot = match timeout(
            self.settings.time_budget,
            self.facts.load_snapshot(company_id, &window),
        )
        .await
        {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                if e.is_data_access() {
                    error!(company_id, error = %e, "Failed to load alert facts");
                } else {
                    warn!(company_id, error = %e, "Alert facts unavailable");
                }
                return Err(e);
            }
            Err(_) => {
                error!(
                    company_id,
                    budget_ms = self.settings.time_budget.as_millis() as u64,
                    "Loading alert facts exceeded the time budget"
                );
                return Err(ServiceError::Timeout(format!(
                    "Loading stock data for company {} took longer than {}s",
                    company_id,
                    self.settings.time_budget.as_secs()
                )));
            }
        };

        let params = AlertParams {
            window_days,
            default_threshold: self.settings.default_threshold,
        };
        let alerts = compute_alerts(&snapshot, &params)?;

        info!(
            company_id,
            window_days,
            %as_of,
            total_alerts = alerts.len(),
            "Computed low-stock alerts"
        );
        Ok(AlertReport::new(company_id, window_days, alerts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::FactSnapshot;
    use crate::entities::{company, daily_sales_summary, inventory, product, warehouse};
    use crate::repositories::InMemoryAlertFacts;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use sea_orm::DbErr;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()
    }

    fn facts() -> InMemoryAlertFacts {
        InMemoryAlertFacts {
            companies: vec![
                company::Model {
                    id: 1,
                    name: "Acme".into(),
                    is_active: true,
                },
                company::Model {
                    id: 2,
                    name: "Dormant".into(),
                    is_active: false,
                },
            ],
            products: vec![product::Model {
                id: 10,
                company_id: 1,
                sku: "BOLT-M8".into(),
                name: "M8 bolt".into(),
                description: None,
                price: None,
                category_id: None,
                low_stock_threshold: Some(50),
                is_active: true,
                created_at: Utc::now(),
            }],
            warehouses: vec![warehouse::Model {
                id: 100,
                company_id: 1,
                name: "Main".into(),
            }],
            inventory: vec![inventory::Model {
                id: 1,
                product_id: 10,
                warehouse_id: 100,
                quantity: 40,
            }],
            // 60 units in the last 30 days (03-01 is the first day counted), plus an
            // older row outside the window
            daily_sales: vec![
                daily_sales_summary::Model {
                    id: 1,
                    product_id: 10,
                    warehouse_id: 100,
                    sale_date: today(),
                    quantity_sold: 45,
                },
                daily_sales_summary::Model {
                    id: 2,
                    product_id: 10,
                    warehouse_id: 100,
                    sale_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                    quantity_sold: 15,
                },
                daily_sales_summary::Model {
                    id: 3,
                    product_id: 10,
                    warehouse_id: 100,
                    sale_date: NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
                    quantity_sold: 500,
                },
            ],
            ..Default::default()
        }
    }

    fn service(source: impl AlertFactSource + 'static) -> LowStockAlertService {
        LowStockAlertService::new(Arc::new(source), AlertSettings::default())
    }

    struct BrokenSource;

    #[async_trait]
    impl AlertFactSource for BrokenSource {
        async fn load_snapshot(
            &self,
            _company_id: i32,
            _window: &SalesWindow,
        ) -> Result<FactSnapshot, ServiceError> {
            Err(DbErr::Custom("connection reset".into()).into())
        }
    }

    struct SlowSource;

    #[async_trait]
    impl AlertFactSource for SlowSource {
        async fn load_snapshot(
            &self,
            _company_id: i32,
            _window: &SalesWindow,
        ) -> Result<FactSnapshot, ServiceError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(FactSnapshot::default())
        }
    }

    #[tokio::test]
    async fn reports_alert_with_forecast() {
        let report = service(facts())
            .low_stock_alerts(LowStockAlertQuery::new(1).as_of(today()))
            .await
            .unwrap();

        assert_eq!(report.total_alerts, 1);
        assert_eq!(report.window_days, 30);
        assert_eq!(report.alerts[0].days_until_stockout, Some(20));
    }

    #[tokio::test]
    async fn narrower_window_changes_velocity() {
        let report = service(facts())
            .low_stock_alerts(LowStockAlertQuery::new(1).with_window_days(7).as_of(today()))
            .await
            .unwrap();

        // 45 units over 7 days: 40 * 7 / 45
        assert_eq!(report.alerts[0].days_until_stockout, Some(6));
    }

    #[tokio::test]
    async fn inactive_company_is_not_found() {
        let err = service(facts())
            .low_stock_alerts(LowStockAlertQuery::new(2).as_of(today()))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::NotFound(_));
    }

    #[tokio::test]
    async fn non_positive_company_id_is_not_found() {
        for company_id in [0, -3] {
            let err = service(facts())
                .low_stock_alerts(LowStockAlertQuery::new(company_id).as_of(today()))
                .await
                .unwrap_err();
            assert_matches!(err, ServiceError::NotFound(_));
        }
    }

    #[tokio::test]
    async fn window_out_of_range_is_rejected() {
        for days in [0, -5, 366] {
            let err = service(facts())
                .low_stock_alerts(LowStockAlertQuery::new(1).with_window_days(days))
                .await
                .unwrap_err();
            assert_matches!(err, ServiceError::ValidationError(e) if e.has_field("window_days"));
        }
    }

    #[test]
    fn non_numeric_window_is_rejected_at_parse() {
        let err = LowStockAlertQuery::parse(1, Some("thirty")).unwrap_err();
        assert_matches!(
            err,
            ServiceError::ValidationError(e) if e.fields()[0].code == "invalid_number"
        );
        assert_eq!(
            LowStockAlertQuery::parse(1, Some(" ")).unwrap().window_days,
            None
        );
        assert_eq!(
            LowStockAlertQuery::parse(1, Some("14")).unwrap().window_days,
            Some(14)
        );
    }

    #[tokio::test]
    async fn data_access_failure_returns_no_alerts() {
        let err = service(BrokenSource)
            .low_stock_alerts(LowStockAlertQuery::new(1))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::DatabaseError(_));
    }

    #[tokio::test]
    async fn slow_fetch_times_out() {
        let settings = AlertSettings {
            time_budget: Duration::from_millis(50),
            ..AlertSettings::default()
        };
        let err = LowStockAlertService::new(Arc::new(SlowSource), settings)
            .low_stock_alerts(LowStockAlertQuery::new(1))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::Timeout(_));
        assert!(err.is_data_access());
    }
}
