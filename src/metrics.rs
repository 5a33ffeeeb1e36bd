//! Prometheus counters for the alert and catalog endpoints, served as text at `/metrics`.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new_custom(Some("stockflow".into()), None)
        .expect("registry can be created");
    pub static ref ALERT_REQUESTS: IntCounter = register(IntCounter::new(
        "low_stock_alert_requests_total",
        "Total number of low-stock alert computations requested"
    ));
    pub static ref ALERT_FAILURES: IntCounterVec = register(IntCounterVec::new(
        Opts::new(
            "low_stock_alert_failures_total",
            "Total number of failed low-stock alert computations"
        ),
        &["error_type"]
    ));
    pub static ref ALERTS_EMITTED: IntCounter = register(IntCounter::new(
        "low_stock_alerts_emitted_total",
        "Total number of low-stock alerts returned"
    ));
    pub static ref PRODUCTS_CREATED: IntCounter = register(IntCounter::new(
        "products_created_total",
        "Total number of products created"
    ));
}

fn register<M>(metric: prometheus::Result<M>) -> M
where
    M: prometheus::core::Collector + Clone + 'static,
{
    let metric = metric.expect("metric can be created");
    REGISTRY
        .register(Box::new(metric.clone()))
        .expect("metric can be registered");
    metric
}

/// Label value for a failed computation.
pub fn error_type(err: &crate::errors::ServiceError) -> &'static str {
    use crate::errors::ServiceError::*;
    match err {
        DatabaseError(_) => "database",
        NotFound(_) => "not_found",
        ValidationError(_) => "validation",
        AlreadyExists(_) => "already_exists",
        Timeout(_) => "timeout",
        InternalError(_) => "internal",
    }
}

/// Renders every registered metric in the Prometheus text exposition format.
pub fn render() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_output_names_alert_counters() {
        ALERT_REQUESTS.inc();
        ALERT_FAILURES.with_label_values(&["timeout"]).inc();
        let text = render().unwrap();
        assert!(text.contains("stockflow_low_stock_alert_requests_total"));
        assert!(text.contains("error_type=\"timeout\""));
    }
}
