use std::cmp::Ordering;

use super::{velocity::SalesVelocity, Alert};

/// A joined (product, warehouse) row before filtering.
#[derive(Debug, Clone)]
pub struct AlertCandidate {
    pub alert: Alert,
    pub velocity: Option<SalesVelocity>,
}

impl AlertCandidate {
    /// Below threshold and sold in this very warehouse during the window.
    pub fn is_low_stock(&self) -> bool {
        self.alert.current_stock < self.alert.threshold && self.velocity.is_some()
    }
}

/// Most urgent first; unknown forecasts after every known one.
pub fn urgency_order(a: &Alert, b: &Alert) -> Ordering {
    match (a.days_until_stockout, b.days_until_stockout) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Keeps genuinely low-stock candidates and orders them by urgency.
///
/// The sort is stable: equally urgent alerts keep their input order.
pub fn rank(candidates: Vec<AlertCandidate>) -> Vec<Alert> {
    let mut alerts: Vec<Alert> = candidates
        .into_iter()
        .filter(AlertCandidate::is_low_stock)
        .map(|candidate| candidate.alert)
        .collect();
    alerts.sort_by(urgency_order);
    alerts
}
