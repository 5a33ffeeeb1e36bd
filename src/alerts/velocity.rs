use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

use super::SalesTotal;

/// Trailing sales window reaching `days` calendar days back from the reporting date.
///
/// Dates in the window satisfy `start <= date < end`, where `start` is `as_of - days` and
/// `end` is the day after `as_of`. Averages are still taken over `days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SalesWindow {
    start: NaiveDate,
    end: NaiveDate,
    days: u32,
}

impl SalesWindow {
    pub fn ending_on(as_of: NaiveDate, days: u32) -> Self {
        let start = as_of - Duration::days(i64::from(days));
        let end = as_of + Duration::days(1);
        Self { start, end, days }
    }

    /// First day counted.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// First day past the window.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

/// One row of the daily sales rollup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesEntry {
    pub product_id: i32,
    pub warehouse_id: i32,
    pub sale_date: NaiveDate,
    pub quantity_sold: i32,
}

/// Average daily units sold for one (product, warehouse) pair.
///
/// Only constructible from a positive total, so holding one means the pair had recent
/// activity. The rate is kept as the exact fraction `units_sold / window_days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SalesVelocity {
    units_sold: i64,
    window_days: u32,
}

impl SalesVelocity {
    pub fn new(units_sold: i64, window_days: u32) -> Option<Self> {
        if units_sold > 0 && window_days > 0 {
            Some(Self {
                units_sold,
                window_days,
            })
        } else {
            None
        }
    }

    pub fn units_sold(&self) -> i64 {
        self.units_sold
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    pub fn avg_daily_sales(&self) -> Decimal {
        Decimal::from(self.units_sold) / Decimal::from(self.window_days)
    }
}

/// Sums raw entries falling inside `window` per (product, warehouse) in a single pass.
///
/// Pairs whose total is zero are dropped, matching `HAVING SUM(quantity_sold) > 0` on the
/// SQL side. Output is ordered by (product_id, warehouse_id).
pub fn sum_sales_in_window<'a, I>(entries: I, window: &SalesWindow) -> Vec<SalesTotal>
where
    I: IntoIterator<Item = &'a SalesEntry>,
{
    let mut totals: BTreeMap<(i32, i32), i64> = BTreeMap::new();
    for entry in entries {
        if window.contains(entry.sale_date) {
            *totals
                .entry((entry.product_id, entry.warehouse_id))
                .or_default() += i64::from(entry.quantity_sold);
        }
    }

    totals
        .into_iter()
        .filter(|(_, units)| *units > 0)
        .map(|((product_id, warehouse_id), units_sold)| SalesTotal {
            product_id,
            warehouse_id,
            units_sold,
        })
        .collect()
}

/// Turns windowed totals into velocity facts keyed by (product_id, warehouse_id).
///
/// Pairs with no positive total get no entry at all.
pub fn velocity_facts(totals: &[SalesTotal], window_days: u32) -> HashMap<(i32, i32), SalesVelocity> {
    let mut summed: HashMap<(i32, i32), i64> = HashMap::with_capacity(totals.len());
    for total in totals {
        *summed
            .entry((total.product_id, total.warehouse_id))
            .or_default() += total.units_sold;
    }

    summed
        .into_iter()
        .filter_map(|(key, units)| SalesVelocity::new(units, window_days).map(|v| (key, v)))
        .collect()
}
