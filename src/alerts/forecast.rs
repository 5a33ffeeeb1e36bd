use super::velocity::SalesVelocity;

/// Whole days until `current_stock` runs out at the given sales velocity.
///
/// Computes `floor(current_stock / avg_daily_sales)` as the integer quotient
/// `current_stock * window_days / units_sold`, which is exact. Returns `None` when there is no
/// velocity, so an unknown forecast is never reported as zero.
pub fn days_until_stockout(current_stock: i32, velocity: Option<&SalesVelocity>) -> Option<i64> {
    let velocity = velocity?;
    let units_sold = velocity.units_sold();
    if units_sold <= 0 {
        return None;
    }

    let stock = i64::from(current_stock.max(0));
    Some(stock * i64::from(velocity.window_days()) / units_sold)
}
