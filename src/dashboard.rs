//! Dashboard reporting shapes.
//!
//! The admin charts consume these exact shapes: a `Jan`..`Dec` revenue
//! series (always 12 entries, zero-filled), and color-tagged
//! `{name, value, color}` breakdown arrays. The storage layer supplies raw
//! aggregates; the formatting here is shared by every backend so the wire
//! contract cannot drift between them.

use serde::Serialize;

use crate::domain::PaymentType;

pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub const CATEGORY_COLORS: [&str; 5] = ["#8884d8", "#82ca9d", "#ffc658", "#ff7300", "#00C49F"];

pub const PAYMENT_COLORS: [&str; 4] = ["#8884d8", "#82ca9d", "#ffc658", "#ff7300"];

/// One month's slice of the sales-stats aggregation.
#[derive(Clone, Debug, Serialize)]
pub struct MonthlySalesRow {
    pub month: u32,
    pub total: i64,
    pub count: i64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesStats {
    pub total_orders: i64,
    pub total_sales: i64,
    pub paid_orders: i64,
    pub pending_orders: i64,
    pub cancelled_orders: i64,
    pub monthly_sales: Vec<MonthlySalesRow>,
}

/// Raw aggregates the graph-stats endpoint formats for the charts.
#[derive(Clone, Debug, Default)]
pub struct GraphStatsRaw {
    pub total_orders: i64,
    pub active_customers: i64,
    pub daily_sales: i64,
    pub monthly_sales: i64,
    pub yearly_sales: i64,
    /// `(month 1..=12, revenue)`; months with no orders may be absent.
    pub revenue_by_month: Vec<(u32, i64)>,
    /// `(category name, product count)` in category-creation order.
    pub category_counts: Vec<(String, i64)>,
    pub payment_counts: Vec<(PaymentType, i64)>,
    /// Top sellers by units sold, best first.
    pub top_products: Vec<TopProductRow>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProductRow {
    pub name: String,
    pub total_sold: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct SalesWindows {
    pub daily: i64,
    pub monthly: i64,
    pub yearly: i64,
    pub change: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct MonthRevenue {
    pub month: String,
    pub revenue: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChartSlice {
    pub name: String,
    pub value: i64,
    pub color: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub total_sales: SalesWindows,
    pub total_orders: i64,
    pub active_customers: i64,
    /// Name of the best seller, or "N/A" when nothing has sold yet.
    pub top_selling_products: String,
    pub revenue: Vec<MonthRevenue>,
    pub categories: Vec<ChartSlice>,
    pub payment_methods: Vec<ChartSlice>,
}

/// Flattened order row for the recent-orders widget.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentOrderRow {
    pub id: uuid::Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub payment_type: PaymentType,
    pub amount: i64,
    pub status: crate::domain::OrderStatus,
    /// `YYYY-MM-DD`.
    pub date: String,
}

/// Start of the current day, month, and year (UTC) for the daily/monthly/
/// yearly sales windows, anchored at `now`.
pub fn window_starts(
    now: chrono::DateTime<chrono::Utc>,
) -> (
    chrono::DateTime<chrono::Utc>,
    chrono::DateTime<chrono::Utc>,
    chrono::DateTime<chrono::Utc>,
) {
    use chrono::{Datelike, TimeZone, Utc};

    let date = now.date_naive();
    let midnight = |d: chrono::NaiveDate| {
        d.and_hms_opt(0, 0, 0)
            .map(|dt| Utc.from_utc_datetime(&dt))
            .unwrap_or(now)
    };
    (
        midnight(date),
        midnight(date.with_day(1).unwrap_or(date)),
        midnight(date.with_ordinal(1).unwrap_or(date)),
    )
}

pub fn month_series(rows: &[(u32, i64)]) -> Vec<MonthRevenue> {
    MONTH_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| MonthRevenue {
            month: (*name).to_owned(),
            revenue: rows
                .iter()
                .find(|(month, _)| *month == i as u32 + 1)
                .map(|(_, revenue)| *revenue)
                .unwrap_or(0),
        })
        .collect()
}

pub fn category_slices(counts: &[(String, i64)]) -> Vec<ChartSlice> {
    counts
        .iter()
        .enumerate()
        .map(|(i, (name, count))| ChartSlice {
            name: name.clone(),
            value: *count,
            color: CATEGORY_COLORS[i % CATEGORY_COLORS.len()].to_owned(),
        })
        .collect()
}

pub fn payment_slices(counts: &[(PaymentType, i64)]) -> Vec<ChartSlice> {
    counts
        .iter()
        .enumerate()
        .map(|(i, (payment_type, count))| ChartSlice {
            name: payment_type.label().to_owned(),
            value: *count,
            color: PAYMENT_COLORS[i % PAYMENT_COLORS.len()].to_owned(),
        })
        .collect()
}

pub fn format_graph_stats(raw: GraphStatsRaw) -> GraphStats {
    GraphStats {
        total_sales: SalesWindows {
            daily: raw.daily_sales,
            monthly: raw.monthly_sales,
            yearly: raw.yearly_sales,
            // Growth is not computed yet; the dashboard renders this label
            // as-is.
            change: "+12.5%".to_owned(),
        },
        total_orders: raw.total_orders,
        active_customers: raw.active_customers,
        top_selling_products: raw
            .top_products
            .first()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "N/A".to_owned()),
        revenue: month_series(&raw.revenue_by_month),
        categories: category_slices(&raw.category_counts),
        payment_methods: payment_slices(&raw.payment_counts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_series_zero_fills_all_twelve() {
        let series = month_series(&[(2, 1200), (11, 300)]);
        assert_eq!(series.len(), 12);
        assert_eq!(series[0].month, "Jan");
        assert_eq!(series[0].revenue, 0);
        assert_eq!(series[1].month, "Feb");
        assert_eq!(series[1].revenue, 1200);
        assert_eq!(series[10].revenue, 300);
        assert_eq!(series[11].month, "Dec");
    }

    #[test]
    fn category_colors_cycle_past_five() {
        let counts: Vec<(String, i64)> = (0..7).map(|i| (format!("c{i}"), i)).collect();
        let slices = category_slices(&counts);
        assert_eq!(slices[0].color, slices[5].color);
        assert_eq!(slices[1].color, slices[6].color);
    }

    #[test]
    fn payment_slices_use_display_labels() {
        let slices = payment_slices(&[(PaymentType::Cod, 3), (PaymentType::Bank, 1)]);
        assert_eq!(slices[0].name, "Cash on Delivery");
        assert_eq!(slices[1].name, "Bank Transfer");
    }

    #[test]
    fn graph_stats_fall_back_to_na_top_seller() {
        let stats = format_graph_stats(GraphStatsRaw::default());
        assert_eq!(stats.top_selling_products, "N/A");
        assert_eq!(stats.revenue.len(), 12);
    }
}
