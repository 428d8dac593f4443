use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Dataset-wide KPIs, the standardized summary of one analysis run.
///
/// This struct is one of the final outputs of the `MetricsEngine` and serves
/// as the data transfer object for headline figures throughout the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralKpis {
    pub total_revenue: Decimal,
    pub total_customers: u64,
    pub total_products: u64,
    pub total_orders: u64,
    pub avg_ticket: Decimal,

    /// Mean days since last order, across customers.
    pub avg_recency: f64,
    /// Mean distinct-order count, across customers.
    pub avg_frequency: f64,

    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub period_days: i64,

    /// Mean signed day-offset between each client's projected stock-out date
    /// (last order + median turnover + logistics delay) and the reference
    /// date. Negative values mean the average client is already past its
    /// replenishment window.
    pub ruptura_projetada_media: f64,
}

impl GeneralKpis {
    /// Creates a new, zeroed-out KPI report.
    /// This is the documented result for an empty transaction set.
    pub fn new() -> Self {
        Self {
            total_revenue: Decimal::ZERO,
            total_customers: 0,
            total_products: 0,
            total_orders: 0,
            avg_ticket: Decimal::ZERO,
            avg_recency: 0.0,
            avg_frequency: 0.0,
            period_start: None,
            period_end: None,
            period_days: 0,
            ruptura_projetada_media: 0.0,
        }
    }
}

impl Default for GeneralKpis {
    fn default() -> Self {
        Self::new()
    }
}
