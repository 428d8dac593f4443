use crate::enums::{AlertKind, Reliability, Tier};
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single normalized sales order line, the input unit of the whole pipeline.
///
/// Transactions are immutable once handed to the analytics engines. `qty` is a
/// nonzero integer and `subtotal` reconciles with `price * qty` upstream; the
/// engines assume consistency and never re-validate those invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub dataset_id: String,
    pub date: DateTime<Utc>,
    pub order_id: String,
    pub client: String,
    #[serde(default)]
    pub seller: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    pub product: String,
    pub price: Decimal,
    pub qty: i64,
    pub subtotal: Decimal,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub segment: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub uf: Option<String>,
}

impl Transaction {
    /// Checks the record invariants the ingestion layer is expected to have
    /// enforced. Callers loading externally produced files should skip (and
    /// log) records that fail here rather than aborting the analysis.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.qty == 0 {
            return Err(CoreError::InvalidTransaction {
                order_id: self.order_id.clone(),
                reason: "qty must be a nonzero integer".to_string(),
            });
        }
        if self.client.is_empty() {
            return Err(CoreError::InvalidTransaction {
                order_id: self.order_id.clone(),
                reason: "client must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Per-client RFM analytics, recomputed wholesale on every analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerAnalytics {
    pub dataset_id: String,
    pub client: String,
    /// Days since the client's latest order, relative to the reference date.
    pub recency: i64,
    /// Distinct order count.
    pub frequency: u64,
    /// Summed subtotal across all of the client's transactions.
    pub monetary: Decimal,
    pub avg_ticket: Decimal,
    /// Median inter-purchase interval in days ("giro mediano").
    pub gm_cliente: f64,
    pub tier: Tier,
    pub segment: Option<String>,
    pub city: Option<String>,
    pub uf: Option<String>,
    pub last_order: DateTime<Utc>,
    pub rfm_score: f64,
    pub segment_weight: f64,
}

/// Per-SKU analytics, recomputed wholesale on every analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductAnalytics {
    pub dataset_id: String,
    pub sku: String,
    pub product: String,
    pub orders: u64,
    pub qty: i64,
    pub revenue: Decimal,
    pub avg_ticket: Option<Decimal>,
    /// Median interval in days between distinct order dates touching this SKU.
    pub turnover_median: Option<f64>,
    /// Whether this SKU sits in the top revenue-share band of the dataset.
    pub hero_mix: bool,
    pub growth_zscore: f64,
    pub growth_yoy: f64,
}

/// Behavior-vector score for a single PDV (client outlet).
///
/// Computed transiently to enrich alert text; not persisted independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentoPdv {
    pub client: String,
    pub score: f64,
    pub justificativa: String,
    pub gatilhos: Vec<String>,
}

/// A single R.I.C.O. alert produced by rule evaluation.
///
/// Alerts are replaced as a set per dataset (delete-then-insert by the
/// persistence collaborator); no alert ever mutates in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub dataset_id: String,
    pub client: String,
    pub sku: Option<String>,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub insight: String,
    pub action: String,
    pub reliability: Reliability,
    pub suggested_deadline: String,
}
