use crate::kpis::GeneralKpis;
use chrono::{DateTime, Datelike, Utc};
use configuration::{Settings, TierThresholds};
use core_types::{CustomerAnalytics, ProductAnalytics, Tier, Transaction};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use statistics::{mean, median, percentile_ranks, population_std, quantile};
use std::collections::{BTreeMap, BTreeSet};

/// A stateless calculator deriving customer, product and dataset analytics
/// from a normalized transaction set.
///
/// The engine is a pure function of `(transactions, reference_date,
/// settings)`: it holds no state between invocations, and every output is
/// recomputed wholesale on each call.
#[derive(Debug, Clone)]
pub struct MetricsEngine {
    reference_date: DateTime<Utc>,
    logistics_delay_days: i64,
    tiers: TierThresholds,
    hero_revenue_percentile: f64,
}

/// Per-client aggregates collected before the cohort-wide ranking pass.
struct CustomerAggregate {
    client: String,
    recency: i64,
    frequency: u64,
    monetary: Decimal,
    avg_ticket: Decimal,
    gm_cliente: f64,
    segment: Option<String>,
    city: Option<String>,
    uf: Option<String>,
    last_order: DateTime<Utc>,
    segment_weight: f64,
}

impl MetricsEngine {
    pub fn new(reference_date: DateTime<Utc>, settings: &Settings) -> Self {
        Self {
            reference_date,
            logistics_delay_days: settings.analysis.logistics_delay_days,
            tiers: settings.tiers.clone(),
            hero_revenue_percentile: settings.analysis.hero_revenue_percentile,
        }
    }

    pub fn reference_date(&self) -> DateTime<Utc> {
        self.reference_date
    }

    pub fn logistics_delay_days(&self) -> i64 {
        self.logistics_delay_days
    }

    /// Computes the RFM analytics for every distinct client.
    ///
    /// Percentile ranks (average method, recency inverted) are taken across
    /// the whole client population, weighted by the revenue share of each
    /// client's dominant segment, and mapped onto tiers via the configured
    /// score thresholds. Empty input returns an empty vector.
    pub fn customer_rfm(
        &self,
        transactions: &[Transaction],
        dataset_id: &str,
    ) -> Vec<CustomerAnalytics> {
        if transactions.is_empty() {
            return Vec::new();
        }

        let segment_weights = self.segment_weights(transactions);

        let mut by_client: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
        for tx in transactions {
            by_client.entry(tx.client.as_str()).or_default().push(tx);
        }

        let mut aggregates: Vec<CustomerAggregate> = Vec::with_capacity(by_client.len());
        for (client, rows) in &by_client {
            let Some(last_order) = rows.iter().map(|tx| tx.date).max() else {
                continue;
            };

            let orders: BTreeSet<&str> = rows.iter().map(|tx| tx.order_id.as_str()).collect();
            let frequency = orders.len() as u64;
            let monetary: Decimal = rows.iter().map(|tx| tx.subtotal).sum();
            let avg_ticket = if frequency > 0 {
                monetary / Decimal::from(frequency)
            } else {
                Decimal::ZERO
            };

            let segment = mode_of(rows.iter().filter_map(|tx| tx.segment.as_deref()));
            let segment_weight = segment
                .as_deref()
                .and_then(|s| segment_weights.get(s))
                .copied()
                .unwrap_or(1.0);

            aggregates.push(CustomerAggregate {
                client: (*client).to_string(),
                recency: self
                    .reference_date
                    .signed_duration_since(last_order)
                    .num_days()
                    .max(0),
                frequency,
                monetary,
                avg_ticket,
                gm_cliente: median_turnover(rows.iter().map(|tx| tx.date)),
                segment,
                city: mode_of(rows.iter().filter_map(|tx| tx.city.as_deref())),
                uf: mode_of(rows.iter().filter_map(|tx| tx.uf.as_deref())),
                last_order,
                segment_weight,
            });
        }

        // Cohort-wide percentile ranks; earliest recency ranks near 1.
        let recencies: Vec<f64> = aggregates.iter().map(|a| a.recency as f64).collect();
        let frequencies: Vec<f64> = aggregates.iter().map(|a| a.frequency as f64).collect();
        let monies: Vec<f64> = aggregates
            .iter()
            .map(|a| a.monetary.to_f64().unwrap_or(0.0))
            .collect();
        let recency_ranks = percentile_ranks(&recencies);
        let frequency_ranks = percentile_ranks(&frequencies);
        let monetary_ranks = percentile_ranks(&monies);

        tracing::debug!(
            dataset_id,
            clients = aggregates.len(),
            "customer RFM aggregates computed"
        );

        aggregates
            .into_iter()
            .enumerate()
            .map(|(i, agg)| {
                let rfm_score = (0.4 * (1.0 - recency_ranks[i])
                    + 0.3 * frequency_ranks[i]
                    + 0.3 * monetary_ranks[i])
                    * agg.segment_weight;

                CustomerAnalytics {
                    dataset_id: dataset_id.to_string(),
                    client: agg.client,
                    recency: agg.recency,
                    frequency: agg.frequency,
                    monetary: agg.monetary,
                    avg_ticket: agg.avg_ticket,
                    gm_cliente: agg.gm_cliente,
                    tier: self.tier_for(rfm_score),
                    segment: agg.segment,
                    city: agg.city,
                    uf: agg.uf,
                    last_order: agg.last_order,
                    rfm_score,
                    segment_weight: agg.segment_weight,
                }
            })
            .collect()
    }

    /// Computes the per-SKU analytics: aggregates, turnover, hero-mix
    /// classification and monthly growth signals.
    ///
    /// Transactions without a SKU are excluded from product grouping. Empty
    /// input (or an input with no SKUs at all) returns an empty vector.
    pub fn product_analytics(
        &self,
        transactions: &[Transaction],
        dataset_id: &str,
    ) -> Vec<ProductAnalytics> {
        let mut by_sku: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
        for tx in transactions {
            if let Some(sku) = tx.sku.as_deref() {
                by_sku.entry(sku).or_default().push(tx);
            }
        }
        if by_sku.is_empty() {
            return Vec::new();
        }

        let revenues: Vec<f64> = by_sku
            .values()
            .map(|rows| {
                rows.iter()
                    .map(|tx| tx.subtotal)
                    .sum::<Decimal>()
                    .to_f64()
                    .unwrap_or(0.0)
            })
            .collect();
        let hero_threshold = quantile(&revenues, self.hero_revenue_percentile);

        by_sku
            .iter()
            .map(|(sku, rows)| {
                let mut rows: Vec<&Transaction> = rows.clone();
                rows.sort_by_key(|tx| tx.date);

                let orders: BTreeSet<&str> = rows.iter().map(|tx| tx.order_id.as_str()).collect();
                let orders = orders.len() as u64;
                let qty: i64 = rows.iter().map(|tx| tx.qty).sum();
                let revenue: Decimal = rows.iter().map(|tx| tx.subtotal).sum();
                let avg_ticket = (orders > 0).then(|| revenue / Decimal::from(orders));

                let distinct_dates: BTreeSet<DateTime<Utc>> =
                    rows.iter().map(|tx| tx.date).collect();
                let turnover_median = (distinct_dates.len() >= 2)
                    .then(|| median_turnover(rows.iter().map(|tx| tx.date)));

                let monthly = monthly_revenue(&rows);
                let (growth_zscore, growth_yoy) = growth_signals(&monthly);

                // Name from the SKU's earliest transaction; the code itself as
                // a last resort.
                let product = rows
                    .first()
                    .map(|tx| tx.product.clone())
                    .filter(|p| !p.is_empty())
                    .unwrap_or_else(|| (*sku).to_string());

                ProductAnalytics {
                    dataset_id: dataset_id.to_string(),
                    sku: (*sku).to_string(),
                    product,
                    orders,
                    qty,
                    revenue,
                    avg_ticket,
                    turnover_median,
                    hero_mix: revenue.to_f64().unwrap_or(0.0) >= hero_threshold,
                    growth_zscore,
                    growth_yoy,
                }
            })
            .collect()
    }

    /// Computes the dataset-wide KPI report.
    ///
    /// An empty transaction set returns the zeroed report.
    pub fn general_kpis(&self, transactions: &[Transaction]) -> GeneralKpis {
        let mut report = GeneralKpis::new();
        if transactions.is_empty() {
            return report;
        }

        report.total_revenue = transactions.iter().map(|tx| tx.subtotal).sum();
        report.total_customers = transactions
            .iter()
            .map(|tx| tx.client.as_str())
            .collect::<BTreeSet<_>>()
            .len() as u64;
        report.total_products = transactions
            .iter()
            .filter_map(|tx| tx.sku.as_deref())
            .collect::<BTreeSet<_>>()
            .len() as u64;
        report.total_orders = transactions
            .iter()
            .map(|tx| tx.order_id.as_str())
            .collect::<BTreeSet<_>>()
            .len() as u64;
        if report.total_orders > 0 {
            report.avg_ticket = report.total_revenue / Decimal::from(report.total_orders);
        }

        let mut by_client: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
        for tx in transactions {
            by_client.entry(tx.client.as_str()).or_default().push(tx);
        }

        let mut recencies = Vec::with_capacity(by_client.len());
        let mut frequencies = Vec::with_capacity(by_client.len());
        let mut stockout_offsets = Vec::with_capacity(by_client.len());
        for rows in by_client.values() {
            let Some(last_order) = rows.iter().map(|tx| tx.date).max() else {
                continue;
            };
            let orders: BTreeSet<&str> = rows.iter().map(|tx| tx.order_id.as_str()).collect();
            let giro = median_turnover(rows.iter().map(|tx| tx.date));

            recencies.push(
                self.reference_date
                    .signed_duration_since(last_order)
                    .num_days()
                    .max(0) as f64,
            );
            frequencies.push(orders.len() as f64);

            // Signed offset from the reference date to the projected
            // replenishment window: last order + median turnover + delay.
            let last_offset = last_order
                .signed_duration_since(self.reference_date)
                .num_days() as f64;
            stockout_offsets.push(last_offset + giro + self.logistics_delay_days as f64);
        }

        report.avg_recency = mean(&recencies);
        report.avg_frequency = mean(&frequencies);
        report.ruptura_projetada_media = mean(&stockout_offsets);

        report.period_start = transactions.iter().map(|tx| tx.date).min();
        report.period_end = transactions.iter().map(|tx| tx.date).max();
        if let (Some(start), Some(end)) = (report.period_start, report.period_end) {
            report.period_days = end.signed_duration_since(start).num_days();
        }

        report
    }

    /// Maps an RFM score onto its tier via the configured thresholds.
    fn tier_for(&self, score: f64) -> Tier {
        if score >= self.tiers.hero {
            Tier::Hero
        } else if score >= self.tiers.growth {
            Tier::Growth
        } else if score >= self.tiers.manter {
            Tier::Manter
        } else {
            Tier::Risco
        }
    }

    /// Derives the per-segment weight from each segment's share of total
    /// revenue: `0.5 + share * 0.5`. Clients without segment data keep a
    /// neutral weight of 1.0 (handled by the caller).
    fn segment_weights(&self, transactions: &[Transaction]) -> BTreeMap<String, f64> {
        let mut revenue_by_segment: BTreeMap<&str, Decimal> = BTreeMap::new();
        for tx in transactions {
            if let Some(segment) = tx.segment.as_deref() {
                *revenue_by_segment.entry(segment).or_insert(Decimal::ZERO) += tx.subtotal;
            }
        }

        let total: Decimal = revenue_by_segment.values().copied().sum();
        if total <= Decimal::ZERO {
            return BTreeMap::new();
        }

        revenue_by_segment
            .into_iter()
            .map(|(segment, revenue)| {
                let share = (revenue / total).to_f64().unwrap_or(0.0);
                (segment.to_string(), 0.5 + share * 0.5)
            })
            .collect()
    }
}

/// Median interval in days between consecutive **distinct** order dates.
/// Fewer than two distinct dates yields `0.0`.
pub(crate) fn median_turnover(dates: impl Iterator<Item = DateTime<Utc>>) -> f64 {
    let distinct: BTreeSet<DateTime<Utc>> = dates.collect();
    if distinct.len() < 2 {
        return 0.0;
    }
    let sorted: Vec<DateTime<Utc>> = distinct.into_iter().collect();
    let deltas: Vec<f64> = sorted
        .windows(2)
        .map(|w| w[1].signed_duration_since(w[0]).num_days() as f64)
        .collect();
    median(&deltas)
}

/// Statistical mode of the observed values; ties resolve to the smallest
/// value so the result is deterministic.
fn mode_of<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((value, count)),
        }
    }
    best.map(|(value, _)| value.to_string())
}

/// The SKU's revenue series bucketed by calendar month, oldest first.
fn monthly_revenue(rows: &[&Transaction]) -> Vec<f64> {
    let mut buckets: BTreeMap<(i32, u32), Decimal> = BTreeMap::new();
    for tx in rows {
        *buckets
            .entry((tx.date.year(), tx.date.month()))
            .or_insert(Decimal::ZERO) += tx.subtotal;
    }
    buckets
        .into_values()
        .map(|v| v.to_f64().unwrap_or(0.0))
        .collect()
}

/// Growth signals over a monthly revenue series.
///
/// With at least 3 months, the Z-score of the latest month against the mean
/// and population deviation of all prior months (deviation falls back to 1.0
/// when zero). With at least 13 months, the year-over-year percentage change
/// against the same month one year earlier.
fn growth_signals(monthly: &[f64]) -> (f64, f64) {
    let mut zscore = 0.0;
    let mut yoy = 0.0;

    if monthly.len() >= 3 {
        let head = &monthly[..monthly.len() - 1];
        let last = monthly[monthly.len() - 1];
        let mut deviation = population_std(head);
        if deviation == 0.0 {
            deviation = 1.0;
        }
        zscore = (last - mean(head)) / deviation;
    }

    if monthly.len() >= 13 {
        let last = monthly[monthly.len() - 1];
        let base = monthly[monthly.len() - 13];
        yoy = (last - base) / base.max(1.0) * 100.0;
    }

    (zscore, yoy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn base_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn reference_date() -> DateTime<Utc> {
        base_date() + chrono::Duration::days(61)
    }

    fn tx(
        client: &str,
        sku: &str,
        order: &str,
        day: i64,
        qty: i64,
        subtotal: Decimal,
        segment: &str,
    ) -> Transaction {
        Transaction {
            dataset_id: "d1".to_string(),
            date: base_date() + chrono::Duration::days(day),
            order_id: order.to_string(),
            client: client.to_string(),
            seller: None,
            sku: Some(sku.to_string()),
            product: format!("Produto {sku}"),
            price: subtotal / Decimal::from(qty),
            qty,
            subtotal,
            category: None,
            segment: Some(segment.to_string()),
            city: None,
            uf: None,
        }
    }

    /// Two clients: one early Premium buyer of SKU-A, one recent Mid buyer of
    /// SKU-B.
    fn sample_transactions() -> Vec<Transaction> {
        vec![
            tx("Cliente 1", "SKU-A", "1", 0, 10, dec!(100.0), "Premium"),
            tx("Cliente 1", "SKU-A", "2", 15, 8, dec!(90.0), "Premium"),
            tx("Cliente 2", "SKU-B", "3", 30, 5, dec!(60.0), "Mid"),
            tx("Cliente 2", "SKU-B", "4", 60, 5, dec!(70.0), "Mid"),
        ]
    }

    fn engine() -> MetricsEngine {
        MetricsEngine::new(reference_date(), &Settings::default())
    }

    #[test]
    fn customer_giro_uses_median_of_distinct_dates() {
        let customers = engine().customer_rfm(&sample_transactions(), "d1");
        let cliente1 = customers.iter().find(|c| c.client == "Cliente 1").unwrap();
        assert_eq!(cliente1.gm_cliente, 15.0);
        assert_eq!(cliente1.frequency, 2);
        assert_eq!(cliente1.monetary, dec!(190.0));
        assert_eq!(cliente1.avg_ticket, dec!(95.0));
    }

    #[test]
    fn rfm_score_applies_segment_weight() {
        let customers = engine().customer_rfm(&sample_transactions(), "d1");
        let score = |client: &str| {
            customers
                .iter()
                .find(|c| c.client == client)
                .unwrap()
                .rfm_score
        };
        // Premium carries the larger revenue share, so Cliente 1 outranks
        // Cliente 2 despite the worse recency.
        assert!(score("Cliente 1") > score("Cliente 2"));
    }

    #[test]
    fn equal_rfm_components_higher_segment_share_wins() {
        let mut transactions = vec![
            tx("Cliente A", "SKU-A", "1", 0, 10, dec!(100.0), "Premium"),
            tx("Cliente A", "SKU-A", "2", 15, 10, dec!(100.0), "Premium"),
            tx("Cliente B", "SKU-B", "3", 0, 10, dec!(100.0), "Mid"),
            tx("Cliente B", "SKU-B", "4", 15, 10, dec!(100.0), "Mid"),
        ];
        // A third client inflates Premium's revenue share without touching
        // the ranks of the two identical clients.
        transactions.push(tx("Cliente C", "SKU-C", "5", 30, 10, dec!(500.0), "Premium"));

        let customers = engine().customer_rfm(&transactions, "d1");
        let a = customers.iter().find(|c| c.client == "Cliente A").unwrap();
        let b = customers.iter().find(|c| c.client == "Cliente B").unwrap();

        assert_eq!(a.recency, b.recency);
        assert_eq!(a.frequency, b.frequency);
        assert_eq!(a.monetary, b.monetary);
        assert!(a.segment_weight > b.segment_weight);
        assert!(a.rfm_score > b.rfm_score);
    }

    #[test]
    fn increasing_monetary_never_lowers_the_score() {
        let engine = engine();
        let before = engine.customer_rfm(&sample_transactions(), "d1");
        let score_before = before
            .iter()
            .find(|c| c.client == "Cliente 2")
            .unwrap()
            .rfm_score;

        let mut boosted = sample_transactions();
        boosted[3].subtotal = dec!(300.0);
        let after = engine.customer_rfm(&boosted, "d1");
        let score_after = after
            .iter()
            .find(|c| c.client == "Cliente 2")
            .unwrap()
            .rfm_score;

        assert!(score_after >= score_before);
    }

    #[test]
    fn metrics_are_deterministic() {
        let engine = engine();
        let transactions = sample_transactions();
        assert_eq!(
            engine.customer_rfm(&transactions, "d1"),
            engine.customer_rfm(&transactions, "d1")
        );
        assert_eq!(
            engine.product_analytics(&transactions, "d1"),
            engine.product_analytics(&transactions, "d1")
        );
        assert_eq!(
            engine.general_kpis(&transactions),
            engine.general_kpis(&transactions)
        );
    }

    #[test]
    fn product_analytics_marks_hero_mix() {
        let products = engine().product_analytics(&sample_transactions(), "d1");
        let hero = products.iter().find(|p| p.sku == "SKU-A").unwrap();
        let challenger = products.iter().find(|p| p.sku == "SKU-B").unwrap();
        assert!(hero.hero_mix);
        assert!(!challenger.hero_mix);
        assert_eq!(hero.revenue, dec!(190.0));
        assert_eq!(hero.turnover_median, Some(15.0));
        assert_eq!(hero.product, "Produto SKU-A");
    }

    #[test]
    fn growth_zscore_flags_a_surging_month() {
        // Flat 100/month for five months, then a 400 spike.
        let mut transactions = Vec::new();
        for (i, month) in (1..=6).enumerate() {
            let subtotal = if month == 6 { dec!(400.0) } else { dec!(100.0) };
            let mut t = tx("Cliente 1", "SKU-A", &format!("o{i}"), 0, 1, subtotal, "Premium");
            t.date = Utc.with_ymd_and_hms(2024, month, 1, 0, 0, 0).unwrap();
            transactions.push(t);
        }

        let products = engine().product_analytics(&transactions, "d1");
        let sku = products.iter().find(|p| p.sku == "SKU-A").unwrap();
        // Prior months are all 100 with zero deviation, so the fallback
        // deviation of 1.0 applies: z = 400 - 100.
        assert_eq!(sku.growth_zscore, 300.0);
        assert_eq!(sku.growth_yoy, 0.0);
    }

    #[test]
    fn general_kpis_summarize_the_dataset() {
        let kpis = engine().general_kpis(&sample_transactions());
        assert_eq!(kpis.total_revenue, dec!(320.0));
        assert_eq!(kpis.total_customers, 2);
        assert_eq!(kpis.total_products, 2);
        assert_eq!(kpis.total_orders, 4);
        assert_eq!(kpis.avg_ticket, dec!(80.0));
        assert_eq!(kpis.period_days, 60);
        // Cliente 1: (15 - 61) + 15 + 20 = -11; Cliente 2: (60 - 61) + 30 + 20 = 49.
        assert_eq!(kpis.ruptura_projetada_media, 19.0);
    }

    #[test]
    fn single_transaction_boundary() {
        let transactions = vec![tx("Cliente 1", "SKU-A", "1", 0, 10, dec!(100.0), "Premium")];
        let customers = engine().customer_rfm(&transactions, "d1");
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].frequency, 1);
        assert_eq!(customers[0].gm_cliente, 0.0);
    }

    #[test]
    fn empty_input_returns_empty_defaults() {
        let engine = engine();
        assert!(engine.customer_rfm(&[], "d1").is_empty());
        assert!(engine.product_analytics(&[], "d1").is_empty());
        assert_eq!(engine.general_kpis(&[]), GeneralKpis::new());
    }

    #[test]
    fn mode_ties_resolve_to_smallest_value() {
        assert_eq!(
            mode_of(["SP", "RJ", "RJ", "SP"].into_iter()),
            Some("RJ".to_string())
        );
        assert_eq!(mode_of(std::iter::empty()), None);
    }
}
