//! # Radar PDV Segmentation
//!
//! Builds a per-client behavior vector (mix breadth, volume, purchase
//! frequency, turnover) and scores each PDV against the cohort baseline to
//! prioritize commercial attention.
//!
//! ## Architectural Principles
//!
//! - **Layer 2 Logic:** This is a pure logic crate. It consumes raw
//!   transactions and produces `SegmentoPdv` records; it has no knowledge of
//!   storage or presentation.
//! - **Relative scoring:** Every component is normalized by the cohort mean,
//!   so a score of 1.0 reads as "an average PDV of this dataset".

use chrono::{DateTime, Utc};
use configuration::SegmentationWeights;
use core_types::{SegmentoPdv, Transaction};
use statistics::{mean, median};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Scores PDVs relative to their cohort.
#[derive(Debug, Clone)]
pub struct PdvSegmenter {
    weights: SegmentationWeights,
}

/// The behavior vector of one client.
#[derive(Debug, Clone, Copy)]
struct BehaviorVector {
    /// Distinct SKU count.
    mix: f64,
    /// Total purchased quantity.
    volume: f64,
    /// Orders per month over the client's active span.
    freq: f64,
    /// Median interval in days between consecutive purchases.
    giro_mediano: f64,
}

impl Default for PdvSegmenter {
    fn default() -> Self {
        Self::new(SegmentationWeights::default())
    }
}

impl PdvSegmenter {
    pub fn new(weights: SegmentationWeights) -> Self {
        Self { weights }
    }

    /// Builds behavior vectors for every client, scores them against the
    /// cohort mean, and returns the segments sorted by descending score.
    ///
    /// Trigger labels flag PDVs whose mix sits below the cohort median, whose
    /// volume is under half the cohort median, or whose turnover runs more
    /// than 1.5x slower than the cohort mean.
    pub fn evaluate(&self, transactions: &[Transaction]) -> Vec<SegmentoPdv> {
        if transactions.is_empty() {
            return Vec::new();
        }

        let mut by_client: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
        for tx in transactions {
            by_client.entry(tx.client.as_str()).or_default().push(tx);
        }

        let vectors: Vec<(&str, BehaviorVector)> = by_client
            .iter()
            .map(|(client, rows)| (*client, behavior_vector(rows)))
            .collect();

        let mix_values: Vec<f64> = vectors.iter().map(|(_, v)| v.mix).collect();
        let volume_values: Vec<f64> = vectors.iter().map(|(_, v)| v.volume).collect();
        let freq_values: Vec<f64> = vectors.iter().map(|(_, v)| v.freq).collect();
        let giro_values: Vec<f64> = vectors.iter().map(|(_, v)| v.giro_mediano).collect();

        let mean_mix = mean(&mix_values);
        let mean_volume = mean(&volume_values);
        let mean_freq = mean(&freq_values);
        let mean_giro = mean(&giro_values);
        let median_mix = median(&mix_values);
        let median_volume = median(&volume_values);

        tracing::debug!(
            clients = vectors.len(),
            mean_mix,
            mean_volume,
            mean_freq,
            mean_giro,
            "cohort baseline computed"
        );

        let mut segments: Vec<SegmentoPdv> = vectors
            .into_iter()
            .map(|(client, vector)| {
                let normal_mix = vector.mix / mean_mix.max(1.0);
                let normal_volume = vector.volume / mean_volume.max(1.0);
                let normal_freq = vector.freq / mean_freq.max(1.0);

                let score = normal_mix * self.weights.mix
                    + normal_volume * self.weights.volume
                    + normal_freq * self.weights.frequency;

                let mut gatilhos = Vec::new();
                if vector.mix < median_mix {
                    gatilhos.push("mix abaixo do cluster".to_string());
                }
                if vector.volume < median_volume * 0.5 {
                    gatilhos.push("ausência anômala de SKU esperado".to_string());
                }
                if vector.giro_mediano > mean_giro * 1.5 {
                    gatilhos.push("giro lento em relação ao cluster".to_string());
                }

                let justificativa = format!(
                    "Mix {} SKUs, volume {:.0} itens, freq. {:.2}/mês",
                    vector.mix as u64, vector.volume, vector.freq
                );

                SegmentoPdv {
                    client: client.to_string(),
                    score: (score * 10_000.0).round() / 10_000.0,
                    justificativa,
                    gatilhos,
                }
            })
            .collect();

        // Stable sort keeps the per-client iteration order on ties.
        segments.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        segments
    }
}

/// Folds one client's transactions into its behavior vector.
fn behavior_vector(rows: &[&Transaction]) -> BehaviorVector {
    let orders: BTreeSet<&str> = rows.iter().map(|tx| tx.order_id.as_str()).collect();
    let skus: BTreeSet<&str> = rows.iter().filter_map(|tx| tx.sku.as_deref()).collect();
    let volume: i64 = rows.iter().map(|tx| tx.qty).sum();

    let mut dates: Vec<DateTime<Utc>> = rows.iter().map(|tx| tx.date).collect();
    dates.sort();

    let intervals: Vec<f64> = dates
        .windows(2)
        .map(|w| w[1].signed_duration_since(w[0]).num_days() as f64)
        .collect();
    let giro_mediano = median(&intervals);

    let span_days = match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => last.signed_duration_since(*first).num_days(),
        _ => 0,
    };
    let elapsed_months = (span_days as f64 / 30.0).max(1.0);
    let freq = orders.len() as f64 / elapsed_months;

    BehaviorVector {
        mix: skus.len() as f64,
        volume: volume as f64,
        freq,
        giro_mediano,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn tx(client: &str, sku: &str, order: &str, day: i64, qty: i64) -> Transaction {
        Transaction {
            dataset_id: "d1".to_string(),
            date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(day),
            order_id: order.to_string(),
            client: client.to_string(),
            seller: None,
            sku: Some(sku.to_string()),
            product: format!("Produto {sku}"),
            price: Decimal::from(10),
            qty,
            subtotal: Decimal::from(10 * qty),
            category: None,
            segment: None,
            city: None,
            uf: None,
        }
    }

    #[test]
    fn single_client_scores_neutral() {
        let transactions = vec![
            tx("Cliente 1", "SKU-A", "1", 0, 10),
            tx("Cliente 1", "SKU-B", "2", 15, 8),
        ];
        let segments = PdvSegmenter::default().evaluate(&transactions);
        assert_eq!(segments.len(), 1);
        // Cohort mean equals the client's own vector: all ratios are 1.0 and
        // the score collapses to the weight sum.
        assert_eq!(segments[0].score, 1.0);
        assert!(segments[0].gatilhos.is_empty());
    }

    #[test]
    fn weak_client_gets_triggers_and_ranks_last() {
        let mut transactions = Vec::new();
        // A broad, heavy, fast-turning client.
        for (i, sku) in ["A", "B", "C", "D"].iter().enumerate() {
            transactions.push(tx("Forte", sku, &format!("f{i}"), (i as i64) * 5, 50));
        }
        // A narrow, light client with slow turnover.
        transactions.push(tx("Fraco", "A", "w1", 0, 1));
        transactions.push(tx("Fraco", "A", "w2", 90, 1));

        let segments = PdvSegmenter::default().evaluate(&transactions);
        assert_eq!(segments[0].client, "Forte");
        assert_eq!(segments[1].client, "Fraco");

        let fraco = &segments[1];
        assert!(fraco.gatilhos.contains(&"mix abaixo do cluster".to_string()));
        assert!(fraco.gatilhos.contains(&"ausência anômala de SKU esperado".to_string()));
        assert!(fraco.gatilhos.contains(&"giro lento em relação ao cluster".to_string()));
    }

    #[test]
    fn empty_input_yields_no_segments() {
        assert!(PdvSegmenter::default().evaluate(&[]).is_empty());
    }
}
