use chrono::{DateTime, Datelike, Utc};
use configuration::Settings;
use core_types::{Alert, AlertKind, Reliability, SegmentoPdv, Transaction};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use segmentation::PdvSegmenter;
use statistics::{
    bayesian_survival_score, coefficient_of_variation, mean, median, population_std,
    repurchase_probability, turnover_confidence_interval, volume_outliers,
};
use std::collections::BTreeMap;

/// Evaluates the R.I.C.O. business rules over one dataset's transactions.
///
/// Like the metrics engine, this is a pure function of `(transactions,
/// reference_date, settings)`: the returned alerts are a complete snapshot
/// meant to replace any previously stored alerts for the dataset.
#[derive(Debug, Clone)]
pub struct InsightsEngine {
    reference_date: DateTime<Utc>,
    logistics_delay_days: i64,
    repurchase_window_days: i64,
    outlier_z_threshold: f64,
    segmenter: PdvSegmenter,
}

impl InsightsEngine {
    pub fn new(reference_date: DateTime<Utc>, settings: &Settings) -> Self {
        Self {
            reference_date,
            logistics_delay_days: settings.analysis.logistics_delay_days,
            repurchase_window_days: settings.analysis.repurchase_window_days,
            outlier_z_threshold: settings.analysis.outlier_z_threshold,
            segmenter: PdvSegmenter::new(settings.segmentation.clone()),
        }
    }

    /// Runs every rule and returns the combined alert set.
    ///
    /// Empty input returns an empty vector.
    pub fn generate(&self, transactions: &[Transaction], dataset_id: &str) -> Vec<Alert> {
        if transactions.is_empty() {
            return Vec::new();
        }

        let segments: BTreeMap<String, SegmentoPdv> = self
            .segmenter
            .evaluate(transactions)
            .into_iter()
            .map(|s| (s.client.clone(), s))
            .collect();

        let mut alerts = Vec::new();
        alerts.extend(self.ruptura_alerts(transactions, dataset_id, &segments));
        alerts.extend(self.queda_brusca_alerts(transactions, dataset_id, &segments));
        alerts.extend(self.outlier_volume_alerts(transactions, dataset_id, &segments));

        tracing::info!(dataset_id, alerts = alerts.len(), "R.I.C.O. rules evaluated");
        alerts
    }

    /// Stock-out risk per `(client, sku)` pair.
    ///
    /// Every pair with at least two purchases is reported; the confidence
    /// ratio `days_since_last / (median_interval + logistics_delay)` selects
    /// the reliability tier instead of gating emission.
    fn ruptura_alerts(
        &self,
        transactions: &[Transaction],
        dataset_id: &str,
        segments: &BTreeMap<String, SegmentoPdv>,
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();
        for ((client, sku), rows) in group_by_client_sku(transactions) {
            if rows.len() < 2 {
                continue;
            }

            let mut dates: Vec<DateTime<Utc>> = rows.iter().map(|tx| tx.date).collect();
            dates.sort();
            let intervals: Vec<f64> = dates
                .windows(2)
                .map(|w| w[1].signed_duration_since(w[0]).num_days() as f64)
                .collect();
            if intervals.is_empty() {
                continue;
            }
            let Some(last) = dates.last() else {
                continue;
            };

            let prob_recompra = repurchase_probability(&dates, self.repurchase_window_days);
            let giro_mediano = median(&intervals);
            let previsao = giro_mediano + self.logistics_delay_days as f64;
            let dias_sem_compra = self.reference_date.signed_duration_since(*last).num_days();
            let confianca = (dias_sem_compra as f64 / previsao.max(1.0)).min(1.0);
            let (ic_low, ic_high) = turnover_confidence_interval(&intervals, 0.95);

            let insight = format!(
                "Cliente {client} sem comprar {sku} há {dias_sem_compra} dias. \
                 Giro mediano {giro_mediano:.1}d (IC {ic_low:.0}-{ic_high:.0}) e \
                 prob. recompra {:.0}%.",
                prob_recompra * 100.0
            );
            let mut action = "Contatar cliente e reservar estoque para reposição imediata.".to_string();
            if let Some(triggers) = trigger_labels(segments, client) {
                action.push_str(&format!(" Triggers: {triggers}"));
            }

            alerts.push(Alert {
                dataset_id: dataset_id.to_string(),
                client: client.to_string(),
                sku: Some(sku.to_string()),
                kind: AlertKind::Ruptura,
                insight,
                action,
                reliability: Reliability::from_score(confianca),
                suggested_deadline: "3 dias".to_string(),
            });
        }
        alerts
    }

    /// Sharp revenue drop per client, over monthly revenue buckets.
    ///
    /// Emits when the latest month sits below the historical mean with a
    /// Z-score at or below -1.5; reliability scales with `|Z| / 3`.
    fn queda_brusca_alerts(
        &self,
        transactions: &[Transaction],
        dataset_id: &str,
        segments: &BTreeMap<String, SegmentoPdv>,
    ) -> Vec<Alert> {
        let mut monthly: BTreeMap<&str, BTreeMap<(i32, u32), Decimal>> = BTreeMap::new();
        for tx in transactions {
            *monthly
                .entry(tx.client.as_str())
                .or_default()
                .entry((tx.date.year(), tx.date.month()))
                .or_insert(Decimal::ZERO) += tx.subtotal;
        }

        let mut alerts = Vec::new();
        for (client, buckets) in monthly {
            if buckets.len() < 3 {
                continue;
            }

            let values: Vec<f64> = buckets
                .into_values()
                .map(|v| v.to_f64().unwrap_or(0.0))
                .collect();
            let head = &values[..values.len() - 1];
            let ultimo = values[values.len() - 1];
            let media = mean(head);
            let mut desvio = population_std(head);
            if desvio == 0.0 {
                desvio = 1.0;
            }
            let z_score = (ultimo - media) / desvio;

            let mut yoy = 0.0;
            if values.len() >= 13 {
                let base = values[values.len() - 13];
                yoy = (ultimo - base) / base.max(1.0) * 100.0;
            }

            if ultimo < media && z_score <= -1.5 {
                let score = (z_score.abs() / 3.0).min(1.0);
                let queda_pct = (media - ultimo) / media.max(1.0) * 100.0;
                let insight = format!(
                    "Receita de {client} caiu {queda_pct:.1}% vs média. \
                     Z-score {z_score:.2}, YoY {yoy:.1}%"
                );
                let mut action =
                    "Planejar ação de recuperação com ofertas direcionadas e revisão de cobertura."
                        .to_string();
                if let Some(triggers) = trigger_labels(segments, client) {
                    action.push_str(&format!(" Verificar também: {triggers}"));
                }

                alerts.push(Alert {
                    dataset_id: dataset_id.to_string(),
                    client: client.to_string(),
                    sku: None,
                    kind: AlertKind::QuedaBrusca,
                    insight,
                    action,
                    reliability: Reliability::from_score(score),
                    suggested_deadline: "1 semana".to_string(),
                });
            }
        }
        alerts
    }

    /// Volume anomaly per `(client, sku)` pair with at least five
    /// observations, reporting the most recent outlier in the quantity
    /// series.
    fn outlier_volume_alerts(
        &self,
        transactions: &[Transaction],
        dataset_id: &str,
        segments: &BTreeMap<String, SegmentoPdv>,
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();
        for ((client, sku), rows) in group_by_client_sku(transactions) {
            if rows.len() < 5 {
                continue;
            }

            let mut rows = rows;
            rows.sort_by_key(|tx| tx.date);
            let series: Vec<f64> = rows.iter().map(|tx| tx.qty as f64).collect();

            let mask = volume_outliers(&series, self.outlier_z_threshold);
            let Some(idx) = mask.iter().rposition(|flagged| *flagged) else {
                continue;
            };

            let valor = series[idx];
            let media = mean(&series);
            let direcao = if valor > media { "acima" } else { "abaixo" };
            let delta = (valor - media).abs() / media.max(1.0);

            let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();
            let cv = coefficient_of_variation(&diffs);
            let tail_events: Vec<bool> = series
                .iter()
                .rev()
                .take(6)
                .rev()
                .map(|qty| *qty > 0.0)
                .collect();
            let survival = bayesian_survival_score(&tail_events, 1.0, 1.0);

            let insight = format!(
                "Volume {direcao} da média para {sku} (último {valor:.0} vs média {media:.0}). \
                 CV giro {cv:.2}, score sobrevivência {survival:.2}."
            );
            let mut action = "Validar estoque e alinhar com time de operações/atendimento.".to_string();
            if let Some(triggers) = trigger_labels(segments, client) {
                action.push_str(&format!(" Contexto: {triggers}"));
            }

            alerts.push(Alert {
                dataset_id: dataset_id.to_string(),
                client: client.to_string(),
                sku: Some(sku.to_string()),
                kind: AlertKind::OutlierVolume,
                insight,
                action,
                reliability: Reliability::from_score(delta.min(1.0)),
                suggested_deadline: "48 horas".to_string(),
            });
        }
        alerts
    }
}

/// Groups transactions by `(client, sku)`; rows without a SKU are ignored.
fn group_by_client_sku(
    transactions: &[Transaction],
) -> BTreeMap<(&str, &str), Vec<&Transaction>> {
    let mut groups: BTreeMap<(&str, &str), Vec<&Transaction>> = BTreeMap::new();
    for tx in transactions {
        if let Some(sku) = tx.sku.as_deref() {
            groups
                .entry((tx.client.as_str(), sku))
                .or_default()
                .push(tx);
        }
    }
    groups
}

/// The client's segmentation trigger labels joined for alert text, if any.
fn trigger_labels(segments: &BTreeMap<String, SegmentoPdv>, client: &str) -> Option<String> {
    segments
        .get(client)
        .filter(|s| !s.gatilhos.is_empty())
        .map(|s| s.gatilhos.join(", "))
}
