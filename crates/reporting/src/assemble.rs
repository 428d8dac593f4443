use crate::tables::{ReportBundle, behavior_rows, monthly_history, relationship_rows};
use chrono::{DateTime, Utc};
use configuration::Settings;
use core_types::{Alert, CustomerAnalytics, ProductAnalytics, SegmentoPdv, Transaction};
use insights::InsightsEngine;
use metrics::{GeneralKpis, MetricsEngine};
use segmentation::PdvSegmenter;
use serde::{Deserialize, Serialize};

/// Everything one analysis run produces.
///
/// The output is a complete snapshot: the persistence collaborator is
/// expected to replace (delete-then-insert) any previously stored analytics
/// and alerts for the dataset, never to merge. Concurrent regeneration of
/// the same dataset must be serialized by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub dataset_id: String,
    pub reference_date: DateTime<Utc>,
    pub customers: Vec<CustomerAnalytics>,
    pub products: Vec<ProductAnalytics>,
    pub kpis: GeneralKpis,
    pub segments: Vec<SegmentoPdv>,
    pub alerts: Vec<Alert>,
    pub report: ReportBundle,
}

/// Runs the full analytics core over one dataset's transactions.
///
/// This is a pure function of `(transactions, reference_date, settings)`:
/// identical inputs yield identical outputs, and an empty transaction set
/// yields the documented empty/zero-valued result rather than an error.
pub fn run_analysis(
    transactions: &[Transaction],
    dataset_id: &str,
    reference_date: DateTime<Utc>,
    settings: &Settings,
) -> AnalysisOutput {
    let metrics = MetricsEngine::new(reference_date, settings);
    let insights = InsightsEngine::new(reference_date, settings);
    let segmenter = PdvSegmenter::new(settings.segmentation.clone());

    let customers = metrics.customer_rfm(transactions, dataset_id);
    let products = metrics.product_analytics(transactions, dataset_id);
    let kpis = metrics.general_kpis(transactions);
    let segments = segmenter.evaluate(transactions);
    let alerts = insights.generate(transactions, dataset_id);

    tracing::info!(
        dataset_id,
        customers = customers.len(),
        products = products.len(),
        alerts = alerts.len(),
        "analysis computed"
    );

    let report = ReportBundle {
        clients: customers.clone(),
        history: monthly_history(transactions),
        mix: products.clone(),
        relationship: relationship_rows(&customers, settings.analysis.logistics_delay_days),
        behavior: behavior_rows(&kpis, &customers),
    };

    AnalysisOutput {
        dataset_id: dataset_id.to_string(),
        reference_date,
        customers,
        products,
        kpis,
        segments,
        alerts,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{
        BEHAVIOR_TABLE, CLIENTS_TABLE, HISTORY_TABLE, MIX_TABLE, RELATIONSHIP_TABLE,
    };
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn base_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn tx(client: &str, sku: &str, order: &str, day: i64, qty: i64, subtotal: Decimal) -> Transaction {
        Transaction {
            dataset_id: "d1".to_string(),
            date: base_date() + chrono::Duration::days(day),
            order_id: order.to_string(),
            client: client.to_string(),
            seller: None,
            sku: Some(sku.to_string()),
            product: format!("Produto {sku}"),
            price: subtotal,
            qty,
            subtotal,
            category: None,
            segment: Some("Premium".to_string()),
            city: None,
            uf: None,
        }
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx("Cliente 1", "SKU-A", "1", 0, 10, dec!(100)),
            tx("Cliente 1", "SKU-A", "2", 15, 8, dec!(90)),
            tx("Cliente 2", "SKU-B", "3", 40, 5, dec!(60)),
        ]
    }

    #[test]
    fn table_names_are_stable() {
        // The export collaborator keys its sheets on these exact names.
        assert_eq!(CLIENTS_TABLE, "Identificação do Cliente");
        assert_eq!(HISTORY_TABLE, "Histórico Comercial");
        assert_eq!(MIX_TABLE, "Inteligência de Mix");
        assert_eq!(RELATIONSHIP_TABLE, "Relacional e Atendimento");
        assert_eq!(BEHAVIOR_TABLE, "Inteligência Comportamental");
    }

    #[test]
    fn history_buckets_by_calendar_month() {
        let output = run_analysis(
            &sample(),
            "d1",
            base_date() + chrono::Duration::days(60),
            &Settings::default(),
        );

        assert_eq!(output.report.history.len(), 2);
        let january = &output.report.history[0];
        assert_eq!(january.periodo, base_date());
        assert_eq!(january.receita_total, dec!(190));
        assert_eq!(january.pedidos, 2);
        assert_eq!(january.clientes, 1);
        assert_eq!(january.volume, 18);
        assert_eq!(january.ticket_medio, dec!(95));

        let february = &output.report.history[1];
        assert_eq!(february.pedidos, 1);
        assert_eq!(february.receita_total, dec!(60));
    }

    #[test]
    fn relationship_projects_the_next_window() {
        let output = run_analysis(
            &sample(),
            "d1",
            base_date() + chrono::Duration::days(60),
            &Settings::default(),
        );

        let cliente1 = output
            .report
            .relationship
            .iter()
            .find(|r| r.client == "Cliente 1")
            .unwrap();
        // Median turnover 15d + default logistics delay 20d.
        assert_eq!(cliente1.janela_prevista_dias, 35.0);
        assert_eq!(
            cliente1.proxima_janela,
            base_date() + chrono::Duration::days(50)
        );
    }

    #[test]
    fn behavior_table_lists_totals_and_tiers() {
        let output = run_analysis(
            &sample(),
            "d1",
            base_date() + chrono::Duration::days(60),
            &Settings::default(),
        );

        let labels: Vec<&str> = output
            .report
            .behavior
            .iter()
            .map(|row| row.indicador.as_str())
            .collect();
        assert!(labels.contains(&"Total de clientes"));
        assert!(labels.contains(&"Ruptura projetada média (dias)"));
        // Every customer lands in some tier, so at least one tier row exists.
        assert!(labels.iter().any(|l| l.starts_with("Clientes ")));
    }

    #[test]
    fn analysis_is_reproducible() {
        let reference = base_date() + chrono::Duration::days(60);
        let settings = Settings::default();
        let first = run_analysis(&sample(), "d1", reference, &settings);
        let second = run_analysis(&sample(), "d1", reference, &settings);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_input_produces_an_empty_snapshot() {
        let output = run_analysis(&[], "d1", base_date(), &Settings::default());
        assert!(output.customers.is_empty());
        assert!(output.products.is_empty());
        assert!(output.segments.is_empty());
        assert!(output.alerts.is_empty());
        assert!(output.report.history.is_empty());
        assert_eq!(output.kpis, GeneralKpis::new());
    }
}
