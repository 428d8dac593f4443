use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use core_types::{CustomerAnalytics, ProductAnalytics, Tier, Transaction};
use metrics::GeneralKpis;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// The five standard report tables. The names are a stable contract with the
// export collaborator.
pub const CLIENTS_TABLE: &str = "Identificação do Cliente";
pub const HISTORY_TABLE: &str = "Histórico Comercial";
pub const MIX_TABLE: &str = "Inteligência de Mix";
pub const RELATIONSHIP_TABLE: &str = "Relacional e Atendimento";
pub const BEHAVIOR_TABLE: &str = "Inteligência Comportamental";

/// One calendar month of commercial history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyHistoryRow {
    /// First day of the month, UTC.
    pub periodo: DateTime<Utc>,
    pub receita_total: Decimal,
    pub pedidos: u64,
    pub clientes: u64,
    pub volume: i64,
    pub ticket_medio: Decimal,
}

/// Relationship/turnover projection for one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRow {
    pub client: String,
    pub segment: Option<String>,
    pub city: Option<String>,
    pub uf: Option<String>,
    pub gm_cliente: f64,
    pub recency: i64,
    pub frequency: u64,
    pub last_order: DateTime<Utc>,
    /// Expected days until the next order: median turnover + logistics delay.
    pub janela_prevista_dias: f64,
    pub proxima_janela: DateTime<Utc>,
}

/// One labeled indicator of the behavioral KPI table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorIndicator {
    pub indicador: String,
    pub valor: f64,
}

/// The five named report tables of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportBundle {
    pub clients: Vec<CustomerAnalytics>,
    pub history: Vec<MonthlyHistoryRow>,
    pub mix: Vec<ProductAnalytics>,
    pub relationship: Vec<RelationshipRow>,
    pub behavior: Vec<BehaviorIndicator>,
}

/// Folds the raw transactions into the monthly commercial-history table.
pub(crate) fn monthly_history(transactions: &[Transaction]) -> Vec<MonthlyHistoryRow> {
    let mut buckets: BTreeMap<(i32, u32), Vec<&Transaction>> = BTreeMap::new();
    for tx in transactions {
        buckets
            .entry((tx.date.year(), tx.date.month()))
            .or_default()
            .push(tx);
    }

    buckets
        .into_iter()
        .filter_map(|((year, month), rows)| {
            let periodo = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()?;
            let receita_total: Decimal = rows.iter().map(|tx| tx.subtotal).sum();
            let pedidos = rows
                .iter()
                .map(|tx| tx.order_id.as_str())
                .collect::<BTreeSet<_>>()
                .len() as u64;
            let clientes = rows
                .iter()
                .map(|tx| tx.client.as_str())
                .collect::<BTreeSet<_>>()
                .len() as u64;
            let volume: i64 = rows.iter().map(|tx| tx.qty).sum();
            let ticket_medio = if pedidos > 0 {
                receita_total / Decimal::from(pedidos)
            } else {
                Decimal::ZERO
            };

            Some(MonthlyHistoryRow {
                periodo,
                receita_total,
                pedidos,
                clientes,
                volume,
                ticket_medio,
            })
        })
        .collect()
}

/// Projects each client's next replenishment window from its turnover.
pub(crate) fn relationship_rows(
    customers: &[CustomerAnalytics],
    logistics_delay_days: i64,
) -> Vec<RelationshipRow> {
    customers
        .iter()
        .map(|c| {
            let janela_prevista_dias = c.gm_cliente + logistics_delay_days as f64;
            let proxima_janela =
                c.last_order + Duration::seconds((janela_prevista_dias * 86_400.0) as i64);
            RelationshipRow {
                client: c.client.clone(),
                segment: c.segment.clone(),
                city: c.city.clone(),
                uf: c.uf.clone(),
                gm_cliente: c.gm_cliente,
                recency: c.recency,
                frequency: c.frequency,
                last_order: c.last_order,
                janela_prevista_dias,
                proxima_janela,
            }
        })
        .collect()
}

/// Assembles the behavioral KPI rows: dataset totals plus one row per
/// populated tier.
pub(crate) fn behavior_rows(
    kpis: &GeneralKpis,
    customers: &[CustomerAnalytics],
) -> Vec<BehaviorIndicator> {
    let mut rows = vec![
        BehaviorIndicator {
            indicador: "Total de clientes".to_string(),
            valor: kpis.total_customers as f64,
        },
        BehaviorIndicator {
            indicador: "Total de SKUs".to_string(),
            valor: kpis.total_products as f64,
        },
        BehaviorIndicator {
            indicador: "Total de pedidos".to_string(),
            valor: kpis.total_orders as f64,
        },
        BehaviorIndicator {
            indicador: "Ticket médio".to_string(),
            valor: round2(kpis.avg_ticket.to_f64().unwrap_or(0.0)),
        },
        BehaviorIndicator {
            indicador: "Ruptura projetada média (dias)".to_string(),
            valor: round2(kpis.ruptura_projetada_media),
        },
    ];

    for tier in [Tier::Hero, Tier::Growth, Tier::Manter, Tier::Risco] {
        let count = customers.iter().filter(|c| c.tier == tier).count();
        if count > 0 {
            rows.push(BehaviorIndicator {
                indicador: format!("Clientes {}", tier.as_str()),
                valor: count as f64,
            });
        }
    }

    rows
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
