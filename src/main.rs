use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use core_types::{AlertKind, Transaction};
use reporting::run_analysis;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// The main entry point for the Radar sales-intelligence application.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Execute the appropriate command
    match cli.command {
        Commands::Analyze(args) => {
            if let Err(e) = handle_analyze(args) {
                eprintln!("Error during analysis: {e:#}");
                std::process::exit(1);
            }
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Sales-order analytics: RFM segmentation, turnover statistics and
/// R.I.C.O. alerts for commercial decision support.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis over a normalized transactions file.
    Analyze(AnalyzeArgs),
}

#[derive(Parser)]
struct AnalyzeArgs {
    /// Path to a JSON file holding the normalized transaction records.
    #[arg(long)]
    input: PathBuf,

    /// The dataset identifier; a fresh UUID is generated when omitted.
    #[arg(long)]
    dataset_id: Option<String>,

    /// The reference date for recency calculations (format: YYYY-MM-DD).
    /// Defaults to today, UTC.
    #[arg(long)]
    reference_date: Option<NaiveDate>,

    /// Optional path to write the full analysis output as JSON.
    #[arg(long)]
    output: Option<PathBuf>,
}

// ==============================================================================
// Analyze Command Logic
// ==============================================================================

/// Handles the orchestration of one analysis run.
fn handle_analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let settings = configuration::load_settings().context("Failed to load settings")?;

    let raw = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let records: Vec<Transaction> =
        serde_json::from_str(&raw).context("Failed to parse transactions file")?;

    // Skip records that violate the ingestion invariants instead of aborting
    // the whole analysis.
    let transactions: Vec<Transaction> = records
        .into_iter()
        .filter(|tx| match tx.validate() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "skipping invalid transaction");
                false
            }
        })
        .collect();

    let dataset_id = args
        .dataset_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let reference_date = match args.reference_date {
        Some(date) => date
            .and_hms_opt(0, 0, 0)
            .context("Invalid reference date")?
            .and_utc(),
        None => Utc::now(),
    };

    tracing::info!(
        dataset_id,
        rows = transactions.len(),
        %reference_date,
        "starting analysis"
    );
    let output = run_analysis(&transactions, &dataset_id, reference_date, &settings);

    print_summary(&output);

    if let Some(path) = args.output {
        let json = serde_json::to_string_pretty(&output)
            .context("Failed to serialize analysis output")?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Full analysis written to {}", path.display());
    }

    Ok(())
}

/// Prints the headline KPIs, tier distribution and alert counts.
fn print_summary(output: &reporting::AnalysisOutput) {
    let kpis = &output.kpis;

    let mut table = Table::new();
    table.set_header(vec!["Indicador", "Valor"]);
    table.add_row(vec!["Receita total".to_string(), kpis.total_revenue.to_string()]);
    table.add_row(vec!["Clientes".to_string(), kpis.total_customers.to_string()]);
    table.add_row(vec!["SKUs".to_string(), kpis.total_products.to_string()]);
    table.add_row(vec!["Pedidos".to_string(), kpis.total_orders.to_string()]);
    table.add_row(vec!["Ticket médio".to_string(), kpis.avg_ticket.round_dp(2).to_string()]);
    table.add_row(vec![
        "Recência média (dias)".to_string(),
        format!("{:.1}", kpis.avg_recency),
    ]);
    table.add_row(vec![
        "Ruptura projetada média (dias)".to_string(),
        format!("{:.1}", kpis.ruptura_projetada_media),
    ]);
    println!("{table}");

    let mut tiers = Table::new();
    tiers.set_header(vec!["Tier", "Clientes"]);
    for row in &output.report.behavior {
        if let Some(tier) = row.indicador.strip_prefix("Clientes ") {
            tiers.add_row(vec![tier.to_string(), format!("{:.0}", row.valor)]);
        }
    }
    println!("{tiers}");

    let mut alerts = Table::new();
    alerts.set_header(vec!["Alerta", "Total"]);
    for kind in [
        AlertKind::Ruptura,
        AlertKind::QuedaBrusca,
        AlertKind::OutlierVolume,
    ] {
        let count = output.alerts.iter().filter(|a| a.kind == kind).count();
        alerts.add_row(vec![kind.as_str().to_string(), count.to_string()]);
    }
    println!("{alerts}");

    for alert in &output.alerts {
        println!(
            "{} [{}] {}",
            alert.reliability.marker(),
            alert.kind.as_str(),
            alert.insight
        );
    }
}
