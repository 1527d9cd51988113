use super::ui;
use crate::core::{
    AssetClass, AssetFailure, AssetRecord, BatchOptions, Collector, SnapshotProvider,
    assembler::AssemblyOptions, batch::partition, config::AppConfig,
};
use crate::store::json::write_records;
use anyhow::Result;
use comfy_table::Cell;
use std::path::Path;
use tracing::info;

/// Collects every configured asset, persists the successful records to `output` and
/// prints a summary of what was collected and what was skipped.
pub async fn run(
    config: &AppConfig,
    primary: &dyn SnapshotProvider,
    secondary: Option<&dyn SnapshotProvider>,
    output: &Path,
) -> Result<()> {
    info!(
        assets = config.assets.len(),
        primary = primary.name(),
        secondary = secondary.map(|s| s.name()),
        "Collecting assets..."
    );

    if config.assets.is_empty() {
        println!("No assets configured.");
        return Ok(());
    }

    let collector = Collector::new(
        primary,
        secondary,
        BatchOptions::from(&config.batch),
        AssemblyOptions {
            exchange_suffix: config.exchange_suffix.clone(),
            scale: config.normalization,
        },
    );

    let pb = ui::new_progress_bar(config.assets.len() as u64);
    pb.set_message("Collecting assets...");
    let outcomes = collector
        .collect(&config.assets, &|outcome| {
            pb.set_message(outcome.symbol.clone());
            pb.inc(1);
        })
        .await;
    pb.finish_and_clear();

    let (records, failures) = partition(outcomes);
    write_records(output, &records)?;

    if !records.is_empty() {
        println!("{}", render_records(&records));
    }
    if !failures.is_empty() {
        println!("{}", render_failures(&failures));
    }
    println!(
        "Saved {} of {} assets to {}",
        ui::style_text(&records.len().to_string(), ui::StyleType::Success),
        config.assets.len(),
        ui::style_text(&output.display().to_string(), ui::StyleType::Subtle)
    );

    Ok(())
}

fn render_records(records: &[AssetRecord]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Ticker"),
        ui::header_cell("Type"),
        ui::header_cell("Price"),
        ui::header_cell("DY"),
        ui::header_cell("P/L"),
        ui::header_cell("P/VP"),
        ui::header_cell("Dividends"),
    ]);

    for record in records {
        let kind = match record.asset_class {
            AssetClass::Equity => "acao",
            AssetClass::RealEstateFund => "fii",
        };
        table.add_row(vec![
            Cell::new(&record.ticker),
            Cell::new(kind),
            ui::number_cell(record.price),
            ui::percent_cell(record.indicators.dy),
            ui::number_cell(record.indicators.pl),
            ui::number_cell(record.indicators.pvp),
            Cell::new(record.dividend_events.len()),
        ]);
    }

    table.to_string()
}

fn render_failures(failures: &[AssetFailure]) -> String {
    let mut output = ui::style_text("Skipped assets:", ui::StyleType::Title);
    for failure in failures {
        output.push_str("\n  ");
        output.push_str(&ui::style_text(&failure.to_string(), ui::StyleType::Error));
    }
    output
}
