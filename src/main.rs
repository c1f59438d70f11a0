use std::env;
use std::path::Path;

use anyhow::{bail, Context, Result};
use rusqlite::Connection;

use practice_console::{
    diff_series, setup_database, summarize_profit_and_loss, ReportDocument,
};

const DB_PATH: &str = "console.db";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("init") => run_init(),
        Some("normalize") => {
            let path = args
                .get(2)
                .context("Usage: practice-console normalize <report.json>")?;
            run_normalize(Path::new(path))
        }
        Some("diff") => {
            let a = args.get(2);
            let b = args.get(3);
            match (a, b) {
                (Some(a), Some(b)) => run_diff(Path::new(a), Path::new(b)),
                _ => bail!("Usage: practice-console diff <a.json> <b.json>"),
            }
        }
        _ => {
            eprintln!("Usage: practice-console <command>");
            eprintln!("  init                     Create the console database");
            eprintln!("  normalize <report.json>  Print the P&L summary for a saved report");
            eprintln!("  diff <a.json> <b.json>   Top differences between two report bases");
            std::process::exit(2);
        }
    }
}

fn run_init() -> Result<()> {
    let conn = Connection::open(DB_PATH)?;
    setup_database(&conn)?;
    println!("✓ Database initialized at {}", DB_PATH);

    Ok(())
}

fn load_document(path: &Path) -> Result<ReportDocument> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read report file {:?}", path))?;
    let doc = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse report document {:?}", path))?;

    Ok(doc)
}

fn run_normalize(path: &Path) -> Result<()> {
    let doc = load_document(path)?;
    let summary = summarize_profit_and_loss(&doc);

    println!("{} ({})", summary.report_name, summary.report_date);
    println!();

    println!("Income");
    for item in &summary.income {
        println!("  {:<32} {:>12.2}", item.name, item.value);
    }
    println!("  {:<32} {:>12.2}", "Total income", summary.total_income);
    println!();

    println!("Operating expenses");
    for item in &summary.expenses {
        println!("  {:<32} {:>12.2}", item.name, item.value);
    }
    println!("  {:<32} {:>12.2}", "Total expenses", summary.total_expenses);
    println!();

    println!("  {:<32} {:>12.2}", "Net profit", summary.net_profit);
    println!(
        "  {:<32} {:>11.1}%",
        "Profit margin", summary.metrics.profit_margin
    );
    println!(
        "  {:<32} {:>11.1}%",
        "Expense ratio", summary.metrics.expense_ratio
    );

    if !summary.is_complete() {
        println!();
        println!(
            "⚠ Data incomplete: missing section(s) {}",
            summary.missing_sections.join(", ")
        );
    }

    Ok(())
}

fn run_diff(path_a: &Path, path_b: &Path) -> Result<()> {
    let summary_a = summarize_profit_and_loss(&load_document(path_a)?);
    let summary_b = summarize_profit_and_loss(&load_document(path_b)?);

    let mut items_a = summary_a.income;
    items_a.extend(summary_a.expenses);
    let mut items_b = summary_b.income;
    items_b.extend(summary_b.expenses);

    let rows = diff_series(&items_a, &items_b);
    if rows.is_empty() {
        println!("No differences.");
        return Ok(());
    }

    println!(
        "{:<32} {:>12} {:>12} {:>12} {:>9}",
        "Item", "A", "B", "Diff", "Diff %"
    );
    for row in &rows {
        println!(
            "{:<32} {:>12.2} {:>12.2} {:>+12.2} {:>+8.1}%",
            row.name, row.value_a, row.value_b, row.difference, row.percent_difference
        );
    }

    Ok(())
}
