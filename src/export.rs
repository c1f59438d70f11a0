// CSV Export
// Writes normalized series and diffs out as CSV for spreadsheets and
// external charting tools.

use std::path::Path;

use anyhow::{Context, Result};

use crate::diff::DiffRow;
use crate::normalize::LineItem;

/// Write a series as `name,value` rows.
pub fn write_series_csv(path: &Path, items: &[LineItem]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).context("Failed to create CSV file")?;

    wtr.write_record(["name", "value"])?;
    for item in items {
        let value = format!("{:.2}", item.value);
        wtr.write_record([item.name.as_str(), value.as_str()])?;
    }
    wtr.flush()?;

    Ok(())
}

/// Write a basis comparison as one row per differing item.
pub fn write_diff_csv(path: &Path, rows: &[DiffRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).context("Failed to create CSV file")?;

    wtr.write_record([
        "name",
        "value_a",
        "value_b",
        "difference",
        "percent_difference",
    ])?;
    for row in rows {
        wtr.write_record(&[
            row.name.clone(),
            format!("{:.2}", row.value_a),
            format!("{:.2}", row.value_b),
            format!("{:.2}", row.difference),
            format!("{:.2}", row.percent_difference),
        ])?;
    }
    wtr.flush()?;

    Ok(())
}
