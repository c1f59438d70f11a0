// Report Normalizer
// Converts a report's row tree into flat numeric series for charts and tables.
//
// One shared module instead of per-view copies of the same extraction logic:
// every dashboard view does name-based (not positional) lookup here, because
// section ordering and exact titles vary across report configurations.
//
// Everything in this module is pure and infallible. The data comes from an
// external, occasionally inconsistent API, so every miss degrades to an
// empty/zero default rather than an error; a blank metric beats a hard
// failure for a read-only dashboard. Callers that need to distinguish "no
// section" from "empty section" use metrics::PnlSummary::missing_sections.

use serde::{Deserialize, Serialize};

use crate::report::{Report, ReportRow, RowType};

// ============================================================================
// NORMALIZED OUTPUT
// ============================================================================

/// A single named value, ready for a chart or table renderer.
///
/// Ephemeral projection: computed fresh from a ReportDocument on every
/// request, never persisted, no identity beyond the current response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub value: f64,
}

impl LineItem {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        LineItem {
            name: name.into(),
            value,
        }
    }

    /// Zero-valued items are retained by the normalizer; whether to hide
    /// them is a presentation decision, so views filter with this.
    pub fn is_zero(&self) -> bool {
        self.value == 0.0
    }
}

/// One value column of a multi-column report (per month, per department /
/// tracking category), with the items observed in that column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSeries {
    /// Column heading from the report's Header row ("Jan 2025", "Sales Dept").
    pub heading: String,
    pub items: Vec<LineItem>,
}

// ============================================================================
// CELL PARSING
// ============================================================================

/// Parse a cell value into a number.
///
/// The platform formats numbers with thousands separators ("1,234.56") and
/// writes "-" for zero/absent. Strategy: treat "" and "-" as 0, strip every
/// character that is not a digit, minus sign, or decimal point, then parse;
/// anything still unparseable (pure labels, stray punctuation) is 0.
pub fn parse_amount(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return 0.0;
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '.')
        .collect();

    cleaned.parse::<f64>().unwrap_or(0.0)
}

/// Numeric value of `cells[index]`, defaulting to 0 when the row is short.
fn cell_amount(row: &ReportRow, index: usize) -> f64 {
    row.cells
        .get(index)
        .map(|c| parse_amount(&c.value))
        .unwrap_or(0.0)
}

// ============================================================================
// SECTION LOOKUP
// ============================================================================

/// Find a section by title and return its nested rows.
///
/// Linear scan, case-sensitive, matching the row's `title` (or first cell
/// when the title is absent) against any candidate in `titles` - callers
/// pass a synonym set because report configurations disagree on naming
/// ("Expenses" vs "Less Operating Expenses").
///
/// Returns `&[]` when nothing matches. "Not found" and "found but empty"
/// are deliberately indistinguishable here; both mean "no data".
pub fn find_section<'a>(rows: &'a [ReportRow], titles: &[&str]) -> &'a [ReportRow] {
    rows.iter()
        .find(|row| titles.contains(&row.label()))
        .map(|row| row.rows.as_slice())
        .unwrap_or(&[])
}

// ============================================================================
// LINE ITEMS & SUMMARIES
// ============================================================================

/// Extract the ordinary line items of a section, reading values from the
/// first value column (`cells[1]`).
pub fn extract_line_items(section_rows: &[ReportRow]) -> Vec<LineItem> {
    extract_line_items_at(section_rows, 1)
}

/// Extract line items reading values from column `col` of each row.
///
/// Only `RowType::Row` qualifies: SummaryRow would double-count the section
/// total and nested Section rows would double-count their children. Rows
/// with fewer than `col + 1` cells contribute 0, not an error.
pub fn extract_line_items_at(section_rows: &[ReportRow], col: usize) -> Vec<LineItem> {
    section_rows
        .iter()
        .filter(|row| row.row_type == RowType::Row)
        .map(|row| {
            let name = row
                .cells
                .first()
                .map(|c| c.value.clone())
                .unwrap_or_default();
            LineItem {
                name,
                value: cell_amount(row, col),
            }
        })
        .collect()
}

/// Read a section's total from its SummaryRow.
///
/// This is the canonical way to read "the total": the source total may
/// legitimately differ from the sum of visible line items due to rounding
/// or rows hidden upstream, so we never re-sum.
///
/// `label` optionally narrows the match ("Total Income") when a section
/// carries more than one summary line. Returns 0 when no summary row exists.
pub fn extract_summary_value(section_rows: &[ReportRow], label: Option<&str>) -> f64 {
    section_rows
        .iter()
        .filter(|row| row.row_type == RowType::SummaryRow)
        .find(|row| match label {
            Some(wanted) => row.label() == wanted,
            None => true,
        })
        .map(|row| cell_amount(row, 1))
        .unwrap_or(0.0)
}

// ============================================================================
// MULTI-COLUMN REPORTS
// ============================================================================

/// Column headings of a multi-column report: the values of the Header row's
/// cells after the label column. Empty for single-column reports without a
/// header row.
pub fn column_headings(report: &Report) -> Vec<String> {
    report
        .rows
        .iter()
        .find(|row| row.row_type == RowType::Header)
        .map(|row| {
            row.cells
                .iter()
                .skip(1)
                .map(|c| c.value.clone())
                .collect()
        })
        .unwrap_or_default()
}

/// Pivot a section across all value columns.
///
/// For a report split by tracking category (department, cost center) or by
/// period, returns one ColumnSeries per value column, pairing the Header
/// row's heading with that column's line items. Columns beyond the header
/// (or a missing header entirely) get an empty heading rather than being
/// dropped, so the column count always follows the data.
pub fn pivot_columns(report: &Report, titles: &[&str]) -> Vec<ColumnSeries> {
    let section = find_section(&report.rows, titles);
    if section.is_empty() {
        return vec![];
    }

    let headings = column_headings(report);
    let column_count = section
        .iter()
        .filter(|row| row.row_type == RowType::Row)
        .map(|row| row.cells.len().saturating_sub(1))
        .max()
        .unwrap_or(0);

    (0..column_count)
        .map(|i| ColumnSeries {
            heading: headings.get(i).cloned().unwrap_or_default(),
            items: extract_line_items_at(section, i + 1),
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
