// Report Wire Model
// Serde mapping of the accounting platform's report documents.
//
// The shape (Header/Section/Row/SummaryRow tagging, nested rows, string-valued
// cells) is dictated by the external API and is a fixed wire contract: we
// deserialize it tolerantly and never write it back.

use serde::{Deserialize, Serialize};

// ============================================================================
// DOCUMENT ROOT
// ============================================================================

/// Root artifact returned by the report proxy.
///
/// The platform wraps every response in a `Reports` array that in practice
/// always has length 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    #[serde(rename = "Reports", default)]
    pub reports: Vec<Report>,
}

impl ReportDocument {
    /// The report everything downstream reads. `None` only for a degenerate
    /// (empty) response, which callers treat the same as an empty report.
    pub fn primary(&self) -> Option<&Report> {
        self.reports.first()
    }
}

/// A single hierarchical report (e.g. "ProfitAndLoss").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "ReportName", default)]
    pub report_name: String,

    /// Human-readable period label, e.g. "1 January 2025 to 31 January 2025".
    #[serde(rename = "ReportDate", default)]
    pub report_date: String,

    #[serde(rename = "Rows", default)]
    pub rows: Vec<ReportRow>,
}

// ============================================================================
// ROWS & CELLS
// ============================================================================

/// Row tag distinguishing column headers, section containers, ordinary line
/// items, and subtotal/total lines.
///
/// `Unknown` absorbs any tag the platform adds later so deserialization of a
/// whole document never fails on one unrecognized row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowType {
    Header,
    Section,
    Row,
    SummaryRow,
    #[serde(other)]
    Unknown,
}

impl Default for RowType {
    fn default() -> Self {
        RowType::Unknown
    }
}

/// One row of the report tree.
///
/// Well-formed input populates exactly one of `cells` (Row/SummaryRow/Header)
/// or `rows` (Section containers), but the upstream API occasionally emits
/// both or neither; both fields default to empty so either case parses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(rename = "RowType", default)]
    pub row_type: RowType,

    /// Section name, e.g. "Income" or "Less Operating Expenses".
    /// Absent on most leaf rows, whose label lives in `cells[0]` instead.
    #[serde(rename = "Title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(rename = "Cells", default, skip_serializing_if = "Vec::is_empty")]
    pub cells: Vec<ReportCell>,

    #[serde(rename = "Rows", default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<ReportRow>,
}

impl ReportRow {
    /// Label used for section matching: `title` if present, else the first
    /// cell's value, else "".
    pub fn label(&self) -> &str {
        match &self.title {
            Some(t) => t.as_str(),
            None => self.cells.first().map(|c| c.value.as_str()).unwrap_or(""),
        }
    }
}

/// A single cell. `value` may be a formatted number ("1,234.56"), a dash
/// ("-" meaning zero/absent), or a label (first cell in a row).
///
/// Position in the row is semantically significant: index 0 is the row label,
/// indices >= 1 are period/column values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportCell {
    #[serde(rename = "Value", default)]
    pub value: String,
}

impl ReportCell {
    pub fn new(value: impl Into<String>) -> Self {
        ReportCell {
            value: value.into(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "Reports": [{
            "ReportName": "ProfitAndLoss",
            "ReportDate": "1 January 2025 to 31 January 2025",
            "Rows": [
                {
                    "RowType": "Header",
                    "Cells": [{"Value": ""}, {"Value": "Jan 2025"}]
                },
                {
                    "RowType": "Section",
                    "Title": "Income",
                    "Rows": [
                        {
                            "RowType": "Row",
                            "Cells": [{"Value": "Sales"}, {"Value": "1,000.00"}]
                        },
                        {
                            "RowType": "SummaryRow",
                            "Cells": [{"Value": "Total Income"}, {"Value": "1,000.00"}]
                        }
                    ]
                }
            ]
        }]
    }"#;

    #[test]
    fn test_deserialize_sample_document() {
        let doc: ReportDocument = serde_json::from_str(SAMPLE).unwrap();
        let report = doc.primary().unwrap();

        assert_eq!(report.report_name, "ProfitAndLoss");
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].row_type, RowType::Header);

        let income = &report.rows[1];
        assert_eq!(income.row_type, RowType::Section);
        assert_eq!(income.label(), "Income");
        assert_eq!(income.rows.len(), 2);
        assert_eq!(income.rows[0].cells[1].value, "1,000.00");
    }

    #[test]
    fn test_empty_document_has_no_primary() {
        let doc: ReportDocument = serde_json::from_str(r#"{"Reports": []}"#).unwrap();
        assert!(doc.primary().is_none());

        // Missing array entirely also parses.
        let doc: ReportDocument = serde_json::from_str("{}").unwrap();
        assert!(doc.primary().is_none());
    }

    #[test]
    fn test_unknown_row_type_is_tolerated() {
        let json = r#"{
            "Reports": [{
                "ReportName": "ProfitAndLoss",
                "ReportDate": "",
                "Rows": [{"RowType": "FancyNewRow", "Cells": [{"Value": "x"}]}]
            }]
        }"#;
        let doc: ReportDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.reports[0].rows[0].row_type, RowType::Unknown);
    }

    #[test]
    fn test_label_falls_back_to_first_cell() {
        let row = ReportRow {
            row_type: RowType::SummaryRow,
            title: None,
            cells: vec![ReportCell::new("Total Income"), ReportCell::new("1,000.00")],
            rows: vec![],
        };
        assert_eq!(row.label(), "Total Income");

        let bare = ReportRow {
            row_type: RowType::Section,
            title: None,
            cells: vec![],
            rows: vec![],
        };
        assert_eq!(bare.label(), "");
    }

    #[test]
    fn test_row_with_both_cells_and_rows_parses() {
        // Malformed but observed in the wild: a section carrying its own cells.
        let json = r#"{
            "RowType": "Section",
            "Title": "Income",
            "Cells": [{"Value": "Income"}],
            "Rows": [{"RowType": "Row", "Cells": [{"Value": "Sales"}, {"Value": "5"}]}]
        }"#;
        let row: ReportRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.cells.len(), 1);
        assert_eq!(row.rows.len(), 1);
    }
}
