// Derived Metrics & P&L Summary
// The consolidated dashboard payload every view reads instead of rolling its
// own extraction: income/expense series, summary totals, derived ratios, and
// an explicit record of which sections the report was missing.

use serde::{Deserialize, Serialize};

use crate::normalize::{
    extract_line_items, extract_summary_value, find_section, parse_amount, LineItem,
};
use crate::report::{ReportDocument, ReportRow, RowType};

/// Synonym sets for section lookup. Report configurations disagree on
/// naming, so the synonyms live here, once, instead of drifting per view.
pub const INCOME_TITLES: &[&str] = &["Income", "Revenue", "Turnover"];
pub const EXPENSE_TITLES: &[&str] = &[
    "Less Operating Expenses",
    "Operating Expenses",
    "Expenses",
];

// ============================================================================
// DERIVED METRICS
// ============================================================================

/// Percentage metrics derived from the three P&L totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// net_profit / total_income * 100, or 0 when income is 0.
    pub profit_margin: f64,
    /// total_expenses / total_income * 100, or 0 when income is 0.
    pub expense_ratio: f64,
}

/// Compute margin and expense ratio.
///
/// Division by zero is defined to yield 0, never NaN or infinity: many
/// newly-onboarded tenants have zero revenue for a period and the dashboard
/// must render 0%, not NaN%.
pub fn derive_metrics(total_income: f64, total_expenses: f64, net_profit: f64) -> DerivedMetrics {
    if total_income > 0.0 {
        DerivedMetrics {
            profit_margin: (net_profit / total_income) * 100.0,
            expense_ratio: (total_expenses / total_income) * 100.0,
        }
    } else {
        DerivedMetrics {
            profit_margin: 0.0,
            expense_ratio: 0.0,
        }
    }
}

// ============================================================================
// P&L SUMMARY
// ============================================================================

/// Normalized Profit & Loss payload for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlSummary {
    pub report_name: String,
    pub report_date: String,

    pub income: Vec<LineItem>,
    pub expenses: Vec<LineItem>,

    pub total_income: f64,
    pub total_expenses: f64,
    pub net_profit: f64,

    pub metrics: DerivedMetrics,

    /// Sections whose synonym set matched nothing in this report.
    ///
    /// Totals still default to zero (partial data is common and a blank
    /// metric is preferable to a hard failure), but this field lets a view
    /// render "data incomplete" instead of a silent all-zero dashboard.
    pub missing_sections: Vec<String>,
}

impl PnlSummary {
    /// True when every expected section was present in the source report.
    pub fn is_complete(&self) -> bool {
        self.missing_sections.is_empty()
    }
}

/// Normalize a P&L report document into the dashboard summary.
///
/// Totals come from SummaryRows, not from re-summing line items: the source
/// total may legitimately differ from the visible items' sum (rounding,
/// rows hidden upstream). Net profit prefers an explicit "Net Profit"
/// summary at the report's top level and falls back to income - expenses
/// for report shapes that do not carry one.
pub fn summarize_profit_and_loss(doc: &ReportDocument) -> PnlSummary {
    let empty: &[ReportRow] = &[];
    let (report_name, report_date, rows) = match doc.primary() {
        Some(report) => (
            report.report_name.clone(),
            report.report_date.clone(),
            report.rows.as_slice(),
        ),
        None => (String::new(), String::new(), empty),
    };

    let mut missing_sections = Vec::new();

    let income_rows = find_section(rows, INCOME_TITLES);
    if income_rows.is_empty() {
        missing_sections.push("Income".to_string());
    }
    let expense_rows = find_section(rows, EXPENSE_TITLES);
    if expense_rows.is_empty() {
        missing_sections.push("Operating Expenses".to_string());
    }

    let income = extract_line_items(income_rows);
    let expenses = extract_line_items(expense_rows);

    let total_income = extract_summary_value(income_rows, None);
    let total_expenses = extract_summary_value(expense_rows, None);

    // Some configurations put "Net Profit" as a top-level SummaryRow outside
    // any section.
    let explicit_net = rows
        .iter()
        .filter(|r| r.row_type == RowType::SummaryRow)
        .find(|r| r.label() == "Net Profit")
        .map(|r| {
            r.cells
                .get(1)
                .map(|c| parse_amount(&c.value))
                .unwrap_or(0.0)
        });
    let net_profit = explicit_net.unwrap_or(total_income - total_expenses);

    PnlSummary {
        report_name,
        report_date,
        income,
        expenses,
        total_income,
        total_expenses,
        net_profit,
        metrics: derive_metrics(total_income, total_expenses, net_profit),
        missing_sections,
    }
}

// ============================================================================
// TESTS
// ============================================================================
