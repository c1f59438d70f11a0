// Basis Diff Engine
// Compares two normalized series of the same report - cash vs accrual, or two
// tracking-category columns - and surfaces the largest absolute swings first.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::normalize::LineItem;

/// One line of a basis comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffRow {
    pub name: String,
    pub value_a: f64,
    pub value_b: f64,
    /// b - a.
    pub difference: f64,
    /// difference / |a| * 100, or 0 when a is 0.
    pub percent_difference: f64,
}

/// Diff two series by item name.
///
/// Builds the union of names across both inputs (absence counts as 0),
/// computes `difference = b - a` per name, drops items where the difference
/// is exactly 0, and sorts descending by `|difference|` so "top N" views
/// always surface the largest swings regardless of sign. Ties sort by name
/// to keep the output deterministic.
pub fn diff_series(a: &[LineItem], b: &[LineItem]) -> Vec<DiffRow> {
    // BTreeMap so the union iterates in a stable order before sorting.
    let mut union: BTreeMap<&str, (f64, f64)> = BTreeMap::new();

    for item in a {
        union.entry(item.name.as_str()).or_insert((0.0, 0.0)).0 = item.value;
    }
    for item in b {
        union.entry(item.name.as_str()).or_insert((0.0, 0.0)).1 = item.value;
    }

    let mut rows: Vec<DiffRow> = union
        .into_iter()
        .filter_map(|(name, (value_a, value_b))| {
            let difference = value_b - value_a;
            if difference == 0.0 {
                return None;
            }
            let percent_difference = if value_a != 0.0 {
                (difference / value_a.abs()) * 100.0
            } else {
                0.0
            };
            Some(DiffRow {
                name: name.to_string(),
                value_a,
                value_b,
                difference,
                percent_difference,
            })
        })
        .collect();

    rows.sort_by(|x, y| {
        y.difference
            .abs()
            .partial_cmp(&x.difference.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| x.name.cmp(&y.name))
    });

    rows
}

/// The `n` largest absolute swings.
pub fn top_differences(a: &[LineItem], b: &[LineItem], n: usize) -> Vec<DiffRow> {
    let mut rows = diff_series(a, b);
    rows.truncate(n);
    rows
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn items(pairs: &[(&str, f64)]) -> Vec<LineItem> {
        pairs
            .iter()
            .map(|(name, value)| LineItem::new(*name, *value))
            .collect()
    }

    #[test]
    fn test_diff_basic() {
        let cash = items(&[("Sales", 900.0), ("Rent", 600.0)]);
        let accrual = items(&[("Sales", 1000.0), ("Rent", 600.0)]);

        let rows = diff_series(&cash, &accrual);

        // Rent is unchanged and filtered out.
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Sales");
        assert_eq!(rows[0].difference, 100.0);
        assert!((rows[0].percent_difference - 11.111).abs() < 0.001);
    }

    #[test]
    fn test_diff_union_treats_absence_as_zero() {
        let a = items(&[("Sales", 500.0)]);
        let b = items(&[("Consulting", 200.0)]);

        let rows = diff_series(&a, &b);
        assert_eq!(rows.len(), 2);

        let sales = rows.iter().find(|r| r.name == "Sales").unwrap();
        assert_eq!(sales.value_b, 0.0);
        assert_eq!(sales.difference, -500.0);

        let consulting = rows.iter().find(|r| r.name == "Consulting").unwrap();
        assert_eq!(consulting.value_a, 0.0);
        assert_eq!(consulting.difference, 200.0);
        // No basis value to compare against.
        assert_eq!(consulting.percent_difference, 0.0);
    }

    #[test]
    fn test_diff_sorted_by_absolute_difference() {
        let a = items(&[("Small", 10.0), ("Big", 1000.0), ("Negative", 500.0)]);
        let b = items(&[("Small", 15.0), ("Big", 1200.0), ("Negative", 100.0)]);

        let rows = diff_series(&a, &b);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();

        // -400 outranks +200 outranks +5.
        assert_eq!(names, vec!["Negative", "Big", "Small"]);
    }

    #[test]
    fn test_diff_antisymmetry() {
        let a = items(&[("Sales", 900.0), ("Fees", 50.0)]);
        let b = items(&[("Sales", 1000.0), ("Fees", 25.0)]);

        let forward = diff_series(&a, &b);
        let backward = diff_series(&b, &a);

        for row in &forward {
            let mirror = backward.iter().find(|r| r.name == row.name).unwrap();
            assert_eq!(row.difference, -mirror.difference);
        }
    }

    #[test]
    fn test_diff_percent_uses_abs_of_basis() {
        let a = items(&[("Adjustment", -200.0)]);
        let b = items(&[("Adjustment", -100.0)]);

        let rows = diff_series(&a, &b);
        assert_eq!(rows[0].difference, 100.0);
        // 100 / |-200| * 100 = 50, sign preserved from the difference.
        assert_eq!(rows[0].percent_difference, 50.0);
    }

    #[test]
    fn test_diff_identical_series_is_empty() {
        let a = items(&[("Sales", 100.0), ("Rent", 40.0)]);
        assert!(diff_series(&a, &a).is_empty());
    }

    #[test]
    fn test_top_differences_truncates() {
        let a = items(&[("A", 1.0), ("B", 2.0), ("C", 3.0)]);
        let b = items(&[("A", 10.0), ("B", 200.0), ("C", 30.0)]);

        let top = top_differences(&a, &b, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "B");
        assert_eq!(top[1].name, "C");
    }
}
