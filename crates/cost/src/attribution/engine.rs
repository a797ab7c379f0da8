//! Split of total spend into normal and rogue (over-threshold) spend.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::models::{columns, AttributedCostReport, AttributedRow, CostKey};
use crate::error::{CostReportError, Result};
use crate::query::ColumnarReport;

/// Baseline usage per resource that is not counted as rogue.
pub const DEFAULT_ROGUE_THRESHOLD_HOURS: f64 = 4.0;

/// Per-resource usage baseline, in hours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RogueThreshold(f64);

impl RogueThreshold {
    /// # Errors
    ///
    /// Returns [`CostReportError::Config`] unless `hours` is finite and
    /// non-negative.
    pub fn new(hours: f64) -> Result<Self> {
        if hours.is_finite() && hours >= 0.0 {
            Ok(Self(hours))
        } else {
            Err(CostReportError::Config(format!(
                "rogue threshold must be a non-negative number of hours, got {hours}"
            )))
        }
    }

    #[must_use]
    pub fn hours(self) -> f64 {
        self.0
    }

    /// Rogue `(cost, hours)` of one resource that ran `hours` for `cost`.
    ///
    /// The first `threshold` hours are charged at the resource's average
    /// hourly rate and removed. Resources at or below the threshold (which
    /// includes zero hours) contribute nothing, so no NaN or negative value
    /// comes out of a division by zero.
    #[must_use]
    pub fn rogue_part(self, cost: f64, hours: f64) -> (f64, f64) {
        if hours <= self.0 || hours <= 0.0 {
            return (0.0, 0.0);
        }
        let rate = cost / hours;
        ((cost - rate * self.0).max(0.0), hours - self.0)
    }
}

impl Default for RogueThreshold {
    fn default() -> Self {
        Self(DEFAULT_ROGUE_THRESHOLD_HOURS)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Sums {
    cost: f64,
    hours: f64,
}

/// Combine a total report and a rogue report into the attributed report.
///
/// `total` needs columns Project, Branch, Cost and `Usage_Hours`, one row per
/// any finer grain. `rogue` needs Project, Branch, `Rogue_Cost` and
/// `Rogue_Usage_Hours`, one row per resource, already filtered upstream to
/// resources at or above the threshold. Other columns are ignored.
///
/// Steps, in order: per-resource rogue adjustment, grouping of both sides by
/// (Project, Branch), outer join with zero-filled rogue figures, subtraction
/// of rogue from total, ascending sort by cost.
///
/// # Errors
///
/// Returns [`CostReportError::MissingColumn`] or
/// [`CostReportError::ColumnType`] for unusable inputs, and
/// [`CostReportError::Integrity`] when a (Project, Branch) has rogue rows but
/// no total rows.
pub fn attribute(
    total: &ColumnarReport,
    rogue: &ColumnarReport,
    threshold: RogueThreshold,
) -> Result<AttributedCostReport> {
    // Adjust per resource before grouping: the baseline applies once per
    // resource, not once per group.
    let rogue_rows = keyed_sums(rogue, columns::ROGUE_COST, columns::ROGUE_USAGE_HOURS)?;
    let adjusted: Vec<(CostKey, Sums)> = rogue_rows
        .into_iter()
        .map(|(key, sums)| {
            if sums.hours < threshold.hours() {
                warn!(
                    project = %key.project,
                    branch = %key.branch,
                    hours = sums.hours,
                    "Rogue row below threshold, counting it as zero"
                );
            }
            let (cost, hours) = threshold.rogue_part(sums.cost, sums.hours);
            (key, Sums { cost, hours })
        })
        .collect();

    let totals = group(keyed_sums(total, columns::COST, columns::USAGE_HOURS)?);
    let rogues = group(adjusted);

    if let Some(orphan) = rogues.keys().find(|key| !totals.contains_key(*key)) {
        return Err(CostReportError::Integrity(format!(
            "rogue usage for project '{}' branch '{}' has no matching total",
            orphan.project, orphan.branch
        )));
    }

    let mut rows: Vec<AttributedRow> = totals
        .into_iter()
        .map(|(key, total)| {
            let rogue = rogues.get(&key).copied().unwrap_or_default();
            AttributedRow {
                project: key.project,
                branch: key.branch,
                cost: total.cost - rogue.cost,
                usage_hours: total.hours - rogue.hours,
                rogue_cost: rogue.cost,
                rogue_usage_hours: rogue.hours,
            }
        })
        .collect();

    // Stable, so equal costs stay in key order.
    rows.sort_by(|a, b| a.cost.total_cmp(&b.cost));

    debug!(
        groups = rows.len(),
        rogue_groups = rogues.len(),
        "Attributed rogue cost"
    );
    Ok(AttributedCostReport::from_rows(rows))
}

fn keyed_sums(report: &ColumnarReport, cost: &str, hours: &str) -> Result<Vec<(CostKey, Sums)>> {
    let projects = report.texts(columns::PROJECT)?;
    let branches = report.texts(columns::BRANCH)?;
    let costs = report.numbers(cost)?;
    let hours = report.numbers(hours)?;

    Ok(projects
        .into_iter()
        .zip(branches)
        .zip(costs.into_iter().zip(hours))
        .map(|((project, branch), (cost, hours))| (CostKey::new(project, branch), Sums { cost, hours }))
        .collect())
}

fn group(rows: Vec<(CostKey, Sums)>) -> BTreeMap<CostKey, Sums> {
    let mut groups: BTreeMap<CostKey, Sums> = BTreeMap::new();
    for (key, sums) in rows {
        let entry = groups.entry(key).or_default();
        entry.cost += sums.cost;
        entry.hours += sums.hours;
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measures::DataType;
    use crate::query::{Column, TypedValue};

    fn text(name: &str, values: &[&str]) -> Column {
        Column {
            name: name.to_string(),
            data_type: DataType::String,
            values: values.iter().map(|v| TypedValue::Text((*v).to_string())).collect(),
        }
    }

    fn float(name: &str, values: &[f64]) -> Column {
        Column {
            name: name.to_string(),
            data_type: DataType::Float,
            values: values.iter().copied().map(TypedValue::Float).collect(),
        }
    }

    fn total(rows: &[(&str, &str, f64, f64)]) -> ColumnarReport {
        ColumnarReport::from_columns(vec![
            float(columns::COST, &rows.iter().map(|r| r.2).collect::<Vec<_>>()),
            float(columns::USAGE_HOURS, &rows.iter().map(|r| r.3).collect::<Vec<_>>()),
            text(columns::PROJECT, &rows.iter().map(|r| r.0).collect::<Vec<_>>()),
            text(columns::BRANCH, &rows.iter().map(|r| r.1).collect::<Vec<_>>()),
        ])
        .unwrap()
    }

    fn rogue(rows: &[(&str, &str, &str, f64, f64)]) -> ColumnarReport {
        ColumnarReport::from_columns(vec![
            float(columns::ROGUE_COST, &rows.iter().map(|r| r.3).collect::<Vec<_>>()),
            float(columns::ROGUE_USAGE_HOURS, &rows.iter().map(|r| r.4).collect::<Vec<_>>()),
            text(columns::PROJECT, &rows.iter().map(|r| r.0).collect::<Vec<_>>()),
            text(columns::BRANCH, &rows.iter().map(|r| r.1).collect::<Vec<_>>()),
            text(columns::RESOURCE_ID, &rows.iter().map(|r| r.2).collect::<Vec<_>>()),
        ])
        .unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_single_group_scenario() {
        let report = attribute(
            &total(&[("A", "X", 100.0, 50.0)]),
            &rogue(&[("A", "X", "r1", 20.0, 10.0)]),
            RogueThreshold::default(),
        )
        .unwrap();

        assert_eq!(report.len(), 1);
        let row = report.row("A", "X").unwrap();
        assert!(close(row.rogue_cost, 12.0));
        assert!(close(row.rogue_usage_hours, 6.0));
        assert!(close(row.cost, 88.0));
        assert!(close(row.usage_hours, 44.0));
    }

    #[test]
    fn test_threshold_boundary_is_neutral() {
        for cost in [0.0, 1.0, 17.3, 12_345.678] {
            assert_eq!(RogueThreshold::default().rogue_part(cost, 4.0), (0.0, 0.0));
        }
    }

    #[test]
    fn test_resource_at_threshold_leaves_row_unchanged() {
        let report = attribute(
            &total(&[("A", "X", 50.0, 20.0)]),
            &rogue(&[("A", "X", "r1", 30.0, 4.0)]),
            RogueThreshold::default(),
        )
        .unwrap();

        let row = report.row("A", "X").unwrap();
        assert_eq!(row.rogue_cost, 0.0);
        assert_eq!(row.rogue_usage_hours, 0.0);
        assert!(close(row.cost, 50.0));
        assert!(close(row.usage_hours, 20.0));
    }

    #[test]
    fn test_zero_hours_do_not_produce_nan() {
        let (cost, hours) = RogueThreshold::new(0.0).unwrap().rogue_part(5.0, 0.0);
        assert_eq!((cost, hours), (0.0, 0.0));
    }

    #[test]
    fn test_adjustment_is_per_resource() {
        // Two resources of 10h each: the baseline comes off each one.
        let report = attribute(
            &total(&[("A", "X", 100.0, 50.0)]),
            &rogue(&[("A", "X", "r1", 20.0, 10.0), ("A", "X", "r2", 20.0, 10.0)]),
            RogueThreshold::default(),
        )
        .unwrap();

        let row = report.row("A", "X").unwrap();
        assert!(close(row.rogue_cost, 24.0));
        assert!(close(row.rogue_usage_hours, 12.0));
    }

    #[test]
    fn test_group_without_rogue_rows_is_zero_filled() {
        let report = attribute(
            &total(&[("A", "X", 100.0, 50.0), ("B", "Y", 30.0, 3.0)]),
            &rogue(&[("A", "X", "r1", 20.0, 10.0)]),
            RogueThreshold::default(),
        )
        .unwrap();

        let row = report.row("B", "Y").unwrap();
        assert_eq!(row.rogue_cost, 0.0);
        assert_eq!(row.rogue_usage_hours, 0.0);
        assert_eq!(row.cost, 30.0);
        assert_eq!(row.usage_hours, 3.0);
    }

    #[test]
    fn test_total_rows_are_grouped() {
        let report = attribute(
            &total(&[("A", "X", 10.0, 1.0), ("A", "X", 15.0, 2.0)]),
            &rogue(&[]),
            RogueThreshold::default(),
        )
        .unwrap();

        assert_eq!(report.len(), 1);
        assert_eq!(report.row("A", "X").unwrap().cost, 25.0);
    }

    #[test]
    fn test_cost_is_conserved() {
        let totals = [
            ("A", "X", 100.0, 50.0),
            ("A", "Y", 7.5, 9.0),
            ("B", "X", 64.0, 33.0),
            ("C", "Z", 1.0, 0.5),
        ];
        let report = attribute(
            &total(&totals),
            &rogue(&[
                ("A", "X", "r1", 20.0, 10.0),
                ("A", "Y", "r2", 7.5, 9.0),
                ("B", "X", "r3", 40.0, 4.0),
                ("B", "X", "r4", 24.0, 29.0),
            ]),
            RogueThreshold::default(),
        )
        .unwrap();

        for (project, branch, cost, _) in totals {
            let row = report.row(project, branch).unwrap();
            assert!(close(row.total_cost(), cost), "{project}/{branch}");
            assert!(row.rogue_cost >= 0.0);
            assert!(row.rogue_usage_hours >= 0.0);
        }
    }

    #[test]
    fn test_rows_sorted_by_cost() {
        let report = attribute(
            &total(&[
                ("A", "X", 100.0, 50.0),
                ("B", "X", 5.0, 1.0),
                ("C", "X", 50.0, 8.0),
            ]),
            &rogue(&[("A", "X", "r1", 90.0, 45.0)]),
            RogueThreshold::default(),
        )
        .unwrap();

        let costs: Vec<f64> = report.iter().map(|r| r.cost).collect();
        assert!(costs.windows(2).all(|w| w[0] <= w[1]), "{costs:?}");
        assert_eq!(report.rows()[0].project, "B");
    }

    #[test]
    fn test_rogue_only_group_is_integrity_error() {
        let err = attribute(
            &total(&[("A", "X", 100.0, 50.0)]),
            &rogue(&[("Z", "Q", "r1", 20.0, 10.0)]),
            RogueThreshold::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CostReportError::Integrity(_)));
    }

    #[test]
    fn test_missing_column() {
        let incomplete = ColumnarReport::from_columns(vec![text(columns::PROJECT, &["A"])]).unwrap();
        let err = attribute(&incomplete, &rogue(&[]), RogueThreshold::default()).unwrap_err();
        assert!(matches!(err, CostReportError::MissingColumn(_)));
    }

    #[test]
    fn test_threshold_validation() {
        assert!(RogueThreshold::new(-1.0).is_err());
        assert!(RogueThreshold::new(f64::NAN).is_err());
        assert_eq!(RogueThreshold::new(2.5).unwrap().hours(), 2.5);
    }
}
