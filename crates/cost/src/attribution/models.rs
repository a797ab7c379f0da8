//! Attributed cost report types.

use serde::{Deserialize, Serialize};

/// Column names shared by the report queries and the attribution engine.
pub mod columns {
    pub const PROJECT: &str = "Project";
    pub const BRANCH: &str = "Branch";
    pub const COST: &str = "Cost";
    pub const USAGE_HOURS: &str = "Usage_Hours";
    pub const ROGUE_COST: &str = "Rogue_Cost";
    pub const ROGUE_USAGE_HOURS: &str = "Rogue_Usage_Hours";
    pub const RESOURCE_ID: &str = "Resource_ID";
}

/// Grouping key of the attributed report.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CostKey {
    pub project: String,
    pub branch: String,
}

impl CostKey {
    pub fn new(project: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            branch: branch.into(),
        }
    }
}

/// One (Project, Branch) row with spend split into normal and rogue parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributedRow {
    #[serde(rename = "Project")]
    pub project: String,
    #[serde(rename = "Branch")]
    pub branch: String,
    /// Cost of usage within the per-resource baseline.
    #[serde(rename = "Cost")]
    pub cost: f64,
    #[serde(rename = "Usage_Hours")]
    pub usage_hours: f64,
    /// Cost of usage beyond the per-resource baseline.
    #[serde(rename = "Rogue_Cost")]
    pub rogue_cost: f64,
    #[serde(rename = "Rogue_Usage_Hours")]
    pub rogue_usage_hours: f64,
}

impl AttributedRow {
    /// Spend before the split (`cost + rogue_cost`).
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.cost + self.rogue_cost
    }

    #[must_use]
    pub fn total_usage_hours(&self) -> f64 {
        self.usage_hours + self.rogue_usage_hours
    }
}

/// Final report, one row per (Project, Branch), ascending by `cost`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributedCostReport {
    rows: Vec<AttributedRow>,
}

impl AttributedCostReport {
    /// Column headers in output order.
    pub const HEADERS: [&'static str; 6] = [
        columns::PROJECT,
        columns::BRANCH,
        columns::COST,
        columns::USAGE_HOURS,
        columns::ROGUE_COST,
        columns::ROGUE_USAGE_HOURS,
    ];

    pub(crate) fn from_rows(rows: Vec<AttributedRow>) -> Self {
        Self { rows }
    }

    #[must_use]
    pub fn rows(&self) -> &[AttributedRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributedRow> {
        self.rows.iter()
    }

    #[must_use]
    pub fn row(&self, project: &str, branch: &str) -> Option<&AttributedRow> {
        self.rows
            .iter()
            .find(|r| r.project == project && r.branch == branch)
    }

    /// Sum of normal cost over all rows.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.rows.iter().map(|r| r.cost).sum()
    }

    /// Sum of rogue cost over all rows.
    #[must_use]
    pub fn total_rogue_cost(&self) -> f64 {
        self.rows.iter().map(|r| r.rogue_cost).sum()
    }
}

impl<'a> IntoIterator for &'a AttributedCostReport {
    type Item = &'a AttributedRow;
    type IntoIter = std::slice::Iter<'a, AttributedRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
