//! The CI runner report: total and rogue queries, then attribution.

use tracing::{info, instrument};

use super::engine::{attribute, RogueThreshold};
use super::models::{columns, AttributedCostReport};
use crate::error::Result;
use crate::measures::MeasureCatalog;
use crate::providers::ReportTransport;
use crate::query::{Filter, FilterOperator, QueryRequest, QueryWindow, DEFAULT_WINDOW_DAYS};

/// Catalog labels of the measures the report is built from.
pub mod labels {
    pub const ACCOUNT_ID: &str = "Account ID";
    pub const WORKLOAD: &str = "Workload (value)";
    pub const PROJECT: &str = "Project (value)";
    pub const BUSINESS_UNIT: &str = "Business Unit (value)";
    pub const COST: &str = "Cost (Total)";
    pub const USAGE_HOURS: &str = "Usage Hours";
    pub const RESOURCE_ID: &str = "Resource ID";
}

pub const DEFAULT_ACCOUNT_ID: &str = "933752197999";
pub const DEFAULT_WORKLOAD: &str = "ci runner";

/// Per-(Project, Branch) CI runner spend over a trailing window.
///
/// Branches are tracked through the "Business Unit" tag.
#[derive(Debug, Clone, PartialEq)]
pub struct CiRunnerReport {
    pub account_id: String,
    pub workload: String,
    pub window_days: u32,
    pub threshold: RogueThreshold,
}

impl Default for CiRunnerReport {
    fn default() -> Self {
        Self {
            account_id: DEFAULT_ACCOUNT_ID.to_string(),
            workload: DEFAULT_WORKLOAD.to_string(),
            window_days: DEFAULT_WINDOW_DAYS,
            threshold: RogueThreshold::default(),
        }
    }
}

impl CiRunnerReport {
    /// Query for total cost and hours per (Project, Branch).
    ///
    /// # Errors
    ///
    /// Returns [`CostReportError::NotFound`](crate::CostReportError::NotFound)
    /// if the catalog lacks one of the [`labels`].
    pub fn total_request(&self, catalog: &MeasureCatalog) -> Result<QueryRequest> {
        let name = |label| catalog.name_from_label(label);
        QueryRequest::builder()
            .filter(Filter::new(
                name(labels::ACCOUNT_ID)?,
                FilterOperator::Equals,
                &self.account_id,
            ))
            .filter(Filter::new(
                name(labels::WORKLOAD)?,
                FilterOperator::Equals,
                &self.workload,
            ))
            .dimension(name(labels::PROJECT)?)
            .dimension(name(labels::BUSINESS_UNIT)?)
            .metric(name(labels::COST)?)
            .metric(name(labels::USAGE_HOURS)?)
            .alias(name(labels::PROJECT)?, columns::PROJECT)
            .alias(name(labels::BUSINESS_UNIT)?, columns::BRANCH)
            .alias(name(labels::COST)?, columns::COST)
            .alias(name(labels::USAGE_HOURS)?, columns::USAGE_HOURS)
            .window_days(self.window_days)
            .build()
    }

    /// Query for cost and hours per resource that ran at least the threshold.
    ///
    /// # Errors
    ///
    /// Returns [`CostReportError::NotFound`](crate::CostReportError::NotFound)
    /// if the catalog lacks one of the [`labels`].
    pub fn rogue_request(&self, catalog: &MeasureCatalog) -> Result<QueryRequest> {
        let name = |label| catalog.name_from_label(label);
        QueryRequest::builder()
            .filter(Filter::new(
                name(labels::ACCOUNT_ID)?,
                FilterOperator::Equals,
                &self.account_id,
            ))
            .filter(Filter::new(
                name(labels::USAGE_HOURS)?,
                FilterOperator::GreaterThanOrEquals,
                self.threshold.hours().to_string(),
            ))
            .filter(Filter::new(
                name(labels::WORKLOAD)?,
                FilterOperator::Equals,
                &self.workload,
            ))
            .dimension(name(labels::PROJECT)?)
            .dimension(name(labels::BUSINESS_UNIT)?)
            .dimension(name(labels::RESOURCE_ID)?)
            .metric(name(labels::COST)?)
            .metric(name(labels::USAGE_HOURS)?)
            .alias(name(labels::PROJECT)?, columns::PROJECT)
            .alias(name(labels::BUSINESS_UNIT)?, columns::BRANCH)
            .alias(name(labels::RESOURCE_ID)?, columns::RESOURCE_ID)
            .alias(name(labels::COST)?, columns::ROGUE_COST)
            .alias(name(labels::USAGE_HOURS)?, columns::ROGUE_USAGE_HOURS)
            .window_days(self.window_days)
            .build()
    }

    /// Run both queries over the window ending today and attribute.
    ///
    /// # Errors
    ///
    /// Propagates catalog, transport, normalization and attribution errors.
    pub async fn run<T>(&self, transport: &T, catalog: &MeasureCatalog) -> Result<AttributedCostReport>
    where
        T: ReportTransport + ?Sized,
    {
        let window = QueryWindow::ending_today(self.window_days);
        self.run_in(transport, catalog, &window).await
    }

    /// Run both queries over `window` and attribute.
    ///
    /// Both queries share the window so they agree on the period even when
    /// the run straddles midnight.
    ///
    /// # Errors
    ///
    /// Propagates catalog, transport, normalization and attribution errors.
    #[instrument(skip(self, transport, catalog), fields(account = %self.account_id))]
    pub async fn run_in<T>(
        &self,
        transport: &T,
        catalog: &MeasureCatalog,
        window: &QueryWindow,
    ) -> Result<AttributedCostReport>
    where
        T: ReportTransport + ?Sized,
    {
        let total_request = self.total_request(catalog)?;
        let rogue_request = self.rogue_request(catalog)?;

        let total = total_request.execute_in(transport, catalog, window).await?;
        info!(rows = total.len(), "Fetched total cost report");
        let rogue = rogue_request.execute_in(transport, catalog, window).await?;
        info!(rows = rogue.len(), "Fetched rogue cost report");

        let report = attribute(&total, &rogue, self.threshold)?;
        info!(
            groups = report.len(),
            cost = report.total_cost(),
            rogue_cost = report.total_rogue_cost(),
            "Attributed CI runner cost"
        );
        Ok(report)
    }
}
