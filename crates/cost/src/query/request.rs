//! Report query descriptor and its execution through a transport.

use chrono::{Days, NaiveDate, Utc};
use tracing::{debug, instrument};

use super::filter::Filter;
use super::normalize::{normalize_with_schema, resolve_schema, ColumnAliases, ColumnarReport};
use crate::error::Result;
use crate::measures::MeasureCatalog;
use crate::providers::ReportTransport;

/// Default trailing window, in days.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Absolute date range `[start, end]` of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl QueryWindow {
    /// The `days` calendar days before `end`, through `end`.
    #[must_use]
    pub fn trailing(end: NaiveDate, days: u32) -> Self {
        let start = end
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    /// Trailing window ending on the current UTC date.
    #[must_use]
    pub fn ending_today(days: u32) -> Self {
        Self::trailing(Utc::now().date_naive(), days)
    }
}

/// Dimensions, metrics, filters and window of one report.
///
/// Built through [`QueryRequest::builder`], which checks that column aliases,
/// when given, cover every requested dimension and metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    filters: Vec<Filter>,
    dimensions: Vec<String>,
    metrics: Vec<String>,
    aliases: Option<ColumnAliases>,
    window_days: u32,
}

impl QueryRequest {
    #[must_use]
    pub fn builder() -> QueryRequestBuilder {
        QueryRequestBuilder::default()
    }

    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    #[must_use]
    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    #[must_use]
    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    #[must_use]
    pub fn aliases(&self) -> Option<&ColumnAliases> {
        self.aliases.as_ref()
    }

    #[must_use]
    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    /// Encoded query string for `window`.
    #[must_use]
    pub fn query_string(&self, window: &QueryWindow) -> String {
        let mut params = vec![
            format!("dimensions={}", self.dimensions.join(",")),
            format!("start_date={}", window.start.format("%Y-%m-%d")),
            format!("end_date={}", window.end.format("%Y-%m-%d")),
        ];

        for filter in &self.filters {
            params.push(format!("filters={}", filter.encode()));
        }

        params.push(format!("metrics={}", self.metrics.join(",")));
        params.join("&")
    }

    /// Run the report over the trailing window ending today.
    ///
    /// # Errors
    ///
    /// See [`QueryRequest::execute_in`].
    pub async fn execute<T>(&self, transport: &T, catalog: &MeasureCatalog) -> Result<ColumnarReport>
    where
        T: ReportTransport + ?Sized,
    {
        let window = QueryWindow::ending_today(self.window_days);
        self.execute_in(transport, catalog, &window).await
    }

    /// Run the report over `window` and normalize the rows.
    ///
    /// Every dimension and metric is resolved against the catalog before the
    /// transport is called, so an unknown measure never costs a request.
    ///
    /// # Errors
    ///
    /// Returns catalog lookup errors, transport errors and normalization
    /// errors. No partial report is returned.
    #[instrument(skip(self, transport, catalog), fields(transport = transport.name()))]
    pub async fn execute_in<T>(
        &self,
        transport: &T,
        catalog: &MeasureCatalog,
        window: &QueryWindow,
    ) -> Result<ColumnarReport>
    where
        T: ReportTransport + ?Sized,
    {
        let schema = resolve_schema(&self.metrics, &self.dimensions, catalog)?;
        let query = self.query_string(window);
        debug!(query = %query, "Running report");

        let rows = transport.run_report(&query).await?;
        debug!(rows = rows.len(), "Report returned rows");
        normalize_with_schema(&rows, &schema, self.aliases.as_ref())
    }
}

/// Builder for [`QueryRequest`].
#[derive(Debug, Clone)]
pub struct QueryRequestBuilder {
    filters: Vec<Filter>,
    dimensions: Vec<String>,
    metrics: Vec<String>,
    aliases: Option<ColumnAliases>,
    window_days: u32,
}

impl Default for QueryRequestBuilder {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            dimensions: Vec::new(),
            metrics: Vec::new(),
            aliases: None,
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

impl QueryRequestBuilder {
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn dimension(mut self, name: impl Into<String>) -> Self {
        self.dimensions.push(name.into());
        self
    }

    #[must_use]
    pub fn metric(mut self, name: impl Into<String>) -> Self {
        self.metrics.push(name.into());
        self
    }

    /// Name the output column of measure `name`. Once any alias is set,
    /// every dimension and metric needs one.
    #[must_use]
    pub fn alias(mut self, name: impl Into<String>, alias: impl Into<String>) -> Self {
        self.aliases = Some(self.aliases.take().unwrap_or_default().with(name, alias));
        self
    }

    #[must_use]
    pub fn aliases(mut self, aliases: ColumnAliases) -> Self {
        self.aliases = Some(aliases);
        self
    }

    #[must_use]
    pub fn window_days(mut self, days: u32) -> Self {
        self.window_days = days;
        self
    }

    /// Finish the request.
    ///
    /// # Errors
    ///
    /// Returns [`CostReportError::UnmappedColumn`](crate::CostReportError::UnmappedColumn)
    /// when aliases are set but miss a dimension or metric.
    pub fn build(self) -> Result<QueryRequest> {
        if let Some(aliases) = &self.aliases {
            let mut names: Vec<&str> = Vec::new();
            for name in self.metrics.iter().chain(&self.dimensions) {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            aliases.ensure_covers(names)?;
        }
        Ok(QueryRequest {
            filters: self.filters,
            dimensions: self.dimensions,
            metrics: self.metrics,
            aliases: self.aliases,
            window_days: self.window_days,
        })
    }
}
