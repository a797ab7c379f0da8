//! Transport and catalog-source traits.

use async_trait::async_trait;

use crate::error::Result;
use crate::measures::Measure;
use crate::query::RawRow;

/// Executes an encoded report query and returns the raw result rows.
///
/// This is the only place a report touches the network. Implementations must
/// reject paginated or otherwise malformed responses with
/// [`CostReportError::MalformedResponse`](crate::CostReportError::MalformedResponse).
/// No timeout or retry is applied by callers; wrap the transport for that.
#[async_trait]
pub trait ReportTransport: Send + Sync {
    /// Get the transport name (e.g., "cloudability").
    fn name(&self) -> &'static str {
        "custom"
    }

    /// Run the report described by `query` (a `key=value&...` query string).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    async fn run_report(&self, query: &str) -> Result<Vec<RawRow>>;
}

/// Any plain function from query string to rows is a transport, which keeps
/// stub transports in tests to a closure.
#[async_trait]
impl<F> ReportTransport for F
where
    F: Fn(&str) -> Result<Vec<RawRow>> + Send + Sync,
{
    async fn run_report(&self, query: &str) -> Result<Vec<RawRow>> {
        (self)(query)
    }
}

/// Supplies the measures a [`MeasureCatalog`](crate::MeasureCatalog) is built from.
#[async_trait]
pub trait MeasureSource: Send + Sync {
    /// Fetch every measure definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the measures cannot be retrieved or parsed.
    async fn fetch_measures(&self) -> Result<Vec<Measure>>;
}

#[async_trait]
impl MeasureSource for Vec<Measure> {
    async fn fetch_measures(&self) -> Result<Vec<Measure>> {
        Ok(self.clone())
    }
}
