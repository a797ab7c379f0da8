//! Cloudability cost reports for CI runners.
//!
//! This crate fetches cost-and-usage rows from the Cloudability v3 cost
//! reporting API, types them against the measure catalog, and attributes CI
//! runner spend per (Project, Branch), separating normal usage from "rogue"
//! usage beyond a per-resource baseline.
//!
//! ## Features
//!
//! - Measure catalog lookups (label to name, name to data type)
//! - Validated, percent-encoded report filters
//! - Report queries over a trailing window of days, run through any
//!   [`ReportTransport`](providers::ReportTransport)
//! - Typed, column-oriented results with optional column aliases
//! - Rogue cost attribution with a conservation guarantee
//!   (`Cost + Rogue_Cost` equals the spend before the split)
//! - Text, CSV and JSON output, with optional upload to S3
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cost_attribution::attribution::CiRunnerReport;
//! use cost_attribution::providers::CloudabilityClient;
//! use cost_attribution::{sink, MeasureCatalog};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = CloudabilityClient::new(std::env::var("CLOUDABILITY_TOKEN")?)?;
//!     let catalog = MeasureCatalog::load(&client).await?;
//!
//!     // CI runner spend over the last 7 days
//!     let report = CiRunnerReport::default().run(&client, &catalog).await?;
//!     print!("{}", sink::render_table(&report));
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Queries
//!
//! ```rust,ignore
//! use cost_attribution::query::{Filter, FilterOperator, QueryRequest};
//!
//! let request = QueryRequest::builder()
//!     .filter(Filter::new(
//!         catalog.name_from_label("Account ID")?,
//!         FilterOperator::Equals,
//!         "933752197999",
//!     ))
//!     .dimension(catalog.name_from_label("Project (value)")?)
//!     .metric(catalog.name_from_label("Cost (Total)")?)
//!     .window_days(30)
//!     .build()?;
//!
//! let columns = request.execute(&client, &catalog).await?;
//! ```
//!
//! ## Testing Without the API
//!
//! Any `Fn(&str) -> Result<Vec<RawRow>>` closure is a transport, and a
//! `Vec<Measure>` is a measure source:
//!
//! ```rust,ignore
//! let transport = |_query: &str| Ok(vec![row]);
//! let catalog = MeasureCatalog::load(&measures).await?;
//! let columns = request.execute(&transport, &catalog).await?;
//! ```

pub mod attribution;
pub mod credentials;
pub mod error;
pub mod measures;
pub mod providers;
pub mod query;
pub mod sink;
pub mod upload;

pub use attribution::{AttributedCostReport, AttributedRow, CiRunnerReport, RogueThreshold};
pub use credentials::TokenSource;
pub use error::{CostReportError, Result};
pub use measures::{DataType, Measure, MeasureCatalog};
pub use providers::{CloudabilityClient, MeasureSource, ReportTransport};
pub use query::{
    make_filter, normalize, ColumnAliases, ColumnarReport, Filter, FilterOperator, QueryRequest,
    QueryWindow, RawRow, RawValue, TypedValue,
};
pub use upload::S3Destination;
