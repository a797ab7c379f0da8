//! Cloudability v3 cost reporting API.
//!
//! - **Measures**: `GET /v3/reporting/cost/measures`, the catalog of
//!   dimensions and metrics with their data types.
//! - **Report**: `GET /v3/reporting/cost/run`, a single page of result rows.
//!
//! ## Authentication
//!
//! Requires an API token (HTTP basic auth user, empty password).
//!
//! ## Example
//!
//! ```rust,ignore
//! use cost_attribution::providers::CloudabilityClient;
//! use cost_attribution::MeasureCatalog;
//!
//! let client = CloudabilityClient::new(token)?;
//! let catalog = MeasureCatalog::load(&client).await?;
//! ```

mod client;
mod models;

pub use client::{CloudabilityClient, CLOUDABILITY_API_HOST};
pub use models::{CloudabilityError, CloudabilityErrorDetails, CloudabilityReport};
