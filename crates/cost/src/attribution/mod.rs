//! Rogue cost attribution for CI runner spend.
//!
//! Usage beyond a per-resource baseline (4 hours by default) is "rogue": a
//! runner that should have finished but kept going. The report keeps one row
//! per (Project, Branch) and splits its spend into normal and rogue parts
//! without double counting: `Cost + Rogue_Cost` is always the total spend.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cost_attribution::attribution::CiRunnerReport;
//! use cost_attribution::providers::CloudabilityClient;
//! use cost_attribution::MeasureCatalog;
//!
//! let client = CloudabilityClient::new(token)?;
//! let catalog = MeasureCatalog::load(&client).await?;
//! let report = CiRunnerReport::default().run(&client, &catalog).await?;
//!
//! for row in &report {
//!     println!("{}/{}: ${:.2} (+${:.2} rogue)", row.project, row.branch, row.cost, row.rogue_cost);
//! }
//! ```

mod engine;
mod models;
mod pipeline;

pub use engine::{attribute, RogueThreshold, DEFAULT_ROGUE_THRESHOLD_HOURS};
pub use models::{columns, AttributedCostReport, AttributedRow, CostKey};
pub use pipeline::{labels, CiRunnerReport, DEFAULT_ACCOUNT_ID, DEFAULT_WORKLOAD};
