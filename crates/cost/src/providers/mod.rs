//! Report transports and measure sources.
//!
//! This module provides:
//!
//! - the [`ReportTransport`] and [`MeasureSource`] seams
//! - Cloudability - v3 cost reporting API

pub mod cloudability;
mod traits;

pub use cloudability::CloudabilityClient;
pub use traits::{MeasureSource, ReportTransport};
