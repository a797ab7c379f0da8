//! Cloudability v3 API response models.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{CostReportError, Result};
use crate::measures::Measure;
use crate::query::normalize::integral_f64;
use crate::query::{RawRow, RawValue};

// ============================================================================
// Cost report
// ============================================================================

/// Body of `GET /v3/reporting/cost/run`.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudabilityReport {
    /// Result rows keyed by measure name.
    pub results: Vec<RawRow>,
    /// Total number of rows the report has (number or numeric string).
    pub total_results: RawValue,
    /// Present and non-empty when the API split the result into pages.
    #[serde(default)]
    pub pagination: Option<Value>,
}

impl CloudabilityReport {
    /// Parse a report body, rejecting anything but a single complete page.
    ///
    /// # Errors
    ///
    /// Returns [`CostReportError::MalformedResponse`] when the body is not a
    /// non-empty object, does not match the report shape, is paginated, or
    /// holds fewer rows than `total_results`.
    pub fn from_value(body: Value) -> Result<Self> {
        match &body {
            Value::Object(map) if map.is_empty() => {
                return Err(CostReportError::MalformedResponse(
                    "expected a report, got an empty object".to_string(),
                ));
            }
            Value::Object(_) => {}
            other => {
                return Err(CostReportError::MalformedResponse(format!(
                    "report result should be an object, got {other}"
                )));
            }
        }

        let report: Self = serde_json::from_value(body)
            .map_err(|e| CostReportError::MalformedResponse(format!("invalid report body: {e}")))?;

        if report.pagination.as_ref().is_some_and(is_truthy) {
            return Err(CostReportError::MalformedResponse(
                "paginated responses are not supported".to_string(),
            ));
        }

        let total = report.total_results()?;
        if report.results.len() != total {
            return Err(CostReportError::MalformedResponse(format!(
                "got {} results out of {total}; paginated responses are not supported",
                report.results.len()
            )));
        }

        Ok(report)
    }

    fn total_results(&self) -> Result<usize> {
        let parsed = match &self.total_results {
            RawValue::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().and_then(integral_f64).and_then(|n| u64::try_from(n).ok()))
                .and_then(|n| usize::try_from(n).ok()),
            RawValue::Text(s) => s.trim().parse().ok(),
        };
        parsed.ok_or_else(|| {
            CostReportError::MalformedResponse(format!(
                "total_results is not a count: {}",
                self.total_results
            ))
        })
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

// ============================================================================
// Measures
// ============================================================================

/// Parse the body of `GET /v3/reporting/cost/measures`.
///
/// # Errors
///
/// Returns [`CostReportError::MalformedResponse`] if the body is not a list
/// of `{label, name, data_type}` records.
pub fn parse_measures(body: Value) -> Result<Vec<Measure>> {
    if !body.is_array() {
        return Err(CostReportError::MalformedResponse(format!(
            "measures result should be a list, got {body}"
        )));
    }
    serde_json::from_value(body)
        .map_err(|e| CostReportError::MalformedResponse(format!("invalid measure list: {e}")))
}

// ============================================================================
// Error response
// ============================================================================

/// Error response from the Cloudability API.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudabilityError {
    pub error: CloudabilityErrorDetails,
}

/// Error details from the Cloudability API.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudabilityErrorDetails {
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub messages: Vec<String>,
}

impl CloudabilityError {
    #[must_use]
    pub fn message(&self) -> String {
        if self.error.messages.is_empty() {
            self.error
                .code
                .as_ref()
                .map_or_else(|| "unknown error".to_string(), ToString::to_string)
        } else {
            self.error.messages.join("; ")
        }
    }
}
