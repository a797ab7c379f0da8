//! Report filters (`field`, operator, value) in the form the v3 API expects.

use std::fmt;
use std::str::FromStr;

use crate::error::{CostReportError, Result};

/// Comparison operators accepted by the cost reporting endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// `!=@`
    NotContains,
    /// `!=`
    NotEquals,
    /// `<=`
    LessThanOrEquals,
    /// `<`
    LessThan,
    /// `=@`
    Contains,
    /// `[]!=`
    NotIn,
    /// `[]=`
    In,
    /// `==`
    Equals,
    /// `>`
    GreaterThan,
    /// `===`
    StrictlyEquals,
    /// `!==`
    StrictlyNotEquals,
    /// `>=`
    GreaterThanOrEquals,
}

impl FilterOperator {
    pub const ALL: [Self; 12] = [
        Self::NotContains,
        Self::NotEquals,
        Self::LessThanOrEquals,
        Self::LessThan,
        Self::Contains,
        Self::NotIn,
        Self::In,
        Self::Equals,
        Self::GreaterThan,
        Self::StrictlyEquals,
        Self::StrictlyNotEquals,
        Self::GreaterThanOrEquals,
    ];

    /// Wire token for this operator.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotContains => "!=@",
            Self::NotEquals => "!=",
            Self::LessThanOrEquals => "<=",
            Self::LessThan => "<",
            Self::Contains => "=@",
            Self::NotIn => "[]!=",
            Self::In => "[]=",
            Self::Equals => "==",
            Self::GreaterThan => ">",
            Self::StrictlyEquals => "===",
            Self::StrictlyNotEquals => "!==",
            Self::GreaterThanOrEquals => ">=",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = CostReportError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| CostReportError::UnsupportedOperator(s.to_string()))
    }
}

/// A single predicate on a measure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub operator: FilterOperator,
    pub value: String,
}

impl Filter {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Percent-encoded `field + operator + value`, ready for a query string.
    ///
    /// `/` is left as is so path-like values (branches such as `feat/x`)
    /// reach the API verbatim.
    #[must_use]
    pub fn encode(&self) -> String {
        urlencoding::encode(&format!("{}{}{}", self.field, self.operator, self.value))
            .replace("%2F", "/")
    }
}

/// Validate `operator` and return the encoded filter string.
///
/// # Errors
///
/// Returns [`CostReportError::UnsupportedOperator`] if `operator` is not one
/// of the twelve supported tokens.
pub fn make_filter(field: &str, operator: &str, value: &str) -> Result<String> {
    let operator: FilterOperator = operator.parse()?;
    Ok(Filter::new(field, operator, value).encode())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_operator() {
        let err = make_filter("cost", "~=", "10").unwrap_err();
        assert!(matches!(err, CostReportError::UnsupportedOperator(op) if op == "~="));
    }

    #[test]
    fn test_make_filter_encodes_operator() {
        let encoded = make_filter("cost", ">=", "10").unwrap();
        assert_eq!(encoded, "cost%3E%3D10");
        assert!(encoded.contains("%3E%3D"));
    }

    #[test]
    fn test_make_filter_encodes_value_spaces() {
        let encoded = make_filter("category4", "==", "ci runner").unwrap();
        assert_eq!(encoded, "category4%3D%3Dci%20runner");
    }

    #[test]
    fn test_make_filter_keeps_slashes() {
        let encoded = make_filter("category2", "==", "feat/x y").unwrap();
        assert_eq!(encoded, "category2%3D%3Dfeat/x%20y");
    }

    #[test]
    fn test_every_operator_round_trips_its_token() {
        for op in FilterOperator::ALL {
            assert_eq!(op.as_str().parse::<FilterOperator>().unwrap(), op);
        }
    }

    #[test]
    fn test_make_filter_is_deterministic() {
        let a = make_filter("vendor_account_identifier", "==", "933752197999").unwrap();
        let b = make_filter("vendor_account_identifier", "==", "933752197999").unwrap();
        assert_eq!(a, b);
    }
}
