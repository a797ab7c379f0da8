//! Measure catalog: the typed fields (dimensions and metrics) the billing API reports on.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{CostReportError, Result};
use crate::providers::MeasureSource;

/// Primitive type of a measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Float,
    Date,
    Percentage,
    Integer,
    Currency,
    String,
}

impl DataType {
    /// Whether values of this type aggregate as numbers.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Float | Self::Percentage | Self::Integer | Self::Currency
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float => write!(f, "float"),
            Self::Date => write!(f, "date"),
            Self::Percentage => write!(f, "percentage"),
            Self::Integer => write!(f, "integer"),
            Self::Currency => write!(f, "currency"),
            Self::String => write!(f, "string"),
        }
    }
}

impl FromStr for DataType {
    type Err = CostReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "float" => Ok(Self::Float),
            "date" => Ok(Self::Date),
            "percentage" => Ok(Self::Percentage),
            "integer" => Ok(Self::Integer),
            "currency" => Ok(Self::Currency),
            "string" => Ok(Self::String),
            other => Err(CostReportError::UnsupportedType(other.to_string())),
        }
    }
}

/// A reportable field as described by the measures endpoint.
///
/// `data_type` keeps the API's tag verbatim; it is only interpreted by
/// [`MeasureCatalog::type_from_name`], so a catalog can be loaded even when
/// it lists types this crate cannot convert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    /// Human-readable label (e.g. "Cost (Total)").
    pub label: String,
    /// Canonical field name used in queries and result rows.
    pub name: String,
    /// Type tag (e.g. "currency").
    pub data_type: String,
}

impl Measure {
    pub fn new(
        label: impl Into<String>,
        name: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Immutable lookup table over the measures of one session.
#[derive(Debug, Clone, Default)]
pub struct MeasureCatalog {
    measures: Vec<Measure>,
}

impl MeasureCatalog {
    /// Build a catalog, rejecting duplicate labels or names.
    ///
    /// # Errors
    ///
    /// Returns [`CostReportError::DuplicateMeasure`] if two measures share a
    /// label or a name.
    pub fn new(measures: Vec<Measure>) -> Result<Self> {
        let mut labels = HashSet::new();
        let mut names = HashSet::new();
        for measure in &measures {
            if !labels.insert(measure.label.as_str()) {
                return Err(CostReportError::DuplicateMeasure {
                    field: "label",
                    value: measure.label.clone(),
                });
            }
            if !names.insert(measure.name.as_str()) {
                return Err(CostReportError::DuplicateMeasure {
                    field: "name",
                    value: measure.name.clone(),
                });
            }
        }
        Ok(Self { measures })
    }

    /// Fetch the measures once from `source` and build the catalog.
    ///
    /// # Errors
    ///
    /// Propagates transport errors and duplicate-measure errors.
    #[instrument(skip(source))]
    pub async fn load<S>(source: &S) -> Result<Self>
    where
        S: MeasureSource + ?Sized,
    {
        let measures = source.fetch_measures().await?;
        debug!(count = measures.len(), "Loaded measure catalog");
        Self::new(measures)
    }

    /// Canonical name of the measure labelled `label`.
    ///
    /// # Errors
    ///
    /// Returns [`CostReportError::NotFound`] if no measure has that label.
    pub fn name_from_label(&self, label: &str) -> Result<&str> {
        self.measures
            .iter()
            .find(|m| m.label == label)
            .map(|m| m.name.as_str())
            .ok_or_else(|| CostReportError::NotFound {
                field: "label",
                value: label.to_string(),
            })
    }

    /// Declared type of the measure named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CostReportError::NotFound`] if no measure has that name and
    /// [`CostReportError::UnsupportedType`] if its type tag is unknown.
    pub fn type_from_name(&self, name: &str) -> Result<DataType> {
        self.measures
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| CostReportError::NotFound {
                field: "name",
                value: name.to_string(),
            })?
            .data_type
            .parse()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.measures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Measure> {
        self.measures.iter()
    }
}
