//! Conversion of loosely-typed API rows into typed, column-oriented reports.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CostReportError, Result};
use crate::measures::{DataType, MeasureCatalog};

/// A value as it arrives from the API: either a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<f64> for RawValue {
    /// Non-finite floats have no JSON form and become text.
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value).map_or_else(|| Self::Text(value.to_string()), Self::Number)
    }
}

/// One result row keyed by measure name.
pub type RawRow = HashMap<String, RawValue>;

/// A value converted to its measure's declared type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    Float(f64),
    Integer(i64),
    Date(String),
    Text(String),
}

impl TypedValue {
    /// Convert `raw` to `data_type`.
    ///
    /// Float, percentage and currency parse as finite doubles, integers as
    /// `i64`, dates and strings are kept verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`CostReportError::Conversion`] when a numeric type receives a
    /// value that does not parse.
    pub fn convert(data_type: DataType, column: &str, raw: &RawValue) -> Result<Self> {
        let fail = || CostReportError::Conversion {
            column: column.to_string(),
            value: raw.to_string(),
            expected: data_type,
        };
        match data_type {
            DataType::Float | DataType::Percentage | DataType::Currency => {
                let value = match raw {
                    RawValue::Number(n) => n.as_f64(),
                    RawValue::Text(s) => s.trim().parse::<f64>().ok(),
                };
                value.filter(|v| v.is_finite()).map(Self::Float).ok_or_else(fail)
            }
            DataType::Integer => {
                let value = match raw {
                    RawValue::Number(n) => n.as_i64().or_else(|| integral_f64(n.as_f64()?)),
                    RawValue::Text(s) => s.trim().parse::<i64>().ok(),
                };
                value.map(Self::Integer).ok_or_else(fail)
            }
            DataType::Date => Ok(Self::Date(raw.to_string())),
            DataType::String => Ok(Self::Text(raw.to_string())),
        }
    }

    /// Numeric view of the value, widening integers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Integer(v) => Some(*v as f64),
            Self::Date(_) | Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Date(s) | Self::Text(s) => Some(s),
            Self::Float(_) | Self::Integer(_) => None,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub(crate) fn integral_f64(value: f64) -> Option<i64> {
    // i64::MAX is not representable; the bound is exclusive
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.fract() == 0.0 && in_range).then_some(value as i64)
}

/// Output names for report columns, keyed by measure name.
///
/// When aliases are in effect every output column must have one; an
/// unmapped column is an error rather than passed through or dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnAliases {
    entries: Vec<(String, String)>,
}

impl ColumnAliases {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the alias of `name`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, alias: impl Into<String>) -> Self {
        let name = name.into();
        let alias = alias.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = alias,
            None => self.entries.push((name, alias)),
        }
        self
    }

    /// Alias of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CostReportError::UnmappedColumn`] if `name` has no alias.
    pub fn alias(&self, name: &str) -> Result<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, alias)| alias.as_str())
            .ok_or_else(|| CostReportError::UnmappedColumn(name.to_string()))
    }

    /// Check that every one of `names` has an alias and that no two of them
    /// share one.
    ///
    /// # Errors
    ///
    /// Returns [`CostReportError::UnmappedColumn`] for the first name without
    /// an alias, or [`CostReportError::Config`] for a shared alias.
    pub fn ensure_covers<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
        let mut seen = HashSet::new();
        for name in names {
            let alias = self.alias(name)?;
            if !seen.insert(alias) {
                return Err(CostReportError::Config(format!(
                    "alias '{alias}' is used by more than one column"
                )));
            }
        }
        Ok(())
    }
}

impl<K, V> FromIterator<(K, V)> for ColumnAliases
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |aliases, (name, alias)| aliases.with(name, alias))
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub values: Vec<TypedValue>,
}

/// Field-to-values mapping with columns in insertion order
/// (metrics first, then dimensions) and one entry per source row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnarReport {
    columns: Vec<Column>,
}

impl ColumnarReport {
    /// Build a report from columns of equal length.
    ///
    /// # Errors
    ///
    /// Returns [`CostReportError::Integrity`] if column lengths differ and
    /// [`CostReportError::Config`] if a column name repeats.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let mut names = HashSet::new();
        for column in &columns {
            if !names.insert(column.name.as_str()) {
                return Err(CostReportError::Config(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
        }
        if let Some(first) = columns.first() {
            if let Some(bad) = columns.iter().find(|c| c.values.len() != first.values.len()) {
                return Err(CostReportError::Integrity(format!(
                    "column '{}' has {} values, '{}' has {}",
                    bad.name,
                    bad.values.len(),
                    first.name,
                    first.values.len()
                )));
            }
        }
        Ok(Self { columns })
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Values of a numeric column as `f64`.
    ///
    /// # Errors
    ///
    /// Returns [`CostReportError::MissingColumn`] or
    /// [`CostReportError::ColumnType`].
    pub fn numbers(&self, name: &str) -> Result<Vec<f64>> {
        let column = self.require(name)?;
        column
            .values
            .iter()
            .map(|v| {
                v.as_f64().ok_or_else(|| CostReportError::ColumnType {
                    column: name.to_string(),
                    expected: "numeric",
                })
            })
            .collect()
    }

    /// Values of a string or date column.
    ///
    /// # Errors
    ///
    /// Returns [`CostReportError::MissingColumn`] or
    /// [`CostReportError::ColumnType`].
    pub fn texts(&self, name: &str) -> Result<Vec<&str>> {
        let column = self.require(name)?;
        column
            .values
            .iter()
            .map(|v| {
                v.as_str().ok_or_else(|| CostReportError::ColumnType {
                    column: name.to_string(),
                    expected: "text",
                })
            })
            .collect()
    }

    fn require(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| CostReportError::MissingColumn(name.to_string()))
    }

    /// Rename every column through `aliases`.
    ///
    /// # Errors
    ///
    /// Returns [`CostReportError::UnmappedColumn`] if a column has no alias.
    pub fn renamed(self, aliases: &ColumnAliases) -> Result<Self> {
        aliases.ensure_covers(self.column_names())?;
        let columns = self
            .columns
            .into_iter()
            .map(|column| {
                Ok(Column {
                    name: aliases.alias(&column.name)?.to_string(),
                    ..column
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { columns })
    }
}

/// Resolve the declared type of each metric, then each dimension.
///
/// A name listed twice keeps its first position.
///
/// # Errors
///
/// Propagates catalog lookup failures.
pub fn resolve_schema(
    metrics: &[String],
    dimensions: &[String],
    catalog: &MeasureCatalog,
) -> Result<Vec<(String, DataType)>> {
    let mut schema: Vec<(String, DataType)> = Vec::with_capacity(metrics.len() + dimensions.len());
    for name in metrics.iter().chain(dimensions) {
        if schema.iter().any(|(n, _)| n == name) {
            continue;
        }
        schema.push((name.clone(), catalog.type_from_name(name)?));
    }
    Ok(schema)
}

/// Convert `rows` into a columnar report.
///
/// Types are resolved once up front so a catalog problem fails before any
/// row is touched. Rows keep their order and are not deduplicated.
///
/// # Errors
///
/// Returns catalog lookup errors, [`CostReportError::MalformedResponse`] for
/// a row missing a requested field, [`CostReportError::Conversion`] for a
/// value that does not fit its type, and [`CostReportError::UnmappedColumn`]
/// when `aliases` does not cover a column.
pub fn normalize(
    rows: &[RawRow],
    metrics: &[String],
    dimensions: &[String],
    catalog: &MeasureCatalog,
    aliases: Option<&ColumnAliases>,
) -> Result<ColumnarReport> {
    let schema = resolve_schema(metrics, dimensions, catalog)?;
    normalize_with_schema(rows, &schema, aliases)
}

pub(crate) fn normalize_with_schema(
    rows: &[RawRow],
    schema: &[(String, DataType)],
    aliases: Option<&ColumnAliases>,
) -> Result<ColumnarReport> {
    if let Some(aliases) = aliases {
        aliases.ensure_covers(schema.iter().map(|(name, _)| name.as_str()))?;
    }

    let mut columns: Vec<Column> = schema
        .iter()
        .map(|(name, data_type)| Column {
            name: name.clone(),
            data_type: *data_type,
            values: Vec::with_capacity(rows.len()),
        })
        .collect();

    for (index, row) in rows.iter().enumerate() {
        for column in &mut columns {
            let raw = row.get(&column.name).ok_or_else(|| {
                CostReportError::MalformedResponse(format!(
                    "row {index} has no field '{}'",
                    column.name
                ))
            })?;
            column
                .values
                .push(TypedValue::convert(column.data_type, &column.name, raw)?);
        }
    }

    let report = ColumnarReport { columns };
    debug!(rows = report.len(), columns = report.columns.len(), "Normalized report");
    match aliases {
        Some(aliases) => report.renamed(aliases),
        None => Ok(report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measures::Measure;

    fn catalog() -> MeasureCatalog {
        MeasureCatalog::new(vec![
            Measure::new("Cost (Total)", "total_cost", "currency"),
            Measure::new("Usage Hours", "usage_hours", "float"),
            Measure::new("Instances", "instance_count", "integer"),
            Measure::new("Project (value)", "tag1", "string"),
            Measure::new("Usage Date", "date", "date"),
            Measure::new("Legacy Blob", "blob", "binary"),
        ])
        .unwrap()
    }

    fn row(pairs: &[(&str, RawValue)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_convert_representative_values() {
        let cases = [
            (DataType::Integer, RawValue::from("42"), TypedValue::Integer(42)),
            (DataType::Float, RawValue::from("3.25"), TypedValue::Float(3.25)),
            (DataType::Currency, RawValue::from("9.99"), TypedValue::Float(9.99)),
            (DataType::Percentage, RawValue::from(0.5), TypedValue::Float(0.5)),
            (DataType::String, RawValue::from("east-1"), TypedValue::Text("east-1".into())),
            (DataType::Date, RawValue::from("2024-01-01"), TypedValue::Date("2024-01-01".into())),
        ];
        for (data_type, raw, expected) in cases {
            assert_eq!(TypedValue::convert(data_type, "c", &raw).unwrap(), expected);
        }
    }

    #[test]
    fn test_convert_numbers_from_json_numbers() {
        assert_eq!(
            TypedValue::convert(DataType::Integer, "c", &RawValue::from(7)).unwrap(),
            TypedValue::Integer(7)
        );
        assert_eq!(
            TypedValue::convert(DataType::Integer, "c", &RawValue::from(7.0)).unwrap(),
            TypedValue::Integer(7)
        );
        assert_eq!(
            TypedValue::convert(DataType::String, "c", &RawValue::from(12)).unwrap(),
            TypedValue::Text("12".into())
        );
    }

    #[test]
    fn test_convert_rejects_non_numeric() {
        for data_type in [DataType::Float, DataType::Currency, DataType::Percentage] {
            let err = TypedValue::convert(data_type, "cost", &RawValue::from("abc")).unwrap_err();
            assert!(matches!(err, CostReportError::Conversion { .. }));
        }
        let err = TypedValue::convert(DataType::Float, "cost", &RawValue::from("NaN")).unwrap_err();
        assert!(matches!(err, CostReportError::Conversion { .. }));
    }

    #[test]
    fn test_convert_rejects_non_integral() {
        let err = TypedValue::convert(DataType::Integer, "n", &RawValue::from("4.5")).unwrap_err();
        assert!(matches!(err, CostReportError::Conversion { .. }));
        let err = TypedValue::convert(DataType::Integer, "n", &RawValue::from(4.5)).unwrap_err();
        assert!(matches!(err, CostReportError::Conversion { .. }));
    }

    #[test]
    fn test_normalize_orders_metrics_then_dimensions() {
        let rows = vec![
            row(&[
                ("total_cost", RawValue::from("10.5")),
                ("usage_hours", RawValue::from("3")),
                ("tag1", RawValue::from("alpha")),
            ]),
            row(&[
                ("total_cost", RawValue::from("2")),
                ("usage_hours", RawValue::from("1.25")),
                ("tag1", RawValue::from("beta")),
            ]),
        ];
        let report = normalize(
            &rows,
            &names(&["total_cost", "usage_hours"]),
            &names(&["tag1"]),
            &catalog(),
            None,
        )
        .unwrap();

        assert_eq!(report.len(), 2);
        assert_eq!(
            report.column_names().collect::<Vec<_>>(),
            vec!["total_cost", "usage_hours", "tag1"]
        );
        assert_eq!(report.numbers("total_cost").unwrap(), vec![10.5, 2.0]);
        assert_eq!(report.texts("tag1").unwrap(), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_normalize_fails_before_rows_on_unknown_measure() {
        // The row is malformed too; the catalog error must win.
        let rows = vec![row(&[])];
        let err = normalize(&rows, &names(&["missing"]), &[], &catalog(), None).unwrap_err();
        assert!(matches!(err, CostReportError::NotFound { .. }));
    }

    #[test]
    fn test_normalize_unsupported_catalog_type() {
        let rows = vec![row(&[("blob", RawValue::from("x"))])];
        let err = normalize(&rows, &[], &names(&["blob"]), &catalog(), None).unwrap_err();
        assert!(matches!(err, CostReportError::UnsupportedType(_)));
    }

    #[test]
    fn test_normalize_row_missing_field() {
        let rows = vec![row(&[("total_cost", RawValue::from("1"))])];
        let err = normalize(
            &rows,
            &names(&["total_cost", "usage_hours"]),
            &[],
            &catalog(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CostReportError::MalformedResponse(_)));
    }

    #[test]
    fn test_normalize_with_complete_aliases() {
        let rows = vec![
            row(&[("total_cost", RawValue::from(5)), ("tag1", RawValue::from("p"))]),
            row(&[("total_cost", RawValue::from(6)), ("tag1", RawValue::from("q"))]),
            row(&[("total_cost", RawValue::from(7)), ("tag1", RawValue::from("r"))]),
        ];
        let aliases: ColumnAliases = [("total_cost", "Cost"), ("tag1", "Project")]
            .into_iter()
            .collect();
        let report = normalize(
            &rows,
            &names(&["total_cost"]),
            &names(&["tag1"]),
            &catalog(),
            Some(&aliases),
        )
        .unwrap();

        assert_eq!(report.len(), 3);
        assert_eq!(report.column_names().collect::<Vec<_>>(), vec!["Cost", "Project"]);
        assert!(report.column("total_cost").is_none());
    }

    #[test]
    fn test_normalize_with_partial_aliases_fails() {
        let rows = vec![row(&[
            ("total_cost", RawValue::from(5)),
            ("tag1", RawValue::from("p")),
        ])];
        let aliases = ColumnAliases::new().with("total_cost", "Cost");
        let err = normalize(
            &rows,
            &names(&["total_cost"]),
            &names(&["tag1"]),
            &catalog(),
            Some(&aliases),
        )
        .unwrap_err();
        assert!(matches!(err, CostReportError::UnmappedColumn(c) if c == "tag1"));
    }

    #[test]
    fn test_aliases_must_be_distinct() {
        let aliases = ColumnAliases::new().with("a", "X").with("b", "X");
        assert!(matches!(
            aliases.ensure_covers(["a", "b"]),
            Err(CostReportError::Config(_))
        ));
    }

    #[test]
    fn test_column_accessors_check_kind() {
        let rows = vec![row(&[
            ("total_cost", RawValue::from(5)),
            ("tag1", RawValue::from("p")),
        ])];
        let report = normalize(
            &rows,
            &names(&["total_cost"]),
            &names(&["tag1"]),
            &catalog(),
            None,
        )
        .unwrap();
        assert!(matches!(report.numbers("tag1"), Err(CostReportError::ColumnType { .. })));
        assert!(matches!(report.texts("total_cost"), Err(CostReportError::ColumnType { .. })));
        assert!(matches!(report.numbers("nope"), Err(CostReportError::MissingColumn(_))));
    }

    #[test]
    fn test_from_columns_rejects_ragged_columns() {
        let result = ColumnarReport::from_columns(vec![
            Column {
                name: "a".into(),
                data_type: DataType::Float,
                values: vec![TypedValue::Float(1.0)],
            },
            Column {
                name: "b".into(),
                data_type: DataType::Float,
                values: vec![],
            },
        ]);
        assert!(matches!(result, Err(CostReportError::Integrity(_))));
    }
}
