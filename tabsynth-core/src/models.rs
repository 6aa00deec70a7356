//! Core data models for synthetic tabular datasets.
//!
//! A [`Dataset`] is an ordered list of homogeneous [`Record`]s plus the
//! ordered [`Column`] list that fixes the header order of every output. All
//! values are coerced through their column's [`FieldKind`], so a record
//! never holds a value its column cannot represent.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TabSynthError};

/// Date format used for every date cell and date literal.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Cell texts read back as a missing value in non-text columns.
///
/// Matched case-insensitively; an empty cell is missing in every column.
pub const MISSING_MARKERS: [&str; 5] = ["na", "n/a", "nan", "null", "missing"];

/// A single cell value.
///
/// Identifiers and category labels are both carried as `Text`; the column's
/// [`FieldKind`] tells them apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean flag
    Flag(bool),
    /// Integer quantity
    Integer(i64),
    /// Floating-point amount (currency, grades, rates)
    Amount(f64),
    /// Identifier or category label
    Text(String),
    /// Calendar date
    Date(NaiveDate),
    /// Missing value, written as an empty cell
    Null,
}

impl Value {
    /// Returns the numeric view of integer and amount values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Amount(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text of identifier and label values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the date of date values.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Whether the value is missing.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the flag of boolean values.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Value::Flag(b) => Some(*b),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Flag(_) => "flag",
            Value::Integer(_) => "integer",
            Value::Amount(_) => "amount",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::Null => "null",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Flag(b) => write!(f, "{}", b),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Amount(v) => write!(f, "{}", v),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::Null => Ok(()),
        }
    }
}

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Unique row identifier such as `TXN-0001`
    Identifier,
    /// Category label
    Category,
    /// Calendar date
    Date,
    /// Integer quantity
    Integer,
    /// Floating-point amount rounded to a fixed number of decimals
    Amount {
        /// Decimal places kept on every value
        decimals: u32,
    },
    /// Boolean flag
    Flag,
}

impl FieldKind {
    /// Whether values of this kind take part in arithmetic.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Integer | FieldKind::Amount { .. })
    }

    /// Largest difference rounding can introduce when a raw number is
    /// stored in a column of this kind.
    pub fn tolerance(&self) -> f64 {
        match self {
            FieldKind::Integer => 0.5,
            FieldKind::Amount { decimals } => 0.5 / 10f64.powi(*decimals as i32),
            _ => 0.0,
        }
    }

    /// Converts a raw value into the representation of this kind.
    ///
    /// Amounts are rounded to the declared decimals and numbers stored in
    /// integer columns are rounded to the nearest integer. A null stays null
    /// in every kind.
    ///
    /// # Errors
    /// Returns a value error naming `field` when the value cannot be
    /// represented, for example a flag in an amount column.
    pub fn coerce(&self, field: &str, value: Value) -> Result<Value> {
        let mismatch = |value: &Value| {
            TabSynthError::value(format!(
                "field '{}' of kind {} cannot hold {} value '{}'",
                field,
                self,
                value.type_name(),
                value
            ))
        };

        if value.is_null() {
            return Ok(Value::Null);
        }

        match self {
            FieldKind::Identifier | FieldKind::Category => match value {
                Value::Text(_) => Ok(value),
                other => Ok(Value::Text(other.to_string())),
            },
            FieldKind::Date => match value {
                Value::Date(_) => Ok(value),
                Value::Text(ref s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                    .map(Value::Date)
                    .map_err(|_| mismatch(&value)),
                other => Err(mismatch(&other)),
            },
            FieldKind::Integer => match value {
                Value::Integer(_) => Ok(value),
                Value::Amount(v) if v.is_finite() && v.abs() < i64::MAX as f64 => {
                    Ok(Value::Integer(v.round() as i64))
                }
                Value::Text(ref s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Integer)
                    .map_err(|_| mismatch(&value)),
                other => Err(mismatch(&other)),
            },
            FieldKind::Amount { decimals } => {
                let raw = match value {
                    Value::Integer(v) => v as f64,
                    Value::Amount(v) => v,
                    Value::Text(ref s) => s.trim().parse::<f64>().map_err(|_| mismatch(&value))?,
                    other => return Err(mismatch(&other)),
                };
                if !raw.is_finite() {
                    return Err(mismatch(&Value::Amount(raw)));
                }
                Ok(Value::Amount(round_to(raw, *decimals)))
            }
            FieldKind::Flag => match value {
                Value::Flag(_) => Ok(value),
                Value::Text(ref s) => match s.trim() {
                    "true" | "True" | "TRUE" => Ok(Value::Flag(true)),
                    "false" | "False" | "FALSE" => Ok(Value::Flag(false)),
                    _ => Err(mismatch(&value)),
                },
                other => Err(mismatch(&other)),
            },
        }
    }

    /// Renders a stored value as a cell for delimited output.
    pub fn render(&self, value: &Value) -> String {
        match (self, value) {
            (FieldKind::Amount { decimals }, Value::Amount(v)) => {
                format!("{:.*}", *decimals as usize, v)
            }
            (_, other) => other.to_string(),
        }
    }

    /// Parses a cell read back from a delimited file.
    ///
    /// Empty cells are null. Non-text kinds also read the
    /// [`MISSING_MARKERS`] as null.
    pub fn parse(&self, field: &str, raw: &str) -> Result<Value> {
        let trimmed = raw.trim();
        let is_text = matches!(self, FieldKind::Identifier | FieldKind::Category);
        if raw.is_empty()
            || (!is_text
                && MISSING_MARKERS
                    .iter()
                    .any(|marker| trimmed.eq_ignore_ascii_case(marker)))
        {
            return Ok(Value::Null);
        }
        self.coerce(field, Value::Text(raw.to_string()))
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Identifier => f.write_str("identifier"),
            FieldKind::Category => f.write_str("category"),
            FieldKind::Date => f.write_str("date"),
            FieldKind::Integer => f.write_str("integer"),
            FieldKind::Amount { decimals } => write!(f, "amount({})", decimals),
            FieldKind::Flag => f.write_str("flag"),
        }
    }
}

/// Rounds to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: FieldKind,
}

impl Column {
    /// Creates a new column.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// One synthetic row: a mapping from field name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Sets the value of a field, returning the previous value.
    pub fn set(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(field.into(), value)
    }

    /// Returns the numeric value of a field.
    ///
    /// # Errors
    /// Returns a value error if the field is missing or not numeric.
    pub fn number(&self, field: &str) -> Result<f64> {
        match self.values.get(field) {
            Some(Value::Null) => Err(TabSynthError::value(format!("field '{}' is null", field))),
            Some(value) => value.as_f64().ok_or_else(|| {
                TabSynthError::value(format!(
                    "field '{}' holds {} value '{}', expected a number",
                    field,
                    value.type_name(),
                    value
                ))
            }),
            None => Err(TabSynthError::value(format!("field '{}' is missing", field))),
        }
    }

    /// Number of fields in the record.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over field names in sorted order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// The ordered sequence of records produced by one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    name: String,
    columns: Vec<Column>,
    records: Vec<Record>,
    injected: bool,
}

impl Dataset {
    /// Creates an empty dataset with a fixed column order.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            records: Vec::new(),
            injected: false,
        }
    }

    /// Dataset name, used for logs and the ground-truth sidecar.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Columns in output order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Records in generation order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Returns one record.
    pub fn record(&self, row: usize) -> Option<&Record> {
        self.records.get(row)
    }

    pub(crate) fn record_mut(&mut self, row: usize) -> Option<&mut Record> {
        self.records.get_mut(row)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether anomalies have already been injected into this dataset.
    pub fn is_injected(&self) -> bool {
        self.injected
    }

    pub(crate) fn mark_injected(&mut self) {
        self.injected = true;
    }

    /// Name of the first identifier column, if any.
    pub fn identifier_column(&self) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.kind == FieldKind::Identifier)
            .map(|c| c.name.as_str())
    }

    /// Appends a record after checking it has exactly the dataset's fields.
    ///
    /// # Errors
    /// Returns a value error when a column is missing or an unknown field is
    /// present.
    pub fn push(&mut self, record: Record) -> Result<()> {
        if let Some(missing) = self.columns.iter().find(|c| record.get(&c.name).is_none()) {
            return Err(TabSynthError::value(format!(
                "record {} is missing field '{}'",
                self.records.len(),
                missing.name
            )));
        }
        if record.len() != self.columns.len() {
            let extra = record
                .field_names()
                .find(|name| self.column(name).is_none())
                .unwrap_or_default()
                .to_string();
            return Err(TabSynthError::value(format!(
                "record {} has unknown field '{}'",
                self.records.len(),
                extra
            )));
        }
        self.records.push(record);
        Ok(())
    }

    /// Numeric view of one column; non-numeric or missing cells are `None`.
    pub fn numeric_column(&self, name: &str) -> Vec<Option<f64>> {
        self.records
            .iter()
            .map(|r| r.get(name).and_then(Value::as_f64))
            .collect()
    }
}

/// One injected anomaly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyMark {
    /// Zero-based row index in generation order
    pub row: usize,
    /// Identifier of the row, when the dataset has an identifier column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    /// Name of the anomaly kind applied
    pub kind: String,
    /// Fields the kind wrote
    pub fields: Vec<String>,
}

/// Record of every anomaly injected into a dataset, sorted by row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub dataset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub record_count: usize,
    pub anomalies: Vec<AnomalyMark>,
}

impl GroundTruth {
    /// Creates an empty ground truth for a dataset.
    pub fn new(dataset: impl Into<String>, record_count: usize) -> Self {
        Self {
            dataset: dataset.into(),
            seed: None,
            record_count,
            anomalies: Vec::new(),
        }
    }

    /// Builder method to record the run seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of marked rows.
    pub fn len(&self) -> usize {
        self.anomalies.len()
    }

    /// Whether no row is marked.
    pub fn is_empty(&self) -> bool {
        self.anomalies.is_empty()
    }

    /// Checks that the ground truth describes a dataset of `len` records.
    ///
    /// # Errors
    /// Returns a value error if the record counts differ or a mark points
    /// past the last record.
    pub fn check_rows(&self, len: usize) -> Result<()> {
        if self.record_count != len {
            return Err(TabSynthError::value(format!(
                "ground truth covers {} records but the dataset has {}",
                self.record_count, len
            )));
        }
        if let Some(mark) = self.anomalies.iter().find(|m| m.row >= len) {
            return Err(TabSynthError::value(format!(
                "ground truth marks row {} but the dataset has {} records",
                mark.row, len
            )));
        }
        Ok(())
    }

    /// Marked row indices.
    pub fn rows(&self) -> BTreeSet<usize> {
        self.anomalies.iter().map(|m| m.row).collect()
    }

    /// Kind injected at a row, if any.
    pub fn kind_of(&self, row: usize) -> Option<&str> {
        self.anomalies
            .iter()
            .find(|m| m.row == row)
            .map(|m| m.kind.as_str())
    }

    /// Number of marked rows per kind.
    pub fn counts_by_kind(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for mark in &self.anomalies {
            *counts.entry(mark.kind.clone()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_columns() -> Vec<Column> {
        vec![
            Column::new("txn_id", FieldKind::Identifier),
            Column::new("city", FieldKind::Category),
            Column::new("price", FieldKind::Amount { decimals: 2 }),
        ]
    }

    fn sample_record(id: &str, price: f64) -> Record {
        let mut record = Record::new();
        record.set("txn_id", Value::Text(id.to_string()));
        record.set("city", Value::Text("Cebu".to_string()));
        record.set("price", Value::Amount(price));
        record
    }

    #[test]
    fn test_coerce_amount_rounds_to_decimals() {
        let kind = FieldKind::Amount { decimals: 2 };
        let value = kind.coerce("price", Value::Amount(1234.5678)).unwrap();
        assert_eq!(value, Value::Amount(1234.57));

        let value = kind.coerce("price", Value::Integer(15)).unwrap();
        assert_eq!(value, Value::Amount(15.0));
    }

    #[test]
    fn test_coerce_integer_rounds_amounts() {
        let value = FieldKind::Integer
            .coerce("days", Value::Amount(41.6))
            .unwrap();
        assert_eq!(value, Value::Integer(42));
    }

    #[test]
    fn test_coerce_rejects_mismatched_values() {
        assert!(FieldKind::Integer.coerce("days", Value::Flag(true)).is_err());
        assert!(FieldKind::Flag.coerce("active", Value::Integer(1)).is_err());
        assert!(
            FieldKind::Amount { decimals: 2 }
                .coerce("price", Value::Amount(f64::NAN))
                .is_err()
        );
        assert!(
            FieldKind::Date
                .coerce("date", Value::Text("2025-13-40".to_string()))
                .is_err()
        );
    }

    #[test]
    fn test_coerce_labels_from_numbers() {
        let value = FieldKind::Category
            .coerce("grade", Value::Integer(7))
            .unwrap();
        assert_eq!(value, Value::Text("7".to_string()));
    }

    #[test]
    fn test_render_and_parse_amount() {
        let kind = FieldKind::Amount { decimals: 2 };
        assert_eq!(kind.render(&Value::Amount(5.0)), "5.00");
        assert_eq!(kind.render(&Value::Amount(0.1)), "0.10");
        assert_eq!(kind.parse("price", "5.00").unwrap(), Value::Amount(5.0));
    }

    #[test]
    fn test_render_and_parse_date() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(FieldKind::Date.render(&Value::Date(date)), "2025-03-09");
        assert_eq!(
            FieldKind::Date.parse("date", "2025-03-09").unwrap(),
            Value::Date(date)
        );
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(
            FieldKind::Flag.parse("f", "true").unwrap(),
            Value::Flag(true)
        );
        assert_eq!(
            FieldKind::Flag.parse("f", "false").unwrap(),
            Value::Flag(false)
        );
        assert!(FieldKind::Flag.parse("f", "maybe").is_err());
    }

    #[test]
    fn test_tolerance() {
        assert_eq!(FieldKind::Integer.tolerance(), 0.5);
        assert!((FieldKind::Amount { decimals: 2 }.tolerance() - 0.005).abs() < 1e-12);
        assert_eq!(FieldKind::Category.tolerance(), 0.0);
    }

    #[test]
    fn test_record_number() {
        let record = sample_record("TXN-0001", 10.5);
        assert_eq!(record.number("price").unwrap(), 10.5);
        assert!(record.number("city").is_err());
        assert!(record.number("missing").is_err());
    }

    #[test]
    fn test_dataset_push_checks_fields() {
        let mut dataset = Dataset::new("test", sample_columns());
        dataset.push(sample_record("TXN-0001", 1.0)).unwrap();
        assert_eq!(dataset.len(), 1);

        let mut incomplete = Record::new();
        incomplete.set("txn_id", Value::Text("TXN-0002".to_string()));
        assert!(dataset.push(incomplete).is_err());

        let mut extra = sample_record("TXN-0003", 2.0);
        extra.set("bogus", Value::Flag(false));
        let error = dataset.push(extra).unwrap_err();
        assert!(error.to_string().contains("bogus"));
        assert_eq!(dataset.len(), 1);
    }

    #[test]
    fn test_dataset_identifier_column() {
        let dataset = Dataset::new("test", sample_columns());
        assert_eq!(dataset.identifier_column(), Some("txn_id"));
        assert!(!dataset.is_injected());
    }

    #[test]
    fn test_numeric_column() {
        let mut dataset = Dataset::new("test", sample_columns());
        dataset.push(sample_record("A", 1.0)).unwrap();
        dataset.push(sample_record("B", 2.5)).unwrap();
        assert_eq!(dataset.numeric_column("price"), vec![Some(1.0), Some(2.5)]);
        assert_eq!(dataset.numeric_column("city"), vec![None, None]);
    }

    #[test]
    fn test_value_serde_untagged() {
        let values: Vec<Value> = serde_json::from_str(r#"[true, 3, 2.5, "Condo"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Flag(true),
                Value::Integer(3),
                Value::Amount(2.5),
                Value::Text("Condo".to_string()),
            ]
        );
    }

    #[test]
    fn test_null_in_every_kind() {
        for kind in [
            FieldKind::Identifier,
            FieldKind::Category,
            FieldKind::Date,
            FieldKind::Integer,
            FieldKind::Amount { decimals: 2 },
            FieldKind::Flag,
        ] {
            assert_eq!(kind.coerce("x", Value::Null).unwrap(), Value::Null);
            assert_eq!(kind.render(&Value::Null), "");
            assert_eq!(kind.parse("x", "").unwrap(), Value::Null);
        }
    }

    #[test]
    fn test_parse_missing_markers() {
        let kind = FieldKind::Integer;
        for marker in ["N/A", "missing", "NaN", "na", "NULL"] {
            assert_eq!(kind.parse("calculus", marker).unwrap(), Value::Null);
        }
        // Labels keep marker-like text as data
        assert_eq!(
            FieldKind::Category.parse("section", "N/A").unwrap(),
            Value::Text("N/A".to_string())
        );
    }

    #[test]
    fn test_record_number_on_null() {
        let mut record = Record::new();
        record.set("calculus", Value::Null);
        let error = record.number("calculus").unwrap_err();
        assert!(error.to_string().contains("is null"));
    }

    #[test]
    fn test_value_serde_null() {
        let values: Vec<Value> = serde_json::from_str("[null, 1]").unwrap();
        assert_eq!(values, vec![Value::Null, Value::Integer(1)]);
        assert_eq!(serde_json::to_string(&Value::Null).unwrap(), "null");
    }

    #[test]
    fn test_ground_truth_check_rows() {
        let mut truth = GroundTruth::new("t", 3);
        assert!(truth.check_rows(3).is_ok());
        assert!(truth.check_rows(4).is_err());

        truth.anomalies.push(AnomalyMark {
            row: 5,
            record_id: None,
            kind: "price_flip".to_string(),
            fields: vec![],
        });
        let error = truth.check_rows(3).unwrap_err();
        assert!(error.to_string().contains("marks row 5"));
    }

    #[test]
    fn test_ground_truth_queries() {
        let mut truth = GroundTruth::new("listings", 10).with_seed(42);
        for (row, kind) in [(7, "price_flip"), (8, "rapid_sale"), (9, "price_flip")] {
            truth.anomalies.push(AnomalyMark {
                row,
                record_id: Some(format!("TXN-{:04}", row + 1)),
                kind: kind.to_string(),
                fields: vec!["sold_price".to_string()],
            });
        }

        assert_eq!(truth.len(), 3);
        assert_eq!(truth.rows(), BTreeSet::from([7, 8, 9]));
        assert_eq!(truth.kind_of(8), Some("rapid_sale"));
        assert_eq!(truth.kind_of(0), None);
        assert_eq!(truth.counts_by_kind().get("price_flip"), Some(&2));
    }
}
