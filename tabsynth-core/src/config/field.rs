//! Field generation configuration.
//!
//! Each field of a dataset is described by a [`FieldSpec`]: its name, its
//! column kind and the [`FieldSource`] its values are drawn from. Derived
//! fields use a [`DerivedRule`] over fields declared earlier in the list.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TabSynthError};
use crate::models::{Column, FieldKind, Value};

fn default_weight() -> f64 {
    1.0
}

fn default_start() -> u64 {
    1
}

fn default_scale() -> f64 {
    1.0
}

/// A categorical option with its relative weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedOption {
    pub value: Value,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl WeightedOption {
    /// Creates a weighted option.
    pub fn new(value: impl Into<Value>, weight: f64) -> Self {
        Self {
            value: value.into(),
            weight,
        }
    }

    /// Builds equally weighted options.
    pub fn uniform<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Vec<Self> {
        values.into_iter().map(|v| Self::new(v, 1.0)).collect()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Amount(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Flag(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

/// Closed numeric interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lo: f64,
    pub hi: f64,
}

impl Interval {
    /// Creates an interval.
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }
}

/// Where the values of a field come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldSource {
    /// Sequential identifiers: `prefix` + zero-padded `start + row`
    Sequence {
        prefix: String,
        #[serde(default)]
        width: usize,
        #[serde(default = "default_start")]
        start: u64,
    },
    /// Weighted categorical choice
    Choice { options: Vec<WeightedOption> },
    /// Uniform integer over `[lo, hi]`
    UniformInt { lo: i64, hi: i64 },
    /// Uniform continuous over `[lo, hi]`
    UniformFloat { lo: f64, hi: f64 },
    /// Normal draw truncated to `[lo, hi]`; out-of-range values are clipped,
    /// never resampled
    ClippedNormal {
        mean: f64,
        std_dev: f64,
        lo: f64,
        hi: f64,
    },
    /// Boolean flag that is true with `probability`
    Bernoulli { probability: f64 },
    /// Uniform calendar day in `[start, end]`
    DateRange { start: NaiveDate, end: NaiveDate },
    /// Fixed value
    Constant { value: Value },
    /// Source selected by the value of an earlier category field
    ByCategory {
        field: String,
        sources: BTreeMap<String, FieldSource>,
    },
    /// Value computed from earlier fields of the same record
    Derived { rule: DerivedRule },
}

/// Computation of a derived field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DerivedRule {
    /// Product of numeric fields
    Product { factors: Vec<String> },
    /// `minuend - subtrahend`
    Difference { minuend: String, subtrahend: String },
    /// `base * rate / 100`
    Percent { base: String, rate: String },
    /// `base * U(lo, hi)`
    Scaled { base: String, lo: f64, hi: f64 },
    /// `base + U(lo, hi)`, optionally clamped
    Offset {
        base: String,
        lo: f64,
        hi: f64,
        #[serde(default)]
        clamp: Option<Interval>,
    },
    /// `numerator / denominator * scale`
    Ratio {
        numerator: String,
        denominator: String,
        #[serde(default = "default_scale")]
        scale: f64,
    },
    /// Copy of `field` with `probability`, otherwise a weighted choice
    Echo {
        field: String,
        probability: f64,
        otherwise: Vec<WeightedOption>,
    },
    /// Text with `{field}` placeholders
    Template { pattern: String },
    /// Date `reference_year - age` years back; month and day are drawn
    /// (1-12, 1-28) unless fixed
    BirthDate {
        age_field: String,
        reference_year: i32,
        #[serde(default)]
        month: Option<u32>,
        #[serde(default)]
        day: Option<u32>,
    },
}

impl DerivedRule {
    /// Fields this rule reads.
    pub fn references(&self) -> Vec<&str> {
        match self {
            DerivedRule::Product { factors } => factors.iter().map(String::as_str).collect(),
            DerivedRule::Difference {
                minuend,
                subtrahend,
            } => vec![minuend.as_str(), subtrahend.as_str()],
            DerivedRule::Percent { base, rate } => vec![base.as_str(), rate.as_str()],
            DerivedRule::Scaled { base, .. } | DerivedRule::Offset { base, .. } => vec![base.as_str()],
            DerivedRule::Ratio {
                numerator,
                denominator,
                ..
            } => vec![numerator.as_str(), denominator.as_str()],
            DerivedRule::Echo { field, .. } => vec![field.as_str()],
            DerivedRule::Template { pattern } => template_placeholders(pattern),
            DerivedRule::BirthDate { age_field, .. } => vec![age_field.as_str()],
        }
    }

    /// Fields this rule uses in arithmetic.
    fn numeric_references(&self) -> Vec<&str> {
        match self {
            DerivedRule::Echo { .. } | DerivedRule::Template { .. } => Vec::new(),
            _ => self.references(),
        }
    }

    /// Whether the rule draws no randomness, so its result can be recomputed
    /// from a stored record.
    pub fn is_deterministic(&self) -> bool {
        matches!(
            self,
            DerivedRule::Product { .. }
                | DerivedRule::Difference { .. }
                | DerivedRule::Percent { .. }
                | DerivedRule::Ratio { .. }
                | DerivedRule::Template { .. }
        )
    }

    /// Validates the rule for a field of `kind` given the visible columns.
    pub fn validate(&self, field: &str, kind: FieldKind, visible: &[Column]) -> Result<()> {
        for reference in self.references() {
            if visible.iter().all(|c| c.name != reference) {
                return Err(TabSynthError::invalid_field(
                    field,
                    format!("references '{}' which is not declared before it", reference),
                ));
            }
        }
        for reference in self.numeric_references() {
            let column = visible.iter().find(|c| c.name == reference);
            if let Some(column) = column {
                if !column.kind.is_numeric() {
                    return Err(TabSynthError::invalid_field(
                        field,
                        format!(
                            "uses '{}' in arithmetic but it is a {} column",
                            reference, column.kind
                        ),
                    ));
                }
            }
        }

        match self {
            DerivedRule::Product { factors } if factors.is_empty() => {
                Err(TabSynthError::invalid_field(field, "product needs at least one factor"))
            }
            DerivedRule::Scaled { lo, hi, .. } | DerivedRule::Offset { lo, hi, .. } => {
                check_interval(field, *lo, *hi)?;
                if let DerivedRule::Offset {
                    clamp: Some(clamp), ..
                } = self
                {
                    check_interval(field, clamp.lo, clamp.hi)?;
                }
                check_numeric_kind(field, kind)
            }
            DerivedRule::Ratio { scale, .. } => {
                if !scale.is_finite() {
                    return Err(TabSynthError::invalid_field(field, "ratio scale must be finite"));
                }
                check_numeric_kind(field, kind)
            }
            DerivedRule::Product { .. }
            | DerivedRule::Difference { .. }
            | DerivedRule::Percent { .. } => check_numeric_kind(field, kind),
            DerivedRule::Echo {
                probability,
                otherwise,
                ..
            } => {
                check_probability(field, *probability)?;
                check_options(field, kind, otherwise)
            }
            DerivedRule::Template { pattern } => {
                if pattern.is_empty() {
                    return Err(TabSynthError::invalid_field(field, "template is empty"));
                }
                Ok(())
            }
            DerivedRule::BirthDate { month, day, .. } => {
                if kind != FieldKind::Date {
                    return Err(TabSynthError::invalid_field(
                        field,
                        format!("birth_date produces a date but the field is {}", kind),
                    ));
                }
                if month.is_some_and(|m| !(1..=12).contains(&m)) {
                    return Err(TabSynthError::invalid_field(field, "month must be 1-12"));
                }
                if day.is_some_and(|d| !(1..=28).contains(&d)) {
                    return Err(TabSynthError::invalid_field(field, "day must be 1-28"));
                }
                Ok(())
            }
        }
    }
}

/// Extracts `{name}` placeholders from a template.
pub(crate) fn template_placeholders(pattern: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = pattern;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                names.push(&after[..close]);
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    names
}

fn check_interval(field: &str, lo: f64, hi: f64) -> Result<()> {
    if !lo.is_finite() || !hi.is_finite() {
        return Err(TabSynthError::invalid_field(
            field,
            format!("bounds must be finite, got [{}, {}]", lo, hi),
        ));
    }
    if lo > hi {
        return Err(TabSynthError::invalid_field(
            field,
            format!("inverted bounds: lo {} > hi {}", lo, hi),
        ));
    }
    Ok(())
}

fn check_probability(field: &str, probability: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&probability) {
        return Err(TabSynthError::invalid_field(
            field,
            format!("probability must be between 0.0 and 1.0, got {}", probability),
        ));
    }
    Ok(())
}

fn check_numeric_kind(field: &str, kind: FieldKind) -> Result<()> {
    if !kind.is_numeric() {
        return Err(TabSynthError::invalid_field(
            field,
            format!("numeric source cannot fill a {} column", kind),
        ));
    }
    Ok(())
}

fn check_options(field: &str, kind: FieldKind, options: &[WeightedOption]) -> Result<()> {
    if options.is_empty() {
        return Err(TabSynthError::invalid_field(field, "empty category set"));
    }
    for option in options {
        if !option.weight.is_finite() || option.weight < 0.0 {
            return Err(TabSynthError::invalid_field(
                field,
                format!("weight for '{}' must be finite and >= 0", option.value),
            ));
        }
        kind.coerce(field, option.value.clone())?;
    }
    if options.iter().all(|o| o.weight == 0.0) {
        return Err(TabSynthError::invalid_field(field, "all weights are zero"));
    }
    Ok(())
}

impl FieldSource {
    /// Validates the source for a field of `kind`.
    ///
    /// `visible` holds the columns the source may read: the fields declared
    /// before it during generation, or every column during injection.
    pub fn validate(&self, field: &str, kind: FieldKind, visible: &[Column]) -> Result<()> {
        match self {
            FieldSource::Sequence { .. } => match kind {
                FieldKind::Identifier | FieldKind::Category => Ok(()),
                other => Err(TabSynthError::invalid_field(
                    field,
                    format!("sequence produces text but the field is {}", other),
                )),
            },
            FieldSource::Choice { options } => check_options(field, kind, options),
            FieldSource::UniformInt { lo, hi } => {
                if lo > hi {
                    return Err(TabSynthError::invalid_field(
                        field,
                        format!("inverted bounds: lo {} > hi {}", lo, hi),
                    ));
                }
                check_numeric_kind(field, kind)
            }
            FieldSource::UniformFloat { lo, hi } => {
                check_interval(field, *lo, *hi)?;
                check_numeric_kind(field, kind)
            }
            FieldSource::ClippedNormal {
                mean,
                std_dev,
                lo,
                hi,
            } => {
                check_interval(field, *lo, *hi)?;
                if !mean.is_finite() || !std_dev.is_finite() || *std_dev < 0.0 {
                    return Err(TabSynthError::invalid_field(
                        field,
                        format!(
                            "normal needs a finite mean and std_dev >= 0, got mean {} std_dev {}",
                            mean, std_dev
                        ),
                    ));
                }
                check_numeric_kind(field, kind)
            }
            FieldSource::Bernoulli { probability } => {
                check_probability(field, *probability)?;
                if kind != FieldKind::Flag {
                    return Err(TabSynthError::invalid_field(
                        field,
                        format!("bernoulli produces a flag but the field is {}", kind),
                    ));
                }
                Ok(())
            }
            FieldSource::DateRange { start, end } => {
                if start > end {
                    return Err(TabSynthError::invalid_field(
                        field,
                        format!("start date {} is after end date {}", start, end),
                    ));
                }
                if kind != FieldKind::Date {
                    return Err(TabSynthError::invalid_field(
                        field,
                        format!("date_range produces a date but the field is {}", kind),
                    ));
                }
                Ok(())
            }
            FieldSource::Constant { value } => kind.coerce(field, value.clone()).map(|_| ()),
            FieldSource::ByCategory { field: by, sources } => {
                if visible.iter().all(|c| &c.name != by) {
                    return Err(TabSynthError::invalid_field(
                        field,
                        format!("category field '{}' is not declared before it", by),
                    ));
                }
                if sources.is_empty() {
                    return Err(TabSynthError::invalid_field(field, "empty category set"));
                }
                for source in sources.values() {
                    source.validate(field, kind, visible)?;
                }
                Ok(())
            }
            FieldSource::Derived { rule } => rule.validate(field, kind, visible),
        }
    }

    /// Labels this source can produce, when the set is finite and known.
    pub fn labels(&self) -> Option<Vec<String>> {
        match self {
            FieldSource::Choice { options } => {
                Some(options.iter().map(|o| o.value.to_string()).collect())
            }
            FieldSource::Constant { value } => Some(vec![value.to_string()]),
            _ => None,
        }
    }
}

/// One field of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub source: FieldSource,
}

impl FieldSpec {
    /// Creates a field spec.
    pub fn new(name: impl Into<String>, kind: FieldKind, source: FieldSource) -> Self {
        Self {
            name: name.into(),
            kind,
            source,
        }
    }

    /// The column this field produces.
    pub fn column(&self) -> Column {
        Column::new(self.name.clone(), self.kind)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn amount() -> FieldKind {
        FieldKind::Amount { decimals: 2 }
    }

    fn visible() -> Vec<Column> {
        vec![
            Column::new("property_type", FieldKind::Category),
            Column::new("listed_price", amount()),
        ]
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let source = FieldSource::UniformFloat { lo: 10.0, hi: 5.0 };
        let error = source.validate("price", amount(), &[]).unwrap_err();
        assert!(error.to_string().contains("inverted bounds"));

        let source = FieldSource::UniformInt { lo: 3, hi: 1 };
        assert!(source.validate("days", FieldKind::Integer, &[]).is_err());
    }

    #[test]
    fn test_empty_choice_rejected() {
        let source = FieldSource::Choice { options: vec![] };
        let error = source.validate("city", FieldKind::Category, &[]).unwrap_err();
        assert!(error.to_string().contains("empty category set"));
    }

    #[test]
    fn test_zero_weights_rejected() {
        let source = FieldSource::Choice {
            options: vec![WeightedOption::new("a", 0.0), WeightedOption::new("b", 0.0)],
        };
        assert!(source.validate("x", FieldKind::Category, &[]).is_err());

        let source = FieldSource::Choice {
            options: vec![WeightedOption::new("a", -1.0)],
        };
        assert!(source.validate("x", FieldKind::Category, &[]).is_err());
    }

    #[test]
    fn test_choice_values_must_fit_kind() {
        let source = FieldSource::Choice {
            options: WeightedOption::uniform(["one", "two"]),
        };
        assert!(source.validate("count", FieldKind::Integer, &[]).is_err());
    }

    #[test]
    fn test_negative_std_dev_rejected() {
        let source = FieldSource::ClippedNormal {
            mean: 10.0,
            std_dev: -1.0,
            lo: 0.0,
            hi: 40.0,
        };
        assert!(source.validate("hours", amount(), &[]).is_err());
    }

    #[test]
    fn test_probability_range() {
        let source = FieldSource::Bernoulli { probability: 1.5 };
        assert!(source.validate("flag", FieldKind::Flag, &[]).is_err());
        let source = FieldSource::Bernoulli { probability: 0.3 };
        assert!(source.validate("flag", FieldKind::Flag, &[]).is_ok());
    }

    #[test]
    fn test_derived_forward_reference_rejected() {
        let source = FieldSource::Derived {
            rule: DerivedRule::Scaled {
                base: "appraised_value".to_string(),
                lo: 0.3,
                hi: 0.5,
            },
        };
        let error = source.validate("sold_price", amount(), &visible()).unwrap_err();
        assert!(error.to_string().contains("appraised_value"));
    }

    #[test]
    fn test_derived_arithmetic_on_label_rejected() {
        let rule = DerivedRule::Scaled {
            base: "property_type".to_string(),
            lo: 0.85,
            hi: 1.0,
        };
        let error = rule.validate("sold_price", amount(), &visible()).unwrap_err();
        assert!(error.to_string().contains("arithmetic"));
    }

    #[test]
    fn test_by_category_requires_earlier_field() {
        let source = FieldSource::ByCategory {
            field: "segment".to_string(),
            sources: BTreeMap::from([(
                "A".to_string(),
                FieldSource::UniformFloat { lo: 1.0, hi: 2.0 },
            )]),
        };
        assert!(source.validate("price", amount(), &visible()).is_err());
    }

    #[test]
    fn test_template_placeholders() {
        assert_eq!(
            template_placeholders("{order_id}@customers.example"),
            vec!["order_id"]
        );
        assert_eq!(template_placeholders("{a} and {b}"), vec!["a", "b"]);
        assert!(template_placeholders("no placeholders").is_empty());
    }

    #[test]
    fn test_deterministic_rules() {
        assert!(
            DerivedRule::Product {
                factors: vec!["a".to_string()]
            }
            .is_deterministic()
        );
        assert!(
            !DerivedRule::Scaled {
                base: "a".to_string(),
                lo: 0.0,
                hi: 1.0
            }
            .is_deterministic()
        );
    }

    #[test]
    fn test_field_source_json() {
        let json = r#"{
            "type": "by_category",
            "field": "property_type",
            "sources": {
                "Condo": {"type": "uniform_float", "lo": 2000000, "hi": 8000000}
            }
        }"#;
        let source: FieldSource = serde_json::from_str(json).unwrap();
        assert!(matches!(source, FieldSource::ByCategory { ref sources, .. } if sources.len() == 1));
    }
}
