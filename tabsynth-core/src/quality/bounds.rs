//! Declared bounds of "normal" records.
//!
//! Bounds are derived from the field sources of a configuration, so a clean
//! record satisfies every one of them up to the rounding of its column kind.
//! Anomaly kinds are built to break at least one bound, which is what
//! [`verify_ground_truth`] checks.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::models::{BoundViolation, VerificationReport};
use crate::config::{DatasetConfig, DerivedRule, FieldSource};
use crate::error::{Result, TabSynthError};
use crate::generator::{age_at, evaluate_deterministic};
use crate::models::{Column, Dataset, FieldKind, GroundTruth, Record, Value};

/// Slack added to every numeric comparison to absorb float error.
const EPSILON: f64 = 1e-6;

/// A constraint every clean record satisfies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum BoundRule {
    /// `field` within `[lo, hi]`
    Range {
        field: String,
        lo: f64,
        hi: f64,
        #[serde(default)]
        tolerance: f64,
    },
    /// `field` equal to one of `values`
    OneOf { field: String, values: Vec<Value> },
    /// Date `field` within `[start, end]`
    DateRange {
        field: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    /// `field` within `base * [lo, hi]`
    Ratio {
        field: String,
        base: String,
        lo: f64,
        hi: f64,
        #[serde(default)]
        tolerance: f64,
    },
    /// `minuend - subtrahend` within `[lo, hi]`
    Difference {
        minuend: String,
        subtrahend: String,
        lo: f64,
        hi: f64,
        #[serde(default)]
        tolerance: f64,
    },
    /// `field` equals what a deterministic rule recomputes
    Matches {
        field: String,
        rule: DerivedRule,
        #[serde(default)]
        tolerance: f64,
    },
    /// Year of date `field` equals `reference_year - age_field`
    BirthYear {
        field: String,
        age_field: String,
        reference_year: i32,
    },
    /// No two rows share the same values of `fields`
    Unique { fields: Vec<String> },
    /// None of `fields` is empty
    NotNull { fields: Vec<String> },
    /// `rule` applies only to rows where `category` equals `label`
    When {
        category: String,
        label: String,
        rule: Box<BoundRule>,
    },
}

impl BoundRule {
    /// Fields the rule reads.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            BoundRule::Range { field, .. }
            | BoundRule::OneOf { field, .. }
            | BoundRule::DateRange { field, .. } => vec![field.as_str()],
            BoundRule::Ratio { field, base, .. } => vec![field.as_str(), base.as_str()],
            BoundRule::Difference {
                minuend,
                subtrahend,
                ..
            } => vec![minuend.as_str(), subtrahend.as_str()],
            BoundRule::Matches { field, rule, .. } => {
                let mut fields = vec![field.as_str()];
                fields.extend(rule.references());
                fields
            }
            BoundRule::BirthYear {
                field, age_field, ..
            } => vec![field.as_str(), age_field.as_str()],
            BoundRule::Unique { fields } | BoundRule::NotNull { fields } => {
                fields.iter().map(String::as_str).collect()
            }
            BoundRule::When { category, rule, .. } => {
                let mut fields = vec![category.as_str()];
                fields.extend(rule.fields());
                fields
            }
        }
    }

    /// Validates the rule against the dataset columns.
    pub fn validate(&self, columns: &[Column]) -> Result<()> {
        for field in self.fields() {
            if columns.iter().all(|c| c.name != field) {
                return Err(TabSynthError::configuration(format!(
                    "bound '{}' references unknown field '{}'",
                    self, field
                )));
            }
        }
        match self {
            BoundRule::Range { lo, hi, tolerance, .. }
            | BoundRule::Ratio { lo, hi, tolerance, .. }
            | BoundRule::Difference { lo, hi, tolerance, .. } => {
                if !lo.is_finite() || !hi.is_finite() || !tolerance.is_finite() {
                    return Err(TabSynthError::configuration(format!(
                        "bound '{}' has a non-finite limit or tolerance",
                        self
                    )));
                }
                if lo > hi || *tolerance < 0.0 {
                    return Err(TabSynthError::configuration(format!(
                        "bound '{}' has inverted limits or a negative tolerance",
                        self
                    )));
                }
                Ok(())
            }
            BoundRule::Matches { rule, .. } if !rule.is_deterministic() => {
                Err(TabSynthError::configuration(format!(
                    "bound '{}' needs a deterministic rule",
                    self
                )))
            }
            BoundRule::Unique { fields } if fields.is_empty() => Err(
                TabSynthError::configuration("unique bound needs at least one field"),
            ),
            BoundRule::NotNull { fields } if fields.is_empty() => Err(
                TabSynthError::configuration("not_null bound needs at least one field"),
            ),
            BoundRule::When { rule, .. } => rule.validate(columns),
            _ => Ok(()),
        }
    }

    /// Checks one record, returning what is wrong with it.
    ///
    /// Uniqueness spans rows and is checked by [`check_dataset`] instead.
    pub fn check(&self, record: &Record) -> Option<String> {
        match self.check_inner(record) {
            Ok(outcome) => outcome,
            Err(e) => Some(e.to_string()),
        }
    }

    fn check_inner(&self, record: &Record) -> Result<Option<String>> {
        let outcome = match self {
            BoundRule::Range {
                field,
                lo,
                hi,
                tolerance,
            } => {
                let value = record.number(field)?;
                outside(value, *lo, *hi, *tolerance).then(|| format!("{} = {}", field, value))
            }
            BoundRule::OneOf { field, values } => {
                let value = present(record, field)?;
                (!values.iter().any(|v| same_value(v, value)))
                    .then(|| format!("{} = '{}'", field, value))
            }
            BoundRule::DateRange { field, start, end } => {
                let value = present(record, field)?;
                let date = date_of(field, value)?;
                (date < *start || date > *end).then(|| format!("{} = {}", field, value))
            }
            BoundRule::Ratio {
                field,
                base,
                lo,
                hi,
                tolerance,
            } => {
                let value = record.number(field)?;
                let base_value = record.number(base)?;
                let a = base_value * lo;
                let b = base_value * hi;
                outside(value, a.min(b), a.max(b), *tolerance).then(|| {
                    let ratio = if base_value == 0.0 {
                        f64::NAN
                    } else {
                        value / base_value
                    };
                    format!("{} / {} = {:.4}", field, base, ratio)
                })
            }
            BoundRule::Difference {
                minuend,
                subtrahend,
                lo,
                hi,
                tolerance,
            } => {
                let difference = record.number(minuend)? - record.number(subtrahend)?;
                outside(difference, *lo, *hi, *tolerance)
                    .then(|| format!("{} - {} = {:.4}", minuend, subtrahend, difference))
            }
            BoundRule::Matches {
                field,
                rule,
                tolerance,
            } => {
                let stored = present(record, field)?;
                match evaluate_deterministic(rule, field, record)? {
                    Some(expected) => {
                        let agrees = match (stored.as_f64(), expected.as_f64()) {
                            (Some(s), Some(e)) => (s - e).abs() <= tolerance + EPSILON,
                            _ => stored.to_string() == expected.to_string(),
                        };
                        (!agrees).then(|| format!("{} = {}, expected {}", field, stored, expected))
                    }
                    None => None,
                }
            }
            BoundRule::BirthYear {
                field,
                age_field,
                reference_year,
            } => {
                let date = date_of(field, present(record, field)?)?;
                let age = record.number(age_field)?.round() as i32;
                let implied = age_at(*reference_year, date);
                (implied != age).then(|| {
                    format!(
                        "{} = {} implies age {}, {} = {}",
                        field, date, implied, age_field, age
                    )
                })
            }
            BoundRule::Unique { .. } => None,
            BoundRule::NotNull { fields } => {
                let mut empty = Vec::new();
                for field in fields {
                    if present(record, field)?.is_null() {
                        empty.push(field.as_str());
                    }
                }
                (!empty.is_empty()).then(|| format!("{} empty", empty.join(", ")))
            }
            BoundRule::When {
                category,
                label,
                rule,
            } => {
                let applies = record
                    .get(category)
                    .is_some_and(|value| value.to_string() == *label);
                if applies { rule.check(record) } else { None }
            }
        };
        Ok(outcome)
    }

    fn unique_fields(&self) -> Option<&[String]> {
        match self {
            BoundRule::Unique { fields } => Some(fields),
            _ => None,
        }
    }
}

impl fmt::Display for BoundRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundRule::Range { field, lo, hi, .. } => write!(f, "{} in [{}, {}]", field, lo, hi),
            BoundRule::OneOf { field, values } => {
                let values: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{} in {{{}}}", field, values.join(", "))
            }
            BoundRule::DateRange { field, start, end } => {
                write!(f, "{} in [{}, {}]", field, start, end)
            }
            BoundRule::Ratio {
                field, base, lo, hi, ..
            } => write!(f, "{} / {} in [{}, {}]", field, base, lo, hi),
            BoundRule::Difference {
                minuend,
                subtrahend,
                lo,
                hi,
                ..
            } => write!(f, "{} - {} in [{}, {}]", minuend, subtrahend, lo, hi),
            BoundRule::Matches { field, .. } => write!(f, "{} matches its derivation", field),
            BoundRule::BirthYear {
                field,
                age_field,
                reference_year,
            } => write!(f, "year({}) = {} - {}", field, reference_year, age_field),
            BoundRule::Unique { fields } => write!(f, "unique({})", fields.join(", ")),
            BoundRule::NotNull { fields } => write!(f, "not_null({})", fields.join(", ")),
            BoundRule::When {
                category,
                label,
                rule,
            } => write!(f, "{} when {} = '{}'", rule, category, label),
        }
    }
}

fn outside(value: f64, lo: f64, hi: f64, tolerance: f64) -> bool {
    let slack = tolerance + EPSILON;
    !(value >= lo - slack && value <= hi + slack)
}

fn present<'r>(record: &'r Record, field: &str) -> Result<&'r Value> {
    record
        .get(field)
        .ok_or_else(|| TabSynthError::value(format!("field '{}' is missing", field)))
}

fn date_of(field: &str, value: &Value) -> Result<NaiveDate> {
    match value {
        Value::Date(d) => Ok(*d),
        other => FieldKind::Date
            .coerce(field, other.clone())?
            .as_date()
            .ok_or_else(|| TabSynthError::value(format!("field '{}' is not a date", field))),
    }
}

fn same_value(expected: &Value, actual: &Value) -> bool {
    match (expected.as_f64(), actual.as_f64()) {
        (Some(e), Some(a)) => (e - a).abs() <= EPSILON,
        _ => expected.to_string() == actual.to_string(),
    }
}

/// Derives the bounds implied by a configuration's field sources, followed
/// by the configuration's explicit bounds.
///
/// Besides one bound per source, every field that is not a constant null
/// must be present, and whole rows must be unique when the configuration
/// appends duplicated rows.
pub fn declared_bounds(config: &DatasetConfig) -> Vec<BoundRule> {
    let mut bounds = Vec::new();
    for spec in &config.fields {
        bounds.extend(bounds_for_source(&spec.name, spec.kind, &spec.source, config));
    }

    let required: Vec<String> = config
        .fields
        .iter()
        .filter(|spec| {
            !matches!(&spec.source, FieldSource::Constant { value } if value.is_null())
        })
        .map(|spec| spec.name.clone())
        .collect();
    if !required.is_empty() {
        bounds.push(BoundRule::NotNull { fields: required });
    }
    if config
        .anomalies
        .as_ref()
        .is_some_and(|anomalies| anomalies.duplicate_tail > 0)
    {
        bounds.push(BoundRule::Unique {
            fields: config.fields.iter().map(|spec| spec.name.clone()).collect(),
        });
    }

    bounds.extend(config.bounds.iter().cloned());
    debug!("Derived {} bounds for '{}'", bounds.len(), config.name);
    bounds
}

fn coerced_values<'v>(
    field: &str,
    kind: FieldKind,
    values: impl IntoIterator<Item = &'v Value>,
) -> Vec<Value> {
    values
        .into_iter()
        .filter_map(|v| kind.coerce(field, v.clone()).ok())
        .collect()
}

fn bounds_for_source(
    field: &str,
    kind: FieldKind,
    source: &FieldSource,
    config: &DatasetConfig,
) -> Vec<BoundRule> {
    let tolerance = kind.tolerance();
    let rule = match source {
        FieldSource::Sequence { .. } => BoundRule::Unique {
            fields: vec![field.to_string()],
        },
        FieldSource::Choice { options } => BoundRule::OneOf {
            field: field.to_string(),
            values: coerced_values(field, kind, options.iter().map(|o| &o.value)),
        },
        FieldSource::Constant { value } => BoundRule::OneOf {
            field: field.to_string(),
            values: coerced_values(field, kind, [value]),
        },
        FieldSource::UniformInt { lo, hi } => BoundRule::Range {
            field: field.to_string(),
            lo: *lo as f64,
            hi: *hi as f64,
            tolerance,
        },
        FieldSource::UniformFloat { lo, hi } | FieldSource::ClippedNormal { lo, hi, .. } => {
            BoundRule::Range {
                field: field.to_string(),
                lo: *lo,
                hi: *hi,
                tolerance,
            }
        }
        FieldSource::DateRange { start, end } => BoundRule::DateRange {
            field: field.to_string(),
            start: *start,
            end: *end,
        },
        FieldSource::Bernoulli { .. } => return Vec::new(),
        FieldSource::ByCategory {
            field: category,
            sources,
        } => {
            return sources
                .iter()
                .flat_map(|(label, inner)| {
                    bounds_for_source(field, kind, inner, config)
                        .into_iter()
                        .map(|rule| BoundRule::When {
                            category: category.clone(),
                            label: label.clone(),
                            rule: Box::new(rule),
                        })
                })
                .collect();
        }
        FieldSource::Derived { rule } => match rule {
            DerivedRule::Scaled { base, lo, hi } => BoundRule::Ratio {
                field: field.to_string(),
                base: base.clone(),
                lo: *lo,
                hi: *hi,
                tolerance,
            },
            DerivedRule::Offset {
                clamp: Some(clamp), ..
            } => BoundRule::Range {
                field: field.to_string(),
                lo: clamp.lo,
                hi: clamp.hi,
                tolerance,
            },
            DerivedRule::Offset {
                base,
                lo,
                hi,
                clamp: None,
            } => BoundRule::Difference {
                minuend: field.to_string(),
                subtrahend: base.clone(),
                lo: *lo,
                hi: *hi,
                tolerance,
            },
            DerivedRule::Echo {
                field: echoed,
                otherwise,
                ..
            } => {
                let Some(echoed_labels) = config
                    .field(echoed)
                    .and_then(|spec| spec.source.labels())
                else {
                    return Vec::new();
                };
                let mut values: Vec<Value> = echoed_labels.into_iter().map(Value::Text).collect();
                values.extend(otherwise.iter().map(|o| o.value.clone()));
                BoundRule::OneOf {
                    field: field.to_string(),
                    values: coerced_values(field, kind, values.iter()),
                }
            }
            DerivedRule::BirthDate {
                age_field,
                reference_year,
                ..
            } => BoundRule::BirthYear {
                field: field.to_string(),
                age_field: age_field.clone(),
                reference_year: *reference_year,
            },
            deterministic => BoundRule::Matches {
                field: field.to_string(),
                rule: deterministic.clone(),
                tolerance,
            },
        },
    };
    vec![rule]
}

/// Checks every record against the rules.
///
/// Returns violations ordered by row. For a `unique` rule the first row
/// holding a key is clean and every later row with the same key violates.
pub fn check_dataset(dataset: &Dataset, rules: &[BoundRule]) -> Vec<BoundViolation> {
    let id_column = dataset.identifier_column();
    let record_id = |record: &Record| {
        id_column
            .and_then(|c| record.get(c))
            .map(ToString::to_string)
    };

    let mut violations = Vec::new();
    let mut first_seen: Vec<BTreeMap<Vec<String>, usize>> = vec![BTreeMap::new(); rules.len()];

    for (row, record) in dataset.records().iter().enumerate() {
        for (index, rule) in rules.iter().enumerate() {
            let detail = match rule.unique_fields() {
                Some(fields) => {
                    let key: Vec<String> = fields
                        .iter()
                        .map(|f| record.get(f).map(ToString::to_string).unwrap_or_default())
                        .collect();
                    match first_seen[index].get(&key) {
                        Some(first) => Some(format!("duplicates row {}", first)),
                        None => {
                            first_seen[index].insert(key, row);
                            None
                        }
                    }
                }
                None => rule.check(record),
            };
            if let Some(detail) = detail {
                violations.push(BoundViolation {
                    row,
                    record_id: record_id(record),
                    rule: rule.to_string(),
                    detail,
                });
            }
        }
    }
    violations
}

/// Compares bound violations with the ground truth of a dataset.
///
/// # Errors
/// Returns a value error if the ground truth was recorded for a different
/// number of records or marks a row the dataset does not have.
pub fn verify_ground_truth(
    dataset: &Dataset,
    truth: &GroundTruth,
    rules: &[BoundRule],
) -> Result<VerificationReport> {
    truth.check_rows(dataset.len())?;

    let violations = check_dataset(dataset, rules);
    let violating: std::collections::BTreeSet<usize> = violations.iter().map(|v| v.row).collect();
    let marked = truth.rows();

    let marked_without_violation: Vec<usize> = marked.difference(&violating).copied().collect();
    let unmarked_with_violation: Vec<usize> = violating.difference(&marked).copied().collect();

    if !marked_without_violation.is_empty() {
        warn!(
            "{} marked rows satisfy every bound: {:?}",
            marked_without_violation.len(),
            marked_without_violation
        );
    }
    if !unmarked_with_violation.is_empty() {
        warn!(
            "{} unmarked rows break a bound: {:?}",
            unmarked_with_violation.len(),
            unmarked_with_violation
        );
    }

    Ok(VerificationReport {
        dataset: dataset.name().to_string(),
        record_count: dataset.len(),
        marked: marked.len(),
        violating: violating.len(),
        marked_without_violation,
        unmarked_with_violation,
        violations,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{AnomalyConfig, FieldSpec, Interval, TargetSelection, WeightedOption};
    use crate::models::AnomalyMark;

    fn amount() -> FieldKind {
        FieldKind::Amount { decimals: 2 }
    }

    fn record(values: &[(&str, Value)]) -> Record {
        let mut record = Record::new();
        for (name, value) in values {
            record.set(*name, value.clone());
        }
        record
    }

    fn sold_ratio() -> BoundRule {
        BoundRule::Ratio {
            field: "sold_price".to_string(),
            base: "listed_price".to_string(),
            lo: 0.85,
            hi: 1.0,
            tolerance: 0.005,
        }
    }

    #[test]
    fn test_ratio_check() {
        let clean = record(&[
            ("listed_price", Value::Amount(1_000_000.0)),
            ("sold_price", Value::Amount(900_000.0)),
        ]);
        assert!(sold_ratio().check(&clean).is_none());

        let flipped = record(&[
            ("listed_price", Value::Amount(1_000_000.0)),
            ("sold_price", Value::Amount(1_600_000.0)),
        ]);
        let detail = sold_ratio().check(&flipped).unwrap();
        assert!(detail.contains("1.6000"), "detail: {}", detail);
    }

    #[test]
    fn test_ratio_tolerance_absorbs_rounding() {
        let rounded = record(&[
            ("listed_price", Value::Amount(100.0)),
            ("sold_price", Value::Amount(100.004)),
        ]);
        assert!(sold_ratio().check(&rounded).is_none());
    }

    #[test]
    fn test_missing_field_is_a_violation() {
        let partial = record(&[("listed_price", Value::Amount(1.0))]);
        let detail = sold_ratio().check(&partial).unwrap();
        assert!(detail.contains("sold_price"));
    }

    #[test]
    fn test_one_of_compares_numbers_and_labels() {
        let rule = BoundRule::OneOf {
            field: "buyer_txn_count".to_string(),
            values: vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)],
        };
        assert!(rule.check(&record(&[("buyer_txn_count", Value::Integer(2))])).is_none());
        assert!(rule.check(&record(&[("buyer_txn_count", Value::Integer(12))])).is_some());

        let rule = BoundRule::OneOf {
            field: "has_guardian".to_string(),
            values: vec![Value::Flag(true)],
        };
        assert!(rule.check(&record(&[("has_guardian", Value::Flag(false))])).is_some());
    }

    #[test]
    fn test_when_applies_only_to_label() {
        let rule = BoundRule::When {
            category: "property_type".to_string(),
            label: "Condo".to_string(),
            rule: Box::new(BoundRule::Range {
                field: "listed_price".to_string(),
                lo: 2_000_000.0,
                hi: 8_000_000.0,
                tolerance: 0.005,
            }),
        };
        let commercial = record(&[
            ("property_type", Value::Text("Commercial".to_string())),
            ("listed_price", Value::Amount(20_000_000.0)),
        ]);
        assert!(rule.check(&commercial).is_none());

        let condo = record(&[
            ("property_type", Value::Text("Condo".to_string())),
            ("listed_price", Value::Amount(20_000_000.0)),
        ]);
        assert!(rule.check(&condo).is_some());
    }

    #[test]
    fn test_birth_year() {
        let rule = BoundRule::BirthYear {
            field: "birthdate".to_string(),
            age_field: "age".to_string(),
            reference_year: 2025,
        };
        let date = NaiveDate::from_ymd_opt(2010, 3, 4).unwrap();
        assert!(
            rule.check(&record(&[("birthdate", Value::Date(date)), ("age", Value::Integer(15))]))
                .is_none()
        );
        assert!(
            rule.check(&record(&[("birthdate", Value::Date(date)), ("age", Value::Integer(30))]))
                .is_some()
        );
    }

    #[test]
    fn test_matches_recomputes_template() {
        let rule = BoundRule::Matches {
            field: "customer_email".to_string(),
            rule: DerivedRule::Template {
                pattern: "{order_id}@customers.example".to_string(),
            },
            tolerance: 0.0,
        };
        let clean = record(&[
            ("order_id", Value::Text("SHOP-00001".to_string())),
            (
                "customer_email",
                Value::Text("SHOP-00001@customers.example".to_string()),
            ),
        ]);
        assert!(rule.check(&clean).is_none());

        let reused = record(&[
            ("order_id", Value::Text("SHOP-00002".to_string())),
            (
                "customer_email",
                Value::Text("suspicious.buyer@fakeemail.com".to_string()),
            ),
        ]);
        assert!(rule.check(&reused).is_some());
    }

    #[test]
    fn test_declared_bounds_from_sources() {
        let config = DatasetConfig::new("grades")
            .with_field(FieldSpec::new(
                "student_id",
                FieldKind::Identifier,
                FieldSource::Sequence {
                    prefix: "STU-".to_string(),
                    width: 4,
                    start: 1,
                },
            ))
            .with_field(FieldSpec::new(
                "avg_grade",
                FieldKind::Amount { decimals: 1 },
                FieldSource::UniformFloat { lo: 65.0, hi: 95.0 },
            ))
            .with_field(FieldSpec::new(
                "final_grade",
                FieldKind::Amount { decimals: 1 },
                FieldSource::Derived {
                    rule: DerivedRule::Offset {
                        base: "avg_grade".to_string(),
                        lo: -5.0,
                        hi: 5.0,
                        clamp: Some(Interval::new(60.0, 100.0)),
                    },
                },
            ))
            .with_field(FieldSpec::new(
                "section",
                FieldKind::Category,
                FieldSource::Choice {
                    options: WeightedOption::uniform(["A", "B"]),
                },
            ))
            .with_field(FieldSpec::new(
                "scholarship",
                FieldKind::Flag,
                FieldSource::Bernoulli { probability: 0.15 },
            ));

        let bounds = declared_bounds(&config);
        assert_eq!(bounds.len(), 5);
        assert!(matches!(&bounds[0], BoundRule::Unique { fields } if fields == &["student_id"]));
        assert!(matches!(&bounds[1], BoundRule::Range { lo, hi, .. } if *lo == 65.0 && *hi == 95.0));
        assert!(matches!(&bounds[2], BoundRule::Range { lo, hi, .. } if *lo == 60.0 && *hi == 100.0));
        assert!(matches!(&bounds[3], BoundRule::OneOf { values, .. } if values.len() == 2));
        assert!(matches!(&bounds[4], BoundRule::NotNull { fields } if fields.len() == 5));

        let config = config
            .with_field(FieldSpec::new(
                "remarks",
                FieldKind::Category,
                FieldSource::Constant { value: Value::Null },
            ))
            .with_anomalies(AnomalyConfig::new(TargetSelection::Tail { count: 0 }).with_duplicate_tail(3));
        let bounds = declared_bounds(&config);
        assert_eq!(bounds.len(), 7);
        assert_eq!(
            bounds[5].to_string(),
            "not_null(student_id, avg_grade, final_grade, section, scholarship)"
        );
        assert!(matches!(&bounds[6], BoundRule::Unique { fields } if fields.len() == 6));
    }

    #[test]
    fn test_not_null_names_empty_fields() {
        let rule = BoundRule::NotNull {
            fields: vec!["calculus".to_string(), "physics".to_string()],
        };
        let full = record(&[("calculus", Value::Integer(80)), ("physics", Value::Integer(90))]);
        assert!(rule.check(&full).is_none());

        let blank = record(&[("calculus", Value::Null), ("physics", Value::Integer(90))]);
        assert_eq!(rule.check(&blank).unwrap(), "calculus empty");

        let partial = record(&[("physics", Value::Integer(90))]);
        assert!(rule.check(&partial).unwrap().contains("calculus"));
    }

    #[test]
    fn test_validate_rejects_non_finite_limits() {
        let columns = vec![Column::new("listed_price", amount())];
        let range = |lo: f64, hi: f64, tolerance: f64| BoundRule::Range {
            field: "listed_price".to_string(),
            lo,
            hi,
            tolerance,
        };
        assert!(range(1.0, 2.0, 0.0).validate(&columns).is_ok());
        for rule in [
            range(f64::NAN, 2.0, 0.0),
            range(1.0, f64::NAN, 0.0),
            range(f64::NEG_INFINITY, 2.0, 0.0),
            range(1.0, 2.0, f64::NAN),
        ] {
            let error = rule.validate(&columns).unwrap_err();
            assert!(error.to_string().contains("non-finite"), "{}", error);
        }
    }

    #[test]
    fn test_check_dataset_unique_reports_later_duplicates() {
        let columns = vec![
            Column::new("student_id", FieldKind::Identifier),
            Column::new("full_name", FieldKind::Category),
        ];
        let mut dataset = Dataset::new("school", columns);
        for (id, name) in [("STU-1", "Ana Cruz"), ("STU-2", "Ben Reyes"), ("STU-3", "Ana Cruz")] {
            dataset
                .push(record(&[
                    ("student_id", Value::Text(id.to_string())),
                    ("full_name", Value::Text(name.to_string())),
                ]))
                .unwrap();
        }
        let rules = vec![BoundRule::Unique {
            fields: vec!["full_name".to_string()],
        }];
        let violations = check_dataset(&dataset, &rules);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].row, 2);
        assert_eq!(violations[0].record_id.as_deref(), Some("STU-3"));
        assert_eq!(violations[0].detail, "duplicates row 0");
    }

    #[test]
    fn test_verify_ground_truth() {
        let columns = vec![
            Column::new("listed_price", amount()),
            Column::new("sold_price", amount()),
        ];
        let mut dataset = Dataset::new("listings", columns);
        for sold in [90.0, 95.0, 200.0, 10.0] {
            dataset
                .push(record(&[
                    ("listed_price", Value::Amount(100.0)),
                    ("sold_price", Value::Amount(sold)),
                ]))
                .unwrap();
        }
        let mut truth = GroundTruth::new("listings", 4);
        for row in [1, 2] {
            truth.anomalies.push(AnomalyMark {
                row,
                record_id: None,
                kind: "price_flip".to_string(),
                fields: vec!["sold_price".to_string()],
            });
        }

        let report = verify_ground_truth(&dataset, &truth, &[sold_ratio()]).unwrap();
        assert_eq!(report.marked, 2);
        assert_eq!(report.violating, 2);
        assert_eq!(report.marked_without_violation, vec![1]);
        assert_eq!(report.unmarked_with_violation, vec![3]);
        assert!(!report.is_consistent());

        let short = GroundTruth::new("listings", 3);
        assert!(verify_ground_truth(&dataset, &short, &[]).is_err());

        let mut stray = GroundTruth::new("listings", 4);
        stray.anomalies.push(AnomalyMark {
            row: 9,
            record_id: None,
            kind: "price_flip".to_string(),
            fields: vec!["sold_price".to_string()],
        });
        let error = verify_ground_truth(&dataset, &stray, &[]).unwrap_err();
        assert!(error.to_string().contains("marks row 9"));
    }

    #[test]
    fn test_validate_unknown_field() {
        let columns = vec![Column::new("listed_price", amount())];
        let error = sold_ratio().validate(&columns).unwrap_err();
        assert!(error.to_string().contains("sold_price"));
    }

    #[test]
    fn test_bound_rule_json() {
        let json = r#"{"check": "difference", "minuend": "final_grade", "subtrahend": "avg_grade", "lo": -5, "hi": 5}"#;
        let rule: BoundRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.to_string(), "final_grade - avg_grade in [-5, 5]");
    }
}
