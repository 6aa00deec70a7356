//! Base population generator.
//!
//! Records are produced field by field in declaration order, each value
//! drawn from its [`FieldSource`] and coerced through the column kind. All
//! randomness comes from the caller's RNG, so a seeded `StdRng` makes the
//! whole dataset reproducible.

use chrono::{Datelike, Days, NaiveDate};
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand_distr::Normal;
use tracing::{debug, info};

use crate::config::{DatasetConfig, DerivedRule, FieldSource, WeightedOption};
use crate::error::{Result, TabSynthError};
use crate::models::{Column, Dataset, Record, Value};

/// Generates datasets from a validated configuration.
#[derive(Debug, Clone)]
pub struct Generator<'a> {
    config: &'a DatasetConfig,
    columns: Vec<Column>,
}

impl<'a> Generator<'a> {
    /// Creates a generator after validating the configuration.
    ///
    /// # Errors
    /// Returns the configuration error of [`DatasetConfig::validate`].
    pub fn new(config: &'a DatasetConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            columns: config.columns(),
        })
    }

    /// Columns of the generated datasets.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Generates `records` records.
    ///
    /// # Errors
    /// Returns a configuration error for a zero count and a value error if a
    /// derived value cannot be computed, for example a ratio over zero.
    pub fn generate<R: Rng + ?Sized>(&self, records: usize, rng: &mut R) -> Result<Dataset> {
        if records == 0 {
            return Err(TabSynthError::configuration(
                "record count must be greater than zero",
            ));
        }

        debug!(
            "Generating '{}' with {} fields",
            self.config.name,
            self.columns.len()
        );
        let mut dataset = Dataset::new(self.config.name.clone(), self.columns.clone());
        for row in 0..records {
            let mut record = Record::new();
            for spec in &self.config.fields {
                let raw = sample_source(&spec.source, &spec.name, row, &record, rng)?;
                let value = spec.kind.coerce(&spec.name, raw)?;
                record.set(spec.name.clone(), value);
            }
            dataset.push(record)?;
        }

        info!(
            "Generated {} records for '{}' ({} fields)",
            dataset.len(),
            dataset.name(),
            self.columns.len()
        );
        Ok(dataset)
    }
}

/// Draws one raw value from a source.
///
/// `record` holds the values already set for the current row; `row` feeds
/// sequence identifiers.
pub(crate) fn sample_source<R: Rng + ?Sized>(
    source: &FieldSource,
    field: &str,
    row: usize,
    record: &Record,
    rng: &mut R,
) -> Result<Value> {
    match source {
        FieldSource::Sequence {
            prefix,
            width,
            start,
        } => {
            let number = start.saturating_add(row as u64);
            Ok(Value::Text(format!("{}{:0width$}", prefix, number, width = *width)))
        }
        FieldSource::Choice { options } => choose(options, field, rng),
        FieldSource::UniformInt { lo, hi } => Ok(Value::Integer(rng.random_range(*lo..=*hi))),
        FieldSource::UniformFloat { lo, hi } => Ok(Value::Amount(rng.random_range(*lo..=*hi))),
        FieldSource::ClippedNormal {
            mean,
            std_dev,
            lo,
            hi,
        } => {
            let normal = Normal::new(*mean, *std_dev)
                .map_err(|e| TabSynthError::invalid_field(field, e))?;
            Ok(Value::Amount(normal.sample(rng).clamp(*lo, *hi)))
        }
        FieldSource::Bernoulli { probability } => Ok(Value::Flag(rng.random_bool(*probability))),
        FieldSource::DateRange { start, end } => {
            let span = (*end - *start).num_days().unsigned_abs();
            let offset = rng.random_range(0..=span);
            start
                .checked_add_days(Days::new(offset))
                .map(Value::Date)
                .ok_or_else(|| TabSynthError::invalid_field(field, "date out of range"))
        }
        FieldSource::Constant { value } => Ok(value.clone()),
        FieldSource::ByCategory {
            field: category,
            sources,
        } => {
            let label = record
                .get(category)
                .map(ToString::to_string)
                .ok_or_else(|| {
                    TabSynthError::invalid_field(field, format!("'{}' has no value", category))
                })?;
            let inner = sources.get(&label).ok_or_else(|| {
                TabSynthError::invalid_field(
                    field,
                    format!("by_category has no source for '{}' = '{}'", category, label),
                )
            })?;
            sample_source(inner, field, row, record, rng)
        }
        FieldSource::Derived { rule } => evaluate_rule(rule, field, record, rng),
    }
}

/// Weighted choice over options.
fn choose<R: Rng + ?Sized>(options: &[WeightedOption], field: &str, rng: &mut R) -> Result<Value> {
    let index = WeightedIndex::new(options.iter().map(|o| o.weight))
        .map_err(|e| TabSynthError::invalid_field(field, e))?;
    options
        .get(index.sample(rng))
        .map(|o| o.value.clone())
        .ok_or_else(|| TabSynthError::invalid_field(field, "empty category set"))
}

/// Evaluates a derived rule over the current record.
pub(crate) fn evaluate_rule<R: Rng + ?Sized>(
    rule: &DerivedRule,
    field: &str,
    record: &Record,
    rng: &mut R,
) -> Result<Value> {
    if let Some(value) = evaluate_deterministic(rule, field, record)? {
        return Ok(value);
    }

    match rule {
        DerivedRule::Scaled { base, lo, hi } => {
            let base = record.number(base)?;
            Ok(Value::Amount(base * rng.random_range(*lo..=*hi)))
        }
        DerivedRule::Offset {
            base,
            lo,
            hi,
            clamp,
        } => {
            let mut value = record.number(base)? + rng.random_range(*lo..=*hi);
            if let Some(clamp) = clamp {
                value = value.clamp(clamp.lo, clamp.hi);
            }
            Ok(Value::Amount(value))
        }
        DerivedRule::Echo {
            field: source,
            probability,
            otherwise,
        } => {
            if rng.random_bool(*probability) {
                record.get(source).cloned().ok_or_else(|| {
                    TabSynthError::invalid_field(field, format!("'{}' has no value", source))
                })
            } else {
                choose(otherwise, field, rng)
            }
        }
        DerivedRule::BirthDate {
            age_field,
            reference_year,
            month,
            day,
        } => {
            let year = birth_year(*reference_year, record.number(age_field)?, field)?;
            let month = match month {
                Some(m) => *m,
                None => rng.random_range(1..=12),
            };
            let day = match day {
                Some(d) => *d,
                None => rng.random_range(1..=28),
            };
            birth_date(year, month, day, field).map(Value::Date)
        }
        // Deterministic rules returned above
        DerivedRule::Product { .. }
        | DerivedRule::Difference { .. }
        | DerivedRule::Percent { .. }
        | DerivedRule::Ratio { .. }
        | DerivedRule::Template { .. } => Err(TabSynthError::invalid_field(
            field,
            "deterministic rule produced no value",
        )),
    }
}

/// Recomputes a rule that draws no randomness.
///
/// Returns `Ok(None)` for rules that need an RNG.
pub(crate) fn evaluate_deterministic(
    rule: &DerivedRule,
    field: &str,
    record: &Record,
) -> Result<Option<Value>> {
    let value = match rule {
        DerivedRule::Product { factors } => {
            let mut product = 1.0;
            for factor in factors {
                product *= record.number(factor)?;
            }
            Value::Amount(product)
        }
        DerivedRule::Difference {
            minuend,
            subtrahend,
        } => Value::Amount(record.number(minuend)? - record.number(subtrahend)?),
        DerivedRule::Percent { base, rate } => {
            Value::Amount(record.number(base)? * record.number(rate)? / 100.0)
        }
        DerivedRule::Ratio {
            numerator,
            denominator,
            scale,
        } => {
            let denominator_value = record.number(denominator)?;
            if denominator_value == 0.0 {
                return Err(TabSynthError::invalid_field(
                    field,
                    format!("ratio denominator '{}' is zero", denominator),
                ));
            }
            Value::Amount(record.number(numerator)? / denominator_value * scale)
        }
        DerivedRule::Template { pattern } => Value::Text(render_template(pattern, field, record)?),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn render_template(pattern: &str, field: &str, record: &Record) -> Result<String> {
    let mut rendered = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            rendered.push_str(&rest[open..]);
            return Ok(rendered);
        };
        let name = &after[..close];
        let value = record.get(name).ok_or_else(|| {
            TabSynthError::invalid_field(field, format!("template field '{}' has no value", name))
        })?;
        rendered.push_str(&value.to_string());
        rest = &after[close + 1..];
    }
    rendered.push_str(rest);
    Ok(rendered)
}

/// Year of birth for a whole-year `age` at `reference_year`.
fn birth_year(reference_year: i32, age: f64, field: &str) -> Result<i32> {
    let age = age.round();
    if !age.is_finite() || age < f64::from(i32::MIN) || age > f64::from(i32::MAX) {
        return Err(TabSynthError::invalid_field(
            field,
            format!("age {} is out of range", age),
        ));
    }
    reference_year.checked_sub(age as i32).ok_or_else(|| {
        TabSynthError::invalid_field(
            field,
            format!("age {} is too large for reference year {}", age, reference_year),
        )
    })
}

fn birth_date(year: i32, month: u32, day: u32, field: &str) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        TabSynthError::invalid_field(
            field,
            format!("invalid birth date {}-{:02}-{:02}", year, month, day),
        )
    })
}

/// Age implied by a birth date relative to a reference year.
pub(crate) fn age_at(reference_year: i32, date: NaiveDate) -> i32 {
    reference_year.saturating_sub(date.year())
}
