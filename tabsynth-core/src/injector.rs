//! Anomaly injector.
//!
//! Selects target rows, assigns each one exactly one anomaly kind, runs the
//! kind's mutation steps on the record and reports what it changed as a
//! [`GroundTruth`]. Fields a kind does not name are never touched. Exact
//! copies of the last rows can then be appended and are marked as
//! `duplicate_row`.

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::seq::SliceRandom;
use rand::seq::index::sample;
use tracing::{debug, info};

use crate::config::anomaly::DUPLICATE_ROW_KIND;
use crate::config::dataset::{check_duplicate_tail_fits, check_selection_fits};
use crate::config::{AnomalyConfig, AnomalyKind, KindAssignment, Mutation, TargetSelection};
use crate::error::{Result, TabSynthError};
use crate::generator::{evaluate_rule, sample_source};
use crate::models::{AnomalyMark, Dataset, GroundTruth, Record, Value};

/// Applies an anomaly configuration to datasets.
#[derive(Debug, Clone)]
pub struct Injector<'a> {
    config: &'a AnomalyConfig,
}

impl<'a> Injector<'a> {
    /// Creates an injector after validating the configuration.
    pub fn new(config: &'a AnomalyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Mutates the selected rows of `dataset` and appends any duplicated
    /// tail rows.
    ///
    /// # Errors
    /// Returns an injection error if the dataset was already injected, the
    /// selection does not fit or a step cannot be applied, and a
    /// configuration error if a step names a field the dataset does not
    /// have. The dataset is left untouched on every error.
    pub fn inject<R: Rng + ?Sized>(
        &self,
        dataset: &mut Dataset,
        rng: &mut R,
    ) -> Result<GroundTruth> {
        if dataset.is_injected() {
            return Err(TabSynthError::injection(format!(
                "dataset '{}' already has injected anomalies",
                dataset.name()
            )));
        }
        check_selection_fits(&self.config.selection, dataset.len())?;
        check_duplicate_tail_fits(self.config.duplicate_tail, dataset.len())?;
        self.config.validate_steps(dataset.columns())?;

        let rows = select_rows(&self.config.selection, dataset.len(), rng);
        let kinds = self.assign_kinds(rows.len(), rng)?;

        let mut staged = dataset.clone();
        let mut truth = GroundTruth::new(staged.name(), staged.len());
        let id_column = staged.identifier_column().map(str::to_string);
        let record_id = |dataset: &Dataset, row: usize| {
            id_column
                .as_deref()
                .and_then(|c| dataset.record(row).and_then(|r| r.get(c)))
                .map(ToString::to_string)
        };

        for (row, kind_name) in rows.into_iter().zip(kinds) {
            let kind = self.config.kinds.get(&kind_name).ok_or_else(|| {
                TabSynthError::injection(format!("unknown anomaly kind '{}'", kind_name))
            })?;
            apply_kind(&mut staged, row, &kind_name, kind, rng)?;
            truth.anomalies.push(AnomalyMark {
                row,
                record_id: record_id(&staged, row),
                kind: kind_name,
                fields: kind.touched_fields(),
            });
        }

        let all_fields: Vec<String> = staged.columns().iter().map(|c| c.name.clone()).collect();
        let original_len = staged.len();
        for source_row in original_len - self.config.duplicate_tail..original_len {
            let copy = staged.record(source_row).cloned().ok_or_else(|| {
                TabSynthError::injection(format!("row {} does not exist", source_row))
            })?;
            staged.push(copy)?;
            let row = staged.len() - 1;
            truth.anomalies.push(AnomalyMark {
                row,
                record_id: record_id(&staged, row),
                kind: DUPLICATE_ROW_KIND.to_string(),
                fields: all_fields.clone(),
            });
        }
        truth.record_count = staged.len();

        staged.mark_injected();
        *dataset = staged;
        info!(
            "Injected {} anomalies into '{}' ({:?})",
            truth.len(),
            dataset.name(),
            truth.counts_by_kind()
        );
        Ok(truth)
    }

    /// Assigns one kind name per selected row.
    fn assign_kinds<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Result<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        match &self.config.assignment {
            KindAssignment::Weighted => {
                let names: Vec<&str> = self.config.kinds.names().collect();
                let weights = self.config.kinds.iter().map(|(_, kind)| kind.weight);
                let index = WeightedIndex::new(weights)
                    .map_err(|e| TabSynthError::injection(format!("invalid kind weights: {}", e)))?;
                Ok((0..count)
                    .filter_map(|_| names.get(index.sample(rng)).map(|n| (*n).to_string()))
                    .collect())
            }
            KindAssignment::Quotas { counts } => {
                let mut kinds: Vec<String> = counts
                    .iter()
                    .flat_map(|(name, n)| std::iter::repeat_n(name.clone(), *n))
                    .collect();
                if kinds.len() != count {
                    return Err(TabSynthError::injection(format!(
                        "anomaly quotas sum to {} but {} rows are selected",
                        kinds.len(),
                        count
                    )));
                }
                kinds.shuffle(rng);
                Ok(kinds)
            }
        }
    }
}

/// Chooses target rows, sorted ascending and distinct.
fn select_rows<R: Rng + ?Sized>(selection: &TargetSelection, len: usize, rng: &mut R) -> Vec<usize> {
    match *selection {
        TargetSelection::Tail { count } => (len - count..len).collect(),
        TargetSelection::Range { start, end } => (start..end).collect(),
        TargetSelection::Random { count } => {
            let mut rows = sample(rng, len, count).into_vec();
            rows.sort_unstable();
            rows
        }
    }
}

/// Runs every step of a kind on one row.
fn apply_kind<R: Rng + ?Sized>(
    dataset: &mut Dataset,
    row: usize,
    kind_name: &str,
    kind: &AnomalyKind,
    rng: &mut R,
) -> Result<()> {
    for step in &kind.steps {
        let updates = compute_step(dataset, row, step, rng)?;
        let record = dataset
            .record_mut(row)
            .ok_or_else(|| TabSynthError::injection(format!("row {} does not exist", row)))?;
        for (field, value) in updates {
            record.set(field, value);
        }
    }
    debug!("Row {} mutated by '{}'", row, kind_name);
    Ok(())
}

/// Computes the coerced values one step writes.
fn compute_step<R: Rng + ?Sized>(
    dataset: &Dataset,
    row: usize,
    step: &Mutation,
    rng: &mut R,
) -> Result<Vec<(String, Value)>> {
    let record = dataset
        .record(row)
        .ok_or_else(|| TabSynthError::injection(format!("row {} does not exist", row)))?;
    let coerce = |field: &str, raw: Value| -> Result<(String, Value)> {
        let column = dataset.column(field).ok_or_else(|| {
            TabSynthError::injection(format!("field '{}' does not exist", field))
        })?;
        Ok((field.to_string(), column.kind.coerce(field, raw)?))
    };

    match step {
        Mutation::Sample { field, source } => {
            let raw = sample_source(source, field, row, record, rng)?;
            Ok(vec![coerce(field, raw)?])
        }
        Mutation::Derive { field, rule } => {
            let raw = evaluate_rule(rule, field, record, rng)?;
            Ok(vec![coerce(field, raw)?])
        }
        Mutation::Set { field, value } => Ok(vec![coerce(field, value.clone())?]),
        Mutation::Clear { field } => Ok(vec![coerce(field, Value::Null)?]),
        Mutation::Recase { field, case } => Ok(record
            .get(field)
            .and_then(Value::as_text)
            .map(|text| (field.clone(), Value::Text(case.apply(text))))
            .into_iter()
            .collect()),
        Mutation::CopyFrom { fields, start, end } => {
            let source_row = pick_source_row(row, *start, (*end).min(dataset.len()), rng)?;
            let source: &Record = dataset.record(source_row).ok_or_else(|| {
                TabSynthError::injection(format!("source row {} does not exist", source_row))
            })?;
            fields
                .iter()
                .map(|field| {
                    let value = source.get(field).cloned().ok_or_else(|| {
                        TabSynthError::injection(format!(
                            "source row {} has no field '{}'",
                            source_row, field
                        ))
                    })?;
                    Ok((field.clone(), value))
                })
                .collect()
        }
    }
}

/// Picks a row in `[start, end)` other than `row`.
fn pick_source_row<R: Rng + ?Sized>(
    row: usize,
    start: usize,
    end: usize,
    rng: &mut R,
) -> Result<usize> {
    let includes_row = (start..end).contains(&row);
    let choices = end.saturating_sub(start) - usize::from(includes_row);
    if choices == 0 {
        return Err(TabSynthError::injection(format!(
            "no source row other than {} in [{}, {})",
            row, start, end
        )));
    }
    let mut source = start + rng.random_range(0..choices);
    if includes_row && source >= row {
        source += 1;
    }
    Ok(source)
}
