//! Anomaly injection configuration.
//!
//! An [`AnomalyConfig`] says which rows are targeted ([`TargetSelection`]),
//! how anomaly kinds are spread over them ([`KindAssignment`]) and what each
//! kind does ([`AnomalyCatalog`]). Exact duplicates of the last rows can be
//! appended on top of that.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use super::field::{DerivedRule, FieldSource};
use crate::error::{Result, TabSynthError};
use crate::models::{Column, FieldKind, Value};

/// Ground-truth kind of rows appended as duplicates.
pub const DUPLICATE_ROW_KIND: &str = "duplicate_row";

fn default_weight() -> f64 {
    1.0
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

/// Which rows receive an anomaly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetSelection {
    /// The last `count` rows
    Tail { count: usize },
    /// Rows in the half-open range `[start, end)`
    Range { start: usize, end: usize },
    /// `count` rows sampled without replacement
    Random { count: usize },
}

impl Default for TargetSelection {
    fn default() -> Self {
        TargetSelection::Tail { count: 0 }
    }
}

impl TargetSelection {
    /// Number of rows this selection marks.
    pub fn count(&self) -> usize {
        match self {
            TargetSelection::Tail { count } | TargetSelection::Random { count } => *count,
            TargetSelection::Range { start, end } => end.saturating_sub(*start),
        }
    }
}

/// How anomaly kinds are assigned to the selected rows.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KindAssignment {
    /// Each row draws a kind by catalog weight
    #[default]
    Weighted,
    /// Exact count per kind, shuffled across the selected rows
    Quotas { counts: BTreeMap<String, usize> },
}

/// One step of an anomaly transformation.
///
/// Steps run in order on the same record, so later steps see the values
/// written by earlier ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Redraw a field from a source
    Sample { field: String, source: FieldSource },
    /// Recompute a field through a derived rule
    Derive { field: String, rule: DerivedRule },
    /// Overwrite a field with a fixed value
    Set { field: String, value: Value },
    /// Copy fields from a random row in `[start, end)` other than the target
    CopyFrom {
        fields: Vec<String>,
        start: usize,
        end: usize,
    },
    /// Blank a field
    Clear { field: String },
    /// Rewrite a label in another letter case
    Recase { field: String, case: LetterCase },
}

/// Letter case applied by [`Mutation::Recase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LetterCase {
    Lower,
    Upper,
}

impl LetterCase {
    /// Rewrites `text` in this case.
    pub fn apply(self, text: &str) -> String {
        match self {
            LetterCase::Lower => text.to_lowercase(),
            LetterCase::Upper => text.to_uppercase(),
        }
    }
}

impl Mutation {
    /// Fields this step writes.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Mutation::Sample { field, .. }
            | Mutation::Derive { field, .. }
            | Mutation::Set { field, .. }
            | Mutation::Clear { field }
            | Mutation::Recase { field, .. } => vec![field.as_str()],
            Mutation::CopyFrom { fields, .. } => fields.iter().map(String::as_str).collect(),
        }
    }

    /// Validates the step against the dataset columns.
    pub fn validate(&self, kind_name: &str, columns: &[Column]) -> Result<()> {
        let column_of = |field: &str| {
            columns.iter().find(|c| c.name == field).ok_or_else(|| {
                TabSynthError::configuration(format!(
                    "anomaly kind '{}' writes unknown field '{}'",
                    kind_name, field
                ))
            })
        };

        match self {
            Mutation::Sample { field, source } => {
                let column = column_of(field)?;
                source.validate(field, column.kind, columns)
            }
            Mutation::Derive { field, rule } => {
                let column = column_of(field)?;
                rule.validate(field, column.kind, columns)
            }
            Mutation::Set { field, value } => {
                let column = column_of(field)?;
                column.kind.coerce(field, value.clone()).map(|_| ())
            }
            Mutation::CopyFrom { fields, start, end } => {
                if fields.is_empty() {
                    return Err(TabSynthError::configuration(format!(
                        "anomaly kind '{}' copies no fields",
                        kind_name
                    )));
                }
                for field in fields {
                    column_of(field)?;
                }
                if start >= end {
                    return Err(TabSynthError::configuration(format!(
                        "anomaly kind '{}' copies from empty row range [{}, {})",
                        kind_name, start, end
                    )));
                }
                Ok(())
            }
            Mutation::Clear { field } => column_of(field).map(|_| ()),
            Mutation::Recase { field, .. } => {
                let column = column_of(field)?;
                match column.kind {
                    FieldKind::Identifier | FieldKind::Category => Ok(()),
                    other => Err(TabSynthError::configuration(format!(
                        "anomaly kind '{}' recases '{}' but it is a {} column",
                        kind_name, field, other
                    ))),
                }
            }
        }
    }
}

/// A named anomaly transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyKind {
    /// Relative weight under weighted assignment
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Human-readable summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Mutation steps applied in order
    pub steps: Vec<Mutation>,
}

impl AnomalyKind {
    /// Creates a kind with weight 1 and the given steps.
    pub fn new(steps: Vec<Mutation>) -> Self {
        Self {
            weight: 1.0,
            description: None,
            steps,
        }
    }

    /// Builder method to set the weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Fields written by any step, in first-write order.
    pub fn touched_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = Vec::new();
        for field in self.steps.iter().flat_map(Mutation::fields) {
            if !fields.iter().any(|f| f == field) {
                fields.push(field.to_string());
            }
        }
        fields
    }
}

/// Lookup table from kind name to transformation.
///
/// Serialized as a JSON object keyed by kind name. Deserialization goes
/// through [`register`](AnomalyCatalog::register), so a repeated key is an
/// error rather than a silent overwrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AnomalyCatalog {
    kinds: BTreeMap<String, AnomalyKind>,
}

struct CatalogVisitor;

impl<'de> Visitor<'de> for CatalogVisitor {
    type Value = AnomalyCatalog;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a map from anomaly kind name to kind")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
        let mut catalog = AnomalyCatalog::new();
        while let Some((name, kind)) = map.next_entry::<String, AnomalyKind>()? {
            catalog
                .register(name, kind)
                .map_err(serde::de::Error::custom)?;
        }
        Ok(catalog)
    }
}

impl<'de> Deserialize<'de> for AnomalyCatalog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(CatalogVisitor)
    }
}

impl AnomalyCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a kind.
    ///
    /// # Errors
    /// Returns a configuration error if the name is already registered.
    pub fn register(&mut self, name: impl Into<String>, kind: AnomalyKind) -> Result<()> {
        let name = name.into();
        if self.kinds.contains_key(&name) {
            return Err(TabSynthError::configuration(format!(
                "duplicate anomaly kind '{}'",
                name
            )));
        }
        self.kinds.insert(name, kind);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_kind(mut self, name: impl Into<String>, kind: AnomalyKind) -> Result<Self> {
        self.register(name, kind)?;
        Ok(self)
    }

    /// Looks up a kind by name.
    pub fn get(&self, name: &str) -> Option<&AnomalyKind> {
        self.kinds.get(name)
    }

    /// Kind names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    /// Iterates over `(name, kind)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnomalyKind)> {
        self.kinds.iter().map(|(name, kind)| (name.as_str(), kind))
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Whether no kind is registered.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// Anomaly injection configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Rows to mutate
    pub selection: TargetSelection,
    /// Spread of kinds over the selected rows
    #[serde(default)]
    pub assignment: KindAssignment,
    /// Catalog of kinds
    pub kinds: AnomalyCatalog,
    /// Exact copies of the last rows appended after the kinds are applied
    #[serde(default, skip_serializing_if = "is_zero")]
    pub duplicate_tail: usize,
}

impl AnomalyConfig {
    /// Creates a config with the given selection and an empty catalog.
    pub fn new(selection: TargetSelection) -> Self {
        Self {
            selection,
            ..Self::default()
        }
    }

    /// Builder method to set the kind assignment.
    pub fn with_assignment(mut self, assignment: KindAssignment) -> Self {
        self.assignment = assignment;
        self
    }

    /// Builder method to register a kind.
    pub fn with_kind(mut self, name: impl Into<String>, kind: AnomalyKind) -> Result<Self> {
        self.kinds.register(name, kind)?;
        Ok(self)
    }

    /// Builder method to append copies of the last `count` rows.
    pub fn with_duplicate_tail(mut self, count: usize) -> Self {
        self.duplicate_tail = count;
        self
    }

    /// Number of existing rows the selection mutates.
    pub fn target_count(&self) -> usize {
        self.selection.count()
    }

    /// Number of rows marked in the ground truth, appended duplicates
    /// included.
    pub fn marked_count(&self) -> usize {
        self.target_count() + self.duplicate_tail
    }

    /// Validates the configuration independently of any dataset.
    ///
    /// # Errors
    /// Returns a configuration error for empty catalogs with a non-zero
    /// target, inverted ranges, invalid weights and mismatched quotas.
    pub fn validate(&self) -> Result<()> {
        if let TargetSelection::Range { start, end } = self.selection {
            if start > end {
                return Err(TabSynthError::configuration(format!(
                    "anomaly row range [{}, {}) is inverted",
                    start, end
                )));
            }
        }

        if self.duplicate_tail > 0 && self.kinds.get(DUPLICATE_ROW_KIND).is_some() {
            return Err(TabSynthError::configuration(format!(
                "anomaly kind name '{}' is reserved for appended duplicates",
                DUPLICATE_ROW_KIND
            )));
        }

        let target = self.target_count();
        if target > 0 && self.kinds.is_empty() {
            return Err(TabSynthError::configuration(format!(
                "{} rows selected for anomalies but the catalog is empty",
                target
            )));
        }

        for (name, kind) in self.kinds.iter() {
            if kind.steps.is_empty() {
                return Err(TabSynthError::configuration(format!(
                    "anomaly kind '{}' has no steps",
                    name
                )));
            }
            if !kind.weight.is_finite() || kind.weight < 0.0 {
                return Err(TabSynthError::configuration(format!(
                    "anomaly kind '{}' weight must be finite and >= 0, got {}",
                    name, kind.weight
                )));
            }
        }

        match &self.assignment {
            KindAssignment::Weighted => {
                if target > 0 && self.kinds.iter().all(|(_, k)| k.weight == 0.0) {
                    return Err(TabSynthError::configuration(
                        "all anomaly kind weights are zero",
                    ));
                }
            }
            KindAssignment::Quotas { counts } => {
                if let Some(unknown) = counts.keys().find(|name| self.kinds.get(name).is_none()) {
                    return Err(TabSynthError::configuration(format!(
                        "quota names unknown anomaly kind '{}'",
                        unknown
                    )));
                }
                let total: usize = counts.values().sum();
                if total != target {
                    return Err(TabSynthError::configuration(format!(
                        "anomaly quotas sum to {} but {} rows are selected",
                        total, target
                    )));
                }
            }
        }
        Ok(())
    }

    /// Validates every kind's steps against the dataset columns.
    pub fn validate_steps(&self, columns: &[Column]) -> Result<()> {
        for (name, kind) in self.kinds.iter() {
            for step in &kind.steps {
                step.validate(name, columns)?;
            }
        }
        Ok(())
    }
}
