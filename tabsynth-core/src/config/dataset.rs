//! Top-level dataset configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::anomaly::{AnomalyConfig, TargetSelection};
use super::field::{FieldSource, FieldSpec};
use crate::error::{Result, TabSynthError};
use crate::models::Column;
use crate::quality::BoundRule;

fn default_records() -> usize {
    100
}

/// Everything needed to reproduce one dataset: size, seed, fields, extra
/// bounds and anomalies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Dataset name, used in logs and the ground-truth sidecar
    pub name: String,
    /// Number of records to generate
    #[serde(default = "default_records")]
    pub records: usize,
    /// Seed of the run's random number generator
    #[serde(default)]
    pub seed: u64,
    /// Fields in output and generation order
    pub fields: Vec<FieldSpec>,
    /// Bounds declared in addition to the ones implied by the fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bounds: Vec<BoundRule>,
    /// Anomaly injection, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomalies: Option<AnomalyConfig>,
}

impl DatasetConfig {
    /// Creates an empty configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: default_records(),
            seed: 0,
            fields: Vec::new(),
            bounds: Vec::new(),
            anomalies: None,
        }
    }

    /// Builder method to set the record count.
    pub fn with_records(mut self, records: usize) -> Self {
        self.records = records;
        self
    }

    /// Builder method to set the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to append a field.
    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Builder method to append an explicit bound.
    pub fn with_bound(mut self, bound: BoundRule) -> Self {
        self.bounds.push(bound);
        self
    }

    /// Builder method to set the anomaly configuration.
    pub fn with_anomalies(mut self, anomalies: AnomalyConfig) -> Self {
        self.anomalies = Some(anomalies);
        self
    }

    /// Columns in output order.
    pub fn columns(&self) -> Vec<Column> {
        self.fields.iter().map(FieldSpec::column).collect()
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validates the whole configuration.
    ///
    /// # Errors
    /// Returns the first configuration error found; the message names the
    /// offending field or anomaly kind.
    pub fn validate(&self) -> Result<()> {
        if self.records == 0 {
            return Err(TabSynthError::configuration(
                "record count must be greater than zero",
            ));
        }
        if self.fields.is_empty() {
            return Err(TabSynthError::configuration("field list is empty"));
        }

        let columns = self.columns();
        for (index, spec) in self.fields.iter().enumerate() {
            if self.fields[..index].iter().any(|f| f.name == spec.name) {
                return Err(TabSynthError::invalid_field(&spec.name, "declared twice"));
            }
            spec.source.validate(&spec.name, spec.kind, &columns[..index])?;
            self.check_category_coverage(spec)?;
        }

        for bound in &self.bounds {
            bound.validate(&columns)?;
        }

        if let Some(anomalies) = &self.anomalies {
            anomalies.validate()?;
            anomalies.validate_steps(&columns)?;
            check_selection_fits(&anomalies.selection, self.records)?;
            check_duplicate_tail_fits(anomalies.duplicate_tail, self.records)?;
        }

        debug!(
            "Configuration '{}' valid: {} fields, {} records",
            self.name,
            self.fields.len(),
            self.records
        );
        Ok(())
    }

    /// Every label the category field can produce needs a source.
    fn check_category_coverage(&self, spec: &FieldSpec) -> Result<()> {
        let FieldSource::ByCategory { field, sources } = &spec.source else {
            return Ok(());
        };
        let labels = self
            .field(field)
            .and_then(|category| category.source.labels())
            .unwrap_or_default();
        if let Some(missing) = labels.iter().find(|label| !sources.contains_key(*label)) {
            return Err(TabSynthError::invalid_field(
                &spec.name,
                format!("by_category has no source for '{}' = '{}'", field, missing),
            ));
        }
        Ok(())
    }

    /// Parses a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| TabSynthError::serialization("Failed to parse dataset configuration", e))
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            TabSynthError::io(format!("Failed to read configuration {}", path.display()), e)
        })?;
        Self::from_json(&text)
    }

    /// Renders the configuration as pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            TabSynthError::serialization("Failed to serialize dataset configuration", e)
        })
    }
}

/// Checks that a selection fits in a dataset of `records` rows.
pub(crate) fn check_selection_fits(selection: &TargetSelection, records: usize) -> Result<()> {
    match *selection {
        TargetSelection::Tail { count } | TargetSelection::Random { count } if count > records => {
            Err(TabSynthError::injection(format!(
                "cannot select {} anomalous rows from {} records",
                count, records
            )))
        }
        TargetSelection::Range { start, end } if start > end || end > records => {
            Err(TabSynthError::injection(format!(
                "anomaly row range [{}, {}) is outside the {} records",
                start, end, records
            )))
        }
        _ => Ok(()),
    }
}

/// Checks that the duplicated tail is no longer than the dataset.
pub(crate) fn check_duplicate_tail_fits(count: usize, records: usize) -> Result<()> {
    if count > records {
        return Err(TabSynthError::injection(format!(
            "cannot duplicate the last {} rows of {} records",
            count, records
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::config::anomaly::{AnomalyKind, Mutation};
    use crate::config::field::{DerivedRule, WeightedOption};
    use crate::models::{FieldKind, Value};

    fn base_config() -> DatasetConfig {
        DatasetConfig::new("listings")
            .with_records(10)
            .with_seed(7)
            .with_field(FieldSpec::new(
                "txn_id",
                FieldKind::Identifier,
                FieldSource::Sequence {
                    prefix: "TXN-".to_string(),
                    width: 4,
                    start: 1,
                },
            ))
            .with_field(FieldSpec::new(
                "property_type",
                FieldKind::Category,
                FieldSource::Choice {
                    options: WeightedOption::uniform(["Condo", "Vacant Lot"]),
                },
            ))
    }

    fn price_by_type(types: &[&str]) -> FieldSpec {
        let sources = types
            .iter()
            .map(|t| {
                (
                    (*t).to_string(),
                    FieldSource::UniformFloat {
                        lo: 1_000.0,
                        hi: 2_000.0,
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();
        FieldSpec::new(
            "listed_price",
            FieldKind::Amount { decimals: 2 },
            FieldSource::ByCategory {
                field: "property_type".to_string(),
                sources,
            },
        )
    }

    #[test]
    fn test_valid_config() {
        let config = base_config().with_field(price_by_type(&["Condo", "Vacant Lot"]));
        assert!(config.validate().is_ok());
        assert_eq!(config.columns().len(), 3);
    }

    #[test]
    fn test_zero_records_rejected() {
        let config = base_config().with_records(0);
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("greater than zero"));
    }

    #[test]
    fn test_empty_fields_rejected() {
        let config = DatasetConfig::new("empty");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let config = base_config().with_field(FieldSpec::new(
            "txn_id",
            FieldKind::Integer,
            FieldSource::UniformInt { lo: 1, hi: 2 },
        ));
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("declared twice"));
    }

    #[test]
    fn test_missing_category_source_rejected() {
        let config = base_config().with_field(price_by_type(&["Condo"]));
        let error = config.validate().unwrap_err();
        let message = error.to_string();
        assert!(message.contains("listed_price"));
        assert!(message.contains("Vacant Lot"));
    }

    #[test]
    fn test_forward_reference_rejected() {
        let config = base_config()
            .with_field(FieldSpec::new(
                "sold_price",
                FieldKind::Amount { decimals: 2 },
                FieldSource::Derived {
                    rule: DerivedRule::Scaled {
                        base: "listed_price".to_string(),
                        lo: 0.85,
                        hi: 1.0,
                    },
                },
            ))
            .with_field(price_by_type(&["Condo", "Vacant Lot"]));
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("sold_price"));
    }

    #[test]
    fn test_over_selection_rejected() {
        let anomalies = AnomalyConfig::new(TargetSelection::Tail { count: 11 })
            .with_kind(
                "relabel",
                AnomalyKind::new(vec![Mutation::Set {
                    field: "property_type".to_string(),
                    value: Value::Text("Castle".to_string()),
                }]),
            )
            .unwrap();
        let config = base_config().with_anomalies(anomalies);
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("cannot select 11"));
    }

    #[test]
    fn test_oversized_duplicate_tail_rejected() {
        let anomalies = AnomalyConfig::new(TargetSelection::Tail { count: 0 }).with_duplicate_tail(11);
        let config = base_config().with_anomalies(anomalies);
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("duplicate the last 11 rows"));
    }

    #[test]
    fn test_repeated_anomaly_kind_in_json_rejected() {
        let json = r#"{
            "name": "tiny",
            "records": 5,
            "fields": [
                {"name": "n", "kind": {"type": "integer"}, "source": {"type": "uniform_int", "lo": 1, "hi": 3}}
            ],
            "anomalies": {
                "selection": {"type": "tail", "count": 1},
                "kinds": {
                    "spike": {"steps": [{"op": "set", "field": "n", "value": 10}]},
                    "spike": {"steps": [{"op": "set", "field": "n", "value": 20}]}
                }
            }
        }"#;
        let error = DatasetConfig::from_json(json).unwrap_err();
        let source = std::error::Error::source(&error).unwrap();
        assert!(source.to_string().contains("duplicate anomaly kind 'spike'"));
    }

    #[test]
    fn test_json_roundtrip_preserves_config() {
        let config = base_config().with_field(price_by_type(&["Condo", "Vacant Lot"]));
        let json = config.to_json_pretty().unwrap();
        let parsed = DatasetConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_defaults_from_minimal_json() {
        let json = r#"{
            "name": "tiny",
            "fields": [
                {"name": "n", "kind": {"type": "integer"}, "source": {"type": "uniform_int", "lo": 1, "hi": 3}}
            ]
        }"#;
        let config = DatasetConfig::from_json(json).unwrap();
        assert_eq!(config.records, 100);
        assert_eq!(config.seed, 0);
        assert!(config.anomalies.is_none());
        assert!(config.validate().is_ok());
    }
}
