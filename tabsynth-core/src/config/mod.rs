//! Dataset configuration.
//!
//! Configurations are plain serde types so they can be loaded from JSON,
//! built in code with `with_*` methods, or taken from a preset. Every
//! configuration is validated in full before any record is generated.

pub mod anomaly;
pub mod dataset;
pub mod field;

pub use anomaly::{
    AnomalyCatalog, AnomalyConfig, AnomalyKind, DUPLICATE_ROW_KIND, KindAssignment, LetterCase,
    Mutation, TargetSelection,
};
pub use dataset::DatasetConfig;
pub use field::{DerivedRule, FieldSource, FieldSpec, Interval, WeightedOption};
