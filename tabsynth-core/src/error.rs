//! Error types for generation, injection and output.
//!
//! Every failure in a run is terminal: configuration problems are reported
//! before any record is produced, and sink problems are reported before the
//! destination file is touched.

use thiserror::Error;

/// Main error type for tabsynth operations.
#[derive(Debug, Error)]
pub enum TabSynthError {
    /// Invalid dataset, field or anomaly configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Anomaly injection was rejected
    #[error("Injection failed: {message}")]
    Injection { message: String },

    /// A stored value could not be used as the requested type
    #[error("Value error: {context}")]
    Value { context: String },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Delimited file could not be written or read
    #[error("Tabular file operation failed: {context}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A field read back from a file did not parse as its column kind
    #[error("Parse error: {context}")]
    Parse { context: String },
}

/// Convenience type alias for Results with TabSynthError
pub type Result<T> = std::result::Result<T, TabSynthError>;

impl TabSynthError {
    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a configuration error scoped to a named field
    ///
    /// # Arguments
    /// * `field` - Name of the field whose definition is invalid
    /// * `problem` - Description of what is wrong with it
    pub fn invalid_field(field: &str, problem: impl std::fmt::Display) -> Self {
        Self::Configuration {
            message: format!("field '{}': {}", field, problem),
        }
    }

    /// Creates an injection error
    pub fn injection(message: impl Into<String>) -> Self {
        Self::Injection {
            message: message.into(),
        }
    }

    /// Creates a value error
    pub fn value(context: impl Into<String>) -> Self {
        Self::Value {
            context: context.into(),
        }
    }

    /// Creates a parse error for a cell read back from a file
    pub fn parse_cell(row: usize, column: &str, raw: &str) -> Self {
        Self::Parse {
            context: format!(
                "row {} column '{}': cannot parse '{}'",
                row, column, raw
            ),
        }
    }

    /// Creates an I/O error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates a CSV error with context
    pub fn csv(context: impl Into<String>, source: csv::Error) -> Self {
        Self::Csv {
            context: context.into(),
            source,
        }
    }

    /// Creates a serialization error with context
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = TabSynthError::configuration("record count must be positive");
        assert!(error.to_string().contains("record count must be positive"));

        let error = TabSynthError::injection("dataset already injected");
        assert!(error.to_string().starts_with("Injection failed"));
    }

    #[test]
    fn test_invalid_field_names_the_field() {
        let error = TabSynthError::invalid_field("listed_price", "lo 10 > hi 5");
        let message = error.to_string();
        assert!(message.contains("listed_price"));
        assert!(message.contains("lo 10 > hi 5"));
    }

    #[test]
    fn test_parse_cell_context() {
        let error = TabSynthError::parse_cell(3, "days_on_market", "abc");
        assert_eq!(
            error.to_string(),
            "Parse error: row 3 column 'days_on_market': cannot parse 'abc'"
        );
    }

    #[test]
    fn test_io_error_keeps_source() {
        use std::error::Error as _;

        let error = TabSynthError::io(
            "Failed to write out.csv",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(error.source().is_some());
    }
}
