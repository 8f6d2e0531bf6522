//! Error types for the R&D claim engine.
//!
//! Every failure in the engine is fatal to the current calculation run and is
//! reported through [`EngineError`]. No partial results are returned.

use chrono::NaiveDate;
use thiserror::Error;

/// The main error type for the R&D claim engine.
///
/// # Example
///
/// ```
/// use rd_claim_engine::error::EngineError;
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/rules.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/rules.yaml");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A rule value was outside its permitted range.
    #[error("Invalid configuration value '{field}': {message}")]
    ConfigurationError {
        /// The rule or override that was rejected.
        field: String,
        /// Why the value was rejected.
        message: String,
    },

    /// The input could not be treated as a table, or the mapping could not be applied.
    #[error("Mapping error: {message}")]
    MappingError {
        /// A description of the mapping failure.
        message: String,
    },

    /// A required column was missing or a cell held an unusable value.
    #[error("Data error in column '{column}'{}: {message}", row_suffix(.row))]
    DataError {
        /// The canonical column involved.
        column: String,
        /// The one-based data row, when the problem is tied to one row.
        row: Option<usize>,
        /// A description of the problem.
        message: String,
    },

    /// A calculation was requested before any data was loaded.
    #[error("No data loaded: {message}")]
    NoDataError {
        /// What was missing.
        message: String,
    },

    /// No period rate is effective for the given accounting period start.
    #[error("No period rate effective on {date}")]
    RateNotFound {
        /// The accounting period start that was looked up.
        date: NaiveDate,
    },
}

fn row_suffix(row: &Option<usize>) -> String {
    match row {
        Some(row) => format!(" at row {}", row),
        None => String::new(),
    }
}

impl EngineError {
    /// Convenience constructor for a [`EngineError::DataError`] tied to a row.
    pub fn data_at(column: impl Into<String>, row: usize, message: impl Into<String>) -> Self {
        EngineError::DataError {
            column: column.into(),
            row: Some(row),
            message: message.into(),
        }
    }

    /// A [`EngineError::DataError`] for an amount too large to represent.
    pub fn overflow(column: impl Into<String>, subject: &str) -> Self {
        EngineError::DataError {
            column: column.into(),
            row: None,
            message: format!("total for '{}' overflows", subject),
        }
    }

    /// Convenience constructor for a [`EngineError::MappingError`].
    pub fn mapping(message: impl Into<String>) -> Self {
        EngineError::MappingError {
            message: message.into(),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_displays_path() {
        let error = EngineError::ConfigNotFound {
            path: "/missing/rules.yaml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found: /missing/rules.yaml"
        );
    }

    #[test]
    fn test_config_parse_error_displays_path_and_message() {
        let error = EngineError::ConfigParseError {
            path: "/config/bad.yaml".to_string(),
            message: "invalid YAML syntax".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to parse configuration file '/config/bad.yaml': invalid YAML syntax"
        );
    }

    #[test]
    fn test_configuration_error_displays_field() {
        let error = EngineError::ConfigurationError {
            field: "epw_cap_fraction".to_string(),
            message: "must be between 0 and 1, got 1.5".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value 'epw_cap_fraction': must be between 0 and 1, got 1.5"
        );
    }

    #[test]
    fn test_data_error_with_row_displays_row() {
        let error = EngineError::data_at("gross_pay", 3, "'abc' is not a number");
        assert_eq!(
            error.to_string(),
            "Data error in column 'gross_pay' at row 3: 'abc' is not a number"
        );
    }

    #[test]
    fn test_data_error_without_row() {
        let error = EngineError::DataError {
            column: "employee_name".to_string(),
            row: None,
            message: "column is missing".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Data error in column 'employee_name': column is missing"
        );
    }

    #[test]
    fn test_overflow_names_subject() {
        let error = EngineError::overflow("gross_pay", "Jane Doe");
        assert_eq!(
            error.to_string(),
            "Data error in column 'gross_pay': total for 'Jane Doe' overflows"
        );
    }

    #[test]
    fn test_rate_not_found_displays_date() {
        let error = EngineError::RateNotFound {
            date: NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
        };
        assert_eq!(error.to_string(), "No period rate effective on 2001-01-01");
    }

    #[test]
    fn test_errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<EngineError>();
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn returns_no_data() -> EngineResult<()> {
            Err(EngineError::NoDataError {
                message: "no table".to_string(),
            })
        }

        fn propagates_error() -> EngineResult<()> {
            returns_no_data()?;
            Ok(())
        }

        assert!(propagates_error().is_err());
    }
}
