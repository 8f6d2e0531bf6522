//! Rule set loading functionality.
//!
//! This module provides the [`RuleLoader`] type for loading a [`RuleSet`]
//! from a directory of YAML files.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};

use super::types::{PeriodRate, RuleSet, RulesFile};

/// Loads the calculation rules for a jurisdiction.
///
/// # Directory Structure
///
/// ```text
/// config/uk_rd/
/// ├── rules.yaml           # EPW cap, NIC uplift, default fraction, keywords
/// └── rates/
///     ├── 2000-04-01.yaml  # Period rate effective from this date
///     └── 2023-04-01.yaml
/// ```
///
/// # Example
///
/// ```no_run
/// use rd_claim_engine::config::RuleLoader;
///
/// let rules = RuleLoader::load("./config/uk_rd")?;
/// println!("EPW cap: {}", rules.epw_cap_fraction());
/// # Ok::<(), rd_claim_engine::error::EngineError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RuleLoader;

impl RuleLoader {
    /// Loads and validates a rule set from the specified directory.
    ///
    /// Returns an error if:
    /// - `rules.yaml` or the `rates/` directory is missing, or `rates/` holds no rate files
    /// - any file contains invalid YAML
    /// - any value fails [`RuleSet::new`] validation
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<RuleSet> {
        let path = path.as_ref();

        let rules = Self::load_yaml::<RulesFile>(&path.join("rules.yaml"))?;
        let rates = Self::load_rates(&path.join("rates"))?;

        RuleSet::new(rules, rates)
    }

    /// Parses a rule set from a single YAML document with no period rates.
    pub fn from_yaml_str(content: &str) -> EngineResult<RuleSet> {
        let rules: RulesFile =
            serde_yaml::from_str(content).map_err(|e| EngineError::ConfigParseError {
                path: "<inline>".to_string(),
                message: e.to_string(),
            })?;
        RuleSet::new(rules, Vec::new())
    }

    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    fn load_rates(rates_dir: &Path) -> EngineResult<Vec<PeriodRate>> {
        let rates_dir_str = rates_dir.display().to_string();

        let entries = fs::read_dir(rates_dir).map_err(|_| EngineError::ConfigNotFound {
            path: rates_dir_str.clone(),
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound {
                path: rates_dir_str.clone(),
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "yaml") {
                paths.push(path);
            }
        }
        // read_dir order is platform dependent
        paths.sort();

        if paths.is_empty() {
            return Err(EngineError::ConfigNotFound {
                path: format!("{} (no rate files found)", rates_dir_str),
            });
        }

        paths.iter().map(|p| Self::load_yaml::<PeriodRate>(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn config_path() -> &'static str {
        "./config/uk_rd"
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_load_valid_configuration() {
        let result = RuleLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());

        let rules = result.unwrap();
        assert_eq!(rules.epw_cap_fraction(), dec("0.65"));
        assert_eq!(rules.nic_uplift_rate(), dec("0.138"));
        assert_eq!(rules.default_rd_fraction(), dec("0.8"));
        assert!(!rules.exclusion_zeroes_qualifying());
    }

    #[test]
    fn test_keywords_loaded_in_order() {
        let rules = RuleLoader::load(config_path()).unwrap();
        assert_eq!(
            rules.excluded_keywords(),
            &["redundancy", "compensation for loss of office"]
        );
    }

    #[test]
    fn test_period_rates_loaded_and_sorted() {
        let rules = RuleLoader::load(config_path()).unwrap();
        let rates = rules.period_rates();
        assert_eq!(rates.len(), 2);
        assert_eq!(
            rates[0].effective_from,
            NaiveDate::from_ymd_opt(2000, 4, 1).unwrap()
        );
        assert_eq!(rates[0].rate, dec("0.145"));
        assert_eq!(
            rates[1].effective_from,
            NaiveDate::from_ymd_opt(2023, 4, 1).unwrap()
        );
        assert_eq!(rates[1].rate, dec("0.10"));
    }

    #[test]
    fn test_load_missing_directory_returns_error() {
        let result = RuleLoader::load("/nonexistent/path");

        match result {
            Err(EngineError::ConfigNotFound { path }) => {
                assert!(path.contains("rules.yaml"));
            }
            other => panic!("Expected ConfigNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_yaml_str_applies_defaults() {
        let rules = RuleLoader::from_yaml_str("epw_cap_fraction: \"0.5\"\n").unwrap();
        assert_eq!(rules.epw_cap_fraction(), dec("0.5"));
        assert_eq!(rules.nic_uplift_rate(), dec("0.138"));
    }

    #[test]
    fn test_from_yaml_str_policy_flag() {
        let rules = RuleLoader::from_yaml_str("exclusion_zeroes_qualifying: true\n").unwrap();
        assert!(rules.exclusion_zeroes_qualifying());
    }

    #[test]
    fn test_from_yaml_str_invalid_yaml() {
        let result = RuleLoader::from_yaml_str("epw_cap_fraction: [unclosed");
        assert!(matches!(result, Err(EngineError::ConfigParseError { .. })));
    }

    #[test]
    fn test_from_yaml_str_out_of_range_value() {
        let result = RuleLoader::from_yaml_str("default_rd_fraction: \"1.01\"\n");
        assert!(matches!(result, Err(EngineError::ConfigurationError { .. })));
    }
}
