//! Configuration types for R&D claim calculation.
//!
//! This module contains the [`RuleSet`] shared by every calculation in a run,
//! and the strongly-typed structures deserialized from the YAML rule files.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Statutory cap applied to unconnected externally provided workers.
pub const DEFAULT_EPW_CAP_FRACTION: Decimal = Decimal::from_parts(65, 0, 0, false, 2);

/// Employer NIC uplift applied to the staff qualifying subtotal.
pub const DEFAULT_NIC_UPLIFT_RATE: Decimal = Decimal::from_parts(138, 0, 0, false, 3);

/// R&D fraction used when neither an override nor the data supplies one.
pub const DEFAULT_RD_FRACTION: Decimal = Decimal::from_parts(8, 0, 0, false, 1);

/// A credit rate that takes effect for accounting periods starting on or after a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRate {
    /// The first accounting period start date this rate applies to.
    pub effective_from: NaiveDate,
    /// The rate as a fraction (e.g. 0.145 for 14.5%).
    pub rate: Decimal,
    /// Free-text note on where the rate comes from.
    #[serde(default)]
    pub description: String,
}

/// Contents of `rules.yaml`.
///
/// Every field is optional; omitted values fall back to the [`RuleSet`] defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesFile {
    /// Cap on unconnected EPW qualifying cost, as a fraction of the eligible base.
    pub epw_cap_fraction: Option<Decimal>,
    /// NIC uplift rate applied to staff costs.
    pub nic_uplift_rate: Option<Decimal>,
    /// R&D fraction used when no other value is available.
    pub default_rd_fraction: Option<Decimal>,
    /// Case-insensitive substrings that exclude a cost when found in its description.
    #[serde(default)]
    pub excluded_keywords: Vec<String>,
    /// Whether an excluded line contributes nothing to qualifying cost.
    #[serde(default)]
    pub exclusion_zeroes_qualifying: bool,
}

/// The calculation parameters for a run.
///
/// A `RuleSet` is validated on construction and immutable afterwards; it can
/// be shared read-only across any number of runs.
///
/// # Example
///
/// ```
/// use rd_claim_engine::config::RuleSet;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let rules = RuleSet::default();
/// assert_eq!(rules.epw_cap_fraction(), Decimal::from_str("0.65").unwrap());
/// assert_eq!(rules.nic_uplift_rate(), Decimal::from_str("0.138").unwrap());
/// assert_eq!(rules.default_rd_fraction(), Decimal::from_str("0.8").unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSet {
    epw_cap_fraction: Decimal,
    nic_uplift_rate: Decimal,
    default_rd_fraction: Decimal,
    excluded_keywords: Vec<String>,
    exclusion_zeroes_qualifying: bool,
    /// Sorted ascending by `effective_from`.
    period_rates: Vec<PeriodRate>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            epw_cap_fraction: DEFAULT_EPW_CAP_FRACTION,
            nic_uplift_rate: DEFAULT_NIC_UPLIFT_RATE,
            default_rd_fraction: DEFAULT_RD_FRACTION,
            excluded_keywords: Vec::new(),
            exclusion_zeroes_qualifying: false,
            period_rates: Vec::new(),
        }
    }
}

impl RuleSet {
    /// Builds a validated rule set from a parsed rules file and period rates.
    ///
    /// Period rates are sorted oldest first. Returns `ConfigurationError` if a
    /// fraction lies outside [0, 1], the NIC uplift is negative, a keyword is
    /// blank, or two period rates share an effective date.
    pub fn new(rules: RulesFile, period_rates: Vec<PeriodRate>) -> EngineResult<Self> {
        let epw_cap_fraction = rules.epw_cap_fraction.unwrap_or(DEFAULT_EPW_CAP_FRACTION);
        let nic_uplift_rate = rules.nic_uplift_rate.unwrap_or(DEFAULT_NIC_UPLIFT_RATE);
        let default_rd_fraction = rules.default_rd_fraction.unwrap_or(DEFAULT_RD_FRACTION);

        check_fraction("epw_cap_fraction", epw_cap_fraction)?;
        check_fraction("default_rd_fraction", default_rd_fraction)?;
        if nic_uplift_rate < Decimal::ZERO {
            return Err(EngineError::ConfigurationError {
                field: "nic_uplift_rate".to_string(),
                message: format!("must not be negative, got {}", nic_uplift_rate),
            });
        }

        let mut excluded_keywords = Vec::with_capacity(rules.excluded_keywords.len());
        for keyword in rules.excluded_keywords {
            let keyword = keyword.trim().to_string();
            if keyword.is_empty() {
                return Err(EngineError::ConfigurationError {
                    field: "excluded_keywords".to_string(),
                    message: "keywords must not be blank".to_string(),
                });
            }
            if !excluded_keywords
                .iter()
                .any(|k: &String| k.eq_ignore_ascii_case(&keyword))
            {
                excluded_keywords.push(keyword);
            }
        }

        let mut sorted_rates = period_rates;
        sorted_rates.sort_by(|a, b| a.effective_from.cmp(&b.effective_from));
        for rate in &sorted_rates {
            check_fraction(&format!("period_rates[{}]", rate.effective_from), rate.rate)?;
        }
        if let Some(pair) = sorted_rates
            .windows(2)
            .find(|pair| pair[0].effective_from == pair[1].effective_from)
        {
            return Err(EngineError::ConfigurationError {
                field: "period_rates".to_string(),
                message: format!("duplicate effective date {}", pair[0].effective_from),
            });
        }

        Ok(Self {
            epw_cap_fraction,
            nic_uplift_rate,
            default_rd_fraction,
            excluded_keywords,
            exclusion_zeroes_qualifying: rules.exclusion_zeroes_qualifying,
            period_rates: sorted_rates,
        })
    }

    /// Returns the cap on unconnected EPW costs as a fraction of the eligible base.
    pub fn epw_cap_fraction(&self) -> Decimal {
        self.epw_cap_fraction
    }

    /// Returns the NIC uplift rate applied to staff qualifying costs.
    pub fn nic_uplift_rate(&self) -> Decimal {
        self.nic_uplift_rate
    }

    /// Returns the fallback R&D fraction.
    pub fn default_rd_fraction(&self) -> Decimal {
        self.default_rd_fraction
    }

    /// Returns the exclusion keywords in configured order.
    pub fn excluded_keywords(&self) -> &[String] {
        &self.excluded_keywords
    }

    /// Returns true if excluded lines contribute nothing to qualifying cost.
    pub fn exclusion_zeroes_qualifying(&self) -> bool {
        self.exclusion_zeroes_qualifying
    }

    /// Returns the period rate table, oldest first.
    pub fn period_rates(&self) -> &[PeriodRate] {
        &self.period_rates
    }

    /// Finds the rate in force for an accounting period starting on `period_start`.
    ///
    /// Selects the entry with the latest `effective_from` on or before the
    /// period start. Returns `RateNotFound` if the period starts before every entry.
    ///
    /// # Example
    ///
    /// ```
    /// use rd_claim_engine::config::{PeriodRate, RuleSet, RulesFile};
    /// use chrono::NaiveDate;
    /// use rust_decimal::Decimal;
    /// use std::str::FromStr;
    ///
    /// let rules = RuleSet::new(
    ///     RulesFile::default(),
    ///     vec![
    ///         PeriodRate {
    ///             effective_from: NaiveDate::from_ymd_opt(2023, 4, 1).unwrap(),
    ///             rate: Decimal::from_str("0.10").unwrap(),
    ///             description: String::new(),
    ///         },
    ///         PeriodRate {
    ///             effective_from: NaiveDate::from_ymd_opt(2000, 4, 1).unwrap(),
    ///             rate: Decimal::from_str("0.145").unwrap(),
    ///             description: String::new(),
    ///         },
    ///     ],
    /// )
    /// .unwrap();
    ///
    /// let start = NaiveDate::from_ymd_opt(2022, 4, 1).unwrap();
    /// assert_eq!(rules.rate_for_period(start).unwrap().rate, Decimal::from_str("0.145").unwrap());
    /// ```
    pub fn rate_for_period(&self, period_start: NaiveDate) -> EngineResult<&PeriodRate> {
        // partition_point relies on the ascending sort done in `new`
        let idx = self
            .period_rates
            .partition_point(|r| r.effective_from <= period_start);
        if idx == 0 {
            return Err(EngineError::RateNotFound { date: period_start });
        }
        Ok(&self.period_rates[idx - 1])
    }
}

fn check_fraction(field: &str, value: Decimal) -> EngineResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(EngineError::ConfigurationError {
            field: field.to_string(),
            message: format!("must be between 0 and 1, got {}", value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rate(effective_from: NaiveDate, value: &str) -> PeriodRate {
        PeriodRate {
            effective_from,
            rate: dec(value),
            description: String::new(),
        }
    }

    #[test]
    fn test_defaults() {
        let rules = RuleSet::default();
        assert_eq!(rules.epw_cap_fraction(), dec("0.65"));
        assert_eq!(rules.nic_uplift_rate(), dec("0.138"));
        assert_eq!(rules.default_rd_fraction(), dec("0.8"));
        assert!(rules.excluded_keywords().is_empty());
        assert!(!rules.exclusion_zeroes_qualifying());
    }

    #[test]
    fn test_empty_rules_file_matches_defaults() {
        let rules = RuleSet::new(RulesFile::default(), vec![]).unwrap();
        assert_eq!(rules, RuleSet::default());
    }

    #[test]
    fn test_epw_cap_above_one_rejected() {
        let file = RulesFile {
            epw_cap_fraction: Some(dec("1.5")),
            ..RulesFile::default()
        };
        match RuleSet::new(file, vec![]) {
            Err(EngineError::ConfigurationError { field, .. }) => {
                assert_eq!(field, "epw_cap_fraction")
            }
            other => panic!("Expected ConfigurationError, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_default_fraction_rejected() {
        let file = RulesFile {
            default_rd_fraction: Some(dec("-0.1")),
            ..RulesFile::default()
        };
        assert!(matches!(
            RuleSet::new(file, vec![]),
            Err(EngineError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_negative_nic_uplift_rejected() {
        let file = RulesFile {
            nic_uplift_rate: Some(dec("-0.01")),
            ..RulesFile::default()
        };
        assert!(matches!(
            RuleSet::new(file, vec![]),
            Err(EngineError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_nic_uplift_above_one_allowed() {
        let file = RulesFile {
            nic_uplift_rate: Some(dec("1.2")),
            ..RulesFile::default()
        };
        assert_eq!(RuleSet::new(file, vec![]).unwrap().nic_uplift_rate(), dec("1.2"));
    }

    #[test]
    fn test_blank_keyword_rejected() {
        let file = RulesFile {
            excluded_keywords: vec!["pilon".to_string(), "  ".to_string()],
            ..RulesFile::default()
        };
        assert!(RuleSet::new(file, vec![]).is_err());
    }

    #[test]
    fn test_keywords_trimmed_and_deduplicated_keeping_order() {
        let file = RulesFile {
            excluded_keywords: vec![
                " Bonus ".to_string(),
                "redundancy".to_string(),
                "BONUS".to_string(),
            ],
            ..RulesFile::default()
        };
        let rules = RuleSet::new(file, vec![]).unwrap();
        assert_eq!(rules.excluded_keywords(), &["Bonus", "redundancy"]);
    }

    #[test]
    fn test_period_rates_sorted_on_construction() {
        let rules = RuleSet::new(
            RulesFile::default(),
            vec![rate(date(2023, 4, 1), "0.10"), rate(date(2000, 4, 1), "0.145")],
        )
        .unwrap();
        let dates: Vec<NaiveDate> = rules.period_rates().iter().map(|r| r.effective_from).collect();
        assert_eq!(dates, vec![date(2000, 4, 1), date(2023, 4, 1)]);
    }

    #[test]
    fn test_duplicate_effective_date_rejected() {
        let result = RuleSet::new(
            RulesFile::default(),
            vec![rate(date(2023, 4, 1), "0.10"), rate(date(2023, 4, 1), "0.12")],
        );
        assert!(matches!(result, Err(EngineError::ConfigurationError { .. })));
    }

    #[test]
    fn test_period_rate_out_of_range_rejected() {
        let result = RuleSet::new(RulesFile::default(), vec![rate(date(2023, 4, 1), "14.5")]);
        assert!(matches!(result, Err(EngineError::ConfigurationError { .. })));
    }

    #[test]
    fn test_rate_for_period_selects_latest_on_or_before() {
        let rules = RuleSet::new(
            RulesFile::default(),
            vec![rate(date(2000, 4, 1), "0.145"), rate(date(2023, 4, 1), "0.10")],
        )
        .unwrap();

        assert_eq!(rules.rate_for_period(date(2023, 3, 31)).unwrap().rate, dec("0.145"));
        assert_eq!(rules.rate_for_period(date(2023, 4, 1)).unwrap().rate, dec("0.10"));
        assert_eq!(rules.rate_for_period(date(2024, 4, 1)).unwrap().rate, dec("0.10"));
    }

    #[test]
    fn test_rate_for_period_before_first_entry() {
        let rules = RuleSet::new(RulesFile::default(), vec![rate(date(2000, 4, 1), "0.145")]).unwrap();
        match rules.rate_for_period(date(1999, 1, 1)) {
            Err(EngineError::RateNotFound { date: d }) => assert_eq!(d, date(1999, 1, 1)),
            other => panic!("Expected RateNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_rate_for_period_with_empty_table() {
        assert!(RuleSet::default().rate_for_period(date(2024, 4, 1)).is_err());
    }

    #[test]
    fn test_default_constants_exact() {
        assert_eq!(DEFAULT_EPW_CAP_FRACTION, dec("0.65"));
        assert_eq!(DEFAULT_NIC_UPLIFT_RATE, dec("0.138"));
        assert_eq!(DEFAULT_RD_FRACTION, dec("0.8"));
    }
}
