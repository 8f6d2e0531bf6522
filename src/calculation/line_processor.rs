//! Line item processing functionality.
//!
//! This module applies the eligibility rules to one [`AggregatedRecord`]:
//! exclusions, R&D fraction resolution, and the EPW cap.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use rust_decimal::Decimal;
use tracing::debug;

use crate::config::RuleSet;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AggregatedRecord, EPW_CAPPED_TAG, FractionSource, ProcessedLineItem, subject_key,
};

/// Per-subject R&D fraction overrides.
///
/// Subjects are matched with the same normalization as aggregation, so an
/// override for `"jane doe"` applies to `"Jane Doe"`.
///
/// # Example
///
/// ```
/// use rd_claim_engine::calculation::RdOverrides;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let overrides = RdOverrides::from_pairs([("Jane Doe", Decimal::from_str("0.5").unwrap())]).unwrap();
/// assert_eq!(overrides.get(" JANE DOE"), Some(Decimal::from_str("0.5").unwrap()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RdOverrides {
    /// Keyed by [`subject_key`]; holds the name as given and the fraction.
    fractions: HashMap<String, (String, Decimal)>,
}

impl RdOverrides {
    /// Creates an empty set of overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds overrides from `(subject, fraction)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: AsRef<str>,
    {
        let mut overrides = Self::new();
        for (subject, fraction) in pairs {
            overrides.insert(subject.as_ref(), fraction)?;
        }
        Ok(overrides)
    }

    /// Sets the override for `subject`.
    ///
    /// Returns `ConfigurationError` if `fraction` lies outside [0, 1], or if
    /// another name that normalizes to the same subject already has one.
    pub fn insert(&mut self, subject: &str, fraction: Decimal) -> EngineResult<()> {
        let field = format!("rd_overrides[{}]", subject.trim());
        if fraction < Decimal::ZERO || fraction > Decimal::ONE {
            return Err(EngineError::ConfigurationError {
                field,
                message: format!("must be between 0 and 1, got {}", fraction),
            });
        }
        match self.fractions.entry(subject_key(subject)) {
            Entry::Occupied(existing) => Err(EngineError::ConfigurationError {
                field,
                message: format!(
                    "'{}' already has an override as '{}'",
                    subject.trim(),
                    existing.get().0
                ),
            }),
            Entry::Vacant(slot) => {
                slot.insert((subject.trim().to_string(), fraction));
                Ok(())
            }
        }
    }

    /// Returns the override for `subject`, if any.
    pub fn get(&self, subject: &str) -> Option<Decimal> {
        self.fractions.get(&subject_key(subject)).map(|(_, fraction)| *fraction)
    }

    /// Returns the number of overrides.
    pub fn len(&self) -> usize {
        self.fractions.len()
    }

    /// Returns true if there are no overrides.
    pub fn is_empty(&self) -> bool {
        self.fractions.is_empty()
    }
}

/// Resolves the R&D fraction: override, then a positive data value, then the default.
pub fn resolve_fraction(
    record: &AggregatedRecord,
    overrides: &RdOverrides,
    rules: &RuleSet,
) -> (Decimal, FractionSource) {
    if let Some(fraction) = overrides.get(&record.subject) {
        return (fraction, FractionSource::Override);
    }
    match record.rd_fraction {
        Some(fraction) if fraction > Decimal::ZERO => (fraction, FractionSource::Data),
        _ => (rules.default_rd_fraction(), FractionSource::Default),
    }
}

/// Builds the ordered exclusion reasons for a record.
///
/// Termination payments come first, then bonus, then one reason per rule
/// keyword found in any of the record's descriptions.
fn exclusion_reasons(record: &AggregatedRecord, rules: &RuleSet) -> Vec<String> {
    let mut reasons = Vec::new();
    if !record.termination_payment.is_zero() {
        reasons.push(format!("PILON: {}", record.termination_payment.normalize()));
    }
    if !record.bonus.is_zero() {
        reasons.push(format!("Bonus: {}", record.bonus.normalize()));
    }

    let descriptions: Vec<String> = record
        .descriptions
        .iter()
        .map(|d| d.to_lowercase())
        .collect();
    for keyword in rules.excluded_keywords() {
        let needle = keyword.to_lowercase();
        if descriptions.iter().any(|d| d.contains(&needle)) {
            reasons.push(format!("Contains excluded keyword: {}", keyword));
        }
    }

    reasons
}

/// Applies the eligibility rules to one aggregated record.
///
/// 1. `eligible_base = gross + employer_ni + employer_pension`
/// 2. `excluded_amount = bonus + termination_payment`, with one reason per
///    non-zero component and per matched keyword
/// 3. The R&D fraction is resolved by [`resolve_fraction`]
/// 4. `qualifying_cost = eligible_base × rd_fraction`
/// 5. Unconnected EPWs are capped at `eligible_base × epw_cap_fraction` and
///    tagged `epw_capped`
///
/// Exclusion only flags the item unless the rule set's
/// `exclusion_zeroes_qualifying` policy is on, in which case an excluded
/// item qualifies nothing and its whole `total_cost` is counted as excluded.
///
/// # Errors
///
/// Returns `DataError` if an amount overflows the decimal range.
///
/// # Example
///
/// ```
/// use rd_claim_engine::calculation::{RdOverrides, process_record};
/// use rd_claim_engine::config::RuleSet;
/// use rd_claim_engine::models::{AggregatedRecord, SubjectType};
/// use rust_decimal::Decimal;
///
/// let mut record = AggregatedRecord::new("Agency Dev");
/// record.gross = Decimal::from(1000);
/// record.rd_fraction = Some(Decimal::ONE);
/// record.subject_type = SubjectType::Epw;
///
/// let item = process_record(&record, &RdOverrides::new(), &RuleSet::default()).unwrap();
/// assert_eq!(item.qualifying_cost, Decimal::from(650));
/// assert!(item.is_epw_capped());
/// ```
pub fn process_record(
    record: &AggregatedRecord,
    overrides: &RdOverrides,
    rules: &RuleSet,
) -> EngineResult<ProcessedLineItem> {
    let subject = record.subject.as_str();
    let eligible_base = record
        .gross
        .checked_add(record.employer_ni)
        .and_then(|sum| sum.checked_add(record.employer_pension))
        .ok_or_else(|| EngineError::overflow("eligible_base", subject))?;
    let mut excluded_amount = record
        .bonus
        .checked_add(record.termination_payment)
        .ok_or_else(|| EngineError::overflow("excluded_amount", subject))?;
    let total_cost = eligible_base
        .checked_add(excluded_amount)
        .ok_or_else(|| EngineError::overflow("total_cost", subject))?;
    let exclusion_reasons = exclusion_reasons(record, rules);
    let excluded = !exclusion_reasons.is_empty();

    let (rd_fraction, rd_fraction_source) = resolve_fraction(record, overrides, rules);
    let uncapped_qualifying_cost = eligible_base
        .checked_mul(rd_fraction)
        .ok_or_else(|| EngineError::overflow("qualifying_cost", subject))?;

    let mut tags = Vec::new();
    let mut qualifying_cost = uncapped_qualifying_cost;
    if record.is_capped_epw() {
        let cap = eligible_base
            .checked_mul(rules.epw_cap_fraction())
            .ok_or_else(|| EngineError::overflow("qualifying_cost", subject))?;
        qualifying_cost = qualifying_cost.min(cap);
        tags.push(EPW_CAPPED_TAG.to_string());
    }
    let mut epw_cap_reduction = uncapped_qualifying_cost - qualifying_cost;

    if excluded && rules.exclusion_zeroes_qualifying() {
        qualifying_cost = Decimal::ZERO;
        epw_cap_reduction = Decimal::ZERO;
        excluded_amount = total_cost;
    }

    debug!(
        subject = %record.subject,
        eligible_base = %eligible_base,
        rd_fraction = %rd_fraction,
        qualifying_cost = %qualifying_cost,
        excluded,
        "Processed line item"
    );

    Ok(ProcessedLineItem {
        subject: record.subject.clone(),
        subject_type: record.subject_type,
        connected: record.connected,
        gross: record.gross,
        employer_ni: record.employer_ni,
        employer_pension: record.employer_pension,
        bonus: record.bonus,
        termination_payment: record.termination_payment,
        eligible_base,
        total_cost,
        excluded_amount,
        excluded,
        exclusion_reasons,
        rd_fraction,
        rd_fraction_source,
        uncapped_qualifying_cost,
        qualifying_cost,
        epw_cap_reduction,
        tags,
        row_count: record.row_count,
        period_start: record.period_start,
        period_end: record.period_end,
    })
}
