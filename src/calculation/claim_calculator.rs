//! Claim calculation orchestration.
//!
//! This module runs the full pipeline: mapping, aggregation, line processing,
//! totals rollup with NIC uplift, and audit trail construction. [`calculate`]
//! is the pure entry point; [`ClaimCalculator`] wraps it for callers that load
//! and map a table in separate steps.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::config::{PeriodRate, RuleSet};
use crate::error::{EngineError, EngineResult};
use crate::models::{ClaimResult, ClaimTotals, CreditEstimate, ProcessedLineItem, Table};

use super::aggregation::aggregate;
use super::audit_trail::build_audit_trail;
use super::column_mapping::{ColumnMapping, apply_mapping};
use super::line_processor::{RdOverrides, process_record};

/// Rolls line items up into claim totals.
///
/// The NIC uplift applies to the staff subtotal only:
/// `staff_with_nic = staff_qualifying × (1 + nic_uplift_rate)` and
/// `total_qualifying_expenditure = staff_with_nic + epw_qualifying`.
///
/// Returns `DataError` if a total overflows the decimal range.
pub fn compute_totals(line_items: &[ProcessedLineItem], rules: &RuleSet) -> EngineResult<ClaimTotals> {
    let mut totals = line_items
        .iter()
        .try_fold(ClaimTotals::default(), |mut acc, item| -> EngineResult<ClaimTotals> {
            let sum = |total: Decimal, amount: Decimal, column: &str| {
                total
                    .checked_add(amount)
                    .ok_or_else(|| EngineError::overflow(column, "claim"))
            };
            acc.total_gross_cost = sum(acc.total_gross_cost, item.total_cost, "total_gross_cost")?;
            acc.total_excluded = sum(acc.total_excluded, item.excluded_amount, "total_excluded")?;
            if item.is_epw() {
                acc.epw_qualifying = sum(acc.epw_qualifying, item.qualifying_cost, "epw_qualifying")?;
            } else {
                acc.staff_qualifying =
                    sum(acc.staff_qualifying, item.qualifying_cost, "staff_qualifying")?;
            }
            acc.epw_cap_reduction =
                sum(acc.epw_cap_reduction, item.epw_cap_reduction, "epw_cap_reduction")?;
            acc.line_item_count += 1;
            if item.excluded {
                acc.excluded_item_count += 1;
            }
            Ok(acc)
        })?;

    totals.total_qualifying_cost = totals
        .staff_qualifying
        .checked_add(totals.epw_qualifying)
        .ok_or_else(|| EngineError::overflow("total_qualifying_cost", "claim"))?;
    totals.staff_with_nic = totals
        .staff_qualifying
        .checked_mul(Decimal::ONE + rules.nic_uplift_rate())
        .ok_or_else(|| EngineError::overflow("staff_with_nic", "claim"))?;
    totals.total_qualifying_expenditure = totals
        .staff_with_nic
        .checked_add(totals.epw_qualifying)
        .ok_or_else(|| EngineError::overflow("total_qualifying_expenditure", "claim"))?;
    Ok(totals)
}

/// Runs a full calculation with an explicit run timestamp.
///
/// Identical inputs and timestamp produce identical totals, line items and
/// audit trail; only `calculation_id` differs between runs.
pub fn calculate_at(
    rules: &RuleSet,
    table: &Table,
    mapping: &ColumnMapping,
    overrides: &RdOverrides,
    timestamp: DateTime<Utc>,
) -> EngineResult<ClaimResult> {
    let mapped = apply_mapping(table, mapping)?;
    let outcome = aggregate(&mapped)?;

    let line_items = outcome
        .records
        .iter()
        .map(|record| process_record(record, overrides, rules))
        .collect::<EngineResult<Vec<ProcessedLineItem>>>()?;

    let totals = compute_totals(&line_items, rules)?;
    let audit_trail = build_audit_trail(&line_items, timestamp, outcome.warnings);

    info!(
        line_items = totals.line_item_count,
        excluded_items = totals.excluded_item_count,
        skipped_rows = audit_trail.warnings.len(),
        total_qualifying_expenditure = %totals.total_qualifying_expenditure,
        "Claim calculation completed"
    );

    Ok(ClaimResult {
        calculation_id: Uuid::new_v4(),
        timestamp,
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        totals,
        line_items,
        audit_trail,
        credit: None,
    })
}

/// Maps, aggregates and processes a table into a complete [`ClaimResult`].
///
/// # Errors
///
/// - `MappingError` if the mapping cannot be applied
/// - `DataError` if the grouping column is missing, a value is malformed or
///   an amount overflows
/// - `NoDataError` if the table holds no usable rows
///
/// # Example
///
/// ```
/// use rd_claim_engine::calculation::{ColumnMapping, RdOverrides, calculate};
/// use rd_claim_engine::config::RuleSet;
/// use rd_claim_engine::models::{Cell, Table};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let table = Table::from_rows(
///     vec!["Name".to_string(), "Gross".to_string(), "NI".to_string(), "Pension".to_string()],
///     vec![vec![Cell::from("Jane Doe"), Cell::from(1000), Cell::from(100), Cell::from(50)]],
/// )
/// .unwrap();
/// let mapping = ColumnMapping::from_pairs([
///     ("employee_name", "Name"),
///     ("gross_pay", "Gross"),
///     ("employer_ni", "NI"),
///     ("employer_pension", "Pension"),
/// ])
/// .unwrap();
///
/// let result = calculate(&RuleSet::default(), &table, &mapping, &RdOverrides::new()).unwrap();
/// assert_eq!(result.totals.staff_qualifying, Decimal::from(920));
/// assert_eq!(
///     result.totals.total_qualifying_expenditure,
///     Decimal::from_str("1046.96").unwrap()
/// );
/// ```
pub fn calculate(
    rules: &RuleSet,
    table: &Table,
    mapping: &ColumnMapping,
    overrides: &RdOverrides,
) -> EngineResult<ClaimResult> {
    calculate_at(rules, table, mapping, overrides, Utc::now())
}

/// Estimates the tax credit for an accounting period.
///
/// Uses the period rate whose `effective_from` is the latest on or before
/// `period_start`.
pub fn estimate_credit(
    rules: &RuleSet,
    totals: &ClaimTotals,
    period_start: NaiveDate,
) -> EngineResult<CreditEstimate> {
    let rate = rules.rate_for_period(period_start)?;
    Ok(CreditEstimate {
        accounting_period_start: period_start,
        rate: rate.rate,
        rate_effective_from: rate.effective_from,
        credit_amount: rate
            .rate
            .checked_mul(totals.total_qualifying_expenditure)
            .ok_or_else(|| EngineError::overflow("credit_amount", "claim"))?,
    })
}

/// Stateful wrapper around [`calculate`] for staged loading.
///
/// # Example
///
/// ```
/// use rd_claim_engine::calculation::{ClaimCalculator, ColumnMapping, RdOverrides};
/// use rd_claim_engine::config::RuleSet;
/// use rust_decimal::Decimal;
/// use serde_json::json;
///
/// let rules = RuleSet::default();
/// let mut calculator = ClaimCalculator::new(&rules);
/// calculator
///     .load_json(&json!([{"Name": "Jane Doe", "Gross": 1000, "R&D %": 50}]))
///     .unwrap();
/// calculator
///     .apply_mapping(
///         &ColumnMapping::from_pairs([
///             ("employee_name", "Name"),
///             ("gross_pay", "Gross"),
///             ("rd_percentage", "R&D %"),
///         ])
///         .unwrap(),
///     )
///     .unwrap();
///
/// let result = calculator.calculate(&RdOverrides::new()).unwrap();
/// assert_eq!(result.line_items[0].qualifying_cost, Decimal::from(500));
/// ```
#[derive(Debug, Clone)]
pub struct ClaimCalculator<'a> {
    rules: &'a RuleSet,
    table: Option<Table>,
}

impl<'a> ClaimCalculator<'a> {
    /// Creates a calculator with no data loaded.
    pub fn new(rules: &'a RuleSet) -> Self {
        Self { rules, table: None }
    }

    /// Returns the rule set in use.
    pub fn rules(&self) -> &RuleSet {
        self.rules
    }

    /// Loads a table, replacing any previous one.
    pub fn load_table(&mut self, table: Table) {
        self.table = Some(table);
    }

    /// Loads a table from JSON. See [`Table::from_json`].
    pub fn load_json(&mut self, value: &Value) -> EngineResult<()> {
        self.table = Some(Table::from_json(value)?);
        Ok(())
    }

    /// Returns the loaded table, if any.
    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    fn loaded_table(&self) -> EngineResult<&Table> {
        self.table.as_ref().ok_or_else(|| EngineError::NoDataError {
            message: "load a table before mapping or calculating".to_string(),
        })
    }

    /// Renames the loaded table's columns to canonical names.
    pub fn apply_mapping(&mut self, mapping: &ColumnMapping) -> EngineResult<()> {
        let mapped = apply_mapping(self.loaded_table()?, mapping)?;
        self.table = Some(mapped);
        Ok(())
    }

    /// Calculates the claim for the loaded, mapped table.
    pub fn calculate(&self, overrides: &RdOverrides) -> EngineResult<ClaimResult> {
        calculate(self.rules, self.loaded_table()?, &ColumnMapping::new(), overrides)
    }

    /// Looks up the period rate for an accounting period start.
    pub fn period_rate(&self, period_start: NaiveDate) -> EngineResult<&PeriodRate> {
        self.rules.rate_for_period(period_start)
    }

    /// Estimates the tax credit for a finished result.
    pub fn estimate_credit(
        &self,
        result: &ClaimResult,
        period_start: NaiveDate,
    ) -> EngineResult<CreditEstimate> {
        estimate_credit(self.rules, &result.totals, period_start)
    }
}
