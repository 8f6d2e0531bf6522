//! Claim result models.
//!
//! This module contains the [`ClaimResult`] type and its associated structures
//! that capture all outputs from a claim calculation, including line items,
//! totals, the optional credit estimate, and the audit trail.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{FractionSource, ProcessedLineItem};

/// Aggregated totals for a claim, derived from the line items of a run.
///
/// `total_qualifying_expenditure == staff_with_nic + epw_qualifying` and
/// `staff_with_nic == staff_qualifying × (1 + nic_uplift_rate)`.
///
/// # Example
///
/// ```
/// use rd_claim_engine::models::ClaimTotals;
/// use rust_decimal::Decimal;
///
/// let totals = ClaimTotals::default();
/// assert_eq!(totals.total_qualifying_expenditure, Decimal::ZERO);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClaimTotals {
    /// Sum of every line's total cost, including excluded amounts.
    pub total_gross_cost: Decimal,
    /// Sum of bonus and termination payments.
    pub total_excluded: Decimal,
    /// Qualifying cost of directly employed staff, before NIC uplift.
    pub staff_qualifying: Decimal,
    /// Qualifying cost of externally provided workers.
    pub epw_qualifying: Decimal,
    /// `staff_qualifying + epw_qualifying`.
    pub total_qualifying_cost: Decimal,
    /// Total removed by the EPW cap.
    pub epw_cap_reduction: Decimal,
    /// Staff qualifying cost after NIC uplift.
    pub staff_with_nic: Decimal,
    /// The final qualifying expenditure figure.
    pub total_qualifying_expenditure: Decimal,
    /// Number of line items.
    pub line_item_count: usize,
    /// Number of line items flagged as excluded.
    pub excluded_item_count: usize,
}

/// An estimated tax credit for an accounting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditEstimate {
    /// Start of the accounting period the rate was looked up for.
    pub accounting_period_start: NaiveDate,
    /// The applied period rate.
    pub rate: Decimal,
    /// The date the applied rate took effect.
    pub rate_effective_from: NaiveDate,
    /// `rate × total_qualifying_expenditure`.
    pub credit_amount: Decimal,
}

/// What an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// The run began; one per trail.
    CalculationStarted,
    /// One line item's outcome.
    LineItemProcessed,
}

/// One decision recorded in the audit trail.
///
/// Line fields are `None` on the `calculation_started` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the trail, starting at 1.
    pub sequence: u32,
    /// The run timestamp; identical for every entry of a run.
    pub timestamp: DateTime<Utc>,
    /// What this entry records.
    pub action: AuditAction,
    /// The cost subject.
    pub subject: Option<String>,
    /// Total cost of the line, including excluded amounts.
    pub gross_cost: Option<Decimal>,
    /// Eligible base of the line.
    pub eligible_base: Option<Decimal>,
    /// Final qualifying cost of the line.
    pub qualifying_cost: Option<Decimal>,
    /// The applied R&D fraction.
    pub rd_fraction: Option<Decimal>,
    /// Where the fraction came from.
    pub rd_fraction_source: Option<FractionSource>,
    /// Whether the line was flagged as excluded.
    pub excluded: bool,
    /// Exclusion reasons joined with `"; "`.
    pub exclusion_reason: Option<String>,
    /// Whether the EPW cap applied.
    pub epw_capped: bool,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// A non-fatal issue found while reading the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level (e.g., "low", "medium", "high").
    pub severity: String,
}

/// The ordered, replayable record of a run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuditTrail {
    /// Entries in sequence order.
    pub entries: Vec<AuditEntry>,
    /// Warnings raised while reading the input.
    pub warnings: Vec<AuditWarning>,
}

/// The complete result of a claim calculation.
///
/// # Example
///
/// ```
/// use rd_claim_engine::models::{AuditTrail, ClaimResult, ClaimTotals};
/// use chrono::Utc;
/// use uuid::Uuid;
///
/// let result = ClaimResult {
///     calculation_id: Uuid::new_v4(),
///     timestamp: Utc::now(),
///     engine_version: "0.1.0".to_string(),
///     totals: ClaimTotals::default(),
///     line_items: vec![],
///     audit_trail: AuditTrail::default(),
///     credit: None,
/// };
/// assert!(result.line_items.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimResult {
    /// Unique identifier for this calculation.
    pub calculation_id: Uuid,
    /// When the calculation was performed.
    pub timestamp: DateTime<Utc>,
    /// The version of the engine that performed the calculation.
    pub engine_version: String,
    /// Rolled-up totals.
    pub totals: ClaimTotals,
    /// One line per cost subject, in first-appearance order.
    pub line_items: Vec<ProcessedLineItem>,
    /// Audit trail of the run.
    pub audit_trail: AuditTrail,
    /// Credit estimate, when an accounting period start was supplied.
    pub credit: Option<CreditEstimate>,
}
