//! The processed per-subject line item.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::SubjectType;

/// Tag applied to unconnected EPW line items.
pub const EPW_CAPPED_TAG: &str = "epw_capped";

/// Where the applied R&D fraction came from.
///
/// Resolution order is fixed: an override beats a data value, which beats the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FractionSource {
    /// A caller-supplied per-subject override.
    Override,
    /// The last positive fraction found in the subject's rows.
    Data,
    /// The rule set's default fraction.
    Default,
}

/// The outcome of applying the eligibility rules to one aggregated record.
///
/// # Example
///
/// ```
/// use rd_claim_engine::models::ProcessedLineItem;
///
/// let json = r#"{
///     "subject": "Jane Doe", "subject_type": "staff", "connected": false,
///     "gross": "1000", "employer_ni": "100", "employer_pension": "50",
///     "bonus": "0", "termination_payment": "0",
///     "eligible_base": "1150", "total_cost": "1150", "excluded_amount": "0",
///     "excluded": false, "exclusion_reasons": [],
///     "rd_fraction": "0.8", "rd_fraction_source": "data",
///     "uncapped_qualifying_cost": "920", "qualifying_cost": "920",
///     "epw_cap_reduction": "0", "tags": [], "row_count": 1,
///     "period_start": null, "period_end": null
/// }"#;
/// let item: ProcessedLineItem = serde_json::from_str(json).unwrap();
/// assert_eq!(item.exclusion_reason(), None);
/// assert!(!item.is_epw_capped());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedLineItem {
    /// Display name of the cost subject.
    pub subject: String,
    /// Staff or EPW.
    pub subject_type: SubjectType,
    /// Whether the EPW provider is connected.
    pub connected: bool,
    /// Summed gross salary.
    pub gross: Decimal,
    /// Summed employer NI.
    pub employer_ni: Decimal,
    /// Summed employer pension.
    pub employer_pension: Decimal,
    /// Summed bonus.
    pub bonus: Decimal,
    /// Summed termination payments (PILON).
    pub termination_payment: Decimal,
    /// Gross + employer NI + employer pension.
    pub eligible_base: Decimal,
    /// Eligible base + bonus + termination payment.
    pub total_cost: Decimal,
    /// Bonus + termination payment, or the whole `total_cost` when an
    /// excluded item is zeroed by policy.
    pub excluded_amount: Decimal,
    /// True when any exclusion reason applies.
    pub excluded: bool,
    /// Exclusion reasons in the order they were found.
    pub exclusion_reasons: Vec<String>,
    /// The fraction applied to the eligible base.
    pub rd_fraction: Decimal,
    /// Where `rd_fraction` came from.
    pub rd_fraction_source: FractionSource,
    /// Eligible base times fraction, before any EPW cap.
    pub uncapped_qualifying_cost: Decimal,
    /// Final qualifying cost for this subject.
    pub qualifying_cost: Decimal,
    /// Amount removed by the EPW cap.
    pub epw_cap_reduction: Decimal,
    /// Processing tags such as [`EPW_CAPPED_TAG`].
    pub tags: Vec<String>,
    /// Number of source rows folded into this item.
    pub row_count: usize,
    /// Earliest source row date.
    pub period_start: Option<NaiveDate>,
    /// Latest source row date.
    pub period_end: Option<NaiveDate>,
}

impl ProcessedLineItem {
    /// Returns the exclusion reasons joined with `"; "`, or `None` if not excluded.
    pub fn exclusion_reason(&self) -> Option<String> {
        (!self.exclusion_reasons.is_empty()).then(|| self.exclusion_reasons.join("; "))
    }

    /// Returns true if the EPW cap was applied.
    pub fn is_epw_capped(&self) -> bool {
        self.tags.iter().any(|t| t == EPW_CAPPED_TAG)
    }

    /// Returns true for externally provided workers.
    pub fn is_epw(&self) -> bool {
        self.subject_type == SubjectType::Epw
    }
}
