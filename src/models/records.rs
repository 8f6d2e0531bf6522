//! Typed input rows and per-subject aggregated records.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Whether a cost subject is directly employed or externally provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    /// Directly employed staff.
    #[default]
    Staff,
    /// Externally provided worker.
    Epw,
}

impl SubjectType {
    /// Parses a worker-type label such as `"staff"`, `"EPW"` or
    /// `"Externally Provided Worker"`.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "staff" | "employee" | "ordinary" => Some(SubjectType::Staff),
            "epw" | "external" | "externally provided worker" => Some(SubjectType::Epw),
            _ => None,
        }
    }
}

/// Normalizes a subject name into its grouping key.
///
/// Trims, collapses internal whitespace and lowercases, so `" Jane  DOE"`
/// and `"jane doe"` group together.
pub fn subject_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// One row of the mapped source table.
///
/// Monetary fields default to zero when their column is absent or the cell is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// Trimmed subject name.
    pub subject: String,
    /// The row's date, if any.
    pub date: Option<NaiveDate>,
    /// Gross salary.
    pub gross: Decimal,
    /// Employer National Insurance.
    pub employer_ni: Decimal,
    /// Employer pension contributions.
    pub employer_pension: Decimal,
    /// Bonus.
    pub bonus: Decimal,
    /// Payment in lieu of notice / termination payment.
    pub termination_payment: Decimal,
    /// R&D fraction in [0, 1], if the row carries one.
    pub rd_fraction: Option<Decimal>,
    /// Worker type, if the row carries one.
    pub subject_type: Option<SubjectType>,
    /// EPW connection flag, if the row carries one.
    pub connected: Option<bool>,
    /// Free-text description.
    pub description: Option<String>,
}

/// All rows for one cost subject folded into a single record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedRecord {
    /// Display name (first spelling seen).
    pub subject: String,
    /// Grouping key, see [`subject_key`].
    pub subject_key: String,
    /// Summed gross salary.
    pub gross: Decimal,
    /// Summed employer NI.
    pub employer_ni: Decimal,
    /// Summed employer pension.
    pub employer_pension: Decimal,
    /// Summed bonus.
    pub bonus: Decimal,
    /// Summed termination payments.
    pub termination_payment: Decimal,
    /// R&D fraction from the last row that carried one.
    pub rd_fraction: Option<Decimal>,
    /// Staff or EPW.
    pub subject_type: SubjectType,
    /// Whether the EPW provider is connected.
    pub connected: bool,
    /// Earliest row date.
    pub period_start: Option<NaiveDate>,
    /// Latest row date.
    pub period_end: Option<NaiveDate>,
    /// Number of source rows folded in.
    pub row_count: usize,
    /// Distinct descriptions in first-seen order.
    pub descriptions: Vec<String>,
}

impl AggregatedRecord {
    /// Creates an empty staff record for a subject.
    pub fn new(subject: impl Into<String>) -> Self {
        let subject = subject.into();
        Self {
            subject_key: subject_key(&subject),
            subject,
            gross: Decimal::ZERO,
            employer_ni: Decimal::ZERO,
            employer_pension: Decimal::ZERO,
            bonus: Decimal::ZERO,
            termination_payment: Decimal::ZERO,
            rd_fraction: None,
            subject_type: SubjectType::Staff,
            connected: false,
            period_start: None,
            period_end: None,
            row_count: 0,
            descriptions: Vec::new(),
        }
    }

    /// Returns true for externally provided workers.
    pub fn is_epw(&self) -> bool {
        self.subject_type == SubjectType::Epw
    }

    /// Returns true if the EPW cap applies (unconnected EPW).
    pub fn is_capped_epw(&self) -> bool {
        self.is_epw() && !self.connected
    }
}
