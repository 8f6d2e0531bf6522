//! Calculation logic for the R&D claim engine.
//!
//! This module contains the pipeline stages in the order they run: column
//! mapping, aggregation per cost subject, line item processing, the claim
//! totals rollup and audit trail construction.

mod aggregation;
mod audit_trail;
mod claim_calculator;
mod column_mapping;
mod line_processor;

pub use aggregation::{AggregationOutcome, SKIPPED_ROW_WARNING, aggregate, extract_rows};
pub use audit_trail::build_audit_trail;
pub use claim_calculator::{
    ClaimCalculator, calculate, calculate_at, compute_totals, estimate_credit,
};
pub use column_mapping::{ColumnMapping, apply_mapping};
pub use line_processor::{RdOverrides, process_record, resolve_fraction};
