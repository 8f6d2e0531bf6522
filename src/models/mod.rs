//! Core data models for the R&D claim engine.
//!
//! This module contains the input table, the typed rows and records built from
//! it, and the result structures handed back to callers.

mod claim_result;
mod field;
mod line_item;
mod records;
mod table;

pub use claim_result::{
    AuditAction, AuditEntry, AuditTrail, AuditWarning, ClaimResult, ClaimTotals, CreditEstimate,
};
pub use field::CanonicalField;
pub use line_item::{EPW_CAPPED_TAG, FractionSource, ProcessedLineItem};
pub use records::{AggregatedRecord, RawRow, SubjectType, subject_key};
pub use table::{Cell, Column, Table};
