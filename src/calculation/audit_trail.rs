//! Audit trail construction.
//!
//! The trail is built from finished line items and never feeds back into the
//! calculation.

use chrono::{DateTime, Utc};

use crate::models::{
    AuditAction, AuditEntry, AuditTrail, AuditWarning, FractionSource, ProcessedLineItem,
};

fn source_label(source: FractionSource) -> &'static str {
    match source {
        FractionSource::Override => "manual override",
        FractionSource::Data => "source data",
        FractionSource::Default => "system default",
    }
}

fn line_reasoning(item: &ProcessedLineItem) -> String {
    let mut reasoning = format!(
        "Eligible base £{} × R&D fraction {} ({}) = £{}",
        item.eligible_base.normalize(),
        item.rd_fraction.normalize(),
        source_label(item.rd_fraction_source),
        item.uncapped_qualifying_cost.normalize()
    );
    if item.is_epw_capped() {
        reasoning.push_str(&format!(
            "; unconnected EPW capped to £{} (reduced by £{})",
            (item.uncapped_qualifying_cost - item.epw_cap_reduction).normalize(),
            item.epw_cap_reduction.normalize()
        ));
    }
    if let Some(reason) = item.exclusion_reason() {
        reasoning.push_str(&format!("; excluded: {}", reason));
    }
    reasoning.push_str(&format!("; qualifying £{}", item.qualifying_cost.normalize()));
    reasoning
}

/// Builds the audit trail for a run.
///
/// Emits one `calculation_started` entry, then one `line_item_processed`
/// entry per item in the given order. Sequence numbers start at 1 and every
/// entry carries `timestamp`.
///
/// # Example
///
/// ```
/// use rd_claim_engine::calculation::build_audit_trail;
/// use rd_claim_engine::models::AuditAction;
/// use chrono::Utc;
///
/// let trail = build_audit_trail(&[], Utc::now(), vec![]);
/// assert_eq!(trail.entries.len(), 1);
/// assert_eq!(trail.entries[0].action, AuditAction::CalculationStarted);
/// assert_eq!(trail.entries[0].reasoning, "Processing 0 line items");
/// ```
pub fn build_audit_trail(
    line_items: &[ProcessedLineItem],
    timestamp: DateTime<Utc>,
    warnings: Vec<AuditWarning>,
) -> AuditTrail {
    let mut entries = Vec::with_capacity(line_items.len() + 1);
    entries.push(AuditEntry {
        sequence: 1,
        timestamp,
        action: AuditAction::CalculationStarted,
        subject: None,
        gross_cost: None,
        eligible_base: None,
        qualifying_cost: None,
        rd_fraction: None,
        rd_fraction_source: None,
        excluded: false,
        exclusion_reason: None,
        epw_capped: false,
        reasoning: format!("Processing {} line items", line_items.len()),
    });

    for (sequence, item) in (2u32..).zip(line_items) {
        entries.push(AuditEntry {
            sequence,
            timestamp,
            action: AuditAction::LineItemProcessed,
            subject: Some(item.subject.clone()),
            gross_cost: Some(item.total_cost),
            eligible_base: Some(item.eligible_base),
            qualifying_cost: Some(item.qualifying_cost),
            rd_fraction: Some(item.rd_fraction),
            rd_fraction_source: Some(item.rd_fraction_source),
            excluded: item.excluded,
            exclusion_reason: item.exclusion_reason(),
            epw_capped: item.is_epw_capped(),
            reasoning: line_reasoning(item),
        });
    }

    AuditTrail { entries, warnings }
}
