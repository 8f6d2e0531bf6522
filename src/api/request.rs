//! Request types for the R&D claim engine API.
//!
//! This module defines the JSON request structure for the `/calculate` endpoint.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::calculation::{ColumnMapping, RdOverrides};
use crate::error::EngineResult;
use crate::models::Table;

/// Request body for the `/calculate` endpoint.
///
/// `table` is either `{"columns": [...], "rows": [[...]]}` or an array of
/// flat records; see [`Table::from_json`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationRequest {
    /// The cost data.
    pub table: Value,
    /// Canonical field name to source column header.
    #[serde(default)]
    pub mapping: BTreeMap<String, String>,
    /// Subject name to R&D fraction in [0, 1].
    #[serde(default)]
    pub rd_overrides: BTreeMap<String, Decimal>,
    /// Start of the accounting period; when given, a credit estimate is added.
    #[serde(default)]
    pub accounting_period_start: Option<NaiveDate>,
}

impl CalculationRequest {
    /// Builds the engine table from the request body.
    pub fn table(&self) -> EngineResult<Table> {
        Table::from_json(&self.table)
    }

    /// Validates the column mapping.
    pub fn column_mapping(&self) -> EngineResult<ColumnMapping> {
        ColumnMapping::from_pairs(self.mapping.iter().map(|(k, v)| (k.as_str(), v.clone())))
    }

    /// Validates the per-subject overrides.
    pub fn overrides(&self) -> EngineResult<RdOverrides> {
        RdOverrides::from_pairs(self.rd_overrides.iter().map(|(k, v)| (k.as_str(), *v)))
    }
}
