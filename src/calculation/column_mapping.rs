//! Column mapping functionality.
//!
//! This module provides [`ColumnMapping`] and [`apply_mapping`], which rename
//! an input table's source headers to the engine's canonical field names.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};
use crate::models::{CanonicalField, Table};

/// A validated mapping from canonical field to source column header.
///
/// # Example
///
/// ```
/// use rd_claim_engine::calculation::ColumnMapping;
/// use rd_claim_engine::models::CanonicalField;
///
/// let mapping = ColumnMapping::from_pairs([
///     ("employee_name", "Name"),
///     ("gross_pay", "Gross Salary"),
/// ])
/// .unwrap();
/// assert_eq!(mapping.source_for(CanonicalField::GrossPay), Some("Gross Salary"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnMapping {
    fields: BTreeMap<CanonicalField, String>,
}

impl ColumnMapping {
    /// Creates an empty mapping; applying it leaves a table unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a mapping from `(canonical field name, source column)` pairs.
    ///
    /// Returns `MappingError` if a key is not a canonical field name, a field
    /// is mapped twice, or two fields share one source column.
    pub fn from_pairs<I, K, V>(pairs: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut mapping = Self::new();
        for (key, source) in pairs {
            let field = CanonicalField::from_str(key.as_ref().trim())?;
            mapping.insert(field, source)?;
        }
        Ok(mapping)
    }

    /// Maps `field` to `source`.
    pub fn insert(&mut self, field: CanonicalField, source: impl Into<String>) -> EngineResult<()> {
        let source = source.into();
        if source.trim().is_empty() {
            return Err(EngineError::mapping(format!(
                "source column for '{}' must not be blank",
                field
            )));
        }
        if self.fields.contains_key(&field) {
            return Err(EngineError::mapping(format!("'{}' is mapped more than once", field)));
        }
        if let Some((other, _)) = self.fields.iter().find(|(_, s)| **s == source) {
            return Err(EngineError::mapping(format!(
                "column '{}' is mapped to both '{}' and '{}'",
                source, other, field
            )));
        }
        self.fields.insert(field, source);
        Ok(())
    }

    /// Builder form of [`ColumnMapping::insert`].
    pub fn with(mut self, field: CanonicalField, source: impl Into<String>) -> EngineResult<Self> {
        self.insert(field, source)?;
        Ok(self)
    }

    /// Returns the source column mapped to `field`.
    pub fn source_for(&self, field: CanonicalField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// Iterates `(field, source)` pairs in canonical field order.
    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &str)> {
        self.fields.iter().map(|(f, s)| (*f, s.as_str()))
    }

    /// Returns true if nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Renames mapped source columns to their canonical names.
///
/// All renames happen in one pass, so a source column may carry the name of
/// another field's canonical column. Fields whose source column is absent are
/// skipped. A canonical column whose source is gone is treated as already
/// renamed and keeps its name, so applying the same mapping twice yields the
/// same table.
///
/// # Errors
///
/// Returns `MappingError` if the renamed table would repeat a header.
pub fn apply_mapping(table: &Table, mapping: &ColumnMapping) -> EngineResult<Table> {
    let settled: HashSet<&str> = mapping
        .iter()
        .filter(|(field, source)| !table.has_column(source) && table.has_column(field.as_str()))
        .map(|(field, _)| field.as_str())
        .collect();

    let renames: HashMap<&str, &str> = mapping
        .iter()
        .filter(|(_, source)| table.has_column(source) && !settled.contains(source))
        .map(|(field, source)| (source, field.as_str()))
        .collect();

    table.with_renamed_columns(&renames)
}
