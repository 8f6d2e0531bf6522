//! Canonical column names understood by the engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A column the engine knows how to read after mapping.
///
/// # Example
///
/// ```
/// use rd_claim_engine::models::CanonicalField;
/// use std::str::FromStr;
///
/// let field = CanonicalField::from_str("gross_pay").unwrap();
/// assert_eq!(field, CanonicalField::GrossPay);
/// assert_eq!(field.as_str(), "gross_pay");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    /// Name of the cost subject; the grouping key.
    EmployeeName,
    /// Date of the pay period or cost.
    Date,
    /// Gross salary.
    GrossPay,
    /// Employer National Insurance contributions.
    EmployerNi,
    /// Employer pension contributions.
    EmployerPension,
    /// Bonus payments; never eligible.
    Bonus,
    /// Payment in lieu of notice and other termination payments; never eligible.
    Pilon,
    /// Share of the cost attributable to R&D (fraction or percentage).
    RdPercentage,
    /// Staff or externally provided worker.
    WorkerType,
    /// Whether an EPW provider is connected to the claimant.
    EpwConnected,
    /// Free-text description, checked against exclusion keywords.
    Description,
}

impl CanonicalField {
    /// Every canonical field, in reading order.
    pub const ALL: [CanonicalField; 11] = [
        CanonicalField::EmployeeName,
        CanonicalField::Date,
        CanonicalField::GrossPay,
        CanonicalField::EmployerNi,
        CanonicalField::EmployerPension,
        CanonicalField::Bonus,
        CanonicalField::Pilon,
        CanonicalField::RdPercentage,
        CanonicalField::WorkerType,
        CanonicalField::EpwConnected,
        CanonicalField::Description,
    ];

    /// The fields summed during aggregation.
    pub const MONETARY: [CanonicalField; 5] = [
        CanonicalField::GrossPay,
        CanonicalField::EmployerNi,
        CanonicalField::EmployerPension,
        CanonicalField::Bonus,
        CanonicalField::Pilon,
    ];

    /// Returns the canonical column header.
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::EmployeeName => "employee_name",
            CanonicalField::Date => "date",
            CanonicalField::GrossPay => "gross_pay",
            CanonicalField::EmployerNi => "employer_ni",
            CanonicalField::EmployerPension => "employer_pension",
            CanonicalField::Bonus => "bonus",
            CanonicalField::Pilon => "pilon",
            CanonicalField::RdPercentage => "rd_percentage",
            CanonicalField::WorkerType => "worker_type",
            CanonicalField::EpwConnected => "epw_connected",
            CanonicalField::Description => "description",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalField {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CanonicalField::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| EngineError::mapping(format!("unknown canonical field '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str_round_trips_through_from_str() {
        for field in CanonicalField::ALL {
            assert_eq!(CanonicalField::from_str(field.as_str()).unwrap(), field);
        }
    }

    #[test]
    fn test_unknown_field_is_mapping_error() {
        assert!(matches!(
            CanonicalField::from_str("salary"),
            Err(EngineError::MappingError { .. })
        ));
    }

    #[test]
    fn test_serde_name_matches_header() {
        let json = serde_json::to_string(&CanonicalField::EmployerPension).unwrap();
        assert_eq!(json, "\"employer_pension\"");
    }
}
