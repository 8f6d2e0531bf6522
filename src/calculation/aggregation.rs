//! Row extraction and per-subject aggregation.
//!
//! This module reads a mapped [`Table`] into typed [`RawRow`]s and folds them
//! into one [`AggregatedRecord`] per cost subject. Rows are grouped by
//! [`subject_key`]: trimmed, whitespace-collapsed and case-insensitive.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::warn;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AggregatedRecord, AuditWarning, CanonicalField, Cell, Column, RawRow, SubjectType, Table,
    subject_key,
};

/// Warning code for rows dropped because they have no subject.
pub const SKIPPED_ROW_WARNING: &str = "SKIPPED_ROW";

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// The records produced by [`aggregate`] and any rows it skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationOutcome {
    /// One record per subject, in first-appearance order.
    pub records: Vec<AggregatedRecord>,
    /// One warning per skipped row.
    pub warnings: Vec<AuditWarning>,
}

/// The canonical columns present in a table, looked up once.
struct FieldColumns<'a> {
    table: &'a Table,
}

impl<'a> FieldColumns<'a> {
    fn get(&self, field: CanonicalField) -> Option<&'a Column> {
        self.table.column(field.as_str())
    }

    fn cell(&self, field: CanonicalField, row: usize) -> Option<&'a Cell> {
        self.get(field).map(|c| c.get(row))
    }

    fn decimal(&self, field: CanonicalField, row: usize) -> EngineResult<Option<Decimal>> {
        match self.cell(field, row) {
            None => Ok(None),
            Some(cell) => cell
                .as_decimal()
                .map_err(|message| EngineError::data_at(field.as_str(), row + 1, message)),
        }
    }

    fn amount(&self, field: CanonicalField, row: usize) -> EngineResult<Decimal> {
        Ok(self.decimal(field, row)?.unwrap_or(Decimal::ZERO))
    }
}

/// Reads every row of a mapped table into a [`RawRow`].
///
/// Rows with a blank `employee_name` are skipped and reported as
/// `SKIPPED_ROW` warnings. Monetary columns that are absent, and empty
/// monetary cells, read as zero.
///
/// # Errors
///
/// - `NoDataError` if the table has no rows
/// - `DataError` if the `employee_name` column is missing, or a cell holds a
///   value that cannot be read as its field's type
pub fn extract_rows(table: &Table) -> EngineResult<(Vec<RawRow>, Vec<AuditWarning>)> {
    if table.is_empty() {
        return Err(EngineError::NoDataError {
            message: "the table has no rows".to_string(),
        });
    }

    let columns = FieldColumns { table };
    let subjects = columns
        .get(CanonicalField::EmployeeName)
        .ok_or_else(|| EngineError::DataError {
            column: CanonicalField::EmployeeName.to_string(),
            row: None,
            message: "grouping column is missing; map a source column to employee_name"
                .to_string(),
        })?;

    let mut rows = Vec::with_capacity(table.row_count());
    let mut warnings = Vec::new();

    for index in 0..table.row_count() {
        let Some(subject) = subjects.get(index).as_text() else {
            warn!(row = index + 1, "Skipping row with no employee name");
            warnings.push(AuditWarning {
                code: SKIPPED_ROW_WARNING.to_string(),
                message: format!("Row {} has no employee name and was skipped", index + 1),
                severity: "low".to_string(),
            });
            continue;
        };

        rows.push(read_row(&columns, index, subject)?);
    }

    Ok((rows, warnings))
}

fn read_row(columns: &FieldColumns<'_>, index: usize, subject: String) -> EngineResult<RawRow> {
    let date = match columns.cell(CanonicalField::Date, index) {
        None => None,
        Some(cell) => cell
            .as_date()
            .map_err(|message| EngineError::data_at("date", index + 1, message))?,
    };

    let rd_fraction = columns
        .decimal(CanonicalField::RdPercentage, index)?
        .map(|value| normalize_fraction(value, index))
        .transpose()?;

    let subject_type = match columns.cell(CanonicalField::WorkerType, index) {
        None => None,
        Some(cell) => read_subject_type(cell, index)?,
    };

    let connected = match columns.cell(CanonicalField::EpwConnected, index) {
        None => None,
        Some(cell) => cell
            .as_flag()
            .map_err(|message| EngineError::data_at("epw_connected", index + 1, message))?,
    };

    Ok(RawRow {
        subject,
        date,
        gross: columns.amount(CanonicalField::GrossPay, index)?,
        employer_ni: columns.amount(CanonicalField::EmployerNi, index)?,
        employer_pension: columns.amount(CanonicalField::EmployerPension, index)?,
        bonus: columns.amount(CanonicalField::Bonus, index)?,
        termination_payment: columns.amount(CanonicalField::Pilon, index)?,
        rd_fraction,
        subject_type,
        connected,
        description: columns
            .cell(CanonicalField::Description, index)
            .and_then(Cell::as_text),
    })
}

/// Reads a fraction, treating values above 1 (up to 100) as percentages.
fn normalize_fraction(value: Decimal, index: usize) -> EngineResult<Decimal> {
    if value < Decimal::ZERO || value > ONE_HUNDRED {
        return Err(EngineError::data_at(
            "rd_percentage",
            index + 1,
            format!("{} is outside 0-100", value),
        ));
    }
    if value > Decimal::ONE {
        Ok(value / ONE_HUNDRED)
    } else {
        Ok(value)
    }
}

fn read_subject_type(cell: &Cell, index: usize) -> EngineResult<Option<SubjectType>> {
    match cell {
        Cell::Bool(true) => Ok(Some(SubjectType::Epw)),
        Cell::Bool(false) => Ok(Some(SubjectType::Staff)),
        other => match other.as_text() {
            None => Ok(None),
            Some(text) => SubjectType::parse(&text).map(Some).ok_or_else(|| {
                EngineError::data_at(
                    "worker_type",
                    index + 1,
                    format!("'{}' is not a recognised worker type", text),
                )
            }),
        },
    }
}

/// Groups rows by subject in first-appearance order.
fn group_rows(rows: Vec<RawRow>) -> Vec<Vec<RawRow>> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<RawRow>> = Vec::new();

    for row in rows {
        let key = subject_key(&row.subject);
        match positions.get(&key) {
            Some(&position) => groups[position].push(row),
            None => {
                positions.insert(key, groups.len());
                groups.push(vec![row]);
            }
        }
    }

    groups
}

/// Adds `amount` to a running total, failing if the sum cannot be represented.
fn add_amount(
    total: Decimal,
    amount: Decimal,
    field: CanonicalField,
    subject: &str,
) -> EngineResult<Decimal> {
    total
        .checked_add(amount)
        .ok_or_else(|| EngineError::overflow(field.as_str(), subject))
}

/// Folds one subject's rows into a single record.
///
/// Amounts are summed; the fraction, worker type and connected flag take the
/// last value present in row order.
fn fold_group(rows: &[RawRow]) -> EngineResult<AggregatedRecord> {
    let first = rows.first().ok_or_else(|| EngineError::NoDataError {
        message: "cannot aggregate an empty group".to_string(),
    })?;

    let record = rows.iter().try_fold(
        AggregatedRecord::new(first.subject.clone()),
        |mut acc, row| -> EngineResult<AggregatedRecord> {
            let subject = acc.subject.clone();
            acc.gross = add_amount(acc.gross, row.gross, CanonicalField::GrossPay, &subject)?;
            acc.employer_ni =
                add_amount(acc.employer_ni, row.employer_ni, CanonicalField::EmployerNi, &subject)?;
            acc.employer_pension = add_amount(
                acc.employer_pension,
                row.employer_pension,
                CanonicalField::EmployerPension,
                &subject,
            )?;
            acc.bonus = add_amount(acc.bonus, row.bonus, CanonicalField::Bonus, &subject)?;
            acc.termination_payment = add_amount(
                acc.termination_payment,
                row.termination_payment,
                CanonicalField::Pilon,
                &subject,
            )?;
            if let Some(fraction) = row.rd_fraction {
                acc.rd_fraction = Some(fraction);
            }
            if let Some(subject_type) = row.subject_type {
                acc.subject_type = subject_type;
            }
            if let Some(connected) = row.connected {
                acc.connected = connected;
            }
            if let Some(date) = row.date {
                acc.period_start = Some(acc.period_start.map_or(date, |d| d.min(date)));
                acc.period_end = Some(acc.period_end.map_or(date, |d| d.max(date)));
            }
            if let Some(description) = &row.description {
                if !acc.descriptions.contains(description) {
                    acc.descriptions.push(description.clone());
                }
            }
            acc.row_count += 1;
            Ok(acc)
        },
    )?;

    let totals = [
        (CanonicalField::GrossPay, record.gross),
        (CanonicalField::EmployerNi, record.employer_ni),
        (CanonicalField::EmployerPension, record.employer_pension),
        (CanonicalField::Bonus, record.bonus),
        (CanonicalField::Pilon, record.termination_payment),
    ];
    if let Some((field, total)) = totals.iter().find(|(_, total)| *total < Decimal::ZERO) {
        return Err(EngineError::DataError {
            column: field.to_string(),
            row: None,
            message: format!("total for '{}' is negative ({})", record.subject, total),
        });
    }

    Ok(record)
}

/// Aggregates a mapped table into one record per cost subject.
///
/// # Errors
///
/// Everything [`extract_rows`] can return, plus `DataError` when a subject's
/// summed component is negative and `NoDataError` when every row was skipped.
///
/// # Example
///
/// ```
/// use rd_claim_engine::calculation::aggregate;
/// use rd_claim_engine::models::{Cell, Table};
/// use rust_decimal::Decimal;
///
/// let table = Table::from_rows(
///     vec!["employee_name".to_string(), "gross_pay".to_string()],
///     vec![
///         vec![Cell::from("Jane Doe"), Cell::from(500)],
///         vec![Cell::from("jane  doe"), Cell::from(700)],
///     ],
/// )
/// .unwrap();
///
/// let outcome = aggregate(&table).unwrap();
/// assert_eq!(outcome.records.len(), 1);
/// assert_eq!(outcome.records[0].gross, Decimal::from(1200));
/// ```
pub fn aggregate(table: &Table) -> EngineResult<AggregationOutcome> {
    let (rows, warnings) = extract_rows(table)?;
    if rows.is_empty() {
        return Err(EngineError::NoDataError {
            message: "every row was skipped for having no employee name".to_string(),
        });
    }

    let records = group_rows(rows)
        .iter()
        .map(|group| fold_group(group))
        .collect::<EngineResult<Vec<_>>>()?;

    Ok(AggregationOutcome { records, warnings })
}
