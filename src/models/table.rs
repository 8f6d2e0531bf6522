//! In-memory tabular dataset handed to the engine.
//!
//! File parsing happens outside the engine; callers build a [`Table`] directly
//! or from JSON with [`Table::from_json`].

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::{EngineError, EngineResult};

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Cell {
    /// No value.
    #[default]
    Empty,
    /// Free text, including numbers or dates that arrived as strings.
    Text(String),
    /// An exact decimal number.
    Number(Decimal),
    /// A boolean.
    Bool(bool),
    /// A calendar date.
    Date(NaiveDate),
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

impl Cell {
    /// Converts a scalar JSON value into a cell.
    ///
    /// Numbers are converted exactly through their textual form, never via `f64`.
    /// Arrays and objects are rejected with `MappingError`.
    pub fn from_json(value: &Value) -> EngineResult<Self> {
        match value {
            Value::Null => Ok(Cell::Empty),
            Value::Bool(b) => Ok(Cell::Bool(*b)),
            Value::String(s) => Ok(Cell::Text(s.clone())),
            Value::Number(n) => {
                let text = n.to_string();
                Decimal::from_str(&text)
                    .or_else(|_| Decimal::from_scientific(&text))
                    .map(Cell::Number)
                    .map_err(|_| EngineError::mapping(format!("number {} is out of range", text)))
            }
            Value::Array(_) | Value::Object(_) => Err(EngineError::mapping(
                "cells must be scalar values, found a nested array or object",
            )),
        }
    }

    /// Returns true for [`Cell::Empty`] and whitespace-only text.
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Reads the cell as trimmed text; empty cells yield `None`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Cell::Number(n) => Some(n.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
            Cell::Date(d) => Some(d.to_string()),
        }
    }

    /// Reads the cell as a monetary or numeric amount.
    ///
    /// Text may carry a leading `£` and thousands separators. Empty cells
    /// yield `Ok(None)`; anything else that is not a number is an error.
    pub fn as_decimal(&self) -> Result<Option<Decimal>, String> {
        match self {
            Cell::Empty => Ok(None),
            Cell::Number(n) => Ok(Some(*n)),
            Cell::Text(s) => {
                let cleaned: String = s.trim().chars().filter(|c| *c != '£' && *c != ',').collect();
                if cleaned.is_empty() {
                    return Ok(None);
                }
                Decimal::from_str(&cleaned)
                    .or_else(|_| Decimal::from_scientific(&cleaned))
                    .map(Some)
                    .map_err(|_| format!("'{}' is not a number", s.trim()))
            }
            Cell::Bool(b) => Err(format!("'{}' is not a number", b)),
            Cell::Date(d) => Err(format!("'{}' is not a number", d)),
        }
    }

    /// Reads the cell as a date (`YYYY-MM-DD`, `DD/MM/YYYY`, `DD-MM-YYYY` or an ISO timestamp).
    pub fn as_date(&self) -> Result<Option<NaiveDate>, String> {
        match self {
            Cell::Empty => Ok(None),
            Cell::Date(d) => Ok(Some(*d)),
            Cell::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(None);
                }
                DATE_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                    .or_else(|| {
                        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                            .ok()
                            .map(|dt| dt.date())
                    })
                    .map(Some)
                    .ok_or_else(|| format!("'{}' is not a recognised date", s))
            }
            other => Err(format!("{:?} is not a date", other)),
        }
    }

    /// Reads the cell as a yes/no flag.
    pub fn as_flag(&self) -> Result<Option<bool>, String> {
        match self {
            Cell::Empty => Ok(None),
            Cell::Bool(b) => Ok(Some(*b)),
            Cell::Number(n) if n.is_zero() => Ok(Some(false)),
            Cell::Number(n) if *n == Decimal::ONE => Ok(Some(true)),
            Cell::Text(s) => match s.trim().to_lowercase().as_str() {
                "" => Ok(None),
                "true" | "yes" | "y" | "1" | "connected" => Ok(Some(true)),
                "false" | "no" | "n" | "0" | "unconnected" => Ok(Some(false)),
                _ => Err(format!("'{}' is not a yes/no value", s.trim())),
            },
            other => Err(format!("{:?} is not a yes/no value", other)),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<Decimal> for Cell {
    fn from(value: Decimal) -> Self {
        Cell::Number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(Decimal::from(value))
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Cell::Date(value)
    }
}

static EMPTY_CELL: Cell = Cell::Empty;

/// A named column of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    cells: Vec<Cell>,
}

impl Column {
    /// Creates a column.
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    /// Returns the column header.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns all cells in row order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Returns the cell at `row`, or `Empty` past the end.
    pub fn get(&self, row: usize) -> &Cell {
        self.cells.get(row).unwrap_or(&EMPTY_CELL)
    }
}

/// A column-oriented table with unique headers and equal-length columns.
///
/// # Example
///
/// ```
/// use rd_claim_engine::models::{Cell, Table};
///
/// let table = Table::from_rows(
///     vec!["Name".to_string(), "Gross Pay".to_string()],
///     vec![vec![Cell::from("Jane Doe"), Cell::from(1000)]],
/// )
/// .unwrap();
/// assert_eq!(table.row_count(), 1);
/// assert!(table.has_column("Gross Pay"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Builds a table from columns.
    ///
    /// Returns `MappingError` if headers repeat or columns differ in length.
    pub fn new(columns: Vec<Column>) -> EngineResult<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(EngineError::mapping(format!(
                    "duplicate column header '{}'",
                    column.name
                )));
            }
        }

        let row_count = columns.first().map(|c| c.cells.len()).unwrap_or(0);
        if let Some(column) = columns.iter().find(|c| c.cells.len() != row_count) {
            return Err(EngineError::mapping(format!(
                "column '{}' has {} rows, expected {}",
                column.name,
                column.cells.len(),
                row_count
            )));
        }

        Ok(Self { columns, row_count })
    }

    /// Builds a table from a header row and row-major data.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> EngineResult<Self> {
        let mut columns: Vec<Vec<Cell>> = headers.iter().map(|_| Vec::with_capacity(rows.len())).collect();

        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != headers.len() {
                return Err(EngineError::mapping(format!(
                    "row {} has {} cells, expected {}",
                    index + 1,
                    row.len(),
                    headers.len()
                )));
            }
            for (column, cell) in columns.iter_mut().zip(row) {
                column.push(cell);
            }
        }

        Self::new(
            headers
                .into_iter()
                .zip(columns)
                .map(|(name, cells)| Column::new(name, cells))
                .collect(),
        )
    }

    /// Builds a table from JSON.
    ///
    /// Accepts either `{"columns": [...], "rows": [[...], ...]}` or an array of
    /// flat objects (one per row; headers are the union of keys in first-seen
    /// order and missing keys become empty cells). Anything else is not
    /// tabular and fails with `MappingError`.
    pub fn from_json(value: &Value) -> EngineResult<Self> {
        match value {
            Value::Object(map) => {
                let headers = map
                    .get("columns")
                    .and_then(Value::as_array)
                    .ok_or_else(|| EngineError::mapping("input is not tabular: missing 'columns' array"))?
                    .iter()
                    .map(|h| {
                        h.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| EngineError::mapping("column headers must be strings"))
                    })
                    .collect::<EngineResult<Vec<String>>>()?;

                let rows = match map.get("rows") {
                    None | Some(Value::Null) => Vec::new(),
                    Some(Value::Array(rows)) => rows
                        .iter()
                        .map(|row| match row {
                            Value::Array(cells) => cells
                                .iter()
                                .map(Cell::from_json)
                                .collect::<EngineResult<Vec<Cell>>>(),
                            _ => Err(EngineError::mapping("input is not tabular: each row must be an array")),
                        })
                        .collect::<EngineResult<Vec<Vec<Cell>>>>()?,
                    Some(_) => {
                        return Err(EngineError::mapping("input is not tabular: 'rows' must be an array"));
                    }
                };

                Self::from_rows(headers, rows)
            }
            Value::Array(records) => {
                let mut headers: Vec<String> = Vec::new();
                for record in records {
                    let object = record.as_object().ok_or_else(|| {
                        EngineError::mapping("input is not tabular: each record must be an object")
                    })?;
                    for key in object.keys() {
                        if !headers.contains(key) {
                            headers.push(key.clone());
                        }
                    }
                }

                let rows = records
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|object| {
                        headers
                            .iter()
                            .map(|h| object.get(h).map(Cell::from_json).unwrap_or(Ok(Cell::Empty)))
                            .collect::<EngineResult<Vec<Cell>>>()
                    })
                    .collect::<EngineResult<Vec<Vec<Cell>>>>()?;

                Self::from_rows(headers, rows)
            }
            _ => Err(EngineError::mapping(
                "input is not tabular: expected an object with 'columns' and 'rows' or an array of records",
            )),
        }
    }

    /// Returns the column headers in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Returns the named column, if present.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns true if the named column is present.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Returns the number of data rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns true if the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Returns a copy with columns renamed according to `renames` (old to new).
    ///
    /// Every rename is applied at once, so one column may take the name
    /// another gives up. Returns `MappingError` if the result repeats a header.
    pub(crate) fn with_renamed_columns(&self, renames: &HashMap<&str, &str>) -> EngineResult<Self> {
        let columns = self
            .columns
            .iter()
            .map(|column| {
                let name = renames
                    .get(column.name.as_str())
                    .map_or_else(|| column.name.clone(), |to| to.to_string());
                Column::new(name, column.cells.clone())
            })
            .collect();
        Self::new(columns)
    }
}
