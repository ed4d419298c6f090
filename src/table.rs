//! Tabular containers for shadow datasets and the target record.
//!
//! A `Table` holds the raw (un-encoded) rows of one synthetic shadow
//! dataset; a `Record` is the single target row fixed for a whole attack
//! run. Both are read-only inputs to the extraction engine.

use crate::error::{AttackError, Result};
use crate::schema::Metadata;

/// A single table cell.
///
/// Categorical cells may be `Text` or `Int` (integer-coded categories are
/// common in released tabular data); `label()` gives the canonical string
/// form used for vocabulary lookup. Continuous cells must be numeric.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Numeric view of the cell, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Text(_) => None,
        }
    }

    /// Canonical string form, used to match vocabulary entries.
    pub fn label(&self) -> String {
        match self {
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

/// An ordered table of rows sharing one schema.
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table, validating that every row has one value per column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(AttackError::SchemaMismatch(format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Column names in table order.
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column in this table.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// A single row.
    pub fn row(&self, index: usize) -> &[Value] {
        &self.rows[index]
    }

    /// All rows in order.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Validate that this table's schema matches the run metadata exactly:
    /// same column names, same order.
    pub fn check_schema(&self, metadata: &Metadata) -> Result<()> {
        let expected = metadata.column_names();
        let actual: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        if actual != expected {
            return Err(AttackError::SchemaMismatch(format!(
                "dataset columns {:?} do not match metadata columns {:?}",
                actual, expected
            )));
        }
        Ok(())
    }
}

/// The target record: exactly one row, fixed for the whole attack run.
#[derive(Debug, Clone)]
pub struct Record {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Record {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Result<Self> {
        if columns.len() != values.len() {
            return Err(AttackError::SchemaMismatch(format!(
                "record has {} values for {} columns",
                values.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, values })
    }

    /// Extract one row of a table as a record.
    pub fn from_table_row(table: &Table, row: usize) -> Result<Self> {
        if row >= table.num_rows() {
            return Err(AttackError::SchemaMismatch(format!(
                "row {} out of bounds for table with {} rows",
                row,
                table.num_rows()
            )));
        }
        Ok(Self {
            columns: table.column_names().to_vec(),
            values: table.row(row).to_vec(),
        })
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value of a named column.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| &self.values[i])
    }

    /// Validate against the run metadata (same names, same order).
    pub fn check_schema(&self, metadata: &Metadata) -> Result<()> {
        let expected = metadata.column_names();
        let actual: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        if actual != expected {
            return Err(AttackError::SchemaMismatch(format!(
                "target record columns {:?} do not match metadata columns {:?}",
                actual, expected
            )));
        }
        Ok(())
    }
}
