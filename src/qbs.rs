//! Batched predicate counting.
//!
//! The query-count extractor never evaluates predicates itself; it hands a
//! table, one target tuple per query, and the parallel condition vectors to
//! a `BatchPredicateCounter` and gets one satisfied-row count back per
//! query. The trait boundary exists so an external compiled query-based
//! system can be swapped in without touching extractor logic;
//! `TabularPredicateCounter` is the pure in-memory reference
//! implementation.

use crate::error::{AttackError, Result};
use crate::queries::{condition, Query};
use crate::table::{Record, Table, Value};

/// Counts, for each condition vector, the rows of a table that satisfy all
/// of its non-zero conditions relative to the paired target tuple.
///
/// Contract: `targets.len() == queries.len()` and each target tuple spans
/// every table column; the result has one count per query, in query order. Categorical predicates (`EQ`/`NEQ`) are exact
/// label comparisons; ordering predicates are numeric comparisons and fail
/// on non-numeric cells.
pub trait BatchPredicateCounter: Send + Sync {
    fn count(&self, table: &Table, targets: &[&Record], queries: &[Query]) -> Result<Vec<u64>>;
}

/// In-memory reference implementation: a linear scan per query.
#[derive(Debug, Clone, Default)]
pub struct TabularPredicateCounter;

impl TabularPredicateCounter {
    pub fn new() -> Self {
        Self
    }
}

impl BatchPredicateCounter for TabularPredicateCounter {
    fn count(&self, table: &Table, targets: &[&Record], queries: &[Query]) -> Result<Vec<u64>> {
        if targets.len() != queries.len() {
            return Err(AttackError::SchemaMismatch(format!(
                "{} target tuples for {} queries",
                targets.len(),
                queries.len()
            )));
        }

        let mut counts = Vec::with_capacity(queries.len());
        for (query, target) in queries.iter().zip(targets) {
            if query.conditions.len() != table.num_columns() {
                return Err(AttackError::SchemaMismatch(format!(
                    "query has {} conditions for a table with {} columns",
                    query.conditions.len(),
                    table.num_columns()
                )));
            }
            if target.values().len() != table.num_columns() {
                return Err(AttackError::SchemaMismatch(format!(
                    "target tuple has {} values for a table with {} columns",
                    target.values().len(),
                    table.num_columns()
                )));
            }
            let mut count = 0u64;
            for row in table.rows() {
                if row_satisfies(row, target.values(), &query.conditions, table)? {
                    count += 1;
                }
            }
            counts.push(count);
        }
        Ok(counts)
    }
}

fn row_satisfies(row: &[Value], target: &[Value], conditions: &[i8], table: &Table) -> Result<bool> {
    for (col, &code) in conditions.iter().enumerate() {
        if code == condition::NONE {
            continue;
        }
        if !condition_holds(&row[col], &target[col], code, col, table)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn condition_holds(
    value: &Value,
    target: &Value,
    code: i8,
    col: usize,
    table: &Table,
) -> Result<bool> {
    match code {
        condition::EQ | condition::NEQ => {
            // Numeric cells compare numerically so Int(2) matches Float(2.0);
            // everything else falls back to exact label equality.
            let equal = match (value.as_f64(), target.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => value.label() == target.label(),
            };
            Ok(if code == condition::EQ { equal } else { !equal })
        }
        condition::GT | condition::GTE | condition::LT | condition::LTE => {
            let a = numeric(value, col, table)?;
            let b = numeric(target, col, table)?;
            Ok(match code {
                condition::GT => a > b,
                condition::GTE => a >= b,
                condition::LT => a < b,
                _ => a <= b,
            })
        }
        other => Err(AttackError::SchemaMismatch(format!(
            "unknown condition code {other} on column {col}"
        ))),
    }
}

fn numeric(value: &Value, col: usize, table: &Table) -> Result<f64> {
    value.as_f64().ok_or_else(|| {
        AttackError::SchemaMismatch(format!(
            "ordering condition on non-numeric value '{}' in column '{}'",
            value.label(),
            table.column_names()[col]
        ))
    })
}
