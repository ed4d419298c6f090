//! Query-count features.
//!
//! Each feature is the number of dataset rows satisfying one conjunctive
//! query anchored at the target record. Counting itself is delegated to a
//! [`BatchPredicateCounter`], so the same extractor works against an
//! in-memory table or any other counting backend.

use crate::error::Result;
use crate::extractors::FeatureBlock;
use crate::qbs::BatchPredicateCounter;
use crate::queries::Query;
use crate::table::{Record, Table};

/// Feature name for one query: the condition code and column name of every
/// constrained column, joined with underscores, e.g. `1_age_-1_sex`.
fn feature_name(query: &Query, columns: &[String]) -> String {
    let parts: Vec<String> = query
        .conditions
        .iter()
        .enumerate()
        .filter(|(_, &code)| code != 0)
        .map(|(i, &code)| format!("{}_{}", code, columns[i]))
        .collect();
    parts.join("_")
}

pub fn extract(
    table: &Table,
    target: &Record,
    queries: &[Query],
    counter: &dyn BatchPredicateCounter,
) -> Result<FeatureBlock> {
    let targets: Vec<&Record> = vec![target; queries.len()];
    let counts = counter.count(table, &targets, queries)?;

    let names = queries
        .iter()
        .map(|q| feature_name(q, table.column_names()))
        .collect();
    let values = counts.into_iter().map(|c| c as f64).collect();
    FeatureBlock::new(names, values)
}
