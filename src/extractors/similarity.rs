//! Cosine-similarity features against the target record.
//!
//! Both extractors here rank the encoded rows of a shadow dataset by their
//! cosine similarity to the encoded target. `top_k` returns the full
//! encoded content of the best-matching rows; `all_distances` returns only
//! the sorted similarity scalars, one per row.

use crate::encoding::EncodedTable;
use crate::error::{AttackError, Result};
use crate::extractors::FeatureBlock;
use ndarray::{Array1, ArrayView1};

/// Cosine similarity; `0.0` when either vector has zero norm.
fn cosine_similarity(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let dot = a.dot(&b);
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Row indices sorted by similarity to the target, descending; stable, so
/// equal similarities keep their original row order.
fn rank_rows(encoded: &EncodedTable, target: &Array1<f64>) -> Result<Vec<(usize, f64)>> {
    if encoded.num_rows() == 0 {
        return Err(AttackError::SchemaMismatch(
            "cannot rank rows of an empty dataset".into(),
        ));
    }
    if target.len() != encoded.num_columns() {
        return Err(AttackError::SchemaMismatch(format!(
            "encoded target has {} columns, dataset has {}",
            target.len(),
            encoded.num_columns()
        )));
    }
    let mut ranked: Vec<(usize, f64)> = (0..encoded.num_rows())
        .map(|r| (r, cosine_similarity(encoded.values.row(r), target.view())))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    Ok(ranked)
}

/// Full encoded values of the `k` rows most similar to the target,
/// flattened, column names suffixed with the rank. A dataset with fewer
/// than `k` rows contributes all of its rows (truncation, not padding).
pub fn top_k(encoded: &EncodedTable, target: &Array1<f64>, k: usize) -> Result<FeatureBlock> {
    let ranked = rank_rows(encoded, target)?;
    let taken = k.min(ranked.len());

    let width = encoded.num_columns();
    let mut names = Vec::with_capacity(taken * width);
    let mut values = Vec::with_capacity(taken * width);
    for (rank, &(row, _)) in ranked.iter().take(taken).enumerate() {
        for (c, col_name) in encoded.column_names.iter().enumerate() {
            names.push(format!("{col_name}_top_{rank}"));
            values.push(encoded.values[(row, c)]);
        }
    }
    FeatureBlock::new(names, values)
}

/// The sorted similarity scalars for every row, descending.
///
/// Output length equals the dataset's row count, so every dataset within a
/// split must have the same number of rows; a mismatch surfaces as a
/// `SchemaMismatch` when the matrices are assembled.
pub fn all_distances(encoded: &EncodedTable, target: &Array1<f64>) -> Result<FeatureBlock> {
    let ranked = rank_rows(encoded, target)?;
    let names = (0..ranked.len()).map(|i| format!("distance_{i}")).collect();
    let values = ranked.into_iter().map(|(_, sim)| sim).collect();
    FeatureBlock::new(names, values)
}
