//! Pairwise Pearson correlation features.
//!
//! The correlation matrix is computed over every encoded column (continuous
//! and one-hot alike) and only the strictly-upper-triangular entries are
//! returned, row-major over pairs `i < j`, so the output length is C(n, 2)
//! for n encoded columns.

use crate::encoding::EncodedTable;
use crate::error::{AttackError, Result};
use crate::extractors::FeatureBlock;

/// Value substituted for an undefined correlation.
///
/// A zero-variance column has no defined Pearson correlation with anything;
/// the convention here is to report such pairs as exactly `0.0` so the
/// feature matrix stays finite. This is a named policy, not an incidental
/// fix-up: downstream consumers may rely on "no correlation signal" being
/// indistinguishable from "no variance to correlate".
pub const NAN_CORRELATION: f64 = 0.0;

pub fn extract(encoded: &EncodedTable) -> Result<FeatureBlock> {
    let rows = encoded.num_rows();
    if rows == 0 {
        return Err(AttackError::SchemaMismatch(
            "correlation over an empty dataset".to_string(),
        ));
    }

    let n = encoded.num_columns();
    let means: Vec<f64> = (0..n)
        .map(|c| encoded.values.column(c).sum() / rows as f64)
        .collect();

    // Centered column magnitudes; zero marks a constant column.
    let norms: Vec<f64> = (0..n)
        .map(|c| {
            encoded
                .values
                .column(c)
                .iter()
                .map(|v| (v - means[c]) * (v - means[c]))
                .sum::<f64>()
                .sqrt()
        })
        .collect();

    let mut values = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in i + 1..n {
            let value = if norms[i] == 0.0 || norms[j] == 0.0 {
                NAN_CORRELATION
            } else {
                let dot: f64 = encoded
                    .values
                    .column(i)
                    .iter()
                    .zip(encoded.values.column(j).iter())
                    .map(|(a, b)| (a - means[i]) * (b - means[j]))
                    .sum();
                dot / (norms[i] * norms[j])
            };
            values.push(value);
        }
    }

    let names = (0..values.len()).map(|i| format!("corr_{i}")).collect();
    FeatureBlock::new(names, values)
}
