//! Assembly of per-dataset feature rows into the train/eval matrices.
//!
//! The meta-classifier consumes two dense matrices with a shared column
//! layout. Rows are grouped strictly by their split tag, and the assembler
//! refuses to build matrices whose rows disagree on the feature-name
//! sequence: a silent misalignment here would corrupt every downstream
//! prediction, so it is a hard error instead.

use crate::coordinator::FeatureRow;
use crate::error::{AttackError, Result};
use crate::schema::Split;
use ndarray::Array2;

/// The attack's training and evaluation feature matrices, with membership
/// labels row-aligned to each matrix.
#[derive(Debug, Clone)]
pub struct FeatureMatrices {
    pub train: Array2<f64>,
    pub train_labels: Vec<bool>,
    pub eval: Array2<f64>,
    pub eval_labels: Vec<bool>,
    /// Column layout shared by both matrices.
    pub feature_names: Vec<String>,
}

impl FeatureMatrices {
    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn matrix(&self, split: Split) -> &Array2<f64> {
        match split {
            Split::Train => &self.train,
            Split::Eval => &self.eval,
        }
    }

    pub fn labels(&self, split: Split) -> &[bool] {
        match split {
            Split::Train => &self.train_labels,
            Split::Eval => &self.eval_labels,
        }
    }
}

/// Groups feature rows by split and validates their column layout.
pub struct FeatureMatrixAssembler;

impl FeatureMatrixAssembler {
    /// Build the two matrices from the coordinator's rows.
    ///
    /// Requires at least one row per split, identical feature-name
    /// sequences within each split, and identical sequences across the two
    /// splits. Row order within a split follows the input order.
    pub fn assemble(rows: &[FeatureRow]) -> Result<FeatureMatrices> {
        let (train_rows, eval_rows): (Vec<&FeatureRow>, Vec<&FeatureRow>) =
            rows.iter().partition(|r| r.split == Split::Train);

        let (train, train_labels, train_names) = Self::assemble_split(Split::Train, &train_rows)?;
        let (eval, eval_labels, eval_names) = Self::assemble_split(Split::Eval, &eval_rows)?;

        if train_names != eval_names {
            return Err(AttackError::SchemaMismatch(format!(
                "train and eval matrices disagree on the feature layout \
                 ({} vs {} columns)",
                train_names.len(),
                eval_names.len()
            )));
        }

        Ok(FeatureMatrices {
            train,
            train_labels,
            eval,
            eval_labels,
            feature_names: train_names,
        })
    }

    fn assemble_split(
        split: Split,
        rows: &[&FeatureRow],
    ) -> Result<(Array2<f64>, Vec<bool>, Vec<String>)> {
        let first = rows.first().ok_or_else(|| {
            AttackError::SchemaMismatch(format!("no shadow datasets tagged for the {split} split"))
        })?;
        let names = first.names.clone();

        let mut values = Vec::with_capacity(rows.len() * names.len());
        let mut labels = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.names != names {
                return Err(AttackError::SchemaMismatch(format!(
                    "{split} row {i} produced a different feature layout \
                     ({} features, expected {})",
                    row.names.len(),
                    names.len()
                )));
            }
            values.extend_from_slice(&row.values);
            labels.push(row.is_member);
        }

        let matrix = Array2::from_shape_vec((rows.len(), names.len()), values).map_err(|e| {
            AttackError::SchemaMismatch(format!("{split} matrix shape error: {e}"))
        })?;
        Ok((matrix, labels, names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(split: Split, is_member: bool, names: &[&str], values: &[f64]) -> FeatureRow {
        FeatureRow {
            names: names.iter().map(|s| s.to_string()).collect(),
            values: values.to_vec(),
            is_member,
            split,
        }
    }

    #[test]
    fn test_rows_grouped_by_split() {
        let rows = vec![
            row(Split::Train, true, &["a", "b"], &[1.0, 2.0]),
            row(Split::Eval, false, &["a", "b"], &[5.0, 6.0]),
            row(Split::Train, false, &["a", "b"], &[3.0, 4.0]),
        ];

        let matrices = FeatureMatrixAssembler::assemble(&rows).unwrap();
        assert_eq!(matrices.train.dim(), (2, 2));
        assert_eq!(matrices.eval.dim(), (1, 2));
        assert_eq!(matrices.train_labels, vec![true, false]);
        assert_eq!(matrices.eval_labels, vec![false]);
        assert_eq!(matrices.feature_names, vec!["a", "b"]);
        // Input order preserved within the split.
        assert_eq!(matrices.train[(0, 0)], 1.0);
        assert_eq!(matrices.train[(1, 0)], 3.0);
    }

    #[test]
    fn test_missing_split_rejected() {
        let rows = vec![row(Split::Train, true, &["a"], &[1.0])];
        let err = FeatureMatrixAssembler::assemble(&rows).unwrap_err();
        assert!(matches!(err, AttackError::SchemaMismatch(_)));
        assert!(err.to_string().contains("eval"));
    }

    #[test]
    fn test_layout_mismatch_within_split_rejected() {
        let rows = vec![
            row(Split::Train, true, &["a", "b"], &[1.0, 2.0]),
            row(Split::Train, false, &["a", "b", "c"], &[1.0, 2.0, 3.0]),
            row(Split::Eval, false, &["a", "b"], &[5.0, 6.0]),
        ];
        let err = FeatureMatrixAssembler::assemble(&rows).unwrap_err();
        assert!(matches!(err, AttackError::SchemaMismatch(_)));
    }

    #[test]
    fn test_layout_mismatch_across_splits_rejected() {
        let rows = vec![
            row(Split::Train, true, &["a", "b"], &[1.0, 2.0]),
            row(Split::Eval, false, &["a", "c"], &[5.0, 6.0]),
        ];
        let err = FeatureMatrixAssembler::assemble(&rows).unwrap_err();
        assert!(matches!(err, AttackError::SchemaMismatch(_)));
    }

    #[test]
    fn test_split_accessors() {
        let rows = vec![
            row(Split::Train, true, &["a"], &[1.0]),
            row(Split::Eval, false, &["a"], &[2.0]),
        ];
        let matrices = FeatureMatrixAssembler::assemble(&rows).unwrap();
        assert_eq!(matrices.matrix(Split::Eval)[(0, 0)], 2.0);
        assert_eq!(matrices.labels(Split::Train), &[true]);
        assert_eq!(matrices.num_features(), 1);
    }
}
