//! Fixed-vocabulary one-hot encoding.
//!
//! The encoder is fitted once per attack run. Its vocabulary comes from the
//! run `Metadata`, never from observed data, so the encoded column set is
//! identical no matter which shadow dataset (or subset of rows) is later
//! transformed — the property that keeps feature matrices column-consistent
//! across datasets.
//!
//! Encoded layout: continuous columns first (metadata order, values passed
//! through unchanged), then one one-hot block per categorical column
//! (metadata order, categories in vocabulary order), named
//! `"{column}_{category}"`. Row identity and order are preserved.

use crate::error::{AttackError, Result};
use crate::schema::{ColumnKind, Metadata};
use crate::table::{Record, Table, Value};
use ahash::AHashMap;
use ndarray::{Array1, Array2};

/// A dataset after one-hot encoding: a dense numeric matrix with named
/// columns, rows in the original order.
#[derive(Debug, Clone)]
pub struct EncodedTable {
    pub column_names: Vec<String>,
    pub values: Array2<f64>,
}

impl EncodedTable {
    pub fn num_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn num_columns(&self) -> usize {
        self.values.ncols()
    }
}

/// Per-column one-hot layout of a fitted encoder.
#[derive(Debug, Clone)]
struct CategoricalLayout {
    name: String,
    /// Raw column index in the source schema.
    source_index: usize,
    /// Category label -> offset within this column's one-hot block.
    lookup: AHashMap<String, usize>,
    /// Offset of this block within the encoded column range.
    block_start: usize,
    block_len: usize,
}

/// Fixed-vocabulary one-hot encoder for categorical columns.
#[derive(Debug, Clone)]
pub struct OneHotEncoder {
    /// Continuous column names with their raw indices, metadata order.
    continuous: Vec<(String, usize)>,
    categorical: Vec<CategoricalLayout>,
    /// `"{column}_{category}"` names, vocabulary order, all blocks.
    one_hot_names: Vec<String>,
    /// Continuous names followed by the one-hot names.
    encoded_names: Vec<String>,
}

impl OneHotEncoder {
    /// Fit an encoder from the run metadata, validating the auxiliary data
    /// against the declared vocabularies.
    ///
    /// The vocabulary is taken from `metadata` alone; `auxiliary` only has
    /// to conform to it. A category in the auxiliary data that is missing
    /// from the vocabulary fails the fit with an `Encoding` error, which
    /// surfaces bad metadata before any shadow dataset is touched.
    pub fn fit(auxiliary: &Table, metadata: &Metadata) -> Result<Self> {
        auxiliary.check_schema(metadata)?;

        let mut continuous = Vec::new();
        let mut categorical = Vec::new();
        let mut one_hot_names = Vec::new();
        let mut block_start = 0;

        for (index, col) in metadata.columns().iter().enumerate() {
            match col.kind {
                ColumnKind::Continuous => continuous.push((col.name.clone(), index)),
                ColumnKind::Categorical => {
                    let mut lookup = AHashMap::with_capacity(col.vocabulary.len());
                    for (offset, category) in col.vocabulary.iter().enumerate() {
                        if lookup.insert(category.clone(), offset).is_some() {
                            return Err(AttackError::SchemaMismatch(format!(
                                "duplicate category '{}' in vocabulary of column '{}'",
                                category, col.name
                            )));
                        }
                        one_hot_names.push(format!("{}_{}", col.name, category));
                    }
                    categorical.push(CategoricalLayout {
                        name: col.name.clone(),
                        source_index: index,
                        block_len: lookup.len(),
                        lookup,
                        block_start,
                    });
                    block_start += col.vocabulary.len();
                }
            }
        }

        let mut encoded_names: Vec<String> =
            continuous.iter().map(|(name, _)| name.clone()).collect();
        encoded_names.extend(one_hot_names.iter().cloned());

        let encoder = Self {
            continuous,
            categorical,
            one_hot_names,
            encoded_names,
        };

        // Surface vocabulary violations at fit time rather than mid-run.
        for (i, row) in auxiliary.rows().iter().enumerate() {
            encoder.check_row(row).map_err(|e| match e {
                AttackError::Encoding { column, value } => AttackError::Encoding {
                    column,
                    value: format!("{value} (auxiliary row {i})"),
                },
                other => other,
            })?;
        }

        Ok(encoder)
    }

    /// One-hot column names, `"{column}_{category}"` in vocabulary order.
    pub fn one_hot_names(&self) -> &[String] {
        &self.one_hot_names
    }

    /// Full encoded column names: continuous columns then one-hot blocks.
    pub fn encoded_names(&self) -> &[String] {
        &self.encoded_names
    }

    /// Number of encoded columns.
    pub fn encoded_width(&self) -> usize {
        self.encoded_names.len()
    }

    /// Continuous column names, metadata order.
    pub fn continuous_names(&self) -> Vec<&str> {
        self.continuous.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Categorical column names, metadata order.
    pub fn categorical_names(&self) -> Vec<&str> {
        self.categorical.iter().map(|c| c.name.as_str()).collect()
    }

    /// Column range of one categorical column's one-hot block within the
    /// encoded layout, and its vocabulary size.
    pub fn one_hot_block(&self, column: &str) -> Option<std::ops::Range<usize>> {
        self.categorical.iter().find(|c| c.name == column).map(|c| {
            let start = self.continuous.len() + c.block_start;
            start..start + c.block_len
        })
    }

    /// Transform a table into the fixed encoded layout.
    pub fn apply(&self, table: &Table) -> Result<EncodedTable> {
        let width = self.encoded_width();
        let mut values = Array2::<f64>::zeros((table.num_rows(), width));

        for (r, row) in table.rows().iter().enumerate() {
            self.encode_row(row, values.row_mut(r).as_slice_mut().ok_or_else(|| {
                AttackError::SchemaMismatch("encoded matrix is not contiguous".to_string())
            })?)?;
        }

        Ok(EncodedTable {
            column_names: self.encoded_names.clone(),
            values,
        })
    }

    /// Transform the single target record.
    pub fn apply_record(&self, record: &Record) -> Result<Array1<f64>> {
        let mut out = vec![0.0; self.encoded_width()];
        self.encode_row(record.values(), &mut out)?;
        Ok(Array1::from_vec(out))
    }

    fn encode_row(&self, row: &[Value], out: &mut [f64]) -> Result<()> {
        for (pos, (name, source_index)) in self.continuous.iter().enumerate() {
            let value = row.get(*source_index).ok_or_else(|| {
                AttackError::SchemaMismatch(format!("row is missing column '{name}'"))
            })?;
            out[pos] = value.as_f64().ok_or_else(|| {
                AttackError::SchemaMismatch(format!(
                    "non-numeric value '{}' in continuous column '{}'",
                    value.label(),
                    name
                ))
            })?;
        }

        let base = self.continuous.len();
        for layout in &self.categorical {
            let value = row.get(layout.source_index).ok_or_else(|| {
                AttackError::SchemaMismatch(format!("row is missing column '{}'", layout.name))
            })?;
            let label = value.label();
            let offset = layout.lookup.get(&label).ok_or(AttackError::Encoding {
                column: layout.name.clone(),
                value: label.clone(),
            })?;
            out[base + layout.block_start + offset] = 1.0;
        }
        Ok(())
    }

    fn check_row(&self, row: &[Value]) -> Result<()> {
        let mut scratch = vec![0.0; self.encoded_width()];
        self.encode_row(row, &mut scratch)
    }
}
