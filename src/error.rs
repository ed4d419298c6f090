//! Error types for the feature-extraction engine.
//!
//! Every error is fatal for the current target record's attack run: a feature
//! matrix that silently lost rows or columns would bias the downstream
//! meta-classifier, so nothing here is recovered from implicitly.

use crate::schema::Split;
use thiserror::Error;

/// Errors raised by the feature-extraction engine.
#[derive(Error, Debug)]
pub enum AttackError {
    /// Unknown or malformed extractor identifier or parameter payload.
    ///
    /// Also covers an unbuildable worker-pool configuration, since the
    /// offending value is still part of the run configuration.
    #[error("invalid extractor configuration: {0}")]
    InvalidExtractorConfig(String),

    /// Inconsistent feature-name sequences within a split, a row-count
    /// mismatch feeding a per-row extractor, or a dataset whose schema
    /// disagrees with the run metadata.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A value fell outside the fitted one-hot vocabulary.
    #[error("value '{value}' in column '{column}' is outside the fitted vocabulary")]
    Encoding { column: String, value: String },

    /// An extraction unit failed during parallel execution, identified by
    /// the shadow dataset it was working on.
    #[error("extraction failed for {split} shadow dataset {dataset_index}: {source}")]
    WorkerFailure {
        split: Split,
        dataset_index: usize,
        #[source]
        source: Box<AttackError>,
    },
}

impl AttackError {
    /// Wrap an error with the identity of the shadow dataset whose
    /// extraction unit raised it.
    pub fn in_worker(self, split: Split, dataset_index: usize) -> Self {
        AttackError::WorkerFailure {
            split,
            dataset_index,
            source: Box::new(self),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AttackError>;
