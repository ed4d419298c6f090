//! Feature-extractor variants and their registry.
//!
//! Extractor selection is a closed variant set: configuration entries are
//! resolved once, up front, into validated `ExtractorSpec` values plus a
//! parallel list of one-hot requirement flags. An unknown or malformed
//! entry fails the resolution immediately — silently dropping a requested
//! extractor would silently change the feature space the meta-classifier
//! trains on.
//!
//! Each variant is a pure function of immutable inputs: one (optionally
//! encoded) dataset, the target record, the shared encoder, and (for query
//! counting) that extractor's own per-split query set. That purity is what
//! lets the
//! coordinator run one unit of work per (dataset, extractor) pair with no
//! shared mutable state.

pub mod correlation;
pub mod naive;
pub mod query_count;
pub mod similarity;

use crate::encoding::{EncodedTable, OneHotEncoder};
use crate::error::{AttackError, Result};
use crate::qbs::BatchPredicateCounter;
use crate::queries::{ConditionOptions, Query};
use crate::table::{Record, Table};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Default row count for the top-K similarity extractor.
pub const DEFAULT_TOP_K: usize = 50;

/// One configured feature extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractorSpec {
    /// Per-column summary statistics.
    Naive,
    /// Upper-triangular Pearson correlation over all encoded columns.
    Correlation,
    /// Full encoded content of the `k` rows most cosine-similar to the
    /// target. Datasets with fewer than `k` rows are truncated to the rows
    /// available.
    TopK { k: usize },
    /// Sorted cosine similarities of every row to the target. Output length
    /// equals the row count, so every dataset in a split must have the same
    /// number of rows.
    AllDistances,
    /// Satisfied-row counts for a combinatorial predicate set, generated
    /// once per split and shared across its datasets.
    QueryCount {
        orders: Vec<usize>,
        sample_size: usize,
        conditions: ConditionOptions,
    },
}

impl ExtractorSpec {
    /// Parse a plain configuration name into a spec with default
    /// parameters. Parameterized variants are constructed directly.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "naive" => Ok(ExtractorSpec::Naive),
            "correlation" => Ok(ExtractorSpec::Correlation),
            "top_k" => Ok(ExtractorSpec::TopK { k: DEFAULT_TOP_K }),
            "all_distances" => Ok(ExtractorSpec::AllDistances),
            "query" => Err(AttackError::InvalidExtractorConfig(
                "'query' requires orders, sample_size and conditions; \
                 construct ExtractorSpec::QueryCount directly"
                    .to_string(),
            )),
            other => Err(AttackError::InvalidExtractorConfig(format!(
                "unknown extractor '{other}'"
            ))),
        }
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            ExtractorSpec::Naive => "naive",
            ExtractorSpec::Correlation => "correlation",
            ExtractorSpec::TopK { .. } => "top_k",
            ExtractorSpec::AllDistances => "all_distances",
            ExtractorSpec::QueryCount { .. } => "query_count",
        }
    }

    /// Whether this extractor consumes the one-hot encoded dataset.
    ///
    /// Query counting runs on the raw table; everything else runs on the
    /// encoded one.
    pub fn requires_encoding(&self) -> bool {
        !matches!(self, ExtractorSpec::QueryCount { .. })
    }

    /// Whether this extractor drives the shared per-split query set.
    pub fn uses_queries(&self) -> bool {
        matches!(self, ExtractorSpec::QueryCount { .. })
    }

    /// Validate parameters.
    pub fn validate(&self) -> Result<()> {
        match self {
            ExtractorSpec::TopK { k } if *k == 0 => Err(AttackError::InvalidExtractorConfig(
                "top_k requires k >= 1".to_string(),
            )),
            ExtractorSpec::QueryCount {
                orders,
                sample_size,
                conditions,
            } => {
                if orders.is_empty() {
                    return Err(AttackError::InvalidExtractorConfig(
                        "query_count requires at least one order".to_string(),
                    ));
                }
                if orders.iter().any(|&o| o == 0) {
                    return Err(AttackError::InvalidExtractorConfig(
                        "query_count orders must be >= 1".to_string(),
                    ));
                }
                if *sample_size == 0 {
                    return Err(AttackError::InvalidExtractorConfig(
                        "query_count requires sample_size >= 1".to_string(),
                    ));
                }
                if conditions.categorical.is_empty() || conditions.continuous.is_empty() {
                    return Err(AttackError::InvalidExtractorConfig(
                        "query_count requires condition options for both column kinds"
                            .to_string(),
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Validated extractor configuration with the parallel one-hot requirement
/// flags, resolved once per attack run.
#[derive(Debug, Clone)]
pub struct ResolvedExtractors {
    specs: Vec<ExtractorSpec>,
    requires_encoding: Vec<bool>,
}

/// Resolves configuration entries into executable extractor variants.
pub struct ExtractorRegistry;

impl ExtractorRegistry {
    /// Validate every entry, failing fast on the first malformed one.
    pub fn resolve(specs: &[ExtractorSpec]) -> Result<ResolvedExtractors> {
        if specs.is_empty() {
            return Err(AttackError::InvalidExtractorConfig(
                "at least one extractor must be configured".to_string(),
            ));
        }
        for spec in specs {
            spec.validate()?;
        }
        Ok(ResolvedExtractors {
            requires_encoding: specs.iter().map(ExtractorSpec::requires_encoding).collect(),
            specs: specs.to_vec(),
        })
    }
}

impl ResolvedExtractors {
    /// Extractors in configuration order.
    pub fn specs(&self) -> &[ExtractorSpec] {
        &self.specs
    }

    /// One-hot requirement flags, parallel to `specs()`.
    pub fn requires_encoding(&self) -> &[bool] {
        &self.requires_encoding
    }

    /// True if any configured extractor needs the encoded dataset.
    pub fn any_requires_encoding(&self) -> bool {
        self.requires_encoding.iter().any(|&b| b)
    }

    /// True if any configured extractor needs per-split query sets.
    pub fn any_uses_queries(&self) -> bool {
        self.specs.iter().any(ExtractorSpec::uses_queries)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// One extractor's output on one dataset: names and values in lock-step.
#[derive(Debug, Clone)]
pub struct FeatureBlock {
    pub names: Vec<String>,
    pub values: Vec<f64>,
}

impl FeatureBlock {
    pub fn new(names: Vec<String>, values: Vec<f64>) -> Result<Self> {
        if names.len() != values.len() {
            return Err(AttackError::SchemaMismatch(format!(
                "{} feature names for {} values",
                names.len(),
                values.len()
            )));
        }
        Ok(Self { names, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Immutable inputs for one unit of extraction work.
///
/// Everything here is a shared read-only borrow; a unit never mutates its
/// inputs, so units can run in any order on any worker.
pub struct ExtractionInput<'a> {
    /// Raw (un-encoded) shadow dataset.
    pub table: &'a Table,
    /// Encoded dataset, present iff some configured extractor needs it.
    pub encoded: Option<&'a EncodedTable>,
    /// Encoded target record, computed once per extraction call.
    pub encoded_target: Option<&'a Array1<f64>>,
    /// Raw target record.
    pub target: &'a Record,
    pub encoder: &'a OneHotEncoder,
    /// This extractor's query set for the dataset's split, present iff the
    /// extractor counts queries.
    pub queries: Option<&'a [Query]>,
    pub counter: &'a dyn BatchPredicateCounter,
}

impl<'a> ExtractionInput<'a> {
    fn encoded(&self) -> Result<&'a EncodedTable> {
        self.encoded.ok_or_else(|| {
            AttackError::SchemaMismatch("extractor needs an encoded dataset but none was prepared".to_string())
        })
    }

    fn encoded_target(&self) -> Result<&'a Array1<f64>> {
        self.encoded_target.ok_or_else(|| {
            AttackError::SchemaMismatch("extractor needs an encoded target but none was prepared".to_string())
        })
    }
}

/// Run one extractor against one dataset.
pub fn extract(spec: &ExtractorSpec, input: &ExtractionInput<'_>) -> Result<FeatureBlock> {
    match spec {
        ExtractorSpec::Naive => naive::extract(input.encoded()?, input.encoder),
        ExtractorSpec::Correlation => correlation::extract(input.encoded()?),
        ExtractorSpec::TopK { k } => {
            similarity::top_k(input.encoded()?, input.encoded_target()?, *k)
        }
        ExtractorSpec::AllDistances => {
            similarity::all_distances(input.encoded()?, input.encoded_target()?)
        }
        ExtractorSpec::QueryCount { .. } => {
            let queries = input.queries.ok_or_else(|| {
                AttackError::SchemaMismatch(
                    "query_count extractor has no query set for this split".to_string(),
                )
            })?;
            query_count::extract(input.table, input.target, queries, input.counter)
        }
    }
}
