//! MIA Feature Extractor
//!
//! Feature extraction for shadow-modelling membership-inference attacks on
//! synthetic tabular data.
//!
//! # Overview
//!
//! A membership-inference attack asks whether one target record was part of
//! the data a synthetic-data generator was trained on. The attack trains a
//! meta-classifier on features extracted from shadow datasets: synthetic
//! datasets generated with and without the target, each tagged with its
//! membership label and a train/eval split. This library turns those shadow
//! datasets into the two dense feature matrices the meta-classifier
//! consumes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      AttackPipeline                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  schema/      - Column metadata (kinds, vocabularies)           │
//! │  encoding/    - Fixed-vocabulary one-hot encoding               │
//! │  queries/     - Combinatorial predicate generation              │
//! │  extractors/  - Naive, correlation, similarity, query counting  │
//! │  qbs/         - Batch predicate counting backends               │
//! │  coordinator/ - Parallel fan-out over shadow datasets           │
//! │  assembler/   - Train/eval matrix assembly                      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mia_feature_extractor::prelude::*;
//!
//! let config = AttackConfig::new()
//!     .with_extractor(ExtractorSpec::Naive)
//!     .with_extractor(ExtractorSpec::TopK { k: 10 })
//!     .with_threads(8);
//!
//! let pipeline = AttackPipeline::new(metadata, &auxiliary, config)?;
//! let matrices = pipeline.run(&shadow_datasets, &target)?;
//!
//! // matrices.train / matrices.eval feed the meta-classifier
//! ```

pub mod assembler;
pub mod coordinator;
pub mod encoding;
pub mod error;
pub mod extractors;
pub mod pipeline;
pub mod prelude;
pub mod qbs;
pub mod queries;
pub mod schema;
pub mod table;

// Re-exports - Schema
pub use schema::{ColumnDescriptor, ColumnKind, Metadata, Split};

// Re-exports - Data model
pub use table::{Record, Table, Value};

// Re-exports - Encoding
pub use encoding::{EncodedTable, OneHotEncoder};

// Re-exports - Queries
pub use queries::{ConditionOptions, Query, QueryGenerator, DEFAULT_QUERY_SEED};

// Re-exports - Extractors
pub use extractors::{
    ExtractorRegistry, ExtractorSpec, FeatureBlock, ResolvedExtractors, DEFAULT_TOP_K,
};

// Re-exports - Counting
pub use qbs::{BatchPredicateCounter, TabularPredicateCounter};

// Re-exports - Coordination and assembly
pub use assembler::{FeatureMatrices, FeatureMatrixAssembler};
pub use coordinator::{
    CoordinatorConfig, ExtractionCoordinator, FeatureRow, ShadowDataset, SplitQueries,
};

// Re-exports - Pipeline
pub use error::{AttackError, Result};
pub use pipeline::{AttackConfig, AttackJob, AttackPipeline};
