//! Prelude module for convenient imports.
//!
//! Re-exports the types needed to configure and run a full attack.
//!
//! # Usage
//!
//! ```ignore
//! use mia_feature_extractor::prelude::*;
//!
//! let config = AttackConfig::new().with_extractor(ExtractorSpec::Naive);
//! let pipeline = AttackPipeline::new(metadata, &auxiliary, config)?;
//! let matrices = pipeline.run(&shadow_datasets, &target)?;
//! ```

// ============================================================================
// Pipeline
// ============================================================================

pub use crate::error::{AttackError, Result};
pub use crate::pipeline::{AttackConfig, AttackJob, AttackPipeline};

// ============================================================================
// Schema and data model
// ============================================================================

pub use crate::schema::{ColumnDescriptor, ColumnKind, Metadata, Split};
pub use crate::table::{Record, Table, Value};

// ============================================================================
// Extraction
// ============================================================================

pub use crate::coordinator::{CoordinatorConfig, ExtractionCoordinator, ShadowDataset};
pub use crate::extractors::{ExtractorSpec, DEFAULT_TOP_K};
pub use crate::queries::{condition, ConditionOptions, QueryGenerator, DEFAULT_QUERY_SEED};

// ============================================================================
// Outputs
// ============================================================================

pub use crate::assembler::FeatureMatrices;
pub use crate::encoding::OneHotEncoder;
pub use crate::qbs::{BatchPredicateCounter, TabularPredicateCounter};
