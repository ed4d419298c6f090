//! End-to-end attack pipeline.
//!
//! Ties the pieces together for one target record: fit the one-hot encoder
//! on the auxiliary data, resolve the extractor configuration, generate the
//! per-split query sets, fan extraction out over the shadow datasets, and
//! assemble the train/eval feature matrices the meta-classifier consumes.
//!
//! Everything that can fail by configuration fails in [`AttackPipeline::new`];
//! a constructed pipeline is immutable and can be reused across targets.

use crate::assembler::{FeatureMatrixAssembler, FeatureMatrices};
use crate::coordinator::{
    CoordinatorConfig, ExtractionCoordinator, ShadowDataset, SplitQueries,
};
use crate::encoding::OneHotEncoder;
use crate::error::{AttackError, Result};
use crate::extractors::{ExtractorRegistry, ExtractorSpec, ResolvedExtractors};
use crate::qbs::BatchPredicateCounter;
use crate::queries::{QueryGenerator, DEFAULT_QUERY_SEED};
use crate::schema::{Metadata, Split};
use crate::table::{Record, Table};
use log::{info, warn};
use std::sync::Arc;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for one attack pipeline.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Extractors to run, in output order.
    pub extractors: Vec<ExtractorSpec>,
    /// Thread-pool settings for the extraction fan-out.
    pub coordinator: CoordinatorConfig,
    /// Seed for the query subsample.
    pub query_seed: u64,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            extractors: Vec::new(),
            coordinator: CoordinatorConfig::default(),
            query_seed: DEFAULT_QUERY_SEED,
        }
    }
}

impl AttackConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an extractor. Output columns follow configuration order.
    pub fn with_extractor(mut self, spec: ExtractorSpec) -> Self {
        self.extractors.push(spec);
        self
    }

    /// Set the number of worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `threads` is 0.
    pub fn with_threads(self, threads: usize) -> Self {
        Self {
            coordinator: self.coordinator.with_threads(threads),
            ..self
        }
    }

    /// Override the query-subsample seed.
    pub fn with_query_seed(mut self, seed: u64) -> Self {
        self.query_seed = seed;
        self
    }
}

// ============================================================================
// Jobs
// ============================================================================

/// One target record with its shadow datasets, for batched runs.
#[derive(Debug, Clone)]
pub struct AttackJob {
    pub datasets: Vec<ShadowDataset>,
    pub target: Record,
}

// ============================================================================
// Pipeline
// ============================================================================

/// A fully-resolved attack over one table schema.
///
/// Construction fits the encoder on the auxiliary table and validates the
/// extractor configuration; both happen exactly once. [`run`] is then a
/// pure function of the shadow datasets and the target.
///
/// [`run`]: AttackPipeline::run
pub struct AttackPipeline {
    metadata: Metadata,
    encoder: OneHotEncoder,
    extractors: ResolvedExtractors,
    coordinator: ExtractionCoordinator,
    query_seed: u64,
}

impl AttackPipeline {
    /// Build a pipeline for the given schema and auxiliary data.
    pub fn new(metadata: Metadata, auxiliary: &Table, config: AttackConfig) -> Result<Self> {
        auxiliary.check_schema(&metadata)?;
        let extractors = ExtractorRegistry::resolve(&config.extractors)?;
        let encoder = OneHotEncoder::fit(auxiliary, &metadata)?;

        info!(
            "attack pipeline ready: {} columns, {} encoded features, {} extractors",
            metadata.len(),
            encoder.encoded_width(),
            extractors.len()
        );

        Ok(Self {
            metadata,
            encoder,
            extractors,
            coordinator: ExtractionCoordinator::new(config.coordinator),
            query_seed: config.query_seed,
        })
    }

    /// Build a pipeline with a custom predicate-counting backend.
    pub fn with_counter(
        metadata: Metadata,
        auxiliary: &Table,
        config: AttackConfig,
        counter: Arc<dyn BatchPredicateCounter>,
    ) -> Result<Self> {
        let coordinator = ExtractionCoordinator::with_counter(config.coordinator.clone(), counter);
        let mut pipeline = Self::new(metadata, auxiliary, config)?;
        pipeline.coordinator = coordinator;
        Ok(pipeline)
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    /// Run the attack for one target record.
    ///
    /// Returns the train and eval feature matrices with their membership
    /// labels, ready for the meta-classifier.
    pub fn run(&self, datasets: &[ShadowDataset], target: &Record) -> Result<FeatureMatrices> {
        if datasets.is_empty() {
            return Err(AttackError::SchemaMismatch(
                "no shadow datasets supplied".to_string(),
            ));
        }

        let queries = self.build_queries(datasets);
        let rows = self.coordinator.extract_rows(
            datasets,
            target,
            &self.metadata,
            &self.encoder,
            &self.extractors,
            &queries,
        )?;

        let matrices = FeatureMatrixAssembler::assemble(&rows)?;
        info!(
            "extracted {} train and {} eval rows with {} features",
            matrices.train_labels.len(),
            matrices.eval_labels.len(),
            matrices.num_features()
        );
        Ok(matrices)
    }

    /// Run the attack for several targets, isolating failures.
    ///
    /// One failing target never aborts the batch; its slot carries the
    /// error and the remaining jobs still run.
    pub fn run_many(&self, jobs: &[AttackJob]) -> Vec<Result<FeatureMatrices>> {
        jobs.iter()
            .enumerate()
            .map(|(i, job)| {
                let result = self.run(&job.datasets, &job.target);
                if let Err(ref e) = result {
                    warn!("attack job {i} failed: {e}");
                }
                result
            })
            .collect()
    }

    /// Query sets for each query-counting extractor and each split present
    /// in `datasets`.
    ///
    /// Every `QueryCount` entry gets its own generated set, keyed by its
    /// position in the configuration. Generation depends only on the schema
    /// and that entry's options, so regenerating per split yields identical
    /// sets; every dataset of a split then counts the exact same
    /// predicates.
    fn build_queries(&self, datasets: &[ShadowDataset]) -> SplitQueries {
        let mut queries = SplitQueries::default();
        if !self.extractors.any_uses_queries() {
            return queries;
        }

        let categorical = self.metadata.categorical_indices();
        let continuous = self.metadata.continuous_indices();
        for (index, spec) in self.extractors.specs().iter().enumerate() {
            let ExtractorSpec::QueryCount {
                orders,
                sample_size,
                conditions,
            } = spec
            else {
                continue;
            };
            let generator = QueryGenerator::new(orders.clone(), *sample_size, conditions.clone())
                .with_seed(self.query_seed);
            for split in Split::all() {
                if datasets.iter().any(|d| d.split == split) {
                    let set = generator.generate(&categorical, &continuous, self.metadata.len());
                    info!(
                        "{} queries generated for extractor {index} on the {split} split",
                        set.len()
                    );
                    queries.set(index, split, set);
                }
            }
        }
        queries
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::ConditionOptions;
    use crate::schema::ColumnDescriptor;
    use crate::table::Value;

    fn metadata() -> Metadata {
        Metadata::new(vec![
            ColumnDescriptor::continuous("age"),
            ColumnDescriptor::categorical("sex", vec!["M".into(), "F".into()]),
        ])
        .unwrap()
    }

    fn table(rows: &[(i64, &str)]) -> Table {
        Table::new(
            vec!["age".into(), "sex".into()],
            rows.iter()
                .map(|&(age, sex)| vec![Value::Int(age), Value::Text(sex.into())])
                .collect(),
        )
        .unwrap()
    }

    fn target() -> Record {
        Record::new(
            vec!["age".into(), "sex".into()],
            vec![Value::Int(30), Value::Text("F".into())],
        )
        .unwrap()
    }

    fn datasets() -> Vec<ShadowDataset> {
        vec![
            ShadowDataset::new(table(&[(20, "M"), (30, "F")]), true, Split::Train),
            ShadowDataset::new(table(&[(25, "F"), (35, "M")]), false, Split::Train),
            ShadowDataset::new(table(&[(22, "M"), (32, "F")]), false, Split::Eval),
        ]
    }

    fn pipeline(config: AttackConfig) -> AttackPipeline {
        AttackPipeline::new(metadata(), &table(&[(20, "M"), (30, "F")]), config).unwrap()
    }

    #[test]
    fn test_run_builds_both_matrices() {
        let pipeline = pipeline(
            AttackConfig::new()
                .with_extractor(ExtractorSpec::Naive)
                .with_extractor(ExtractorSpec::Correlation),
        );
        let matrices = pipeline.run(&datasets(), &target()).unwrap();

        assert_eq!(matrices.train.nrows(), 2);
        assert_eq!(matrices.eval.nrows(), 1);
        assert_eq!(matrices.train.ncols(), matrices.eval.ncols());
        assert_eq!(matrices.train_labels, vec![true, false]);
        assert_eq!(matrices.eval_labels, vec![false]);
    }

    #[test]
    fn test_empty_extractor_config_rejected() {
        let result = AttackPipeline::new(
            metadata(),
            &table(&[(20, "M")]),
            AttackConfig::new(),
        );
        assert!(matches!(
            result,
            Err(AttackError::InvalidExtractorConfig(_))
        ));
    }

    #[test]
    fn test_query_sets_shared_within_split() {
        let pipeline = pipeline(AttackConfig::new().with_extractor(ExtractorSpec::QueryCount {
            orders: vec![1, 2],
            sample_size: 100,
            conditions: ConditionOptions::default(),
        }));
        let matrices = pipeline.run(&datasets(), &target()).unwrap();

        // Both splits see the same predicate layout.
        assert_eq!(matrices.train.ncols(), matrices.eval.ncols());
        assert!(matrices.num_features() > 0);
    }

    #[test]
    fn test_each_query_extractor_gets_its_own_set() {
        // Two query-counting entries with different orders: the second must
        // count order-2 predicates, not reuse the first entry's order-1 set.
        let pipeline = pipeline(
            AttackConfig::new()
                .with_extractor(ExtractorSpec::QueryCount {
                    orders: vec![1],
                    sample_size: 100,
                    conditions: ConditionOptions::default(),
                })
                .with_extractor(ExtractorSpec::QueryCount {
                    orders: vec![2],
                    sample_size: 100,
                    conditions: ConditionOptions::default(),
                }),
        );
        let matrices = pipeline.run(&datasets(), &target()).unwrap();

        // Schema (age, sex), default options: order 1 gives "3_age" and
        // "1_sex"; order 2 gives the single conjunction "3_age_1_sex".
        assert_eq!(
            matrices.feature_names,
            vec!["3_age", "1_sex", "3_age_1_sex"]
        );
    }

    #[test]
    fn test_runs_are_deterministic() {
        let config = AttackConfig::new()
            .with_extractor(ExtractorSpec::Naive)
            .with_extractor(ExtractorSpec::QueryCount {
                orders: vec![1],
                sample_size: 100,
                conditions: ConditionOptions::default(),
            });
        let a = pipeline(config.clone()).run(&datasets(), &target()).unwrap();
        let b = pipeline(config).run(&datasets(), &target()).unwrap();
        assert_eq!(a.feature_names, b.feature_names);
        assert_eq!(a.train, b.train);
        assert_eq!(a.eval, b.eval);
    }

    #[test]
    fn test_run_many_isolates_failures() {
        let pipeline = pipeline(AttackConfig::new().with_extractor(ExtractorSpec::Naive));
        let jobs = vec![
            AttackJob {
                datasets: datasets(),
                target: target(),
            },
            AttackJob {
                // Missing eval split, so assembly fails for this job only.
                datasets: vec![ShadowDataset::new(
                    table(&[(20, "M")]),
                    true,
                    Split::Train,
                )],
                target: target(),
            },
            AttackJob {
                datasets: datasets(),
                target: target(),
            },
        ];

        let outcomes = pipeline.run_many(&jobs);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_ok());
        assert!(outcomes[1].is_err());
        assert!(outcomes[2].is_ok());
    }

    #[test]
    fn test_no_datasets_rejected() {
        let pipeline = pipeline(AttackConfig::new().with_extractor(ExtractorSpec::Naive));
        assert!(pipeline.run(&[], &target()).is_err());
    }
}
