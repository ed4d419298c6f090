//! Parallel extraction over shadow datasets.
//!
//! This module fans the extraction workload out over Rayon's work-stealing
//! thread pool. Parallelism is two-level: the outer level iterates over
//! shadow datasets, the inner level over the configured extractors for one
//! dataset. Both levels feed the same pool, so a handful of large datasets
//! still keeps every worker busy.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                   ExtractionCoordinator                        │
//! │  ┌──────────────────────────────────────────────────────────┐  │
//! │  │                  Rayon Thread Pool                       │  │
//! │  │                                                          │  │
//! │  │   dataset 0          dataset 1          dataset N        │  │
//! │  │   ┌────────┐         ┌────────┐         ┌────────┐       │  │
//! │  │   │ encode │         │ encode │         │ encode │       │  │
//! │  │   └───┬────┘         └───┬────┘         └───┬────┘       │  │
//! │  │       │ par_iter         │ par_iter         │ par_iter   │  │
//! │  │   ┌───┴────┐         ┌───┴────┐         ┌───┴────┐       │  │
//! │  │   │ spec 0 │ ...     │ spec 0 │ ...     │ spec 0 │ ...   │  │
//! │  │   └───┬────┘         └───┬────┘         └───┬────┘       │  │
//! │  │       ▼                  ▼                  ▼            │  │
//! │  │   FeatureRow         FeatureRow         FeatureRow       │  │
//! │  └──────────────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every unit of work reads only shared immutable state (the encoder, the
//! target, the per-split query sets) and its own dataset, so no locks are
//! needed anywhere in the fan-out.

use crate::encoding::OneHotEncoder;
use crate::error::{AttackError, Result};
use crate::extractors::{extract, ExtractionInput, FeatureBlock, ResolvedExtractors};
use crate::qbs::{BatchPredicateCounter, TabularPredicateCounter};
use crate::queries::Query;
use crate::schema::{Metadata, Split};
use crate::table::{Record, Table};
use ahash::AHashMap;
use log::debug;
use rayon::prelude::*;
use std::sync::Arc;

// ============================================================================
// Inputs
// ============================================================================

/// One shadow dataset with its membership tag and split assignment.
#[derive(Debug, Clone)]
pub struct ShadowDataset {
    pub table: Table,
    /// True if the target record was present when this dataset was
    /// synthesized.
    pub is_member: bool,
    /// Which feature matrix this dataset's row belongs to.
    pub split: Split,
}

impl ShadowDataset {
    pub fn new(table: Table, is_member: bool, split: Split) -> Self {
        Self {
            table,
            is_member,
            split,
        }
    }
}

/// Query sets keyed by (configured extractor index, split), generated once
/// and shared across all datasets of the split.
///
/// The extractor index keys the cache because every query-counting
/// extractor carries its own orders, sample size and condition options;
/// two entries in the same configuration must each count their own
/// predicate set.
#[derive(Debug, Clone, Default)]
pub struct SplitQueries {
    train: AHashMap<usize, Arc<Vec<Query>>>,
    eval: AHashMap<usize, Arc<Vec<Query>>>,
}

impl SplitQueries {
    pub fn set(&mut self, extractor_index: usize, split: Split, queries: Vec<Query>) {
        let slot = match split {
            Split::Train => &mut self.train,
            Split::Eval => &mut self.eval,
        };
        slot.insert(extractor_index, Arc::new(queries));
    }

    pub fn for_extractor(&self, extractor_index: usize, split: Split) -> Option<&[Query]> {
        let slot = match split {
            Split::Train => &self.train,
            Split::Eval => &self.eval,
        };
        slot.get(&extractor_index).map(|q| q.as_slice())
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Thread-pool configuration for the coordinator.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorConfig {
    /// Number of worker threads.
    ///
    /// - `None`: use Rayon's global pool (typically num_cpus)
    /// - `Some(n)`: build a local pool with exactly n threads
    pub num_threads: Option<usize>,
}

impl CoordinatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `threads` is 0.
    pub fn with_threads(mut self, threads: usize) -> Self {
        assert!(threads > 0, "Thread count must be > 0");
        self.num_threads = Some(threads);
        self
    }
}

// ============================================================================
// Output
// ============================================================================

/// One shadow dataset's extracted features plus its tags.
#[derive(Debug, Clone)]
pub struct FeatureRow {
    /// Feature names, in configuration order of the extractors that
    /// produced them.
    pub names: Vec<String>,
    pub values: Vec<f64>,
    pub is_member: bool,
    pub split: Split,
}

// ============================================================================
// Coordinator
// ============================================================================

/// Runs every configured extractor against every shadow dataset.
///
/// The coordinator owns no per-run state. Each call to [`extract_rows`]
/// validates schemas, encodes what needs encoding, and fans the
/// (dataset, extractor) units out over the pool. A failure in any unit
/// aborts the call and surfaces as a `WorkerFailure` that names the
/// dataset it came from.
///
/// [`extract_rows`]: ExtractionCoordinator::extract_rows
pub struct ExtractionCoordinator {
    config: CoordinatorConfig,
    counter: Arc<dyn BatchPredicateCounter>,
}

impl ExtractionCoordinator {
    /// Coordinator counting predicates by linear scan over the raw tables.
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
            counter: Arc::new(TabularPredicateCounter),
        }
    }

    /// Coordinator with a custom counting backend.
    pub fn with_counter(config: CoordinatorConfig, counter: Arc<dyn BatchPredicateCounter>) -> Self {
        Self { config, counter }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Extract one feature row per shadow dataset.
    ///
    /// The target is encoded once up front; each dataset is encoded at most
    /// once, and only when some configured extractor consumes the encoded
    /// form. Rows come back in the same order as `datasets`.
    pub fn extract_rows(
        &self,
        datasets: &[ShadowDataset],
        target: &Record,
        metadata: &Metadata,
        encoder: &OneHotEncoder,
        extractors: &ResolvedExtractors,
        queries: &SplitQueries,
    ) -> Result<Vec<FeatureRow>> {
        target.check_schema(metadata)?;
        for (i, dataset) in datasets.iter().enumerate() {
            dataset.table.check_schema(metadata).map_err(|e| {
                e.in_worker(dataset.split, i)
            })?;
        }

        let encoded_target = if extractors.any_requires_encoding() {
            Some(encoder.apply_record(target)?)
        } else {
            None
        };

        debug!(
            "extracting {} feature rows with {} extractors",
            datasets.len(),
            extractors.len()
        );

        // build_global() only works once per process, so a configured thread
        // count gets its own local pool.
        match self.config.num_threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| {
                        AttackError::InvalidExtractorConfig(format!(
                            "failed to build thread pool with {threads} threads: {e}"
                        ))
                    })?;
                pool.install(|| {
                    self.extract_rows_inner(
                        datasets,
                        target,
                        encoder,
                        encoded_target.as_ref(),
                        extractors,
                        queries,
                    )
                })
            }
            None => self.extract_rows_inner(
                datasets,
                target,
                encoder,
                encoded_target.as_ref(),
                extractors,
                queries,
            ),
        }
    }

    fn extract_rows_inner(
        &self,
        datasets: &[ShadowDataset],
        target: &Record,
        encoder: &OneHotEncoder,
        encoded_target: Option<&ndarray::Array1<f64>>,
        extractors: &ResolvedExtractors,
        queries: &SplitQueries,
    ) -> Result<Vec<FeatureRow>> {
        datasets
            .par_iter()
            .enumerate()
            .map(|(index, dataset)| {
                self.extract_one(dataset, target, encoder, encoded_target, extractors, queries)
                    .map_err(|e| e.in_worker(dataset.split, index))
            })
            .collect()
    }

    /// One dataset: encode at most once, then run the extractors in
    /// parallel and concatenate their blocks in configuration order.
    fn extract_one(
        &self,
        dataset: &ShadowDataset,
        target: &Record,
        encoder: &OneHotEncoder,
        encoded_target: Option<&ndarray::Array1<f64>>,
        extractors: &ResolvedExtractors,
        queries: &SplitQueries,
    ) -> Result<FeatureRow> {
        let encoded = if extractors.any_requires_encoding() {
            Some(encoder.apply(&dataset.table)?)
        } else {
            None
        };

        let blocks: Vec<FeatureBlock> = extractors
            .specs()
            .par_iter()
            .enumerate()
            .map(|(spec_index, spec)| {
                let input = ExtractionInput {
                    table: &dataset.table,
                    encoded: encoded.as_ref(),
                    encoded_target,
                    target,
                    encoder,
                    queries: queries.for_extractor(spec_index, dataset.split),
                    counter: self.counter.as_ref(),
                };
                extract(spec, &input)
            })
            .collect::<Result<_>>()?;

        let total: usize = blocks.iter().map(FeatureBlock::len).sum();
        let mut names = Vec::with_capacity(total);
        let mut values = Vec::with_capacity(total);
        for block in blocks {
            names.extend(block.names);
            values.extend(block.values);
        }

        Ok(FeatureRow {
            names,
            values,
            is_member: dataset.is_member,
            split: dataset.split,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::{ExtractorRegistry, ExtractorSpec};
    use crate::schema::{ColumnDescriptor, Metadata};
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

    fn fixture() -> (Metadata, OneHotEncoder, Record, Vec<ShadowDataset>) {
        let meta = metadata();
        let aux = table(&[(20, "M"), (30, "F")]);
        let encoder = OneHotEncoder::fit(&aux, &meta).unwrap();
        let target = Record::new(
            vec!["age".into(), "sex".into()],
            vec![Value::Int(30), Value::Text("F".into())],
        )
        .unwrap();
        let datasets = vec![
            ShadowDataset::new(table(&[(20, "M"), (30, "F"), (40, "M")]), true, Split::Train),
            ShadowDataset::new(table(&[(25, "F"), (35, "M"), (45, "F")]), false, Split::Train),
            ShadowDataset::new(table(&[(22, "M"), (32, "F"), (42, "M")]), true, Split::Eval),
        ];
        (meta, encoder, target, datasets)
    }

    #[test]
    fn test_rows_preserve_order_and_tags() {
        let (meta, encoder, target, datasets) = fixture();
        let extractors = ExtractorRegistry::resolve(&[ExtractorSpec::Naive]).unwrap();
        let coordinator = ExtractionCoordinator::new(CoordinatorConfig::new());

        let rows = coordinator
            .extract_rows(
                &datasets,
                &target,
                &meta,
                &encoder,
                &extractors,
                &SplitQueries::default(),
            )
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_member);
        assert!(!rows[1].is_member);
        assert_eq!(rows[0].split, Split::Train);
        assert_eq!(rows[2].split, Split::Eval);
        assert_eq!(rows[0].names, rows[1].names);
    }

    #[test]
    fn test_blocks_concatenate_in_config_order() {
        let (meta, encoder, target, datasets) = fixture();
        let extractors =
            ExtractorRegistry::resolve(&[ExtractorSpec::Naive, ExtractorSpec::AllDistances])
                .unwrap();
        let coordinator = ExtractionCoordinator::new(CoordinatorConfig::new());

        let rows = coordinator
            .extract_rows(
                &datasets,
                &target,
                &meta,
                &encoder,
                &extractors,
                &SplitQueries::default(),
            )
            .unwrap();

        // Naive features come first, distance scalars last.
        let names = &rows[0].names;
        assert!(names.first().unwrap().starts_with("mean_"));
        assert!(names.last().unwrap().starts_with("distance_"));
        assert_eq!(names.len(), rows[0].values.len());
    }

    #[test]
    fn test_schema_mismatch_names_failing_dataset() {
        let (meta, encoder, target, mut datasets) = fixture();
        datasets[1] = ShadowDataset::new(
            Table::new(
                vec!["age".into(), "income".into()],
                vec![vec![Value::Int(25), Value::Int(50_000)]],
            )
            .unwrap(),
            false,
            Split::Train,
        );
        let extractors = ExtractorRegistry::resolve(&[ExtractorSpec::Naive]).unwrap();
        let coordinator = ExtractionCoordinator::new(CoordinatorConfig::new());

        let err = coordinator
            .extract_rows(
                &datasets,
                &target,
                &meta,
                &encoder,
                &extractors,
                &SplitQueries::default(),
            )
            .unwrap_err();

        match err {
            AttackError::WorkerFailure {
                split,
                dataset_index,
                ..
            } => {
                assert_eq!(split, Split::Train);
                assert_eq!(dataset_index, 1);
            }
            other => panic!("expected WorkerFailure, got {other}"),
        }
    }

    #[test]
    fn test_encoding_failure_wrapped_as_worker_failure() {
        let (meta, encoder, target, mut datasets) = fixture();
        // Category outside the fitted vocabulary.
        datasets[2] = ShadowDataset::new(table(&[(22, "X")]), true, Split::Eval);
        let extractors = ExtractorRegistry::resolve(&[ExtractorSpec::Naive]).unwrap();
        let coordinator = ExtractionCoordinator::new(CoordinatorConfig::new());

        let err = coordinator
            .extract_rows(
                &datasets,
                &target,
                &meta,
                &encoder,
                &extractors,
                &SplitQueries::default(),
            )
            .unwrap_err();

        match err {
            AttackError::WorkerFailure {
                split,
                dataset_index,
                source,
            } => {
                assert_eq!(split, Split::Eval);
                assert_eq!(dataset_index, 2);
                assert!(matches!(*source, AttackError::Encoding { .. }));
            }
            other => panic!("expected WorkerFailure, got {other}"),
        }
    }

    #[test]
    fn test_local_pool_thread_count() {
        let (meta, encoder, target, datasets) = fixture();
        let extractors = ExtractorRegistry::resolve(&[ExtractorSpec::Correlation]).unwrap();
        let coordinator = ExtractionCoordinator::new(CoordinatorConfig::new().with_threads(2));

        let rows = coordinator
            .extract_rows(
                &datasets,
                &target,
                &meta,
                &encoder,
                &extractors,
                &SplitQueries::default(),
            )
            .unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    #[should_panic(expected = "Thread count must be > 0")]
    fn test_zero_threads_rejected() {
        CoordinatorConfig::new().with_threads(0);
    }

    #[test]
    fn test_query_extractor_runs_on_raw_table() {
        let (meta, encoder, target, datasets) = fixture();
        let extractors = ExtractorRegistry::resolve(&[ExtractorSpec::QueryCount {
            orders: vec![1],
            sample_size: 100,
            conditions: Default::default(),
        }])
        .unwrap();
        let coordinator = ExtractionCoordinator::new(CoordinatorConfig::new());

        let mut queries = SplitQueries::default();
        let shared = vec![
            Query {
                conditions: vec![crate::queries::condition::GTE, crate::queries::condition::NONE],
            },
            Query {
                conditions: vec![crate::queries::condition::NONE, crate::queries::condition::EQ],
            },
        ];
        queries.set(0, Split::Train, shared.clone());
        queries.set(0, Split::Eval, shared);

        let rows = coordinator
            .extract_rows(
                &datasets,
                &target,
                &meta,
                &encoder,
                &extractors,
                &queries,
            )
            .unwrap();

        assert_eq!(rows[0].names, vec!["3_age", "1_sex"]);
        // Target is (30, "F"): dataset 0 has ages 20/30/40 and one "F".
        assert_eq!(rows[0].values, vec![2.0, 1.0]);
    }
}
