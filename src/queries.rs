//! Reproducible combinatorial predicate generation.
//!
//! A `Query` places one condition code per dataset column; the query's
//! *order* is the number of non-zero codes. The generator enumerates, for
//! each requested order `k`, all C(n, k) ascending column combinations and
//! the cartesian product of the admissible condition options across the
//! chosen columns, then caps the result with a seeded distinct subsample.
//!
//! The full set grows as `Σ_k C(n, k) · b^k` for branching factor `b`, and
//! the generator makes no attempt to bound that explosion itself: callers
//! must always pass a `sample_size` cap.
//!
//! Query sets are generated once per split, from the first dataset of that
//! split, and reused for every dataset in the split. That is what keeps the
//! query-feature columns identical across all rows of the final matrix.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Condition codes carried by a query, one per column.
pub mod condition {
    /// No condition on this column.
    pub const NONE: i8 = 0;
    /// Equal to the target's value.
    pub const EQ: i8 = 1;
    /// Not equal to the target's value.
    pub const NEQ: i8 = -1;
    /// Greater than the target's value.
    pub const GT: i8 = 2;
    /// Greater than or equal to the target's value.
    pub const GTE: i8 = 3;
    /// Less than the target's value.
    pub const LT: i8 = -2;
    /// Less than or equal to the target's value.
    pub const LTE: i8 = -3;
}

/// Default seed for the query subsample.
pub const DEFAULT_QUERY_SEED: u64 = 42;

/// One predicate over the dataset columns.
///
/// Invariant: `conditions.len()` always equals the dataset's column count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    pub conditions: Vec<i8>,
}

impl Query {
    /// Number of non-zero conditions.
    pub fn order(&self) -> usize {
        self.conditions.iter().filter(|&&c| c != condition::NONE).count()
    }

    /// Indices of the constrained columns, ascending.
    pub fn constrained_columns(&self) -> Vec<usize> {
        self.conditions
            .iter()
            .enumerate()
            .filter(|(_, &c)| c != condition::NONE)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Condition options drawn per column kind when building queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionOptions {
    /// Options for categorical columns, e.g. `[EQ]` or `[NEQ, EQ]`.
    pub categorical: Vec<i8>,
    /// Options for continuous columns, e.g. `[GTE]` or `[GTE, LTE]`.
    pub continuous: Vec<i8>,
}

impl Default for ConditionOptions {
    /// Equality on categorical columns, ≥ on continuous columns.
    fn default() -> Self {
        Self {
            categorical: vec![condition::EQ],
            continuous: vec![condition::GTE],
        }
    }
}

/// Builds reproducible combinatorial predicate sets over dataset columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryGenerator {
    /// Orders (non-zero condition counts) to enumerate.
    orders: Vec<usize>,
    /// Hard cap on the returned set; a seeded subsample is drawn above it.
    sample_size: usize,
    options: ConditionOptions,
    seed: u64,
}

impl QueryGenerator {
    pub fn new(orders: Vec<usize>, sample_size: usize, options: ConditionOptions) -> Self {
        Self {
            orders,
            sample_size,
            options,
            seed: DEFAULT_QUERY_SEED,
        }
    }

    /// Override the sampling seed. Identical inputs and seed yield an
    /// identical ordered query set.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn orders(&self) -> &[usize] {
        &self.orders
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Generate the predicate set for a dataset shape.
    ///
    /// `categorical_indices` and `continuous_indices` partition
    /// `0..num_columns`; a column listed in neither draws the continuous
    /// options. Combinations are enumerated in ascending lexicographic
    /// order, options in their configured order, orders in their configured
    /// order, so the output is fully deterministic before sampling; the
    /// subsample itself is seeded.
    pub fn generate(
        &self,
        categorical_indices: &[usize],
        _continuous_indices: &[usize],
        num_columns: usize,
    ) -> Vec<Query> {
        let mut all = Vec::new();

        for &order in &self.orders {
            if order == 0 || order > num_columns {
                continue;
            }
            for combo in combinations(num_columns, order) {
                // Cartesian product of the per-column condition options.
                let mut variants = vec![vec![condition::NONE; num_columns]];
                for &col in &combo {
                    let opts = if categorical_indices.contains(&col) {
                        &self.options.categorical
                    } else {
                        &self.options.continuous
                    };
                    let mut next = Vec::with_capacity(variants.len() * opts.len());
                    for variant in &variants {
                        for &opt in opts {
                            let mut q = variant.clone();
                            q[col] = opt;
                            next.push(q);
                        }
                    }
                    variants = next;
                }
                all.extend(variants.into_iter().map(|conditions| Query { conditions }));
            }
        }

        if all.len() > self.sample_size {
            let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
            let picked = rand::seq::index::sample(&mut rng, all.len(), self.sample_size);
            picked.into_iter().map(|i| all[i].clone()).collect()
        } else {
            all
        }
    }
}

/// All C(n, k) index combinations in ascending lexicographic order.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    debug_assert!(k >= 1 && k <= n);
    let mut out = Vec::new();
    let mut current: Vec<usize> = (0..k).collect();
    loop {
        out.push(current.clone());
        // Advance to the next combination, rightmost index first.
        let mut i = k;
        loop {
            if i == 0 {
                return out;
            }
            i -= 1;
            if current[i] < n - (k - i) {
                break;
            }
        }
        current[i] += 1;
        for j in i + 1..k {
            current[j] = current[j - 1] + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combinations_ascending() {
        let combos = combinations(4, 2);
        assert_eq!(
            combos,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3],
            ]
        );
    }

    #[test]
    fn test_combinations_full_width() {
        assert_eq!(combinations(3, 3), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_order_one_counts() {
        // 3 columns, column 0 categorical with two options, columns 1 and 2
        // continuous with two options: exactly 6 order-1 queries.
        let gen = QueryGenerator::new(
            vec![1],
            1_000_000,
            ConditionOptions {
                categorical: vec![condition::NEQ, condition::EQ],
                continuous: vec![condition::GTE, condition::LTE],
            },
        );
        let queries = gen.generate(&[0], &[1, 2], 3);

        assert_eq!(queries.len(), 6);
        for q in &queries {
            assert_eq!(q.order(), 1);
            assert_eq!(q.conditions.len(), 3);
        }
        let touching = |col: usize| {
            queries
                .iter()
                .filter(|q| q.conditions[col] != condition::NONE)
                .count()
        };
        assert_eq!(touching(0), 2);
        assert_eq!(touching(1), 2);
        assert_eq!(touching(2), 2);
    }

    #[test]
    fn test_deterministic_with_same_seed() {
        let gen = QueryGenerator::new(
            vec![1, 2, 3],
            20,
            ConditionOptions::default(),
        )
        .with_seed(7);
        let a = gen.generate(&[0, 1], &[2, 3, 4], 5);
        let b = gen.generate(&[0, 1], &[2, 3, 4], 5);
        assert_eq!(a, b);
        assert_eq!(a.len(), 20); // 5 + 10 + 10 = 25 > 20, so sampled
    }

    #[test]
    fn test_different_seed_changes_subset() {
        let opts = ConditionOptions {
            categorical: vec![condition::NEQ, condition::EQ],
            continuous: vec![condition::GTE, condition::LTE],
        };
        let a = QueryGenerator::new(vec![1, 2], 10, opts.clone())
            .with_seed(1)
            .generate(&[0, 1, 2], &[3, 4, 5], 6);
        let b = QueryGenerator::new(vec![1, 2], 10, opts)
            .with_seed(2)
            .generate(&[0, 1, 2], &[3, 4, 5], 6);
        assert_eq!(a.len(), 10);
        assert_eq!(b.len(), 10);
        // Different seeds pick a different subset with overwhelming
        // probability on a 72-query population.
        assert_ne!(a, b);
    }

    #[test]
    fn test_no_sampling_below_cap() {
        let gen = QueryGenerator::new(vec![1], 100, ConditionOptions::default());
        let queries = gen.generate(&[0], &[1], 2);
        assert_eq!(queries.len(), 2); // full set, unsampled
    }

    #[test]
    fn test_every_order_present() {
        let gen = QueryGenerator::new(vec![1, 2], 1_000_000, ConditionOptions::default());
        let queries = gen.generate(&[0], &[1, 2], 3);
        // Order 1: 3 queries; order 2: C(3,2) = 3 queries, one option each.
        assert_eq!(queries.iter().filter(|q| q.order() == 1).count(), 3);
        assert_eq!(queries.iter().filter(|q| q.order() == 2).count(), 3);
    }

    #[test]
    fn test_orders_beyond_width_skipped() {
        let gen = QueryGenerator::new(vec![1, 5], 100, ConditionOptions::default());
        let queries = gen.generate(&[], &[0, 1], 2);
        assert_eq!(queries.len(), 2); // order 5 contributes nothing
    }
}
