//! Per-column summary statistics.
//!
//! For each continuous column: mean, median, population variance. For each
//! categorical column, read off its one-hot block: the number of distinct
//! categories observed, then the most- and least-frequent category (ties
//! broken by first occurrence in encoded column order). Category identity
//! is reported as the category's vocabulary index, which is stable under
//! the run's fixed metadata.
//!
//! Output length: `3·|continuous| + 3·|categorical|`.

use crate::encoding::{EncodedTable, OneHotEncoder};
use crate::error::{AttackError, Result};
use crate::extractors::FeatureBlock;

pub fn extract(encoded: &EncodedTable, encoder: &OneHotEncoder) -> Result<FeatureBlock> {
    if encoded.num_rows() == 0 {
        return Err(AttackError::SchemaMismatch(
            "naive statistics over an empty dataset".to_string(),
        ));
    }

    let continuous = encoder.continuous_names();
    let categorical = encoder.categorical_names();
    let mut names = Vec::with_capacity(3 * (continuous.len() + categorical.len()));
    let mut values = Vec::with_capacity(names.capacity());

    // Continuous block: all means, then all medians, then all variances,
    // each in schema order.
    let columns: Vec<Vec<f64>> = (0..continuous.len())
        .map(|i| encoded.values.column(i).to_vec())
        .collect();

    for (name, col) in continuous.iter().zip(&columns) {
        names.push(format!("mean_{name}"));
        values.push(mean(col));
    }
    for (name, col) in continuous.iter().zip(&columns) {
        names.push(format!("median_{name}"));
        values.push(median(col));
    }
    for (name, col) in continuous.iter().zip(&columns) {
        names.push(format!("var_{name}"));
        values.push(population_variance(col));
    }

    for cat in &categorical {
        let block = encoder.one_hot_block(cat).ok_or_else(|| {
            AttackError::SchemaMismatch(format!("no one-hot block for column '{cat}'"))
        })?;
        let sums: Vec<f64> = block
            .clone()
            .map(|i| encoded.values.column(i).sum())
            .collect();

        let distinct = sums.iter().filter(|&&s| s > 0.0).count() as f64;
        let most_frequent = argmax(&sums) as f64;
        let least_frequent = argmin(&sums) as f64;

        names.push(format!("{cat}_distinct"));
        values.push(distinct);
        names.push(format!("{cat}_most_freq"));
        values.push(most_frequent);
        names.push(format!("{cat}_least_freq"));
        values.push(least_frequent);
    }

    FeatureBlock::new(names, values)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

fn population_variance(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Index of the maximum, first occurrence on ties.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Index of the minimum, first occurrence on ties.
fn argmin(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v < values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDescriptor, Metadata};
    use crate::table::{Table, Value};

    fn scenario() -> (EncodedTable, OneHotEncoder) {
        let metadata = Metadata::new(vec![
            ColumnDescriptor::continuous("age"),
            ColumnDescriptor::categorical("sex", vec!["M".to_string(), "F".to_string()]),
        ])
        .unwrap();
        let table = Table::new(
            vec!["age".to_string(), "sex".to_string()],
            vec![
                vec![Value::Int(20), Value::from("M")],
                vec![Value::Int(30), Value::from("F")],
                vec![Value::Int(40), Value::from("M")],
            ],
        )
        .unwrap();
        let encoder = OneHotEncoder::fit(&table, &metadata).unwrap();
        let encoded = encoder.apply(&table).unwrap();
        (encoded, encoder)
    }

    #[test]
    fn test_output_length() {
        let (encoded, encoder) = scenario();
        let block = extract(&encoded, &encoder).unwrap();
        // 3 stats for "age" + 3 stats for "sex".
        assert_eq!(block.len(), 6);
    }

    #[test]
    fn test_concrete_statistics() {
        let (encoded, encoder) = scenario();
        let block = extract(&encoded, &encoder).unwrap();

        let get = |name: &str| {
            let idx = block.names.iter().position(|n| n == name).unwrap();
            block.values[idx]
        };

        assert!((get("mean_age") - 30.0).abs() < 1e-12);
        assert!((get("median_age") - 30.0).abs() < 1e-12);
        assert!((get("var_age") - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(get("sex_distinct"), 2.0);
        assert_eq!(get("sex_most_freq"), 0.0); // "M", vocabulary index 0
        assert_eq!(get("sex_least_freq"), 1.0); // "F", vocabulary index 1
    }

    #[test]
    fn test_name_groups_ordered() {
        let (encoded, encoder) = scenario();
        let block = extract(&encoded, &encoder).unwrap();
        assert_eq!(
            block.names,
            vec![
                "mean_age",
                "median_age",
                "var_age",
                "sex_distinct",
                "sex_most_freq",
                "sex_least_freq",
            ]
        );
    }

    #[test]
    fn test_even_row_count_median() {
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(median(&[5.0]), 5.0);
    }

    #[test]
    fn test_tie_break_first_occurrence() {
        assert_eq!(argmax(&[2.0, 2.0, 1.0]), 0);
        assert_eq!(argmin(&[1.0, 0.5, 0.5]), 1);
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let (_, encoder) = scenario();
        let empty = Table::new(vec!["age".to_string(), "sex".to_string()], vec![]).unwrap();
        let encoded = encoder.apply(&empty).unwrap();
        assert!(matches!(
            extract(&encoded, &encoder),
            Err(AttackError::SchemaMismatch(_))
        ));
    }
}
