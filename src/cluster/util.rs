use std::collections::BTreeSet;

use crate::error::{EvalError, EvalResult};

#[inline]
pub(crate) fn squared_euclidean(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum()
}

#[inline]
pub(crate) fn euclidean(a: &[f32], b: &[f32]) -> f64 {
    squared_euclidean(a, b).sqrt()
}

/// Check that `data` is non-empty and rectangular; returns the row width.
pub(crate) fn check_rows(data: &[Vec<f32>]) -> EvalResult<usize> {
    let first = data.first().ok_or(EvalError::EmptyInput)?;
    let d = first.len();
    if d == 0 {
        return Err(EvalError::InvalidParameter {
            name:    "dimension",
            message: "must be at least 1".to_string(),
        });
    }
    for row in data.iter().skip(1) {
        if row.len() != d {
            return Err(EvalError::DimensionMismatch { expected: d, found: row.len() });
        }
    }
    Ok(d)
}

/// Dense symmetric matrix of Euclidean distances, row-major n*n.
pub(crate) fn pairwise_distances(data: &[Vec<f32>]) -> Vec<f64> {
    let n = data.len();
    let mut dists = vec![0.0f64; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = euclidean(&data[i], &data[j]);
            dists[i * n + j] = d;
            dists[j * n + i] = d;
        }
    }
    dists
}

/// Index of the row in `centers` closest to `point`.
pub(crate) fn nearest(point: &[f32], centers: &[Vec<f32>]) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (k, c) in centers.iter().enumerate() {
        let d = squared_euclidean(point, c);
        if d < best_d {
            best_d = d;
            best = k;
        }
    }
    best
}

pub(crate) fn n_distinct(labels: &[usize]) -> usize {
    labels.iter().collect::<BTreeSet<_>>().len()
}

/// Median of a slice (mean of the two middle values for even lengths).
pub(crate) fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 2.0, 3.0]), 2.5);
    }

    #[test]
    fn test_check_rows_rejects_ragged_input() {
        let data = vec![vec![0.0, 1.0], vec![0.0]];
        assert!(matches!(
            check_rows(&data),
            Err(EvalError::DimensionMismatch { expected: 2, found: 1 })
        ));
        assert!(matches!(check_rows(&[]), Err(EvalError::EmptyInput)));
    }

    #[test]
    fn test_nearest_center() {
        let centers = vec![vec![0.0, 0.0], vec![10.0, 10.0]];
        assert_eq!(nearest(&[9.0, 9.5], &centers), 1);
        assert_eq!(nearest(&[0.5, -1.0], &centers), 0);
    }
}
