//! Evaluation helpers: deterministic splits and scoring.
//!
//! Splits never shuffle. Holdout membership depends only on corpus order, so
//! retraining on the same snapshot reproduces the same report.

use std::collections::BTreeMap;

/// Every fifth element of a group goes to the holdout set.
const HOLDOUT_STRIDE: usize = 5;

/// Train/holdout index sets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Split {
    pub train: Vec<usize>,
    pub holdout: Vec<usize>,
}

/// Stratified 80/20 split by label. Labels with fewer than five samples stay
/// entirely in the training set.
pub fn stratified_split<L: Ord>(labels: &[L]) -> Split {
    let mut groups: BTreeMap<&L, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        groups.entry(label).or_default().push(i);
    }

    let mut split = Split::default();
    for indices in groups.values() {
        for (pos, &idx) in indices.iter().enumerate() {
            if indices.len() >= HOLDOUT_STRIDE && pos % HOLDOUT_STRIDE == HOLDOUT_STRIDE - 1 {
                split.holdout.push(idx);
            } else {
                split.train.push(idx);
            }
        }
    }
    split.train.sort_unstable();
    split.holdout.sort_unstable();
    split
}

/// Unstratified 80/20 split for regression targets.
pub fn holdout_split(n: usize) -> Split {
    let mut split = Split::default();
    for i in 0..n {
        if n >= HOLDOUT_STRIDE && i % HOLDOUT_STRIDE == HOLDOUT_STRIDE - 1 {
            split.holdout.push(i);
        } else {
            split.train.push(i);
        }
    }
    split
}

/// Interleaved k-fold partition: sample `i` validates in fold `i % k`.
/// `k` is capped at `n` so every fold has at least one sample.
pub fn k_folds(n: usize, k: usize) -> Vec<Split> {
    let k = k.min(n).max(1);
    (0..k)
        .map(|fold| {
            let mut split = Split::default();
            for i in 0..n {
                if i % k == fold {
                    split.holdout.push(i);
                } else {
                    split.train.push(i);
                }
            }
            split
        })
        .collect()
}

pub fn accuracy<L: PartialEq>(expected: &[L], predicted: &[L]) -> f64 {
    if expected.is_empty() {
        return 0.0;
    }
    let hits = expected.iter().zip(predicted).filter(|(a, b)| a == b).count();
    hits as f64 / expected.len() as f64
}

pub fn mean_squared_error(expected: &[f64], predicted: &[f64]) -> f64 {
    if expected.is_empty() {
        return 0.0;
    }
    expected
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum::<f64>()
        / expected.len() as f64
}

pub fn mean_absolute_error(expected: &[f64], predicted: &[f64]) -> f64 {
    if expected.is_empty() {
        return 0.0;
    }
    expected
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).abs())
        .sum::<f64>()
        / expected.len() as f64
}

/// Coefficient of determination. A constant target scores 1.0 when matched
/// exactly and 0.0 otherwise.
pub fn r2_score(expected: &[f64], predicted: &[f64]) -> f64 {
    if expected.is_empty() {
        return 0.0;
    }
    let mean = expected.iter().sum::<f64>() / expected.len() as f64;
    let ss_tot: f64 = expected.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = expected
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum();
    if ss_tot <= f64::EPSILON {
        return if ss_res <= f64::EPSILON { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stratified_split_takes_every_fifth_per_label() {
        let labels = vec!["a"; 10].into_iter().chain(vec!["b"; 3]).collect::<Vec<_>>();
        let split = stratified_split(&labels);
        assert_eq!(split.holdout, vec![4, 9]);
        assert_eq!(split.train.len(), 11);
    }

    #[test]
    fn small_labels_stay_in_training() {
        let split = stratified_split(&[1, 1, 1, 2, 2, 2]);
        assert!(split.holdout.is_empty());
        assert_eq!(split.train, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn holdout_split_is_eighty_twenty() {
        let split = holdout_split(10);
        assert_eq!(split.holdout, vec![4, 9]);
        assert_eq!(split.train.len(), 8);
        assert!(holdout_split(4).holdout.is_empty());
    }

    #[test]
    fn k_folds_cover_every_sample_once() {
        let folds = k_folds(7, 3);
        assert_eq!(folds.len(), 3);
        let mut seen: Vec<usize> = folds.iter().flat_map(|f| f.holdout.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..7).collect::<Vec<_>>());
        assert_eq!(k_folds(2, 3).len(), 2);
    }

    #[test]
    fn scoring_functions() {
        let y = [1.0, 2.0, 3.0];
        assert_eq!(r2_score(&y, &y), 1.0);
        assert_eq!(mean_squared_error(&y, &[1.0, 2.0, 5.0]), 4.0 / 3.0);
        assert_eq!(mean_absolute_error(&y, &[2.0, 2.0, 2.0]), 2.0 / 3.0);
        assert_eq!(accuracy(&["a", "b"], &["a", "c"]), 0.5);
        assert_eq!(r2_score(&[2.0, 2.0], &[2.0, 2.0]), 1.0);
        assert_eq!(r2_score(&[2.0, 2.0], &[1.0, 2.0]), 0.0);
    }
}
