use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Term -> column index, frozen after fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    terms: BTreeMap<String, usize>,
}

impl Vocabulary {
    pub fn fit<'a>(documents: impl IntoIterator<Item = &'a [String]>) -> Self {
        let mut terms = BTreeMap::new();
        for doc in documents {
            for term in doc {
                terms.entry(term.clone()).or_insert(0);
            }
        }
        // Index by sorted order so equal corpora give equal vocabularies.
        for (i, idx) in terms.values_mut().enumerate() {
            *idx = i;
        }
        Self { terms }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Sparse term counts. Terms outside the vocabulary are dropped.
    pub fn counts(&self, terms: &[String]) -> BTreeMap<usize, u32> {
        let mut counts = BTreeMap::new();
        for term in terms {
            if let Some(&idx) = self.terms.get(term) {
                *counts.entry(idx).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Multinomial naive Bayes with additive smoothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaiveBayes {
    log_priors: Vec<f64>,
    /// `[class][term]` smoothed log-likelihoods.
    log_likelihoods: Vec<Vec<f64>>,
}

impl NaiveBayes {
    pub fn fit(
        documents: &[BTreeMap<usize, u32>],
        labels: &[usize],
        n_classes: usize,
        n_terms: usize,
        alpha: f64,
    ) -> Self {
        let mut class_docs = vec![0usize; n_classes];
        let mut term_counts = vec![vec![0.0; n_terms]; n_classes];
        for (doc, &label) in documents.iter().zip(labels) {
            class_docs[label] += 1;
            for (&term, &count) in doc {
                term_counts[label][term] += count as f64;
            }
        }

        let total_docs = documents.len().max(1) as f64;
        let log_priors = class_docs
            .iter()
            .map(|&n| (n.max(1) as f64 / total_docs).ln())
            .collect();
        let log_likelihoods = term_counts
            .iter()
            .map(|counts| {
                let denom = counts.iter().sum::<f64>() + alpha * n_terms as f64;
                counts.iter().map(|c| ((c + alpha) / denom).ln()).collect()
            })
            .collect();

        Self {
            log_priors,
            log_likelihoods,
        }
    }

    /// Normalized class posteriors.
    pub fn predict_proba(&self, doc: &BTreeMap<usize, u32>) -> Vec<f64> {
        let scores: Vec<f64> = self
            .log_priors
            .iter()
            .zip(&self.log_likelihoods)
            .map(|(prior, likelihood)| {
                prior
                    + doc
                        .iter()
                        .map(|(&term, &count)| count as f64 * likelihood[term])
                        .sum::<f64>()
            })
            .collect();
        softmax(&scores)
    }
}

/// Log-sum-exp normalization.
fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exp.iter().sum();
    exp.iter().map(|e| e / total).collect()
}
