use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::bayes::{NaiveBayes, Vocabulary};
use super::tokenize::terms;
use crate::config::FlowcastConfig;
use crate::error::{FlowcastError, Result};
use crate::metrics::{accuracy, stratified_split};
use crate::model::Department;

const SMOOTHING: f64 = 1.0;

/// A free-text request with its known routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledText {
    pub text: String,
    pub department: Department,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub department: Department,
    /// Posterior of the top class, kept even when `fallback` replaced it.
    pub confidence: f64,
    /// True when the top posterior was under the threshold and the
    /// department was replaced by [`Department::Other`].
    pub fallback: bool,
    pub ranking: Vec<(Department, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextReport {
    pub samples: usize,
    pub training_samples: usize,
    pub holdout_samples: usize,
    pub holdout_accuracy: Option<f64>,
    pub vocabulary_size: usize,
    pub label_counts: BTreeMap<String, usize>,
}

/// Routes request text to a department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextClassifier {
    vocabulary: Vocabulary,
    classes: Vec<Department>,
    model: NaiveBayes,
    threshold: f64,
}

impl TextClassifier {
    pub fn train(samples: &[LabeledText], config: &FlowcastConfig) -> Result<(Self, TextReport)> {
        let required = config.min_samples.max(1);
        if samples.len() < required {
            return Err(FlowcastError::insufficient("text classifier", required, samples.len()));
        }
        let classes: Vec<Department> = samples
            .iter()
            .map(|s| s.department)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if classes.len() < 2 {
            return Err(FlowcastError::insufficient(
                "text classifier (departments)",
                2,
                classes.len(),
            ));
        }

        let documents: Vec<Vec<String>> = samples.iter().map(|s| terms(&s.text)).collect();
        let labels: Vec<usize> = samples
            .iter()
            .map(|s| classes.binary_search(&s.department).unwrap_or(0))
            .collect();

        let split = stratified_split(&labels);
        let holdout_accuracy = if split.holdout.is_empty() {
            None
        } else {
            let held_out = Self::fit(&documents, &labels, &classes, &split.train, config.confidence_threshold);
            let expected: Vec<usize> = split.holdout.iter().map(|&i| labels[i]).collect();
            let predicted: Vec<usize> = split
                .holdout
                .iter()
                .map(|&i| held_out.best_class(&documents[i]).0)
                .collect();
            Some(accuracy(&expected, &predicted))
        };

        let all: Vec<usize> = (0..samples.len()).collect();
        let classifier = Self::fit(&documents, &labels, &classes, &all, config.confidence_threshold);

        let mut label_counts = BTreeMap::new();
        for s in samples {
            *label_counts.entry(s.department.to_string()).or_insert(0) += 1;
        }
        let report = TextReport {
            samples: samples.len(),
            training_samples: split.train.len(),
            holdout_samples: split.holdout.len(),
            holdout_accuracy,
            vocabulary_size: classifier.vocabulary.len(),
            label_counts,
        };
        info!(
            samples = report.samples,
            vocabulary = report.vocabulary_size,
            accuracy = ?report.holdout_accuracy,
            "text classifier trained"
        );
        Ok((classifier, report))
    }

    fn fit(
        documents: &[Vec<String>],
        labels: &[usize],
        classes: &[Department],
        indices: &[usize],
        threshold: f64,
    ) -> Self {
        let vocabulary = Vocabulary::fit(indices.iter().map(|&i| documents[i].as_slice()));
        let encoded: Vec<BTreeMap<usize, u32>> =
            indices.iter().map(|&i| vocabulary.counts(&documents[i])).collect();
        let subset_labels: Vec<usize> = indices.iter().map(|&i| labels[i]).collect();
        let model = NaiveBayes::fit(&encoded, &subset_labels, classes.len(), vocabulary.len(), SMOOTHING);
        Self {
            vocabulary,
            classes: classes.to_vec(),
            model,
            threshold,
        }
    }

    fn posteriors(&self, terms: &[String]) -> Vec<f64> {
        self.model.predict_proba(&self.vocabulary.counts(terms))
    }

    /// Index and posterior of the most likely class; the lowest index wins ties.
    fn best_class(&self, terms: &[String]) -> (usize, f64) {
        let proba = self.posteriors(terms);
        let mut best = 0;
        for (i, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = i;
            }
        }
        (best, proba[best])
    }

    pub fn departments(&self) -> &[Department] {
        &self.classes
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn classify(&self, text: &str) -> Result<Classification> {
        if text.trim().is_empty() {
            return Err(FlowcastError::invalid("text", "must not be empty"));
        }
        let terms = terms(text);
        let proba = self.posteriors(&terms);
        let (best, confidence) = self.best_class(&terms);

        let mut ranking: Vec<(Department, f64)> =
            self.classes.iter().copied().zip(proba).collect();
        ranking.sort_by(|a, b| b.1.total_cmp(&a.1));

        let fallback = confidence < self.threshold;
        if fallback {
            warn!(
                confidence,
                threshold = self.threshold,
                "low-confidence classification, routing to Other"
            );
        }
        Ok(Classification {
            department: if fallback { Department::Other } else { self.classes[best] },
            confidence,
            fallback,
            ranking,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{labeled, routing_phrases};

    fn trained() -> TextClassifier {
        TextClassifier::train(&routing_phrases(), &FlowcastConfig::default())
            .unwrap()
            .0
    }

    #[test]
    fn vacation_request_goes_to_hr() {
        let result = trained().classify("I need vacation time next week").unwrap();
        assert_eq!(result.department, Department::Hr);
        assert!(!result.fallback);
        assert!(result.confidence >= 0.4);
        assert_eq!(result.ranking[0].0, Department::Hr);
    }

    #[test]
    fn laptop_issue_goes_to_it() {
        let result = trained().classify("my laptop password is not working").unwrap();
        assert_eq!(result.department, Department::It);
    }

    #[test]
    fn unknown_terms_fall_back_to_other() {
        let result = trained().classify("zzzz qqqq").unwrap();
        assert_eq!(result.department, Department::Other);
        assert!(result.fallback);
        // Priors only: HR holds 5 of 17 examples.
        assert!((result.confidence - 5.0 / 17.0).abs() < 1e-9);
    }

    #[test]
    fn empty_text_is_invalid() {
        let err = trained().classify("   ").unwrap_err();
        assert_eq!(err.field(), Some("text"));
    }

    #[test]
    fn requires_min_samples() {
        let few = routing_phrases().into_iter().take(5).collect::<Vec<_>>();
        let err = TextClassifier::train(&few, &FlowcastConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            FlowcastError::InsufficientData { required: 10, actual: 5, .. }
        ));
    }

    #[test]
    fn requires_two_departments() {
        let same: Vec<LabeledText> = (0..12)
            .map(|i| labeled(&format!("vacation request {i}"), Department::Hr))
            .collect();
        let err = TextClassifier::train(&same, &FlowcastConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            FlowcastError::InsufficientData { required: 2, actual: 1, .. }
        ));
    }

    #[test]
    fn report_counts_labels() {
        let (_, report) = TextClassifier::train(&routing_phrases(), &FlowcastConfig::default()).unwrap();
        assert_eq!(report.samples, 17);
        assert_eq!(report.label_counts["HR"], 5);
        assert_eq!(report.holdout_samples, 1);
        assert!(report.vocabulary_size > 0);
    }
}
