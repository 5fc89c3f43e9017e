use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::tree::{DecisionTree, TreeParams};
use crate::config::FlowcastConfig;
use crate::error::{FlowcastError, Result};
use crate::features::{FeatureEncoder, FittedEncoder};
use crate::metrics::{accuracy, stratified_split};
use crate::model::{Chain, Department, NextStep, Observation, StepContext};

/// Next-step prediction with the model's probability for the returned class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub next: NextStep,
    pub confidence: f64,
    /// Every class with its probability, most likely first.
    pub alternatives: Vec<(NextStep, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model predicted the end of the chain.
    Terminal,
    /// The step budget ran out.
    MaxSteps,
    /// The model predicted the department it was already in.
    Cycle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestedStep {
    pub department: Department,
    pub step_order: u32,
    pub confidence: f64,
}

/// A synthesized approval chain starting after `seed`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainSuggestion {
    pub seed: Department,
    pub steps: Vec<SuggestedStep>,
    pub stop: StopReason,
}

impl ChainSuggestion {
    /// Seed followed by every suggested department.
    pub fn departments(&self) -> Vec<Department> {
        std::iter::once(self.seed)
            .chain(self.steps.iter().map(|s| s.department))
            .collect()
    }

    pub fn confidences(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.confidence).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionReport {
    pub chains: usize,
    pub training_pairs: usize,
    pub holdout_pairs: usize,
    /// `None` when no label had enough pairs to hold any out.
    pub holdout_accuracy: Option<f64>,
    pub label_counts: BTreeMap<String, usize>,
}

/// Multi-class next-department classifier over encoded step contexts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionModel {
    encoder: FittedEncoder,
    /// Class index -> label, ordered by department code with TERMINAL last.
    classes: Vec<NextStep>,
    tree: DecisionTree,
}

impl TransitionModel {
    /// Mines `(step -> next)` pairs from `chains` and fits the tree.
    pub fn train(chains: &[Chain], config: &FlowcastConfig) -> Result<(Self, TransitionReport)> {
        if chains.len() < config.min_chains {
            return Err(FlowcastError::insufficient(
                "transition model (chains)",
                config.min_chains,
                chains.len(),
            ));
        }

        let observations: Vec<Observation> =
            chains.iter().flat_map(|c| c.steps.iter().cloned()).collect();
        let encoder = FeatureEncoder::new(config.min_samples).fit(&observations)?;

        let pairs: Vec<(StepContext, NextStep)> = chains
            .iter()
            .flat_map(|c| c.transitions())
            .map(|(obs, next)| (obs.context(), next))
            .collect();
        if pairs.is_empty() {
            return Err(FlowcastError::insufficient("transition model (pairs)", 1, 0));
        }

        let classes = ordered_classes(&encoder, pairs.iter().map(|(_, n)| *n));
        let rows: Vec<Vec<f64>> = pairs
            .iter()
            .map(|(ctx, _)| encoder.transform(ctx).as_slice().to_vec())
            .collect();
        let labels: Vec<usize> = pairs
            .iter()
            .map(|(_, next)| class_index(&classes, *next))
            .collect();
        let params = TreeParams {
            max_depth: config.tree_max_depth,
            min_samples_split: config.tree_min_samples_split,
        };

        let split = stratified_split(&labels);
        let holdout_accuracy = if split.holdout.is_empty() {
            None
        } else {
            let train_rows: Vec<Vec<f64>> = split.train.iter().map(|&i| rows[i].clone()).collect();
            let train_labels: Vec<usize> = split.train.iter().map(|&i| labels[i]).collect();
            let held_out = DecisionTree::fit(&train_rows, &train_labels, classes.len(), params);
            let expected: Vec<usize> = split.holdout.iter().map(|&i| labels[i]).collect();
            let predicted: Vec<usize> = split
                .holdout
                .iter()
                .map(|&i| argmax(&held_out.predict_proba(&rows[i])))
                .collect();
            Some(accuracy(&expected, &predicted))
        };

        let tree = DecisionTree::fit(&rows, &labels, classes.len(), params);
        debug!(depth = tree.depth(), classes = classes.len(), "transition tree grown");

        let mut label_counts = BTreeMap::new();
        for (_, next) in &pairs {
            *label_counts.entry(next.to_string()).or_insert(0) += 1;
        }
        let report = TransitionReport {
            chains: chains.len(),
            training_pairs: split.train.len(),
            holdout_pairs: split.holdout.len(),
            holdout_accuracy,
            label_counts,
        };
        info!(
            pairs = pairs.len(),
            accuracy = ?report.holdout_accuracy,
            "transition model trained"
        );

        Ok((
            Self {
                encoder,
                classes,
                tree,
            },
            report,
        ))
    }

    pub fn encoder(&self) -> &FittedEncoder {
        &self.encoder
    }

    pub fn classes(&self) -> &[NextStep] {
        &self.classes
    }

    pub fn predict_next(&self, ctx: &StepContext) -> Prediction {
        let features = self.encoder.transform(ctx);
        let proba = self.tree.predict_proba(features.as_slice());
        let best = argmax(&proba);

        let mut alternatives: Vec<(usize, f64)> = proba.iter().copied().enumerate().collect();
        // Stable sort keeps lower class indices first among equal probabilities.
        alternatives.sort_by(|a, b| b.1.total_cmp(&a.1));

        Prediction {
            next: self.classes[best],
            confidence: proba[best],
            alternatives: alternatives
                .into_iter()
                .map(|(i, p)| (self.classes[i], p))
                .collect(),
        }
    }

    /// Repeatedly predicts the next department until TERMINAL, `max_steps`
    /// appended steps, or a repeat of the current department.
    pub fn suggest_chain(&self, seed: &StepContext, max_steps: usize) -> ChainSuggestion {
        let mut current = seed.clone();
        let mut steps = Vec::new();

        let stop = loop {
            if steps.len() >= max_steps {
                break StopReason::MaxSteps;
            }
            let prediction = self.predict_next(&current);
            match prediction.next {
                NextStep::Terminal => break StopReason::Terminal,
                NextStep::Department(dept) if dept == current.department => {
                    break StopReason::Cycle;
                }
                NextStep::Department(dept) => {
                    current = current.advance(dept);
                    steps.push(SuggestedStep {
                        department: dept,
                        step_order: current.step_order,
                        confidence: prediction.confidence,
                    });
                }
            }
        };

        ChainSuggestion {
            seed: seed.department,
            steps,
            stop,
        }
    }
}

fn ordered_classes(encoder: &FittedEncoder, labels: impl Iterator<Item = NextStep>) -> Vec<NextStep> {
    let mut classes: Vec<NextStep> = labels.collect();
    classes.sort_by_key(|label| match label {
        NextStep::Department(d) => encoder.department_code(*d),
        NextStep::Terminal => u32::MAX,
    });
    classes.dedup();
    classes
}

fn class_index(classes: &[NextStep], label: NextStep) -> usize {
    classes.iter().position(|c| *c == label).unwrap_or(0)
}

/// Index of the highest probability; the lowest index wins ties.
fn argmax(proba: &[f64]) -> usize {
    let mut best = 0;
    for (i, p) in proba.iter().enumerate() {
        if *p > proba[best] {
            best = i;
        }
    }
    best
}
