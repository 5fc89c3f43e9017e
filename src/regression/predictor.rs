use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::insights;
use super::linear::{LinearModel, Solver};
use crate::config::FlowcastConfig;
use crate::error::{FlowcastError, Result};
use crate::features::{FeatureEncoder, FittedEncoder};
use crate::metrics::{holdout_split, k_folds, mean_absolute_error, mean_squared_error, r2_score};
use crate::model::{Observation, StepContext, Status};

/// What a [`RegressionPredictor`] estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressionTarget {
    /// Hours between creation and decision of a step.
    ApprovalHours,
    /// Probability that a step ends approved.
    SuccessProbability,
}

impl RegressionTarget {
    /// Target value for `obs`, or `None` when the observation carries no label.
    pub fn value(&self, obs: &Observation) -> Option<f64> {
        match self {
            RegressionTarget::ApprovalHours => obs.duration_hours(),
            RegressionTarget::SuccessProbability => match obs.status {
                Status::Approved => Some(1.0),
                Status::Rejected => Some(0.0),
                Status::Pending => None,
            },
        }
    }

    /// Bounds the raw model output into the target's valid range.
    pub fn estimate(&self, raw: f64) -> Estimate {
        let (lower, upper) = match self {
            RegressionTarget::ApprovalHours => (0.0, f64::INFINITY),
            RegressionTarget::SuccessProbability => (0.0, 1.0),
        };
        let value = if raw.is_nan() { lower } else { raw.clamp(lower, upper) };
        Estimate {
            target: *self,
            value,
            raw,
            clamped: value != raw,
        }
    }
}

impl fmt::Display for RegressionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegressionTarget::ApprovalHours => write!(f, "approval time"),
            RegressionTarget::SuccessProbability => write!(f, "approval likelihood"),
        }
    }
}

/// A bounded prediction. `raw` keeps the unclamped model output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Estimate {
    pub target: RegressionTarget,
    pub value: f64,
    pub raw: f64,
    pub clamped: bool,
}

impl Estimate {
    pub fn readable(&self) -> String {
        match self.target {
            RegressionTarget::ApprovalHours if self.value >= 24.0 => {
                format!("{:.1} days", self.value / 24.0)
            }
            RegressionTarget::ApprovalHours => format!("{:.1} hours", self.value),
            RegressionTarget::SuccessProbability => format!("{:.1}%", self.value * 100.0),
        }
    }
}

/// Named coefficient of the active linear model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureWeight {
    pub name: String,
    pub coefficient: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub solver: Solver,
    pub fold_mse: Vec<f64>,
    pub cv_mse: f64,
    pub holdout_r2: Option<f64>,
    pub holdout_mse: Option<f64>,
    pub holdout_mae: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    pub target: RegressionTarget,
    pub samples: usize,
    pub training_samples: usize,
    pub holdout_samples: usize,
    pub selected: Solver,
    pub candidates: Vec<CandidateScore>,
}

impl RegressionReport {
    pub fn selected_score(&self) -> Option<&CandidateScore> {
        self.candidates.iter().find(|c| c.solver == self.selected)
    }

    /// Holdout R² of the selected candidate.
    pub fn holdout_r2(&self) -> Option<f64> {
        self.selected_score().and_then(|c| c.holdout_r2)
    }
}

/// Linear predictor for one [`RegressionTarget`] with its frozen encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionPredictor {
    target: RegressionTarget,
    encoder: FittedEncoder,
    model: LinearModel,
}

impl RegressionPredictor {
    /// Scores OLS, ridge and lasso by k-fold MSE on the training part, keeps
    /// the best and refits it on every usable observation.
    pub fn train(
        observations: &[Observation],
        target: RegressionTarget,
        config: &FlowcastConfig,
    ) -> Result<(Self, RegressionReport)> {
        let usable: Vec<(&Observation, f64)> = observations
            .iter()
            .filter_map(|obs| target.value(obs).map(|y| (obs, y)))
            .collect();
        if usable.len() < config.min_samples.max(1) {
            return Err(FlowcastError::insufficient(
                &format!("{target} regressor"),
                config.min_samples.max(1),
                usable.len(),
            ));
        }

        let contexts: Vec<StepContext> = usable.iter().map(|(obs, _)| obs.context()).collect();
        let encoder = FeatureEncoder::new(config.min_samples).fit_contexts(&contexts)?;
        let rows: Vec<Vec<f64>> = contexts
            .iter()
            .map(|ctx| encoder.transform(ctx).as_slice().to_vec())
            .collect();
        let targets: Vec<f64> = usable.iter().map(|(_, y)| *y).collect();

        let split = holdout_split(rows.len());
        let candidates = [
            Solver::Ols,
            Solver::Ridge {
                alpha: config.ridge_alpha,
            },
            Solver::Lasso {
                alpha: config.lasso_alpha,
            },
        ];
        let scores: Vec<CandidateScore> = candidates
            .par_iter()
            .map(|solver| score_candidate(*solver, &rows, &targets, &split.train, &split.holdout, config.cv_folds))
            .collect();
        for score in &scores {
            debug!(
                solver = %score.solver,
                cv_mse = score.cv_mse,
                holdout_r2 = ?score.holdout_r2,
                "regression candidate scored"
            );
        }

        let mut selected = &scores[0];
        for score in &scores[1..] {
            if score.cv_mse < selected.cv_mse {
                selected = score;
            }
        }
        let solver = selected.solver;
        let model = LinearModel::fit(solver, &rows, &targets);

        let report = RegressionReport {
            target,
            samples: rows.len(),
            training_samples: split.train.len(),
            holdout_samples: split.holdout.len(),
            selected: solver,
            candidates: scores,
        };
        info!(
            target = %target,
            solver = %solver,
            samples = report.samples,
            r2 = ?report.holdout_r2(),
            "regressor trained"
        );

        Ok((
            Self {
                target,
                encoder,
                model,
            },
            report,
        ))
    }

    pub fn target(&self) -> RegressionTarget {
        self.target
    }

    pub fn encoder(&self) -> &FittedEncoder {
        &self.encoder
    }

    pub fn solver(&self) -> Solver {
        self.model.solver
    }

    pub fn estimate(&self, ctx: &StepContext) -> Estimate {
        let features = self.encoder.transform(ctx);
        self.target.estimate(self.model.predict(features.as_slice()))
    }

    /// Coefficients by decreasing magnitude; equal magnitudes sort by name.
    pub fn feature_importance(&self) -> Vec<FeatureWeight> {
        let mut weights: Vec<FeatureWeight> = self
            .encoder
            .feature_names()
            .into_iter()
            .zip(&self.model.coefficients)
            .map(|(name, coefficient)| FeatureWeight {
                name,
                coefficient: *coefficient,
            })
            .collect();
        weights.sort_by(|a, b| {
            b.coefficient
                .abs()
                .total_cmp(&a.coefficient.abs())
                .then_with(|| a.name.cmp(&b.name))
        });
        weights
    }

    pub fn generate_insights(&self) -> Vec<String> {
        insights::describe(self.target, &self.feature_importance())
    }
}

fn subset(rows: &[Vec<f64>], targets: &[f64], indices: &[usize]) -> (Vec<Vec<f64>>, Vec<f64>) {
    (
        indices.iter().map(|&i| rows[i].clone()).collect(),
        indices.iter().map(|&i| targets[i]).collect(),
    )
}

fn score_candidate(
    solver: Solver,
    rows: &[Vec<f64>],
    targets: &[f64],
    train: &[usize],
    holdout: &[usize],
    folds: usize,
) -> CandidateScore {
    let fold_mse: Vec<f64> = k_folds(train.len(), folds)
        .iter()
        .map(|fold| {
            let fit_idx: Vec<usize> = fold.train.iter().map(|&i| train[i]).collect();
            let val_idx: Vec<usize> = fold.holdout.iter().map(|&i| train[i]).collect();
            let (x, y) = subset(rows, targets, &fit_idx);
            let model = LinearModel::fit(solver, &x, &y);
            let (vx, vy) = subset(rows, targets, &val_idx);
            let predicted: Vec<f64> = vx.iter().map(|r| model.predict(r)).collect();
            mean_squared_error(&vy, &predicted)
        })
        .collect();
    let cv_mse = fold_mse.iter().sum::<f64>() / fold_mse.len().max(1) as f64;

    let (holdout_r2, holdout_mse, holdout_mae) = if holdout.is_empty() {
        (None, None, None)
    } else {
        let (x, y) = subset(rows, targets, train);
        let model = LinearModel::fit(solver, &x, &y);
        let (hx, hy) = subset(rows, targets, holdout);
        let predicted: Vec<f64> = hx.iter().map(|r| model.predict(r)).collect();
        (
            Some(r2_score(&hy, &predicted)),
            Some(mean_squared_error(&hy, &predicted)),
            Some(mean_absolute_error(&hy, &predicted)),
        )
    };

    CandidateScore {
        solver,
        fold_mse,
        cv_mse,
        holdout_r2,
        holdout_mse,
        holdout_mae,
    }
}
