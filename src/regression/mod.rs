//! Approval-time and approval-likelihood regression.

mod insights;
mod linear;
mod predictor;

pub use linear::{LinearModel, Solver};
pub use predictor::{
    CandidateScore, Estimate, FeatureWeight, RegressionPredictor, RegressionReport,
    RegressionTarget,
};
