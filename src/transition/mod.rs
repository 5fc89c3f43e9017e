//! Next-department prediction and chain synthesis.

mod model;
mod tree;

pub use model::{
    ChainSuggestion, Prediction, StopReason, SuggestedStep, TransitionModel, TransitionReport,
};
pub use tree::{DecisionTree, TreeParams};
