mod chain;
mod observation;

pub use chain::{Chain, NextStep, TransitionRecord, export_transitions, group_chains};
pub use observation::{
    Department, Observation, Priority, Status, StepContext, normalize_request_type,
};
