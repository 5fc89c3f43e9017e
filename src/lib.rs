//! Predictive analytics for approval workflows.
//!
//! Learns from historical approval chains to route free-text requests,
//! predict the next department of an in-progress chain, forecast approval
//! latency and likelihood, and summarize routing patterns.
//!
//! [`engine::AnalyticsEngine`] is the entry point; every model it trains is
//! persisted through an injected [`store::ModelStore`].

pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod metrics;
pub mod model;
pub mod patterns;
pub mod regression;
pub mod store;
pub mod text;
pub mod transition;

#[cfg(test)]
mod testutil;

pub use config::FlowcastConfig;
pub use engine::{AnalyticsEngine, MessageRouting};
pub use error::{FlowcastError, Result};
pub use model::{Chain, Department, NextStep, Observation, Priority, Status, StepContext};
pub use store::{ModelSlot, ModelStatus, ModelStore};
