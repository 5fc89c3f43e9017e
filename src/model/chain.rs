use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::observation::{Department, Observation, Priority, Status};
use crate::error::{FlowcastError, Result};

/// The label the transition model learns: another department, or the end of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NextStep {
    Department(Department),
    Terminal,
}

impl fmt::Display for NextStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextStep::Department(d) => write!(f, "{d}"),
            NextStep::Terminal => write!(f, "TERMINAL"),
        }
    }
}

/// Ordered approval path of a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub request_id: String,
    pub steps: Vec<Observation>,
}

impl Chain {
    pub fn departments(&self) -> Vec<Department> {
        self.steps.iter().map(|s| s.department).collect()
    }

    pub fn last(&self) -> Option<&Observation> {
        self.steps.last()
    }

    pub fn is_approved(&self) -> bool {
        self.last().is_some_and(|s| s.status == Status::Approved)
    }

    pub fn is_terminal(&self) -> bool {
        self.last().is_some_and(|s| s.status.is_terminal())
    }

    /// Every `(step, next)` pair: consecutive departments, plus
    /// `last -> TERMINAL` when the chain was approved.
    pub fn transitions(&self) -> Vec<(&Observation, NextStep)> {
        let mut pairs: Vec<(&Observation, NextStep)> = self
            .steps
            .windows(2)
            .map(|w| (&w[0], NextStep::Department(w[1].department)))
            .collect();
        if self.is_approved()
            && let Some(last) = self.last()
        {
            pairs.push((last, NextStep::Terminal));
        }
        pairs
    }

    /// Total hours from first creation to last decision, if the chain is decided.
    pub fn total_hours(&self) -> Option<f64> {
        if !self.is_terminal() {
            return None;
        }
        let start = self.steps.iter().map(|s| s.created_at).min()?;
        let end = self.steps.iter().map(|s| s.updated_at).max()?;
        Some((end - start).num_seconds().max(0) as f64 / 3600.0)
    }
}

/// Groups observations into chains keyed by request id, ordered by step.
///
/// Fails on invalid observations and on duplicate step orders within a chain.
pub fn group_chains(observations: &[Observation]) -> Result<Vec<Chain>> {
    let mut grouped: BTreeMap<&str, Vec<Observation>> = BTreeMap::new();
    for obs in observations {
        obs.validate()?;
        grouped
            .entry(obs.request_id.as_str())
            .or_default()
            .push(obs.clone());
    }

    grouped
        .into_iter()
        .map(|(request_id, mut steps)| {
            steps.sort_by_key(|s| s.step_order);
            if let Some(w) = steps.windows(2).find(|w| w[0].step_order == w[1].step_order) {
                return Err(FlowcastError::invalid(
                    "step_order",
                    format!(
                        "request `{request_id}` has step {} more than once",
                        w[0].step_order
                    ),
                ));
            }
            Ok(Chain {
                request_id: request_id.to_string(),
                steps,
            })
        })
        .collect()
}

/// One mined transition, flattened for export to external analysis tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub request_id: String,
    pub current_department: Department,
    pub next: NextStep,
    pub priority: Priority,
    pub step_order: u32,
    pub request_type: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Flattens the transition pairs of every chain into export records.
pub fn export_transitions(chains: &[Chain]) -> Vec<TransitionRecord> {
    chains
        .iter()
        .flat_map(|chain| {
            chain.transitions().into_iter().map(|(step, next)| TransitionRecord {
                request_id: chain.request_id.clone(),
                current_department: step.department,
                next,
                priority: step.priority,
                step_order: step.step_order,
                request_type: step.request_type.clone(),
                status: step.status,
                created_at: step.created_at,
                updated_at: step.updated_at,
            })
        })
        .collect()
}
