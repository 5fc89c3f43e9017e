use std::collections::BTreeSet;

use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{FlowcastError, Result};
use crate::model::{Department, Observation, StepContext, normalize_request_type};

/// Code reserved for category values that were not seen during `fit`.
pub const UNKNOWN_CODE: u32 = 0;

const UNKNOWN_LABEL: &str = "<unknown>";

/// Numeric fields, in feature-vector order.
const NUMERIC_FIELDS: [&str; 4] = ["priority", "step_order", "hour_of_day", "day_of_week"];

/// Fixed-width numeric encoding of one [`StepContext`].
///
/// Only [`FittedEncoder::transform`] builds these, so the width always
/// matches the encoder that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Standardization parameters for one numeric field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericScale {
    pub name: String,
    pub mean: f64,
    pub std: f64,
}

impl NumericScale {
    fn fit(name: &str, values: &[f64]) -> Self {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        Self {
            name: name.to_string(),
            mean,
            // A constant column would divide by zero; leave it centred only.
            std: if std > f64::EPSILON { std } else { 1.0 },
        }
    }

    fn apply(&self, value: f64) -> f64 {
        (value - self.mean) / self.std
    }
}

/// Builder for a [`FittedEncoder`].
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    min_samples: usize,
}

impl FeatureEncoder {
    pub fn new(min_samples: usize) -> Self {
        Self { min_samples }
    }

    pub fn fit(&self, observations: &[Observation]) -> Result<FittedEncoder> {
        let contexts: Vec<StepContext> = observations.iter().map(Observation::context).collect();
        self.fit_contexts(&contexts)
    }

    /// Fits code tables (sorted, so repeated fits agree) and numeric scaling.
    pub fn fit_contexts(&self, contexts: &[StepContext]) -> Result<FittedEncoder> {
        if contexts.len() < self.min_samples.max(1) {
            return Err(FlowcastError::insufficient(
                "feature encoder",
                self.min_samples.max(1),
                contexts.len(),
            ));
        }

        let departments: BTreeSet<String> = contexts
            .iter()
            .map(|c| c.department.as_str().to_string())
            .collect();
        let request_types: BTreeSet<String> = contexts
            .iter()
            .map(|c| normalize_request_type(&c.request_type))
            .collect();

        let columns: Vec<[f64; 4]> = contexts.iter().map(raw_numeric).collect();
        let scales = NUMERIC_FIELDS
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let values: Vec<f64> = columns.iter().map(|c| c[i]).collect();
                NumericScale::fit(name, &values)
            })
            .collect();

        Ok(FittedEncoder {
            departments: departments.into_iter().collect(),
            request_types: request_types.into_iter().collect(),
            scales,
        })
    }
}

fn raw_numeric(ctx: &StepContext) -> [f64; 4] {
    [
        ctx.priority.ordinal() as f64,
        ctx.step_order as f64,
        ctx.submitted_at.hour() as f64,
        ctx.submitted_at.weekday().num_days_from_monday() as f64,
    ]
}

/// Frozen encoder state shared by every model trained against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedEncoder {
    departments: Vec<String>,
    request_types: Vec<String>,
    scales: Vec<NumericScale>,
}

impl FittedEncoder {
    pub fn width(&self) -> usize {
        (self.departments.len() + 1) + (self.request_types.len() + 1) + self.scales.len()
    }

    pub fn department_code(&self, department: Department) -> u32 {
        code_of(&self.departments, department.as_str())
    }

    pub fn request_type_code(&self, request_type: &str) -> u32 {
        code_of(&self.request_types, &normalize_request_type(request_type))
    }

    /// Departments seen during fit, in code order (code 1 first).
    pub fn known_departments(&self) -> Vec<Department> {
        self.departments
            .iter()
            .filter_map(|name| name.parse().ok())
            .collect()
    }

    pub fn transform(&self, ctx: &StepContext) -> FeatureVector {
        let mut values = vec![0.0; self.width()];

        let dept_code = self.department_code(ctx.department) as usize;
        values[dept_code] = 1.0;

        let type_offset = self.departments.len() + 1;
        let type_code = self.request_type_code(&ctx.request_type) as usize;
        values[type_offset + type_code] = 1.0;

        let numeric_offset = type_offset + self.request_types.len() + 1;
        for (i, (scale, raw)) in self.scales.iter().zip(raw_numeric(ctx)).enumerate() {
            values[numeric_offset + i] = scale.apply(raw);
        }

        FeatureVector(values)
    }

    /// Human-readable name of every slot, aligned with [`transform`](Self::transform).
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.width());
        names.push(format!("department={UNKNOWN_LABEL}"));
        names.extend(self.departments.iter().map(|d| format!("department={d}")));
        names.push(format!("request_type={UNKNOWN_LABEL}"));
        names.extend(self.request_types.iter().map(|t| format!("request_type={t}")));
        names.extend(self.scales.iter().map(|s| s.name.clone()));
        names
    }
}

fn code_of(table: &[String], value: &str) -> u32 {
    table
        .binary_search_by(|entry| entry.as_str().cmp(value))
        .map(|idx| idx as u32 + 1)
        .unwrap_or(UNKNOWN_CODE)
}
