use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FlowcastError, Result};

/// Departments an approval step can be routed to.
///
/// Names outside the known set parse to [`Department::Other`] so that a new
/// department in the host application never breaks ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Department {
    Hr,
    It,
    Finance,
    Sales,
    Facilities,
    Legal,
    Operations,
    Admin,
    GeneralApprover,
    Other,
}

impl Department {
    pub const ALL: [Department; 10] = [
        Department::Hr,
        Department::It,
        Department::Finance,
        Department::Sales,
        Department::Facilities,
        Department::Legal,
        Department::Operations,
        Department::Admin,
        Department::GeneralApprover,
        Department::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Hr => "HR",
            Department::It => "IT",
            Department::Finance => "Finance",
            Department::Sales => "Sales",
            Department::Facilities => "Facilities",
            Department::Legal => "Legal",
            Department::Operations => "Operations",
            Department::Admin => "Admin",
            Department::GeneralApprover => "General Approver",
            Department::Other => "Other",
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Department {
    type Err = FlowcastError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        if normalized.is_empty() {
            return Err(FlowcastError::invalid("department", "must not be empty"));
        }
        let dept = match normalized.as_str() {
            "hr" | "human resources" => Department::Hr,
            "it" | "information technology" => Department::It,
            "finance" | "accounting" => Department::Finance,
            "sales" => Department::Sales,
            "facilities" => Department::Facilities,
            "legal" => Department::Legal,
            "operations" => Department::Operations,
            "admin" | "administration" => Department::Admin,
            "general approver" | "general" => Department::GeneralApprover,
            _ => Department::Other,
        };
        Ok(dept)
    }
}

impl TryFrom<String> for Department {
    type Error = FlowcastError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Department> for String {
    fn from(value: Department) -> Self {
        value.as_str().to_string()
    }
}

/// Request urgency, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Priority {
    /// Ordinal used as the numeric priority feature (1..=4).
    pub fn ordinal(&self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Normal => 2,
            Priority::High => 3,
            Priority::Urgent => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = FlowcastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" | "medium" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(FlowcastError::invalid(
                "priority",
                format!("unknown value `{other}`"),
            )),
        }
    }
}

impl TryFrom<String> for Priority {
    type Error = FlowcastError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Priority> for String {
    fn from(value: Priority) -> Self {
        value.as_str().to_string()
    }
}

/// Outcome of a single approval step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Status {
    Approved,
    Rejected,
    Pending,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Approved | Status::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Approved => "approved",
            Status::Rejected => "rejected",
            Status::Pending => "pending",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = FlowcastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "approved" | "approve" => Ok(Status::Approved),
            "rejected" | "reject" => Ok(Status::Rejected),
            "pending" => Ok(Status::Pending),
            other => Err(FlowcastError::invalid(
                "status",
                format!("unknown value `{other}`"),
            )),
        }
    }
}

impl TryFrom<String> for Status {
    type Error = FlowcastError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Status> for String {
    fn from(value: Status) -> Self {
        value.as_str().to_string()
    }
}

/// Lowercased, trimmed request type; blank values collapse to `general`.
pub fn normalize_request_type(raw: &str) -> String {
    let trimmed = raw.trim().to_lowercase();
    if trimmed.is_empty() {
        "general".to_string()
    } else {
        trimmed
    }
}

/// One historical workflow step as exported by the approval application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub request_id: String,
    pub department: Department,
    pub priority: Priority,
    pub step_order: u32,
    #[serde(default = "default_request_type")]
    pub request_type: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_request_type() -> String {
    "general".to_string()
}

impl Observation {
    /// Checks the per-record invariants: 1-based step order and a
    /// non-negative duration once the step is decided.
    pub fn validate(&self) -> Result<()> {
        if self.step_order == 0 {
            return Err(FlowcastError::invalid("step_order", "must be 1 or greater"));
        }
        if self.status.is_terminal() && self.updated_at < self.created_at {
            return Err(FlowcastError::invalid(
                "updated_at",
                format!(
                    "request `{}` step {} finished before it started",
                    self.request_id, self.step_order
                ),
            ));
        }
        Ok(())
    }

    /// Hours between creation and decision, only for decided steps.
    pub fn duration_hours(&self) -> Option<f64> {
        if !self.status.is_terminal() {
            return None;
        }
        let secs = (self.updated_at - self.created_at).num_seconds();
        Some(secs.max(0) as f64 / 3600.0)
    }

    pub fn context(&self) -> StepContext {
        StepContext {
            department: self.department,
            priority: self.priority,
            step_order: self.step_order,
            request_type: normalize_request_type(&self.request_type),
            submitted_at: self.created_at,
        }
    }
}

/// State of an in-progress chain: the input to every inference call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepContext {
    pub department: Department,
    pub priority: Priority,
    pub step_order: u32,
    pub request_type: String,
    pub submitted_at: DateTime<Utc>,
}

impl StepContext {
    pub fn new(
        department: Department,
        priority: Priority,
        step_order: u32,
        request_type: &str,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            department,
            priority,
            step_order,
            request_type: normalize_request_type(request_type),
            submitted_at,
        }
    }

    /// The context one step further down the chain, routed to `department`.
    pub fn advance(&self, department: Department) -> Self {
        Self {
            department,
            step_order: self.step_order.saturating_add(1),
            ..self.clone()
        }
    }
}
