//! Fixtures shared by the integration test binaries.
#![allow(dead_code)]

use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use flowcast::text::LabeledText;
use flowcast::{AnalyticsEngine, Department, FlowcastConfig, Observation, Priority, Status};

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

/// Three routing patterns keyed by request type, with durations driven by
/// priority (8h low, 5h normal, 3h high, 1h urgent). Every seventh request
/// is rejected at its last step.
pub fn corpus(requests: usize) -> Vec<Observation> {
    let priorities = [Priority::Low, Priority::Normal, Priority::High, Priority::Urgent];
    let mut observations = Vec::new();
    for i in 0..requests {
        let (request_type, path): (&str, &[Department]) = match i % 3 {
            0 => ("hr", &[Department::Hr, Department::Admin]),
            1 => ("it", &[Department::It, Department::Finance, Department::Admin]),
            _ => ("finance", &[Department::Finance, Department::Admin]),
        };
        let priority = priorities[i % 4];
        let hours = match priority {
            Priority::Low => 8,
            Priority::Normal => 5,
            Priority::High => 3,
            Priority::Urgent => 1,
        };
        let mut start = at(1 + (i % 20) as u32, 9 + (i % 6) as u32);
        for (s, dept) in path.iter().enumerate() {
            let status = if s + 1 == path.len() && i % 7 == 6 {
                Status::Rejected
            } else {
                Status::Approved
            };
            let end = start + Duration::hours(hours);
            observations.push(Observation {
                request_id: format!("req-{i:03}"),
                department: *dept,
                priority,
                step_order: s as u32 + 1,
                request_type: request_type.to_string(),
                status,
                created_at: start,
                updated_at: end,
            });
            start = end;
        }
    }
    observations
}

pub fn chain(request_id: &str, departments: &[Department], final_status: Status) -> Vec<Observation> {
    departments
        .iter()
        .enumerate()
        .map(|(i, dept)| {
            let start = at(4, 9 + i as u32);
            Observation {
                request_id: request_id.to_string(),
                department: *dept,
                priority: Priority::Normal,
                step_order: i as u32 + 1,
                request_type: "general".to_string(),
                status: if i + 1 == departments.len() {
                    final_status
                } else {
                    Status::Approved
                },
                created_at: start,
                updated_at: start + Duration::hours(1),
            }
        })
        .collect()
}

fn labeled(text: &str, department: Department) -> LabeledText {
    LabeledText {
        text: text.to_string(),
        department,
    }
}

pub fn phrases() -> Vec<LabeledText> {
    vec![
        labeled("I need vacation time off next month", Department::Hr),
        labeled("Requesting vacation days for the holidays", Department::Hr),
        labeled("How do I apply for vacation leave", Department::Hr),
        labeled("Question about my salary and payroll benefits", Department::Hr),
        labeled("Sick leave request for this week", Department::Hr),
        labeled("My laptop is not working after the update", Department::It),
        labeled("I forgot my password and cannot login", Department::It),
        labeled("Need software installed on my computer", Department::It),
        labeled("The network is down on my laptop", Department::It),
        labeled("Submit an expense report for reimbursement", Department::Finance),
        labeled("Invoice payment is overdue", Department::Finance),
        labeled("Budget approval for a new purchase", Department::Finance),
        labeled("Expense reimbursement for travel costs", Department::Finance),
        labeled("The air conditioning in the office is broken", Department::Facilities),
        labeled("Printer on the third floor is jammed", Department::Facilities),
        labeled("Office room needs cleaning and repair", Department::Facilities),
        labeled("Building maintenance for the broken door", Department::Facilities),
    ]
}

pub fn engine_with(dir: &Path, config: FlowcastConfig) -> AnalyticsEngine {
    AnalyticsEngine::open(FlowcastConfig {
        model_dir: dir.to_path_buf(),
        ..config
    })
    .unwrap()
}

pub fn engine(dir: &Path) -> AnalyticsEngine {
    engine_with(dir, FlowcastConfig::default())
}
