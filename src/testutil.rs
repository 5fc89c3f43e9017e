//! Shared fixtures for unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::model::{Department, Observation, Priority, Status};
use crate::text::LabeledText;

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

/// A one-hour approved step starting at 09:00 plus one hour per step.
pub fn step(request_id: &str, department: Department, step_order: u32, status: Status) -> Observation {
    let start = at(4, 8 + step_order);
    Observation {
        request_id: request_id.to_string(),
        department,
        priority: Priority::Normal,
        step_order,
        request_type: "general".to_string(),
        status,
        created_at: start,
        updated_at: start + Duration::hours(1),
    }
}

/// A chain through `departments` where every step is approved except the
/// last, which gets `final_status`.
pub fn chain_observations(
    request_id: &str,
    departments: &[Department],
    final_status: Status,
) -> Vec<Observation> {
    departments
        .iter()
        .enumerate()
        .map(|(i, dept)| {
            let status = if i + 1 == departments.len() {
                final_status
            } else {
                Status::Approved
            };
            step(request_id, *dept, i as u32 + 1, status)
        })
        .collect()
}

/// Deterministic corpus with three routing patterns and priority-driven durations.
///
/// - `hr` requests: HR -> Admin
/// - `it` requests: IT -> Finance -> Admin
/// - `finance` requests: Finance -> Admin
///
/// Urgent requests are decided in 1 hour per step, low priority ones in 8.
/// Every seventh request is rejected at its last step.
pub fn routing_corpus(requests: usize) -> Vec<Observation> {
    let priorities = [Priority::Low, Priority::Normal, Priority::High, Priority::Urgent];
    let mut observations = Vec::new();
    for i in 0..requests {
        let (request_type, path): (&str, &[Department]) = match i % 3 {
            0 => ("hr", &[Department::Hr, Department::Admin]),
            1 => ("it", &[Department::It, Department::Finance, Department::Admin]),
            _ => ("finance", &[Department::Finance, Department::Admin]),
        };
        let priority = priorities[i % 4];
        let hours_per_step = match priority {
            Priority::Low => 8,
            Priority::Normal => 5,
            Priority::High => 3,
            Priority::Urgent => 1,
        };
        let mut start = at(1 + (i % 20) as u32, 9 + (i % 6) as u32);
        for (s, dept) in path.iter().enumerate() {
            let last = s + 1 == path.len();
            let status = if last && i % 7 == 6 {
                Status::Rejected
            } else {
                Status::Approved
            };
            let end = start + Duration::hours(hours_per_step);
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

pub fn labeled(text: &str, department: Department) -> LabeledText {
    LabeledText {
        text: text.to_string(),
        department,
    }
}

/// Routing phrases for four departments, four or more each.
pub fn routing_phrases() -> Vec<LabeledText> {
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
