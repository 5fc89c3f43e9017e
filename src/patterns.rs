//! Read-only aggregation of historical routing behaviour.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{Department, Observation, Priority, Status};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DepartmentStats {
    pub approved: usize,
    pub rejected: usize,
    pub pending: usize,
    /// `approved / (approved + rejected)`; `None` while nothing was decided.
    pub success_rate: Option<f64>,
    /// Mean hours over decided steps.
    pub mean_duration_hours: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatternReport {
    pub total_requests: usize,
    pub total_observations: usize,
    pub transition_counts: BTreeMap<Department, BTreeMap<Department, usize>>,
    /// Row-normalized `transition_counts`.
    pub transition_probabilities: BTreeMap<Department, BTreeMap<Department, f64>>,
    pub departments: BTreeMap<Department, DepartmentStats>,
    pub priority_durations: BTreeMap<Priority, f64>,
}

impl PatternReport {
    /// Most frequent successor of `from`, lowest department first on ties.
    pub fn most_likely_next(&self, from: Department) -> Option<(Department, f64)> {
        let row = self.transition_probabilities.get(&from)?;
        let mut best: Option<(Department, f64)> = None;
        for (&to, &p) in row {
            if best.is_none_or(|(_, b)| p > b) {
                best = Some((to, p));
            }
        }
        best
    }
}

pub fn analyze_patterns(observations: &[Observation]) -> PatternReport {
    let mut by_request: BTreeMap<&str, Vec<&Observation>> = BTreeMap::new();
    for obs in observations {
        by_request.entry(obs.request_id.as_str()).or_default().push(obs);
    }

    PatternReport {
        total_requests: by_request.len(),
        total_observations: observations.len(),
        transition_counts: transition_counts(&mut by_request),
        transition_probabilities: BTreeMap::new(),
        departments: department_stats(observations),
        priority_durations: priority_durations(observations),
    }
    .with_probabilities()
}

impl PatternReport {
    fn with_probabilities(mut self) -> Self {
        self.transition_probabilities = self
            .transition_counts
            .iter()
            .map(|(&from, row)| {
                let total: usize = row.values().sum();
                let probs = row
                    .iter()
                    .map(|(&to, &count)| (to, count as f64 / total as f64))
                    .collect();
                (from, probs)
            })
            .collect();
        self
    }
}

fn transition_counts(
    by_request: &mut BTreeMap<&str, Vec<&Observation>>,
) -> BTreeMap<Department, BTreeMap<Department, usize>> {
    let mut counts: BTreeMap<Department, BTreeMap<Department, usize>> = BTreeMap::new();
    for steps in by_request.values_mut() {
        steps.sort_by_key(|o| o.step_order);
        for pair in steps.windows(2) {
            *counts
                .entry(pair[0].department)
                .or_default()
                .entry(pair[1].department)
                .or_insert(0) += 1;
        }
    }
    counts
}

fn department_stats(observations: &[Observation]) -> BTreeMap<Department, DepartmentStats> {
    let mut stats: BTreeMap<Department, DepartmentStats> = BTreeMap::new();
    let mut durations: BTreeMap<Department, Vec<f64>> = BTreeMap::new();
    for obs in observations {
        let entry = stats.entry(obs.department).or_default();
        match obs.status {
            Status::Approved => entry.approved += 1,
            Status::Rejected => entry.rejected += 1,
            Status::Pending => entry.pending += 1,
        }
        if let Some(hours) = obs.duration_hours() {
            durations.entry(obs.department).or_default().push(hours);
        }
    }
    for (dept, entry) in stats.iter_mut() {
        let decided = entry.approved + entry.rejected;
        entry.success_rate = (decided > 0).then(|| entry.approved as f64 / decided as f64);
        entry.mean_duration_hours = durations.get(dept).map(|d| mean(d));
    }
    stats
}

fn priority_durations(observations: &[Observation]) -> BTreeMap<Priority, f64> {
    let mut durations: BTreeMap<Priority, Vec<f64>> = BTreeMap::new();
    for obs in observations {
        if let Some(hours) = obs.duration_hours() {
            durations.entry(obs.priority).or_default().push(hours);
        }
    }
    durations.into_iter().map(|(p, d)| (p, mean(&d))).collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{chain_observations, routing_corpus, step};

    #[test]
    fn counts_transitions_between_consecutive_steps() {
        let mut observations = chain_observations("r1", &[Department::Hr, Department::It], Status::Approved);
        observations.extend(chain_observations("r2", &[Department::Hr, Department::Finance], Status::Approved));
        observations.extend(chain_observations("r3", &[Department::Hr, Department::It], Status::Rejected));

        let report = analyze_patterns(&observations);
        assert_eq!(report.total_requests, 3);
        assert_eq!(report.total_observations, 6);
        assert_eq!(report.transition_counts[&Department::Hr][&Department::It], 2);
        assert_eq!(report.transition_counts[&Department::Hr][&Department::Finance], 1);
        let p = report.transition_probabilities[&Department::Hr][&Department::It];
        assert!((p - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(
            report.most_likely_next(Department::Hr),
            Some((Department::It, p))
        );
    }

    #[test]
    fn steps_are_ordered_before_pairing() {
        let mut observations = chain_observations("r1", &[Department::Hr, Department::It], Status::Approved);
        observations.reverse();
        let report = analyze_patterns(&observations);
        assert!(report.transition_counts[&Department::Hr].contains_key(&Department::It));
        assert!(!report.transition_counts.contains_key(&Department::It));
    }

    #[test]
    fn single_step_requests_still_yield_department_stats() {
        let observations = vec![
            step("a", Department::Legal, 1, Status::Approved),
            step("b", Department::Legal, 1, Status::Rejected),
            step("c", Department::Legal, 1, Status::Approved),
            step("d", Department::Legal, 1, Status::Pending),
        ];
        let report = analyze_patterns(&observations);
        assert!(report.transition_counts.is_empty());

        let legal = &report.departments[&Department::Legal];
        assert_eq!((legal.approved, legal.rejected, legal.pending), (2, 1, 1));
        assert!((legal.success_rate.unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(legal.mean_duration_hours, Some(1.0));
    }

    #[test]
    fn undecided_department_has_no_rate() {
        let report = analyze_patterns(&[step("a", Department::Sales, 1, Status::Pending)]);
        let sales = &report.departments[&Department::Sales];
        assert_eq!(sales.success_rate, None);
        assert_eq!(sales.mean_duration_hours, None);
    }

    #[test]
    fn priority_durations_follow_corpus() {
        let report = analyze_patterns(&routing_corpus(8));
        assert_eq!(report.priority_durations[&Priority::Urgent], 1.0);
        assert_eq!(report.priority_durations[&Priority::Low], 8.0);
    }

    #[test]
    fn empty_corpus_gives_empty_report() {
        let report = analyze_patterns(&[]);
        assert_eq!(report, PatternReport::default());
    }
}
