use std::collections::BTreeMap;

use crate::model::Priority;

/// Infers request urgency from message wording using weighted keyword scoring.
pub struct PriorityDetector;

impl PriorityDetector {
    pub fn detect(text: &str) -> Priority {
        let lower = text.to_lowercase();

        let keyword_priorities: &[(&str, Priority, u32)] = &[
            ("emergency", Priority::Urgent, 10),
            ("broken", Priority::Urgent, 8),
            ("down", Priority::Urgent, 6),
            ("urgent", Priority::Urgent, 10),
            ("asap", Priority::Urgent, 10),
            ("immediately", Priority::Urgent, 8),
            ("critical", Priority::Urgent, 10),
            ("not working", Priority::Urgent, 8),
            ("important", Priority::High, 8),
            ("blocking", Priority::High, 8),
            ("priority", Priority::High, 5),
            ("need help now", Priority::High, 8),
            ("when possible", Priority::Low, 8),
            ("no rush", Priority::Low, 10),
            ("sometime", Priority::Low, 6),
            ("future", Priority::Low, 4),
        ];

        let mut scores: BTreeMap<Priority, u32> = BTreeMap::new();
        for &(keyword, priority, weight) in keyword_priorities {
            if contains_word(&lower, keyword) {
                *scores.entry(priority).or_insert(0) += weight;
            }
        }

        // On equal scores the more urgent level wins.
        scores
            .into_iter()
            .max_by_key(|&(priority, score)| (score, priority))
            .map(|(priority, _)| priority)
            .unwrap_or(Priority::Normal)
    }
}

/// `keyword` occurs in `text` on word boundaries.
fn contains_word(text: &str, keyword: &str) -> bool {
    text.match_indices(keyword).any(|(start, _)| {
        let end = start + keyword.len();
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
