use super::predictor::{FeatureWeight, RegressionTarget};

/// Coefficients at or below this magnitude are treated as no effect.
const NEGLIGIBLE: f64 = 1e-6;
const MAX_INSIGHTS: usize = 3;

/// Sentences built from coefficient sign and rank only. `weights` must
/// already be ordered by importance.
pub(crate) fn describe(target: RegressionTarget, weights: &[FeatureWeight]) -> Vec<String> {
    let notable: Vec<&FeatureWeight> = weights
        .iter()
        .filter(|w| w.coefficient.abs() > NEGLIGIBLE)
        .take(MAX_INSIGHTS)
        .collect();
    if notable.is_empty() {
        return vec![format!("No feature has a measurable linear effect on {target}.")];
    }

    notable
        .iter()
        .enumerate()
        .map(|(rank, w)| {
            let strength = if rank == 0 {
                "the strongest factor"
            } else {
                "a secondary factor"
            };
            format!(
                "{} is associated with {} ({strength}, coefficient {:+.3}).",
                subject(&w.name),
                direction(target, w.coefficient > 0.0),
                w.coefficient
            )
        })
        .collect()
}

fn direction(target: RegressionTarget, positive: bool) -> &'static str {
    match (target, positive) {
        (RegressionTarget::ApprovalHours, true) => "longer approval times",
        (RegressionTarget::ApprovalHours, false) => "shorter approval times",
        (RegressionTarget::SuccessProbability, true) => "a higher approval likelihood",
        (RegressionTarget::SuccessProbability, false) => "a lower approval likelihood",
    }
}

fn subject(feature: &str) -> String {
    match feature.split_once('=') {
        Some((field, "<unknown>")) => format!("An unrecognized {}", field.replace('_', " ")),
        Some(("department", dept)) => format!("Handling by {dept}"),
        Some(("request_type", kind)) => format!("Request type `{kind}`"),
        Some((field, value)) => format!("{field} `{value}`"),
        None => match feature {
            "priority" => "A higher priority".to_string(),
            "step_order" => "A later step in the chain".to_string(),
            "hour_of_day" => "A later submission hour".to_string(),
            "day_of_week" => "A later weekday".to_string(),
            other => format!("A higher {other}"),
        },
    }
}
