#[path = "../common/mod.rs"]
mod common;

use std::sync::OnceLock;

use flowcast::model::group_chains;
use flowcast::regression::{RegressionPredictor, RegressionTarget};
use flowcast::text::TextClassifier;
use flowcast::transition::{StopReason, TransitionModel};
use flowcast::{Department, FlowcastConfig, Priority, StepContext};
use proptest::prelude::*;

struct Models {
    transition: TransitionModel,
    approval_time: RegressionPredictor,
    success_rate: RegressionPredictor,
    text: TextClassifier,
}

fn models() -> &'static Models {
    static MODELS: OnceLock<Models> = OnceLock::new();
    MODELS.get_or_init(|| {
        let config = FlowcastConfig::default();
        let corpus = common::corpus(40);
        let chains = group_chains(&corpus).unwrap();
        Models {
            transition: TransitionModel::train(&chains, &config).unwrap().0,
            approval_time: RegressionPredictor::train(&corpus, RegressionTarget::ApprovalHours, &config)
                .unwrap()
                .0,
            success_rate: RegressionPredictor::train(
                &corpus,
                RegressionTarget::SuccessProbability,
                &config,
            )
            .unwrap()
            .0,
            text: TextClassifier::train(&common::phrases(), &config).unwrap().0,
        }
    })
}

fn context() -> impl Strategy<Value = StepContext> {
    (
        prop::sample::select(Department::ALL.to_vec()),
        prop::sample::select(vec![Priority::Low, Priority::Normal, Priority::High, Priority::Urgent]),
        1u32..u32::MAX,
        "[a-z]{0,10}",
        1u32..=28,
        0u32..24,
    )
        .prop_map(|(dept, prio, step, kind, day, hour)| {
            StepContext::new(dept, prio, step, &kind, common::at(day, hour))
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn success_rate_is_a_probability(ctx in context()) {
        let estimate = models().success_rate.estimate(&ctx);
        prop_assert!((0.0..=1.0).contains(&estimate.value));
        prop_assert_eq!(estimate.clamped, estimate.value != estimate.raw);
    }

    #[test]
    fn approval_time_is_never_negative(ctx in context()) {
        let estimate = models().approval_time.estimate(&ctx);
        prop_assert!(estimate.value >= 0.0);
        prop_assert!(estimate.value.is_finite());
    }

    #[test]
    fn suggestions_terminate_without_repeats(ctx in context(), max_steps in 0usize..8) {
        let suggestion = models().transition.suggest_chain(&ctx, max_steps);
        prop_assert!(suggestion.steps.len() <= max_steps);
        let departments = suggestion.departments();
        prop_assert!(departments.windows(2).all(|w| w[0] != w[1]));
        if suggestion.stop == StopReason::MaxSteps {
            prop_assert_eq!(suggestion.steps.len(), max_steps);
        }
        prop_assert!(suggestion.confidences().iter().all(|c| (0.0..=1.0).contains(c)));
    }

    #[test]
    fn prediction_confidence_matches_top_alternative(ctx in context()) {
        let prediction = models().transition.predict_next(&ctx);
        prop_assert_eq!(prediction.alternatives[0].1, prediction.confidence);
        let total: f64 = prediction.alternatives.iter().map(|(_, p)| p).sum();
        prop_assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn classification_is_well_formed(text in "[a-zA-Z ]{0,40}[a-z]") {
        let result = models().text.classify(&text).unwrap();
        prop_assert!((0.0..=1.0).contains(&result.confidence));
        if result.fallback {
            prop_assert_eq!(result.department, Department::Other);
            prop_assert!(result.confidence < 0.4);
        } else {
            prop_assert_eq!(result.department, result.ranking[0].0);
        }
    }
}
