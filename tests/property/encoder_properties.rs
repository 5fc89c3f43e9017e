#[path = "../common/mod.rs"]
mod common;

use std::sync::OnceLock;

use flowcast::features::{FeatureEncoder, FittedEncoder, UNKNOWN_CODE};
use flowcast::{Department, Priority, StepContext};
use proptest::prelude::*;

fn encoder() -> &'static FittedEncoder {
    static ENCODER: OnceLock<FittedEncoder> = OnceLock::new();
    ENCODER.get_or_init(|| FeatureEncoder::new(10).fit(&common::corpus(30)).unwrap())
}

fn department() -> impl Strategy<Value = Department> {
    prop::sample::select(Department::ALL.to_vec())
}

fn priority() -> impl Strategy<Value = Priority> {
    prop::sample::select(vec![Priority::Low, Priority::Normal, Priority::High, Priority::Urgent])
}

fn context() -> impl Strategy<Value = StepContext> {
    (department(), priority(), 1u32..10_000, "[a-z]{0,10}", 1u32..=28, 0u32..24).prop_map(
        |(dept, prio, step, kind, day, hour)| {
            StepContext::new(dept, prio, step, &kind, common::at(day, hour))
        },
    )
}

proptest! {
    #[test]
    fn transform_is_deterministic(ctx in context()) {
        let enc = encoder();
        prop_assert_eq!(enc.transform(&ctx), enc.transform(&ctx));
    }

    #[test]
    fn width_is_fixed(ctx in context()) {
        let enc = encoder();
        let v = enc.transform(&ctx);
        prop_assert_eq!(v.len(), enc.width());
        prop_assert!(v.as_slice().iter().all(|x| x.is_finite()));
    }

    #[test]
    fn each_category_block_is_one_hot(ctx in context()) {
        let enc = encoder();
        let v = enc.transform(&ctx);
        let names = enc.feature_names();
        for prefix in ["department=", "request_type="] {
            let hot: f64 = v
                .as_slice()
                .iter()
                .zip(&names)
                .filter(|(_, n)| n.starts_with(prefix))
                .map(|(x, _)| *x)
                .sum();
            prop_assert_eq!(hot, 1.0);
        }
    }

    #[test]
    fn unseen_request_type_maps_to_unknown(kind in "[x-z]{3,8}", ctx in context()) {
        let enc = encoder();
        prop_assert_eq!(enc.request_type_code(&kind), UNKNOWN_CODE);

        let ctx = StepContext::new(ctx.department, ctx.priority, ctx.step_order, &kind, ctx.submitted_at);
        let v = enc.transform(&ctx);
        let idx = enc
            .feature_names()
            .iter()
            .position(|n| n == "request_type=<unknown>")
            .unwrap();
        prop_assert_eq!(v.as_slice()[idx], 1.0);
    }

    #[test]
    fn department_parsing_never_panics(raw in "\\PC{0,24}") {
        match raw.parse::<Department>() {
            Ok(_) => prop_assert!(!raw.trim().is_empty()),
            Err(e) => prop_assert_eq!(e.field(), Some("department")),
        }
    }

    #[test]
    fn refit_on_same_corpus_agrees(ctx in context()) {
        let again = FeatureEncoder::new(10).fit(&common::corpus(30)).unwrap();
        prop_assert_eq!(encoder().transform(&ctx), again.transform(&ctx));
    }
}
