mod common;

use std::sync::mpsc;

use flowcast::model::NextStep;
use flowcast::regression::RegressionTarget;
use flowcast::transition::StopReason;
use flowcast::{
    Department, FlowcastConfig, FlowcastError, ModelSlot, Observation, Priority, Status,
    StepContext,
};

#[test]
fn identical_chains_route_hr_to_it() {
    let dir = tempfile::tempdir().unwrap();
    let config = FlowcastConfig {
        min_chains: 3,
        min_samples: 6,
        ..Default::default()
    };
    let engine = common::engine_with(dir.path(), config);
    let observations: Vec<Observation> = (0..3)
        .flat_map(|i| {
            common::chain(&format!("r{i}"), &[Department::Hr, Department::It], Status::Approved)
        })
        .collect();
    engine.train_transition_model(&observations).unwrap();

    let ctx = StepContext::new(Department::Hr, Priority::Normal, 1, "general", common::at(4, 9));
    let prediction = engine.predict_next(&ctx).unwrap();
    assert_eq!(prediction.next, NextStep::Department(Department::It));
    assert!(prediction.confidence >= 0.9);

    let suggestion = engine.suggest_chain(&ctx, None).unwrap();
    assert_eq!(suggestion.departments(), vec![Department::Hr, Department::It]);
    assert_eq!(suggestion.stop, StopReason::Terminal);
}

#[test]
fn vacation_request_is_routed_to_hr() {
    let dir = tempfile::tempdir().unwrap();
    let engine = common::engine(dir.path());
    engine.train_text_classifier(&common::phrases()).unwrap();
    let result = engine.classify("I need vacation time next week").unwrap();
    assert_eq!(result.department, Department::Hr);
}

#[test]
fn five_observations_are_not_enough() {
    let dir = tempfile::tempdir().unwrap();
    let engine = common::engine(dir.path());
    let corpus = common::corpus(2);
    assert_eq!(corpus.len(), 5);

    for target in [RegressionTarget::ApprovalHours, RegressionTarget::SuccessProbability] {
        let err = engine.train_regressor(target, &corpus).unwrap_err();
        assert!(matches!(err, FlowcastError::InsufficientData { .. }));
        assert!(!engine.model_status(target.slot()).unwrap().trained);
    }
    let err = engine.train_transition_model(&corpus).unwrap_err();
    assert!(matches!(err, FlowcastError::InsufficientData { .. }));
    assert!(!engine.model_status(ModelSlot::TransitionModel).unwrap().trained);
}

#[test]
fn concurrent_training_of_one_slot_is_serialized() {
    let dir = tempfile::tempdir().unwrap();
    let engine = common::engine(dir.path());
    let corpus = common::corpus(60);
    let slot = RegressionTarget::ApprovalHours.slot();
    let (held_tx, held_rx) = mpsc::channel();
    let (lost_tx, lost_rx) = mpsc::channel();

    let (engine, corpus) = (&engine, &corpus);
    let results: Vec<_> = std::thread::scope(|s| {
        let first = s.spawn(move || {
            let guard = engine.store().begin_training(slot.name()).unwrap();
            held_tx.send(()).unwrap();
            lost_rx.recv().unwrap();
            drop(guard);
            engine.train_regressor(RegressionTarget::ApprovalHours, corpus)
        });
        let second = s.spawn(move || {
            held_rx.recv().unwrap();
            let result = engine.train_regressor(RegressionTarget::ApprovalHours, corpus);
            lost_tx.send(()).unwrap();
            result
        });
        vec![first.join().unwrap(), second.join().unwrap()]
    });

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let busy = results
        .iter()
        .filter(|r| matches!(r, Err(FlowcastError::TrainingInProgress { .. })))
        .count();
    assert_eq!((ok, busy), (1, 1));
    assert!(results[0].is_ok());
    let status = engine.model_status(slot).unwrap();
    assert!(status.trained);
    assert!(!status.training);
}

#[test]
fn second_request_while_training_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let engine = common::engine(dir.path());
    let guard = engine.store().begin_training(ModelSlot::TextClassifier.name()).unwrap();

    let err = engine.train_text_classifier(&common::phrases()).unwrap_err();
    assert_eq!(err.kind(), "training_in_progress");
    assert!(engine.model_status(ModelSlot::TextClassifier).unwrap().training);

    drop(guard);
    engine.train_text_classifier(&common::phrases()).unwrap();
}

#[test]
fn reloaded_models_predict_identically() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = common::corpus(40);
    let holdout: Vec<StepContext> = corpus.iter().step_by(5).map(Observation::context).collect();

    let trained = common::engine(dir.path());
    trained.train_transition_model(&corpus).unwrap();
    trained
        .train_regressor(RegressionTarget::SuccessProbability, &corpus)
        .unwrap();
    trained.train_text_classifier(&common::phrases()).unwrap();

    let reloaded = common::engine(dir.path());
    for ctx in &holdout {
        assert_eq!(trained.predict_next(ctx).unwrap(), reloaded.predict_next(ctx).unwrap());
        assert_eq!(
            trained.predict_success_rate(ctx).unwrap(),
            reloaded.predict_success_rate(ctx).unwrap()
        );
    }
    assert_eq!(
        trained.classify("printer jammed again").unwrap(),
        reloaded.classify("printer jammed again").unwrap()
    );
    assert_eq!(
        trained.feature_importance(RegressionTarget::SuccessProbability).unwrap(),
        reloaded.feature_importance(RegressionTarget::SuccessProbability).unwrap()
    );
}

#[test]
fn corpus_survives_json_and_feeds_patterns_and_export() {
    let dir = tempfile::tempdir().unwrap();
    let engine = common::engine(dir.path());
    let json = serde_json::to_string(&common::corpus(30)).unwrap();
    assert!(json.contains("\"department\":\"HR\""));
    let corpus: Vec<Observation> = serde_json::from_str(&json).unwrap();

    let report = engine.analyze_patterns(&corpus).unwrap();
    assert_eq!(report.total_requests, 30);
    assert_eq!(
        report.transition_counts[&Department::It][&Department::Finance],
        10
    );
    assert_eq!(report.departments[&Department::Admin].rejected, 4);

    // 40 step-to-step pairs plus one TERMINAL pair per approved chain.
    let records = engine.export_transitions(&corpus).unwrap();
    assert_eq!(records.len(), 66);
    assert_eq!(
        records
            .iter()
            .filter(|r| r.next == NextStep::Terminal)
            .count(),
        26
    );
}

#[test]
fn insights_are_available_after_training() {
    let dir = tempfile::tempdir().unwrap();
    let engine = common::engine(dir.path());
    engine
        .train_regressor(RegressionTarget::ApprovalHours, &common::corpus(40))
        .unwrap();
    let insights = engine.generate_insights(RegressionTarget::ApprovalHours).unwrap();
    assert!(!insights.is_empty());
    assert!(insights.iter().all(|i| i.contains("associated with")));
}
