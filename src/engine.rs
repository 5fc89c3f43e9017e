//! Facade over training, persistence and inference.
//!
//! [`AnalyticsEngine`] owns the configuration and an injected [`ModelStore`].
//! Trained artifacts are loaded lazily, cached behind `Arc`, and swapped only
//! after a successful save.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::FlowcastConfig;
use crate::error::{FlowcastError, Result};
use crate::model::{
    Observation, Priority, StepContext, TransitionRecord, export_transitions, group_chains,
};
use crate::patterns::{PatternReport, analyze_patterns};
use crate::regression::{
    Estimate, FeatureWeight, RegressionPredictor, RegressionReport, RegressionTarget,
};
use crate::store::{Artifact, Fitted, ModelSlot, ModelStatus, ModelStore};
use crate::text::{Classification, LabeledText, PriorityDetector, TextClassifier, TextReport};
use crate::transition::{ChainSuggestion, Prediction, TransitionModel, TransitionReport};

type Cached<M> = RwLock<Option<Arc<Artifact<M>>>>;

/// Routing of a raw message: where it goes first, how urgent it is, and the
/// chain expected to follow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRouting {
    pub classification: Classification,
    pub priority: Priority,
    pub suggestion: ChainSuggestion,
}

pub struct AnalyticsEngine {
    config: FlowcastConfig,
    store: ModelStore,
    text: Cached<TextClassifier>,
    transition: Cached<TransitionModel>,
    approval_time: Cached<RegressionPredictor>,
    success_rate: Cached<RegressionPredictor>,
}

impl RegressionTarget {
    pub fn slot(&self) -> ModelSlot {
        match self {
            RegressionTarget::ApprovalHours => ModelSlot::ApprovalTimeRegressor,
            RegressionTarget::SuccessProbability => ModelSlot::SuccessRateRegressor,
        }
    }
}

impl AnalyticsEngine {
    pub fn new(config: FlowcastConfig, store: ModelStore) -> Self {
        Self {
            config,
            store,
            text: RwLock::new(None),
            transition: RwLock::new(None),
            approval_time: RwLock::new(None),
            success_rate: RwLock::new(None),
        }
    }

    /// Engine backed by a store at `config.model_dir`.
    pub fn open(config: FlowcastConfig) -> Result<Self> {
        let store = ModelStore::open(&config.model_dir)?;
        Ok(Self::new(config, store))
    }

    pub fn config(&self) -> &FlowcastConfig {
        &self.config
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    fn regressor_cache(&self, target: RegressionTarget) -> &Cached<RegressionPredictor> {
        match target {
            RegressionTarget::ApprovalHours => &self.approval_time,
            RegressionTarget::SuccessProbability => &self.success_rate,
        }
    }

    // ---- training ----

    pub fn train_text_classifier(&self, samples: &[LabeledText]) -> Result<TextReport> {
        let slot = ModelSlot::TextClassifier;
        let _guard = self.store.begin_training(slot.name())?;
        let (model, report) = TextClassifier::train(samples, &self.config)?;
        let artifact = Artifact::new(
            slot.name(),
            model,
            report.samples,
            report.holdout_samples,
            report.holdout_accuracy,
        )?;
        self.persist(slot, artifact, &self.text)?;
        Ok(report)
    }

    pub fn train_transition_model(&self, observations: &[Observation]) -> Result<TransitionReport> {
        let slot = ModelSlot::TransitionModel;
        let _guard = self.store.begin_training(slot.name())?;
        validate_all(observations)?;
        let chains = group_chains(observations)?;
        let (model, report) = TransitionModel::train(&chains, &self.config)?;
        let artifact = Artifact::new(
            slot.name(),
            model,
            report.training_pairs + report.holdout_pairs,
            report.holdout_pairs,
            report.holdout_accuracy,
        )?;
        self.persist(slot, artifact, &self.transition)?;
        Ok(report)
    }

    pub fn train_regressor(
        &self,
        target: RegressionTarget,
        observations: &[Observation],
    ) -> Result<RegressionReport> {
        let slot = target.slot();
        let _guard = self.store.begin_training(slot.name())?;
        validate_all(observations)?;
        let (model, report) = RegressionPredictor::train(observations, target, &self.config)?;
        let artifact = Artifact::new(
            slot.name(),
            model,
            report.samples,
            report.holdout_samples,
            report.holdout_r2(),
        )?;
        self.persist(slot, artifact, self.regressor_cache(target))?;
        Ok(report)
    }

    fn persist<M: Fitted>(&self, slot: ModelSlot, artifact: Artifact<M>, cache: &Cached<M>) -> Result<()> {
        self.store.save(&artifact, slot.name())?;
        *cache.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(artifact));
        info!(model = %slot, "model ready");
        Ok(())
    }

    /// Cached artifact for `slot`, loading it from the store on first use.
    fn artifact<M: Fitted>(&self, slot: ModelSlot, cache: &Cached<M>) -> Result<Arc<Artifact<M>>> {
        if let Some(artifact) = cache.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
            return Ok(Arc::clone(artifact));
        }
        let loaded = match self.store.load::<M>(slot.name()) {
            Ok(artifact) => Arc::new(artifact),
            Err(FlowcastError::ModelNotFound { model }) => {
                return Err(FlowcastError::ModelNotTrained { model });
            }
            Err(e) => return Err(e),
        };
        let mut slot_cache = cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(slot_cache.get_or_insert(loaded)))
    }

    // ---- inference ----

    pub fn classify(&self, text: &str) -> Result<Classification> {
        require_text(text)?;
        let artifact = self.artifact(ModelSlot::TextClassifier, &self.text)?;
        artifact.model.classify(text)
    }

    pub fn predict_next(&self, ctx: &StepContext) -> Result<Prediction> {
        validate_context(ctx)?;
        let artifact = self.artifact(ModelSlot::TransitionModel, &self.transition)?;
        Ok(artifact.model.predict_next(ctx))
    }

    /// `max_steps` defaults to the configured budget.
    pub fn suggest_chain(&self, seed: &StepContext, max_steps: Option<usize>) -> Result<ChainSuggestion> {
        validate_context(seed)?;
        let artifact = self.artifact(ModelSlot::TransitionModel, &self.transition)?;
        Ok(artifact
            .model
            .suggest_chain(seed, max_steps.unwrap_or(self.config.max_steps)))
    }

    /// Classifies `text` to pick the first department, detects urgency and
    /// suggests the rest of the chain.
    pub fn suggest_for_message(
        &self,
        text: &str,
        submitted_at: DateTime<Utc>,
        max_steps: Option<usize>,
    ) -> Result<MessageRouting> {
        let classification = self.classify(text)?;
        let priority = PriorityDetector::detect(text);
        let seed = StepContext::new(classification.department, priority, 1, "general", submitted_at);
        let suggestion = self.suggest_chain(&seed, max_steps)?;
        Ok(MessageRouting {
            classification,
            priority,
            suggestion,
        })
    }

    pub fn predict_approval_time(&self, ctx: &StepContext) -> Result<Estimate> {
        self.estimate(RegressionTarget::ApprovalHours, ctx)
    }

    pub fn predict_success_rate(&self, ctx: &StepContext) -> Result<Estimate> {
        self.estimate(RegressionTarget::SuccessProbability, ctx)
    }

    fn estimate(&self, target: RegressionTarget, ctx: &StepContext) -> Result<Estimate> {
        validate_context(ctx)?;
        Ok(self.regressor(target)?.model.estimate(ctx))
    }

    pub fn feature_importance(&self, target: RegressionTarget) -> Result<Vec<FeatureWeight>> {
        Ok(self.regressor(target)?.model.feature_importance())
    }

    pub fn generate_insights(&self, target: RegressionTarget) -> Result<Vec<String>> {
        Ok(self.regressor(target)?.model.generate_insights())
    }

    /// The regressor stored for `target`; one fitted for the other target is corrupt.
    fn regressor(&self, target: RegressionTarget) -> Result<Arc<Artifact<RegressionPredictor>>> {
        let slot = target.slot();
        let artifact = self.artifact(slot, self.regressor_cache(target))?;
        if artifact.model.target() != target {
            return Err(FlowcastError::CorruptArtifact {
                model: slot.name().to_string(),
                reason: format!("predicts {}, expected {target}", artifact.model.target()),
            });
        }
        Ok(artifact)
    }

    // ---- corpus views ----

    pub fn analyze_patterns(&self, observations: &[Observation]) -> Result<PatternReport> {
        validate_all(observations)?;
        Ok(analyze_patterns(observations))
    }

    pub fn export_transitions(&self, observations: &[Observation]) -> Result<Vec<TransitionRecord>> {
        validate_all(observations)?;
        Ok(export_transitions(&group_chains(observations)?))
    }

    pub fn model_status(&self, slot: ModelSlot) -> Result<ModelStatus> {
        self.store.model_status(slot.name())
    }

    pub fn status(&self) -> Result<Vec<ModelStatus>> {
        self.store.list()
    }
}

fn require_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(FlowcastError::invalid("text", "must not be empty"));
    }
    Ok(())
}

fn validate_context(ctx: &StepContext) -> Result<()> {
    if ctx.step_order == 0 {
        return Err(FlowcastError::invalid("step_order", "must be 1 or greater"));
    }
    Ok(())
}

fn validate_all(observations: &[Observation]) -> Result<()> {
    observations.iter().try_for_each(Observation::validate)
}
