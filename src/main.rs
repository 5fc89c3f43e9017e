mod cli;
mod ui;

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use cli::{Cli, Command};
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

use flowcast::regression::RegressionTarget;
use flowcast::text::LabeledText;
use flowcast::{AnalyticsEngine, FlowcastConfig, ModelSlot, Observation};
use ui::TrainingProgress;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::print_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "flowcast=debug" } else { "flowcast=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

fn run(cli: Cli) -> Result<()> {
    let mut config = FlowcastConfig::load_from(&cli.config)?;
    if let Some(dir) = cli.model_dir {
        config.model_dir = dir;
    }
    let engine = AnalyticsEngine::open(config)?;
    let now = Utc::now();

    match cli.command {
        Command::Train { observations, texts } => {
            let observations: Vec<Observation> = read_json(&observations)?;
            let texts: Option<Vec<LabeledText>> = texts
                .as_deref()
                .map(read_json::<Vec<LabeledText>>)
                .transpose()?;
            train(&engine, &observations, texts.as_deref())?;
        }
        Command::Classify { text } => {
            ui::print_classification(&engine.classify(&text)?);
        }
        Command::PredictNext { context } => {
            let ctx = context.to_context(now)?;
            ui::print_prediction(&engine.predict_next(&ctx)?);
        }
        Command::Suggest {
            message,
            max_steps,
            context,
        } => match message {
            Some(text) => {
                let routing =
                    engine.suggest_for_message(&text, context.submitted_at(now)?, max_steps)?;
                ui::print_routing(&routing);
            }
            None => {
                let ctx = context.to_context(now)?;
                ui::print_suggestion(&engine.suggest_chain(&ctx, max_steps)?);
            }
        },
        Command::PredictTime { context } => {
            let ctx = context.to_context(now)?;
            ui::print_estimate("Approval time", &engine.predict_approval_time(&ctx)?);
        }
        Command::PredictSuccess { context } => {
            let ctx = context.to_context(now)?;
            ui::print_estimate("Approval likelihood", &engine.predict_success_rate(&ctx)?);
        }
        Command::Importance { target } => {
            ui::print_importance(&engine.feature_importance(target.into())?);
        }
        Command::Insights { target } => {
            ui::print_insights(&engine.generate_insights(target.into())?);
        }
        Command::Patterns { observations } => {
            let observations: Vec<Observation> = read_json(&observations)?;
            ui::print_json(&engine.analyze_patterns(&observations)?)?;
        }
        Command::Export {
            observations,
            output,
        } => {
            let observations: Vec<Observation> = read_json(&observations)?;
            let records = engine.export_transitions(&observations)?;
            match output {
                Some(path) => {
                    fs::write(&path, serde_json::to_string_pretty(&records)?)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Exported {} transitions to {}", records.len(), path.display());
                }
                None => ui::print_json(&records)?,
            }
        }
        Command::Status => {
            ui::print_status(&engine.status()?);
        }
    }
    Ok(())
}

/// Trains every slot that has data, reporting each one; fails if any slot failed.
fn train(
    engine: &AnalyticsEngine,
    observations: &[Observation],
    texts: Option<&[LabeledText]>,
) -> Result<()> {
    let mut failures = 0;

    if let Some(texts) = texts {
        let progress = TrainingProgress::start(ModelSlot::TextClassifier);
        match engine.train_text_classifier(texts) {
            Ok(report) => progress.success(
                ModelSlot::TextClassifier,
                &format!(
                    "{} texts, {} terms, holdout accuracy {}",
                    report.samples,
                    report.vocabulary_size,
                    report.holdout_accuracy.map_or("n/a".to_string(), ui::percent)
                ),
            ),
            Err(e) => {
                progress.failure(ModelSlot::TextClassifier, &e);
                failures += 1;
            }
        }
    }

    let progress = TrainingProgress::start(ModelSlot::TransitionModel);
    match engine.train_transition_model(observations) {
        Ok(report) => progress.success(
            ModelSlot::TransitionModel,
            &format!(
                "{} chains, {} pairs, holdout accuracy {}",
                report.chains,
                report.training_pairs + report.holdout_pairs,
                report.holdout_accuracy.map_or("n/a".to_string(), ui::percent)
            ),
        ),
        Err(e) => {
            progress.failure(ModelSlot::TransitionModel, &e);
            failures += 1;
        }
    }

    for target in [RegressionTarget::ApprovalHours, RegressionTarget::SuccessProbability] {
        let progress = TrainingProgress::start(target.slot());
        match engine.train_regressor(target, observations) {
            Ok(report) => progress.success(
                target.slot(),
                &format!(
                    "{} samples, {} selected, holdout R² {}",
                    report.samples,
                    report.selected,
                    report
                        .holdout_r2()
                        .map_or("n/a".to_string(), |r2| format!("{r2:.3}"))
                ),
            ),
            Err(e) => {
                progress.failure(target.slot(), &e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} model(s) failed to train");
    }
    Ok(())
}
