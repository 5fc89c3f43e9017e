//! Interface de terminal do flowcast: spinners e saída colorida.
//!
//! Usa `indicatif` para o spinner de treino e `console` para estilização.
//! O [`TrainingProgress`] acompanha visualmente o treino de um slot.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use flowcast::regression::{Estimate, FeatureWeight};
use flowcast::text::Classification;
use flowcast::transition::{ChainSuggestion, Prediction, StopReason};
use flowcast::{FlowcastError, MessageRouting, ModelSlot, ModelStatus};

/// Indicador de progresso do treino de um modelo.
pub struct TrainingProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
}

impl TrainingProgress {
    /// Inicia o spinner para o slot informado.
    pub fn start(slot: ModelSlot) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Training {slot}..."));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
        }
    }

    /// Finaliza o spinner com o resumo do treino.
    pub fn success(&self, slot: ModelSlot, summary: &str) {
        self.pb.finish_and_clear();
        println!("  {} {slot}: {summary}", self.green.apply_to("✓"));
    }

    /// Finaliza o spinner com o erro do treino.
    pub fn failure(&self, slot: ModelSlot, err: &FlowcastError) {
        self.pb.finish_and_clear();
        println!("  {} {slot}: {err}", self.red.apply_to("✗"));
    }
}

fn bold() -> Style {
    Style::new().bold()
}

fn dim() -> Style {
    Style::new().dim()
}

/// Formata uma proporção em porcentagem com uma casa decimal.
pub fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

pub fn print_classification(result: &Classification) {
    let style = if result.fallback {
        Style::new().yellow().bold()
    } else {
        Style::new().green().bold()
    };
    println!(
        "{} {} ({})",
        bold().apply_to("Department:"),
        style.apply_to(result.department),
        percent(result.confidence)
    );
    if result.fallback {
        println!("  {}", dim().apply_to("low confidence, routed to Other"));
    }
    for (dept, p) in result.ranking.iter().take(3) {
        println!("  {} {dept:<18} {}", dim().apply_to("·"), percent(*p));
    }
}

pub fn print_prediction(prediction: &Prediction) {
    println!(
        "{} {} ({})",
        bold().apply_to("Next:"),
        Style::new().cyan().bold().apply_to(prediction.next),
        percent(prediction.confidence)
    );
    for (next, p) in prediction.alternatives.iter().skip(1).take(3) {
        println!("  {} {next:<18} {}", dim().apply_to("·"), percent(*p));
    }
}

pub fn print_suggestion(suggestion: &ChainSuggestion) {
    let mut line = Style::new().cyan().bold().apply_to(suggestion.seed).to_string();
    for step in &suggestion.steps {
        line.push_str(&format!(" → {} ({})", step.department, percent(step.confidence)));
    }
    println!("{} {line}", bold().apply_to("Chain:"));
    let stop = match suggestion.stop {
        StopReason::Terminal => "chain complete",
        StopReason::MaxSteps => "step limit reached",
        StopReason::Cycle => "stopped on repeated department",
    };
    println!("  {}", dim().apply_to(stop));
}

pub fn print_routing(routing: &MessageRouting) {
    print_classification(&routing.classification);
    println!("{} {}", bold().apply_to("Priority:"), routing.priority);
    print_suggestion(&routing.suggestion);
}

pub fn print_estimate(label: &str, estimate: &Estimate) {
    println!(
        "{} {}",
        bold().apply_to(format!("{label}:")),
        Style::new().green().bold().apply_to(estimate.readable())
    );
    if estimate.clamped {
        println!(
            "  {}",
            dim().apply_to(format!("raw model output {:.3} was clamped", estimate.raw))
        );
    }
}

pub fn print_importance(weights: &[FeatureWeight]) {
    for w in weights {
        let style = if w.coefficient >= 0.0 {
            Style::new().green()
        } else {
            Style::new().red()
        };
        println!("  {:<32} {}", w.name, style.apply_to(format!("{:+.4}", w.coefficient)));
    }
}

pub fn print_insights(insights: &[String]) {
    for insight in insights {
        println!("  {} {insight}", Style::new().cyan().apply_to("•"));
    }
}

pub fn print_status(statuses: &[ModelStatus]) {
    for status in statuses {
        let marker = if status.training {
            Style::new().yellow().apply_to("…")
        } else if status.trained {
            Style::new().green().apply_to("✓")
        } else {
            Style::new().red().apply_to("✗")
        };
        let detail = match (status.trained_at, status.sample_count) {
            (Some(at), Some(n)) => {
                let score = status
                    .score
                    .map(|s| format!(", score {s:.3}"))
                    .unwrap_or_default();
                format!("{n} samples{score}, trained {}", at.format("%Y-%m-%d %H:%M UTC"))
            }
            _ => "not trained".to_string(),
        };
        println!("  {marker} {:<26} {}", status.name, dim().apply_to(detail));
    }
}

/// Imprime qualquer valor serializável como JSON formatado.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Imprime um erro de nível superior, com o tipo quando for um [`FlowcastError`].
pub fn print_error(err: &anyhow::Error) {
    let red = Style::new().red().bold();
    match err.downcast_ref::<FlowcastError>() {
        Some(e) => eprintln!("{} [{}] {e}", red.apply_to("error"), e.kind()),
        None => eprintln!("{} {err:#}", red.apply_to("error")),
    }
}
