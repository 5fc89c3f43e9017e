//! Interface de linha de comando do flowcast baseada em clap.
//!
//! Define a struct [`Cli`] com os subcomandos [`Command`] (train, classify,
//! predict-next, suggest, predict-time, predict-success, importance,
//! insights, patterns, export, status) e flags globais
//! (--config, --model-dir, --verbose).

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};

use flowcast::regression::RegressionTarget;
use flowcast::{FlowcastError, Result, StepContext};

/// flowcast: análise preditiva de fluxos de aprovação.
#[derive(Debug, Parser)]
#[command(name = "flowcast", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração.
    #[arg(long, global = true, default_value = "flowcast.toml")]
    pub config: PathBuf,

    /// Diretório de modelos; tem precedência sobre o arquivo e o ambiente.
    #[arg(long, global = true)]
    pub model_dir: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Regressor alvo aceito pela CLI, mapeado para [`RegressionTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetArg {
    /// Tempo até a decisão de um passo.
    ApprovalTime,
    /// Probabilidade de aprovação de um passo.
    SuccessRate,
}

impl From<TargetArg> for RegressionTarget {
    fn from(value: TargetArg) -> Self {
        match value {
            TargetArg::ApprovalTime => RegressionTarget::ApprovalHours,
            TargetArg::SuccessRate => RegressionTarget::SuccessProbability,
        }
    }
}

/// Estado atual de uma cadeia em andamento.
#[derive(Debug, Clone, Args)]
pub struct ContextArgs {
    /// Departamento do passo atual (ex.: HR, IT, Finance).
    #[arg(long)]
    pub department: Option<String>,

    /// Prioridade do pedido (low, normal, high, urgent).
    #[arg(long, default_value = "normal")]
    pub priority: String,

    /// Posição do passo atual na cadeia (começa em 1).
    #[arg(long, default_value_t = 1)]
    pub step: u32,

    /// Tipo do pedido.
    #[arg(long, default_value = "general")]
    pub request_type: String,

    /// Momento de submissão em RFC 3339; padrão é agora.
    #[arg(long)]
    pub at: Option<String>,
}

impl ContextArgs {
    /// Converte os argumentos num [`StepContext`], usando `now` quando `--at` falta.
    pub fn to_context(&self, now: DateTime<Utc>) -> Result<StepContext> {
        let department = self
            .department
            .as_deref()
            .ok_or_else(|| FlowcastError::invalid("department", "required"))?
            .parse()?;
        let priority = self.priority.parse()?;
        Ok(StepContext::new(
            department,
            priority,
            self.step,
            &self.request_type,
            self.submitted_at(now)?,
        ))
    }

    pub fn submitted_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        match &self.at {
            None => Ok(now),
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| FlowcastError::invalid("at", e.to_string())),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Treina os modelos a partir de um histórico de aprovações.
    Train {
        /// Arquivo JSON com a lista de observações.
        #[arg(long)]
        observations: PathBuf,

        /// Arquivo JSON com textos rotulados para o classificador de texto.
        #[arg(long)]
        texts: Option<PathBuf>,
    },

    /// Classifica um texto livre num departamento.
    Classify {
        /// Texto do pedido.
        text: String,
    },

    /// Prevê o próximo departamento de uma cadeia.
    PredictNext {
        #[command(flatten)]
        context: ContextArgs,
    },

    /// Sugere a cadeia completa a partir de um contexto ou de uma mensagem.
    Suggest {
        /// Mensagem livre; quando presente, o departamento inicial é classificado.
        #[arg(long, conflicts_with = "department")]
        message: Option<String>,

        /// Número máximo de passos sugeridos.
        #[arg(long)]
        max_steps: Option<usize>,

        #[command(flatten)]
        context: ContextArgs,
    },

    /// Estima o tempo de aprovação de um passo.
    PredictTime {
        #[command(flatten)]
        context: ContextArgs,
    },

    /// Estima a probabilidade de aprovação de um passo.
    PredictSuccess {
        #[command(flatten)]
        context: ContextArgs,
    },

    /// Mostra a importância das features de um regressor.
    Importance {
        #[arg(long, value_enum)]
        target: TargetArg,
    },

    /// Gera observações textuais a partir dos coeficientes de um regressor.
    Insights {
        #[arg(long, value_enum)]
        target: TargetArg,
    },

    /// Analisa padrões de transição de um histórico.
    Patterns {
        /// Arquivo JSON com a lista de observações.
        #[arg(long)]
        observations: PathBuf,
    },

    /// Exporta as transições mineradas em JSON.
    Export {
        /// Arquivo JSON com a lista de observações.
        #[arg(long)]
        observations: PathBuf,

        /// Arquivo de saída; padrão é stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Mostra o estado de cada modelo.
    Status,
}
