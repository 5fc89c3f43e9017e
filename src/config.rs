//! Configuração do flowcast carregada a partir de `flowcast.toml`.
//!
//! A struct [`FlowcastConfig`] contém todos os parâmetros de treino e inferência.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `FLOWCAST_MODEL_DIR` tem precedência sobre o arquivo.

use anyhow::{Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuração de nível superior carregada de `flowcast.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowcastConfig {
    /// Diretório onde os artefatos de modelo são persistidos.
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Mínimo de amostras para treinar o encoder, o classificador de texto e os regressores.
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Mínimo de cadeias para treinar o modelo de transição.
    #[serde(default = "default_min_chains")]
    pub min_chains: usize,

    /// Número máximo de passos ao sugerir uma cadeia completa.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Abaixo desta confiança o classificador de texto devolve `Other`.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Número de folds na validação cruzada dos regressores.
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,

    /// Regularização L2 do candidato ridge.
    #[serde(default = "default_ridge_alpha")]
    pub ridge_alpha: f64,

    /// Regularização L1 do candidato lasso.
    #[serde(default = "default_lasso_alpha")]
    pub lasso_alpha: f64,

    /// Profundidade máxima da árvore de decisão do modelo de transição.
    #[serde(default = "default_tree_max_depth")]
    pub tree_max_depth: usize,

    /// Mínimo de amostras num nó para tentar dividi-lo.
    #[serde(default = "default_tree_min_samples_split")]
    pub tree_min_samples_split: usize,
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_min_samples() -> usize {
    10
}

fn default_min_chains() -> usize {
    10
}

fn default_max_steps() -> usize {
    5
}

fn default_confidence_threshold() -> f64 {
    0.4
}

fn default_cv_folds() -> usize {
    3
}

fn default_ridge_alpha() -> f64 {
    1.0
}

fn default_lasso_alpha() -> f64 {
    0.1
}

fn default_tree_max_depth() -> usize {
    10
}

fn default_tree_min_samples_split() -> usize {
    2
}

impl Default for FlowcastConfig {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            min_samples: default_min_samples(),
            min_chains: default_min_chains(),
            max_steps: default_max_steps(),
            confidence_threshold: default_confidence_threshold(),
            cv_folds: default_cv_folds(),
            ridge_alpha: default_ridge_alpha(),
            lasso_alpha: default_lasso_alpha(),
            tree_max_depth: default_tree_max_depth(),
            tree_min_samples_split: default_tree_min_samples_split(),
        }
    }
}

impl FlowcastConfig {
    /// Carrega a configuração de `flowcast.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("flowcast.toml"))
    }

    /// Carrega a configuração de um caminho explícito.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<FlowcastConfig>(&contents)?
        } else {
            Self::default()
        };

        config.override_model_dir(std::env::var("FLOWCAST_MODEL_DIR").ok());

        config.validate()?;
        Ok(config)
    }

    /// `FLOWCAST_MODEL_DIR` tem precedência sobre o arquivo; valor vazio é ignorado.
    fn override_model_dir(&mut self, dir: Option<String>) {
        if let Some(dir) = dir
            && !dir.is_empty()
        {
            self.model_dir = PathBuf::from(dir);
        }
    }

    /// Rejeita combinações de parâmetros que tornariam o treino impossível.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            bail!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            );
        }
        if self.cv_folds < 2 {
            bail!("cv_folds must be at least 2, got {}", self.cv_folds);
        }
        if self.ridge_alpha < 0.0 || self.lasso_alpha < 0.0 {
            bail!("regularization strengths must be non-negative");
        }
        if self.max_steps == 0 {
            bail!("max_steps must be at least 1");
        }
        if self.tree_max_depth == 0 {
            bail!("tree_max_depth must be at least 1");
        }
        Ok(())
    }
}
