//! Persistência de modelos treinados em disco.
//!
//! Cada slot ([`ModelSlot`]) é um arquivo `<dir>/<nome>.model` com duas linhas
//! JSON: um cabeçalho (metadados + checksum blake3 do corpo) e o corpo (o
//! modelo com o estado do encoder). A escrita vai para um temporário único
//! `<nome>.<uuid>.tmp` e é renomeada no final, então um leitor nunca vê um
//! artefato pela metade.
//!
//! O [`ModelStore`] também garante no máximo um treino em andamento por slot
//! através de [`TrainingGuard`].

use std::fmt;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashSet;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{FlowcastError, Result};
use crate::features::FittedEncoder;
use crate::regression::RegressionPredictor;
use crate::text::{TextClassifier, Vocabulary};
use crate::transition::TransitionModel;

const EXTENSION: &str = "model";

/// Slots conhecidos, um por modelo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelSlot {
    TextClassifier,
    TransitionModel,
    ApprovalTimeRegressor,
    SuccessRateRegressor,
}

impl ModelSlot {
    pub const ALL: [ModelSlot; 4] = [
        ModelSlot::TextClassifier,
        ModelSlot::TransitionModel,
        ModelSlot::ApprovalTimeRegressor,
        ModelSlot::SuccessRateRegressor,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelSlot::TextClassifier => "text-classifier",
            ModelSlot::TransitionModel => "transition-model",
            ModelSlot::ApprovalTimeRegressor => "approval-time-regressor",
            ModelSlot::SuccessRateRegressor => "success-rate-regressor",
        }
    }
}

impl fmt::Display for ModelSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelSlot {
    type Err = FlowcastError;

    fn from_str(s: &str) -> Result<Self> {
        ModelSlot::ALL
            .into_iter()
            .find(|slot| slot.name() == s.trim())
            .ok_or_else(|| FlowcastError::invalid("model", format!("unknown model slot `{s}`")))
    }
}

/// Um modelo que pode ser persistido junto com o estado de encoder do qual depende.
pub trait Fitted: Serialize + DeserializeOwned {
    type Encoder: Serialize;

    /// Rótulo gravado em [`ArtifactMetadata::kind`].
    const KIND: &'static str;

    fn encoder(&self) -> &Self::Encoder;
}

impl Fitted for TransitionModel {
    type Encoder = FittedEncoder;
    const KIND: &'static str = "decision-tree";

    fn encoder(&self) -> &FittedEncoder {
        TransitionModel::encoder(self)
    }
}

impl Fitted for RegressionPredictor {
    type Encoder = FittedEncoder;
    const KIND: &'static str = "linear-regression";

    fn encoder(&self) -> &FittedEncoder {
        RegressionPredictor::encoder(self)
    }
}

impl Fitted for TextClassifier {
    type Encoder = Vocabulary;
    const KIND: &'static str = "naive-bayes";

    fn encoder(&self) -> &Vocabulary {
        self.vocabulary()
    }
}

/// Metadados gravados no cabeçalho de cada artefato.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub name: String,
    pub artifact_id: Uuid,
    pub kind: String,
    pub sample_count: usize,
    pub holdout_count: usize,
    /// Acurácia (classificadores) ou R² (regressores) no holdout.
    pub score: Option<f64>,
    pub trained_at: DateTime<Utc>,
    /// blake3 do encoder serializado.
    pub encoder_fingerprint: String,
}

/// Modelo treinado mais seus metadados, versionados como uma unidade.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact<M> {
    pub metadata: ArtifactMetadata,
    pub model: M,
}

impl<M: Fitted> Artifact<M> {
    pub fn new(
        name: &str,
        model: M,
        sample_count: usize,
        holdout_count: usize,
        score: Option<f64>,
    ) -> Result<Self> {
        let metadata = ArtifactMetadata {
            name: name.to_string(),
            artifact_id: Uuid::new_v4(),
            kind: M::KIND.to_string(),
            sample_count,
            holdout_count,
            score,
            trained_at: Utc::now(),
            encoder_fingerprint: fingerprint(model.encoder())?,
        };
        Ok(Self { metadata, model })
    }
}

/// Hash blake3 (hex) da forma JSON de `value`.
pub fn fingerprint<T: Serialize>(value: &T) -> Result<String> {
    let bytes = serde_json::to_vec(value)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

#[derive(Serialize, Deserialize)]
struct Header {
    metadata: ArtifactMetadata,
    checksum: String,
}

/// Estado de um slot, obtido lendo apenas o cabeçalho.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStatus {
    pub name: String,
    pub trained: bool,
    pub training: bool,
    pub kind: Option<String>,
    pub sample_count: Option<usize>,
    pub score: Option<f64>,
    pub trained_at: Option<DateTime<Utc>>,
}

/// Repositório de artefatos num diretório local.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
    in_flight: Arc<DashSet<String>>,
}

/// Reserva de treino de um slot. Liberada no `Drop`.
#[derive(Debug)]
pub struct TrainingGuard {
    name: String,
    in_flight: Arc<DashSet<String>>,
}

impl TrainingGuard {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for TrainingGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.name);
        debug!(model = %self.name, "training slot released");
    }
}

impl ModelStore {
    /// Abre (criando se necessário) o diretório de modelos.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            in_flight: Arc::new(DashSet::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(FlowcastError::invalid(
                "name",
                format!("`{name}` is not a valid model name"),
            ));
        }
        Ok(self.dir.join(format!("{name}.{EXTENSION}")))
    }

    /// Grava o artefato de forma atômica (`<nome>.<uuid>.tmp` + rename).
    ///
    /// O artefato precisa ter sido criado para o slot `name`.
    pub fn save<M: Fitted>(&self, artifact: &Artifact<M>, name: &str) -> Result<PathBuf> {
        let path = self.path_for(name)?;
        if artifact.metadata.name != name {
            return Err(FlowcastError::invalid(
                "name",
                format!(
                    "artifact `{}` cannot be saved as `{name}`",
                    artifact.metadata.name
                ),
            ));
        }
        let body = serde_json::to_string(&artifact.model)?;
        let header = Header {
            metadata: artifact.metadata.clone(),
            checksum: blake3::hash(body.as_bytes()).to_hex().to_string(),
        };
        let contents = format!("{}\n{}\n", serde_json::to_string(&header)?, body);

        // Nome único: dois stores no mesmo diretório não compartilham o temporário.
        let tmp = self.dir.join(format!("{name}.{}.tmp", Uuid::new_v4()));
        if let Err(e) = fs::write(&tmp, contents).and_then(|()| fs::rename(&tmp, &path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        info!(
            model = name,
            id = %artifact.metadata.artifact_id,
            path = %path.display(),
            "artifact saved"
        );
        Ok(path)
    }

    /// Carrega e valida um artefato.
    ///
    /// Arquivo ausente gera `ModelNotFound`; JSON inválido, checksum ou
    /// fingerprint divergentes geram `CorruptArtifact`. O mesmo vale para um
    /// cabeçalho de outro tipo de modelo ou de outro slot.
    pub fn load<M: Fitted>(&self, name: &str) -> Result<Artifact<M>> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(FlowcastError::ModelNotFound {
                model: name.to_string(),
            });
        }
        let corrupt = |reason: String| FlowcastError::CorruptArtifact {
            model: name.to_string(),
            reason,
        };

        let contents = fs::read_to_string(&path)?;
        let mut lines = contents.lines();
        let header_line = lines.next().ok_or_else(|| corrupt("empty file".into()))?;
        let body = lines.next().ok_or_else(|| corrupt("missing body".into()))?;

        let header: Header = serde_json::from_str(header_line)
            .map_err(|e| corrupt(format!("unreadable header: {e}")))?;
        if header.metadata.kind != M::KIND {
            return Err(corrupt(format!(
                "holds a `{}` model, expected `{}`",
                header.metadata.kind,
                M::KIND
            )));
        }
        if header.metadata.name != name {
            return Err(corrupt(format!(
                "header names slot `{}`",
                header.metadata.name
            )));
        }
        let checksum = blake3::hash(body.as_bytes()).to_hex().to_string();
        if checksum != header.checksum {
            return Err(corrupt("body checksum mismatch".into()));
        }
        let model: M =
            serde_json::from_str(body).map_err(|e| corrupt(format!("unreadable body: {e}")))?;
        if fingerprint(model.encoder())? != header.metadata.encoder_fingerprint {
            return Err(corrupt("encoder fingerprint mismatch".into()));
        }

        debug!(model = name, id = %header.metadata.artifact_id, "artifact loaded");
        Ok(Artifact {
            metadata: header.metadata,
            model,
        })
    }

    /// Consulta o estado de um slot sem desserializar o modelo.
    pub fn model_status(&self, name: &str) -> Result<ModelStatus> {
        let path = self.path_for(name)?;
        let training = self.is_training(name);
        if !path.exists() {
            return Ok(ModelStatus {
                name: name.to_string(),
                trained: false,
                training,
                kind: None,
                sample_count: None,
                score: None,
                trained_at: None,
            });
        }

        let mut header_line = String::new();
        BufReader::new(File::open(&path)?).read_line(&mut header_line)?;
        let header: Header =
            serde_json::from_str(header_line.trim_end()).map_err(|e| FlowcastError::CorruptArtifact {
                model: name.to_string(),
                reason: format!("unreadable header: {e}"),
            })?;
        let metadata = header.metadata;
        Ok(ModelStatus {
            name: name.to_string(),
            trained: true,
            training,
            kind: Some(metadata.kind),
            sample_count: Some(metadata.sample_count),
            score: metadata.score,
            trained_at: Some(metadata.trained_at),
        })
    }

    /// Estado de todos os slots conhecidos.
    pub fn list(&self) -> Result<Vec<ModelStatus>> {
        ModelSlot::ALL
            .iter()
            .map(|slot| self.model_status(slot.name()))
            .collect()
    }

    /// Reserva o slot para treino. Um segundo pedido concorrente recebe
    /// `TrainingInProgress` até o guard anterior ser liberado.
    pub fn begin_training(&self, name: &str) -> Result<TrainingGuard> {
        if !self.in_flight.insert(name.to_string()) {
            return Err(FlowcastError::TrainingInProgress {
                model: name.to_string(),
            });
        }
        debug!(model = name, "training slot reserved");
        Ok(TrainingGuard {
            name: name.to_string(),
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn is_training(&self, name: &str) -> bool {
        self.in_flight.contains(name)
    }
}
