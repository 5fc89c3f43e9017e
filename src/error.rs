use thiserror::Error;

pub type Result<T> = std::result::Result<T, FlowcastError>;

#[derive(Debug, Error)]
pub enum FlowcastError {
    #[error("Not enough data to train {what}: need at least {required}, got {actual}")]
    InsufficientData {
        what: String,
        required: usize,
        actual: usize,
    },

    #[error("Model `{model}` has not been trained yet")]
    ModelNotTrained { model: String },

    #[error("Invalid value for `{field}`: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Training already in progress for `{model}`, retry later")]
    TrainingInProgress { model: String },

    #[error("No stored artifact for `{model}`")]
    ModelNotFound { model: String },

    #[error("Stored artifact for `{model}` is corrupt: {reason}")]
    CorruptArtifact { model: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlowcastError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        FlowcastError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn insufficient(what: &str, required: usize, actual: usize) -> Self {
        FlowcastError::InsufficientData {
            what: what.to_string(),
            required,
            actual,
        }
    }

    /// Stable machine-readable kind, used by callers to pick a user-facing message.
    pub fn kind(&self) -> &'static str {
        match self {
            FlowcastError::InsufficientData { .. } => "insufficient_data",
            FlowcastError::ModelNotTrained { .. } => "model_not_trained",
            FlowcastError::InvalidInput { .. } => "invalid_input",
            FlowcastError::TrainingInProgress { .. } => "training_in_progress",
            FlowcastError::ModelNotFound { .. } => "model_not_found",
            FlowcastError::CorruptArtifact { .. } => "corrupt_artifact",
            FlowcastError::Io(_) => "io",
            FlowcastError::Json(_) => "json",
        }
    }

    /// The offending field for input errors, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            FlowcastError::InvalidInput { field, .. } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_display() {
        let err = FlowcastError::insufficient("transition model", 10, 5);
        assert_eq!(
            err.to_string(),
            "Not enough data to train transition model: need at least 10, got 5"
        );
        assert_eq!(err.kind(), "insufficient_data");
    }

    #[test]
    fn invalid_input_carries_field() {
        let err = FlowcastError::invalid("priority", "unknown value `whenever`");
        assert_eq!(err.field(), Some("priority"));
        assert_eq!(err.kind(), "invalid_input");
        assert_eq!(
            err.to_string(),
            "Invalid value for `priority`: unknown value `whenever`"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FlowcastError>();
    }
}
