use std::path::PathBuf;

use thiserror::Error;

use crate::interview::pipeline::PipelineStage;
use crate::interview::repair::RepairFailure;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Every stage of a run returns `Result<T, AppError>`; `main` turns it into a message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("All inputs are required. Missing: {}", .0.join(", "))]
    MissingInput(Vec<&'static str>),

    #[error("LLM error during {stage}: {source}")]
    Transport {
        stage: PipelineStage,
        #[source]
        source: LlmError,
    },

    #[error(transparent)]
    Repair(#[from] RepairFailure),

    #[error("Failed to write {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn transport(stage: PipelineStage, source: LlmError) -> Self {
        AppError::Transport { stage, source }
    }

    /// Missing input is a user mistake, not a failed run.
    pub fn is_user_error(&self) -> bool {
        matches!(self, AppError::MissingInput(_))
    }
}
