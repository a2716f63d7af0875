use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::AppError;
use crate::interview::models::{FinalDocument, PlanRecord};

pub const DEFAULT_PLAN_PATH: &str = "plan.json";
pub const DEFAULT_DOCUMENT_PATH: &str = "output.md";

/// Where a run's outputs go. Each method is called at most once per run,
/// right after the stage that produced the artifact.
pub trait ArtifactSink {
    fn save_plan(&mut self, plan: &PlanRecord) -> Result<(), AppError>;
    fn save_document(&mut self, document: &FinalDocument) -> Result<(), AppError>;
}

/// Writes the plan as indented JSON and the document verbatim. Plain overwrites.
#[derive(Debug, Clone)]
pub struct FileArtifacts {
    pub plan_path: PathBuf,
    pub document_path: PathBuf,
}

impl FileArtifacts {
    pub fn new(plan_path: impl Into<PathBuf>, document_path: impl Into<PathBuf>) -> Self {
        Self {
            plan_path: plan_path.into(),
            document_path: document_path.into(),
        }
    }
}

impl Default for FileArtifacts {
    fn default() -> Self {
        Self::new(DEFAULT_PLAN_PATH, DEFAULT_DOCUMENT_PATH)
    }
}

fn write(path: &Path, contents: &str) -> Result<(), AppError> {
    fs::write(path, contents).map_err(|source| AppError::Persist {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

impl ArtifactSink for FileArtifacts {
    fn save_plan(&mut self, plan: &PlanRecord) -> Result<(), AppError> {
        write(&self.plan_path, &plan.to_pretty_json()?)
    }

    fn save_document(&mut self, document: &FinalDocument) -> Result<(), AppError> {
        write(&self.document_path, document.as_str())
    }
}
