//! Repair escalation: one model-assisted attempt to turn broken plan output into
//! valid JSON. Never more than one call; a second failure is terminal.

use thiserror::Error;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::interview::models::PlanRecord;
use crate::interview::pipeline::{PipelineSettings, PipelineStage};
use crate::interview::plan_parser::{parse_plan, ParseFailure};
use crate::interview::prompts::{render, REPAIR_PROMPT_TEMPLATE};
use crate::llm_client::prompts::{JSON_REPAIR_SYSTEM, STRICT_JSON_RULE};
use crate::llm_client::{GenerationRequest, TextGenerator};

/// The repair call returned text that still does not parse as a plan.
#[derive(Debug, Clone, Error)]
#[error("Repair attempt failed. Raw repair output:\n{repair_output}\n\nParse error: {parse_error}")]
pub struct RepairFailure {
    /// Planning output that triggered the repair.
    pub broken_text: String,
    pub repair_output: String,
    pub parse_error: ParseFailure,
}

/// Builds the repair user prompt: schema restatement followed by the broken text.
pub fn build_repair_prompt(broken_text: &str) -> String {
    render(
        REPAIR_PROMPT_TEMPLATE,
        &[
            ("strict_json_rule", STRICT_JSON_RULE),
            ("broken_text", broken_text),
        ],
    )
}

/// Asks the model once to fix `broken_text`, then re-parses its answer.
pub async fn repair_plan<G>(
    generator: &G,
    settings: &PipelineSettings,
    broken_text: &str,
) -> Result<PlanRecord, AppError>
where
    G: TextGenerator + ?Sized,
{
    let prompt = build_repair_prompt(broken_text);
    let request = GenerationRequest {
        model: &settings.model,
        system: JSON_REPAIR_SYSTEM,
        user: &prompt,
        sampling: settings.sampling,
    };

    let repair_output = generator
        .generate(&request)
        .await
        .map_err(|e| AppError::transport(PipelineStage::Repairing, e))?;

    match parse_plan(&repair_output) {
        Ok(plan) => {
            info!("Plan repaired by model");
            Ok(plan)
        }
        Err(parse_error) => {
            debug!("Repaired plan still unparseable: {parse_error}");
            Err(RepairFailure {
                broken_text: broken_text.to_string(),
                repair_output,
                parse_error,
            }
            .into())
        }
    }
}
