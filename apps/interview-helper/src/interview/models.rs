use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::interview::prompts::{render, ANSWER_USER_TEMPLATE, PLANNER_USER_TEMPLATE};

/// The four free-text fields collected from the user. Immutable once collected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterviewInputs {
    pub role: String,
    pub interviewer_title: String,
    pub job_description: String,
    pub resume_text: String,
}

impl InterviewInputs {
    /// Checks that every field is non-empty after trimming.
    /// Returns the names of the missing fields, in prompt order.
    pub fn validate(&self) -> Result<(), AppError> {
        let missing: Vec<&'static str> = [
            ("job title", &self.role),
            ("interviewer title", &self.interviewer_title),
            ("job description", &self.job_description),
            ("resume", &self.resume_text),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::MissingInput(missing))
        }
    }

    fn vars(&self) -> [(&'static str, &str); 4] {
        [
            ("role", self.role.as_str()),
            ("interviewer_title", self.interviewer_title.as_str()),
            ("job_description", self.job_description.as_str()),
            ("resume_text", self.resume_text.as_str()),
        ]
    }

    /// User prompt for the planning stage. Inputs are embedded verbatim.
    pub fn planner_prompt(&self) -> String {
        render(PLANNER_USER_TEMPLATE, &self.vars())
    }

    /// User prompt for the answering stage: the inputs plus the compact plan JSON.
    pub fn answer_prompt(&self, plan_json: &str) -> String {
        let [role, interviewer, jd, resume] = self.vars();
        render(
            ANSWER_USER_TEMPLATE,
            &[role, interviewer, jd, resume, ("plan_json", plan_json)],
        )
    }
}

/// Structured output of the planning stage.
///
/// Field order is the serialized key order. Extra keys from the model are ignored;
/// all three lists must be present and hold strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRecord {
    /// Prompted as 3–6 short steps; not enforced.
    pub steps: Vec<String>,
    pub assumptions: Vec<String>,
    pub success_criteria: Vec<String>,
}

impl PlanRecord {
    pub const PROMPTED_STEPS: std::ops::RangeInclusive<usize> = 3..=6;

    /// Single-line JSON used when embedding the plan in the answer prompt.
    pub fn to_compact_json(&self) -> Result<String, AppError> {
        serde_json::to_string(self)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize plan: {e}")))
    }

    /// Two-space indented JSON for the plan file. Non-ASCII is written literally.
    pub fn to_pretty_json(&self) -> Result<String, AppError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize plan: {e}")))
    }
}

/// Markdown produced by the answering stage. Opaque: never parsed or validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalDocument(pub String);

impl FinalDocument {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
