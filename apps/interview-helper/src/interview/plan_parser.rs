//! Plan Parser — decodes raw planning output into a `PlanRecord`.
//!
//! Two local attempts, no network: the text as-is, then the span from the first
//! `{` to the last `}`. That second attempt recovers plans wrapped in prose or
//! markdown fences without paying for a repair call.

use thiserror::Error;
use tracing::{debug, warn};

use crate::interview::models::PlanRecord;

/// Both local decode attempts failed.
#[derive(Debug, Clone, Error)]
#[error("{}", failure_message(.initial_error, .substring_error))]
pub struct ParseFailure {
    pub initial_error: String,
    /// Present only when a brace-delimited span was found and tried.
    pub substring_error: Option<String>,
    pub raw_text: String,
}

fn failure_message(initial_error: &str, substring_error: &Option<String>) -> String {
    match substring_error {
        Some(e) => format!("JSON parsing failed (initial + substring): {e}"),
        None => format!("JSON parsing failed: {initial_error}"),
    }
}

/// Parses model output as a plan, falling back to the outermost brace span.
pub fn parse_plan(raw_text: &str) -> Result<PlanRecord, ParseFailure> {
    let initial_error = match serde_json::from_str::<PlanRecord>(raw_text) {
        Ok(plan) => return Ok(checked(plan)),
        Err(e) => e.to_string(),
    };

    let Some(candidate) = outermost_braces(raw_text) else {
        debug!("Plan output has no brace span; skipping substring attempt");
        return Err(ParseFailure {
            initial_error,
            substring_error: None,
            raw_text: raw_text.to_string(),
        });
    };

    match serde_json::from_str::<PlanRecord>(candidate) {
        Ok(plan) => {
            debug!("Recovered plan from brace span after: {initial_error}");
            Ok(checked(plan))
        }
        Err(e) => Err(ParseFailure {
            initial_error,
            substring_error: Some(e.to_string()),
            raw_text: raw_text.to_string(),
        }),
    }
}

/// Slice from the first `{` through the last `}`, if the first precedes the last.
fn outermost_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn checked(plan: PlanRecord) -> PlanRecord {
    if !PlanRecord::PROMPTED_STEPS.contains(&plan.steps.len()) {
        warn!(
            "Plan has {} steps (prompted {}–{}); keeping it as-is",
            plan.steps.len(),
            PlanRecord::PROMPTED_STEPS.start(),
            PlanRecord::PROMPTED_STEPS.end()
        );
    }
    plan
}
