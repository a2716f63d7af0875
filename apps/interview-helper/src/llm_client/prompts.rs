// Shared prompt constants for structured output.
// Each stage that needs LLM calls defines its own prompts.rs alongside it.

/// System prompt for the one-shot JSON repair call.
pub const JSON_REPAIR_SYSTEM: &str = "You repair JSON. Output strict JSON only.";

/// Closing rule appended to every prompt that expects JSON back.
pub const STRICT_JSON_RULE: &str = "Return STRICT JSON only. No commentary.";
