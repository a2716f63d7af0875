// All LLM prompt constants for the interview chain.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for the planning stage — enforces JSON-only output.
pub const PLANNER_SYSTEM: &str = r#"You are a precise planning assistant.
Given the user's inputs for an Interview Helper (job title, interviewer title, job description, resume),
produce a compact execution plan in STRICT JSON with EXACTLY these keys:
{
  "steps": ["...", "..."],          // 3–6 short, clear steps
  "assumptions": ["...", "..."],    // bullet list of assumptions
  "success_criteria": ["...", "..."]// what success looks like
}
Rules:
- Return STRICT JSON only. No markdown, no commentary.
- Keep steps actionable and specific to turning inputs into 10 tailored interview questions.
"#;

/// System prompt for the answering stage — Markdown output.
pub const ANSWERER_SYSTEM: &str = r#"You are an interview-prep assistant.
Using the user's original inputs AND the provided planning JSON, produce a final response in MARKDOWN that:
- Includes a brief overview section (who the interviewer is, what the role needs).
- Presents EXACTLY **10** tailored interview questions (mix: role/technical, behavioral, resume-based follow-ups).
- Uses clear headings and bullet points.
- Ends with a short **Next Steps** list (3–5 bullets).
- Be concise, specific, and avoid duplication.
"#;

/// Planner user prompt. Replace: {role}, {interviewer_title}, {job_description}, {resume_text}
pub const PLANNER_USER_TEMPLATE: &str = r#"INPUTS:
JOB TITLE: {role}

INTERVIEWER TITLE: {interviewer_title}

JOB DESCRIPTION:
{job_description}

RESUME:
{resume_text}
"#;

/// Answerer user prompt. Same placeholders as the planner plus {plan_json}.
pub const ANSWER_USER_TEMPLATE: &str = r#"ORIGINAL INPUTS:
JOB TITLE: {role}

INTERVIEWER TITLE: {interviewer_title}

JOB DESCRIPTION:
{job_description}

RESUME:
{resume_text}

PLANNING JSON:
{plan_json}
"#;

/// Repair instruction. Replace `{strict_json_rule}` and `{broken_text}` before sending.
pub const REPAIR_PROMPT_TEMPLATE: &str = r#"The following text was supposed to be STRICT JSON but isn't. Repair it to valid JSON that matches this schema:
{
  "steps": ["...", "..."],
  "assumptions": ["...", "..."],
  "success_criteria": ["...", "..."]
}
{strict_json_rule}

BROKEN TEXT:
{broken_text}"#;

/// Fills `{name}` placeholders in a single pass.
///
/// Substituted values are never re-scanned, so user text containing `{role}` or
/// JSON braces passes through untouched. Unknown placeholders are left as-is.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let extra: usize = vars.iter().map(|(_, value)| value.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let hit = vars.iter().find(|(name, _)| {
            after
                .strip_prefix(name)
                .is_some_and(|tail| tail.starts_with('}'))
        });
        match hit {
            Some((name, value)) => {
                out.push_str(value);
                rest = &after[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
