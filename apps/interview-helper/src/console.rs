//! Console boundary: collects the four inputs and prints run progress.
//! Nothing in here talks to the model; the pipeline never touches stdin.

use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use dialoguer::Input;

use crate::interview::models::InterviewInputs;
use crate::interview::pipeline::PipelineStage;

const RULE_WIDTH: usize = 80;

const ROLE_LABEL: &str = "Step 1 — Enter Job Title";
const INTERVIEWER_LABEL: &str = "Step 1 — Enter Interviewer Title (Hiring Manager or Recruiter)";
const JD_LABEL: &str = "Step 2 — Job Description";
const RESUME_LABEL: &str = "Step 3 — Resume";

/// Prompts for all four fields. Empty answers are accepted here and rejected by validation.
///
/// dialoguer line editing is used only when both stdin and stderr are terminals;
/// otherwise every field is read from stdin.
pub fn collect_inputs() -> Result<InterviewInputs> {
    if io::stdin().is_terminal() && io::stderr().is_terminal() {
        collect_interactive()
    } else {
        read_inputs(&mut io::stdin().lock(), &mut io::stdout().lock())
    }
}

fn collect_interactive() -> Result<InterviewInputs> {
    let mut out = io::stdout();
    writeln!(out, "\n=== Interview Helper (Two-Stage) ===")?;

    let role = prompt_line_interactive(ROLE_LABEL)?;
    let interviewer_title = prompt_line_interactive(INTERVIEWER_LABEL)?;
    // stdin is locked per field so dialoguer never waits on a held lock
    let job_description = prompt_multiline(JD_LABEL, &mut io::stdin().lock(), &mut out)?;
    let resume_text = prompt_multiline(RESUME_LABEL, &mut io::stdin().lock(), &mut out)?;

    Ok(InterviewInputs {
        role,
        interviewer_title,
        job_description,
        resume_text,
    })
}

/// Reads all four fields, in prompt order, from a single reader.
pub fn read_inputs(reader: &mut impl BufRead, out: &mut impl Write) -> Result<InterviewInputs> {
    writeln!(out, "\n=== Interview Helper (Two-Stage) ===")?;

    let role = prompt_line(ROLE_LABEL, reader, out)?;
    let interviewer_title = prompt_line(INTERVIEWER_LABEL, reader, out)?;
    let job_description = prompt_multiline(JD_LABEL, reader, out)?;
    let resume_text = prompt_multiline(RESUME_LABEL, reader, out)?;

    Ok(InterviewInputs {
        role,
        interviewer_title,
        job_description,
        resume_text,
    })
}

fn prompt_line_interactive(label: &str) -> Result<String> {
    let value: String = Input::new()
        .with_prompt(label)
        .allow_empty(true)
        .interact_text()
        .with_context(|| format!("Failed to read {label}"))?;
    Ok(value.trim().to_string())
}

fn prompt_line(label: &str, reader: &mut impl BufRead, out: &mut impl Write) -> Result<String> {
    write!(out, "{label}: ")?;
    out.flush()?;
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .with_context(|| format!("Failed to read {label}"))?;
    Ok(line.trim().to_string())
}

fn prompt_multiline(
    label: &str,
    reader: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<String> {
    writeln!(
        out,
        "\nEnter {label}. End with an empty line, or press Ctrl+D (macOS/Linux) to finish:"
    )?;
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
    out.flush()?;
    let text = read_multiline(reader).with_context(|| format!("Failed to read {label}"));
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
    text
}

/// Reads lines until a blank line that follows at least one line, or EOF.
/// Leading blank lines are skipped; the result is trimmed.
pub fn read_multiline(reader: &mut impl BufRead) -> io::Result<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut buf = String::new();

    loop {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            break;
        }
        let line = buf.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            if lines.is_empty() {
                continue;
            }
            break;
        }
        lines.push(line.to_string());
    }

    Ok(lines.join("\n").trim().to_string())
}

/// Console lines announcing stage changes during a run.
pub struct ProgressMarkers {
    plan_path: String,
    saw_repair: AtomicBool,
}

impl ProgressMarkers {
    pub fn new(plan_path: impl Into<String>) -> Self {
        Self {
            plan_path: plan_path.into(),
            saw_repair: AtomicBool::new(false),
        }
    }

    /// The line to print when `stage` is entered, if any.
    pub fn line_for(&self, stage: PipelineStage) -> Option<String> {
        match stage {
            PipelineStage::Planning => Some("\n[Chain 1] Creating plan...".to_string()),
            PipelineStage::Repairing => {
                self.saw_repair.store(true, Ordering::Relaxed);
                Some("[Chain 1] Plan JSON parse failed. Attempting a one-time repair...".to_string())
            }
            PipelineStage::Answering => {
                let suffix = if self.saw_repair.load(Ordering::Relaxed) {
                    " (repaired)"
                } else {
                    ""
                };
                Some(format!(
                    "[Chain 1] Plan ready. Saved to {}{suffix}\n[Chain 2] Generating final Markdown answer...",
                    self.plan_path
                ))
            }
            _ => None,
        }
    }
}

/// Prints the document between banner rules.
pub fn print_document(document: &str) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "\n========== FINAL ANSWER (Markdown) ==========\n")?;
    writeln!(out, "{document}")?;
    writeln!(out, "\n=============================================\n")?;
    out.flush()
}
