//! CLI parse: clap types for the interview helper. Definitions only.

use std::path::PathBuf;

use clap::Parser;

use crate::interview::artifacts::{DEFAULT_DOCUMENT_PATH, DEFAULT_PLAN_PATH};
use crate::llm_client::SamplingParams;

/// Interview Helper – two-stage prompt chaining CLI
#[derive(Debug, Parser)]
#[command(name = "interview-helper", version)]
pub struct Cli {
    /// Sampling temperature
    #[arg(long, default_value_t = 0.7, value_parser = parse_temperature)]
    pub temperature: f64,

    /// Nucleus sampling top_p, in (0, 1]
    #[arg(long = "top-p", alias = "top_p", default_value_t = 1.0, value_parser = parse_top_p)]
    pub top_p: f64,

    /// Max output tokens per call
    #[arg(
        long = "max-tokens",
        alias = "max_tokens",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_tokens: u32,

    /// Where to write the planning JSON
    #[arg(long, default_value = DEFAULT_PLAN_PATH)]
    pub plan_out: PathBuf,

    /// Where to write the final Markdown
    #[arg(long, default_value = DEFAULT_DOCUMENT_PATH)]
    pub output: PathBuf,
}

impl Cli {
    pub fn sampling(&self) -> SamplingParams {
        SamplingParams {
            temperature: self.temperature,
            top_p: self.top_p,
            max_output_tokens: self.max_tokens,
        }
    }
}

fn parse_temperature(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err("temperature must be >= 0".to_string())
    }
}

fn parse_top_p(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err("top_p must be in (0, 1]".to_string())
    }
}
