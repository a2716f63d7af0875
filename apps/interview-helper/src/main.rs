mod cli;
mod config;
mod console;
mod errors;
mod interview;
mod llm_client;

use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::Cli;
use crate::config::Config;
use crate::errors::AppError;
use crate::interview::artifacts::FileArtifacts;
use crate::interview::pipeline::{InterviewPipeline, PipelineSettings};
use crate::llm_client::LlmClient;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    // Logs go to stderr so stdout carries only prompts and the document
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Interview Helper v{}", env!("CARGO_PKG_VERSION"));

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_user_error() => {
            println!("Error: {e}");
            ExitCode::SUCCESS
        }
        Err(AppError::Repair(failure)) => {
            println!("Plan repair failed.");
            println!("{failure}");
            println!("\nRaw plan output:\n{}", failure.broken_text);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: Config) -> Result<(), AppError> {
    let llm = LlmClient::new(config.openai_api_key.clone(), &config.openai_base_url)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {e}")))?;
    info!("LLM client initialized (model: {})", config.openai_model);

    let settings = PipelineSettings {
        model: config.openai_model.clone(),
        sampling: cli.sampling(),
    };

    let inputs = console::collect_inputs().map_err(AppError::Internal)?;
    let mut artifacts = FileArtifacts::new(&cli.plan_out, &cli.output);

    let markers = console::ProgressMarkers::new(cli.plan_out.display().to_string());
    let pipeline = InterviewPipeline::new(llm, settings).with_observer(move |stage| {
        if let Some(line) = markers.line_for(stage) {
            println!("{line}");
        }
    });

    let report = pipeline.run(&inputs, &mut artifacts).await?;

    console::print_document(report.document.as_str())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to print document: {e}")))?;
    println!("Saved Markdown to {}", artifacts.document_path.display());

    info!(
        repaired = report.repaired,
        steps = report.plan.steps.len(),
        "Run complete"
    );

    Ok(())
}
