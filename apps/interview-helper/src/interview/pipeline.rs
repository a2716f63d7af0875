//! Two-stage orchestrator — plan (JSON) then answer (Markdown).
//!
//! Flow: validate inputs → planning call → parse → (one repair) → save plan →
//!       answering call → save document.
//!
//! Every failure halts the run at the stage where it happens. Nothing after a
//! failed stage runs, and artifacts from completed stages are left on disk.

use std::fmt;

use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::artifacts::ArtifactSink;
use crate::interview::models::{FinalDocument, InterviewInputs, PlanRecord};
use crate::interview::plan_parser::parse_plan;
use crate::interview::prompts::{ANSWERER_SYSTEM, PLANNER_SYSTEM};
use crate::interview::repair::repair_plan;
use crate::llm_client::{GenerationRequest, LlmError, SamplingParams, TextGenerator};

/// Model and sampling used for every call of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub model: String,
    pub sampling: SamplingParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    CollectingInputs,
    Planning,
    Parsing,
    Repairing,
    Answering,
    Done,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::CollectingInputs => "collecting inputs",
            PipelineStage::Planning => "planning",
            PipelineStage::Parsing => "parsing",
            PipelineStage::Repairing => "repairing",
            PipelineStage::Answering => "answering",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub plan: PlanRecord,
    pub document: FinalDocument,
    /// True when the plan only parsed after the model-assisted repair.
    pub repaired: bool,
}

type StageObserver = Box<dyn Fn(PipelineStage) + Send + Sync>;

pub struct InterviewPipeline<G> {
    generator: G,
    settings: PipelineSettings,
    observer: Option<StageObserver>,
}

impl<G: TextGenerator> InterviewPipeline<G> {
    pub fn new(generator: G, settings: PipelineSettings) -> Self {
        Self {
            generator,
            settings,
            observer: None,
        }
    }

    /// Registers a callback invoked on every stage entered, `Failed` included.
    pub fn with_observer(
        mut self,
        observer: impl Fn(PipelineStage) + Send + Sync + 'static,
    ) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    #[cfg(test)]
    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Runs both stages, persisting each artifact through `sink` as soon as it exists.
    pub async fn run(
        &self,
        inputs: &InterviewInputs,
        sink: &mut dyn ArtifactSink,
    ) -> Result<PipelineReport, AppError> {
        let span = info_span!(
            "interview_run",
            run_id = %Uuid::new_v4(),
            model = %self.settings.model
        );

        async move {
            let result = self.run_stages(inputs, sink).await;
            if let Err(e) = &result {
                self.enter(PipelineStage::Failed);
                // main reports the error to the user
                info!(user_error = e.is_user_error(), "Run halted: {e}");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        inputs: &InterviewInputs,
        sink: &mut dyn ArtifactSink,
    ) -> Result<PipelineReport, AppError> {
        self.enter(PipelineStage::CollectingInputs);
        inputs.validate()?;

        let (plan, repaired) = self.plan(inputs).await?;
        sink.save_plan(&plan)?;

        let document = self.answer(inputs, &plan).await?;
        sink.save_document(&document)?;

        self.enter(PipelineStage::Done);
        Ok(PipelineReport {
            plan,
            document,
            repaired,
        })
    }

    /// Planning stage: one call, local parse, and at most one repair call.
    async fn plan(&self, inputs: &InterviewInputs) -> Result<(PlanRecord, bool), AppError> {
        self.enter(PipelineStage::Planning);
        let raw = self
            .generate(PLANNER_SYSTEM, &inputs.planner_prompt())
            .await
            .map_err(|e| AppError::transport(PipelineStage::Planning, e))?;

        self.enter(PipelineStage::Parsing);
        match parse_plan(&raw) {
            Ok(plan) => Ok((plan, false)),
            Err(failure) => {
                info!(raw_len = failure.raw_text.len(), "Plan JSON parse failed: {failure}");
                self.enter(PipelineStage::Repairing);
                let plan = repair_plan(&self.generator, &self.settings, &raw).await?;
                Ok((plan, true))
            }
        }
    }

    /// Answering stage: one call with the inputs and the compact plan.
    async fn answer(
        &self,
        inputs: &InterviewInputs,
        plan: &PlanRecord,
    ) -> Result<FinalDocument, AppError> {
        self.enter(PipelineStage::Answering);
        let prompt = inputs.answer_prompt(&plan.to_compact_json()?);
        let text = self
            .generate(ANSWERER_SYSTEM, &prompt)
            .await
            .map_err(|e| AppError::transport(PipelineStage::Answering, e))?;
        Ok(FinalDocument(text))
    }

    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let request = GenerationRequest {
            model: &self.settings.model,
            system,
            user,
            sampling: self.settings.sampling,
        };
        self.generator.generate(&request).await
    }

    fn enter(&self, stage: PipelineStage) {
        info!(%stage, "Entering stage");
        if let Some(observer) = &self.observer {
            observer(stage);
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::errors::AppError;
    use crate::interview::artifacts::ArtifactSink;
    use crate::interview::models::{FinalDocument, PlanRecord};
    use crate::llm_client::{GenerationRequest, LlmError, SamplingParams, TextGenerator};

    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub model: String,
        pub system: String,
        pub user: String,
        pub sampling: SamplingParams,
    }

    /// Replays canned replies in order and records every request.
    /// Panics if asked for more replies than were scripted.
    pub struct ScriptedGenerator {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl ScriptedGenerator {
        pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn remaining(&self) -> usize {
            self.replies.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push(RecordedCall {
                model: request.model.to_string(),
                system: request.system.to_string(),
                user: request.user.to_string(),
                sampling: request.sampling,
            });
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected generation call: script exhausted")
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum SinkEvent {
        Plan(PlanRecord),
        Document(String),
    }

    /// Keeps artifacts in memory, in write order.
    #[derive(Default)]
    pub struct RecordingSink {
        pub events: Vec<SinkEvent>,
        pub fail_plan: bool,
    }

    impl ArtifactSink for RecordingSink {
        fn save_plan(&mut self, plan: &PlanRecord) -> Result<(), AppError> {
            if self.fail_plan {
                return Err(AppError::Persist {
                    path: "plan.json".into(),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
                });
            }
            self.events.push(SinkEvent::Plan(plan.clone()));
            Ok(())
        }

        fn save_document(&mut self, document: &FinalDocument) -> Result<(), AppError> {
            self.events
                .push(SinkEvent::Document(document.as_str().to_string()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::test_support::{RecordingSink, ScriptedGenerator, SinkEvent};
    use super::*;
    use crate::interview::artifacts::FileArtifacts;
    use crate::llm_client::prompts::JSON_REPAIR_SYSTEM;

    const PLAN_JSON: &str = r#"{"steps":["Study the JD","Map resume gaps","Draft questions"],"assumptions":["Manager is technical"],"success_criteria":["10 tailored questions"]}"#;
    const DOCUMENT: &str = "# Overview\n\n## Questions\n1. Tell me about a Rust service you owned.\n";

    fn inputs() -> InterviewInputs {
        InterviewInputs {
            role: "Backend Engineer".to_string(),
            interviewer_title: "Hiring Manager".to_string(),
            job_description: "Own payment APIs written in Rust.".to_string(),
            resume_text: "Built ledger services in Go and Rust.".to_string(),
        }
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            model: "gpt-test".to_string(),
            sampling: SamplingParams {
                temperature: 0.2,
                top_p: 0.9,
                max_output_tokens: 500,
            },
        }
    }

    fn pipeline(
        replies: Vec<Result<String, LlmError>>,
    ) -> (InterviewPipeline<ScriptedGenerator>, Arc<Mutex<Vec<PipelineStage>>>) {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&stages);
        let pipeline = InterviewPipeline::new(ScriptedGenerator::new(replies), settings())
            .with_observer(move |stage| seen.lock().unwrap().push(stage));
        (pipeline, stages)
    }

    fn expected_plan() -> PlanRecord {
        serde_json::from_str(PLAN_JSON).unwrap()
    }

    fn api_error() -> LlmError {
        LlmError::Api {
            status: 500,
            message: "provider down".to_string(),
        }
    }

    #[tokio::test]
    async fn test_plan_then_answer_writes_plan_before_document() {
        let (pipeline, stages) =
            pipeline(vec![Ok(PLAN_JSON.to_string()), Ok(DOCUMENT.to_string())]);
        let mut sink = RecordingSink::default();

        let report = pipeline.run(&inputs(), &mut sink).await.unwrap();

        assert!(!report.repaired);
        assert_eq!(report.plan, expected_plan());
        assert_eq!(report.document.as_str(), DOCUMENT);
        assert_eq!(
            sink.events,
            vec![
                SinkEvent::Plan(expected_plan()),
                SinkEvent::Document(DOCUMENT.to_string())
            ]
        );
        assert_eq!(
            *stages.lock().unwrap(),
            vec![
                PipelineStage::CollectingInputs,
                PipelineStage::Planning,
                PipelineStage::Parsing,
                PipelineStage::Answering,
                PipelineStage::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_requests_carry_prompts_model_and_sampling() {
        let (pipeline, _) = pipeline(vec![Ok(PLAN_JSON.to_string()), Ok(DOCUMENT.to_string())]);
        let mut sink = RecordingSink::default();

        pipeline.run(&inputs(), &mut sink).await.unwrap();

        let calls = pipeline.generator().calls();
        assert_eq!(calls.len(), 2);

        assert_eq!(calls[0].system, PLANNER_SYSTEM);
        assert_eq!(calls[0].user, inputs().planner_prompt());
        assert_eq!(calls[0].model, "gpt-test");
        assert_eq!(calls[0].sampling, settings().sampling);

        assert_eq!(calls[1].system, ANSWERER_SYSTEM);
        assert!(calls[1].user.contains("JOB TITLE: Backend Engineer"));
        assert!(calls[1]
            .user
            .ends_with(&format!("PLANNING JSON:\n{PLAN_JSON}\n")));
    }

    #[tokio::test]
    async fn test_fenced_plan_needs_no_repair_call() {
        let fenced = format!("```json\n{PLAN_JSON}\n```");
        let (pipeline, stages) = pipeline(vec![Ok(fenced), Ok(DOCUMENT.to_string())]);
        let mut sink = RecordingSink::default();

        let report = pipeline.run(&inputs(), &mut sink).await.unwrap();

        assert!(!report.repaired);
        assert_eq!(report.plan, expected_plan());
        let calls = pipeline.generator().calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.system != JSON_REPAIR_SYSTEM));
        assert!(!stages.lock().unwrap().contains(&PipelineStage::Repairing));
    }

    #[tokio::test]
    async fn test_unrepairable_plan_halts_without_artifacts() {
        let (pipeline, stages) = pipeline(vec![
            Ok("Here are some thoughts about the interview, no JSON.".to_string()),
            Ok("Sorry, I still cannot do that.".to_string()),
        ]);
        let mut sink = RecordingSink::default();

        let err = pipeline.run(&inputs(), &mut sink).await.unwrap_err();

        match err {
            AppError::Repair(failure) => {
                assert_eq!(
                    failure.broken_text,
                    "Here are some thoughts about the interview, no JSON."
                );
                assert_eq!(failure.repair_output, "Sorry, I still cannot do that.");
            }
            other => panic!("expected Repair error, got {other:?}"),
        }
        assert!(sink.events.is_empty());
        let calls = pipeline.generator().calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].system, JSON_REPAIR_SYSTEM);
        assert_eq!(stages.lock().unwrap().last(), Some(&PipelineStage::Failed));
        assert!(!stages.lock().unwrap().contains(&PipelineStage::Answering));
    }

    #[tokio::test]
    async fn test_unrepairable_plan_writes_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink =
            FileArtifacts::new(dir.path().join("plan.json"), dir.path().join("output.md"));
        let (pipeline, _) = pipeline(vec![Ok("prose".to_string()), Ok("more prose".to_string())]);

        assert!(pipeline.run(&inputs(), &mut sink).await.is_err());

        assert!(!dir.path().join("plan.json").exists());
        assert!(!dir.path().join("output.md").exists());
    }

    #[tokio::test]
    async fn test_successful_run_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink =
            FileArtifacts::new(dir.path().join("plan.json"), dir.path().join("output.md"));
        let (pipeline, _) = pipeline(vec![Ok(PLAN_JSON.to_string()), Ok(DOCUMENT.to_string())]);

        pipeline.run(&inputs(), &mut sink).await.unwrap();

        let plan: PlanRecord =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("plan.json")).unwrap())
                .unwrap();
        assert_eq!(plan, expected_plan());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("output.md")).unwrap(),
            DOCUMENT
        );
    }

    #[tokio::test]
    async fn test_repaired_plan_continues_to_answer() {
        let (pipeline, stages) = pipeline(vec![
            Ok("steps: study, map, draft".to_string()),
            Ok(PLAN_JSON.to_string()),
            Ok(DOCUMENT.to_string()),
        ]);
        let mut sink = RecordingSink::default();

        let report = pipeline.run(&inputs(), &mut sink).await.unwrap();

        assert!(report.repaired);
        assert_eq!(report.plan, expected_plan());
        assert_eq!(sink.events.len(), 2);
        assert_eq!(
            *stages.lock().unwrap(),
            vec![
                PipelineStage::CollectingInputs,
                PipelineStage::Planning,
                PipelineStage::Parsing,
                PipelineStage::Repairing,
                PipelineStage::Answering,
                PipelineStage::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_repair_is_attempted_at_most_once() {
        let (pipeline, stages) = pipeline(vec![
            Ok("no json".to_string()),
            Ok("{ still: broken }".to_string()),
            Ok(PLAN_JSON.to_string()),
        ]);
        let mut sink = RecordingSink::default();

        assert!(matches!(
            pipeline.run(&inputs(), &mut sink).await,
            Err(AppError::Repair(_))
        ));

        assert_eq!(pipeline.generator().calls().len(), 2);
        assert_eq!(pipeline.generator().remaining(), 1);
        let repairs = stages
            .lock()
            .unwrap()
            .iter()
            .filter(|s| **s == PipelineStage::Repairing)
            .count();
        assert_eq!(repairs, 1);
    }

    #[tokio::test]
    async fn test_missing_input_makes_no_calls() {
        let (pipeline, stages) = pipeline(vec![]);
        let mut sink = RecordingSink::default();
        let blank = InterviewInputs {
            job_description: "   \n ".to_string(),
            ..inputs()
        };

        let err = pipeline.run(&blank, &mut sink).await.unwrap_err();

        assert!(matches!(err, AppError::MissingInput(ref f) if f == &vec!["job description"]));
        assert!(pipeline.generator().calls().is_empty());
        assert!(sink.events.is_empty());
        assert_eq!(
            *stages.lock().unwrap(),
            vec![PipelineStage::CollectingInputs, PipelineStage::Failed]
        );
    }

    #[tokio::test]
    async fn test_planning_transport_error_is_fatal() {
        let (pipeline, stages) = pipeline(vec![Err(api_error())]);
        let mut sink = RecordingSink::default();

        let err = pipeline.run(&inputs(), &mut sink).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Transport {
                stage: PipelineStage::Planning,
                ..
            }
        ));
        assert_eq!(pipeline.generator().calls().len(), 1);
        assert!(sink.events.is_empty());
        assert_eq!(
            *stages.lock().unwrap(),
            vec![
                PipelineStage::CollectingInputs,
                PipelineStage::Planning,
                PipelineStage::Failed
            ]
        );
    }

    #[tokio::test]
    async fn test_answering_transport_error_keeps_saved_plan() {
        let (pipeline, _) = pipeline(vec![Ok(PLAN_JSON.to_string()), Err(api_error())]);
        let mut sink = RecordingSink::default();

        let err = pipeline.run(&inputs(), &mut sink).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Transport {
                stage: PipelineStage::Answering,
                ..
            }
        ));
        assert_eq!(sink.events, vec![SinkEvent::Plan(expected_plan())]);
    }

    #[tokio::test]
    async fn test_plan_write_failure_skips_answering() {
        let (pipeline, stages) = pipeline(vec![Ok(PLAN_JSON.to_string())]);
        let mut sink = RecordingSink {
            fail_plan: true,
            ..Default::default()
        };

        let err = pipeline.run(&inputs(), &mut sink).await.unwrap_err();

        assert!(matches!(err, AppError::Persist { .. }));
        assert_eq!(pipeline.generator().calls().len(), 1);
        assert!(!stages.lock().unwrap().contains(&PipelineStage::Answering));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn capture_warnings() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }

    #[tokio::test]
    async fn test_failed_runs_leave_diagnostics_to_the_caller() {
        let (logs, _guard) = capture_warnings();

        let (unrepairable, _) = pipeline(vec![
            Ok("no plan here".to_string()),
            Ok("Sorry, I still cannot do that.".to_string()),
        ]);
        let err = unrepairable
            .run(&inputs(), &mut RecordingSink::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Repair(_)));

        let (idle, _) = pipeline(vec![]);
        let blank = InterviewInputs {
            role: String::new(),
            ..inputs()
        };
        assert!(idle.run(&blank, &mut RecordingSink::default()).await.is_err());

        assert_eq!(logs.contents(), "");
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(PipelineStage::CollectingInputs.to_string(), "collecting inputs");
        assert_eq!(PipelineStage::Repairing.to_string(), "repairing");
    }
}
