// Interview preparation: two-stage plan → answer chain.
// All LLM calls go through llm_client::TextGenerator — no direct HTTP calls here.

pub mod artifacts;
pub mod models;
pub mod pipeline;
pub mod plan_parser;
pub mod prompts;
pub mod repair;
