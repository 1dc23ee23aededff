//! Domain services: each selects its agent, grounds the prompt in the case
//! context, calls the AI gateway and shapes the reply into typed records.

pub mod extraction;
pub mod risk;
pub mod temporal;
pub mod un_submission;

use crate::agents::{select_agent, AgentProfile};
use crate::ai::{AiCall, AiGateway, Contents, SamplingSettings, StructuredReply};
use crate::error::CaseResult;
use crate::models::{ActivityStatus, AgentActivity};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

pub use extraction::{extract_from_document, summarize_document, ExtractionResult};
pub use risk::{assess_risk, RiskAssessment, Threat};
pub use temporal::{analyze_timeline, find_gaps, EscalationPoint, TemporalAnalysis, TimelineGap};
pub use un_submission::{draft_un_submission, UnMechanism, UnSubmissionRequest};

/// Shared inputs for a service run.
#[derive(Clone, Copy)]
pub struct ServiceContext<'a> {
    pub gateway: &'a AiGateway,
    /// Output of `build_case_context`.
    pub case_context: &'a str,
    pub settings: SamplingSettings,
    pub model: Option<&'a str>,
    /// Cancels calls still waiting in the gateway queue.
    pub cancel: Option<&'a CancellationToken>,
    /// Output language for generated text (`Settings.language`).
    pub language: Option<&'a str>,
}

/// Result of a service run plus who produced it.
#[derive(Debug, Clone)]
pub struct AgentRun<T> {
    pub agent: &'static AgentProfile,
    pub output: T,
    /// Set when a structured reply was unusable and a fallback was returned.
    pub parse_note: Option<String>,
}

impl<T> AgentRun<T> {
    pub fn activity(&self, action: &str) -> AgentActivity {
        AgentActivity::new(self.agent.name, action, ActivityStatus::Completed, self.parse_note.clone())
    }
}

/// Activity entry for a run that failed before producing output.
pub fn failed_activity(capability: &str, action: &str, error: &dyn std::fmt::Display) -> AgentActivity {
    let agent = select_agent(capability).map(|a| a.name).unwrap_or("unassigned");
    AgentActivity::new(agent, action, ActivityStatus::Failed, Some(error.to_string()))
}

/// Agent system prompt, plus the requested output language when one is set.
fn system_instruction(agent: &AgentProfile, language: Option<&str>) -> String {
    match language.map(str::trim).filter(|l| !l.is_empty()) {
        Some(lang) => format!(
            "{}\nWrite all prose in the language with code '{lang}'. Keep JSON keys and enum values in English.",
            agent.system_prompt
        ),
        None => agent.system_prompt.to_string(),
    }
}

pub(crate) fn compose_prompt(case_context: &str, task: &str) -> String {
    let context = if case_context.trim().is_empty() {
        "No case context available."
    } else {
        case_context
    };
    format!("CASE CONTEXT:\n{context}\n\nTASK:\n{task}")
}

impl<'a> ServiceContext<'a> {
    fn base_call(&self, agent: &AgentProfile, contents: impl Into<Contents>) -> AiCall {
        let call = AiCall::new(contents)
            .with_system(&system_instruction(agent, self.language))
            .with_settings(self.settings)
            .with_model(self.model.map(str::to_string));
        match self.cancel {
            Some(token) => call.with_cancellation(token.clone()),
            None => call,
        }
    }

    /// Run a free-text task for the agent serving `capability`.
    pub(crate) async fn run_text(
        &self,
        capability: &str,
        contents: impl Into<Contents>,
    ) -> CaseResult<AgentRun<String>> {
        let agent = select_agent(capability)?;
        tracing::info!(agent = agent.name, capability, "running text task");
        let text = self
            .gateway
            .generate_text(self.base_call(agent, contents))
            .await?;
        Ok(AgentRun {
            agent,
            output: text,
            parse_note: None,
        })
    }

    /// Run a schema-constrained task and decode the reply into `T`. Unusable
    /// replies fall back to `T::default()` with a note.
    pub(crate) async fn run_structured<T: DeserializeOwned + Default>(
        &self,
        capability: &str,
        contents: impl Into<Contents>,
        schema: Value,
    ) -> CaseResult<AgentRun<T>> {
        let agent = select_agent(capability)?;
        tracing::info!(agent = agent.name, capability, "running structured task");
        let reply = self
            .gateway
            .generate_structured(self.base_call(agent, contents).with_schema(schema))
            .await?;
        let (output, parse_note) = decode_or_default(reply);
        if let Some(note) = &parse_note {
            tracing::warn!(agent = agent.name, capability, %note, "using fallback output");
        }
        Ok(AgentRun {
            agent,
            output,
            parse_note,
        })
    }
}

fn decode_or_default<T: DeserializeOwned + Default>(reply: StructuredReply) -> (T, Option<String>) {
    match reply.decode::<T>() {
        Ok(Some(v)) => (v, None),
        Ok(None) => (T::default(), Some("model returned no data".to_string())),
        Err(e) => (T::default(), Some(format!("unusable model reply: {e}"))),
    }
}
