//! AI-assisted endpoints. Each run is grounded in the stored case context and
//! leaves an entry in the agent activity log, whether it succeeds or not.

use super::ApiResult;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use casebook_core::agents::{CAP_EXTRACTION, CAP_RISK_ASSESSMENT, CAP_SUMMARIZE, CAP_TEMPORAL_ANALYSIS, CAP_UN_SUBMISSION};
use casebook_core::ai::SamplingSettings;
use casebook_core::models::{
    CaseContext, Document, Entity, GeneratedDocument, KnowledgeItem, RiskFlags, Settings, TimelineEvent,
};
use casebook_core::services::{
    self, failed_activity, AgentRun, ExtractionResult, RiskAssessment, ServiceContext, TemporalAnalysis,
    UnSubmissionRequest,
};
use casebook_core::{build_case_context, AgentProfile, CaseError, CaseResult, CaseSnapshot, AGENT_PROFILES};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Response envelope for every AI endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AgentReply<T> {
    pub agent: &'static str,
    pub result: T,
    /// Present when the model reply was unusable and a fallback was returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_note: Option<String>,
}

impl<T> From<AgentRun<T>> for AgentReply<T> {
    fn from(run: AgentRun<T>) -> Self {
        Self {
            agent: run.agent.name,
            result: run.output,
            parse_note: run.parse_note,
        }
    }
}

/// Everything a service run needs from the store, loaded once per request.
struct CaseInputs {
    context: String,
    settings: Settings,
    timeline: Vec<TimelineEvent>,
}

impl CaseInputs {
    fn load(state: &AppState) -> CaseResult<Self> {
        let case: CaseContext = state.store.get_singleton()?;
        let knowledge: Vec<KnowledgeItem> = state.store.list()?;
        let timeline: Vec<TimelineEvent> = state.store.list()?;
        let entities: Vec<Entity> = state.store.list()?;
        let context = build_case_context(
            &CaseSnapshot {
                description: Some(case.description.as_str()),
                knowledge: &knowledge,
                timeline: &timeline,
                entities: &entities,
            },
            state.config.context_char_limit,
        );
        Ok(Self {
            context,
            settings: state.store.get_singleton()?,
            timeline,
        })
    }

    fn service_context<'a>(&'a self, state: &'a AppState, cancel: &'a CancellationToken) -> ServiceContext<'a> {
        ServiceContext {
            gateway: &state.ai,
            case_context: &self.context,
            settings: SamplingSettings::from(&self.settings),
            model: self.settings.model.as_deref().filter(|m| !m.trim().is_empty()),
            cancel: Some(cancel),
            language: Some(self.settings.language.as_str()),
        }
    }
}

/// Log the run in the activity collection and pass the outcome through.
fn record_activity<T>(
    state: &AppState,
    capability: &str,
    action: &str,
    outcome: CaseResult<AgentRun<T>>,
) -> CaseResult<AgentRun<T>> {
    let activity = match &outcome {
        Ok(run) => run.activity(action),
        Err(e) => failed_activity(capability, action, e),
    };
    if let Err(e) = state.store.insert(&activity) {
        tracing::warn!(error = %e, action, "could not record agent activity");
    }
    outcome
}

fn load_document(state: &AppState, id: &str) -> CaseResult<Document> {
    state
        .store
        .get::<Document>(id)?
        .ok_or_else(|| CaseError::not_found("documents", id))
}

pub(crate) async fn list_agents() -> Json<&'static [AgentProfile]> {
    Json(AGENT_PROFILES)
}

pub(crate) async fn risk_assessment(State(state): State<AppState>) -> ApiResult<Json<AgentReply<RiskAssessment>>> {
    let inputs = CaseInputs::load(&state)?;
    let flags: RiskFlags = state.store.get_singleton()?;
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let outcome = services::assess_risk(&inputs.service_context(&state, &cancel), flags).await;
    let run = record_activity(&state, CAP_RISK_ASSESSMENT, "risk_assessment", outcome)?;
    Ok(Json(run.into()))
}

/// Drafts the submission and stores it as a generated document.
pub(crate) async fn un_submission(
    State(state): State<AppState>,
    Json(request): Json<UnSubmissionRequest>,
) -> ApiResult<Json<AgentReply<GeneratedDocument>>> {
    let inputs = CaseInputs::load(&state)?;
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let outcome = services::draft_un_submission(&inputs.service_context(&state, &cancel), &request).await;
    let run = record_activity(&state, CAP_UN_SUBMISSION, "un_submission", outcome)?;
    state.store.insert(&run.output)?;
    tracing::info!(id = %run.output.id, mechanism = ?request.mechanism, "UN submission drafted");
    Ok(Json(run.into()))
}

pub(crate) async fn temporal_analysis(
    State(state): State<AppState>,
) -> ApiResult<Json<AgentReply<TemporalAnalysis>>> {
    let inputs = CaseInputs::load(&state)?;
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let outcome = services::analyze_timeline(
        &inputs.service_context(&state, &cancel),
        &inputs.timeline,
        state.config.timeline_gap_days,
    )
    .await;
    let run = record_activity(&state, CAP_TEMPORAL_ANALYSIS, "temporal_analysis", outcome)?;
    Ok(Json(run.into()))
}

/// Summarizes a stored document and saves the summary on it.
pub(crate) async fn summarize_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AgentReply<Document>>> {
    let mut document = load_document(&state, &id)?;
    let inputs = CaseInputs::load(&state)?;
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let outcome = services::summarize_document(&inputs.service_context(&state, &cancel), &document).await;
    let run = record_activity(&state, CAP_SUMMARIZE, "summarize_document", outcome)?;
    document.summary = Some(run.output.trim().to_string());
    let document = state.store.update(&id, document)?;
    Ok(Json(AgentReply {
        agent: run.agent.name,
        result: document,
        parse_note: None,
    }))
}

/// Extracts entities and dated events from a document and merges them into
/// the case collections.
pub(crate) async fn extract_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AgentReply<ExtractionResult>>> {
    let document = load_document(&state, &id)?;
    let inputs = CaseInputs::load(&state)?;
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let outcome = services::extract_from_document(&inputs.service_context(&state, &cancel), &document).await;
    let run = record_activity(&state, CAP_EXTRACTION, "extract_document", outcome)?;
    let entities = state.store.upsert_batch(&run.output.entities)?;
    let events = state.store.upsert_batch(&run.output.timeline)?;
    tracing::info!(document = %id, entities, events, "extraction merged");
    Ok(Json(run.into()))
}
