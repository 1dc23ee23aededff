//! Drafting of communications to UN human rights mechanisms.

use super::{compose_prompt, AgentRun, ServiceContext};
use crate::agents::CAP_UN_SUBMISSION;
use crate::error::CaseResult;
use crate::models::{new_id, GeneratedDocument};
use chrono::Utc;
use serde::{Deserialize, Serialize};

pub const UN_SUBMISSION_KIND: &str = "un_submission";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnMechanism {
    #[default]
    SpecialProcedures,
    ArbitraryDetention,
    UniversalPeriodicReview,
    TreatyBody,
}

impl UnMechanism {
    pub fn label(&self) -> &'static str {
        match self {
            UnMechanism::SpecialProcedures => "UN Special Procedures",
            UnMechanism::ArbitraryDetention => "UN Working Group on Arbitrary Detention",
            UnMechanism::UniversalPeriodicReview => "Universal Periodic Review",
            UnMechanism::TreatyBody => "UN Treaty Body",
        }
    }

    fn format_guidance(&self) -> &'static str {
        match self {
            UnMechanism::SpecialProcedures => {
                "Use the special procedures communication format: identity of the alleged victims, \
                 alleged perpetrators, date, place and detailed description of the incident, \
                 steps taken at national level, and the specific request for intervention."
            }
            UnMechanism::ArbitraryDetention => {
                "Follow the model questionnaire of the Working Group: identity of the person, \
                 arrest, detention, legal basis invoked, and why the deprivation of liberty \
                 falls under categories I to V."
            }
            UnMechanism::UniversalPeriodicReview => {
                "Write a stakeholder submission: short executive summary, numbered paragraphs, \
                 issues grouped by theme and concrete recommendations addressed to the State."
            }
            UnMechanism::TreatyBody => {
                "Write an individual communication: facts, exhaustion of domestic remedies, \
                 articles of the treaty violated and the remedies sought."
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnSubmissionRequest {
    #[serde(default)]
    pub mechanism: UnMechanism,
    /// Mandate holder or committee the submission is addressed to.
    #[serde(default)]
    pub addressee: Option<String>,
    /// Extra drafting instructions from the case team.
    #[serde(default)]
    pub instructions: Option<String>,
}

pub async fn draft_un_submission(
    ctx: &ServiceContext<'_>,
    request: &UnSubmissionRequest,
) -> CaseResult<AgentRun<GeneratedDocument>> {
    let mechanism = request.mechanism;
    let mut task = format!(
        "Draft a submission to the {}. {}",
        mechanism.label(),
        mechanism.format_guidance()
    );
    if let Some(addressee) = request.addressee.as_deref().filter(|a| !a.trim().is_empty()) {
        task.push_str(&format!("\nAddress it to: {}.", addressee.trim()));
    }
    if let Some(extra) = request.instructions.as_deref().filter(|i| !i.trim().is_empty()) {
        task.push_str(&format!("\nAdditional instructions: {}", extra.trim()));
    }
    task.push_str("\nUse only facts present in the case context.");

    let run = ctx
        .run_text(CAP_UN_SUBMISSION, compose_prompt(ctx.case_context, &task))
        .await?;
    let document = GeneratedDocument {
        id: new_id(),
        title: format!("Submission to {}", mechanism.label()),
        kind: UN_SUBMISSION_KIND.to_string(),
        content: run.output,
        created_at: Utc::now(),
    };
    Ok(AgentRun {
        agent: run.agent,
        output: document,
        parse_note: None,
    })
}
