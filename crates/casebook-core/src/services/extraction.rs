//! Document summarization and entity/event extraction.

use super::{compose_prompt, AgentRun, ServiceContext};
use crate::agents::{CAP_EXTRACTION, CAP_SUMMARIZE};
use crate::ai::{Contents, Part};
use crate::error::CaseResult;
use crate::models::{entity_kind, new_id, Document, Entity, TimelineEvent};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Records extracted from one document, with fresh ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub entities: Vec<Entity>,
    pub timeline: Vec<TimelineEvent>,
}

#[derive(Debug, Default, Deserialize)]
struct RawExtraction {
    #[serde(default)]
    entities: Vec<RawEntity>,
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    #[serde(default)]
    name: String,
    #[serde(default)]
    kind: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    date: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

fn schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "entities": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "kind": { "type": "STRING", "enum": ["person", "organization", "location", "other"] },
                        "description": { "type": "STRING" }
                    },
                    "required": ["name", "kind"]
                }
            },
            "events": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "date": { "type": "STRING" },
                        "title": { "type": "STRING" },
                        "description": { "type": "STRING" }
                    },
                    "required": ["date", "title"]
                }
            }
        }
    })
}

fn is_textual(mime_type: &str) -> bool {
    let m = mime_type.trim().to_lowercase();
    m.is_empty() || m.starts_with("text/") || m == "application/json" || m.ends_with("+json") || m == "application/xml"
}

/// Prompt contents for a document: inline text, or the base64 payload as an
/// inline-data part for binary formats.
fn document_contents(case_context: &str, doc: &Document, task: &str) -> Contents {
    if is_textual(&doc.mime_type) {
        let task = format!("{task}\n\nDOCUMENT \"{}\":\n{}", doc.name, doc.content);
        Contents::Text(compose_prompt(case_context, &task))
    } else {
        Contents::Parts(vec![
            Part::Text(compose_prompt(case_context, &format!("{task}\n\nThe attached file is \"{}\".", doc.name))),
            Part::InlineData {
                mime_type: doc.mime_type.clone(),
                data: doc.content.clone(),
            },
        ])
    }
}

fn normalize_kind(kind: &str) -> String {
    let k = kind.trim().to_lowercase();
    match k.as_str() {
        entity_kind::PERSON | entity_kind::ORGANIZATION | entity_kind::LOCATION => k,
        _ => entity_kind::OTHER.to_string(),
    }
}

pub async fn summarize_document(ctx: &ServiceContext<'_>, doc: &Document) -> CaseResult<AgentRun<String>> {
    let task = "Summarize the document below for the case file: who, what, where, when, \
                and which rights are engaged. Keep it under 300 words.";
    ctx.run_text(CAP_SUMMARIZE, document_contents(ctx.case_context, doc, task))
        .await
}

pub async fn extract_from_document(
    ctx: &ServiceContext<'_>,
    doc: &Document,
) -> CaseResult<AgentRun<ExtractionResult>> {
    let task = "Extract every person, organization and location mentioned in the document, \
                and every dated event (use YYYY-MM-DD dates where the document allows).";
    let run = ctx
        .run_structured::<RawExtraction>(CAP_EXTRACTION, document_contents(ctx.case_context, doc, task), schema())
        .await?;

    let entities = run
        .output
        .entities
        .into_iter()
        .filter(|e| !e.name.trim().is_empty())
        .map(|e| Entity {
            id: new_id(),
            name: e.name.trim().to_string(),
            kind: normalize_kind(&e.kind),
            description: e.description.filter(|d| !d.trim().is_empty()),
            tags: Vec::new(),
        })
        .collect();
    let timeline = run
        .output
        .events
        .into_iter()
        .filter(|e| !e.title.trim().is_empty())
        .map(|e| TimelineEvent {
            id: new_id(),
            date: e.date.trim().to_string(),
            title: e.title.trim().to_string(),
            description: e.description,
            source_document_id: Some(doc.id.clone()),
            tags: Vec::new(),
        })
        .collect();

    Ok(AgentRun {
        agent: run.agent,
        output: ExtractionResult { entities, timeline },
        parse_note: run.parse_note,
    })
}
