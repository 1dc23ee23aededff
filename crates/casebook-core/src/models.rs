//! Case records: HURIDOCS ESF records (events, acts, persons, involvements,
//! information) plus the generic case collections.
//!
//! Records are flat values with a string `id` unique within their collection.
//! Nothing enforces references between collections; `event_id` and friends are
//! matched by value at the application level.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Collections persisted by the store. One sled tree per collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Documents,
    Entities,
    Timeline,
    Knowledge,
    Tags,
    GeneratedDocuments,
    Tasks,
    Insights,
    Activities,
    EsfEvents,
    EsfActs,
    EsfPersons,
    EsfInvolvements,
    EsfInformation,
}

impl Collection {
    /// Internal sled tree name.
    pub fn tree_name(&self) -> &'static str {
        match self {
            Collection::Documents => "documents",
            Collection::Entities => "entities",
            Collection::Timeline => "timeline",
            Collection::Knowledge => "knowledge",
            Collection::Tags => "tags",
            Collection::GeneratedDocuments => "generated_documents",
            Collection::Tasks => "tasks",
            Collection::Insights => "insights",
            Collection::Activities => "agent_activities",
            Collection::EsfEvents => "esf_events",
            Collection::EsfActs => "esf_acts",
            Collection::EsfPersons => "esf_persons",
            Collection::EsfInvolvements => "esf_involvements",
            Collection::EsfInformation => "esf_information",
        }
    }

    #[cfg(test)]
    fn all() -> [Self; 14] {
        [
            Collection::Documents,
            Collection::Entities,
            Collection::Timeline,
            Collection::Knowledge,
            Collection::Tags,
            Collection::GeneratedDocuments,
            Collection::Tasks,
            Collection::Insights,
            Collection::Activities,
            Collection::EsfEvents,
            Collection::EsfActs,
            Collection::EsfPersons,
            Collection::EsfInvolvements,
            Collection::EsfInformation,
        ]
    }
}

/// A record stored in one of the case collections.
pub trait CaseRecord: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);
}

macro_rules! case_record {
    ($ty:ty, $collection:expr) => {
        impl CaseRecord for $ty {
            const COLLECTION: Collection = $collection;

            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }
        }
    };
}

/// Fresh record id (UUID v4).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// ESF records
// ---------------------------------------------------------------------------

/// ESF Event: a violation event with an optional placeholder `phantom_index`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// `YYYY-MM-DD` (or any string whose first seven chars are `YYYY-MM`).
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub geographical_term: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub violation_status: Option<String>,
    /// Never computed here; read only when a client supplies it.
    #[serde(default)]
    pub phantom_index: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub group_affiliation: Option<String>,
}

/// ESF Act-Link: what was done to a victim within an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Act {
    pub id: String,
    pub event_id: String,
    #[serde(default)]
    pub victim_id: Option<String>,
    /// Right violated / type of act (e.g. "arbitrary detention").
    pub act_type: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// ESF Involvement-Link: a perpetrator's part in an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Involvement {
    pub id: String,
    pub event_id: String,
    pub perpetrator_id: String,
    #[serde(default)]
    pub involvement_type: Option<String>,
    #[serde(default)]
    pub degree: Option<String>,
}

/// ESF Information link: a source record backing an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Information {
    pub id: String,
    pub event_id: String,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub reliability: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

case_record!(Event, Collection::EsfEvents);
case_record!(Person, Collection::EsfPersons);
case_record!(Act, Collection::EsfActs);
case_record!(Involvement, Collection::EsfInvolvements);
case_record!(Information, Collection::EsfInformation);

// ---------------------------------------------------------------------------
// Generic case records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub name: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "Utc::now")]
    pub uploaded_at: DateTime<Utc>,
}

fn default_mime_type() -> String {
    "text/plain".to_string()
}

/// Known entity kinds; anything else is kept as free text.
pub mod entity_kind {
    pub const PERSON: &str = "person";
    pub const ORGANIZATION: &str = "organization";
    pub const LOCATION: &str = "location";
    pub const OTHER: &str = "other";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(default = "default_entity_kind")]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_entity_kind() -> String {
    entity_kind::OTHER.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: String,
    /// ISO date (`YYYY-MM-DD`); free text is kept but skipped by date math.
    pub date: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source_document_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedDocument {
    pub id: String,
    pub title: String,
    pub kind: String,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default = "default_task_status")]
    pub status: String,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
}

fn default_task_status() -> String {
    "open".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub id: String,
    pub title: String,
    pub body: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub agent: Option<String>,
}

/// Outcome of an agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Completed,
    Failed,
}

/// One entry of the agent activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentActivity {
    pub id: String,
    pub agent: String,
    pub action: String,
    pub status: ActivityStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl AgentActivity {
    pub fn new(agent: &str, action: &str, status: ActivityStatus, detail: Option<String>) -> Self {
        Self {
            id: new_id(),
            agent: agent.to_string(),
            action: action.to_string(),
            status,
            timestamp: Utc::now(),
            detail,
        }
    }
}

case_record!(Document, Collection::Documents);
case_record!(Entity, Collection::Entities);
case_record!(KnowledgeItem, Collection::Knowledge);
case_record!(TimelineEvent, Collection::Timeline);
case_record!(Tag, Collection::Tags);
case_record!(GeneratedDocument, Collection::GeneratedDocuments);
case_record!(Task, Collection::Tasks);
case_record!(Insight, Collection::Insights);
case_record!(AgentActivity, Collection::Activities);

// ---------------------------------------------------------------------------
// Singletons
// ---------------------------------------------------------------------------

/// A singleton resource stored under a fixed key.
pub trait Singleton: Serialize + DeserializeOwned + Default {
    const KEY: &'static str;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseContext {
    #[serde(default)]
    pub description: String,
}

/// The two boolean risk flags driving the dashboard threat level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFlags {
    #[serde(default)]
    pub immediate_danger: bool,
    #[serde(default)]
    pub under_surveillance: bool,
}

impl RiskFlags {
    pub fn any(&self) -> bool {
        self.immediate_danger || self.under_surveillance
    }
}

/// User settings; sampling parameters feed every AI call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_temperature() -> f32 {
    0.4
}

fn default_top_p() -> f32 {
    0.95
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            model: None,
            language: default_language(),
        }
    }
}

impl Singleton for CaseContext {
    const KEY: &'static str = "case_context";
}

impl Singleton for RiskFlags {
    const KEY: &'static str = "risk_flags";
}

impl Singleton for Settings {
    const KEY: &'static str = "settings";
}
