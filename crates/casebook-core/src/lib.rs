//! Casebook core library.
//! Case records, sled persistence, the throttled AI gateway, agent routing,
//! dashboard metrics and the AI-assisted case services.

pub mod agents;
pub mod ai;
pub mod config;
pub mod context;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use agents::{select_agent, AgentProfile, AGENT_PROFILES};
pub use ai::{AiCall, AiGateway, StructuredReply, ThrottlePolicy, ThrottledQueue};
pub use config::CaseConfig;
pub use context::{build_case_context, CaseSnapshot, DEFAULT_CONTEXT_CHAR_LIMIT};
pub use dashboard::{compute_metrics, DashboardInput, DashboardMetrics, ThreatLevel};
pub use error::{CaseError, CaseResult, GatewayError};
pub use store::CaseStore;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
