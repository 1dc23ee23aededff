//! Risk assessment for victims, witnesses and defenders in the case.

use super::{compose_prompt, AgentRun, ServiceContext};
use crate::agents::CAP_RISK_ASSESSMENT;
use crate::error::CaseResult;
use crate::models::RiskFlags;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Threat {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub likelihood: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    /// low | medium | high | critical, or `unknown` when the model gave nothing usable.
    #[serde(default = "unknown_level")]
    pub overall_level: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub threats: Vec<Threat>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

fn unknown_level() -> String {
    "unknown".to_string()
}

impl Default for RiskAssessment {
    fn default() -> Self {
        Self {
            overall_level: unknown_level(),
            summary: String::new(),
            threats: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

fn schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "overallLevel": { "type": "STRING", "enum": ["low", "medium", "high", "critical"] },
            "summary": { "type": "STRING" },
            "threats": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "description": { "type": "STRING" },
                        "likelihood": { "type": "STRING" },
                        "impact": { "type": "STRING" },
                        "target": { "type": "STRING" }
                    },
                    "required": ["description"]
                }
            },
            "recommendations": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["overallLevel", "summary"]
    })
}

pub async fn assess_risk(ctx: &ServiceContext<'_>, flags: RiskFlags) -> CaseResult<AgentRun<RiskAssessment>> {
    let mut task = String::from(
        "Assess the protection and security risks in this case. Identify concrete threats \
         to the people involved, rate likelihood and impact (low/medium/high), give an overall \
         level and list protective recommendations.",
    );
    if flags.immediate_danger {
        task.push_str("\nThe case team reports that someone is in immediate danger.");
    }
    if flags.under_surveillance {
        task.push_str("\nThe case team reports that people involved are under surveillance.");
    }
    let mut run = ctx
        .run_structured::<RiskAssessment>(CAP_RISK_ASSESSMENT, compose_prompt(ctx.case_context, &task), schema())
        .await?;
    let level = run.output.overall_level.trim().to_lowercase();
    run.output.overall_level = if level.is_empty() { unknown_level() } else { level };
    run.output.threats.retain(|t| !t.description.trim().is_empty());
    Ok(run)
}
