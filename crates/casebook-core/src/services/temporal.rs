//! Temporal analysis: deterministic gap detection over the dated timeline,
//! plus model-identified patterns and escalation points.

use super::{compose_prompt, AgentRun, ServiceContext};
use crate::agents::CAP_TEMPORAL_ANALYSIS;
use crate::error::CaseResult;
use crate::models::TimelineEvent;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineGap {
    pub from: String,
    pub to: String,
    pub days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationPoint {
    pub date: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalAnalysis {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub escalation_points: Vec<EscalationPoint>,
    /// Computed locally, never taken from the model.
    #[serde(default)]
    pub gaps: Vec<TimelineGap>,
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d").ok()
}

/// Gaps between consecutive dated events longer than `threshold_days`.
/// Undated or unparseable entries are ignored.
pub fn find_gaps(timeline: &[TimelineEvent], threshold_days: i64) -> Vec<TimelineGap> {
    let mut dates: Vec<NaiveDate> = timeline.iter().filter_map(|e| parse_date(&e.date)).collect();
    dates.sort();
    dates.dedup();
    dates
        .windows(2)
        .filter_map(|w| {
            let days = (w[1] - w[0]).num_days();
            (days > threshold_days).then(|| TimelineGap {
                from: w[0].format("%Y-%m-%d").to_string(),
                to: w[1].format("%Y-%m-%d").to_string(),
                days,
            })
        })
        .collect()
}

fn schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": { "type": "STRING" },
            "patterns": { "type": "ARRAY", "items": { "type": "STRING" } },
            "escalationPoints": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "date": { "type": "STRING" },
                        "description": { "type": "STRING" }
                    },
                    "required": ["date", "description"]
                }
            }
        },
        "required": ["summary"]
    })
}

pub async fn analyze_timeline(
    ctx: &ServiceContext<'_>,
    timeline: &[TimelineEvent],
    gap_threshold_days: i64,
) -> CaseResult<AgentRun<TemporalAnalysis>> {
    let gaps = find_gaps(timeline, gap_threshold_days);
    let mut task = String::from(
        "Analyze the chronology of this case. Summarize how events unfold, list recurring \
         patterns and identify escalation points with their dates.",
    );
    if !gaps.is_empty() {
        task.push_str(&format!(
            "\nThe record has gaps longer than {gap_threshold_days} days; comment on whether they may hide undocumented events:"
        ));
        for gap in &gaps {
            task.push_str(&format!("\n- {} to {} ({} days)", gap.from, gap.to, gap.days));
        }
    }

    let mut run = ctx
        .run_structured::<TemporalAnalysis>(
            CAP_TEMPORAL_ANALYSIS,
            compose_prompt(ctx.case_context, &task),
            schema(),
        )
        .await?;
    run.output.gaps = gaps;
    Ok(run)
}
