//! Dashboard metrics over the ESF collections. Recomputed in full on each call.

use crate::models::{Act, Event, Information, Person, RiskFlags};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Severity points per event in a month bucket.
pub const SEVERITY_PER_EVENT: usize = 10;
/// Phantom index above which an event counts as critical.
pub const PHANTOM_INDEX_CRITICAL: f64 = 70.0;
/// More critical events than this makes the threat level Critical.
pub const CRITICAL_EVENT_THRESHOLD: usize = 2;
const TOP_N: usize = 5;
const CRITICAL_MARKERS: [&str; 2] = ["critical", "urgent"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ThreatLevel {
    Low,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyViolations {
    /// `YYYY-MM`
    pub month: String,
    pub count: usize,
    pub severity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedTerm {
    pub term: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub threat_level: ThreatLevel,
    pub total_events: usize,
    pub total_acts: usize,
    pub total_persons: usize,
    pub critical_events: usize,
    pub violations_over_time: Vec<MonthlyViolations>,
    pub geo_hotspots: Vec<RankedTerm>,
    pub top_violated_rights: Vec<RankedTerm>,
    /// Percentage (0–100) of acts backed by at least one information record.
    pub evidence_completeness: f64,
}

/// Borrowed collections the aggregator reads.
#[derive(Debug, Default, Clone, Copy)]
pub struct DashboardInput<'a> {
    pub events: &'a [Event],
    pub acts: &'a [Act],
    pub persons: &'a [Person],
    pub information: &'a [Information],
    pub flags: RiskFlags,
}

pub fn compute_metrics(input: &DashboardInput<'_>) -> DashboardMetrics {
    let critical_events = input.events.iter().filter(|e| is_critical(e)).count();
    DashboardMetrics {
        threat_level: threat_level(input.flags, critical_events),
        total_events: input.events.len(),
        total_acts: input.acts.len(),
        total_persons: input.persons.len(),
        critical_events,
        violations_over_time: violations_over_time(input.events),
        geo_hotspots: top_terms(
            input
                .events
                .iter()
                .filter_map(|e| e.geographical_term.as_deref()),
        ),
        top_violated_rights: top_terms(input.acts.iter().map(|a| a.act_type.as_str())),
        evidence_completeness: evidence_completeness(input.acts, input.information),
    }
}

/// Low; High when a risk flag is set; Critical when more than two events are critical.
pub fn threat_level(flags: RiskFlags, critical_events: usize) -> ThreatLevel {
    let mut level = ThreatLevel::Low;
    if flags.any() {
        level = ThreatLevel::High;
    }
    if critical_events > CRITICAL_EVENT_THRESHOLD {
        level = ThreatLevel::Critical;
    }
    level
}

fn is_critical(event: &Event) -> bool {
    let flagged = [
        Some(event.title.as_str()),
        Some(event.description.as_str()),
        event.status.as_deref(),
        event.violation_status.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| {
        let lower = field.to_lowercase();
        CRITICAL_MARKERS.iter().any(|m| lower.contains(m))
    });
    flagged || event.phantom_index.is_some_and(|p| p > PHANTOM_INDEX_CRITICAL)
}

/// Events grouped by `YYYY-MM` of their start date, oldest month first.
pub fn violations_over_time(events: &[Event]) -> Vec<MonthlyViolations> {
    let mut buckets: BTreeMap<&str, usize> = BTreeMap::new();
    for event in events {
        if let Some(month) = year_month(&event.start_date) {
            *buckets.entry(month).or_insert(0) += 1;
        }
    }
    buckets
        .into_iter()
        .map(|(month, count)| MonthlyViolations {
            month: month.to_string(),
            count,
            severity: count * SEVERITY_PER_EVENT,
        })
        .collect()
}

fn year_month(date: &str) -> Option<&str> {
    let ym = date.trim().get(..7)?;
    let bytes = ym.as_bytes();
    let well_formed = bytes[4] == b'-'
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[5..].iter().all(u8::is_ascii_digit);
    well_formed.then_some(ym)
}

/// Top five terms by count, descending; ties broken alphabetically. Blank terms are ignored.
pub fn top_terms<'a>(terms: impl Iterator<Item = &'a str>) -> Vec<RankedTerm> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for term in terms.map(str::trim).filter(|t| !t.is_empty()) {
        *counts.entry(term).or_insert(0) += 1;
    }
    let mut ranked: Vec<RankedTerm> = counts
        .into_iter()
        .map(|(term, count)| RankedTerm {
            term: term.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
    ranked.truncate(TOP_N);
    ranked
}

fn evidence_completeness(acts: &[Act], information: &[Information]) -> f64 {
    if acts.is_empty() {
        return 0.0;
    }
    let backed: HashSet<&str> = information.iter().map(|i| i.event_id.as_str()).collect();
    let documented = acts
        .iter()
        .filter(|a| backed.contains(a.event_id.as_str()))
        .count();
    let pct = documented as f64 / acts.len() as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}
