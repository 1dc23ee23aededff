//! Case context builder: flattens case state into one bounded text block that
//! grounds every AI prompt.

use crate::models::{Entity, KnowledgeItem, TimelineEvent};

/// Default upper bound on the context block, in characters.
pub const DEFAULT_CONTEXT_CHAR_LIMIT: usize = 30_000;

/// Borrowed view of the case state fed into the context builder.
#[derive(Debug, Default, Clone, Copy)]
pub struct CaseSnapshot<'a> {
    pub description: Option<&'a str>,
    pub knowledge: &'a [KnowledgeItem],
    pub timeline: &'a [TimelineEvent],
    pub entities: &'a [Entity],
}

/// Concatenate description, knowledge, timeline and entities into a block of at
/// most `char_limit` characters. Empty inputs omit their section.
pub fn build_case_context(snapshot: &CaseSnapshot<'_>, char_limit: usize) -> String {
    let mut sections: Vec<String> = Vec::new();

    if let Some(desc) = snapshot.description.map(str::trim).filter(|d| !d.is_empty()) {
        sections.push(format!("CASE DESCRIPTION:\n{desc}"));
    }

    if !snapshot.knowledge.is_empty() {
        let lines: Vec<String> = snapshot
            .knowledge
            .iter()
            .map(|k| match k.category.as_deref() {
                Some(cat) => format!("- [{}] {}: {}", cat, k.title, k.content.trim()),
                None => format!("- {}: {}", k.title, k.content.trim()),
            })
            .collect();
        sections.push(format!("KNOWLEDGE BASE:\n{}", lines.join("\n")));
    }

    if !snapshot.timeline.is_empty() {
        let mut events: Vec<&TimelineEvent> = snapshot.timeline.iter().collect();
        events.sort_by(|a, b| a.date.cmp(&b.date));
        let lines: Vec<String> = events
            .iter()
            .map(|e| {
                if e.description.trim().is_empty() {
                    format!("- {}: {}", e.date, e.title)
                } else {
                    format!("- {}: {} ({})", e.date, e.title, e.description.trim())
                }
            })
            .collect();
        sections.push(format!("TIMELINE:\n{}", lines.join("\n")));
    }

    if !snapshot.entities.is_empty() {
        let lines: Vec<String> = snapshot
            .entities
            .iter()
            .map(|e| match e.description.as_deref() {
                Some(d) if !d.trim().is_empty() => format!("- {} ({}): {}", e.name, e.kind, d.trim()),
                _ => format!("- {} ({})", e.name, e.kind),
            })
            .collect();
        sections.push(format!("ENTITIES:\n{}", lines.join("\n")));
    }

    truncate_chars(sections.join("\n\n"), char_limit)
}

fn truncate_chars(mut text: String, limit: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(limit) {
        text.truncate(idx);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knowledge(title: &str, content: &str) -> KnowledgeItem {
        KnowledgeItem {
            id: title.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            category: Some("law".to_string()),
            tags: Vec::new(),
            source: None,
        }
    }

    fn timeline(date: &str, title: &str) -> TimelineEvent {
        TimelineEvent {
            id: date.to_string(),
            date: date.to_string(),
            title: title.to_string(),
            description: String::new(),
            source_document_id: None,
            tags: Vec::new(),
        }
    }

    #[test]
    fn empty_snapshot_yields_empty_context() {
        assert_eq!(build_case_context(&CaseSnapshot::default(), 1000), "");
    }

    #[test]
    fn sections_present_only_when_populated() {
        let knowledge = vec![knowledge("ICCPR art. 9", "Liberty and security of person")];
        let snap = CaseSnapshot {
            description: Some("Detention of a human rights lawyer"),
            knowledge: &knowledge,
            ..Default::default()
        };
        let ctx = build_case_context(&snap, DEFAULT_CONTEXT_CHAR_LIMIT);
        assert!(ctx.starts_with("CASE DESCRIPTION:\nDetention"));
        assert!(ctx.contains("KNOWLEDGE BASE:\n- [law] ICCPR art. 9"));
        assert!(!ctx.contains("TIMELINE:"));
        assert!(!ctx.contains("ENTITIES:"));
    }

    #[test]
    fn timeline_is_sorted_by_date() {
        let timeline = vec![timeline("2024-03-01", "Trial"), timeline("2024-01-10", "Arrest")];
        let snap = CaseSnapshot {
            timeline: &timeline,
            ..Default::default()
        };
        let ctx = build_case_context(&snap, DEFAULT_CONTEXT_CHAR_LIMIT);
        let arrest = ctx.find("Arrest").unwrap();
        let trial = ctx.find("Trial").unwrap();
        assert!(arrest < trial);
    }

    #[test]
    fn context_is_bounded_on_char_boundary() {
        let snap = CaseSnapshot {
            description: Some("ééééééééééééééééééééé"),
            ..Default::default()
        };
        let ctx = build_case_context(&snap, 20);
        assert_eq!(ctx.chars().count(), 20);
    }
}
