//! Parsing of schema-constrained replies.
//!
//! Models often wrap JSON in markdown fences; those are stripped before
//! parsing. A reply that still fails to parse is reported as `Malformed`
//! instead of being silently replaced, so callers choose their own fallback.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Outcome of parsing a structured reply.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredReply {
    /// Parsed JSON value.
    Data(Value),
    /// Blank reply or JSON `null`: the model had nothing to report.
    Empty,
    /// Non-empty reply that is not valid JSON.
    Malformed { raw: String, error: String },
}

impl StructuredReply {
    pub fn parse(raw: &str) -> Self {
        let stripped = strip_code_fences(raw);
        if stripped.is_empty() {
            return StructuredReply::Empty;
        }
        match serde_json::from_str::<Value>(stripped) {
            Ok(Value::Null) => StructuredReply::Empty,
            Ok(v) => StructuredReply::Data(v),
            Err(e) => StructuredReply::Malformed {
                raw: raw.to_string(),
                error: e.to_string(),
            },
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, StructuredReply::Malformed { .. })
    }

    /// Parsed value, or an empty object for `Empty` and `Malformed`.
    pub fn into_value_or_empty(self) -> Value {
        match self {
            StructuredReply::Data(v) => v,
            _ => Value::Object(serde_json::Map::new()),
        }
    }

    /// Deserialize the value into `T`. `Empty` maps to `Ok(None)`; shape
    /// mismatches are reported like malformed JSON.
    pub fn decode<T: DeserializeOwned>(self) -> Result<Option<T>, String> {
        match self {
            StructuredReply::Data(v) => serde_json::from_value(v).map(Some).map_err(|e| e.to_string()),
            StructuredReply::Empty => Ok(None),
            StructuredReply::Malformed { error, .. } => Err(error),
        }
    }
}

/// Remove a surrounding markdown code fence (```json ... ```), if present.
/// Stripping an already stripped string returns it unchanged.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the opening fence line only when it is a language tag (e.g. `json`);
    // content that starts on the fence line is kept.
    let body = match rest.split_once('\n') {
        Some((first, after)) if is_info_string(first) => after,
        Some(_) => rest,
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    body.trim_end().trim_end_matches("```").trim()
}

fn is_info_string(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_json_fence() {
        let raw = "```json\n{\"level\": \"high\"}\n```";
        assert_eq!(strip_code_fences(raw), "{\"level\": \"high\"}");
    }

    #[test]
    fn strips_bare_fence_and_whitespace() {
        let raw = "  ```\n[1, 2]\n```  \n";
        assert_eq!(strip_code_fences(raw), "[1, 2]");
    }

    #[test]
    fn single_line_fence() {
        assert_eq!(strip_code_fences("```json{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn content_on_opening_fence_line_is_kept() {
        let raw = "```{\"overallLevel\": \"high\"}\n```";
        assert_eq!(strip_code_fences(raw), "{\"overallLevel\": \"high\"}");
        assert_eq!(
            StructuredReply::parse(raw),
            StructuredReply::Data(json!({"overallLevel": "high"}))
        );

        let multi = "```{\"threats\": [\n\"raid\"]}\n```";
        assert_eq!(
            StructuredReply::parse(multi),
            StructuredReply::Data(json!({"threats": ["raid"]}))
        );
    }

    #[test]
    fn unfenced_text_is_only_trimmed() {
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn reparsing_stripped_reply_is_idempotent() {
        let raw = "```json\n{\"threats\": [\"raid\"], \"score\": 3}\n```";
        let once = strip_code_fences(raw);
        let twice = strip_code_fences(once);
        assert_eq!(once, twice);
        assert_eq!(StructuredReply::parse(once), StructuredReply::parse(twice));
        assert_eq!(
            StructuredReply::parse(raw),
            StructuredReply::Data(json!({"threats": ["raid"], "score": 3}))
        );
    }

    #[test]
    fn malformed_json_never_panics_and_falls_back_to_empty_object() {
        let reply = StructuredReply::parse("```json\n{\"threats\": [\n```");
        assert!(reply.is_malformed());
        assert_eq!(reply.into_value_or_empty(), json!({}));
    }

    #[test]
    fn blank_and_null_are_empty() {
        assert_eq!(StructuredReply::parse(""), StructuredReply::Empty);
        assert_eq!(StructuredReply::parse("```json\n```"), StructuredReply::Empty);
        assert_eq!(StructuredReply::parse("null"), StructuredReply::Empty);
    }

    #[test]
    fn decode_reports_shape_mismatch() {
        #[derive(serde::Deserialize, Debug)]
        struct Shape {
            #[allow(dead_code)]
            level: String,
        }
        let reply = StructuredReply::Data(json!({"level": 3}));
        assert!(reply.decode::<Shape>().is_err());
        assert!(StructuredReply::Empty.decode::<Shape>().unwrap().is_none());
    }
}
