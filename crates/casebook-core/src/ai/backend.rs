//! Generative-AI backends.
//!
//! `GeminiBackend` talks to the Gemini REST API with reqwest. `MockBackend`
//! returns scripted replies; the gateway uses it when `llm_mode = "mock"`.

use crate::error::GatewayError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// One piece of a multi-part prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    /// Base64 payload (e.g. an uploaded PDF or image).
    InlineData { mime_type: String, data: String },
}

/// Prompt contents: a single string or an ordered list of parts.
#[derive(Debug, Clone, PartialEq)]
pub enum Contents {
    Text(String),
    Parts(Vec<Part>),
}

impl Contents {
    pub fn into_parts(self) -> Vec<Part> {
        match self {
            Contents::Text(t) => vec![Part::Text(t)],
            Contents::Parts(p) => p,
        }
    }
}

impl From<String> for Contents {
    fn from(s: String) -> Self {
        Contents::Text(s)
    }
}

impl From<&str> for Contents {
    fn from(s: &str) -> Self {
        Contents::Text(s.to_string())
    }
}

/// Sampling parameters forwarded with every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingSettings {
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            top_p: 0.95,
        }
    }
}

impl From<&crate::models::Settings> for SamplingSettings {
    fn from(s: &crate::models::Settings) -> Self {
        Self {
            temperature: s.temperature,
            top_p: s.top_p,
        }
    }
}

/// Fully resolved request handed to a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub system_instruction: Option<String>,
    pub contents: Contents,
    pub schema: Option<Value>,
    pub settings: SamplingSettings,
}

/// A hosted model that turns a request into raw reply text.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: GenerationRequest) -> Result<String, GatewayError>;
}

// ---------------------------------------------------------------------------
// Gemini REST
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

impl From<Part> for GeminiPart {
    fn from(p: Part) -> Self {
        match p {
            Part::Text(text) => GeminiPart {
                text: Some(text),
                ..Default::default()
            },
            Part::InlineData { mime_type, data } => GeminiPart {
                inline_data: Some(InlineData { mime_type, data }),
                ..Default::default()
            },
        }
    }
}

fn build_gemini_request(request: GenerationRequest) -> GeminiRequest {
    let structured = request.schema.is_some();
    GeminiRequest {
        system_instruction: request.system_instruction.map(|s| GeminiContent {
            role: None,
            parts: vec![Part::Text(s).into()],
        }),
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts: request.contents.into_parts().into_iter().map(Into::into).collect(),
        }],
        generation_config: GenerationConfig {
            temperature: request.settings.temperature,
            top_p: request.settings.top_p,
            response_mime_type: structured.then_some("application/json"),
            response_schema: request.schema,
        },
    }
}

/// Gemini `generateContent` over HTTPS.
pub struct GeminiBackend {
    api_key: String,
    api_base: String,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: api_key.trim().to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            client,
        }
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GatewayError> {
        let url = format!("{}/models/{}:generateContent", self.api_base, request.model);
        let body = build_gemini_request(request);

        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GeminiResponse = res
            .json()
            .await
            .map_err(|e| GatewayError::Response(e.to_string()))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .ok_or_else(|| GatewayError::Response("no candidates in reply".to_string()))?;
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Mock
// ---------------------------------------------------------------------------

/// Scripted backend. Replies are consumed in order; once exhausted it answers
/// `{}` for structured calls and a fixed sentence otherwise.
#[derive(Default)]
pub struct MockBackend {
    replies: Mutex<VecDeque<Result<String, GatewayError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String, GatewayError>>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, reply: Result<String, GatewayError>) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(reply);
        }
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl GenerativeBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GatewayError> {
        let structured = request.schema.is_some();
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(request);
        }
        let scripted = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        match scripted {
            Some(reply) => reply,
            None if structured => Ok("{}".to_string()),
            None => Ok("Mock response: no generative backend is configured.".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(schema: Option<Value>) -> GenerationRequest {
        GenerationRequest {
            model: DEFAULT_MODEL.to_string(),
            system_instruction: Some("You are a case analyst.".to_string()),
            contents: Contents::Parts(vec![
                Part::Text("Summarize".to_string()),
                Part::InlineData {
                    mime_type: "application/pdf".to_string(),
                    data: "JVBERi0=".to_string(),
                },
            ]),
            schema,
            settings: SamplingSettings {
                temperature: 0.2,
                top_p: 0.9,
            },
        }
    }

    #[test]
    fn gemini_body_carries_schema_and_sampling() {
        let schema = json!({"type": "OBJECT", "properties": {"summary": {"type": "STRING"}}});
        let body = serde_json::to_value(build_gemini_request(request(Some(schema.clone())))).unwrap();
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"], schema);
        assert_eq!(body["generationConfig"]["topP"].as_f64().unwrap() as f32, 0.9);
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are a case analyst.");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["mimeType"], "application/pdf");
    }

    #[test]
    fn gemini_body_without_schema_omits_mime_type() {
        let body = serde_json::to_value(build_gemini_request(request(None))).unwrap();
        assert!(body["generationConfig"].get("responseMimeType").is_none());
        assert!(body["generationConfig"].get("responseSchema").is_none());
    }

    #[tokio::test]
    async fn mock_replays_script_then_falls_back() {
        let mock = MockBackend::with_replies([Ok("first".to_string())]);
        assert_eq!(mock.generate(request(None)).await.unwrap(), "first");
        assert_eq!(mock.generate(request(Some(json!({})))).await.unwrap(), "{}");
        assert_eq!(mock.requests().len(), 2);
    }
}
