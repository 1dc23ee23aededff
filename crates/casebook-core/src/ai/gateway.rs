//! Structured AI gateway: every outbound model call goes through one
//! `ThrottledQueue`, and schema-constrained replies come back as
//! `StructuredReply`.

use super::backend::{
    Contents, GeminiBackend, GenerationRequest, GenerativeBackend, MockBackend, SamplingSettings,
};
use super::queue::{QueuedCall, ThrottlePolicy, ThrottledQueue};
use super::structured::StructuredReply;
use crate::config::CaseConfig;
use crate::error::GatewayError;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One call: contents, optional response schema, sampling settings.
#[derive(Debug, Clone)]
pub struct AiCall {
    pub contents: Contents,
    pub schema: Option<Value>,
    pub settings: SamplingSettings,
    pub system_instruction: Option<String>,
    pub model: Option<String>,
    pub cancel: Option<CancellationToken>,
}

impl AiCall {
    pub fn new(contents: impl Into<Contents>) -> Self {
        Self {
            contents: contents.into(),
            schema: None,
            settings: SamplingSettings::default(),
            system_instruction: None,
            model: None,
            cancel: None,
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_settings(mut self, settings: SamplingSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_system(mut self, system: &str) -> Self {
        self.system_instruction = Some(system.to_string());
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model.filter(|m| !m.trim().is_empty());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Shared entry point for all model calls. Construct once per process and
/// share behind an `Arc`.
pub struct AiGateway {
    backend: Arc<dyn GenerativeBackend>,
    queue: ThrottledQueue,
    default_model: String,
}

impl AiGateway {
    /// Must be called inside a tokio runtime (spawns the queue worker).
    pub fn new(backend: Arc<dyn GenerativeBackend>, policy: ThrottlePolicy, default_model: &str) -> Self {
        Self {
            backend,
            queue: ThrottledQueue::new(policy),
            default_model: default_model.to_string(),
        }
    }

    /// Pick the backend from `llm_mode`. `gemini` requires an API key.
    pub fn from_config(config: &CaseConfig) -> Result<Self, GatewayError> {
        let backend: Arc<dyn GenerativeBackend> = match config.llm_mode.trim().to_lowercase().as_str() {
            "gemini" => {
                let key = config.api_key().ok_or_else(|| {
                    GatewayError::NotConfigured(
                        "llm_mode=gemini needs CASEBOOK_AI_API_KEY or GEMINI_API_KEY".to_string(),
                    )
                })?;
                Arc::new(GeminiBackend::new(key).with_api_base(&config.api_base))
            }
            "mock" => Arc::new(MockBackend::new()),
            other => {
                return Err(GatewayError::NotConfigured(format!("unknown llm_mode '{other}'")));
            }
        };
        tracing::info!(
            backend = backend.name(),
            model = %config.model,
            delay_ms = config.throttle_delay_ms,
            "AI gateway ready"
        );
        Ok(Self::new(backend, config.throttle_policy(), &config.model))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Calls waiting for the worker.
    pub fn queued(&self) -> usize {
        self.queue.queued()
    }

    /// Enqueue a call and return its handle; the raw reply text is the result.
    pub fn call(&self, call: AiCall) -> QueuedCall<String> {
        let AiCall {
            contents,
            schema,
            settings,
            system_instruction,
            model,
            cancel,
        } = call;
        let request = GenerationRequest {
            model: model.unwrap_or_else(|| self.default_model.clone()),
            system_instruction,
            contents,
            schema,
            settings,
        };
        let backend = Arc::clone(&self.backend);
        self.queue
            .submit(cancel.unwrap_or_default(), move || async move { backend.generate(request).await })
    }

    /// Free-text call.
    pub async fn generate_text(&self, call: AiCall) -> Result<String, GatewayError> {
        self.call(call).wait().await
    }

    /// Schema-constrained call. Parse problems are reported in the reply,
    /// never as an error.
    pub async fn generate_structured(&self, call: AiCall) -> Result<StructuredReply, GatewayError> {
        let raw = self.call(call).wait().await?;
        let reply = StructuredReply::parse(&raw);
        if let StructuredReply::Malformed { error, .. } = &reply {
            tracing::warn!(%error, "structured AI reply is not valid JSON");
        }
        Ok(reply)
    }
}
