//! Casebook configuration.
//!
//! Precedence: environment (`CASEBOOK__*`) > config file (`CASEBOOK_CONFIG`,
//! default `config/casebook`) > built-in defaults.
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | app_name | Casebook | Name reported by `/health` and logs |
//! | host / port | 127.0.0.1 / 8000 | Gateway bind address |
//! | storage_path | ./data/casebook | Sled database directory |
//! | llm_mode | mock | `mock` or `gemini` |
//! | model | gemini-2.0-flash | Default model id |
//! | throttle_delay_ms | 2000 | Minimum gap between AI calls |
//! | backoff_enabled | true | Grow the gap after failed calls |
//! | context_char_limit | 30000 | Bound for the case context block |
//! | timeline_gap_days | 30 | Gap threshold for temporal analysis |

use crate::ai::backend::{DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::ai::queue::ThrottlePolicy;
use crate::context::DEFAULT_CONTEXT_CHAR_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseConfig {
    pub app_name: String,
    pub host: String,
    pub port: u16,
    pub storage_path: String,
    /// `mock` (scripted replies) or `gemini`.
    pub llm_mode: String,
    pub model: String,
    pub api_base: String,
    pub throttle_delay_ms: u64,
    pub backoff_enabled: bool,
    pub backoff_factor: f64,
    pub backoff_max_ms: u64,
    pub context_char_limit: usize,
    pub timeline_gap_days: i64,
}

impl Default for CaseConfig {
    fn default() -> Self {
        Self {
            app_name: "Casebook".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            storage_path: "./data/casebook".to_string(),
            llm_mode: "mock".to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            throttle_delay_ms: 2000,
            backoff_enabled: true,
            backoff_factor: 2.0,
            backoff_max_ms: 30_000,
            context_char_limit: DEFAULT_CONTEXT_CHAR_LIMIT,
            timeline_gap_days: 30,
        }
    }
}

impl CaseConfig {
    /// Load from file and environment on top of the defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CASEBOOK_CONFIG").unwrap_or_else(|_| "config/casebook".to_string());
        let d = Self::default();
        let builder = config::Config::builder()
            .set_default("app_name", d.app_name)?
            .set_default("host", d.host)?
            .set_default("port", i64::from(d.port))?
            .set_default("storage_path", d.storage_path)?
            .set_default("llm_mode", d.llm_mode)?
            .set_default("model", d.model)?
            .set_default("api_base", d.api_base)?
            .set_default("throttle_delay_ms", d.throttle_delay_ms)?
            .set_default("backoff_enabled", d.backoff_enabled)?
            .set_default("backoff_factor", d.backoff_factor)?
            .set_default("backoff_max_ms", d.backoff_max_ms)?
            .set_default("context_char_limit", d.context_char_limit as u64)?
            .set_default("timeline_gap_days", d.timeline_gap_days)?;

        let path = Path::new(&config_path);
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder.add_source(config::File::with_name(&config_path).required(false))
        };

        builder
            .add_source(config::Environment::with_prefix("CASEBOOK").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// API key for the hosted model: `CASEBOOK_AI_API_KEY`, then `GEMINI_API_KEY`.
    pub fn api_key(&self) -> Option<String> {
        std::env::var("CASEBOOK_AI_API_KEY")
            .ok()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    pub fn throttle_policy(&self) -> ThrottlePolicy {
        ThrottlePolicy {
            delay: Duration::from_millis(self.throttle_delay_ms),
            backoff_enabled: self.backoff_enabled,
            backoff_factor: self.backoff_factor,
            max_delay: Duration::from_millis(self.backoff_max_ms),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
