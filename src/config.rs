//! Service Configuration
//!
//! Endpoints and credentials for the action services and the language
//! model, read from the environment. A `.env` file in the working directory
//! is loaded first when present.
//!
//! | Variable | Used by |
//! |---|---|
//! | `NOTIFY_WEBHOOK_URL` | notify |
//! | `DEPLOY_API_URL` | deploy |
//! | `FILE_UPLOAD_API_URL` | upload_file |
//! | `ACTION_API_TOKEN` | bearer token for the three services above |
//! | `LLM_API_KEY` | plan producer (required) |
//! | `LLM_BASE_URL` | plan producer, default `https://api.deepseek.com` |
//! | `LLM_MODEL` | plan producer, default `deepseek-chat` |

use std::env;
use std::time::Duration;

use log::{debug, info};

use crate::error::ConfigError;

/// Timeout applied to every outgoing HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default OpenAI-compatible endpoint for the plan producer.
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.deepseek.com";

/// Default chat model for the plan producer.
pub const DEFAULT_LLM_MODEL: &str = "deepseek-chat";

/// Loads variables from `.env` if the file exists.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) => debug!("No .env file loaded: {}", e),
    }
}

/// Reads a variable, treating an empty value as unset.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Endpoints used by [`HttpDispatcher`](crate::dispatch::HttpDispatcher).
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub notify_webhook_url: Option<String>,
    pub deploy_api_url: Option<String>,
    pub file_upload_api_url: Option<String>,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            notify_webhook_url: None,
            deploy_api_url: None,
            file_upload_api_url: None,
            api_token: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl DispatcherConfig {
    /// Reads the dispatcher endpoints from the environment.
    ///
    /// Unset endpoints are allowed; the matching actions fail at dispatch time.
    pub fn from_env() -> Self {
        let config = Self {
            notify_webhook_url: non_empty_var("NOTIFY_WEBHOOK_URL"),
            deploy_api_url: non_empty_var("DEPLOY_API_URL"),
            file_upload_api_url: non_empty_var("FILE_UPLOAD_API_URL"),
            api_token: non_empty_var("ACTION_API_TOKEN"),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        };

        debug!(
            "Dispatcher endpoints: notify={}, deploy={}, upload={}",
            config.notify_webhook_url.is_some(),
            config.deploy_api_url.is_some(),
            config.file_upload_api_url.is_some()
        );

        config
    }
}

/// Connection settings for [`LlmPlanProducer`](crate::planner::LlmPlanProducer).
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl LlmConfig {
    /// Creates a config with the default endpoint and model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Reads the language model settings from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = non_empty_var("LLM_API_KEY").ok_or(ConfigError::Missing("LLM_API_KEY"))?;

        let mut config = Self::new(api_key);
        if let Some(base_url) = non_empty_var("LLM_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(model) = non_empty_var("LLM_MODEL") {
            config.model = model;
        }

        Ok(config)
    }

    /// Full URL of the chat completions endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
