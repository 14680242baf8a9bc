//! Language Model Plan Producer
//!
//! Sends the request text to an OpenAI-compatible chat completions endpoint
//! together with the action catalog, and parses the reply as a plan
//! document. Any failure along the way yields a failed plan.

use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{system_prompt, PlanProducer};
use crate::config::LlmConfig;
use crate::error::{ConfigError, ProducerError};
use crate::workflow::{parse_plan, Plan};

/// Sampling temperature; kept low so plans stay close to the catalog.
const TEMPERATURE: f64 = 0.1;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Plan producer backed by a chat model.
pub struct LlmPlanProducer {
    client: Client,
    config: LlmConfig,
}

impl LlmPlanProducer {
    pub fn new(config: LlmConfig) -> Result<Self, ConfigError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Builds a producer from `LLM_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(LlmConfig::from_env()?)
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Requests a plan, reporting why it could not be produced.
    pub async fn try_produce(&self, text: &str) -> Result<Plan, ProducerError> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system_prompt()},
                {"role": "user", "content": text},
            ],
            "temperature": TEMPERATURE,
            "response_format": {"type": "json_object"},
        });

        debug!("Requesting plan from {} ({})", self.config.completions_url(), self.config.model);

        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProducerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = response.json().await?;
        plan_from_reply(reply)
    }
}

#[async_trait]
impl PlanProducer for LlmPlanProducer {
    async fn produce_plan(&self, text: &str) -> Plan {
        match self.try_produce(text).await {
            Ok(plan) => {
                info!("Produced plan '{}' with {} steps", plan.description, plan.len());
                plan
            }
            Err(e) => {
                error!("Failed to produce plan: {}", e);
                Plan::failed(e.to_string())
            }
        }
    }
}

/// Extracts and parses the plan document from a chat reply.
fn plan_from_reply(reply: ChatResponse) -> Result<Plan, ProducerError> {
    let content = reply
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(ProducerError::EmptyReply)?;

    debug!("Model reply: {}", content);

    Ok(parse_plan(strip_code_fence(&content))?)
}

/// Removes a surrounding Markdown code fence, if the model added one.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();

    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);

    // Drop the info string (e.g. `json`) on the opening line.
    match inner.split_once('\n') {
        Some((first, rest)) if !first.trim_start().starts_with('{') => rest.trim(),
        _ => inner.trim(),
    }
}
