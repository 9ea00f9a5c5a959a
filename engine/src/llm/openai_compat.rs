use async_trait::async_trait;
use axon_sdk::collaborators::ChatModel;
use axon_sdk::errors::{Result, TutorError};
use axon_sdk::types::{Message, MessageRole};
use serde_json::json;
use std::time::Duration;

use super::strip_reasoning;
use crate::secrets::SecretStore;

/// Chat model speaking the OpenAI chat-completions protocol (Groq, OpenAI)
pub struct OpenAiCompatModel {
    provider: String,
    base_url: String,
    model: String,
    temperature: f64,
    key_name: &'static str,
    secrets: SecretStore,
    client: reqwest::Client,
}

impl OpenAiCompatModel {
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        temperature: f64,
        timeout_secs: u64,
        key_name: &'static str,
        secrets: SecretStore,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TutorError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            provider: provider.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature,
            key_name,
            secrets,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatModel {
    fn name(&self) -> &str {
        &self.provider
    }

    async fn generate(&self, messages: &[Message]) -> Result<String> {
        let api_key = self.secrets.require(self.key_name)?;

        let url = format!("{}/chat/completions", self.base_url);

        let api_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|msg| match msg.role {
                // Text-protocol tool results have no matching native tool call
                MessageRole::Tool => json!({
                    "role": "user",
                    "content": format!("Tool result:\n{}", msg.content)
                }),
                _ => json!({
                    "role": msg.role.to_string(),
                    "content": msg.content
                }),
            })
            .collect();

        let payload = json!({
            "model": self.model,
            "messages": api_messages,
            "temperature": self.temperature,
        });

        tracing::debug!(
            "Sending {} messages to {} ({})",
            messages.len(),
            self.provider,
            self.model
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key.unsecure()))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| TutorError::upstream(format!("{} request failed: {}", self.provider, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => TutorError::upstream(format!(
                    "{} authentication failed: {}",
                    self.provider, text
                )),
                429 => TutorError::upstream(format!("{} rate limit exceeded", self.provider)),
                _ => TutorError::upstream(format!(
                    "{} returned {}: {}",
                    self.provider, status, text
                )),
            });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TutorError::upstream(format!("Invalid {} response: {}", self.provider, e)))?;

        let content = data
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .ok_or_else(|| {
                TutorError::upstream(format!("No message content in {} response", self.provider))
            })?;

        Ok(strip_reasoning(content))
    }
}
