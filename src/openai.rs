use crate::prompt::ProviderFormat;
use crate::provider::{self, Provider};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// Any chat-completions endpoint speaking the OpenAI request shape.
pub struct OpenAiProvider {
    url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(url: &str, api_key: &str, model: &str) -> Result<Self> {
        Ok(Self {
            url: url.trim().to_string(),
            api_key: api_key.trim().to_string(),
            model: model.trim().to_string(),
            client: provider::http_client()?,
        })
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "OpenAI"
    }

    fn format(&self) -> ProviderFormat {
        ProviderFormat::PlainInstruction
    }

    fn translation_body(&self, prompt: &str, user_input: &str) -> Value {
        json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": prompt },
                { "role": "user", "content": user_input }
            ]
        })
    }

    fn plain_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }]
        })
    }

    fn extract_text(&self, response: &Value) -> Result<String> {
        let parsed = ChatResponse::deserialize(response).context("decode OpenAI response")?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("OpenAI response missing choices"))
    }

    async fn send(&self, body: &Value) -> Result<Value> {
        debug!(url = %self.url, model = %self.model, "Sending OpenAI request");
        let request = self.client.post(&self.url).bearer_auth(&self.api_key);
        provider::post_json(self.name(), request, body).await
    }
}
