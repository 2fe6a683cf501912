use crate::prompt::ProviderFormat;
use crate::provider::{self, Provider};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-flash-lite-latest";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

/// Google generative-language API, authenticated with an API key header.
pub struct GeminiProvider {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: &str, model: &str) -> Result<Self> {
        let model = match model.trim() {
            "" => DEFAULT_GEMINI_MODEL,
            model => model,
        };
        Ok(Self {
            api_key: api_key.trim().to_string(),
            endpoint: format!("{}/{}:generateContent", GEMINI_BASE_URL, model),
            client: provider::http_client()?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn contents(prompt: &str) -> Value {
    json!({ "contents": [{ "parts": [{ "text": prompt }] }] })
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "Gemini"
    }

    fn format(&self) -> ProviderFormat {
        ProviderFormat::StructuredJson
    }

    // The input is already embedded in the prompt.
    fn translation_body(&self, prompt: &str, _user_input: &str) -> Value {
        contents(prompt)
    }

    fn plain_body(&self, prompt: &str) -> Value {
        contents(prompt)
    }

    fn extract_text(&self, response: &Value) -> Result<String> {
        let parsed = GenerateResponse::deserialize(response).context("decode Gemini response")?;
        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or_else(|| anyhow!("Gemini response missing candidate text"))
    }

    async fn send(&self, body: &Value) -> Result<Value> {
        debug!(endpoint = %self.endpoint, "Sending Gemini request");
        let request = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key);
        provider::post_json(self.name(), request, body).await
    }
}
