//! Provider abstraction.
//!
//! Each backend knows how to shape a request body for a prompt and how to
//! pull the generated text back out of its response. Callers only deal with
//! [`Provider`], never with per-backend branching.

use crate::config::{ProviderKind, Settings};
use crate::gemini::GeminiProvider;
use crate::openai::OpenAiProvider;
use crate::prompt::ProviderFormat;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait Provider: Send + Sync {
    /// Display name used in logs and error messages ("Gemini", "OpenAI").
    fn name(&self) -> &str;

    /// Prompt dialect this provider should receive.
    fn format(&self) -> ProviderFormat;

    /// Request body for a translation prompt. `user_input` is passed
    /// separately for providers with a chat-message request shape.
    fn translation_body(&self, prompt: &str, user_input: &str) -> Value;

    /// Request body carrying a single free-form prompt.
    fn plain_body(&self, prompt: &str) -> Value;

    /// Pulls the generated text out of a decoded response.
    fn extract_text(&self, response: &Value) -> Result<String>;

    /// Sends a request body and returns the decoded JSON response.
    async fn send(&self, body: &Value) -> Result<Value>;

    async fn complete(&self, body: &Value) -> Result<String> {
        let response = self.send(body).await?;
        self.extract_text(&response)
    }
}

/// Builds the provider selected in `settings`, checking its credentials first.
pub fn from_settings(settings: &Settings) -> Result<Arc<dyn Provider>> {
    match settings.provider_kind() {
        ProviderKind::Gemini => {
            if settings.gemini_api_key.trim().is_empty() {
                return Err(anyhow!("Please set your Gemini API key in the options page."));
            }
            let provider = GeminiProvider::new(&settings.gemini_api_key, &settings.gemini_model)?;
            Ok(Arc::new(provider))
        }
        ProviderKind::OpenAi => {
            if settings.openai_url.trim().is_empty()
                || settings.openai_api_key.trim().is_empty()
                || settings.openai_model.trim().is_empty()
            {
                return Err(anyhow!(
                    "Please set your OpenAI-compatible API URL, key, and model in the options page."
                ));
            }
            let provider = OpenAiProvider::new(
                &settings.openai_url,
                &settings.openai_api_key,
                &settings.openai_model,
            )?;
            Ok(Arc::new(provider))
        }
    }
}

pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("build HTTP client")
}

/// POSTs `body` as JSON and decodes the response, logging the round trip.
pub(crate) async fn post_json(
    provider: &str,
    request: reqwest::RequestBuilder,
    body: &Value,
) -> Result<Value> {
    let start = Instant::now();
    let response = request
        .json(body)
        .send()
        .await
        .with_context(|| format!("Unable to connect to {} API", provider));

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            error!(
                provider,
                error = %e,
                elapsed_ms = start.elapsed().as_millis(),
                "Provider request failed"
            );
            return Err(e);
        }
    };

    let status = response.status();
    let text = match response.text().await.context("read response body") {
        Ok(text) => text,
        Err(e) => {
            error!(
                provider,
                error = %e,
                status = %status,
                elapsed_ms = start.elapsed().as_millis(),
                "Provider response read failed"
            );
            return Err(e);
        }
    };
    let duration_ms = start.elapsed().as_millis();

    if !status.is_success() {
        error!(
            provider,
            status = %status,
            duration_ms,
            body_preview = %preview(&text, 400),
            "Provider returned error status"
        );
        return Err(status_error(status, &text));
    }

    info!(provider, status = %status, duration_ms, "Provider response received");

    match serde_json::from_str::<Value>(&text).context("parse response json") {
        Ok(parsed) => {
            debug!(provider, response_len = text.len(), "Provider response decoded");
            Ok(parsed)
        }
        Err(e) => {
            error!(
                provider,
                error = %e,
                body_preview = %preview(&text, 400),
                "Provider response parse failed"
            );
            Err(e)
        }
    }
}

fn status_error(status: reqwest::StatusCode, body: &str) -> anyhow::Error {
    anyhow!("API Error: {}: {}", status, preview(body, 400))
}

/// Rejects a candidate configuration whose credentials are incomplete.
pub fn check_candidate(settings: &Settings) -> Result<()> {
    match settings.provider_kind() {
        ProviderKind::Gemini if settings.gemini_api_key.trim().is_empty() => {
            Err(anyhow!("Please enter your Gemini API key."))
        }
        ProviderKind::OpenAi
            if settings.openai_url.trim().is_empty()
                || settings.openai_api_key.trim().is_empty()
                || settings.openai_model.trim().is_empty() =>
        {
            Err(anyhow!("Please fill in all OpenAI-compatible interface settings."))
        }
        _ => Ok(()),
    }
}

/// Single-line, length-capped rendering of `input` for log fields.
pub fn preview(input: &str, limit: usize) -> String {
    let cleaned = input.replace(['\n', '\r'], " ");
    let mut out = String::new();
    let mut chars = cleaned.chars();
    for _ in 0..limit {
        if let Some(ch) = chars.next() {
            out.push(ch);
        } else {
            return out;
        }
    }
    if chars.next().is_some() {
        out.push_str("...");
    }
    out
}
