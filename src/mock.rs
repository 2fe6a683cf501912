//! Scripted provider for exercising the translation pipeline without network access.
//!
//! ```ignore
//! let mock = MockProvider::new(ProviderFormat::StructuredJson)
//!     .with_reply(r#"{"mode":"translator","translations":{"Greek":"Γεια"}}"#);
//! let translator = Translator::new(Arc::new(mock));
//! ```

use crate::prompt::ProviderFormat;
use crate::provider::Provider;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone)]
pub enum MockReply {
    /// Raw text the provider "generated".
    Text(String),
    /// Simulated transport or HTTP failure.
    Error(String),
}

/// Replays queued replies in order and records every body it was sent.
#[derive(Debug)]
pub struct MockProvider {
    format: ProviderFormat,
    replies: Mutex<VecDeque<MockReply>>,
    bodies: Mutex<Vec<Value>>,
}

impl MockProvider {
    pub fn new(format: ProviderFormat) -> Self {
        Self {
            format,
            replies: Mutex::new(VecDeque::new()),
            bodies: Mutex::new(Vec::new()),
        }
    }

    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.push(MockReply::Text(text.into()));
        self
    }

    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.push(MockReply::Error(message.into()));
        self
    }

    fn push(&self, reply: MockReply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    /// Bodies received so far, oldest first.
    pub fn bodies(&self) -> Vec<Value> {
        self.bodies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "Mock"
    }

    fn format(&self) -> ProviderFormat {
        self.format
    }

    fn translation_body(&self, prompt: &str, user_input: &str) -> Value {
        json!({ "prompt": prompt, "input": user_input })
    }

    fn plain_body(&self, prompt: &str) -> Value {
        json!({ "prompt": prompt })
    }

    fn extract_text(&self, response: &Value) -> Result<String> {
        response["reply"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Mock response missing reply"))
    }

    async fn send(&self, body: &Value) -> Result<Value> {
        self.bodies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(body.clone());
        let next = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(MockReply::Text(text)) => Ok(json!({ "reply": text })),
            Some(MockReply::Error(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("Mock provider has no reply queued")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_and_records_bodies() {
        let mock = MockProvider::new(ProviderFormat::PlainInstruction)
            .with_reply("first")
            .with_error("boom");

        let body = mock.plain_body("hello");
        assert_eq!(mock.complete(&body).await.unwrap(), "first");
        assert_eq!(mock.complete(&body).await.unwrap_err().to_string(), "boom");
        assert!(mock.complete(&body).await.is_err());
        assert_eq!(mock.bodies().len(), 3);
        assert_eq!(mock.bodies()[0], json!({ "prompt": "hello" }));
    }
}
