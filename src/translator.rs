use crate::config::Settings;
use crate::normalize::normalize;
use crate::prompt::{self, ProviderFormat, TranslationRequest};
use crate::provider::{self, preview, Provider};
use crate::result::TranslationResult;
use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn, Instrument};

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> u64 {
    REQUEST_SEQ.fetch_add(1, Ordering::Relaxed)
}

/// Runs prompts through a provider and interprets what comes back.
#[derive(Clone)]
pub struct Translator {
    provider: Arc<dyn Provider>,
}

impl Translator {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(provider::from_settings(settings)?))
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn format(&self) -> ProviderFormat {
        self.provider.format()
    }

    /// True when both translators send through the same provider instance.
    pub fn shares_provider(&self, other: &Translator) -> bool {
        Arc::ptr_eq(&self.provider, &other.provider)
    }

    pub async fn process_input(&self, request: &TranslationRequest) -> Result<TranslationResult> {
        request.validate()?;

        let span = tracing::info_span!(
            "translation",
            request_id = next_request_id(),
            provider = %self.provider.name(),
            source_language = %request.source_language(),
            targets = request.target_languages().len(),
            tutor = request.tutor_mode(),
            input_len = request.user_input().len()
        );

        async {
            let prompt = prompt::build_translation_prompt(request);
            info!(
                prompt_len = prompt.len(),
                input_preview = %preview(request.user_input(), 200),
                "Translation request prepared"
            );

            let body = self.provider.translation_body(&prompt, request.user_input());
            let raw = self.provider.complete(&body).await?;
            debug!(response_preview = %preview(&raw, 400), "Provider text received");

            let result = TranslationResult::try_from(normalize(&raw)).map_err(|e| {
                error!(error = %e, response_preview = %preview(&raw, 400), "Unexpected provider response");
                anyhow!("Invalid JSON format returned by {} API: {}", self.provider.name(), e)
            })?;

            let missing = result.missing_languages(request);
            if !missing.is_empty() {
                warn!(missing = ?missing, "Provider skipped requested languages");
            }
            let unexpected = result.unexpected_languages(request);
            if !unexpected.is_empty() {
                warn!(unexpected = ?unexpected, "Provider returned unrequested languages");
            }

            info!(
                mode = ?result.mode,
                translations = result.translations.len(),
                "Translation completed"
            );
            Ok::<_, anyhow::Error>(result)
        }
        .instrument(span)
        .await
    }

    /// Translates `text` back into English so the user can verify a result.
    pub async fn reverse_check(&self, text: &str) -> Result<String> {
        let span = tracing::info_span!(
            "reverse_check",
            request_id = next_request_id(),
            provider = %self.provider.name(),
            input_len = text.len()
        );

        async {
            let body = self.provider.plain_body(&prompt::build_reverse_check_prompt(text));
            let raw = self.provider.complete(&body).await?;
            let checked = normalize(&raw).into_text().trim().to_string();
            info!(checked_preview = %preview(&checked, 200), "Reverse check completed");
            Ok::<_, anyhow::Error>(checked)
        }
        .instrument(span)
        .await
    }

    /// Sends the connectivity prompt and expects the provider to answer "OK".
    pub async fn test_connection(&self) -> Result<String> {
        let span = tracing::info_span!(
            "test_connection",
            request_id = next_request_id(),
            provider = %self.provider.name()
        );

        async {
            let body = self.provider.plain_body(prompt::CONNECTIVITY_PROMPT);
            let raw = self.provider.complete(&body).await?;
            let reply = normalize(&raw).into_text();
            if reply.trim().to_lowercase().contains("ok") {
                info!("Provider connectivity confirmed");
                Ok::<_, anyhow::Error>("API configuration successful!".to_string())
            } else {
                warn!(reply_preview = %preview(&reply, 200), "Provider connectivity reply unexpected");
                Err(anyhow!("API returned unexpected response: {}", reply))
            }
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;
    use crate::result::Mode;

    fn translator(mock: MockProvider) -> (Translator, Arc<MockProvider>) {
        let mock = Arc::new(mock);
        (Translator::new(mock.clone()), mock)
    }

    fn request(tutor: bool) -> TranslationRequest {
        TranslationRequest::new(
            "I are happy",
            "English",
            ["Greek", "French"],
            tutor,
            ProviderFormat::StructuredJson,
        )
    }

    #[tokio::test]
    async fn test_process_input_translator() {
        let (translator, mock) = translator(MockProvider::new(ProviderFormat::StructuredJson).with_reply(
            "```json\n{\"mode\":\"translator\",\"translations\":{\"Greek\":\"Είμαι χαρούμενος\",\"French\":\"Je suis heureux\",}}\n```",
        ));

        let result = translator.process_input(&request(false)).await.unwrap();
        assert_eq!(result.mode, Mode::Translator);
        assert_eq!(result.translations.len(), 2);
        assert_eq!(result.translations["French"], "Je suis heureux");

        let bodies = mock.bodies();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["input"], "I are happy");
        assert!(bodies[0]["prompt"].as_str().unwrap().contains("**MODE: TRANSLATOR**"));
    }

    #[tokio::test]
    async fn test_process_input_tutor() {
        let (translator, _) = translator(MockProvider::new(ProviderFormat::StructuredJson).with_reply(
            r#"{"mode":"tutor","corrected_text":"I am happy","translations":{"Greek":"Είμαι χαρούμενος"}}"#,
        ));

        let result = translator.process_input(&request(true)).await.unwrap();
        assert_eq!(result.mode, Mode::Tutor);
        assert_eq!(result.corrected_text.as_deref(), Some("I am happy"));
    }

    #[tokio::test]
    async fn test_plain_text_reply_is_format_error() {
        let (translator, _) = translator(
            MockProvider::new(ProviderFormat::StructuredJson).with_reply("Sorry, I cannot help with that."),
        );

        let err = translator.process_input(&request(false)).await.unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Invalid JSON format returned by Mock API"));
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_provider() {
        let (translator, mock) = translator(MockProvider::new(ProviderFormat::StructuredJson));
        let empty = TranslationRequest::new(
            "hello",
            "English",
            ["English"],
            false,
            ProviderFormat::StructuredJson,
        );

        let err = translator.process_input(&empty).await.unwrap_err();
        assert_eq!(err.to_string(), "Please select at least one target language.");
        assert!(mock.bodies().is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let (translator, _) = translator(
            MockProvider::new(ProviderFormat::StructuredJson).with_error("Unable to connect to Mock API"),
        );
        let err = translator.process_input(&request(false)).await.unwrap_err();
        assert_eq!(err.to_string(), "Unable to connect to Mock API");
    }

    #[tokio::test]
    async fn test_reverse_check() {
        let (translator, mock) = translator(
            MockProvider::new(ProviderFormat::PlainInstruction).with_reply("{\"text\": \" I am happy \"}"),
        );
        assert_eq!(translator.reverse_check("Είμαι χαρούμενος").await.unwrap(), "I am happy");
        let prompt = mock.bodies()[0]["prompt"].as_str().unwrap().to_string();
        assert!(prompt.contains("conversational English"));
        assert!(prompt.contains("Είμαι χαρούμενος"));
    }

    #[tokio::test]
    async fn test_reverse_check_decodes_json_string() {
        let (translator, _) = translator(
            MockProvider::new(ProviderFormat::PlainInstruction).with_reply("\"I am happy\""),
        );
        assert_eq!(translator.reverse_check("Είμαι χαρούμενος").await.unwrap(), "I am happy");
    }

    #[tokio::test]
    async fn test_connection_accepts_ok() {
        let (translator, _) = translator(
            MockProvider::new(ProviderFormat::PlainInstruction)
                .with_reply("OK")
                .with_reply("```json\n{\"text\": \"ok\"}\n```"),
        );
        assert_eq!(translator.test_connection().await.unwrap(), "API configuration successful!");
        assert!(translator.test_connection().await.is_ok());
    }

    #[tokio::test]
    async fn test_connection_rejects_other_replies() {
        let (translator, _) =
            translator(MockProvider::new(ProviderFormat::PlainInstruction).with_reply("nope"));
        let err = translator.test_connection().await.unwrap_err();
        assert_eq!(err.to_string(), "API returned unexpected response: nope");
    }
}
