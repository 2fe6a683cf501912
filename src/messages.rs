//! JSON message host.
//!
//! Surfaces (CLI, stdio bridge, an extension's native-messaging shim) send
//! [`Message`]s and get a [`Reply`] back. Failures never cross this boundary
//! as errors; they come back as `{ "error": "..." }`.

use crate::config::{self, ProviderKind, Settings};
use crate::prompt::TranslationRequest;
use crate::provider::{self, Provider};
use crate::result::TranslationResult;
use crate::translator::Translator;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

/// Text captured from a page, kept for the next panel refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapturedContent {
    pub text: String,
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Message {
    #[serde(rename_all = "camelCase")]
    ProcessInput {
        user_input: String,
        source_language: String,
        target_languages: Vec<String>,
        #[serde(default)]
        is_tutor_mode: bool,
    },
    #[serde(rename_all = "camelCase")]
    ReverseCheck { text_to_translate: String },
    #[serde(rename_all = "camelCase")]
    TestApi {
        provider: ProviderKind,
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        url: String,
        #[serde(default)]
        model: String,
    },
    CaptureContent(CapturedContent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Translation(TranslationResult),
    Text {
        text: String,
    },
    Test {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Ack {
        ok: bool,
    },
    Error {
        error: String,
    },
}

impl Reply {
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error { .. } | Reply::Test { success: false, .. })
    }
}

/// Shared state behind every surface, in the spirit of an app-state struct.
pub struct Host {
    settings: Mutex<Settings>,
    captured: Mutex<Option<CapturedContent>>,
    fixed_provider: Option<Arc<dyn Provider>>,
    config_path: Option<PathBuf>,
    // Reused while the connection settings stay the same.
    cached: Mutex<Option<(Settings, Translator)>>,
}

impl Host {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
            captured: Mutex::new(None),
            fixed_provider: None,
            config_path: None,
            cached: Mutex::new(None),
        }
    }

    /// Host that always talks to `provider`, whatever the settings say.
    pub fn with_provider(settings: Settings, provider: Arc<dyn Provider>) -> Self {
        Self {
            fixed_provider: Some(provider),
            ..Self::new(settings)
        }
    }

    /// Persists remembered preferences to `path` after each translation.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn settings(&self) -> Settings {
        self.settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update_settings(&self, settings: Settings) {
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = settings;
    }

    pub fn captured(&self) -> Option<CapturedContent> {
        self.captured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn translator_for(&self, settings: &Settings) -> Result<Translator> {
        if let Some(provider) = &self.fixed_provider {
            return Ok(Translator::new(provider.clone()));
        }

        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((built_from, translator)) = cached.as_ref() {
            if built_from.same_connection(settings) {
                return Ok(translator.clone());
            }
        }
        let translator = Translator::from_settings(settings)?;
        debug!(provider = %settings.provider, "Provider client built");
        *cached = Some((settings.clone(), translator.clone()));
        Ok(translator)
    }

    fn remember(&self, request: &TranslationRequest) {
        let snapshot = {
            let mut settings = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
            settings.remember_preferences(request);
            settings.clone()
        };
        if let Some(path) = &self.config_path {
            if let Err(e) = config::save_to(path, &snapshot) {
                warn!(error = %format!("{:#}", e), "Could not save preferences");
            }
        }
    }

    async fn process_input(
        &self,
        user_input: String,
        source_language: String,
        target_languages: Vec<String>,
        is_tutor_mode: bool,
    ) -> Result<TranslationResult> {
        let translator = self.translator_for(&self.settings())?;
        let request = TranslationRequest::new(
            user_input,
            source_language,
            target_languages,
            is_tutor_mode,
            translator.format(),
        );
        let result = translator.process_input(&request).await?;
        self.remember(&request);
        Ok(result)
    }

    async fn reverse_check(&self, text: &str) -> Result<String> {
        let settings = self.settings();
        if self.fixed_provider.is_none() {
            reverse_check_credentials(&settings)?;
        }
        let translator = self.translator_for(&settings)?;
        translator.reverse_check(text).await
    }

    /// Probes a candidate configuration without saving it.
    async fn test_api(&self, candidate: &Settings) -> Result<String> {
        provider::check_candidate(candidate)?;
        let translator = match &self.fixed_provider {
            Some(fixed) => Translator::new(fixed.clone()),
            None => Translator::new(provider::from_settings(candidate)?),
        };
        translator.test_connection().await
    }

    /// Keeps the capture and, when targets are saved, translates it right away.
    async fn capture(&self, content: CapturedContent) -> Reply {
        let text = content.text.clone();
        *self.captured.lock().unwrap_or_else(PoisonError::into_inner) = Some(content);

        let settings = self.settings();
        if text.trim().is_empty() || settings.target_languages.is_empty() {
            return Reply::Ack { ok: true };
        }
        match self
            .process_input(
                text,
                settings.source_language,
                settings.target_languages,
                settings.tutor_mode,
            )
            .await
        {
            Ok(result) => Reply::Translation(result),
            Err(e) => failed("captureContent", e),
        }
    }

    pub async fn dispatch(&self, message: Message) -> Reply {
        match message {
            Message::ProcessInput {
                user_input,
                source_language,
                target_languages,
                is_tutor_mode,
            } => match self
                .process_input(user_input, source_language, target_languages, is_tutor_mode)
                .await
            {
                Ok(result) => Reply::Translation(result),
                Err(e) => failed("processInput", e),
            },
            Message::ReverseCheck { text_to_translate } => {
                match self.reverse_check(&text_to_translate).await {
                    Ok(text) => Reply::Text { text },
                    Err(e) => failed("reverseCheck", e),
                }
            }
            Message::TestApi {
                provider: kind,
                api_key,
                url,
                model,
            } => {
                let mut candidate = self.settings();
                candidate.provider = kind;
                match kind {
                    ProviderKind::Gemini => {
                        candidate.gemini_api_key = api_key;
                        if !model.trim().is_empty() {
                            candidate.gemini_model = model;
                        }
                    }
                    ProviderKind::OpenAi => {
                        candidate.openai_url = url;
                        candidate.openai_api_key = api_key;
                        candidate.openai_model = model;
                    }
                }

                match self.test_api(&candidate).await {
                    Ok(message) => Reply::Test {
                        success: true,
                        message: Some(message),
                        error: None,
                    },
                    Err(e) => {
                        error!(action = "testApi", error = %e, "Message failed");
                        Reply::Test {
                            success: false,
                            message: None,
                            error: Some(format!("{:#}", e)),
                        }
                    }
                }
            }
            Message::CaptureContent(content) => {
                debug!(
                    url = %content.url,
                    title = %content.title,
                    text_len = content.text.len(),
                    "Content captured"
                );
                self.capture(content).await
            }
        }
    }

    /// Decodes one JSON message, dispatches it, and encodes the reply.
    pub async fn handle_json(&self, line: &str) -> String {
        let reply = match serde_json::from_str::<Message>(line) {
            Ok(message) => self.dispatch(message).await,
            Err(e) => {
                info!(error = %e, "Rejected malformed message");
                Reply::error(format!("Unknown message: {}", e))
            }
        };
        serde_json::to_string(&reply)
            .unwrap_or_else(|e| format!("{{\"error\":\"reply encoding failed: {}\"}}", e))
    }
}

fn reverse_check_credentials(settings: &Settings) -> Result<()> {
    match settings.provider_kind() {
        ProviderKind::Gemini if settings.gemini_api_key.trim().is_empty() => Err(anyhow!(
            "Please set your Gemini API key in the options page to use the reverse check function."
        )),
        ProviderKind::OpenAi
            if settings.openai_url.trim().is_empty()
                || settings.openai_api_key.trim().is_empty()
                || settings.openai_model.trim().is_empty() =>
        {
            Err(anyhow!(
                "Please set your OpenAI-compatible API to use the reverse check function."
            ))
        }
        _ => Ok(()),
    }
}

fn failed(action: &str, e: anyhow::Error) -> Reply {
    error!(action, error = %e, "Message failed");
    Reply::error(format!("{:#}", e))
}
