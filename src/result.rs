use crate::normalize::NormalizedOutput;
use crate::prompt::TranslationRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Translator,
    Tutor,
}

/// Structured answer to a translation prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub mode: Mode,
    /// Only set in tutor mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_text: Option<String>,
    pub translations: BTreeMap<String, String>,
}

/// The provider answered, but not in the shape the prompt asked for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderFormatError {
    #[error("expected a JSON object, got plain text: {0}")]
    PlainText(String),
    #[error("expected a JSON object, got {0}")]
    NotAnObject(String),
    #[error("response has no \"translations\" object")]
    MissingTranslations,
    #[error("translation for {0} is not a string")]
    InvalidTranslation(String),
    #[error("unknown mode \"{0}\"")]
    UnknownMode(String),
}

impl TryFrom<NormalizedOutput> for TranslationResult {
    type Error = ProviderFormatError;

    fn try_from(output: NormalizedOutput) -> Result<Self, Self::Error> {
        let map = match output {
            NormalizedOutput::Structured(Value::Object(map)) => map,
            NormalizedOutput::Structured(other) => {
                return Err(ProviderFormatError::NotAnObject(other.to_string()));
            }
            NormalizedOutput::Text(text) => return Err(ProviderFormatError::PlainText(text)),
        };

        let corrected_text = map
            .get("corrected_text")
            .and_then(Value::as_str)
            .map(|text| text.trim().to_string());

        let mode = match map.get("mode").and_then(Value::as_str) {
            Some("tutor") => Mode::Tutor,
            Some("translator") => Mode::Translator,
            Some(other) => return Err(ProviderFormatError::UnknownMode(other.to_string())),
            None if corrected_text.is_some() => Mode::Tutor,
            None => Mode::Translator,
        };

        let raw_translations = map
            .get("translations")
            .and_then(Value::as_object)
            .ok_or(ProviderFormatError::MissingTranslations)?;

        let mut translations = BTreeMap::new();
        for (language, value) in raw_translations {
            let text = value
                .as_str()
                .ok_or_else(|| ProviderFormatError::InvalidTranslation(language.clone()))?;
            translations.insert(language.clone(), text.trim().to_string());
        }

        Ok(TranslationResult {
            mode,
            corrected_text: match mode {
                Mode::Tutor => corrected_text,
                Mode::Translator => None,
            },
            translations,
        })
    }
}

impl TranslationResult {
    /// Requested languages the provider did not answer for.
    pub fn missing_languages<'a>(&self, request: &'a TranslationRequest) -> Vec<&'a str> {
        request
            .target_languages()
            .iter()
            .filter(|lang| !self.translations.contains_key(lang.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Languages in the answer that were never requested.
    pub fn unexpected_languages(&self, request: &TranslationRequest) -> Vec<&str> {
        self.translations
            .keys()
            .filter(|lang| !request.target_languages().iter().any(|t| t == *lang))
            .map(String::as_str)
            .collect()
    }

    /// Translations in request order, followed by any extras the provider added.
    pub fn ordered<'a>(&'a self, request: &TranslationRequest) -> Vec<(&'a str, &'a str)> {
        let mut out: Vec<(&str, &str)> = request
            .target_languages()
            .iter()
            .filter_map(|lang| self.translations.get_key_value(lang.as_str()))
            .map(|(lang, text)| (lang.as_str(), text.as_str()))
            .collect();
        for lang in self.unexpected_languages(request) {
            if let Some((key, text)) = self.translations.get_key_value(lang) {
                out.push((key.as_str(), text.as_str()));
            }
        }
        out
    }
}
